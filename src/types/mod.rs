pub mod observation;
pub mod records;
pub mod run_metadata;
