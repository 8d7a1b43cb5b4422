pub mod cache;
pub mod clamp;
pub mod error;
pub mod extract;
pub mod locator;
pub mod source;
