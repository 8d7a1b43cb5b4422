//! Vintage clamping: rewriting requested tile-years that the gridded dataset
//! has not published yet down to the latest available year, while keeping
//! track of which requested years each fetched artifact must serve.

use crate::tiles::locator::StationTileYear;
use std::collections::{BTreeMap, BTreeSet};

/// One tile artifact to fetch, together with every requested year it serves.
///
/// `fetch_year` never exceeds the last available vintage. When a requested
/// year lies beyond the vintage, the latest published year stands in for it
/// and the extracted series is replicated onto the requested year's dates,
/// so multiple requested years can collapse onto one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClampedTileYear {
    pub tile_id: u32,
    pub fetch_year: i32,
    pub requested_years: BTreeSet<i32>,
}

/// The year actually fetched for a requested year given the latest vintage.
pub fn fetch_year_for(requested_year: i32, last_available_year: i32) -> i32 {
    requested_year.min(last_available_year)
}

/// Groups station tile-year requirements by (tile, fetch year).
///
/// No requested year is lost: the union of `requested_years` across the
/// output equals the set of requested years in the input.
pub fn clamp_tile_years(
    tile_years: &[StationTileYear],
    last_available_year: i32,
) -> Vec<ClampedTileYear> {
    let mut groups: BTreeMap<(u32, i32), BTreeSet<i32>> = BTreeMap::new();
    for ty in tile_years {
        let fetch_year = fetch_year_for(ty.requested_year, last_available_year);
        groups
            .entry((ty.tile_id, fetch_year))
            .or_default()
            .insert(ty.requested_year);
    }
    groups
        .into_iter()
        .map(|((tile_id, fetch_year), requested_years)| ClampedTileYear {
            tile_id,
            fetch_year,
            requested_years,
        })
        .collect()
}
