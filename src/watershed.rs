//! Watershed attribution: point-in-polygon lookup of station coordinates
//! against the watershed boundary set.
//!
//! Polygon containment uses closed boundary semantics: a station exactly on
//! a watershed boundary counts as inside. That is a policy choice, not a
//! numeric accident, so boundary stations are attributed rather than
//! dropped.

use crate::types::observation::Station;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;

const BOUNDARY_EPS: f64 = 1e-12;

/// One watershed polygon. The ring is a closed sequence of (latitude,
/// longitude) vertices; the final edge back to the first vertex is implied.
/// Geometry loading from vector files happens upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Watershed {
    pub id: String,
    pub ring: Vec<(f64, f64)>,
}

/// R-tree entry: a polygon's bounding box plus its index into the polygon
/// list, used to prefilter candidates before the exact containment test.
struct BoundedPolygon {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatially indexed watershed polygon set.
pub struct WatershedAttributor {
    watersheds: Vec<Watershed>,
    tree: RTree<BoundedPolygon>,
}

impl WatershedAttributor {
    pub fn new(watersheds: Vec<Watershed>) -> Self {
        let entries = watersheds
            .iter()
            .enumerate()
            .filter(|(_, w)| w.ring.len() >= 3)
            .map(|(index, w)| BoundedPolygon {
                index,
                envelope: ring_envelope(&w.ring),
            })
            .collect();
        Self {
            watersheds,
            tree: RTree::bulk_load(entries),
        }
    }

    /// The id of the first watershed containing the coordinate, or `None`
    /// when the station lies outside every polygon (valid, not an error).
    pub fn attribute(&self, lat: f64, lon: f64) -> Option<&str> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lat, lon]))
            .filter(|bounded| {
                let ring = &self.watersheds[bounded.index].ring;
                ring_contains(ring, lat, lon)
            })
            .map(|bounded| self.watersheds[bounded.index].id.as_str())
            .next()
    }

    /// Attribution for a station batch, keyed by station id. Stations
    /// outside every watershed are simply absent from the map.
    pub fn attribute_stations(&self, stations: &[Station]) -> HashMap<String, String> {
        stations
            .iter()
            .filter_map(|station| {
                self.attribute(station.latitude, station.longitude)
                    .map(|id| (station.station_id.clone(), id.to_string()))
            })
            .collect()
    }
}

fn ring_envelope(ring: &[(f64, f64)]) -> AABB<[f64; 2]> {
    let mut lat_min = f64::INFINITY;
    let mut lat_max = f64::NEG_INFINITY;
    let mut lon_min = f64::INFINITY;
    let mut lon_max = f64::NEG_INFINITY;
    for &(lat, lon) in ring {
        lat_min = lat_min.min(lat);
        lat_max = lat_max.max(lat);
        lon_min = lon_min.min(lon);
        lon_max = lon_max.max(lon);
    }
    AABB::from_corners([lat_min, lon_min], [lat_max, lon_max])
}

/// Ray-casting containment with an explicit boundary check first, so points
/// exactly on an edge or vertex are inside regardless of ray parity.
fn ring_contains(ring: &[(f64, f64)], lat: f64, lon: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut j = n - 1;
    for i in 0..n {
        if on_segment(ring[j], ring[i], (lat, lon)) {
            return true;
        }
        j = i;
    }

    let mut inside = false;
    j = n - 1;
    for i in 0..n {
        let (yi, xi) = ring[i];
        let (yj, xj) = ring[j];
        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > BOUNDARY_EPS {
        return false;
    }
    p.0 >= a.0.min(b.0) - BOUNDARY_EPS
        && p.0 <= a.0.max(b.0) + BOUNDARY_EPS
        && p.1 >= a.1.min(b.1) - BOUNDARY_EPS
        && p.1 <= a.1.max(b.1) + BOUNDARY_EPS
}
