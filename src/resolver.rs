use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::cache::{CoordinateCache, SOURCE_BULK};
use crate::dataset::Shop;
use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub from_cache: usize,
    pub from_bulk: usize,
    pub unresolved: usize,
}

/// Startup coordinate merge, run once over the freshly loaded dataset.
///
/// Cache values are applied first; entries from the bulk pre-geocoded file
/// then overwrite them and are written back to the cache, since the bulk
/// file is regenerated from an authoritative batch run and wins over stale
/// cache state. Shops matched by neither source stay unresolved until the
/// orchestrator runs.
pub fn resolve_coordinates(
    shops: &mut [Shop],
    cache: &CoordinateCache,
    bulk: Option<&HashMap<String, Coordinate>>,
) -> ResolutionStats {
    let mut stats = ResolutionStats::default();

    for shop in shops.iter_mut() {
        let mut from_bulk = false;
        let mut from_cache = false;

        if let Some(entry) = cache.get(&shop.id) {
            shop.coordinate = Some(entry.coordinate());
            from_cache = true;
        }

        if let Some(coordinate) = bulk.and_then(|b| b.get(&shop.id).copied()) {
            shop.coordinate = Some(coordinate);
            cache.set(&shop.id, coordinate, SOURCE_BULK);
            from_bulk = true;
        }

        if from_bulk {
            stats.from_bulk += 1;
        } else if from_cache {
            stats.from_cache += 1;
        } else if !shop.has_coordinate() {
            debug!(shop_id = %shop.id, "no cached or bulk coordinate");
            stats.unresolved += 1;
        }
    }

    stats
}
