use std::cmp::Ordering;

use serde::Serialize;

use crate::dataset::Shop;
use crate::geo::{distance_meters, Coordinate};

/// One search hit: a shop plus its distance from the current center. The
/// distance is recomputed on every query and never outlives the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RankedShop {
    pub shop: Shop,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub hits: Vec<RankedShop>,
    pub missing_coordinates: usize,
}

/// Ranked nearby search over the full shop list.
///
/// Keeps shops with finite coordinates that pass `filter` and fall within
/// `radius_meters` of `center`, sorted ascending by distance with input
/// order preserved on ties. The complete ranked set is returned; display
/// caps are the caller's concern.
pub fn search<F>(shops: &[Shop], center: Coordinate, radius_meters: f64, filter: F) -> SearchOutcome
where
    F: Fn(&Shop) -> bool,
{
    let missing_coordinates = shops.iter().filter(|shop| !shop.has_coordinate()).count();

    let mut hits: Vec<RankedShop> = shops
        .iter()
        .filter_map(|shop| {
            let coordinate = shop.coordinate.filter(|c| c.is_finite())?;
            if !filter(shop) {
                return None;
            }
            let distance = distance_meters(center, coordinate);
            (distance <= radius_meters).then(|| RankedShop {
                shop: shop.clone(),
                distance_meters: distance,
            })
        })
        .collect();

    // sort_by is stable, so equal distances keep dataset order
    hits.sort_by(|a, b| {
        a.distance_meters
            .partial_cmp(&b.distance_meters)
            .unwrap_or(Ordering::Equal)
    });

    SearchOutcome {
        hits,
        missing_coordinates,
    }
}
