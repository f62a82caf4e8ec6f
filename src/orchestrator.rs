use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::address;
use crate::cache::{CoordinateCache, SOURCE_GEOCODER};
use crate::dataset::Shop;
use crate::geo::Coordinate;
use crate::geocoder::GeocoderService;

// Observers fire every this many completions, and on the final one.
const PROGRESS_STRIDE: usize = 5;

/// Counters for the in-flight batch; absent while the orchestrator is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeocodeProgress {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeocodeBatchStats {
    pub total: usize,
    pub cache_hits: usize,
    pub lookups: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

/// Result of a `resolve_all` call. A start request that lands while a batch
/// is active observes the in-flight progress instead of a second run.
#[derive(Debug, Clone, Copy)]
pub enum BatchOutcome {
    Completed(GeocodeBatchStats),
    AlreadyRunning(Option<GeocodeProgress>),
}

pub type ProgressObserver = Arc<dyn Fn(GeocodeProgress) + Send + Sync>;

/// Sequences geocoding for every shop still missing coordinates: cache
/// re-check, candidate queries in order, write-back, fixed inter-shop delay
/// to respect the service's request rate. Strictly one lookup in flight and
/// one batch at a time.
pub struct GeocodeOrchestrator {
    cache: CoordinateCache,
    geocoder: GeocoderService,
    delay: Duration,
    guard: AsyncMutex<()>,
    progress: Mutex<Option<GeocodeProgress>>,
}

impl GeocodeOrchestrator {
    pub fn new(cache: CoordinateCache, geocoder: GeocoderService, delay: Duration) -> Self {
        Self {
            cache,
            geocoder,
            delay,
            guard: AsyncMutex::new(()),
            progress: Mutex::new(None),
        }
    }

    pub fn progress(&self) -> Option<GeocodeProgress> {
        *self.progress.lock()
    }

    pub fn is_running(&self) -> bool {
        self.progress.lock().is_some()
    }

    /// Processes shops lacking coordinates in dataset order, mutating the
    /// shared list in place. Runs to completion; there is no early abort,
    /// only observable progress.
    pub async fn resolve_all(
        &self,
        shops: &Arc<Mutex<Vec<Shop>>>,
        observer: Option<ProgressObserver>,
    ) -> BatchOutcome {
        let Ok(_lock) = self.guard.try_lock() else {
            return BatchOutcome::AlreadyRunning(self.progress());
        };

        let pending: Vec<(String, String)> = shops
            .lock()
            .iter()
            .filter(|shop| !shop.has_coordinate())
            .map(|shop| (shop.id.clone(), shop.full_address.clone()))
            .collect();

        let total = pending.len();
        let mut stats = GeocodeBatchStats {
            total,
            ..Default::default()
        };
        *self.progress.lock() = Some(GeocodeProgress { done: 0, total });

        for (index, (shop_id, full_address)) in pending.iter().enumerate() {
            // Another context may have resolved this shop since the batch
            // snapshot was taken; a cache hit skips the lookup and the delay.
            let cached = self.cache.get(shop_id).map(|entry| entry.coordinate());
            let from_cache = cached.is_some();
            let found = match cached {
                Some(coordinate) => {
                    stats.cache_hits += 1;
                    Some(coordinate)
                }
                None => {
                    stats.lookups += 1;
                    self.lookup_candidates(shop_id, full_address).await
                }
            };

            match found {
                Some(coordinate) => {
                    apply_coordinate(shops, shop_id, coordinate);
                    if !from_cache {
                        self.cache.set(shop_id, coordinate, SOURCE_GEOCODER);
                    }
                    stats.resolved += 1;
                }
                None => {
                    stats.unresolved += 1;
                }
            }

            let done = index + 1;
            let snapshot = GeocodeProgress { done, total };
            *self.progress.lock() = Some(snapshot);
            if done % PROGRESS_STRIDE == 0 || done == total {
                if let Some(callback) = &observer {
                    callback(snapshot);
                }
            }

            if !from_cache && done < total {
                sleep(self.delay).await;
            }
        }

        *self.progress.lock() = None;
        info!(
            total = stats.total,
            resolved = stats.resolved,
            cache_hits = stats.cache_hits,
            unresolved = stats.unresolved,
            "geocode batch finished"
        );
        BatchOutcome::Completed(stats)
    }

    // First non-none candidate wins; query failures are logged and treated
    // as no-match for this pass.
    async fn lookup_candidates(&self, shop_id: &str, full_address: &str) -> Option<Coordinate> {
        for candidate in address::query_candidates(full_address) {
            match self.geocoder.lookup(&candidate).await {
                Ok(Some(coordinate)) => return Some(coordinate),
                Ok(None) => continue,
                Err(err) => {
                    warn!(%err, shop_id, query = %candidate, "geocode query failed");
                }
            }
        }
        None
    }
}

fn apply_coordinate(shops: &Arc<Mutex<Vec<Shop>>>, shop_id: &str, coordinate: Coordinate) {
    let mut guard = shops.lock();
    if let Some(shop) = guard.iter_mut().find(|shop| shop.id == shop_id) {
        shop.coordinate = Some(coordinate);
    }
}
