use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::cache::CoordinateCache;
use crate::config::AppConfig;
use crate::dataset::{self, Shop};
use crate::debounce::Debouncer;
use crate::errors::AppResult;
use crate::geo::Coordinate;
use crate::geocoder::GeocoderService;
use crate::orchestrator::{
    BatchOutcome, GeocodeOrchestrator, GeocodeProgress, ProgressObserver,
};
use crate::query::{self, SearchOutcome};
use crate::resolver::{self, ResolutionStats};

/// Owns the pipeline state for one run: the shop list, the active search
/// parameters, the coordinate cache, and the orchestrator. Constructed at
/// startup, torn down at process end; there is no ambient global state.
pub struct Session {
    shops: Arc<Mutex<Vec<Shop>>>,
    center: Mutex<Option<Coordinate>>,
    radius_meters: Mutex<f64>,
    voucher_filter: Mutex<Option<String>>,
    orchestrator: GeocodeOrchestrator,
    debouncer: Debouncer,
    resolution: ResolutionStats,
}

impl Session {
    /// Loads the dataset (fatal on malformed shape), opens the cache, and
    /// runs the startup coordinate merge against the optional bulk file.
    /// An unavailable cache backend is not fatal; the session falls back to
    /// an in-memory cache and runs without persistence.
    pub fn bootstrap(
        config: &AppConfig,
        data_dir: &Path,
        dataset_path: &Path,
        bulk_path: Option<&Path>,
    ) -> AppResult<Self> {
        let shops = dataset::load_shops(dataset_path)?;
        let cache = match CoordinateCache::open(data_dir, &config.cache_file_name) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(error = %err, "coordinate cache unavailable, continuing without persistence");
                CoordinateCache::in_memory()
            }
        };
        let geocoder = GeocoderService::new(config);
        Ok(Self::assemble(config, shops, cache, geocoder, bulk_path))
    }

    /// Bootstrap with an injected cache and geocoder; the seam the tests
    /// use to avoid real storage and network.
    pub fn with_parts(
        config: &AppConfig,
        shops: Vec<Shop>,
        cache: CoordinateCache,
        geocoder: GeocoderService,
        bulk_path: Option<&Path>,
    ) -> Self {
        Self::assemble(config, shops, cache, geocoder, bulk_path)
    }

    fn assemble(
        config: &AppConfig,
        mut shops: Vec<Shop>,
        cache: CoordinateCache,
        geocoder: GeocoderService,
        bulk_path: Option<&Path>,
    ) -> Self {
        let bulk = bulk_path.and_then(dataset::load_bulk_coordinates);
        let resolution = resolver::resolve_coordinates(&mut shops, &cache, bulk.as_ref());
        info!(
            total = shops.len(),
            from_cache = resolution.from_cache,
            from_bulk = resolution.from_bulk,
            unresolved = resolution.unresolved,
            "shop coordinates resolved"
        );

        let orchestrator = GeocodeOrchestrator::new(
            cache,
            geocoder,
            Duration::from_millis(config.geocode_delay_ms),
        );

        Self {
            shops: Arc::new(Mutex::new(shops)),
            center: Mutex::new(None),
            radius_meters: Mutex::new(config.default_radius_meters),
            voucher_filter: Mutex::new(None),
            orchestrator,
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_window_ms)),
            resolution,
        }
    }

    pub fn resolution_stats(&self) -> ResolutionStats {
        self.resolution
    }

    /// Point-in-time copy for rendering; the lock never leaves the session.
    pub fn snapshot_shops(&self) -> Vec<Shop> {
        self.shops.lock().clone()
    }

    /// Replaces the single active center wholesale (map tap or locate).
    pub fn set_center(&self, center: Coordinate) {
        *self.center.lock() = Some(center);
    }

    pub fn center(&self) -> Option<Coordinate> {
        *self.center.lock()
    }

    pub fn set_radius_meters(&self, radius_meters: f64) {
        *self.radius_meters.lock() = radius_meters;
    }

    pub fn set_voucher_filter(&self, category: Option<String>) {
        *self.voucher_filter.lock() = category;
    }

    /// Evaluates the spatial query against the current center, radius, and
    /// voucher filter. Without a center there are no results, only the
    /// missing-coordinate count for status messaging.
    pub fn search(&self) -> SearchOutcome {
        let shops = self.shops.lock();
        let Some(center) = *self.center.lock() else {
            return SearchOutcome {
                hits: Vec::new(),
                missing_coordinates: shops.iter().filter(|shop| !shop.has_coordinate()).count(),
            };
        };
        let radius = *self.radius_meters.lock();
        let filter = self.voucher_filter.lock().clone();
        query::search(&shops, center, radius, |shop| {
            filter
                .as_deref()
                .map(|category| shop.voucher_category == category)
                .unwrap_or(true)
        })
    }

    /// Runs the geocode batch for every shop still missing coordinates. A
    /// call while a batch is active reports progress instead of starting a
    /// second run.
    pub async fn start_geocoding(&self, observer: Option<ProgressObserver>) -> BatchOutcome {
        self.orchestrator.resolve_all(&self.shops, observer).await
    }

    /// Like `start_geocoding`, but each progress notification also schedules
    /// a debounced re-query so partial results reach `deliver` incrementally.
    pub async fn start_geocoding_incremental(
        self: &Arc<Self>,
        deliver: Arc<dyn Fn(SearchOutcome) + Send + Sync>,
    ) -> BatchOutcome {
        let session = Arc::clone(self);
        let observer: ProgressObserver = Arc::new(move |_progress| {
            let deliver = Arc::clone(&deliver);
            session.schedule_requery(move |outcome| deliver(outcome));
        });
        self.start_geocoding(Some(observer)).await
    }

    pub fn geocode_progress(&self) -> Option<GeocodeProgress> {
        self.orchestrator.progress()
    }

    pub fn is_geocoding(&self) -> bool {
        self.orchestrator.is_running()
    }

    /// Debounced re-evaluation for rapid input changes (radius slider,
    /// filter toggle): triggers within the quiescence window collapse into
    /// one query, latest scheduled evaluation wins.
    pub fn schedule_requery<F>(self: &Arc<Self>, deliver: F)
    where
        F: FnOnce(SearchOutcome) + Send + 'static,
    {
        let session = Arc::clone(self);
        self.debouncer.trigger(move || async move {
            deliver(session.search());
        });
    }
}
