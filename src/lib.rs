mod address;
mod cache;
mod config;
mod dataset;
mod debounce;
mod errors;
mod geo;
mod geocoder;
mod orchestrator;
mod query;
mod resolver;
mod session;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use address::{normalize, query_candidates, simplify};
pub use cache::{CachedCoordinate, CoordinateCache, SOURCE_BULK, SOURCE_GEOCODER};
pub use config::AppConfig;
pub use dataset::{load_bulk_coordinates, load_shops, Shop};
pub use debounce::Debouncer;
pub use errors::{AppError, AppResult, LocateError};
pub use geo::{distance_meters, Coordinate, EARTH_RADIUS_METERS};
pub use geocoder::{GeocodeLookup, GeocoderService, HttpGeocodeClient};
pub use orchestrator::{
    BatchOutcome, GeocodeBatchStats, GeocodeOrchestrator, GeocodeProgress, ProgressObserver,
};
pub use query::{search, RankedShop, SearchOutcome};
pub use resolver::{resolve_coordinates, ResolutionStats};
pub use session::Session;

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,shop_radar=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
