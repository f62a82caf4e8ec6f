use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppResult;
use crate::geo::Coordinate;

// Key namespace version; bump on cache-format changes so old entries are
// simply never read again instead of being migrated.
const CACHE_KEY_VERSION: &str = "v1";

pub const SOURCE_GEOCODER: &str = "geocoder";
pub const SOURCE_BULK: &str = "bulk";

/// Persisted per-shop coordinate record. Never expires automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCoordinate {
    pub lat: f64,
    pub lng: f64,
    pub cached_at: DateTime<Utc>,
    pub source: String,
}

impl CachedCoordinate {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Durable shop-id → coordinate store.
///
/// Storage trouble is never fatal to the pipeline: reads degrade to `None`
/// and writes no-op, with a log line either way.
#[derive(Clone)]
pub struct CoordinateCache {
    conn: Arc<Mutex<Connection>>,
}

impl CoordinateCache {
    pub fn open(data_dir: &Path, file_name: &str) -> AppResult<Self> {
        fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join(file_name))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("in-memory sqlite");
        Self::from_connection(conn).expect("in-memory cache migrations")
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS coordinate_cache (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (DATETIME('now'))
            );
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn key(shop_id: &str) -> String {
        format!("coord:{CACHE_KEY_VERSION}:{shop_id}")
    }

    pub fn get(&self, shop_id: &str) -> Option<CachedCoordinate> {
        let payload: Option<String> = {
            let conn = self.conn.lock();
            match conn
                .query_row(
                    "SELECT payload FROM coordinate_cache WHERE key = ?1",
                    [Self::key(shop_id)],
                    |row| row.get(0),
                )
                .optional()
            {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%err, shop_id, "coordinate cache read failed");
                    return None;
                }
            }
        };

        let payload = payload?;
        match serde_json::from_str::<CachedCoordinate>(&payload) {
            Ok(entry) if entry.coordinate().is_finite() => Some(entry),
            Ok(_) => None,
            Err(err) => {
                debug!(%err, shop_id, "discarding unparseable cache entry");
                None
            }
        }
    }

    pub fn set(&self, shop_id: &str, coordinate: Coordinate, source: &str) {
        let entry = CachedCoordinate {
            lat: coordinate.lat,
            lng: coordinate.lng,
            cached_at: Utc::now(),
            source: source.to_string(),
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, shop_id, "failed to encode cache entry");
                return;
            }
        };

        let conn = self.conn.lock();
        if let Err(err) = conn.execute(
            "INSERT INTO coordinate_cache (key, payload, updated_at)
            VALUES (?1, ?2, DATETIME('now'))
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at",
            (Self::key(shop_id), payload),
        ) {
            warn!(%err, shop_id, "coordinate cache write failed");
        }
    }
}
