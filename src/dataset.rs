use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::geo::Coordinate;

/// One point-of-interest record from the fixed input dataset.
///
/// Coordinates start unset and are filled in by the resolver or the geocode
/// orchestrator; everything else is read-only for the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub voucher_category: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub full_address: String,
    // Never read from the dataset; filled by the resolver or orchestrator.
    #[serde(skip_deserializing)]
    pub coordinate: Option<Coordinate>,
}

impl Shop {
    /// True only when the shop has usable coordinates.
    pub fn has_coordinate(&self) -> bool {
        self.coordinate.map(|c| c.is_finite()).unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct BulkEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    id: String,
    lat: f64,
    lng: f64,
}

/// Reads the shop dataset once at startup. A missing file or a top-level
/// shape other than a JSON array is fatal; individual field absence is not
/// validated and defaults to empty.
pub fn load_shops(path: &Path) -> AppResult<Vec<Shop>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| AppError::Dataset(format!("failed to read {}: {err}", path.display())))?;
    let value: Value = serde_json::from_str(&contents)
        .map_err(|err| AppError::Dataset(format!("failed to parse {}: {err}", path.display())))?;
    shops_from_value(value)
}

fn shops_from_value(value: Value) -> AppResult<Vec<Shop>> {
    let Value::Array(entries) = value else {
        return Err(AppError::Dataset("shop dataset must be a JSON array".into()));
    };
    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry)
                .map_err(|err| AppError::Dataset(format!("malformed shop record: {err}")))
        })
        .collect()
}

/// Best-effort read of the optional pre-geocoded bulk file. Any read or
/// parse failure is logged and ignored; entries with non-finite coordinates
/// are dropped.
pub fn load_bulk_coordinates(path: &Path) -> Option<HashMap<String, Coordinate>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(path = %path.display(), %err, "bulk coordinate file unavailable");
            return None;
        }
    };
    let entries: Vec<BulkEntry> = match serde_json::from_str(&contents) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring unparseable bulk coordinate file");
            return None;
        }
    };

    Some(
        entries
            .into_iter()
            .map(|entry| (entry.id, Coordinate::new(entry.lat, entry.lng)))
            .filter(|(_, coordinate)| coordinate.is_finite())
            .collect(),
    )
}

// Dataset ids appear both as JSON strings and bare numbers; both coerce to
// the string form used as the cache key.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
