use std::{env, io};

use tracing::debug;

const DEFAULT_GEOCODER_ENDPOINT: &str = "https://msearch.gsi.go.jp/address-search/AddressSearch";
const DEFAULT_GEOCODE_DELAY_MS: u64 = 700;
const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 250;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RADIUS_METERS: f64 = 500.0;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub geocoder_endpoint: String,
    pub geocode_delay_ms: u64,
    pub debounce_window_ms: u64,
    pub http_timeout_secs: u64,
    pub default_radius_meters: f64,
    pub cache_file_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            geocoder_endpoint: env::var("GEOCODER_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEOCODER_ENDPOINT.to_string()),
            geocode_delay_ms: parse_u64("GEOCODE_DELAY_MS", DEFAULT_GEOCODE_DELAY_MS),
            debounce_window_ms: parse_u64("DEBOUNCE_WINDOW_MS", DEFAULT_DEBOUNCE_WINDOW_MS),
            http_timeout_secs: parse_u64("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            default_radius_meters: parse_f64("DEFAULT_RADIUS_METERS", DEFAULT_RADIUS_METERS),
            cache_file_name: env::var("CACHE_FILE_NAME")
                .unwrap_or_else(|_| "shop-coordinates.db".to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            geocoder_endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            geocode_delay_ms: DEFAULT_GEOCODE_DELAY_MS,
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            default_radius_meters: DEFAULT_RADIUS_METERS,
            cache_file_name: "shop-coordinates.db".to_string(),
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_env_free_load() {
        let defaults = AppConfig::default();
        assert_eq!(defaults.geocode_delay_ms, 700);
        assert_eq!(defaults.debounce_window_ms, 250);
        assert_eq!(defaults.default_radius_meters, 500.0);
        assert!(!defaults.geocoder_endpoint.is_empty());
    }

    #[test]
    fn env_overrides_are_applied() {
        env::set_var("GEOCODE_DELAY_MS", "50");
        env::set_var("CACHE_FILE_NAME", "custom.db");

        let config = AppConfig::from_env();
        assert_eq!(config.geocode_delay_ms, 50);
        assert_eq!(config.cache_file_name, "custom.db");

        env::remove_var("GEOCODE_DELAY_MS");
        env::remove_var("CACHE_FILE_NAME");
    }
}
