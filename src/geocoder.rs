use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use serde_json::Value;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::geo::Coordinate;

/// Single address → coordinate lookup. A logical no-match is `Ok(None)`;
/// only transport failures and unparseable bodies are errors.
#[async_trait]
pub trait GeocodeLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> AppResult<Option<Coordinate>>;
}

#[derive(Clone)]
pub struct GeocoderService {
    inner: Arc<dyn GeocodeLookup>,
}

impl GeocoderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            inner: Arc::new(HttpGeocodeClient::new(config)),
        }
    }

    pub fn from_lookup(inner: Arc<dyn GeocodeLookup>) -> Self {
        Self { inner }
    }

    pub async fn lookup(&self, query: &str) -> AppResult<Option<Coordinate>> {
        self.inner.lookup(query).await
    }
}

pub struct HttpGeocodeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpGeocodeClient {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("shop-radar/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .expect("geocoder http client");
        Self {
            http,
            endpoint: config.geocoder_endpoint.clone(),
        }
    }
}

#[async_trait]
impl GeocodeLookup for HttpGeocodeClient {
    async fn lookup(&self, query: &str) -> AppResult<Option<Coordinate>> {
        let response = self
            .http
            .get(&self.endpoint)
            .header(CACHE_CONTROL, "no-cache")
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), query, "geocoder returned non-success status");
            return Ok(None);
        }

        let body: Value = response.json().await?;
        Ok(first_feature_coordinate(&body))
    }
}

// The raw payload orders geometry coordinates [lng, lat]; swapped to
// lat-first here. Anything other than a non-empty feature array with a
// well-formed two-element pair is a no-match.
fn first_feature_coordinate(body: &Value) -> Option<Coordinate> {
    let first = body.as_array()?.first()?;
    let pair = first.get("geometry")?.get("coordinates")?.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let lng = pair[0].as_f64()?;
    let lat = pair[1].as_f64()?;
    let coordinate = Coordinate::new(lat, lng);
    coordinate.is_finite().then_some(coordinate)
}
