use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::types::internal::audit::GeoInfo;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Geolocation request failed: {0}")]
    Request(String),

    #[error("Geolocation response malformed: {0}")]
    Malformed(String),
}

/// External IP-to-geolocation lookup
///
/// This core never resolves geolocation itself; it consumes a service that
/// maps an IP string to country/city/region/coordinates.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Resolve an IP address; `Ok(None)` means the service had no data.
    async fn resolve(&self, ip: &str) -> Result<Option<GeoInfo>, GeoError>;
}

/// Resolver that never returns data; used when no lookup URL is configured
/// and in tests.
pub struct NullGeoResolver;

#[async_trait]
impl GeoResolver for NullGeoResolver {
    async fn resolve(&self, _ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct GeoLookupResponse {
    country: Option<String>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// HTTP resolver against an ip-api-style endpoint: `GET {base_url}/{ip}`
/// returning `{country, city, regionName, lat, lon}`.
pub struct HttpGeoResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeoResolver {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }
}

#[async_trait]
impl GeoResolver for HttpGeoResolver {
    async fn resolve(&self, ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), ip);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeoError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Request(format!(
                "lookup returned status {}",
                response.status()
            )));
        }

        let body: GeoLookupResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Malformed(e.to_string()))?;

        if body.country.is_none() && body.city.is_none() && body.lat.is_none() {
            return Ok(None);
        }

        Ok(Some(GeoInfo {
            country: body.country,
            city: body.city,
            region: body.region,
            latitude: body.lat,
            longitude: body.lon,
        }))
    }
}
