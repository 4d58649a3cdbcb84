//! Geolocation chain.
//!
//! Locators are tried in order; each attempt is bounded by a timeout and the
//! chain always ends at [`DEFAULT_LOCATION`], so start-up never waits on a
//! location prompt or a slow lookup.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PermissionError;

/// Jakarta, used whenever no locator can produce a position.
pub const DEFAULT_LOCATION: GeoCoordinate = GeoCoordinate {
    latitude: -6.2088,
    longitude: 106.8456,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn locate(&self) -> Result<GeoCoordinate, PermissionError>;
}

/// Where the session coordinate came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located {
    pub coordinate: GeoCoordinate,
    pub source: &'static str,
}

pub async fn resolve_location(locators: &[Box<dyn Geolocator>], per_attempt: Duration) -> Located {
    for locator in locators {
        match tokio::time::timeout(per_attempt, locator.locate()).await {
            Ok(Ok(coordinate)) if coordinate.is_valid() => {
                tracing::info!(
                    source = locator.name(),
                    latitude = coordinate.latitude,
                    longitude = coordinate.longitude,
                    "Location resolved"
                );
                return Located { coordinate, source: locator.name() };
            }
            Ok(Ok(coordinate)) => {
                tracing::warn!(source = locator.name(), ?coordinate, "Locator returned an invalid coordinate");
            }
            Ok(Err(e)) => {
                tracing::warn!(source = locator.name(), error = %e, "Locator failed");
            }
            Err(_) => {
                tracing::warn!(source = locator.name(), "Locator timed out");
            }
        }
    }

    tracing::info!("Falling back to the default location");
    Located { coordinate: DEFAULT_LOCATION, source: "default" }
}

// ============================================================================
// Locators
// ============================================================================

/// Coordinate from `config.json` or `--lat/--lon`.
pub struct ConfiguredLocation(pub Option<GeoCoordinate>);

#[async_trait]
impl Geolocator for ConfiguredLocation {
    fn name(&self) -> &'static str {
        "config"
    }

    async fn locate(&self) -> Result<GeoCoordinate, PermissionError> {
        self.0
            .ok_or_else(|| PermissionError::Geolocation("no coordinate configured".into()))
    }
}

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Approximate position from the public IP address (opt-in).
pub struct IpLocator {
    client: reqwest::Client,
    url: String,
}

impl IpLocator {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_url(client, "http://ip-api.com/json".into())
    }

    pub fn with_url(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl Geolocator for IpLocator {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn locate(&self) -> Result<GeoCoordinate, PermissionError> {
        let unavailable = |e: reqwest::Error| PermissionError::Geolocation(e.to_string());
        let body: IpApiResponse = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(latitude), Some(longitude)) => Ok(GeoCoordinate { latitude, longitude }),
            _ => Err(PermissionError::Geolocation(
                body.message.unwrap_or_else(|| format!("lookup status {}", body.status)),
            )),
        }
    }
}
