//! Trip distance resolution.
//!
//! Provides a `RoutingBackend` trait with an OpenRouteService implementation,
//! and a `DistanceResolver` that turns a waypoint sequence into a one-way
//! distance. Resolution is strictly best-effort: without a configured
//! backend, or when any leg fails, the resolver degrades to the manually
//! supplied miles and never returns an error.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    config::AppConfig,
    models::trip::{DistanceLeg, DistanceSource, ResolvedDistance, Stop},
};

const ORS_GEOCODE_URL: &str = "https://api.openrouteservice.org/geocode/search";
const ORS_DIRECTIONS_URL: &str = "https://api.openrouteservice.org/v2/directions/driving-car";

const GEOCODE_TIMEOUT: Duration = Duration::from_secs(12);
const DIRECTIONS_TIMEOUT: Duration = Duration::from_secs(15);

const METERS_PER_MILE: f64 = 1609.344;

/// `[lon, lat]`, the order OpenRouteService speaks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected routing response: {0}")]
    Malformed(String),
}

/// Abstraction over the external geocode + route capability.
#[async_trait]
pub trait RoutingBackend: Send + Sync {
    /// Geocodes an address. `Ok(None)` means the service answered but found
    /// no match.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, DistanceError>;

    /// Driving distance between two coordinates, in miles.
    async fn route_miles(&self, from: Coordinate, to: Coordinate) -> Result<f64, DistanceError>;
}

/// OpenRouteService (Pelias geocoding + driving-car directions).
pub struct OrsBackend {
    client: Client,
    api_key: String,
}

impl OrsBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeocodeFeature>,
}

#[derive(Deserialize)]
struct GeocodeFeature {
    geometry: GeocodeGeometry,
}

#[derive(Deserialize)]
struct GeocodeGeometry {
    coordinates: Vec<f64>,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    features: Vec<DirectionsFeature>,
}

#[derive(Deserialize)]
struct DirectionsFeature {
    properties: DirectionsProperties,
}

#[derive(Deserialize)]
struct DirectionsProperties {
    summary: DirectionsSummary,
}

#[derive(Deserialize)]
struct DirectionsSummary {
    /// Meters.
    distance: f64,
}

#[async_trait]
impl RoutingBackend for OrsBackend {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, DistanceError> {
        let response: GeocodeResponse = self
            .client
            .get(ORS_GEOCODE_URL)
            .header("Authorization", &self.api_key)
            .query(&[("text", address), ("size", "1")])
            .timeout(GEOCODE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(feature) = response.features.into_iter().next() else {
            return Ok(None);
        };
        match feature.geometry.coordinates.as_slice() {
            [lon, lat, ..] => Ok(Some(Coordinate {
                lon: *lon,
                lat: *lat,
            })),
            other => Err(DistanceError::Malformed(format!(
                "geocode coordinates had {} components",
                other.len()
            ))),
        }
    }

    async fn route_miles(&self, from: Coordinate, to: Coordinate) -> Result<f64, DistanceError> {
        let body = serde_json::json!({
            "coordinates": [[from.lon, from.lat], [to.lon, to.lat]],
        });
        let response: DirectionsResponse = self
            .client
            .post(ORS_DIRECTIONS_URL)
            .header("Authorization", &self.api_key)
            .json(&body)
            .timeout(DIRECTIONS_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let meters = response
            .features
            .first()
            .map(|feature| feature.properties.summary.distance)
            .ok_or_else(|| DistanceError::Malformed("directions response had no routes".into()))?;
        Ok(meters / METERS_PER_MILE)
    }
}

#[derive(Clone)]
pub struct DistanceResolver {
    backend: Option<Arc<dyn RoutingBackend>>,
}

impl DistanceResolver {
    pub fn new(backend: Option<Arc<dyn RoutingBackend>>) -> Self {
        Self { backend }
    }

    /// No ORS key means no backend, permanently: manual entry only.
    pub fn from_config(config: &AppConfig) -> Self {
        let backend = config
            .ors_api_key
            .clone()
            .map(|key| Arc::new(OrsBackend::new(key)) as Arc<dyn RoutingBackend>);
        Self::new(backend)
    }

    pub fn routing_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Resolves the one-way distance for a submission.
    ///
    /// Legs are all-or-nothing: if any consecutive waypoint pair fails to
    /// geocode or route, the entire resolved path is abandoned and no
    /// partial leg data survives. `extra_miles` is added on either path; it
    /// models distance the router cannot see (parking-lot detours and the
    /// like). Never fails — external errors degrade to manual miles.
    pub async fn resolve(
        &self,
        start_address: &str,
        stops: &[Stop],
        end_address: &str,
        manual_one_way_miles: f64,
        extra_miles: f64,
    ) -> ResolvedDistance {
        if let Some(backend) = &self.backend {
            if !start_address.trim().is_empty() && !end_address.trim().is_empty() {
                if let Some((total, legs)) =
                    self.resolve_legs(backend.as_ref(), start_address, stops, end_address).await
                {
                    return ResolvedDistance {
                        one_way_miles: total + extra_miles,
                        source: DistanceSource::Resolved,
                        legs,
                    };
                }
            }
        }

        ResolvedDistance {
            one_way_miles: manual_one_way_miles + extra_miles,
            source: DistanceSource::Manual,
            legs: Vec::new(),
        }
    }

    async fn resolve_legs(
        &self,
        backend: &dyn RoutingBackend,
        start_address: &str,
        stops: &[Stop],
        end_address: &str,
    ) -> Option<(f64, Vec<DistanceLeg>)> {
        let mut points = vec![start_address];
        points.extend(
            stops
                .iter()
                .map(|stop| stop.address.as_str())
                .filter(|address| !address.trim().is_empty()),
        );
        points.push(end_address);

        let mut total = 0.0;
        let mut legs = Vec::with_capacity(points.len() - 1);
        for pair in points.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let miles = self.leg_miles(backend, from, to).await?;
            total += miles;
            legs.push(DistanceLeg {
                from: from.to_string(),
                to: to.to_string(),
                miles,
            });
        }
        Some((total, legs))
    }

    /// One leg; `None` on any failure, which sinks the whole resolved path.
    async fn leg_miles(&self, backend: &dyn RoutingBackend, from: &str, to: &str) -> Option<f64> {
        let from_coord = match backend.geocode(from).await {
            Ok(Some(coord)) => coord,
            Ok(None) => {
                warn!(address = %from, "no geocode match, falling back to manual miles");
                return None;
            }
            Err(err) => {
                warn!(address = %from, "geocoding failed, falling back to manual miles: {err}");
                return None;
            }
        };
        let to_coord = match backend.geocode(to).await {
            Ok(Some(coord)) => coord,
            Ok(None) => {
                warn!(address = %to, "no geocode match, falling back to manual miles");
                return None;
            }
            Err(err) => {
                warn!(address = %to, "geocoding failed, falling back to manual miles: {err}");
                return None;
            }
        };
        match backend.route_miles(from_coord, to_coord).await {
            Ok(miles) => Some(miles),
            Err(err) => {
                warn!(%from, %to, "routing failed, falling back to manual miles: {err}");
                None
            }
        }
    }
}
