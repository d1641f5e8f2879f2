use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use strada_core::distance::{Distance, Meters};
use strada_core::geopoint::GeoPoint;
use strada_core::router::{ConnectorError, ConnectorRouter, RoutedConnector};

#[derive(Debug, Error)]
pub enum OsrmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("No route between the requested points")]
    NoRoute,

    #[error("Incomplete response")]
    IncompleteResponse,

    #[error("Request failed after {0} attempts")]
    Exhausted(u32),
}

#[derive(Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    /// Distance in meters
    distance: f64,

    /// Travel time in seconds
    duration: f64,

    geometry: OsrmGeometry,
}

/// GeoJSON LineString, coordinates ordered lng,lat.
#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

pub struct OsrmClientParams {
    pub osrm_url: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for OsrmClientParams {
    fn default() -> OsrmClientParams {
        OsrmClientParams {
            osrm_url: String::from("http://localhost:5000"),
            request_timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

pub const OSRM_ROUTE_API_PATH: &str = "/route/v1/driving/";

pub struct OsrmClient {
    params: OsrmClientParams,
    client: reqwest::Client,
}

impl OsrmClient {
    pub fn new(params: OsrmClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<RoutedConnector, OsrmError> {
        let mut url = self.params.osrm_url.clone();
        url.push_str(OSRM_ROUTE_API_PATH);
        url.push_str(&format!("{},{};{},{}", from.lng, from.lat, to.lng, to.lat));

        let mut last_error = None;

        for attempt in 1..=self.params.max_attempts {
            match self.route_request(&url).await {
                Ok(connector) => return Ok(connector),
                // NoRoute is a definitive answer, retrying cannot change it.
                Err(OsrmError::NoRoute) => return Err(OsrmError::NoRoute),
                Err(err) => {
                    warn!(attempt, error = %err, "OSRM route request failed");
                    last_error = Some(err);
                    if attempt < self.params.max_attempts {
                        tokio::time::sleep(self.params.retry_backoff * attempt).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(OsrmError::Exhausted(self.params.max_attempts)))
    }

    async fn route_request(&self, url: &str) -> Result<RoutedConnector, OsrmError> {
        let response = self
            .client
            .get(url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .timeout(self.params.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(OsrmError::Api { status, message });
        }

        let decoded: RouteResponse = response.json().await?;
        if decoded.code != "Ok" {
            return Err(OsrmError::NoRoute);
        }

        let route = decoded.routes.first().ok_or(OsrmError::IncompleteResponse)?;

        debug!(
            distance = route.distance,
            duration = route.duration,
            "OSRM route fetched"
        );

        Ok(RoutedConnector {
            geometry: route
                .geometry
                .coordinates
                .iter()
                .map(|&[lng, lat]| GeoPoint::new(lat, lng))
                .collect(),
            distance: Distance::<Meters>::from(route.distance),
            duration_s: route.duration,
        })
    }
}

impl ConnectorRouter for OsrmClient {
    async fn route_between(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<RoutedConnector, ConnectorError> {
        match self.fetch_route(from, to).await {
            Ok(connector) => Ok(connector),
            Err(OsrmError::NoRoute) => Err(ConnectorError::NoRoute),
            Err(err) => Err(ConnectorError::Unavailable(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_route_response() {
        let body = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 1524.3,
                "duration": 182.9,
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[13.388, 52.517], [13.397, 52.529]]
                }
            }]
        }"#;

        let decoded: RouteResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.code, "Ok");
        assert_eq!(decoded.routes[0].distance, 1524.3);
        assert_eq!(
            decoded.routes[0].geometry.coordinates[0],
            [13.388, 52.517]
        );
    }

    #[test]
    fn missing_routes_field_defaults_to_empty() {
        let decoded: RouteResponse = serde_json::from_str(r#"{"code": "NoRoute"}"#).unwrap();
        assert_ne!(decoded.code, "Ok");
        assert!(decoded.routes.is_empty());
    }
}
