use std::future::Future;

use thiserror::Error;

use crate::distance::{Distance, Meters};
use crate::geopoint::GeoPoint;

/// A point-to-point driving route obtained from an external routing service,
/// used to bridge disconnected components and to auto-resolve gaps.
#[derive(Debug, Clone)]
pub struct RoutedConnector {
    pub geometry: Vec<GeoPoint>,
    pub distance: Distance<Meters>,
    pub duration_s: f64,
}

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("routing service unavailable: {0}")]
    Unavailable(String),
    #[error("no route between the given points")]
    NoRoute,
}

/// The external routing seam. The engine takes an implementation as a
/// constructor parameter; it never reaches for a module-level client.
pub trait ConnectorRouter {
    fn route_between(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> impl Future<Output = Result<RoutedConnector, ConnectorError>> + Send;
}

/// Router that never routes. Every request falls back to the straight-line
/// connector path, which keeps generation usable without a routing service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRouter;

impl ConnectorRouter for NoRouter {
    async fn route_between(
        &self,
        _from: GeoPoint,
        _to: GeoPoint,
    ) -> Result<RoutedConnector, ConnectorError> {
        Err(ConnectorError::Unavailable(String::from(
            "no routing service configured",
        )))
    }
}
