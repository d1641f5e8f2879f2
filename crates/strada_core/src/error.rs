use serde::Serialize;
use thiserror::Error;

use crate::geopoint::GeoPoint;

/// Fatal failure kinds. Any of these aborts the generation run; no partial
/// chunk output is produced.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no drivable segments survived filtering")]
    EmptyNetwork,
    #[error("degenerate segment: {0}")]
    DegenerateSegment(String),
    #[error("network cannot be eulerized: {0}")]
    UnroutableNetwork(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("cannot chunk an empty walk")]
    EmptyRoute,
}

/// Non-fatal degradations, returned alongside successful output so callers
/// can surface data-quality concerns.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationWarning {
    /// A component was bridged with a straight-line connector because the
    /// routing service produced no usable path.
    ConnectivityDegraded {
        from: GeoPoint,
        to: GeoPoint,
        distance_m: f64,
    },
    /// The routing service call itself failed; generation continued on the
    /// fallback path.
    ExternalRoutingFailure { detail: String },
}
