use serde::Serialize;
use tracing::info;

use crate::chunker::{Chunk, chunk_walk};
use crate::connect::resolve_connectivity;
use crate::distance::{Distance, Meters};
use crate::error::{GenerationError, GenerationWarning};
use crate::eulerize::eulerize;
use crate::gaps::{Gap, GapPolicy, detect_gaps, resolve_gaps};
use crate::geopoint::GeoPoint;
use crate::network::{BuildOptions, NetworkBuilder};
use crate::osm::RawWay;
use crate::router::ConnectorRouter;
use crate::tags::WayFilter;

const DEFAULT_CHUNK_DURATION_S: f64 = 3600.0;

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Snapped to the nearest graph node; an arbitrary node when absent.
    pub start_point: Option<GeoPoint>,
    /// Enables U-turn gap reporting for dead-end streets.
    pub coverage_mode: bool,
    pub chunk_duration_s: f64,
    /// Accepted for callers; an Eulerian circuit always closes on its start
    /// node, so no extra work is needed either way.
    pub return_to_start: bool,
    pub include_service_roads: bool,
    pub include_private_roads: bool,
    pub respect_restrictions: bool,
    pub gap_policy: GapPolicy,
}

impl Default for GenerationConfig {
    fn default() -> GenerationConfig {
        GenerationConfig {
            start_point: None,
            coverage_mode: false,
            chunk_duration_s: DEFAULT_CHUNK_DURATION_S,
            return_to_start: true,
            include_service_roads: false,
            include_private_roads: false,
            respect_restrictions: true,
            gap_policy: GapPolicy::Auto,
        }
    }
}

impl GenerationConfig {
    fn validate(&self) -> Result<(), GenerationError> {
        if !self.chunk_duration_s.is_finite() || self.chunk_duration_s <= 0.0 {
            return Err(GenerationError::InvalidConfiguration(format!(
                "chunk duration must be positive, got {}",
                self.chunk_duration_s
            )));
        }
        if let Some(point) = self.start_point {
            if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lng) {
                return Err(GenerationError::InvalidConfiguration(format!(
                    "start point out of range: {}, {}",
                    point.lat, point.lng
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteTotals {
    pub distance: Distance<Meters>,
    pub duration_s: f64,
    pub deadhead_distance: Distance<Meters>,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub chunks: Vec<Chunk>,
    pub totals: RouteTotals,
    pub gaps: Vec<Gap>,
    pub warnings: Vec<GenerationWarning>,
}

/// Drives the full pipeline: graph build, gap handling, connectivity
/// stitching, Eulerization and chunking. Holds no mutable state of its own;
/// the router is the only awaited collaborator.
pub struct RouteGenerator<R: ConnectorRouter> {
    router: R,
}

impl<R: ConnectorRouter> RouteGenerator<R> {
    pub fn new(router: R) -> RouteGenerator<R> {
        RouteGenerator { router }
    }

    pub async fn generate(
        &self,
        ways: &[RawWay],
        config: &GenerationConfig,
    ) -> Result<GenerationResult, GenerationError> {
        config.validate()?;

        let options = BuildOptions {
            filter: WayFilter {
                include_service_roads: config.include_service_roads,
                include_private_roads: config.include_private_roads,
            },
            respect_restrictions: config.respect_restrictions,
        };
        let mut network = NetworkBuilder::new(options).build(ways)?;
        info!(
            nodes = network.node_count(),
            segments = network.segment_count(),
            "built street network"
        );

        let mut gaps = detect_gaps(&network, config.coverage_mode);
        let mut warnings =
            resolve_gaps(&mut network, &mut gaps, config.gap_policy, &self.router).await;

        let connectivity = resolve_connectivity(&mut network, &self.router).await;
        warnings.extend(connectivity.warnings);

        let start_node = match &config.start_point {
            Some(point) => network
                .nearest_node(point)
                .ok_or(GenerationError::EmptyNetwork)?,
            None => 0,
        };

        let walk = eulerize(&network, start_node)?;
        let chunks = chunk_walk(&walk, config.chunk_duration_s)?;

        info!(
            distance_m = walk.distance().value(),
            duration_s = walk.duration_s(),
            chunks = chunks.len(),
            "generated coverage route"
        );

        Ok(GenerationResult {
            totals: RouteTotals {
                distance: walk.distance(),
                duration_s: walk.duration_s(),
                deadhead_distance: walk.deadhead_distance(),
                chunk_count: chunks.len(),
            },
            chunks,
            gaps,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_duration_is_one_hour() {
        let config = GenerationConfig::default();
        assert_eq!(config.chunk_duration_s, 3600.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_chunk_duration() {
        let config = GenerationConfig {
            chunk_duration_s: 0.0,
            ..GenerationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GenerationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_start_point() {
        let config = GenerationConfig {
            start_point: Some(GeoPoint::new(91.0, 0.0)),
            ..GenerationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GenerationError::InvalidConfiguration(_))
        ));
    }
}
