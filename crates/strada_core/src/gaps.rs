use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::Serialize;
use tracing::debug;

use crate::error::GenerationWarning;
use crate::geopoint::GeoPoint;
use crate::network::StreetNetwork;
use crate::router::{ConnectorRouter, RoutedConnector};

/// Endpoints closer than this are reported as gaps.
const GAP_DISTANCE_M: f64 = 50.0;
/// Below this separation a gap is a U-turn, not a missing connection.
const UTURN_DISTANCE_M: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    UTurn,
    Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapResolution {
    Unresolved,
    Auto,
    Manual,
    Skip,
}

/// How the caller wants detected gaps handled during generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GapPolicy {
    #[default]
    Auto,
    Manual,
    Skip,
}

/// A detected discontinuity between two dead-end endpoints that are not
/// already connected by a mapped street.
#[derive(Debug, Clone, Serialize)]
pub struct Gap {
    pub id: usize,
    pub from_node: usize,
    pub to_node: usize,
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub distance_m: f64,
    pub kind: GapKind,
    pub resolution: GapResolution,
}

/// Find dead-end endpoints within [`GAP_DISTANCE_M`] of each other that
/// share no segment. Symmetric pairs are reported once. U-turn-class gaps
/// are only reported in coverage mode.
pub fn detect_gaps(network: &StreetNetwork, coverage_mode: bool) -> Vec<Gap> {
    let dead_ends: Vec<GeomWithData<GeoPoint, usize>> = network
        .nodes()
        .iter()
        .filter(|node| network.node_segments(node.id).len() == 1)
        .map(|node| GeomWithData::new(node.point, node.id))
        .collect();

    let tree = RTree::bulk_load(dead_ends.clone());
    let mut gaps = Vec::new();

    for end in &dead_ends {
        let here = *end.geom();
        for other in tree.locate_within_distance([here.lng, here.lat], GAP_DISTANCE_M.powi(2)) {
            // Each symmetric pair surfaces once.
            if other.data <= end.data {
                continue;
            }
            if network.adjacent(end.data, other.data) {
                continue;
            }

            let distance_m = here.haversine_distance(other.geom()).value();
            let kind = if distance_m < UTURN_DISTANCE_M {
                GapKind::UTurn
            } else {
                GapKind::Connection
            };

            if kind == GapKind::UTurn && !coverage_mode {
                continue;
            }

            gaps.push(Gap {
                id: gaps.len(),
                from_node: end.data,
                to_node: other.data,
                from: here,
                to: *other.geom(),
                distance_m,
                kind,
                resolution: GapResolution::Unresolved,
            });
        }
    }

    debug!(count = gaps.len(), "detected gaps");
    gaps
}

/// Apply the caller's gap policy. Every gap transitions out of
/// `Unresolved` exactly once and is terminal afterwards; auto resolution
/// inserts a connector so the Euler walk can drive through the gap.
pub async fn resolve_gaps<R: ConnectorRouter>(
    network: &mut StreetNetwork,
    gaps: &mut [Gap],
    policy: GapPolicy,
    router: &R,
) -> Vec<GenerationWarning> {
    let mut warnings = Vec::new();

    for gap in gaps.iter_mut() {
        if gap.resolution != GapResolution::Unresolved {
            continue;
        }

        match policy {
            GapPolicy::Skip => {
                gap.resolution = GapResolution::Skip;
            }
            GapPolicy::Manual => {
                gap.resolution = GapResolution::Manual;
            }
            GapPolicy::Auto => {
                match gap.kind {
                    // A U-turn bridge is a few meters of reversal; routing
                    // it externally would only add noise.
                    GapKind::UTurn => {
                        let distance = gap.from.haversine_distance(&gap.to);
                        network.add_connector(
                            gap.from_node,
                            gap.to_node,
                            vec![gap.from, gap.to],
                            distance,
                            None,
                            false,
                        );
                    }
                    GapKind::Connection => match router.route_between(gap.from, gap.to).await {
                        Ok(RoutedConnector {
                            mut geometry,
                            distance,
                            duration_s,
                        }) if !distance.is_zero() => {
                            if geometry.first() != Some(&gap.from) {
                                geometry.insert(0, gap.from);
                            }
                            if geometry.last() != Some(&gap.to) {
                                geometry.push(gap.to);
                            }
                            network.add_connector(
                                gap.from_node,
                                gap.to_node,
                                geometry,
                                distance,
                                Some(duration_s),
                                false,
                            );
                        }
                        Ok(_) => {
                            warnings.extend(crate::connect::straight_line_connector(
                                network,
                                gap.from_node,
                                gap.to_node,
                                None,
                            ));
                        }
                        Err(error) => {
                            warnings.extend(crate::connect::straight_line_connector(
                                network,
                                gap.from_node,
                                gap.to_node,
                                Some(error),
                            ));
                        }
                    },
                }
                gap.resolution = GapResolution::Auto;
            }
        }
    }

    warnings
}
