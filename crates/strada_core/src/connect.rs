use tracing::{debug, warn};

use crate::components::connected_components;
use crate::error::GenerationWarning;
use crate::network::StreetNetwork;
use crate::router::{ConnectorError, ConnectorRouter, RoutedConnector};

#[derive(Debug, Default)]
pub struct ConnectivityOutcome {
    pub connectors_added: usize,
    pub warnings: Vec<GenerationWarning>,
}

/// Merge all components of the network into one by inserting synthetic
/// connector edges. Each round bridges the two closest components (minimum
/// endpoint-to-endpoint geodesic distance) with an externally routed path;
/// when routing fails the connector degrades to a straight line and a
/// warning is recorded instead of aborting.
pub async fn resolve_connectivity<R: ConnectorRouter>(
    network: &mut StreetNetwork,
    router: &R,
) -> ConnectivityOutcome {
    let mut outcome = ConnectivityOutcome::default();

    loop {
        let components = connected_components(network);
        if components.len() <= 1 {
            break;
        }

        let Some((from_node, to_node)) = closest_component_pair(network, &components) else {
            break;
        };

        let from = network.node(from_node).point;
        let to = network.node(to_node).point;

        match router.route_between(from, to).await {
            Ok(RoutedConnector {
                mut geometry,
                distance,
                duration_s,
            }) if !distance.is_zero() => {
                // Anchor the routed geometry to the exact node coordinates so
                // chunk polylines stay continuous.
                if geometry.first() != Some(&from) {
                    geometry.insert(0, from);
                }
                if geometry.last() != Some(&to) {
                    geometry.push(to);
                }

                debug!(%distance, "bridging components with routed connector");
                network.add_connector(
                    from_node,
                    to_node,
                    geometry,
                    distance,
                    Some(duration_s),
                    false,
                );
            }
            Ok(_) => {
                outcome
                    .warnings
                    .extend(straight_line_connector(network, from_node, to_node, None));
            }
            Err(error) => {
                outcome.warnings.extend(straight_line_connector(
                    network,
                    from_node,
                    to_node,
                    Some(error),
                ));
            }
        }

        outcome.connectors_added += 1;
    }

    outcome
}

/// Insert the geodesic straight-line fallback connector and produce the
/// matching warnings.
pub fn straight_line_connector(
    network: &mut StreetNetwork,
    from_node: usize,
    to_node: usize,
    error: Option<ConnectorError>,
) -> Vec<GenerationWarning> {
    let from = network.node(from_node).point;
    let to = network.node(to_node).point;
    let distance = from.haversine_distance(&to);

    warn!(%distance, "routing unavailable, falling back to straight-line connector");

    network.add_connector(from_node, to_node, vec![from, to], distance, None, true);

    let mut warnings = Vec::new();
    if let Some(error) = error {
        warnings.push(GenerationWarning::ExternalRoutingFailure {
            detail: error.to_string(),
        });
    }
    warnings.push(GenerationWarning::ConnectivityDegraded {
        from,
        to,
        distance_m: distance.value(),
    });
    warnings
}

fn closest_component_pair(
    network: &StreetNetwork,
    components: &[Vec<usize>],
) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut best_distance = None;

    for (i, first) in components.iter().enumerate() {
        for second in components.iter().skip(i + 1) {
            for &a in first {
                let pa = network.node(a).point;
                for &b in second {
                    let d = pa.haversine_distance(&network.node(b).point);
                    if best_distance.is_none_or(|current| d < current) {
                        best_distance = Some(d);
                        best = Some((a, b));
                    }
                }
            }
        }
    }

    best
}
