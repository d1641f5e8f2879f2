//! Eulerization: minimum-cost edge duplication so that every node satisfies
//! the Eulerian balance condition, followed by walk construction.
//!
//! Undirected parity is repaired by matching odd-degree nodes and retracing
//! the shortest path between each matched pair. Oneway-induced in/out
//! imbalance is repaired first, by duplicating min-cost directed paths from
//! surplus-in to surplus-out nodes. Matching is exact (bitmask DP over
//! all-pairs shortest-path distances) up to [`MAX_EXACT_MATCHING`] odd
//! nodes and greedy nearest-pair beyond.

mod hierholzer;

use fxhash::FxHashMap;
use tracing::debug;

use crate::dijkstra::{shortest_path, shortest_path_lengths};
use crate::distance::{Distance, Meters};
use crate::edge_direction::EdgeDirection;
use crate::error::GenerationError;
use crate::geometry::reversed;
use crate::network::StreetNetwork;
use crate::walk::{EulerWalk, WalkStep};

/// Odd-degree node sets up to this size are matched exactly.
const MAX_EXACT_MATCHING: usize = 14;

/// One planned traversal of a segment. `required` is `None` for traversals
/// whose direction is free (two-way streets), `Some` when the traversal is
/// direction-bound (oneways and balance duplicates).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pass {
    pub segment: usize,
    pub required: Option<EdgeDirection>,
    pub deadhead: bool,
}

/// Construct an Euler walk over the (connected) network, starting at
/// `start_node`. Every segment is traversed at least once; duplicated
/// traversals are flagged as deadhead.
pub fn eulerize(
    network: &StreetNetwork,
    start_node: usize,
) -> Result<EulerWalk, GenerationError> {
    if network.segment_count() == 0 {
        return Err(GenerationError::UnroutableNetwork(String::from(
            "network has no segments",
        )));
    }

    let mut passes: Vec<Pass> = network
        .segments()
        .iter()
        .map(|segment| Pass {
            segment: segment.id(),
            required: segment.oneway().then_some(EdgeDirection::Forward),
            // Connectors exist to reach streets, not to be covered.
            deadhead: segment.is_synthetic(),
        })
        .collect();

    balance_directed(network, &mut passes)?;
    fix_parity(network, &mut passes)?;

    debug_assert!(all_degrees_even(network, &passes));

    let steps = hierholzer::construct(network, &passes, start_node)?;

    let walk = EulerWalk {
        steps: steps
            .iter()
            .map(|step| {
                let segment = network.segment(step.segment);
                let geometry = match step.direction {
                    EdgeDirection::Forward => segment.geometry().to_vec(),
                    EdgeDirection::Backward => reversed(segment.geometry()),
                };
                WalkStep {
                    segment: step.segment,
                    from_node: step.from_node,
                    to_node: step.to_node,
                    direction: step.direction,
                    geometry,
                    distance: segment.distance(),
                    duration_s: segment.duration_s(),
                    deadhead: step.deadhead,
                }
            })
            .collect(),
    };

    debug!(
        steps = walk.steps.len(),
        distance = %walk.distance(),
        deadhead = %walk.deadhead_distance(),
        "constructed Euler walk"
    );

    Ok(walk)
}

/// Repair oneway-induced in/out imbalance by duplicating min-cost directed
/// paths from surplus-in nodes (which need an extra departure) to
/// surplus-out nodes (which need an extra arrival).
fn balance_directed(
    network: &StreetNetwork,
    passes: &mut Vec<Pass>,
) -> Result<(), GenerationError> {
    let mut balance: FxHashMap<usize, i64> = FxHashMap::default();

    for pass in passes.iter() {
        let segment = network.segment(pass.segment);
        let (out_node, in_node) = match pass.required {
            Some(EdgeDirection::Forward) => (segment.start_node(), segment.end_node()),
            Some(EdgeDirection::Backward) => (segment.end_node(), segment.start_node()),
            None => continue,
        };
        *balance.entry(out_node).or_insert(0) -= 1;
        *balance.entry(in_node).or_insert(0) += 1;
    }

    let mut sources: FxHashMap<usize, i64> = FxHashMap::default(); // in > out
    let mut sinks: FxHashMap<usize, i64> = FxHashMap::default(); // out > in
    for (&node, &value) in &balance {
        if value > 0 {
            sources.insert(node, value);
        } else if value < 0 {
            sinks.insert(node, -value);
        }
    }

    if sources.is_empty() {
        return Ok(());
    }

    // Min-cost greedy assignment over all (source, sink) pairs, cheapest
    // path first.
    let sink_nodes: Vec<usize> = sinks.keys().copied().collect();
    let mut candidates: Vec<(Distance<Meters>, usize, usize)> = Vec::new();
    for &source in sources.keys() {
        let lengths = shortest_path_lengths(network, source, &sink_nodes);
        for (&sink, &cost) in &lengths {
            candidates.push((cost, source, sink));
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    for (_, source, sink) in candidates {
        loop {
            let source_left = sources.get(&source).copied().unwrap_or(0);
            let sink_left = sinks.get(&sink).copied().unwrap_or(0);
            if source_left == 0 || sink_left == 0 {
                break;
            }

            let path = shortest_path(network, source, sink).ok_or_else(|| {
                GenerationError::UnroutableNetwork(format!(
                    "no directed path to rebalance nodes {source} -> {sink}"
                ))
            })?;
            for traversal in &path.traversals {
                passes.push(Pass {
                    segment: traversal.segment,
                    required: Some(traversal.direction),
                    deadhead: true,
                });
            }

            sources.insert(source, source_left - 1);
            sinks.insert(sink, sink_left - 1);
        }
    }

    if sources.values().any(|&left| left > 0) {
        return Err(GenerationError::UnroutableNetwork(String::from(
            "irreparable in/out imbalance",
        )));
    }

    Ok(())
}

/// Repair odd total degree by matching odd nodes and retracing the shortest
/// path between each matched pair.
fn fix_parity(network: &StreetNetwork, passes: &mut Vec<Pass>) -> Result<(), GenerationError> {
    let odd = odd_degree_nodes(network, passes);
    if odd.is_empty() {
        return Ok(());
    }

    let costs = all_pairs_costs(network, &odd);
    let pairs = if odd.len() <= MAX_EXACT_MATCHING {
        exact_matching(&odd, &costs)
    } else {
        greedy_matching(&odd, &costs)
    };

    if pairs.len() * 2 != odd.len() {
        return Err(GenerationError::UnroutableNetwork(format!(
            "{} odd nodes could not be matched",
            odd.len() - pairs.len() * 2
        )));
    }

    for (a, b) in pairs {
        let path = shortest_path(network, a, b).ok_or_else(|| {
            GenerationError::UnroutableNetwork(format!(
                "no path between odd-degree nodes {a} and {b}"
            ))
        })?;
        for traversal in &path.traversals {
            let oneway = network.segment(traversal.segment).oneway();
            passes.push(Pass {
                segment: traversal.segment,
                // Oneway retraces stay direction-bound; two-way retraces keep
                // their direction free for walk construction.
                required: oneway.then_some(traversal.direction),
                deadhead: true,
            });
        }
    }

    Ok(())
}

fn odd_degree_nodes(network: &StreetNetwork, passes: &[Pass]) -> Vec<usize> {
    let mut degree = vec![0usize; network.node_count()];
    for pass in passes {
        let segment = network.segment(pass.segment);
        degree[segment.start_node()] += 1;
        degree[segment.end_node()] += 1;
    }
    degree
        .iter()
        .enumerate()
        .filter(|(_, d)| *d % 2 == 1)
        .map(|(node, _)| node)
        .collect()
}

fn all_degrees_even(network: &StreetNetwork, passes: &[Pass]) -> bool {
    odd_degree_nodes(network, passes).is_empty()
}

fn all_pairs_costs(network: &StreetNetwork, odd: &[usize]) -> Vec<Vec<f64>> {
    let mut costs = vec![vec![f64::INFINITY; odd.len()]; odd.len()];
    for (i, &from) in odd.iter().enumerate() {
        let lengths = shortest_path_lengths(network, from, odd);
        for (j, &to) in odd.iter().enumerate() {
            if i == j {
                costs[i][j] = 0.0;
            } else if let Some(&d) = lengths.get(&to) {
                costs[i][j] = d.value();
            }
        }
    }
    costs
}

/// Minimum-weight perfect matching via subset DP. `odd.len()` is always
/// even (handshake lemma) and bounded by [`MAX_EXACT_MATCHING`].
fn exact_matching(odd: &[usize], costs: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let n = odd.len();
    let full = (1usize << n) - 1;
    let mut dp = vec![f64::INFINITY; full + 1];
    let mut choice: Vec<Option<(usize, usize)>> = vec![None; full + 1];
    dp[0] = 0.0;

    for mask in 1..=full {
        let i = mask.trailing_zeros() as usize;
        if mask.count_ones() % 2 == 1 {
            continue;
        }
        for j in (i + 1)..n {
            if mask & (1 << j) == 0 {
                continue;
            }
            let rest = mask & !(1 << i) & !(1 << j);
            let candidate = dp[rest] + costs[i][j];
            if candidate < dp[mask] {
                dp[mask] = candidate;
                choice[mask] = Some((i, j));
            }
        }
    }

    let mut pairs = Vec::with_capacity(n / 2);
    let mut mask = full;
    while mask != 0 {
        let Some((i, j)) = choice[mask] else {
            break; // some pair unreachable; caller reports the shortfall
        };
        pairs.push((odd[i], odd[j]));
        mask &= !(1 << i) & !(1 << j);
    }
    pairs
}

/// Greedy nearest-pair matching for large odd sets: repeatedly match the
/// closest remaining pair.
fn greedy_matching(odd: &[usize], costs: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let mut remaining: Vec<usize> = (0..odd.len()).collect();
    let mut pairs = Vec::with_capacity(odd.len() / 2);

    while remaining.len() >= 2 {
        let mut best: Option<(usize, usize)> = None;
        let mut best_cost = f64::INFINITY;
        for (a, &i) in remaining.iter().enumerate() {
            for (b, &j) in remaining.iter().enumerate().skip(a + 1) {
                if costs[i][j] < best_cost {
                    best_cost = costs[i][j];
                    best = Some((a, b));
                }
            }
        }

        let Some((a, b)) = best else { break };
        pairs.push((odd[remaining[a]], odd[remaining[b]]));
        remaining.swap_remove(b);
        remaining.swap_remove(a);
    }

    pairs
}
