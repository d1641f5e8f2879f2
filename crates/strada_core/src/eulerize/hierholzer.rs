//! Stack-based Hierholzer walk construction over the augmented pass set.

use fixedbitset::FixedBitSet;

use crate::edge_direction::EdgeDirection;
use crate::error::GenerationError;
use crate::network::StreetNetwork;

use super::Pass;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ConstructedStep {
    pub segment: usize,
    pub from_node: usize,
    pub to_node: usize,
    pub direction: EdgeDirection,
    pub deadhead: bool,
}

/// Construct the Euler walk by consuming every pass exactly once.
///
/// Direction-bound passes are preferred over free ones at each node, which
/// keeps two-way streets available as "escape" edges for as long as
/// possible on mixed graphs. The constructed sequence is validated; a
/// mixed topology the greedy orientation cannot serve fails with
/// `UnroutableNetwork` rather than yielding a discontinuous walk.
pub(crate) fn construct(
    network: &StreetNetwork,
    passes: &[Pass],
    start_node: usize,
) -> Result<Vec<ConstructedStep>, GenerationError> {
    // Incidence: a bound pass is listed at its departure node only; a free
    // pass at both endpoints. Bound passes come first within each list.
    let mut incidence: Vec<Vec<usize>> = vec![Vec::new(); network.node_count()];
    for (pass_id, pass) in passes.iter().enumerate() {
        let segment = network.segment(pass.segment);
        match pass.required {
            Some(EdgeDirection::Forward) => incidence[segment.start_node()].push(pass_id),
            Some(EdgeDirection::Backward) => incidence[segment.end_node()].push(pass_id),
            None => {
                incidence[segment.start_node()].push(pass_id);
                incidence[segment.end_node()].push(pass_id);
            }
        }
    }
    for list in &mut incidence {
        list.sort_by_key(|&pass_id| passes[pass_id].required.is_none());
    }

    let mut cursor = vec![0usize; network.node_count()];
    let mut used = FixedBitSet::with_capacity(passes.len());

    // Stack entries: (node we are at, pass used to arrive, node we came from).
    let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(start_node, None, start_node)];
    let mut circuit_rev: Vec<(usize, Option<usize>, usize)> = Vec::with_capacity(passes.len() + 1);

    while let Some(&(node, _, _)) = stack.last() {
        let next = next_unused(&incidence[node], &mut cursor[node], &used);

        if let Some(pass_id) = next {
            used.insert(pass_id);
            let to_node = arrival_node(network, &passes[pass_id], node);
            stack.push((to_node, Some(pass_id), node));
        } else if let Some(entry) = stack.pop() {
            circuit_rev.push(entry);
        }
    }

    if used.count_ones(..) != passes.len() {
        return Err(GenerationError::UnroutableNetwork(format!(
            "walk construction left {} traversals unused",
            passes.len() - used.count_ones(..)
        )));
    }

    circuit_rev.reverse();

    let mut steps = Vec::with_capacity(passes.len());
    let mut previous_node = start_node;
    for &(node, via, from_node) in &circuit_rev {
        let Some(pass_id) = via else {
            continue; // the seed entry
        };

        // The walk must resume exactly where the previous step ended; a
        // mismatch means the greedy orientation of a two-way street broke
        // the circuit.
        if from_node != previous_node {
            return Err(GenerationError::UnroutableNetwork(String::from(
                "walk construction produced a discontinuity",
            )));
        }

        let pass = &passes[pass_id];
        steps.push(ConstructedStep {
            segment: pass.segment,
            from_node,
            to_node: node,
            direction: network.edge_direction(pass.segment, from_node),
            deadhead: pass.deadhead,
        });
        previous_node = node;
    }

    Ok(steps)
}

fn next_unused(list: &[usize], cursor: &mut usize, used: &FixedBitSet) -> Option<usize> {
    while *cursor < list.len() {
        let pass_id = list[*cursor];
        if !used.contains(pass_id) {
            return Some(pass_id);
        }
        *cursor += 1;
    }
    None
}

fn arrival_node(network: &StreetNetwork, pass: &Pass, from_node: usize) -> usize {
    network.segment(pass.segment).adj_node(from_node)
}
