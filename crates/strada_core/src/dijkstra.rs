use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fxhash::{FxHashMap, FxHashSet};

use crate::distance::{Distance, Meters};
use crate::edge_direction::EdgeDirection;
use crate::network::StreetNetwork;

const INVALID_NODE: usize = usize::MAX;
const INVALID_SEGMENT: usize = usize::MAX;

#[derive(Eq, Copy, Clone, Debug)]
struct HeapItem {
    node_id: usize,
    weight: Distance<Meters>,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &HeapItem) -> bool {
        self.weight == other.weight
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &HeapItem) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Flip weight to make this a min-heap
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

struct NodeData {
    weight: Distance<Meters>,
    settled: bool,
    parent: usize,
    segment_id: usize,
}

/// One directed hop of a shortest path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathTraversal {
    pub segment: usize,
    pub direction: EdgeDirection,
}

#[derive(Debug, Clone)]
pub struct ShortestPath {
    pub nodes: Vec<usize>,
    pub traversals: Vec<PathTraversal>,
    pub distance: Distance<Meters>,
}

/// Single-pair Dijkstra over the street network, honoring oneway
/// directionality. Segment length is the edge weight.
pub fn shortest_path(
    network: &StreetNetwork,
    start: usize,
    end: usize,
) -> Option<ShortestPath> {
    let data = search(network, start, Goal::Single(end));
    build_path(network, &data, start, end)
}

/// One-to-many Dijkstra: shortest distances from `start` to every target,
/// stopping once all reachable targets are settled. Unreachable targets are
/// absent from the result.
pub fn shortest_path_lengths(
    network: &StreetNetwork,
    start: usize,
    targets: &[usize],
) -> FxHashMap<usize, Distance<Meters>> {
    let wanted: FxHashSet<usize> = targets.iter().copied().collect();
    let data = search(network, start, Goal::Many(&wanted));

    targets
        .iter()
        .filter_map(|&target| {
            data.get(&target)
                .filter(|node_data| node_data.settled)
                .map(|node_data| (target, node_data.weight))
        })
        .collect()
}

enum Goal<'a> {
    Single(usize),
    Many(&'a FxHashSet<usize>),
}

fn search(network: &StreetNetwork, start: usize, goal: Goal) -> FxHashMap<usize, NodeData> {
    let mut data: FxHashMap<usize, NodeData> = FxHashMap::default();
    let mut heap: BinaryHeap<HeapItem> = BinaryHeap::with_capacity(1024);

    data.insert(
        start,
        NodeData {
            weight: Distance::ZERO,
            settled: false,
            parent: INVALID_NODE,
            segment_id: INVALID_SEGMENT,
        },
    );
    heap.push(HeapItem {
        node_id: start,
        weight: Distance::ZERO,
    });

    let mut remaining = match &goal {
        Goal::Single(_) => 1,
        Goal::Many(targets) => targets.len(),
    };

    while let Some(HeapItem { node_id, weight }) = heap.pop() {
        let settled = data.get(&node_id).is_some_and(|d| d.settled);
        if settled {
            continue;
        }

        if let Some(node_data) = data.get_mut(&node_id) {
            if weight > node_data.weight {
                continue;
            }
            node_data.settled = true;
        }

        let is_goal = match &goal {
            Goal::Single(end) => node_id == *end,
            Goal::Many(targets) => targets.contains(&node_id),
        };
        if is_goal {
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }

        for &segment_id in network.node_segments(node_id) {
            let segment = network.segment(segment_id);
            let direction = network.edge_direction(segment_id, node_id);

            if !segment.traversable(direction) {
                continue;
            }

            let adj_node = segment.adj_node(node_id);
            if data.get(&adj_node).is_some_and(|d| d.settled) {
                continue;
            }

            let next_weight = weight + segment.distance();
            let improves = data
                .get(&adj_node)
                .is_none_or(|d| next_weight < d.weight);

            if improves {
                data.insert(
                    adj_node,
                    NodeData {
                        weight: next_weight,
                        settled: false,
                        parent: node_id,
                        segment_id,
                    },
                );
                heap.push(HeapItem {
                    node_id: adj_node,
                    weight: next_weight,
                });
            }
        }
    }

    data
}

fn build_path(
    network: &StreetNetwork,
    data: &FxHashMap<usize, NodeData>,
    start: usize,
    end: usize,
) -> Option<ShortestPath> {
    let end_data = data.get(&end).filter(|d| d.settled)?;
    let distance = end_data.weight;

    let mut nodes = vec![end];
    let mut traversals = Vec::new();

    let mut current = end;
    while current != start {
        let node_data = data.get(&current)?;
        traversals.push(PathTraversal {
            segment: node_data.segment_id,
            direction: network.edge_direction(node_data.segment_id, node_data.parent),
        });
        current = node_data.parent;
        nodes.push(current);
    }

    nodes.reverse();
    traversals.reverse();

    Some(ShortestPath {
        nodes,
        traversals,
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geopoint::GeoPoint;
    use crate::network::{BuildOptions, NetworkBuilder};
    use crate::osm::RawWay;

    fn grid_network() -> StreetNetwork {
        // Two rows of an east-west grid, all two-way.
        let ways = vec![
            RawWay::new(
                vec![
                    GeoPoint::new(0.0, 0.0),
                    GeoPoint::new(0.0, 0.001),
                    GeoPoint::new(0.0, 0.002),
                ],
                &[("highway", "residential")],
            ),
            RawWay::new(
                vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.001, 0.0)],
                &[("highway", "residential")],
            ),
            RawWay::new(
                vec![
                    GeoPoint::new(0.001, 0.0),
                    GeoPoint::new(0.001, 0.001),
                    GeoPoint::new(0.001, 0.002),
                ],
                &[("highway", "residential")],
            ),
            RawWay::new(
                vec![GeoPoint::new(0.0, 0.002), GeoPoint::new(0.001, 0.002)],
                &[("highway", "residential")],
            ),
        ];
        NetworkBuilder::new(BuildOptions::respecting_restrictions())
            .build(&ways)
            .unwrap()
    }

    #[test]
    fn finds_the_direct_segment() {
        let network = grid_network();
        let start = network.nearest_node(&GeoPoint::new(0.0, 0.0)).unwrap();
        let end = network.nearest_node(&GeoPoint::new(0.001, 0.0)).unwrap();

        let path = shortest_path(&network, start, end).unwrap();
        assert_eq!(path.traversals.len(), 1);
        assert_eq!(path.nodes, vec![start, end]);
    }

    #[test]
    fn path_respects_oneway_direction() {
        // One street, drivable west-to-east only; the return must detour.
        let ways = vec![
            RawWay::new(
                vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)],
                &[("highway", "residential"), ("oneway", "yes")],
            ),
            RawWay::new(
                vec![
                    GeoPoint::new(0.0, 0.001),
                    GeoPoint::new(0.001, 0.001),
                    GeoPoint::new(0.001, 0.0),
                ],
                &[("highway", "residential")],
            ),
            RawWay::new(
                vec![GeoPoint::new(0.001, 0.0), GeoPoint::new(0.0, 0.0)],
                &[("highway", "residential")],
            ),
        ];
        let network = NetworkBuilder::new(BuildOptions::respecting_restrictions())
            .build(&ways)
            .unwrap();

        let west = network.nearest_node(&GeoPoint::new(0.0, 0.0)).unwrap();
        let east = network.nearest_node(&GeoPoint::new(0.0, 0.001)).unwrap();

        let forward = shortest_path(&network, west, east).unwrap();
        assert_eq!(forward.traversals.len(), 1);

        let back = shortest_path(&network, east, west).unwrap();
        assert!(back.distance > forward.distance);
        assert!(back.traversals.len() > 1);
    }

    #[test]
    fn unreachable_target_yields_none() {
        let ways = vec![
            RawWay::new(
                vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)],
                &[("highway", "residential")],
            ),
            RawWay::new(
                vec![GeoPoint::new(0.1, 0.0), GeoPoint::new(0.1, 0.001)],
                &[("highway", "residential")],
            ),
        ];
        let network = NetworkBuilder::new(BuildOptions::respecting_restrictions())
            .build(&ways)
            .unwrap();

        let here = network.nearest_node(&GeoPoint::new(0.0, 0.0)).unwrap();
        let there = network.nearest_node(&GeoPoint::new(0.1, 0.0)).unwrap();
        assert!(shortest_path(&network, here, there).is_none());
    }

    #[test]
    fn one_to_many_skips_unreachable_targets() {
        let network = grid_network();
        let start = network.nearest_node(&GeoPoint::new(0.0, 0.0)).unwrap();
        let targets: Vec<usize> = network.nodes().iter().map(|n| n.id).collect();

        let lengths = shortest_path_lengths(&network, start, &targets);
        assert_eq!(lengths.len(), network.node_count());
        assert_eq!(lengths[&start], Distance::<Meters>::ZERO);
    }
}
