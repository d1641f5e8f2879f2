use fxhash::FxHashMap;
use petgraph::unionfind::UnionFind;

use crate::network::StreetNetwork;

/// Connected components of the undirected projection of the network.
/// Directionality is ignored here; it only matters for traversal, not for
/// deciding whether two streets belong to the same drivable area.
pub fn connected_components(network: &StreetNetwork) -> Vec<Vec<usize>> {
    let mut union_find = UnionFind::<usize>::new(network.node_count());

    for segment in network.segments() {
        union_find.union(segment.start_node(), segment.end_node());
    }

    let mut components: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for node in network.nodes() {
        components
            .entry(union_find.find_mut(node.id))
            .or_default()
            .push(node.id);
    }

    let mut components: Vec<Vec<usize>> = components.into_values().collect();
    // Largest first; node id as tie-break keeps the order deterministic.
    components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geopoint::GeoPoint;
    use crate::network::{BuildOptions, NetworkBuilder};
    use crate::osm::RawWay;

    fn residential(points: &[(f64, f64)]) -> RawWay {
        RawWay::new(
            points.iter().map(|&(lat, lng)| GeoPoint::new(lat, lng)).collect(),
            &[("highway", "residential")],
        )
    }

    #[test]
    fn single_way_is_one_component() {
        let network = NetworkBuilder::new(BuildOptions::respecting_restrictions())
            .build(&[residential(&[(0.0, 0.0), (0.0, 0.001)])])
            .unwrap();
        assert_eq!(connected_components(&network).len(), 1);
    }

    #[test]
    fn disjoint_ways_are_separate_components() {
        let network = NetworkBuilder::new(BuildOptions::respecting_restrictions())
            .build(&[
                residential(&[(0.0, 0.0), (0.0, 0.001)]),
                residential(&[(0.1, 0.0), (0.1, 0.001)]),
            ])
            .unwrap();
        let components = connected_components(&network);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].len(), 2);
    }

    #[test]
    fn oneways_do_not_split_components() {
        let network = NetworkBuilder::new(BuildOptions::respecting_restrictions())
            .build(&[RawWay::new(
                vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)],
                &[("highway", "residential"), ("oneway", "yes")],
            )])
            .unwrap();
        assert_eq!(connected_components(&network).len(), 1);
    }
}
