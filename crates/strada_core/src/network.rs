use fxhash::FxHashMap;
use tracing::debug;

use crate::distance::{Distance, Meters};
use crate::edge_direction::EdgeDirection;
use crate::error::GenerationError;
use crate::geometry::compute_geometry_distance;
use crate::geopoint::GeoPoint;
use crate::osm::RawWay;
use crate::tags::{self, WayFilter};

/// Segments shorter than this are rejected as degenerate.
const MIN_SEGMENT_LENGTH_M: f64 = 0.01;

/// Assumed driving speed on synthetic straight-line connectors, where no
/// routed duration is available.
const FALLBACK_CONNECTOR_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct StreetNode {
    pub id: usize,
    pub point: GeoPoint,
}

#[derive(Debug, Clone)]
pub struct StreetSegment {
    id: usize,
    start_node: usize,
    end_node: usize,
    geometry: Vec<GeoPoint>,
    distance: Distance<Meters>,
    /// Traversable start-to-end only.
    oneway: bool,
    speed_kmh: f64,
    highway: String,
    name: Option<String>,
    synthetic: bool,
    approximate: bool,
    routed_duration_s: Option<f64>,
}

impl StreetSegment {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn start_node(&self) -> usize {
        self.start_node
    }

    pub fn end_node(&self) -> usize {
        self.end_node
    }

    pub fn geometry(&self) -> &[GeoPoint] {
        &self.geometry
    }

    pub fn distance(&self) -> Distance<Meters> {
        self.distance
    }

    pub fn oneway(&self) -> bool {
        self.oneway
    }

    pub fn highway(&self) -> &str {
        &self.highway
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn is_approximate(&self) -> bool {
        self.approximate
    }

    pub fn adj_node(&self, node: usize) -> usize {
        if self.start_node == node {
            self.end_node
        } else {
            self.start_node
        }
    }

    pub fn traversable(&self, direction: EdgeDirection) -> bool {
        !self.oneway || direction == EdgeDirection::Forward
    }

    /// Estimated drive time in seconds, independent of direction. Synthetic
    /// connectors report the externally routed duration when one exists.
    pub fn duration_s(&self) -> f64 {
        match self.routed_duration_s {
            Some(duration) => duration,
            None => self.distance.value() / (self.speed_kmh / 3.6),
        }
    }
}

#[derive(Debug, Default)]
pub struct StreetNetwork {
    nodes: Vec<StreetNode>,
    segments: Vec<StreetSegment>,
    adjacency: Vec<Vec<usize>>,
}

impl StreetNetwork {
    pub fn node(&self, node_id: usize) -> &StreetNode {
        &self.nodes[node_id]
    }

    pub fn nodes(&self) -> &[StreetNode] {
        &self.nodes
    }

    pub fn segment(&self, segment_id: usize) -> &StreetSegment {
        &self.segments[segment_id]
    }

    pub fn segments(&self) -> &[StreetSegment] {
        &self.segments
    }

    pub fn node_segments(&self, node_id: usize) -> &[usize] {
        &self.adjacency[node_id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total length of the mapped streets, synthetic connectors excluded.
    pub fn street_distance(&self) -> Distance<Meters> {
        self.segments
            .iter()
            .filter(|segment| !segment.synthetic)
            .map(|segment| segment.distance)
            .sum()
    }

    pub fn edge_direction(&self, segment_id: usize, from_node: usize) -> EdgeDirection {
        let segment = &self.segments[segment_id];

        if segment.start_node == from_node {
            return EdgeDirection::Forward;
        }

        if segment.end_node == from_node {
            return EdgeDirection::Backward;
        }

        panic!(
            "Node {} is neither the start nor the end of segment {}",
            from_node, segment_id
        )
    }

    /// Whether two nodes share at least one segment.
    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        self.adjacency[a]
            .iter()
            .any(|&segment_id| self.segments[segment_id].adj_node(a) == b)
    }

    pub fn nearest_node(&self, point: &GeoPoint) -> Option<usize> {
        self.nodes
            .iter()
            .min_by_key(|node| node.point.haversine_distance(point))
            .map(|node| node.id)
    }

    fn add_node(&mut self, point: GeoPoint) -> usize {
        let id = self.nodes.len();
        self.nodes.push(StreetNode { id, point });
        self.adjacency.push(Vec::new());
        id
    }

    fn add_segment(&mut self, segment: StreetSegment) -> usize {
        let id = segment.id;
        self.adjacency[segment.start_node].push(id);
        if segment.end_node != segment.start_node {
            self.adjacency[segment.end_node].push(id);
        }
        self.segments.push(segment);
        id
    }

    /// Insert a synthetic connector bridging two nodes, traversable both
    /// ways. Used by connectivity resolution and gap auto-resolution.
    pub fn add_connector(
        &mut self,
        from_node: usize,
        to_node: usize,
        geometry: Vec<GeoPoint>,
        distance: Distance<Meters>,
        routed_duration_s: Option<f64>,
        approximate: bool,
    ) -> usize {
        let id = self.segments.len();
        self.add_segment(StreetSegment {
            id,
            start_node: from_node,
            end_node: to_node,
            geometry,
            distance,
            oneway: false,
            speed_kmh: FALLBACK_CONNECTOR_SPEED_KMH,
            highway: String::from("connector"),
            name: None,
            synthetic: true,
            approximate,
            routed_duration_s,
        })
    }
}

/// Options governing which ways enter the graph and how restrictions apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub filter: WayFilter,
    /// When false, oneway restrictions are ignored and every segment becomes
    /// traversable in both directions.
    pub respect_restrictions: bool,
}

impl BuildOptions {
    pub fn respecting_restrictions() -> BuildOptions {
        BuildOptions {
            filter: WayFilter::default(),
            respect_restrictions: true,
        }
    }
}

type SnapKey = (i64, i64);

/// Node identity is coordinate equality after rounding to 6 decimal degrees
/// (~0.11 m), expressed as integer microdegrees.
fn snap_key(point: &GeoPoint) -> SnapKey {
    (
        (point.lat * 1e6).round() as i64,
        (point.lng * 1e6).round() as i64,
    )
}

pub struct NetworkBuilder {
    options: BuildOptions,
}

impl NetworkBuilder {
    pub fn new(options: BuildOptions) -> NetworkBuilder {
        NetworkBuilder { options }
    }

    /// Build a [`StreetNetwork`] from raw ways: filter to drivable classes,
    /// split ways at shared (snapped) coordinates, and assign node ids.
    pub fn build(&self, ways: &[RawWay]) -> Result<StreetNetwork, GenerationError> {
        let retained: Vec<&RawWay> = ways
            .iter()
            .filter(|way| tags::is_drivable(way, &self.options.filter))
            .collect();

        // Coordinates referenced more than once across all retained ways are
        // intersections; ways are cut there so every segment meets others
        // only at its endpoints.
        let mut references: FxHashMap<SnapKey, u32> = FxHashMap::default();
        for way in &retained {
            for point in &way.geometry {
                *references.entry(snap_key(point)).or_insert(0) += 1;
            }
        }

        let mut network = StreetNetwork::default();
        let mut node_ids: FxHashMap<SnapKey, usize> = FxHashMap::default();

        for way in &retained {
            self.add_way(way, &references, &mut node_ids, &mut network)?;
        }

        if network.segments.is_empty() {
            return Err(GenerationError::EmptyNetwork);
        }

        debug!(
            nodes = network.node_count(),
            segments = network.segment_count(),
            "built street network"
        );

        Ok(network)
    }

    fn add_way(
        &self,
        way: &RawWay,
        references: &FxHashMap<SnapKey, u32>,
        node_ids: &mut FxHashMap<SnapKey, usize>,
        network: &mut StreetNetwork,
    ) -> Result<(), GenerationError> {
        let mut geometry: Vec<GeoPoint> = Vec::with_capacity(way.geometry.len());
        for point in &way.geometry {
            if geometry.last().map(snap_key) != Some(snap_key(point)) {
                geometry.push(*point);
            }
        }

        if geometry.len() < 2 {
            return Err(GenerationError::DegenerateSegment(format!(
                "way '{}' collapses to a single point",
                way.get_tag("name").unwrap_or("unnamed")
            )));
        }

        if tags::is_reversed_oneway(way) {
            geometry.reverse();
        }

        let oneway = self.options.respect_restrictions && tags::is_oneway(way);
        let speed_kmh = tags::average_speed_kmh(way);
        let highway = way.get_tag("highway").unwrap_or("road");
        let name = way.get_tag("name");

        let mut run_start = 0;
        for i in 1..geometry.len() {
            let is_last = i == geometry.len() - 1;
            let is_intersection = references.get(&snap_key(&geometry[i])).copied().unwrap_or(0) > 1;

            if is_last || is_intersection {
                self.add_run(
                    &geometry[run_start..=i],
                    oneway,
                    speed_kmh,
                    highway,
                    name,
                    node_ids,
                    network,
                )?;
                run_start = i;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_run(
        &self,
        run: &[GeoPoint],
        oneway: bool,
        speed_kmh: f64,
        highway: &str,
        name: Option<&str>,
        node_ids: &mut FxHashMap<SnapKey, usize>,
        network: &mut StreetNetwork,
    ) -> Result<(), GenerationError> {
        let start_key = snap_key(&run[0]);
        let end_key = snap_key(&run[run.len() - 1]);

        // A closed run (an isolated ring) is split at its midpoint so the
        // graph never contains a self-loop edge.
        if start_key == end_key {
            if run.len() < 3 {
                return Err(GenerationError::DegenerateSegment(format!(
                    "segment of '{}' starts and ends at the same point",
                    name.unwrap_or("unnamed")
                )));
            }
            let mid = run.len() / 2;
            self.add_run(&run[..=mid], oneway, speed_kmh, highway, name, node_ids, network)?;
            self.add_run(&run[mid..], oneway, speed_kmh, highway, name, node_ids, network)?;
            return Ok(());
        }

        let distance = compute_geometry_distance(run);
        if distance.value() < MIN_SEGMENT_LENGTH_M {
            return Err(GenerationError::DegenerateSegment(format!(
                "segment of '{}' has zero length",
                name.unwrap_or("unnamed")
            )));
        }

        let start_node = *node_ids
            .entry(start_key)
            .or_insert_with(|| network.add_node(run[0]));
        let end_node = *node_ids
            .entry(end_key)
            .or_insert_with(|| network.add_node(run[run.len() - 1]));

        let id = network.segments.len();
        network.add_segment(StreetSegment {
            id,
            start_node,
            end_node,
            geometry: run.to_vec(),
            distance,
            oneway,
            speed_kmh,
            highway: highway.to_string(),
            name: name.map(str::to_string),
            synthetic: false,
            approximate: false,
            routed_duration_s: None,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meters;

    fn residential(points: &[(f64, f64)]) -> RawWay {
        RawWay::new(
            points.iter().map(|&(lat, lng)| GeoPoint::new(lat, lng)).collect(),
            &[("highway", "residential")],
        )
    }

    fn build(ways: &[RawWay]) -> StreetNetwork {
        NetworkBuilder::new(BuildOptions::respecting_restrictions())
            .build(ways)
            .unwrap()
    }

    #[test]
    fn empty_input_fails_with_empty_network() {
        let result =
            NetworkBuilder::new(BuildOptions::respecting_restrictions()).build(&[]);
        assert!(matches!(result, Err(GenerationError::EmptyNetwork)));
    }

    #[test]
    fn footways_filtered_out_leaves_empty_network() {
        let footway = RawWay::new(
            vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)],
            &[("highway", "footway")],
        );
        let result =
            NetworkBuilder::new(BuildOptions::respecting_restrictions()).build(&[footway]);
        assert!(matches!(result, Err(GenerationError::EmptyNetwork)));
    }

    #[test]
    fn single_way_becomes_one_segment() {
        let network = build(&[residential(&[(0.0, 0.0), (0.0, 0.001), (0.0, 0.002)])]);
        assert_eq!(network.segment_count(), 1);
        assert_eq!(network.node_count(), 2);
        assert_eq!(network.segment(0).geometry().len(), 3);
    }

    #[test]
    fn crossing_ways_split_at_the_shared_point() {
        let horizontal = residential(&[(0.0, -0.001), (0.0, 0.0), (0.0, 0.001)]);
        let vertical = residential(&[(-0.001, 0.0), (0.0, 0.0), (0.001, 0.0)]);
        let network = build(&[horizontal, vertical]);

        assert_eq!(network.segment_count(), 4);
        assert_eq!(network.node_count(), 5);

        // The shared point is one node with four incident segments.
        let center = network
            .nodes()
            .iter()
            .find(|node| node.point.lat == 0.0 && node.point.lng == 0.0)
            .unwrap();
        assert_eq!(network.node_segments(center.id).len(), 4);
    }

    #[test]
    fn reversed_oneway_geometry_is_flipped() {
        let way = RawWay::new(
            vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)],
            &[("highway", "residential"), ("oneway", "-1")],
        );
        let network = build(&[way]);
        let segment = network.segment(0);
        assert!(segment.oneway());
        assert_eq!(segment.geometry()[0].lng, 0.001);
    }

    #[test]
    fn restrictions_can_be_ignored() {
        let way = RawWay::new(
            vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)],
            &[("highway", "residential"), ("oneway", "yes")],
        );
        let network = NetworkBuilder::new(BuildOptions {
            filter: WayFilter::default(),
            respect_restrictions: false,
        })
        .build(&[way])
        .unwrap();
        assert!(!network.segment(0).oneway());
    }

    #[test]
    fn duplicate_consecutive_points_are_dropped() {
        let network = build(&[residential(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.001)])]);
        assert_eq!(network.segment(0).geometry().len(), 2);
    }

    #[test]
    fn collapsed_way_is_degenerate() {
        let way = residential(&[(0.0, 0.0), (0.0, 0.0)]);
        let result =
            NetworkBuilder::new(BuildOptions::respecting_restrictions()).build(&[way]);
        assert!(matches!(result, Err(GenerationError::DegenerateSegment(_))));
    }

    #[test]
    fn isolated_ring_is_split_without_self_loops() {
        let ring = residential(&[
            (0.0, 0.0),
            (0.0, 0.001),
            (0.001, 0.001),
            (0.001, 0.0),
            (0.0, 0.0),
        ]);
        let network = build(&[ring]);
        assert_eq!(network.segment_count(), 2);
        for segment in network.segments() {
            assert_ne!(segment.start_node(), segment.end_node());
        }
    }

    #[test]
    fn build_is_idempotent_up_to_ids() {
        let ways = vec![
            residential(&[(0.0, 0.0), (0.0, 0.001), (0.0, 0.002)]),
            residential(&[(0.0, 0.001), (0.001, 0.001)]),
        ];
        let first = build(&ways);
        let second = build(&ways);
        assert_eq!(first.node_count(), second.node_count());
        assert_eq!(first.segment_count(), second.segment_count());
        assert_eq!(first.street_distance(), second.street_distance());
    }

    #[test]
    fn segment_length_exceeds_zero() {
        let network = build(&[residential(&[(0.0, 0.0), (0.0, 0.001)])]);
        assert!(network.segment(0).distance() > meters!(0));
    }
}
