use crate::distance::{Distance, Meters};
use crate::edge_direction::EdgeDirection;
use crate::geopoint::GeoPoint;

/// One traversal of a street segment (or synthetic connector) inside the
/// Euler walk. Geometry is stored already oriented in travel direction.
#[derive(Debug, Clone)]
pub struct WalkStep {
    pub segment: usize,
    pub from_node: usize,
    pub to_node: usize,
    pub direction: EdgeDirection,
    pub geometry: Vec<GeoPoint>,
    pub distance: Distance<Meters>,
    pub duration_s: f64,
    /// True for retraversals added to satisfy parity/balance, meaning the
    /// street was already covered by an earlier step.
    pub deadhead: bool,
}

/// A single continuous walk covering every street segment at least once.
#[derive(Debug, Clone, Default)]
pub struct EulerWalk {
    pub steps: Vec<WalkStep>,
}

impl EulerWalk {
    pub fn distance(&self) -> Distance<Meters> {
        self.steps.iter().map(|step| step.distance).sum()
    }

    pub fn duration_s(&self) -> f64 {
        self.steps.iter().map(|step| step.duration_s).sum()
    }

    pub fn deadhead_distance(&self) -> Distance<Meters> {
        self.steps
            .iter()
            .filter(|step| step.deadhead)
            .map(|step| step.distance)
            .sum()
    }

    pub fn start_node(&self) -> Option<usize> {
        self.steps.first().map(|step| step.from_node)
    }

    pub fn end_node(&self) -> Option<usize> {
        self.steps.last().map(|step| step.to_node)
    }

    /// Walk continuity: each step starts where the previous one ended.
    pub fn is_continuous(&self) -> bool {
        self.steps
            .windows(2)
            .all(|pair| pair[0].to_node == pair[1].from_node)
    }
}
