use std::ops::Range;

use serde::Serialize;

use crate::distance::{Distance, Meters};
use crate::error::GenerationError;
use crate::geometry::append_geometry;
use crate::geopoint::GeoPoint;
use crate::walk::EulerWalk;

/// A contiguous, duration-bounded slice of the Euler walk. Boundaries fall
/// only at node positions, never inside a segment.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub polyline: Vec<GeoPoint>,
    pub distance: Distance<Meters>,
    pub duration_s: f64,
    /// Walk step indices covered by this chunk.
    pub steps: Range<usize>,
}

/// Cut the walk into chunks whose estimated drive time approximates
/// `target_duration_s`. A chunk is closed at the last node boundary before
/// the target would be exceeded; a single step longer than the target
/// becomes its own oversized chunk.
pub fn chunk_walk(walk: &EulerWalk, target_duration_s: f64) -> Result<Vec<Chunk>, GenerationError> {
    if target_duration_s <= 0.0 {
        return Err(GenerationError::InvalidConfiguration(format!(
            "chunk duration must be positive, got {target_duration_s}"
        )));
    }

    if walk.steps.is_empty() {
        return Err(GenerationError::EmptyRoute);
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Option<Chunk> = None;

    for (step_index, step) in walk.steps.iter().enumerate() {
        let overflows = current
            .as_ref()
            .is_some_and(|chunk| chunk.duration_s + step.duration_s > target_duration_s);

        if overflows {
            if let Some(chunk) = current.take() {
                chunks.push(chunk);
            }
        }

        let chunk = current.get_or_insert_with(|| Chunk {
            index: chunks.len(),
            polyline: Vec::new(),
            distance: Distance::ZERO,
            duration_s: 0.0,
            steps: step_index..step_index,
        });

        append_geometry(&mut chunk.polyline, &step.geometry);
        chunk.distance = chunk.distance + step.distance;
        chunk.duration_s += step.duration_s;
        chunk.steps.end = step_index + 1;
    }

    if let Some(chunk) = current.take() {
        chunks.push(chunk);
    }

    Ok(chunks)
}
