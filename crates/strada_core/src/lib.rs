pub mod chunker;
mod components;
mod connect;
mod dijkstra;
pub mod distance;
pub mod edge_direction;
pub mod engine;
pub mod error;
pub mod eulerize;
pub mod gaps;
mod geometry;
pub mod geopoint;
pub mod network;
pub mod osm;
pub mod router;
pub mod tags;
pub mod walk;

pub(crate) use distance::meters;
