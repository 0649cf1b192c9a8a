//! Microscopic traffic simulation engine
//!
//! Vehicles follow a simplified Intelligent Driver Model along directed
//! roads; a shared intersection admits one vehicle at a time from competing
//! approaches; signals and stop zones gate motion near the box. The engine
//! is synchronous and step-driven with no wall-clock coupling.

mod generator;
mod intersection;
mod network;
mod road;
mod signal;
mod types;
mod vehicle;
mod world;

pub use generator::{GeneratorConfig, VehicleGenerator};
pub use intersection::{
    Intersection, IntersectionConfig, ReleaseRecord, TransitRequest,
};
pub use network::RoadNetwork;
pub use road::{Clearance, Road, SignalBinding};
pub use signal::{SignalConfig, TrafficSignal};
pub use types::{
    IdAllocator, Point, RoadId, TransitTimes, Turn, VehicleId, EXIT_EPSILON, GAP_FLOOR,
};
pub use vehicle::{LeadState, Vehicle, VehicleConfig};
pub use world::{Simulation, SimulationConfig};
