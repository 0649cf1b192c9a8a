//! Core types for the traffic simulation
//!
//! Newtype ids, plane geometry, and the shared constants the engine
//! components agree on.

use anyhow::{bail, Result};

/// A unique identifier for a vehicle, stable across road transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub usize);

/// A wrapper type for road indices into the simulation's road list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoadId(pub usize);

/// A 2D position in the simulation plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Heading from this point towards another, in radians
    pub fn angle_to(&self, other: &Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

/// Turn intent a vehicle declares for its pass through the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Turn {
    Left,
    #[default]
    Straight,
    Right,
}

/// Occupancy windows of the intersection per turn direction, in simulated
/// seconds. A left turn holds the box longer than a straight or right pass.
#[derive(Debug, Clone, Copy)]
pub struct TransitTimes {
    pub left: f64,
    pub straight: f64,
    pub right: f64,
}

impl Default for TransitTimes {
    fn default() -> Self {
        Self {
            left: 3.0,
            straight: 2.0,
            right: 2.0,
        }
    }
}

impl TransitTimes {
    pub fn for_turn(&self, turn: Turn) -> f64 {
        match turn {
            Turn::Left => self.left,
            Turn::Straight => self.straight,
            Turn::Right => self.right,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.left <= 0.0 || self.straight <= 0.0 || self.right <= 0.0 {
            bail!("transit times must be positive: {:?}", self);
        }
        Ok(())
    }
}

/// Monotonic vehicle id allocator owned by the simulation
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: usize,
}

impl IdAllocator {
    pub fn next_vehicle(&mut self) -> VehicleId {
        let id = VehicleId(self.next);
        self.next += 1;
        id
    }
}

/// Smallest following gap fed into the interaction term. Gaps at or below
/// zero (physical overlap) saturate the term instead of going non-finite.
pub const GAP_FLOOR: f64 = 0.01;

/// Remaining distance below which a queued vehicle counts as having crossed
/// the stop line, releasing its slot in the admission queue
pub const EXIT_EPSILON: f64 = 0.2;
