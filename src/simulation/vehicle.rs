//! Vehicle kinematics for the traffic simulation
//!
//! Each vehicle integrates its own position and velocity per tick and derives
//! acceleration from a simplified Intelligent Driver Model against the
//! vehicle directly ahead of it on the same road.

use anyhow::{bail, Result};

use super::types::{RoadId, Turn, VehicleId, GAP_FLOOR};

/// Physical and routing parameters of a vehicle. Every field has a sane
/// default; construction validates the overrides.
#[derive(Debug, Clone)]
pub struct VehicleConfig {
    /// Vehicle length
    pub length: f64,
    /// Minimum desired standstill gap to the leader
    pub min_gap: f64,
    /// Driver reaction time
    pub reaction_time: f64,
    /// Desired cruise velocity
    pub max_velocity: f64,
    /// Maximum acceleration the driver applies
    pub max_acceleration: f64,
    /// Maximum deceleration the driver tolerates
    pub max_deceleration: f64,
    /// Ordered roads the vehicle will traverse, first entry is the spawn road
    pub route: Vec<RoadId>,
    /// Declared turn through the intersection
    pub turn: Turn,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            length: 4.0,
            min_gap: 4.0,
            reaction_time: 1.0,
            max_velocity: 15.0,
            max_acceleration: 4.0,
            max_deceleration: 4.0,
            route: Vec::new(),
            turn: Turn::Straight,
        }
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_velocity <= 0.0 {
            bail!("max_velocity must be positive, got {}", self.max_velocity);
        }
        if self.max_acceleration <= 0.0 {
            bail!(
                "max_acceleration must be positive, got {}",
                self.max_acceleration
            );
        }
        if self.max_deceleration <= 0.0 {
            bail!(
                "max_deceleration must be positive, got {}",
                self.max_deceleration
            );
        }
        if self.length <= 0.0 {
            bail!("length must be positive, got {}", self.length);
        }
        if self.min_gap <= 0.0 {
            bail!("min_gap must be positive, got {}", self.min_gap);
        }
        if self.reaction_time < 0.0 {
            bail!("reaction_time must not be negative, got {}", self.reaction_time);
        }
        if self.route.is_empty() {
            bail!("vehicle route must not be empty");
        }
        Ok(())
    }
}

/// Snapshot of the leading vehicle's state needed by the follower's IDM term
#[derive(Debug, Clone, Copy)]
pub struct LeadState {
    pub x: f64,
    pub v: f64,
    pub length: f64,
}

impl From<&Vehicle> for LeadState {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            x: vehicle.x,
            v: vehicle.v,
            length: vehicle.length,
        }
    }
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Distance along the current road
    pub x: f64,
    pub v: f64,
    pub a: f64,

    pub length: f64,
    pub min_gap: f64,
    pub reaction_time: f64,
    /// Current velocity cap; lowered while a slow zone applies
    pub v_max: f64,
    base_v_max: f64,
    pub a_max: f64,
    pub b_max: f64,
    sqrt_ab: f64,

    pub route: Vec<RoadId>,
    pub route_index: usize,
    pub turn: Turn,

    /// Forced-brake state set by the stop zone
    pub stopped: bool,
    /// One-shot override letting an admitted vehicle cross despite the gate
    pub go: bool,
    /// Set once the vehicle has entered the admission queue
    pub queued: bool,

    /// Simulation time at which the vehicle entered the world
    pub spawned_at: f64,
}

impl Vehicle {
    pub fn new(id: VehicleId, config: VehicleConfig, spawned_at: f64) -> Result<Self> {
        config.validate()?;
        let sqrt_ab = 2.0 * (config.max_acceleration * config.max_deceleration).sqrt();
        Ok(Self {
            id,
            x: 0.0,
            v: config.max_velocity,
            a: 0.0,
            length: config.length,
            min_gap: config.min_gap,
            reaction_time: config.reaction_time,
            v_max: config.max_velocity,
            base_v_max: config.max_velocity,
            a_max: config.max_acceleration,
            b_max: config.max_deceleration,
            sqrt_ab,
            route: config.route,
            route_index: 0,
            turn: config.turn,
            stopped: false,
            go: false,
            queued: false,
            spawned_at,
        })
    }

    /// Advance position, velocity and acceleration by one tick.
    ///
    /// Integration runs first with the acceleration computed last tick; the
    /// new acceleration is then derived from the (already advanced) leader
    /// snapshot. A velocity that would cross zero is clamped using the
    /// stopping-distance identity instead of going negative.
    pub fn advance(&mut self, lead: Option<LeadState>, dt: f64) {
        if self.go {
            self.stopped = false;
        }

        if self.v + self.a * dt < 0.0 {
            self.x -= 0.5 * self.v * self.v / self.a;
            self.v = 0.0;
        } else {
            self.v += self.a * dt;
            self.x += self.v * dt + self.a * dt * dt / 2.0;
        }

        let mut alpha = 0.0;
        if let Some(lead) = lead {
            let delta_x = (lead.x - self.x - lead.length).max(GAP_FLOOR);
            let delta_v = self.v - lead.v;
            let headway = (self.reaction_time * self.v + delta_v * self.v / self.sqrt_ab).max(0.0);
            alpha = (self.min_gap + headway) / delta_x;
        }

        let speed_ratio = self.v / self.v_max;
        self.a = self.a_max * (1.0 - speed_ratio.powi(4) - alpha * alpha);

        if self.stopped {
            self.a = -self.b_max * self.v / self.v_max;
        }
    }

    /// One-shot override forcing an admitted vehicle through the
    /// intersection: full speed, stop released, gate ignored until the next
    /// road.
    pub fn push_through(&mut self) {
        self.go = true;
        self.v = self.v_max;
        self.stopped = false;
    }

    pub fn force_stop(&mut self) {
        self.stopped = true;
    }

    pub fn release_stop(&mut self) {
        self.stopped = false;
    }

    /// Cap velocity to a fraction of the unmodified baseline while a slow
    /// zone applies
    pub fn apply_slow_cap(&mut self, factor: f64) {
        self.v_max = factor * self.base_v_max;
    }

    pub fn lift_slow_cap(&mut self) {
        self.v_max = self.base_v_max;
    }

    pub fn base_v_max(&self) -> f64 {
        self.base_v_max
    }

    /// Road the vehicle currently drives on
    pub fn current_road(&self) -> RoadId {
        self.route[self.route_index]
    }

    /// Next road on the route, if the vehicle has not reached its last leg
    pub fn next_road(&self) -> Option<RoadId> {
        self.route.get(self.route_index + 1).copied()
    }

    /// Reset transient state when the vehicle is relocated onto its next
    /// road: position restarts at the road origin, queue membership and the
    /// one-shot crossing override are consumed, turn intent resets.
    pub fn reset_for_transfer(&mut self) {
        self.route_index += 1;
        self.x = 0.0;
        self.queued = false;
        self.go = false;
        self.turn = Turn::Straight;
    }
}
