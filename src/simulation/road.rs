//! Road segments and the per-tick follower update
//!
//! A road owns its vehicles in a deque ordered front-to-back: index 0 is the
//! vehicle closest to the road end. The lead vehicle advances unconstrained;
//! every follower advances against its already-updated predecessor, so queue
//! order is preserved and vehicles never pass each other.

use std::collections::VecDeque;

use anyhow::{bail, Result};

use super::types::Point;
use super::vehicle::{LeadState, Vehicle};

/// Reference to the signal and group a road reports to
#[derive(Debug, Clone, Copy)]
pub struct SignalBinding {
    pub signal: usize,
    pub group: usize,
}

/// Gate verdict a road applies to its lead vehicle after kinematics
#[derive(Debug, Clone, Copy)]
pub enum Clearance {
    /// Green, or no signal bound: vehicles run free
    Go,
    /// Red or stop sign: slow and stop zones near the road end apply
    Hold {
        slow_distance: f64,
        slow_factor: f64,
        stop_distance: f64,
    },
}

/// A directed road segment
#[derive(Debug, Clone)]
pub struct Road {
    pub start: Point,
    pub end: Point,
    pub length: f64,
    /// Heading in radians, for downstream visualization consumers
    pub angle: f64,
    /// Vehicles on the road, front (closest to the end) first
    pub vehicles: VecDeque<Vehicle>,
    pub signal: Option<SignalBinding>,
}

impl Road {
    pub fn new(start: Point, end: Point) -> Result<Self> {
        let length = start.distance(&end);
        if length <= 0.0 {
            bail!("road must have positive length, got start {:?} == end {:?}", start, end);
        }
        Ok(Self {
            start,
            end,
            length,
            angle: start.angle_to(&end),
            vehicles: VecDeque::new(),
            signal: None,
        })
    }

    pub fn bind_signal(&mut self, signal: usize, group: usize) {
        self.signal = Some(SignalBinding { signal, group });
    }

    /// Advance every vehicle one tick, then apply the gate policy to the
    /// lead vehicle.
    pub fn update(&mut self, dt: f64, clearance: Clearance) {
        if self.vehicles.is_empty() {
            return;
        }

        let mut lead: Option<LeadState> = None;
        for vehicle in self.vehicles.iter_mut() {
            vehicle.advance(lead, dt);
            lead = Some(LeadState::from(&*vehicle));
        }

        match clearance {
            Clearance::Go => {
                if let Some(front) = self.vehicles.front_mut() {
                    front.release_stop();
                }
                for vehicle in self.vehicles.iter_mut() {
                    vehicle.lift_slow_cap();
                }
            }
            Clearance::Hold {
                slow_distance,
                slow_factor,
                stop_distance,
            } => {
                let length = self.length;
                if let Some(front) = self.vehicles.front_mut() {
                    if front.x >= length - slow_distance {
                        front.apply_slow_cap(slow_factor);
                    }
                    // The band stops at stop_distance/5 from its far edge so
                    // a vehicle already pushed through is not re-captured.
                    if front.x >= length - stop_distance
                        && front.x <= length - stop_distance / 5.0
                        && !front.go
                    {
                        front.force_stop();
                    }
                }
            }
        }
    }

    /// Lead vehicle's remaining distance to the road end
    pub fn remaining(&self, vehicle: &Vehicle) -> f64 {
        self.length - vehicle.x
    }

    /// Find a vehicle on this road by id
    pub fn vehicle(&self, id: super::types::VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    /// Find a vehicle on this road by id, mutably
    pub fn vehicle_mut(&mut self, id: super::types::VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }
}
