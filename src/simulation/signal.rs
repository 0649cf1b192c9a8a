//! Traffic signals and the intersection admission step
//!
//! A signal owns a phase cycle table (one go/no-go flag per road group) and
//! the slow/stop thresholds its member roads apply under a red phase. A stop
//! sign is the degenerate signal whose every phase is all-false; for it the
//! phase table is irrelevant and the admission queue does the arbitration.

use anyhow::{bail, Result};
use log::{debug, warn};

use super::intersection::Intersection;
use super::road::{Clearance, Road};
use super::types::{RoadId, EXIT_EPSILON};

/// Signal configuration. An empty phase table defaults to a single all-false
/// phase sized to the group count (stop-sign behavior).
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Cycle of per-group go flags; each inner vector has one entry per group
    pub phases: Vec<Vec<bool>>,
    /// Distance from the road end at which a red phase slows the lead vehicle
    pub slow_distance: f64,
    /// Fraction of the baseline velocity allowed inside the slow zone
    pub slow_factor: f64,
    /// Distance band before the road end that forces a full stop
    pub stop_distance: f64,
    /// Seconds per phase for timed cycling; `None` keeps the phase static
    pub cycle_length: Option<f64>,
    pub initial_phase: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            phases: Vec::new(),
            slow_distance: 22.0,
            slow_factor: 0.4,
            stop_distance: 7.0,
            cycle_length: None,
            initial_phase: 0,
        }
    }
}

/// A traffic signal gating one or more groups of roads
#[derive(Debug, Clone)]
pub struct TrafficSignal {
    /// Member roads per group; group index matches the phase vectors
    pub groups: Vec<Vec<RoadId>>,
    pub phases: Vec<Vec<bool>>,
    pub current_phase: usize,
    pub slow_distance: f64,
    pub slow_factor: f64,
    pub stop_distance: f64,
    pub cycle_length: Option<f64>,
    /// Phase transitions as (time, new phase index) pairs, for diagnostics
    pub history: Vec<(f64, usize)>,
}

impl TrafficSignal {
    pub fn new(groups: Vec<Vec<RoadId>>, config: SignalConfig) -> Result<Self> {
        if groups.is_empty() {
            bail!("signal needs at least one road group");
        }
        let phases = if config.phases.is_empty() {
            vec![vec![false; groups.len()]]
        } else {
            config.phases
        };
        for (i, phase) in phases.iter().enumerate() {
            if phase.len() != groups.len() {
                bail!(
                    "phase {} has {} entries but the signal has {} groups",
                    i,
                    phase.len(),
                    groups.len()
                );
            }
        }
        if config.initial_phase >= phases.len() {
            bail!(
                "initial_phase {} out of range for {} phases",
                config.initial_phase,
                phases.len()
            );
        }
        if config.slow_distance <= 0.0 || config.stop_distance <= 0.0 {
            bail!(
                "slow_distance and stop_distance must be positive, got {} and {}",
                config.slow_distance,
                config.stop_distance
            );
        }
        if !(config.slow_factor > 0.0 && config.slow_factor <= 1.0) {
            bail!("slow_factor must be in (0, 1], got {}", config.slow_factor);
        }
        if let Some(cycle) = config.cycle_length {
            if cycle <= 0.0 {
                bail!("cycle_length must be positive, got {}", cycle);
            }
        }
        Ok(Self {
            groups,
            phases,
            current_phase: config.initial_phase,
            slow_distance: config.slow_distance,
            slow_factor: config.slow_factor,
            stop_distance: config.stop_distance,
            cycle_length: config.cycle_length,
            history: Vec::new(),
        })
    }

    /// Whether the current phase clears the given group
    pub fn is_go(&self, group: usize) -> bool {
        self.phases[self.current_phase]
            .get(group)
            .copied()
            .unwrap_or(false)
    }

    /// Gate verdict for a member road's group
    pub fn clearance_for(&self, group: usize) -> Clearance {
        if self.is_go(group) {
            Clearance::Go
        } else {
            Clearance::Hold {
                slow_distance: self.slow_distance,
                slow_factor: self.slow_factor,
                stop_distance: self.stop_distance,
            }
        }
    }

    /// Timed phase cycling: recompute the phase from the clock when a cycle
    /// length is configured. Static (stop-sign) signals never change phase.
    pub fn update_phase(&mut self, t: f64) {
        let Some(cycle) = self.cycle_length else {
            return;
        };
        let phase = ((t / cycle).floor() as usize) % self.phases.len();
        if phase != self.current_phase {
            debug!("signal phase {} -> {} at t={:.2}", self.current_phase, phase, t);
            self.current_phase = phase;
            self.history.push((t, phase));
        }
    }

    /// One admission evaluation against the shared intersection state.
    ///
    /// Either the head of the queue gets pushed through (intersection clear,
    /// every queued vehicle halted at its line), or a head that has reached
    /// the stop line is confirmed out of the queue and the cooldown starts.
    pub fn update_admission(&self, intersection: &mut Intersection, roads: &mut [Road], t: f64) {
        let Some(head) = intersection.queue.front().copied() else {
            return;
        };

        let all_stopped = intersection
            .queue
            .iter()
            .all(|req| roads[req.road.0].vehicle(req.vehicle).is_some_and(|v| v.stopped));

        if intersection.is_clear(roads, t) && all_stopped {
            match roads[head.road.0].vehicle_mut(head.vehicle) {
                Some(vehicle) => {
                    debug!("vehicle {:?} admitted into intersection at t={:.2}", head.vehicle, t);
                    vehicle.push_through();
                }
                None => {
                    debug_assert!(false, "queued vehicle missing from its road");
                    warn!("queued vehicle {:?} missing from road {}", head.vehicle, head.road.0);
                    intersection.queue.pop_front();
                }
            }
        } else {
            let road = &roads[head.road.0];
            match road.vehicle(head.vehicle) {
                Some(vehicle) => {
                    if road.remaining(vehicle) < EXIT_EPSILON {
                        intersection.release_head(t);
                    }
                }
                None => {
                    debug_assert!(false, "queued vehicle missing from its road");
                    warn!("queued vehicle {:?} missing from road {}", head.vehicle, head.road.0);
                    intersection.queue.pop_front();
                }
            }
        }
    }
}
