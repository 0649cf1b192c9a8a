//! Shared intersection admission state
//!
//! The intersection is a single shared resource: an ordered queue of pending
//! transit requests plus a cooldown timestamp. At most one vehicle is
//! admitted at a time; the cooldown keeps the box exclusively occupied for
//! the direction-dependent transit window after each release.

use std::collections::VecDeque;

use anyhow::{bail, Result};
use log::debug;

use super::road::Road;
use super::types::{RoadId, TransitTimes, Turn, VehicleId};

/// A pending request for exclusive transit through the intersection
#[derive(Debug, Clone, Copy)]
pub struct TransitRequest {
    /// Simulation time the vehicle entered the queue zone
    pub arrival: f64,
    /// Occupancy window the vehicle needs for its declared turn
    pub transit_time: f64,
    pub road: RoadId,
    pub vehicle: VehicleId,
    pub turn: Turn,
}

/// Diagnostic record of a granted transit
#[derive(Debug, Clone, Copy)]
pub struct ReleaseRecord {
    pub road: RoadId,
    pub vehicle: VehicleId,
    pub arrival: f64,
    pub transit_time: f64,
    pub released_at: f64,
    pub turn: Turn,
}

/// Intersection configuration: which roads feed the box, which roads are the
/// box, and the arbitration parameters.
#[derive(Debug, Clone, Default)]
pub struct IntersectionConfig {
    /// Roads ending at the intersection, subject to queueing and admission
    pub approach_roads: Vec<RoadId>,
    /// Roads inside the intersection, consulted by the clear predicate
    pub interior_roads: Vec<RoadId>,
    /// Distance band before an approach road's end within which the lead
    /// vehicle registers into the admission queue
    pub queue_zone: f64,
    pub transit_times: TransitTimes,
}

impl IntersectionConfig {
    pub fn validate(&self, road_count: usize) -> Result<()> {
        if self.queue_zone <= 0.0 {
            bail!("queue_zone must be positive, got {}", self.queue_zone);
        }
        self.transit_times.validate()?;
        for id in self.approach_roads.iter().chain(&self.interior_roads) {
            if id.0 >= road_count {
                bail!(
                    "intersection references road {} but only {} roads exist",
                    id.0,
                    road_count
                );
            }
        }
        if let Some(id) = self
            .approach_roads
            .iter()
            .find(|id| self.interior_roads.contains(id))
        {
            bail!("road {} is listed as both approach and interior", id.0);
        }
        Ok(())
    }
}

/// Shared admission state owned by the simulation
#[derive(Debug, Default)]
pub struct Intersection {
    approach_roads: Vec<RoadId>,
    interior_roads: Vec<RoadId>,
    pub queue_zone: f64,
    pub transit_times: TransitTimes,

    /// Pending transits in enqueue (FIFO) order
    pub queue: VecDeque<TransitRequest>,
    /// No admission happens before this timestamp
    pub blocked_till: f64,
    /// Log of granted transits
    pub released: Vec<ReleaseRecord>,
}

impl Intersection {
    pub fn new(config: IntersectionConfig, road_count: usize) -> Result<Self> {
        config.validate(road_count)?;
        Ok(Self {
            approach_roads: config.approach_roads,
            interior_roads: config.interior_roads,
            queue_zone: config.queue_zone,
            transit_times: config.transit_times,
            queue: VecDeque::new(),
            blocked_till: 0.0,
            released: Vec::new(),
        })
    }

    pub fn is_approach(&self, road: RoadId) -> bool {
        self.approach_roads.contains(&road)
    }

    /// True when no vehicle occupies the interior roads and the cooldown
    /// from the previous transit has elapsed
    pub fn is_clear(&self, roads: &[Road], t: f64) -> bool {
        self.interior_roads
            .iter()
            .all(|id| roads[id.0].vehicles.is_empty())
            && t > self.blocked_till
    }

    /// Register a lead vehicle into the queue. The caller guards against
    /// duplicates via the vehicle's `queued` flag.
    pub fn enqueue(&mut self, arrival: f64, road: RoadId, vehicle: VehicleId, turn: Turn) {
        let transit_time = self.transit_times.for_turn(turn);
        debug!(
            "vehicle {:?} queued on road {} at t={:.2} ({:?}, needs {:.1}s)",
            vehicle, road.0, arrival, turn, transit_time
        );
        self.queue.push_back(TransitRequest {
            arrival,
            transit_time,
            road,
            vehicle,
            turn,
        });
    }

    /// Pop the head request, start the cooldown, and log the release
    pub fn release_head(&mut self, t: f64) -> Option<TransitRequest> {
        let head = self.queue.pop_front()?;
        self.blocked_till = t + head.transit_time;
        self.released.push(ReleaseRecord {
            road: head.road,
            vehicle: head.vehicle,
            arrival: head.arrival,
            transit_time: head.transit_time,
            released_at: t,
            turn: head.turn,
        });
        debug!(
            "vehicle {:?} released from road {} at t={:.2}, intersection blocked till {:.2}",
            head.vehicle, head.road.0, t, self.blocked_till
        );
        Some(head)
    }

    /// Refresh the cooldown when a vehicle physically leaves an approach road
    pub fn block_for(&mut self, t: f64, turn: Turn) {
        self.blocked_till = t + self.transit_times.for_turn(turn);
    }

    /// Drop a vehicle's pending request, if any. Used when a still-queued
    /// vehicle exits its road within a single tick.
    pub fn remove_vehicle(&mut self, vehicle: VehicleId) -> Option<TransitRequest> {
        let index = self.queue.iter().position(|r| r.vehicle == vehicle)?;
        self.queue.remove(index)
    }
}
