//! Simulation orchestration
//!
//! Owns the roads, signals, generators, the shared intersection state and
//! the clock, and drives the fixed per-tick pipeline:
//!
//! 1. per-road kinematics and zone policy
//! 2. vehicle generation
//! 3. signal phase cycling and intersection admission
//! 4. queue-zone registration and road-to-road transfer of lead vehicles
//! 5. clock advance
//!
//! Everything is single-threaded and step-driven; the pipeline order is the
//! only mutation discipline the shared collections need.

use anyhow::{bail, Result};
use log::debug;

use super::generator::{GeneratorConfig, VehicleGenerator};
use super::intersection::{Intersection, IntersectionConfig};
use super::network::RoadNetwork;
use super::road::{Clearance, Road};
use super::signal::{SignalConfig, TrafficSignal};
use super::types::{IdAllocator, Point, RoadId, Turn, VehicleId};
use super::vehicle::VehicleConfig;

/// Top-level simulation parameters
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Fixed step size in simulated seconds
    pub dt: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { dt: 1.0 / 100.0 }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dt <= 0.0 {
            bail!("dt must be positive, got {}", self.dt);
        }
        Ok(())
    }
}

/// The simulation world
pub struct Simulation {
    pub roads: Vec<Road>,
    pub signals: Vec<TrafficSignal>,
    pub generators: Vec<VehicleGenerator>,
    /// Shared admission state for the intersection
    pub intersection: Intersection,

    /// Simulation time
    pub t: f64,
    pub dt: f64,
    pub frame_count: u64,

    ids: IdAllocator,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            roads: Vec::new(),
            signals: Vec::new(),
            generators: Vec::new(),
            intersection: Intersection::default(),
            t: 0.0,
            dt: config.dt,
            frame_count: 0,
            ids: IdAllocator::default(),
        })
    }

    /// Add a road from start to end
    pub fn create_road(&mut self, start: Point, end: Point) -> Result<RoadId> {
        let road = Road::new(start, end)?;
        self.roads.push(road);
        Ok(RoadId(self.roads.len() - 1))
    }

    /// Add a batch of roads; ids are assigned in order
    pub fn create_roads(&mut self, segments: &[(Point, Point)]) -> Result<Vec<RoadId>> {
        segments
            .iter()
            .map(|(start, end)| self.create_road(*start, *end))
            .collect()
    }

    /// Declare the intersection: approach and interior road sets plus the
    /// arbitration parameters. Road references are validated against the
    /// roads created so far.
    pub fn configure_intersection(&mut self, config: IntersectionConfig) -> Result<()> {
        self.intersection = Intersection::new(config, self.roads.len())?;
        Ok(())
    }

    /// Add a signal over groups of roads and bind each member road to its
    /// (signal, group) pair
    pub fn create_signal(
        &mut self,
        groups: Vec<Vec<RoadId>>,
        config: SignalConfig,
    ) -> Result<usize> {
        for group in &groups {
            for id in group {
                if id.0 >= self.roads.len() {
                    bail!(
                        "signal group references road {} but only {} roads exist",
                        id.0,
                        self.roads.len()
                    );
                }
            }
        }
        let signal = TrafficSignal::new(groups, config)?;
        let index = self.signals.len();
        for (group, members) in signal.groups.iter().enumerate() {
            for road in members {
                self.roads[road.0].bind_signal(index, group);
            }
        }
        self.signals.push(signal);
        Ok(index)
    }

    /// Add a generator; every template route is checked for connectivity
    /// against the current road graph
    pub fn create_generator(&mut self, config: GeneratorConfig) -> Result<usize> {
        let generator = VehicleGenerator::new(config)?;
        let network = RoadNetwork::from_roads(&self.roads);
        for route in generator.routes() {
            network.validate_route(route, self.roads.len())?;
        }
        self.generators.push(generator);
        Ok(self.generators.len() - 1)
    }

    /// Place a vehicle directly on the first road of its route
    pub fn spawn_vehicle(&mut self, config: VehicleConfig) -> Result<VehicleId> {
        config.validate()?;
        let network = RoadNetwork::from_roads(&self.roads);
        network.validate_route(&config.route, self.roads.len())?;

        let origin = config.route[0];
        let vehicle = super::vehicle::Vehicle::new(self.ids.next_vehicle(), config, self.t)?;
        let id = vehicle.id;
        self.roads[origin.0].vehicles.push_back(vehicle);
        Ok(id)
    }

    /// Shortest chain of connected roads between two roads, if one exists
    pub fn route_between(&self, from: RoadId, to: RoadId) -> Option<Vec<RoadId>> {
        RoadNetwork::from_roads(&self.roads).find_route(from, to)
    }

    pub fn vehicle_count(&self) -> usize {
        self.roads.iter().map(|road| road.vehicles.len()).sum()
    }

    /// Advance the world by one tick
    pub fn step(&mut self) {
        // 1. Kinematics and zone policy per road. The gate verdict comes
        // from the bound signal's current phase; unbound roads run free.
        for i in 0..self.roads.len() {
            let clearance = match self.roads[i].signal {
                Some(binding) => self.signals[binding.signal].clearance_for(binding.group),
                None => Clearance::Go,
            };
            let dt = self.dt;
            self.roads[i].update(dt, clearance);
        }

        // 2. Vehicle generation.
        for generator in self.generators.iter_mut() {
            generator.update(&mut self.roads, self.t, &mut self.ids);
        }

        // 3. Phase cycling and the admission step.
        for signal in self.signals.iter_mut() {
            signal.update_phase(self.t);
            signal.update_admission(&mut self.intersection, &mut self.roads, self.t);
        }

        // 4. Lead-vehicle scan: queue-zone registration, then transfer of
        // vehicles past their road end.
        for i in 0..self.roads.len() {
            let road_id = RoadId(i);

            let to_enqueue = match self.roads[i].vehicles.front() {
                Some(front)
                    if self.intersection.is_approach(road_id)
                        && front.x >= self.roads[i].length - self.intersection.queue_zone
                        && !front.queued =>
                {
                    Some((front.id, front.turn))
                }
                _ => None,
            };
            if let Some((id, turn)) = to_enqueue {
                self.intersection.enqueue(self.t, road_id, id, turn);
                if let Some(front) = self.roads[i].vehicles.front_mut() {
                    front.queued = true;
                }
            }

            let exited = self.roads[i]
                .vehicles
                .front()
                .is_some_and(|front| front.x > self.roads[i].length);
            if exited {
                if let Some(mut vehicle) = self.roads[i].vehicles.pop_front() {
                    if self.intersection.is_approach(road_id) {
                        self.intersection.block_for(self.t, vehicle.turn);
                        // A released vehicle keeps its queued flag; only a
                        // stale, never-released request is still in the queue.
                        if vehicle.queued {
                            let _ = self.intersection.remove_vehicle(vehicle.id);
                        }
                    }
                    match vehicle.next_road() {
                        Some(next) => {
                            vehicle.reset_for_transfer();
                            debug!(
                                "vehicle {:?} transferred from road {} to road {}",
                                vehicle.id, i, next.0
                            );
                            self.roads[next.0].vehicles.push_back(vehicle);
                        }
                        None => {
                            debug!(
                                "vehicle {:?} completed its route on road {} at t={:.2}",
                                vehicle.id, i, self.t
                            );
                        }
                    }
                }
            }
        }

        // 5. Clock advance.
        self.t += self.dt;
        self.frame_count += 1;
    }

    /// Run a fixed number of ticks
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!("Time: {:.2}s (frame {})", self.t, self.frame_count);
        println!(
            "Roads: {}, Signals: {}, Generators: {}",
            self.roads.len(),
            self.signals.len(),
            self.generators.len()
        );
        println!("Vehicles on roads: {}", self.vehicle_count());
        println!(
            "Admission queue: {} pending, blocked till {:.2}, {} released",
            self.intersection.queue.len(),
            self.intersection.blocked_till,
            self.intersection.released.len()
        );
        for (i, road) in self.roads.iter().enumerate() {
            if road.vehicles.is_empty() {
                continue;
            }
            let front = &road.vehicles[0];
            println!(
                "  road {:2}: {} vehicle(s), lead at x={:.1}/{:.1} v={:.1}{}",
                i,
                road.vehicles.len(),
                front.x,
                road.length,
                front.v,
                if front.stopped { " [stopped]" } else { "" }
            );
        }
    }

    /// Build the demo world: a four-way stop. Four approach roads feed a
    /// shared box of interior segments (straight crossings plus two left
    /// turns), four exit roads leave it, and an all-stop signal gates every
    /// approach so the admission queue arbitrates the crossing order.
    pub fn demo_crossroads(vehicle_rate: f64, seed: Option<u64>) -> Result<Self> {
        let mut sim = Simulation::new(SimulationConfig::default())?;

        let segments: Vec<(Point, Point)> = vec![
            // approaches (0-3): west, east, south, north
            (Point::new(-70.0, 0.0), Point::new(-10.0, 0.0)),
            (Point::new(70.0, 0.0), Point::new(10.0, 0.0)),
            (Point::new(0.0, -70.0), Point::new(0.0, -10.0)),
            (Point::new(0.0, 70.0), Point::new(0.0, 10.0)),
            // exits (4-7): east, west, north, south
            (Point::new(10.0, 0.0), Point::new(70.0, 0.0)),
            (Point::new(-10.0, 0.0), Point::new(-70.0, 0.0)),
            (Point::new(0.0, 10.0), Point::new(0.0, 70.0)),
            (Point::new(0.0, -10.0), Point::new(0.0, -70.0)),
            // interior straights (8-11)
            (Point::new(-10.0, 0.0), Point::new(10.0, 0.0)),
            (Point::new(10.0, 0.0), Point::new(-10.0, 0.0)),
            (Point::new(0.0, -10.0), Point::new(0.0, 10.0)),
            (Point::new(0.0, 10.0), Point::new(0.0, -10.0)),
            // interior left turns (12-13): west approach to north exit,
            // east approach to south exit
            (Point::new(-10.0, 0.0), Point::new(0.0, 10.0)),
            (Point::new(10.0, 0.0), Point::new(0.0, -10.0)),
        ];
        sim.create_roads(&segments)?;

        sim.configure_intersection(IntersectionConfig {
            approach_roads: (0..4).map(RoadId).collect(),
            interior_roads: (8..14).map(RoadId).collect(),
            queue_zone: 6.0,
            transit_times: Default::default(),
        })?;

        sim.create_signal(
            vec![
                vec![RoadId(0)],
                vec![RoadId(1)],
                vec![RoadId(2)],
                vec![RoadId(3)],
            ],
            SignalConfig::default(),
        )?;

        let straight = |route: &[usize]| VehicleConfig {
            route: route.iter().copied().map(RoadId).collect(),
            turn: Turn::Straight,
            ..Default::default()
        };
        let left = |route: &[usize]| VehicleConfig {
            route: route.iter().copied().map(RoadId).collect(),
            turn: Turn::Left,
            ..Default::default()
        };

        let arms: Vec<Vec<(u32, VehicleConfig)>> = vec![
            vec![(3, straight(&[0, 8, 4])), (1, left(&[0, 12, 6]))],
            vec![(3, straight(&[1, 9, 5])), (1, left(&[1, 13, 7]))],
            vec![(1, straight(&[2, 10, 6]))],
            vec![(1, straight(&[3, 11, 7]))],
        ];
        for (i, templates) in arms.into_iter().enumerate() {
            sim.create_generator(GeneratorConfig {
                vehicle_rate,
                templates,
                random_driver: false,
                seed: seed.map(|s| s.wrapping_add(i as u64)),
            })?;
        }

        Ok(sim)
    }
}
