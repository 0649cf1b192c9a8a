//! Vehicle generation
//!
//! A generator feeds one origin road (the first road of the drawn template's
//! route) at a configured rate, drawing templates by cumulative weight. A
//! spawn is deferred while the tail vehicle is too close to the road origin;
//! deferral does not consume the period, so the generator retries every tick
//! until space opens up.

use anyhow::{bail, Result};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::road::Road;
use super::types::IdAllocator;
use super::vehicle::{Vehicle, VehicleConfig};

/// (max_velocity, max_acceleration) pairs from aggressive to pokey, sampled
/// when `random_driver` is enabled
const DRIVER_PROFILES: [(f64, f64); 6] = [
    (22.0, 7.0),
    (20.0, 6.0),
    (18.0, 5.0),
    (16.0, 4.0),
    (14.0, 3.0),
    (12.0, 2.0),
];

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Vehicles per minute
    pub vehicle_rate: f64,
    /// Weighted vehicle templates; weights are relative integer odds
    pub templates: Vec<(u32, VehicleConfig)>,
    /// Randomize the driver's (max_velocity, max_acceleration) per draw
    pub random_driver: bool,
    /// Seed for a reproducible draw sequence; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            vehicle_rate: 20.0,
            templates: Vec::new(),
            random_driver: false,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.vehicle_rate <= 0.0 {
            bail!("vehicle_rate must be positive, got {}", self.vehicle_rate);
        }
        if self.templates.is_empty() {
            bail!("generator needs at least one vehicle template");
        }
        if self.templates.iter().map(|(w, _)| *w).sum::<u32>() == 0 {
            bail!("template weights must not all be zero");
        }
        for (_, template) in &self.templates {
            template.validate()?;
        }
        Ok(())
    }
}

/// Produces vehicles onto an origin road on a rate schedule
pub struct VehicleGenerator {
    vehicle_rate: f64,
    templates: Vec<(u32, VehicleConfig)>,
    total_weight: u32,
    random_driver: bool,
    rng: StdRng,
    last_added: f64,
    /// The next vehicle to place, drawn ahead of time
    upcoming: VehicleConfig,
}

impl VehicleGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let total_weight = config.templates.iter().map(|(w, _)| *w).sum();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut generator = Self {
            vehicle_rate: config.vehicle_rate,
            templates: config.templates,
            total_weight,
            random_driver: config.random_driver,
            rng,
            last_added: 0.0,
            upcoming: VehicleConfig::default(),
        };
        generator.upcoming = generator.draw();
        Ok(generator)
    }

    /// Weighted template selection: draw uniformly in `1..=total`, walk the
    /// cumulative weights, first bucket reaching the draw wins.
    fn draw(&mut self) -> VehicleConfig {
        let mut r = self.rng.random_range(1..=self.total_weight) as i64;
        let mut config = self.templates[0].1.clone();
        for (weight, template) in &self.templates {
            r -= *weight as i64;
            if r <= 0 {
                config = template.clone();
                break;
            }
        }
        if self.random_driver {
            if let Some(&(v_max, a_max)) = DRIVER_PROFILES.choose(&mut self.rng) {
                config.max_velocity = v_max;
                config.max_acceleration = a_max;
            }
        }
        config
    }

    /// Routes referenced by this generator's templates
    pub fn routes(&self) -> impl Iterator<Item = &[super::types::RoadId]> {
        self.templates.iter().map(|(_, t)| t.route.as_slice())
    }

    /// Place at most one vehicle if the rate period has elapsed and the
    /// origin road's tail leaves clearance for the incoming vehicle.
    pub fn update(&mut self, roads: &mut [Road], t: f64, ids: &mut IdAllocator) {
        if t - self.last_added < 60.0 / self.vehicle_rate {
            return;
        }

        let origin = self.upcoming.route[0];
        let road = &mut roads[origin.0];
        let has_clearance = match road.vehicles.back() {
            None => true,
            Some(tail) => tail.x > self.upcoming.min_gap + self.upcoming.length,
        };

        if has_clearance {
            match Vehicle::new(ids.next_vehicle(), self.upcoming.clone(), t) {
                Ok(vehicle) => {
                    debug!(
                        "vehicle {:?} spawned on road {} at t={:.2} ({:?})",
                        vehicle.id, origin.0, t, vehicle.turn
                    );
                    road.vehicles.push_back(vehicle);
                    self.last_added = t;
                }
                // Templates are validated at construction, so this only
                // trips if a template was mutated afterwards.
                Err(err) => warn!("dropping unspawnable vehicle: {err:#}"),
            }
        }

        self.upcoming = self.draw();
    }
}
