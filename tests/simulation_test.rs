//! Engine behavior tests: kinematics, configuration validation, vehicle
//! generation, and road-to-road transfer.

use microtraffic::simulation::{
    GeneratorConfig, LeadState, Point, RoadId, Simulation, SimulationConfig, Turn, Vehicle,
    VehicleConfig, VehicleId,
};

fn test_vehicle(route: Vec<usize>) -> VehicleConfig {
    VehicleConfig {
        route: route.into_iter().map(RoadId).collect(),
        ..Default::default()
    }
}

/// Bare two-road world: a 10-unit road chained into a 20-unit road
fn two_road_sim() -> Simulation {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    sim.create_roads(&[
        (Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
        (Point::new(10.0, 0.0), Point::new(30.0, 0.0)),
    ])
    .unwrap();
    sim
}

#[test]
fn idm_free_road_acceleration_matches_formula() {
    let mut vehicle = Vehicle::new(VehicleId(0), test_vehicle(vec![0]), 0.0).unwrap();
    vehicle.v = 10.0;
    vehicle.a = 0.0;

    vehicle.advance(None, 0.01);

    // Old acceleration is zero, so integration leaves v at 10 and moves x
    assert!((vehicle.x - 0.1).abs() < 1e-12);
    assert_eq!(vehicle.v, 10.0);

    // a = a_max * (1 - (v/v_max)^4) with the default 4/15 parameters
    let expected = 4.0 * (1.0 - (10.0f64 / 15.0).powi(4));
    assert!((vehicle.a - expected).abs() < 1e-12);
    assert!((expected - 3.2098765432).abs() < 1e-9);
}

#[test]
fn idm_interaction_term_matches_formula() {
    let mut vehicle = Vehicle::new(VehicleId(0), test_vehicle(vec![0]), 0.0).unwrap();
    vehicle.v = 10.0;
    vehicle.a = 0.0;
    let lead = LeadState {
        x: 20.0,
        v: 8.0,
        length: 4.0,
    };

    vehicle.advance(Some(lead), 0.01);

    // sqrt_ab = 2*sqrt(4*4) = 8, headway = T*v + dv*v/sqrt_ab = 10 + 2.5
    let delta_x = 20.0 - vehicle.x - 4.0;
    let alpha = (4.0 + (10.0 + 2.0 * 10.0 / 8.0)) / delta_x;
    let expected = 4.0 * (1.0 - (10.0f64 / 15.0).powi(4) - alpha * alpha);
    assert!((vehicle.a - expected).abs() < 1e-12);
}

#[test]
fn forced_stop_overrides_idm() {
    let mut vehicle = Vehicle::new(VehicleId(0), test_vehicle(vec![0]), 0.0).unwrap();
    vehicle.v = 10.0;
    vehicle.a = 0.0;
    vehicle.force_stop();

    vehicle.advance(None, 0.01);

    let expected = -4.0 * 10.0 / 15.0;
    assert!((vehicle.a - expected).abs() < 1e-12);
}

#[test]
fn velocity_clamps_at_zero_with_stopping_distance() {
    let mut vehicle = Vehicle::new(VehicleId(0), test_vehicle(vec![0]), 0.0).unwrap();
    vehicle.x = 5.0;
    vehicle.v = 1.0;
    vehicle.a = -4.0;

    // v + a*dt = 1 - 4 < 0, so x backs off by v^2/(2a) and v clamps
    vehicle.advance(None, 1.0);

    assert_eq!(vehicle.v, 0.0);
    assert!((vehicle.x - 5.125).abs() < 1e-12);
}

#[test]
fn overlap_gap_saturates_instead_of_diverging() {
    let mut vehicle = Vehicle::new(VehicleId(0), test_vehicle(vec![0]), 0.0).unwrap();
    vehicle.v = 10.0;
    vehicle.a = 0.0;
    // Leader physically overlaps the follower
    let lead = LeadState {
        x: 2.0,
        v: 0.0,
        length: 4.0,
    };

    vehicle.advance(Some(lead), 0.01);

    assert!(vehicle.a.is_finite());
    assert!(vehicle.a < -1000.0);
}

#[test]
fn push_through_releases_stop_at_full_speed() {
    let mut vehicle = Vehicle::new(VehicleId(0), test_vehicle(vec![0]), 0.0).unwrap();
    vehicle.v = 0.0;
    vehicle.force_stop();

    vehicle.push_through();

    assert!(vehicle.go);
    assert!(!vehicle.stopped);
    assert_eq!(vehicle.v, 15.0);
}

#[test]
fn followers_never_pass_their_leader() {
    let mut sim = two_road_sim();
    sim.spawn_vehicle(test_vehicle(vec![0, 1])).unwrap();
    sim.spawn_vehicle(test_vehicle(vec![0, 1])).unwrap();
    // Leader ahead, follower close behind at matched speed
    sim.roads[0].vehicles[0].x = 6.0;
    sim.roads[0].vehicles[1].x = 0.5;

    for _ in 0..50 {
        sim.step();
        let vehicles = &sim.roads[0].vehicles;
        if vehicles.len() == 2 {
            assert!(vehicles[0].x > vehicles[1].x);
        }
    }
}

#[test]
fn no_signal_road_never_gates_vehicles() {
    let mut sim = two_road_sim();
    sim.spawn_vehicle(test_vehicle(vec![0, 1])).unwrap();

    for _ in 0..100 {
        sim.step();
        for road in &sim.roads {
            for vehicle in &road.vehicles {
                assert!(!vehicle.stopped);
                assert_eq!(vehicle.v_max, 15.0);
            }
        }
    }
    // The vehicle actually travelled
    assert!(sim.vehicle_count() == 0 || sim.roads[1].vehicles.front().is_some());
}

#[test]
fn generator_defers_until_tail_clearance() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    sim.create_road(Point::new(0.0, 0.0), Point::new(60.0, 0.0))
        .unwrap();
    sim.create_generator(GeneratorConfig {
        vehicle_rate: 6000.0,
        templates: vec![(1, test_vehicle(vec![0]))],
        random_driver: false,
        seed: Some(1),
    })
    .unwrap();

    // Park a tail vehicle too close to the origin: clearance needs
    // x > min_gap + length = 8
    sim.spawn_vehicle(test_vehicle(vec![0])).unwrap();
    sim.roads[0].vehicles[0].x = 2.0;
    sim.roads[0].vehicles[0].v = 0.0;

    for _ in 0..50 {
        sim.step();
        assert_eq!(sim.vehicle_count(), 1, "generator must defer while blocked");
    }

    // Open up space past the clearance threshold
    sim.roads[0].vehicles[0].x = 9.0;
    sim.roads[0].vehicles[0].v = 0.0;
    sim.step();

    assert_eq!(sim.vehicle_count(), 2);
    assert_eq!(sim.roads[0].vehicles.back().unwrap().x, 0.0);
}

#[test]
fn route_transfer_relocates_vehicle_with_reset_transients() {
    let mut sim = two_road_sim();
    let id = sim.spawn_vehicle(test_vehicle(vec![0, 1])).unwrap();
    {
        let vehicle = &mut sim.roads[0].vehicles[0];
        vehicle.x = 9.9;
        vehicle.queued = true;
        vehicle.go = true;
        vehicle.turn = Turn::Left;
    }

    sim.step();

    assert!(sim.roads[0].vehicles.is_empty());
    assert_eq!(sim.roads[1].vehicles.len(), 1);
    let moved = &sim.roads[1].vehicles[0];
    assert_eq!(moved.id, id);
    assert_eq!(moved.x, 0.0);
    assert!(!moved.queued);
    assert!(!moved.go);
    assert_eq!(moved.turn, Turn::Straight);
    assert_eq!(moved.route_index, 1);
}

#[test]
fn route_completion_despawns_vehicle() {
    let mut sim = two_road_sim();
    sim.spawn_vehicle(test_vehicle(vec![0])).unwrap();
    sim.roads[0].vehicles[0].x = 9.95;

    sim.step();

    assert_eq!(sim.vehicle_count(), 0);
}

#[test]
fn weighted_templates_both_appear_under_seeded_draws() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    sim.create_road(Point::new(0.0, 0.0), Point::new(10000.0, 0.0))
        .unwrap();
    let straight = test_vehicle(vec![0]);
    let left = VehicleConfig {
        turn: Turn::Left,
        ..test_vehicle(vec![0])
    };
    sim.create_generator(GeneratorConfig {
        vehicle_rate: 6000.0,
        templates: vec![(3, straight), (1, left)],
        random_driver: false,
        seed: Some(42),
    })
    .unwrap();

    sim.run(3000);

    let spawned = sim.roads[0].vehicles.len();
    let lefts = sim.roads[0]
        .vehicles
        .iter()
        .filter(|v| v.turn == Turn::Left)
        .count();
    assert!(spawned >= 20, "expected a healthy spawn count, got {spawned}");
    assert!(lefts > 0, "the weight-1 template must still be drawn");
    assert!(
        lefts * 2 < spawned,
        "the weight-3 template must dominate: {lefts}/{spawned}"
    );
}

#[test]
fn random_driver_draws_profiles_from_the_table() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    sim.create_road(Point::new(0.0, 0.0), Point::new(10000.0, 0.0))
        .unwrap();
    sim.create_generator(GeneratorConfig {
        vehicle_rate: 6000.0,
        templates: vec![(1, test_vehicle(vec![0]))],
        random_driver: true,
        seed: Some(5),
    })
    .unwrap();

    sim.run(2000);

    let profiles = [
        (22.0, 7.0),
        (20.0, 6.0),
        (18.0, 5.0),
        (16.0, 4.0),
        (14.0, 3.0),
        (12.0, 2.0),
    ];
    assert!(sim.roads[0].vehicles.len() >= 10);
    for vehicle in &sim.roads[0].vehicles {
        assert!(
            profiles.contains(&(vehicle.base_v_max(), vehicle.a_max)),
            "driver profile ({}, {}) not in the table",
            vehicle.base_v_max(),
            vehicle.a_max
        );
    }
}

#[test]
fn identically_seeded_runs_are_identical() {
    let mut a = Simulation::demo_crossroads(60.0, Some(7)).unwrap();
    let mut b = Simulation::demo_crossroads(60.0, Some(7)).unwrap();

    a.run(2000);
    b.run(2000);

    assert_eq!(a.vehicle_count(), b.vehicle_count());
    assert_eq!(a.frame_count, b.frame_count);
    for (road_a, road_b) in a.roads.iter().zip(&b.roads) {
        assert_eq!(road_a.vehicles.len(), road_b.vehicles.len());
        for (va, vb) in road_a.vehicles.iter().zip(&road_b.vehicles) {
            assert_eq!(va.x, vb.x);
            assert_eq!(va.v, vb.v);
            assert_eq!(va.a, vb.a);
        }
    }
}

#[test]
fn route_between_finds_connected_chains() {
    let sim = Simulation::demo_crossroads(20.0, Some(1)).unwrap();

    let route = sim.route_between(RoadId(0), RoadId(4)).unwrap();
    assert_eq!(route.first(), Some(&RoadId(0)));
    assert_eq!(route.last(), Some(&RoadId(4)));
    assert_eq!(route, vec![RoadId(0), RoadId(8), RoadId(4)]);
}

#[test]
fn route_between_disconnected_roads_is_none() {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    sim.create_roads(&[
        (Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
        (Point::new(50.0, 50.0), Point::new(60.0, 50.0)),
    ])
    .unwrap();

    assert!(sim.route_between(RoadId(0), RoadId(1)).is_none());
}

#[test]
fn invalid_configs_are_rejected_at_construction() {
    let mut sim = two_road_sim();

    // Non-positive physical constants
    let bad_speed = VehicleConfig {
        max_velocity: 0.0,
        ..test_vehicle(vec![0])
    };
    assert!(sim.spawn_vehicle(bad_speed).is_err());

    let bad_accel = VehicleConfig {
        max_acceleration: -1.0,
        ..test_vehicle(vec![0])
    };
    assert!(sim.spawn_vehicle(bad_accel).is_err());

    // Empty and disconnected routes
    assert!(sim.spawn_vehicle(test_vehicle(vec![])).is_err());
    assert!(sim.spawn_vehicle(test_vehicle(vec![1, 0])).is_err());
    assert!(sim.spawn_vehicle(test_vehicle(vec![0, 5])).is_err());

    // Degenerate road geometry
    assert!(sim
        .create_road(Point::new(1.0, 1.0), Point::new(1.0, 1.0))
        .is_err());

    // Generators without templates, with zero weights, or a dead rate
    assert!(sim
        .create_generator(GeneratorConfig {
            templates: vec![],
            ..Default::default()
        })
        .is_err());
    assert!(sim
        .create_generator(GeneratorConfig {
            templates: vec![(0, test_vehicle(vec![0]))],
            ..Default::default()
        })
        .is_err());
    assert!(sim
        .create_generator(GeneratorConfig {
            vehicle_rate: 0.0,
            templates: vec![(1, test_vehicle(vec![0]))],
            ..Default::default()
        })
        .is_err());

    // Zero time step
    assert!(Simulation::new(SimulationConfig { dt: 0.0 }).is_err());
}
