//! Property-based tests for the bat swarm system
//!
//! These tests verify invariants that must hold for all inputs, using
//! randomized testing with proptest.

use bat_swarm_system::echolocation::Echolocation;
use bat_swarm_system::network::*;
use bat_swarm_system::*;
use proptest::prelude::*;

fn position_strategy() -> impl Strategy<Value = Position> {
    (0.0_f32..1000.0, 0.0_f32..1000.0, 0.0_f32..200.0).prop_map(|(x, y, z)| Position::new(x, y, z))
}

// ============================================================================
// OPTIMIZER PROPERTIES
// ============================================================================

#[cfg(test)]
mod optimizer_properties {
    use super::*;
    use bat_swarm_system::obstacle::Obstacle;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn speed_never_exceeds_limit(
            start in position_strategy(),
            peer in position_strategy(),
            seed in any::<u64>(),
            max_speed in 1.0_f32..50.0,
        ) {
            let mobility = MobilityConfig { max_speed, min_speed: 0.0, ..MobilityConfig::default() };
            let mut kin = ReflectingMobility::new(start, Velocity::zero(), mobility);
            let mut field = ObstacleField::new();
            field.push(Obstacle::new_static(Position::new(300.0, 300.0, 50.0), 20.0)).unwrap();
            let mut dir = SwarmDirectory::new();
            dir.publish(AgentSnapshot {
                id: DroneId::new(1),
                position: peer,
                velocity: Velocity::zero(),
                max_speed,
                fitness: 0.0,
                personal_best_position: peer,
                personal_best_fitness: 0.0,
                timestamp_ms: 0,
            }).unwrap();
            let mut rng = SimRng::seed_from_u64(seed);
            let mut opt = PositionOptimizer::new(DroneId::new(0), OptimizerConfig::default(), &kin, &field, &dir).unwrap();

            for tick in 1..=30u64 {
                opt.step(tick * 100, &mut kin, &field, &mut dir, &mut rng).unwrap();
                prop_assert!(opt.velocity().magnitude() <= max_speed * (1.0 + 1e-4));
                prop_assert!(kin.velocity().magnitude() <= max_speed * (1.0 + 1e-4));
            }
        }

        #[test]
        fn accepted_positions_stay_inside_margin(
            start in position_strategy(),
            seed in any::<u64>(),
        ) {
            let config = OptimizerConfig {
                target_position: Position::new(2.0, 998.0, 199.0),
                ..OptimizerConfig::default()
            };
            let bounds = Bounds::default();
            let mut kin = ReflectingMobility::new(start, Velocity::zero(), MobilityConfig::default());
            let field = ObstacleField::new();
            let mut dir = SwarmDirectory::new();
            let mut rng = SimRng::seed_from_u64(seed);
            let mut opt = PositionOptimizer::new(DroneId::new(0), config, &kin, &field, &dir).unwrap();

            for tick in 1..=30u64 {
                let outcome = opt.step(tick * 100, &mut kin, &field, &mut dir, &mut rng).unwrap();
                if outcome.moved() {
                    prop_assert!(bounds.contains(&kin.position(), config.boundary_margin),
                        "{:?} left the margin band", kin.position());
                }
            }
        }

        #[test]
        fn personal_best_never_worsens(
            start in position_strategy(),
            seed in any::<u64>(),
        ) {
            let mut kin = ReflectingMobility::new(start, Velocity::zero(), MobilityConfig::default());
            let field = ObstacleField::new();
            let mut dir = SwarmDirectory::new();
            let mut rng = SimRng::seed_from_u64(seed);
            let mut opt = PositionOptimizer::new(DroneId::new(0), OptimizerConfig::default(), &kin, &field, &dir).unwrap();

            let mut last = opt.personal_best().1;
            for tick in 1..=30u64 {
                opt.step(tick * 100, &mut kin, &field, &mut dir, &mut rng).unwrap();
                let best = opt.personal_best().1;
                prop_assert!(best <= last);
                last = best;
            }
        }
    }
}

// ============================================================================
// ECHOLOCATION PROPERTIES
// ============================================================================

#[cfg(test)]
mod echolocation_properties {
    use super::*;

    proptest! {
        #[test]
        fn loudness_non_increasing_pulse_rate_bounded(
            loudness in 0.0_f32..=1.0,
            pulse_rate in 0.0_f32..=1.0,
            alpha in 0.01_f32..0.99,
            gamma in 0.0_f32..5.0,
            steps in prop::collection::vec(1u64..5000, 1..50),
        ) {
            let config = EcholocationConfig { loudness, pulse_rate, alpha, gamma, ..EcholocationConfig::default() };
            let mut e = Echolocation::new(config);
            let mut t_ms = 0u64;
            let mut last_loudness = e.loudness();
            // the pulse rate starts at its initial value and the first decay
            // drops it onto `r0 * (1 - e^(-gamma t))`; it only rises after that
            let mut last_pulse: Option<f32> = None;

            for dt in steps {
                t_ms += dt;
                e.decay(t_ms as f32 / 1000.0);
                prop_assert!(e.loudness() <= last_loudness);
                prop_assert!(e.pulse_rate() <= pulse_rate + 1e-6);
                prop_assert!(e.pulse_rate() >= 0.0);
                match last_pulse {
                    Some(prev) => prop_assert!(e.pulse_rate() >= prev - 1e-6),
                    None => prop_assert!(e.pulse_rate() <= pulse_rate),
                }
                last_loudness = e.loudness();
                last_pulse = Some(e.pulse_rate());
            }
        }

        #[test]
        fn guarded_loudness_respects_floor(
            loudness in 0.0_f32..=1.0,
            floor in 0.0_f32..=1.0,
            cycles in 1usize..200,
        ) {
            let config = EcholocationConfig { loudness, ..EcholocationConfig::default() };
            let mut e = Echolocation::with_guards(config, floor, 0.95);
            for i in 0..cycles {
                e.decay(i as f32);
            }
            prop_assert!(e.loudness() >= floor.min(loudness) - 1e-6);
            prop_assert!(e.loudness() <= loudness);
        }
    }
}

// ============================================================================
// ROUTE TABLE PROPERTIES
// ============================================================================

#[cfg(test)]
mod route_table_properties {
    use super::*;

    fn path_strategy() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(1u64..20, 0..6)
    }

    fn build_path(middle: &[u64]) -> Path {
        let mut p = Path::new();
        p.push(DroneId::new(0)).unwrap();
        for id in middle {
            p.push(DroneId::new(*id)).unwrap();
        }
        p.push(DroneId::new(99)).unwrap();
        p
    }

    proptest! {
        #[test]
        fn table_bounded_and_sorted(
            capacity in 1usize..8,
            routes in prop::collection::vec((path_strategy(), 0.0_f32..100.0), 0..40),
        ) {
            let mut table = RouteTable::new(capacity);
            let dest = DroneId::new(99);
            for (middle, fitness) in &routes {
                table.insert(dest, RouteInfo::new(build_path(middle), *fitness, 0));
                let stored = table.routes(dest);
                prop_assert!(stored.len() <= capacity);
                prop_assert!(stored.windows(2).all(|w| w[0].fitness <= w[1].fitness));
            }
        }

        #[test]
        fn no_route_outlives_timeout(
            ages in prop::collection::vec((1u64..5, 0u64..20_000), 1..30),
            timeout in 1u64..15_000,
        ) {
            let mut table = RouteTable::new(16);
            for (i, (dest, at)) in ages.iter().enumerate() {
                let mut path = Path::new();
                path.push(DroneId::new(0)).unwrap();
                path.push(DroneId::new(100 + i as u64)).unwrap();
                path.push(DroneId::new(*dest)).unwrap();
                table.insert(DroneId::new(*dest), RouteInfo::new(path, i as f32, *at));
            }
            let now = 20_000;
            table.purge_expired(now, timeout);
            for dest in table.destinations() {
                let routes = table.routes(dest);
                prop_assert!(!routes.is_empty());
                prop_assert!(routes.iter().all(|r| now - r.last_update_ms <= timeout));
            }
        }
    }
}

// ============================================================================
// DISCOVERY PROPERTIES
// ============================================================================

#[cfg(test)]
mod discovery_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn visited_paths_have_no_duplicates(
            positions in prop::collection::vec(position_strategy(), 2..7),
            seed in any::<u64>(),
        ) {
            let mut config = SimulationConfig::test_config(&positions);
            config.seed = Some(seed);
            config.routing.echolocation.pulse_rate = 1.0;
            let mut sim = SwarmSimulation::new(config).unwrap();
            sim.run_until(0).unwrap();

            for agent in sim.agents() {
                let table = agent.routing().table();
                for dest in table.destinations() {
                    for route in table.routes(dest) {
                        let mut ids: Vec<u64> = route.path.iter().map(|id| id.as_u64()).collect();
                        let len = ids.len();
                        ids.sort_unstable();
                        ids.dedup();
                        prop_assert_eq!(ids.len(), len);
                        prop_assert_eq!(route.hop_count as usize, len - 1);
                        prop_assert_eq!(route.path[0], agent.id());
                    }
                }
            }
        }
    }
}
