//! End-to-end tests for the swarm simulation
//!
//! Whole runs on the discrete-event timeline: routing over a relay chain,
//! data delivery, agent departure and reproducibility.

use bat_swarm_system::*;

/// Four agents 200 m apart, routing parameters that never suppress a flood
fn chain_config() -> SimulationConfig {
    let positions: Vec<Position> = (0..4)
        .map(|i| Position::new(100.0 + 200.0 * i as f32, 500.0, 100.0))
        .collect();
    let mut config = SimulationConfig::test_config(&positions);
    config.routing.echolocation.loudness = 1.0;
    config.routing.echolocation.pulse_rate = 1.0;
    config.routing.echolocation.alpha = 1.0;
    config
}

#[cfg(test)]
mod routing_tests {
    use super::*;

    #[test]
    fn test_chain_route_has_three_hops() {
        let mut sim = SwarmSimulation::new(chain_config()).unwrap();
        sim.run_until(0).unwrap();

        let origin = sim.agent(DroneId::new(0)).unwrap();
        let route = origin.routing().best_route(DroneId::new(3)).expect("route 0 -> 3");
        assert_eq!(route.hop_count, 3);
        assert!(sim.telemetry().routes_discovered >= 3);
    }

    #[test]
    fn test_data_follows_discovered_route() {
        let mut sim = SwarmSimulation::new(chain_config()).unwrap();
        sim.run_until(0).unwrap();

        assert!(sim.send_data(DroneId::new(0), DroneId::new(3)));
        sim.run_until(0).unwrap();
        assert_eq!(sim.telemetry().packets_routed, 1);
        assert_eq!(sim.telemetry().data_delivered, 1);
    }

    #[test]
    fn test_data_without_route_dropped() {
        let mut sim = SwarmSimulation::new(chain_config()).unwrap();
        // nothing discovered yet
        assert!(!sim.send_data(DroneId::new(0), DroneId::new(3)));
        assert_eq!(sim.telemetry().packets_dropped, 1);
        assert_eq!(sim.telemetry().packets_routed, 0);
    }

    #[test]
    fn test_initial_routing_delay() {
        let mut config = chain_config();
        config.routing.initial_delay_min_ms = 2000;
        config.routing.initial_delay_max_ms = 3000;
        let mut sim = SwarmSimulation::new(config).unwrap();

        sim.run_until(1999).unwrap();
        assert_eq!(sim.telemetry().discoveries_sent, 0);
        sim.run_until(3000).unwrap();
        assert!(sim.telemetry().discoveries_sent > 0);
    }

    #[test]
    fn test_departed_agent_breaks_routes() {
        let mut sim = SwarmSimulation::new(chain_config()).unwrap();
        sim.run_until(0).unwrap();
        assert!(sim.remove_agent(DroneId::new(2)).is_some());

        // path 0-1-2-3 now crosses a missing relay
        assert!(sim.send_data(DroneId::new(0), DroneId::new(3)));
        sim.run_until(0).unwrap();
        assert_eq!(sim.telemetry().data_delivered, 0);
        assert_eq!(sim.telemetry().packets_dropped, 1);
    }
}

#[cfg(test)]
mod simulation_tests {
    use super::*;

    fn free_flight_config(seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig::test_config(&[
            Position::new(100.0, 100.0, 50.0),
            Position::new(150.0, 120.0, 60.0),
            Position::new(800.0, 200.0, 80.0),
            Position::new(300.0, 700.0, 120.0),
        ]);
        config.seed = Some(seed);
        config.optimizer_only = false;
        config.obstacles.push(ObstacleConfig {
            position: Position::new(400.0, 400.0, 80.0),
            radius: 30.0,
            is_dynamic: true,
            ..ObstacleConfig::default()
        });
        config.obstacles.push(ObstacleConfig {
            position: Position::new(250.0, 250.0, 60.0),
            radius: 20.0,
            ..ObstacleConfig::default()
        });
        config
    }

    fn positions(sim: &SwarmSimulation) -> Vec<Position> {
        sim.agents().map(|a| a.position()).collect()
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = SwarmSimulation::new(free_flight_config(42)).unwrap();
        let mut b = SwarmSimulation::new(free_flight_config(42)).unwrap();
        a.run_until(5000).unwrap();
        b.run_until(5000).unwrap();

        assert_eq!(positions(&a), positions(&b));
        assert_eq!(a.telemetry(), b.telemetry());
        assert_eq!(a.obstacles().get(0).unwrap().position, b.obstacles().get(0).unwrap().position);
    }

    #[test]
    fn test_agents_stay_inside_bounds() {
        let mut sim = SwarmSimulation::new(free_flight_config(7)).unwrap();
        sim.run_until(20_000).unwrap();
        let bounds = sim.config().mobility.bounds;
        for agent in sim.agents() {
            assert!(bounds.contains(&agent.position(), 0.0), "{:?}", agent.position());
        }
        assert_eq!(sim.now(), 20_000);
    }

    #[test]
    fn test_dynamic_obstacle_moves() {
        let mut sim = SwarmSimulation::new(free_flight_config(3)).unwrap();
        let start = sim.obstacles().get(0).unwrap().position;
        sim.run_until(1000).unwrap();
        assert_ne!(sim.obstacles().get(0).unwrap().position, start);
        assert_eq!(
            sim.obstacles().get(1).unwrap().position,
            Position::new(250.0, 250.0, 60.0)
        );
    }

    #[test]
    fn test_report_covers_every_agent() {
        let mut sim = SwarmSimulation::new(free_flight_config(1)).unwrap();
        sim.run_until(3000).unwrap();
        let report = sim.finish();
        assert_eq!(report.optimizers.len(), 4);
        assert_eq!(report.routing.len(), 4);
        assert_eq!(report.stats.active_agents, 4);
        assert_eq!(report.time_ms, 3000);
        let ticks = report.telemetry.moves_accepted + report.telemetry.local_moves + report.telemetry.moves_rejected;
        // 30 optimizer ticks per agent
        assert_eq!(ticks, 120);
    }

    #[test]
    fn test_agent_added_mid_run() {
        let mut sim = SwarmSimulation::new(free_flight_config(5)).unwrap();
        sim.run_until(1000).unwrap();
        let id = sim.add_agent(AgentConfig::at(Position::new(500.0, 500.0, 100.0))).unwrap();
        assert_eq!(id, DroneId::new(4));
        assert!(sim.directory().contains(id));
        sim.run_until(2000).unwrap();
        assert_eq!(sim.directory().get(id).unwrap().timestamp_ms, 2000);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = free_flight_config(1);
        config.mobility.max_speed = -1.0;
        assert_eq!(SwarmSimulation::new(config).unwrap_err(), SwarmError::ConfigError);
    }
}
