//! Bat swarm demo
//!
//! This example shows how to:
//! - Configure a swarm with static and dynamic obstacles
//! - Run the optimizer and route discovery on one timeline
//! - Send data over discovered multi-hop routes
//! - Read the end-of-run report

use bat_swarm_system::*;

fn main() -> Result<()> {
    println!("🦇 Bat Algorithm UAV Swarm");
    println!("==========================\n");

    let positions = [
        Position::new(100.0, 100.0, 50.0),
        Position::new(250.0, 150.0, 60.0),
        Position::new(400.0, 200.0, 70.0),
        Position::new(150.0, 800.0, 90.0),
        Position::new(800.0, 850.0, 110.0),
        Position::new(900.0, 300.0, 40.0),
    ];

    let mut config = SimulationConfig::test_config(&positions);
    config.optimizer_only = false;
    config.routing.initial_delay_min_ms = 2000;
    config.routing.initial_delay_max_ms = 3000;
    config.obstacles = vec![
        ObstacleConfig {
            position: Position::new(300.0, 300.0, 80.0),
            radius: 40.0,
            ..ObstacleConfig::default()
        },
        ObstacleConfig {
            position: Position::new(600.0, 600.0, 100.0),
            radius: 25.0,
            is_dynamic: true,
            speed: 8.0,
            ..ObstacleConfig::default()
        },
    ];
    config.validate()?;
    println!("✓ Configuration validated");
    println!("  - Agents: {}", config.agents.len());
    println!("  - Obstacles: {}", config.obstacles.len());
    println!(
        "  - Target: ({:.0}, {:.0}, {:.0})\n",
        config.optimizer.target_position.x, config.optimizer.target_position.y, config.optimizer.target_position.z
    );

    let mut sim = SwarmSimulation::new(config)?;

    for second in 1..=30u64 {
        sim.run_until(second * 1000)?;
        if second % 5 == 0 {
            let stats = telemetry::SwarmStats::from_directory(sim.directory());
            println!(
                "t={:>2}s  mean fitness {:>7.1}  spread {:>6.1} m  routes {}",
                second,
                stats.mean_fitness,
                stats.spread,
                sim.telemetry().routes_discovered
            );
        }
    }

    println!("\n📡 Sending data over discovered routes");
    let ids: Vec<DroneId> = sim.agent_ids().collect();
    for &source in &ids {
        for &destination in &ids {
            if source != destination {
                sim.send_data(source, destination);
            }
        }
    }
    sim.run_for(0)?;

    let report = sim.finish();
    println!("\n📊 Final report (t = {} ms)", report.time_ms);
    for s in &report.optimizers {
        println!(
            "  {}  fitness {:>7.2}  distance {:>7.2} m  best {:>7.2}  avoided {:>3}  {}",
            s.id,
            s.final_fitness,
            s.final_distance_to_target,
            s.personal_best_fitness,
            s.obstacles_avoided,
            if s.target_reached { "at target" } else { "" }
        );
    }
    for r in &report.routing {
        println!("  {}  {} destinations {:?}", r.id, r.destinations, r.routes_per_destination);
    }
    let t = &report.telemetry;
    println!("\n  routes discovered: {}", t.routes_discovered);
    println!("  packets routed:    {}", t.packets_routed);
    println!("  packets dropped:   {}", t.packets_dropped);
    println!("  data delivered:    {}", t.data_delivered);
    println!("  agents at target:  {}", report.agents_at_target());

    Ok(())
}
