//! Swarm telemetry
//!
//! Run-wide counters updated by the simulation loop, swarm statistics
//! aggregated from directory snapshots, and the end-of-run report.
//!
//! # Example
//! ```ignore
//! use bat_swarm_system::telemetry::SwarmTelemetry;
//!
//! let mut telemetry = SwarmTelemetry::default();
//! telemetry.record_routes_discovered(1);
//! ```

use crate::directory::SwarmDirectory;
use crate::network::RoutingSummary;
use crate::optimizer::{OptimizerSummary, StepOutcome};
use crate::types::*;
use log::info;
use serde::{Deserialize, Serialize};

/// Event counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmTelemetry {
    /// Optimizer candidates accepted
    pub moves_accepted: u64,
    /// Local search moves accepted
    pub local_moves: u64,
    /// Ticks that left the agent in place
    pub moves_rejected: u64,
    /// Free-flight steps that hit a boundary
    pub boundary_bounces: u64,
    /// Dynamic obstacles that hit a boundary
    pub obstacle_bounces: u64,
    pub discoveries_sent: u64,
    pub discoveries_forwarded: u64,
    pub discoveries_discarded: u64,
    /// Routes that made it into some route table
    pub routes_discovered: u64,
    /// Data messages that found a route
    pub packets_routed: u64,
    /// Data messages dropped (no route or broken path)
    pub packets_dropped: u64,
    /// Data messages that reached their destination
    pub data_delivered: u64,
    /// Envelopes addressed to agents that no longer exist
    pub envelopes_undeliverable: u64,
}

impl SwarmTelemetry {
    pub fn record_step(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Accepted { .. } => self.moves_accepted += 1,
            StepOutcome::LocalSearch { .. } => self.local_moves += 1,
            StepOutcome::Rejected => self.moves_rejected += 1,
        }
    }

    pub fn record_routes_discovered(&mut self, count: u64) {
        self.routes_discovered += count;
    }
}

/// Snapshot statistics of the swarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmStats {
    /// Agents in the directory
    pub active_agents: usize,
    /// Mean published fitness
    pub mean_fitness: f32,
    /// Lowest published fitness
    pub best_fitness: f32,
    /// Average speed
    pub avg_speed: f32,
    /// Maximum speed
    pub max_speed: f32,
    /// Swarm center position
    pub center: Position,
    /// Swarm spread (max distance from center)
    pub spread: f32,
}

impl SwarmStats {
    /// Aggregate every snapshot in the directory
    pub fn from_directory(directory: &SwarmDirectory) -> Self {
        let mut stats = SwarmStats::default();
        let snapshots: std::vec::Vec<_> = directory
            .agent_ids()
            .filter_map(|id| directory.get(id))
            .collect();
        if snapshots.is_empty() {
            return stats;
        }

        let mut total_fitness = 0.0;
        let mut total_speed = 0.0;
        let (mut cx, mut cy, mut cz) = (0.0, 0.0, 0.0);
        stats.best_fitness = f32::INFINITY;

        for s in &snapshots {
            stats.active_agents += 1;
            total_fitness += s.fitness;
            stats.best_fitness = stats.best_fitness.min(s.fitness);

            let speed = s.velocity.magnitude();
            total_speed += speed;
            stats.max_speed = stats.max_speed.max(speed);

            cx += s.position.x;
            cy += s.position.y;
            cz += s.position.z;
        }

        let n = stats.active_agents as f32;
        stats.mean_fitness = total_fitness / n;
        stats.avg_speed = total_speed / n;
        stats.center = Position::new(cx / n, cy / n, cz / n);

        for s in &snapshots {
            stats.spread = stats.spread.max(s.position.distance_to(&stats.center));
        }
        stats
    }
}

/// End-of-run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmReport {
    /// Simulation time when the report was taken (ms)
    pub time_ms: u64,
    pub telemetry: SwarmTelemetry,
    pub stats: SwarmStats,
    pub optimizers: std::vec::Vec<OptimizerSummary>,
    pub routing: std::vec::Vec<RoutingSummary>,
}

impl SwarmReport {
    /// Agents within their target radius
    pub fn agents_at_target(&self) -> usize {
        self.optimizers.iter().filter(|s| s.target_reached).count()
    }

    /// Total obstacles avoided across the swarm
    pub fn obstacles_avoided(&self) -> u32 {
        self.optimizers.iter().map(|s| s.obstacles_avoided).sum()
    }

    /// Emit the report through the `log` facade
    pub fn log(&self) {
        info!(
            "t={}ms agents={} at_target={} mean_fitness={:.2} spread={:.1}",
            self.time_ms,
            self.stats.active_agents,
            self.agents_at_target(),
            self.stats.mean_fitness,
            self.stats.spread
        );
        info!(
            "routes discovered={} packets routed={} dropped={} delivered={}",
            self.telemetry.routes_discovered,
            self.telemetry.packets_routed,
            self.telemetry.packets_dropped,
            self.telemetry.data_delivered
        );
        for s in &self.optimizers {
            info!(
                "{} fitness={:.2} distance={:.2} best={:.2} avoided={}",
                s.id, s.final_fitness, s.final_distance_to_target, s.personal_best_fitness, s.obstacles_avoided
            );
        }
        for r in &self.routing {
            info!(
                "{} routes to {} destinations {:?}",
                r.id, r.destinations, r.routes_per_destination
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::AgentSnapshot;

    fn snapshot(id: u64, x: f32, fitness: f32) -> AgentSnapshot {
        let p = Position::new(x, 0.0, 0.0);
        AgentSnapshot {
            id: DroneId::new(id),
            position: p,
            velocity: Velocity::new(3.0, 4.0, 0.0),
            max_speed: 10.0,
            fitness,
            personal_best_position: p,
            personal_best_fitness: fitness,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = SwarmStats::from_directory(&SwarmDirectory::new());
        assert_eq!(stats.active_agents, 0);
        assert_eq!(stats.spread, 0.0);
    }

    #[test]
    fn test_stats_aggregate() {
        let mut dir = SwarmDirectory::new();
        dir.publish(snapshot(0, 0.0, 10.0)).unwrap();
        dir.publish(snapshot(1, 10.0, 20.0)).unwrap();
        let stats = SwarmStats::from_directory(&dir);
        assert_eq!(stats.active_agents, 2);
        assert!((stats.mean_fitness - 15.0).abs() < 1e-6);
        assert_eq!(stats.best_fitness, 10.0);
        assert!((stats.avg_speed - 5.0).abs() < 1e-6);
        assert!((stats.center.x - 5.0).abs() < 1e-6);
        assert!((stats.spread - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_record_step() {
        let mut t = SwarmTelemetry::default();
        t.record_step(StepOutcome::Accepted { fitness: 1.0 });
        t.record_step(StepOutcome::Rejected);
        t.record_step(StepOutcome::LocalSearch { fitness: 1.0 });
        assert_eq!((t.moves_accepted, t.moves_rejected, t.local_moves), (1, 1, 1));
    }
}
