//! Bat Algorithm position optimizer
//!
//! Per-agent solver based on Yang's bat-inspired metaheuristic, reduced to
//! target convergence with obstacle and peer avoidance:
//! - Frequency tuning sets the step size toward the global best
//! - Loudness gates acceptance of an improving candidate and decays on success
//! - Pulse rate gates a local random walk around the global best
//!
//! Fitness (lower is better):
//! `distance(p, target) + obstacle_weight * obstacle_penalty(p) + peer_penalty(p)`
//!
//! Velocity is damped by a fixed inertia and clamped to the agent's maximum
//! speed both before the candidate is generated and after it is accepted,
//! which keeps the update numerically bounded.

use crate::config::OptimizerConfig;
use crate::directory::{AgentSnapshot, SwarmDirectory};
use crate::echolocation::Echolocation;
use crate::mobility::Kinematics;
use crate::obstacle::ObstacleField;
use crate::rng::SimRng;
use crate::types::*;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Fraction of the previous velocity kept on each update
pub const INERTIA: f32 = 0.5;

/// Penalty per meter of intrusion into another agent's safety sphere
pub const PEER_PENALTY_SLOPE: f32 = 50.0;

/// Local search radius per unit of loudness (meters)
pub const LOCAL_SEARCH_SCALE: f32 = 5.0;

/// Mutable state of one bat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub velocity: Velocity,
    pub frequency: f32,
    pub loudness: f32,
    pub pulse_rate: f32,
    pub fitness: f32,
    pub personal_best_position: Position,
    pub personal_best_fitness: f32,
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Main candidate accepted; loudness and pulse rate decayed
    Accepted { fitness: f32 },
    /// Local search around the global best produced a better position
    LocalSearch { fitness: f32 },
    /// Position left unchanged
    Rejected,
}

impl StepOutcome {
    pub fn moved(&self) -> bool {
        !matches!(self, StepOutcome::Rejected)
    }
}

/// End-of-run values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSummary {
    pub id: DroneId,
    pub final_fitness: f32,
    pub final_distance_to_target: f32,
    pub personal_best_fitness: f32,
    pub obstacles_avoided: u32,
    pub target_reached: bool,
}

/// Position optimizer of one agent
#[derive(Debug, Clone)]
pub struct PositionOptimizer {
    id: DroneId,
    config: OptimizerConfig,
    echolocation: Echolocation,
    position: Position,
    velocity: Velocity,
    fitness: f32,
    personal_best_position: Position,
    personal_best_fitness: f32,
    max_speed: f32,
    obstacles_avoided: u32,
    /// Best peer personal best and the time it was resolved
    peer_best_cache: Option<(Position, f32, u64)>,
}

impl PositionOptimizer {
    /// Initialise from the agent's kinematic state.
    ///
    /// The personal best starts at the initial position with its fitness.
    pub fn new<K: Kinematics + ?Sized>(
        id: DroneId,
        config: OptimizerConfig,
        kinematics: &K,
        obstacles: &ObstacleField,
        directory: &SwarmDirectory,
    ) -> Result<Self> {
        config.validate()?;

        let mut optimizer = Self {
            id,
            config,
            echolocation: Echolocation::new(config.echolocation),
            position: kinematics.position(),
            velocity: kinematics.velocity(),
            fitness: f32::INFINITY,
            personal_best_position: kinematics.position(),
            personal_best_fitness: f32::INFINITY,
            max_speed: kinematics.max_speed(),
            obstacles_avoided: 0,
            peer_best_cache: None,
        };
        let fitness = optimizer.fitness_at(&optimizer.position, obstacles, directory);
        optimizer.fitness = fitness;
        optimizer.personal_best_fitness = fitness;

        debug!(
            "{} optimizer initialised at ({:.1}, {:.1}, {:.1}), fitness {:.2}, {} obstacles",
            id,
            optimizer.position.x,
            optimizer.position.y,
            optimizer.position.z,
            fitness,
            obstacles.len()
        );
        Ok(optimizer)
    }

    pub fn id(&self) -> DroneId {
        self.id
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn echolocation(&self) -> &Echolocation {
        &self.echolocation
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    pub fn personal_best(&self) -> (Position, f32) {
        (self.personal_best_position, self.personal_best_fitness)
    }

    pub fn obstacles_avoided(&self) -> u32 {
        self.obstacles_avoided
    }

    pub fn state(&self) -> AgentState {
        AgentState {
            position: self.position,
            velocity: self.velocity,
            frequency: self.echolocation.frequency(),
            loudness: self.echolocation.loudness(),
            pulse_rate: self.echolocation.pulse_rate(),
            fitness: self.fitness,
            personal_best_position: self.personal_best_position,
            personal_best_fitness: self.personal_best_fitness,
        }
    }

    /// Immutable view published to peers
    pub fn snapshot(&self, now_ms: u64) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            max_speed: self.max_speed,
            fitness: self.fitness,
            personal_best_position: self.personal_best_position,
            personal_best_fitness: self.personal_best_fitness,
            timestamp_ms: now_ms,
        }
    }

    pub fn distance_to_target(&self) -> f32 {
        self.position.distance_to(&self.config.target_position)
    }

    pub fn has_reached_target(&self) -> bool {
        self.distance_to_target() <= self.config.target_radius
    }

    pub fn summary(&self) -> OptimizerSummary {
        OptimizerSummary {
            id: self.id,
            final_fitness: self.fitness,
            final_distance_to_target: self.distance_to_target(),
            personal_best_fitness: self.personal_best_fitness,
            obstacles_avoided: self.obstacles_avoided,
            target_reached: self.has_reached_target(),
        }
    }

    /// Penalty from other agents inside `uav_safety_distance` of `position`
    pub fn peer_proximity_penalty(&self, position: &Position, directory: &SwarmDirectory) -> f32 {
        let limit = self.config.uav_safety_distance;
        directory
            .peers(self.id)
            .map(|peer| position.distance_to(&peer.position))
            .filter(|d| *d < limit)
            .map(|d| (limit - d) * PEER_PENALTY_SLOPE)
            .sum()
    }

    /// Weighted obstacle penalty at `position`
    pub fn obstacle_penalty(&self, position: &Position, obstacles: &ObstacleField) -> f32 {
        obstacles.penalty(position, self.config.safety_distance, self.config.detection_range)
    }

    /// Full fitness of `position`
    pub fn fitness_at(&self, position: &Position, obstacles: &ObstacleField, directory: &SwarmDirectory) -> f32 {
        position.distance_to(&self.config.target_position)
            + self.config.obstacle_weight * self.obstacle_penalty(position, obstacles)
            + self.peer_proximity_penalty(position, directory)
    }

    /// No obstacle within `safety_distance` of `position`
    pub fn is_position_safe(&self, position: &Position, obstacles: &ObstacleField) -> bool {
        obstacles.is_position_safe(position, self.config.safety_distance)
    }

    /// Lowest personal best among this agent and its peers (ties: first seen)
    pub fn global_best(&mut self, directory: &SwarmDirectory, now_ms: u64) -> Position {
        let refresh = self.config.global_best_refresh_ms as u64;
        let cached = match self.peer_best_cache {
            Some((p, f, at)) if refresh > 0 && now_ms.saturating_sub(at) < refresh => Some((p, f)),
            _ => None,
        };
        let peer_best = match cached {
            Some(best) => Some(best),
            None => {
                let mut best: Option<(Position, f32)> = None;
                for peer in directory.peers(self.id) {
                    if best.map_or(true, |(_, f)| peer.personal_best_fitness < f) {
                        best = Some((peer.personal_best_position, peer.personal_best_fitness));
                    }
                }
                self.peer_best_cache = best.map(|(p, f)| (p, f, now_ms));
                best
            }
        };

        match peer_best {
            Some((p, f)) if f < self.personal_best_fitness => p,
            _ => self.personal_best_position,
        }
    }

    /// One optimizer tick at `now_ms`.
    ///
    /// Reads the position from `kinematics`, writes back an accepted move and
    /// publishes the resulting snapshot to `directory`.
    pub fn step<K: Kinematics + ?Sized>(
        &mut self,
        now_ms: u64,
        kinematics: &mut K,
        obstacles: &ObstacleField,
        directory: &mut SwarmDirectory,
        rng: &mut SimRng,
    ) -> Result<StepOutcome> {
        let dt = self.config.update_interval_s();
        let bounds = kinematics.bounds();
        let margin = self.config.boundary_margin;
        self.max_speed = kinematics.max_speed();

        // state assessment
        let position = kinematics.position();
        self.position = position;
        let fitness = self.fitness_at(&position, obstacles, directory);
        self.fitness = fitness;

        if fitness < self.personal_best_fitness {
            self.personal_best_position = position;
            self.personal_best_fitness = fitness;
            trace!("{} new personal best {:.2}", self.id, fitness);
        }

        let global_best = self.global_best(directory, now_ms);

        // velocity update
        let frequency = self.echolocation.tune_frequency(rng);
        let velocity = self.velocity.scaled(INERTIA) + (global_best - position).scaled(frequency);
        self.velocity = velocity.clamped_to(self.max_speed);

        // candidate
        let candidate = bounds.clamp(&position.advanced_by(&self.velocity, dt), margin);
        let candidate_fitness = self.fitness_at(&candidate, obstacles, directory);

        let outcome = if candidate_fitness < fitness && self.echolocation.loud_enough(rng) {
            self.move_to(candidate, candidate_fitness, dt, kinematics);
            self.echolocation.decay(now_ms as f32 / 1000.0);
            trace!(
                "{} accepted candidate, fitness {:.2}, loudness {:.3}, pulse rate {:.3}",
                self.id,
                candidate_fitness,
                self.echolocation.loudness(),
                self.echolocation.pulse_rate()
            );
            StepOutcome::Accepted {
                fitness: candidate_fitness,
            }
        } else {
            if !self.is_position_safe(&candidate, obstacles) {
                self.obstacles_avoided += 1;
            }
            if self.echolocation.pulse_silent(rng) {
                self.local_search(global_best, fitness, dt, margin, bounds, kinematics, obstacles, directory, rng)
            } else {
                StepOutcome::Rejected
            }
        };

        trace!(
            "{} broadcasting pos=({:.0},{:.0},{:.0}) fitness={:.1}",
            self.id,
            self.position.x,
            self.position.y,
            self.position.z,
            self.fitness
        );
        directory.publish(self.snapshot(now_ms))?;
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn local_search<K: Kinematics + ?Sized>(
        &mut self,
        global_best: Position,
        fitness: f32,
        dt: f32,
        margin: f32,
        bounds: Bounds,
        kinematics: &mut K,
        obstacles: &ObstacleField,
        directory: &SwarmDirectory,
        rng: &mut SimRng,
    ) -> StepOutcome {
        let radius = LOCAL_SEARCH_SCALE * self.echolocation.loudness();
        let offset = Velocity::new(
            rng.uniform(-radius, radius),
            rng.uniform(-radius, radius),
            rng.uniform(-radius / 2.0, radius / 2.0),
        );
        let local = bounds.clamp(&(global_best + offset), margin);
        let local_fitness = self.fitness_at(&local, obstacles, directory);

        if local_fitness < fitness {
            self.move_to(local, local_fitness, dt, kinematics);
            trace!("{} local search improved fitness to {:.2}", self.id, local_fitness);
            StepOutcome::LocalSearch {
                fitness: local_fitness,
            }
        } else {
            StepOutcome::Rejected
        }
    }

    /// Velocity follows the true displacement, re-clamped to the speed limit
    fn move_to<K: Kinematics + ?Sized>(&mut self, target: Position, fitness: f32, dt: f32, kinematics: &mut K) {
        let velocity = Velocity::from_displacement(&self.position, &target, dt).clamped_to(self.max_speed);
        kinematics.set_position_and_velocity(target, velocity);
        self.position = target;
        self.velocity = velocity;
        self.fitness = fitness;
    }
}
