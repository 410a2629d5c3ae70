//! Circular obstacle geometry
//!
//! Static obstacles never move. Dynamic obstacles integrate their own
//! velocity on a periodic tick and bounce off planar bounds, using their
//! radius as the margin so the whole disc stays inside.
//!
//! The optimizer only ever reads the field; the swarm owns it and advances
//! dynamic obstacles through the scheduler.

use crate::config::{ObstacleConfig, PlanarBounds};
use crate::rng::SimRng;
use crate::types::*;
use heapless::Vec;
use libm::{cosf, fabsf, sinf};
use log::{debug, trace};

/// Maximum obstacles in one field
pub const MAX_OBSTACLES: usize = 64;

/// Penalty floor for a point inside an obstacle
pub const INTERIOR_PENALTY: f32 = 10_000.0;

/// Penalty slope per meter of intrusion
pub const PENALTY_SLOPE: f32 = 100.0;

/// Motion state of a dynamic obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleMotion {
    pub velocity: Velocity,
    pub bounds: PlanarBounds,
    pub update_interval_ms: u32,
}

/// Circular (spherical for distance purposes) obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub position: Position,
    pub radius: f32,
    pub motion: Option<ObstacleMotion>,
}

impl Obstacle {
    pub fn new_static(position: Position, radius: f32) -> Self {
        Self {
            position,
            radius,
            motion: None,
        }
    }

    pub fn new_dynamic(position: Position, radius: f32, motion: ObstacleMotion) -> Self {
        Self {
            position,
            radius,
            motion: Some(motion),
        }
    }

    /// Build from configuration; a dynamic obstacle gets a random planar heading
    pub fn from_config(config: &ObstacleConfig, rng: &mut SimRng) -> Self {
        if !config.is_dynamic {
            return Self::new_static(config.position, config.radius);
        }
        let angle = rng.uniform(0.0, 2.0 * core::f32::consts::PI);
        let velocity = Velocity::new(cosf(angle) * config.speed, sinf(angle) * config.speed, 0.0);
        Self::new_dynamic(
            config.position,
            config.radius,
            ObstacleMotion {
                velocity,
                bounds: config.bounds,
                update_interval_ms: config.update_interval_ms,
            },
        )
    }

    pub fn is_dynamic(&self) -> bool {
        self.motion.is_some()
    }

    /// Signed distance from `point` to the obstacle surface (negative inside)
    pub fn distance_to_edge(&self, point: &Position) -> f32 {
        self.position.distance_to(point) - self.radius
    }

    /// True when `point` is closer than `radius + margin` to the centre
    pub fn check_collision(&self, point: &Position, margin: f32) -> bool {
        self.position.distance_to(point) < self.radius + margin
    }

    /// Advance a dynamic obstacle by `dt` seconds; returns true on a bounce
    pub fn step(&mut self, dt: f32) -> bool {
        let Some(motion) = self.motion.as_mut() else {
            return false;
        };
        self.position = self.position.advanced_by(&motion.velocity, dt);

        let b = motion.bounds;
        let r = self.radius;
        let mut bounced = false;

        if self.position.x - r < b.min_x {
            self.position.x = b.min_x + r;
            motion.velocity.vx = fabsf(motion.velocity.vx);
            bounced = true;
        } else if self.position.x + r > b.max_x {
            self.position.x = b.max_x - r;
            motion.velocity.vx = -fabsf(motion.velocity.vx);
            bounced = true;
        }

        if self.position.y - r < b.min_y {
            self.position.y = b.min_y + r;
            motion.velocity.vy = fabsf(motion.velocity.vy);
            bounced = true;
        } else if self.position.y + r > b.max_y {
            self.position.y = b.max_y - r;
            motion.velocity.vy = -fabsf(motion.velocity.vy);
            bounced = true;
        }

        if bounced {
            trace!(
                "obstacle bounced at ({:.1}, {:.1})",
                self.position.x,
                self.position.y
            );
        }
        bounced
    }
}

/// Penalty contributed by one obstacle at signed edge distance `distance_to_edge`
pub fn edge_penalty(distance_to_edge: f32, safety_distance: f32) -> f32 {
    if distance_to_edge < 0.0 {
        INTERIOR_PENALTY - distance_to_edge * PENALTY_SLOPE
    } else if distance_to_edge < safety_distance {
        (safety_distance - distance_to_edge) * PENALTY_SLOPE
    } else {
        0.0
    }
}

/// All obstacles of one run
#[derive(Debug, Clone, Default)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle, MAX_OBSTACLES>,
}

impl ObstacleField {
    /// An empty field is a valid configuration
    pub fn new() -> Self {
        Self { obstacles: Vec::new() }
    }

    pub fn from_configs(configs: &[ObstacleConfig], rng: &mut SimRng) -> Result<Self> {
        let mut field = Self::new();
        for config in configs {
            config.validate()?;
            field.push(Obstacle::from_config(config, rng))?;
        }
        debug!(
            "obstacle field: {} obstacles ({} dynamic)",
            field.len(),
            field.iter().filter(|o| o.is_dynamic()).count()
        );
        Ok(field)
    }

    pub fn push(&mut self, obstacle: Obstacle) -> Result<()> {
        self.obstacles.push(obstacle).map_err(|_| SwarmError::BufferFull)
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Obstacle> {
        self.obstacles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    /// Summed obstacle penalty at `point`, counting only obstacles whose
    /// edge lies within `detection_range`
    pub fn penalty(&self, point: &Position, safety_distance: f32, detection_range: f32) -> f32 {
        self.obstacles
            .iter()
            .map(|o| o.distance_to_edge(point))
            .filter(|d| *d < detection_range)
            .map(|d| edge_penalty(d, safety_distance))
            .sum()
    }

    /// No obstacle collides with `point` given `margin`
    pub fn is_position_safe(&self, point: &Position, margin: f32) -> bool {
        !self.obstacles.iter().any(|o| o.check_collision(point, margin))
    }

    /// Advance the dynamic obstacle at `index`.
    ///
    /// Returns its tick period and whether it bounced; `None` for a static
    /// or unknown obstacle.
    pub fn step_obstacle(&mut self, index: usize) -> Option<(u32, bool)> {
        let obstacle = self.obstacles.get_mut(index)?;
        let interval = obstacle.motion.as_ref()?.update_interval_ms;
        let bounced = obstacle.step(interval as f32 / 1000.0);
        Some((interval, bounced))
    }
}
