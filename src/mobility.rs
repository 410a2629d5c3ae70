//! Kinematic collaborator
//!
//! The optimizer only sees the [`Kinematics`] trait. [`ReflectingMobility`]
//! is the stock implementation: straight-line integration between ticks,
//! reflection at the constraint area with a fixed margin, and an occasional
//! random heading change that keeps the current speed.

use crate::config::MobilityConfig;
use crate::rng::SimRng;
use crate::types::*;
use core::f32::consts::PI;
use libm::{cosf, fabsf, sinf};
use log::trace;

/// Read/write access to an agent's kinematic state
pub trait Kinematics {
    /// Current position
    fn position(&self) -> Position;

    /// Current velocity
    fn velocity(&self) -> Velocity;

    /// Overwrite position and velocity (optimizer write-back)
    fn set_position_and_velocity(&mut self, position: Position, velocity: Velocity);

    /// Speed limit (m/s)
    fn max_speed(&self) -> f32;

    /// Constraint area
    fn bounds(&self) -> Bounds;
}

/// Reflect a raw integrated position at the faces of `bounds`.
///
/// Per axis: `p <= min` pins to `min + margin` with a positive velocity
/// component, `p >= max` pins to `max - margin` with a negative one.
/// Returns the corrected state and whether any face was hit.
pub fn reflect(position: Position, velocity: Velocity, bounds: &Bounds, margin: f32) -> (Position, Velocity, bool) {
    let mut p = position;
    let mut v = velocity;
    let mut bounced = false;

    bounced |= reflect_axis(&mut p.x, &mut v.vx, bounds.min_x, bounds.max_x, margin);
    bounced |= reflect_axis(&mut p.y, &mut v.vy, bounds.min_y, bounds.max_y, margin);
    bounced |= reflect_axis(&mut p.z, &mut v.vz, bounds.min_z, bounds.max_z, margin);

    (p, v, bounced)
}

fn reflect_axis(p: &mut f32, v: &mut f32, min: f32, max: f32, margin: f32) -> bool {
    if *p <= min {
        *p = min + margin;
        *v = fabsf(*v);
        true
    } else if *p >= max {
        *p = max - margin;
        *v = -fabsf(*v);
        true
    } else {
        false
    }
}

/// Velocity of magnitude `speed` along a random heading (±30° elevation)
pub fn random_heading(speed: f32, rng: &mut SimRng) -> Velocity {
    let angle_xy = rng.uniform(0.0, 2.0 * PI);
    let angle_z = rng.uniform(-PI / 6.0, PI / 6.0);
    Velocity::new(
        speed * cosf(angle_xy) * cosf(angle_z),
        speed * sinf(angle_xy) * cosf(angle_z),
        speed * sinf(angle_z),
    )
}

/// Free-flight stepper with boundary reflection
#[derive(Debug, Clone)]
pub struct ReflectingMobility {
    position: Position,
    velocity: Velocity,
    config: MobilityConfig,
    last_update_ms: u64,
}

impl ReflectingMobility {
    pub fn new(position: Position, velocity: Velocity, config: MobilityConfig) -> Self {
        Self {
            position,
            velocity,
            config,
            last_update_ms: 0,
        }
    }

    /// Start with a random speed in `[min_speed, max_speed]` and a random heading
    pub fn with_random_velocity(position: Position, config: MobilityConfig, rng: &mut SimRng) -> Self {
        let speed = rng.uniform(config.min_speed, config.max_speed);
        let velocity = random_heading(speed, rng);
        Self::new(position, velocity, config)
    }

    pub fn config(&self) -> &MobilityConfig {
        &self.config
    }

    /// Start integrating from `now_ms` (agents joining mid-run)
    pub fn reset_clock(&mut self, now_ms: u64) {
        self.last_update_ms = now_ms;
    }

    /// Integrate up to `now_ms`; returns true when a face was hit
    pub fn step(&mut self, now_ms: u64, rng: &mut SimRng) -> bool {
        if now_ms <= self.last_update_ms {
            return false;
        }
        let dt = (now_ms - self.last_update_ms) as f32 / 1000.0;
        self.last_update_ms = now_ms;

        let raw = self.position.advanced_by(&self.velocity, dt);
        let (position, mut velocity, bounced) =
            reflect(raw, self.velocity, &self.config.bounds, self.config.boundary_margin);

        if bounced {
            trace!(
                "bounced at ({:.1}, {:.1}, {:.1})",
                position.x,
                position.y,
                position.z
            );
        } else if rng.next_f32() < self.config.direction_change_probability {
            let speed = velocity.magnitude();
            // a stationary agent stays stationary
            if speed > 0.0 {
                velocity = random_heading(speed, rng);
            }
        }

        self.position = position;
        self.velocity = velocity;
        bounced
    }
}

impl Kinematics for ReflectingMobility {
    fn position(&self) -> Position {
        self.position
    }

    fn velocity(&self) -> Velocity {
        self.velocity
    }

    fn set_position_and_velocity(&mut self, position: Position, velocity: Velocity) {
        self.position = position;
        self.velocity = velocity;
    }

    fn max_speed(&self) -> f32 {
        self.config.max_speed
    }

    fn bounds(&self) -> Bounds {
        self.config.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_inside_is_noop() {
        let bounds = Bounds::default();
        let p = Position::new(50.0, 50.0, 50.0);
        let v = Velocity::new(1.0, -1.0, 0.5);
        assert_eq!(reflect(p, v, &bounds, 5.0), (p, v, false));
    }

    #[test]
    fn test_reflect_max_face() {
        let bounds = Bounds::new(0.0, 100.0, 0.0, 100.0, 0.0, 100.0);
        let (p, v, bounced) = reflect(
            Position::new(101.0, 50.0, 50.0),
            Velocity::new(3.0, 0.0, 0.0),
            &bounds,
            5.0,
        );
        assert!(bounced);
        assert_eq!(p.x, 95.0);
        assert_eq!(v.vx, -3.0);
    }

    #[test]
    fn test_random_heading_keeps_speed() {
        let mut rng = SimRng::seed_from_u64(5);
        let v = random_heading(12.0, &mut rng);
        assert!((v.magnitude() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_step_stays_inside() {
        let mut rng = SimRng::seed_from_u64(11);
        let config = MobilityConfig::default();
        let mut m = ReflectingMobility::with_random_velocity(Position::new(10.0, 10.0, 10.0), config, &mut rng);
        for tick in 1..2000u64 {
            m.step(tick * 100, &mut rng);
            assert!(config.bounds.contains(&m.position(), 0.0));
        }
    }

    #[test]
    fn test_zero_velocity_direction_change_guard() {
        let mut rng = SimRng::seed_from_u64(3);
        let config = MobilityConfig {
            direction_change_probability: 1.0,
            ..MobilityConfig::default()
        };
        let mut m = ReflectingMobility::new(Position::new(50.0, 50.0, 50.0), Velocity::zero(), config);
        m.step(100, &mut rng);
        assert_eq!(m.velocity(), Velocity::zero());
        assert!(m.velocity().magnitude().is_finite());
    }
}
