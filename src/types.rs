//! Core type definitions for the bat swarm system

use core::fmt;
use core::ops::{Add, Sub};
use serde::{Deserialize, Serialize};

/// Maximum supported swarm size (power of two for `FnvIndexMap`)
pub const MAX_SWARM_SIZE: usize = 128;

/// Result type for swarm operations
pub type Result<T> = core::result::Result<T, SwarmError>;

/// Unique identifier for each agent in the swarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DroneId(pub u64);

impl DroneId {
    /// Create a new DroneId from a u64
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uav[{}]", self.0)
    }
}

/// 3D position vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate (meters)
    pub x: f32,
    /// Y coordinate (meters)
    pub y: f32,
    /// Z coordinate (altitude in meters)
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Calculate Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        libm::sqrtf(dx * dx + dy * dy + dz * dz)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Position reached after travelling with `velocity` for `dt` seconds
    pub fn advanced_by(&self, velocity: &Velocity, dt: f32) -> Position {
        Position {
            x: self.x + velocity.vx * dt,
            y: self.y + velocity.vy * dt,
            z: self.z + velocity.vz * dt,
        }
    }
}

impl Add<Velocity> for Position {
    type Output = Position;

    /// Offset a position by a displacement vector
    fn add(self, rhs: Velocity) -> Position {
        self.advanced_by(&rhs, 1.0)
    }
}

impl Sub for Position {
    type Output = Velocity;

    /// Displacement vector pointing from `rhs` to `self`
    fn sub(self, rhs: Position) -> Velocity {
        Velocity {
            vx: self.x - rhs.x,
            vy: self.y - rhs.y,
            vz: self.z - rhs.z,
        }
    }
}

/// Velocity vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// X velocity (m/s)
    pub vx: f32,
    /// Y velocity (m/s)
    pub vy: f32,
    /// Z velocity (m/s)
    pub vz: f32,
}

impl Velocity {
    pub const fn new(vx: f32, vy: f32, vz: f32) -> Self {
        Self { vx, vy, vz }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Magnitude (speed)
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.vx * self.vx + self.vy * self.vy + self.vz * self.vz)
    }

    /// Component-wise scaling
    pub fn scaled(&self, factor: f32) -> Velocity {
        Velocity {
            vx: self.vx * factor,
            vy: self.vy * factor,
            vz: self.vz * factor,
        }
    }

    /// Scale down to `max_speed` keeping direction; a zero vector is returned unchanged
    pub fn clamped_to(&self, max_speed: f32) -> Velocity {
        let speed = self.magnitude();
        if speed > max_speed && speed > 0.0 {
            self.scaled(max_speed / speed)
        } else {
            *self
        }
    }

    /// Velocity that covers `from -> to` in `dt` seconds
    pub fn from_displacement(from: &Position, to: &Position, dt: f32) -> Velocity {
        if dt <= 0.0 {
            return Velocity::zero();
        }
        (*to - *from).scaled(1.0 / dt)
    }
}

impl Add for Velocity {
    type Output = Velocity;

    fn add(self, rhs: Velocity) -> Velocity {
        Velocity {
            vx: self.vx + rhs.vx,
            vy: self.vy + rhs.vy,
            vz: self.vz + rhs.vz,
        }
    }
}

/// Axis-aligned constraint area (the "boundary configuration")
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1000.0,
            min_y: 0.0,
            max_y: 1000.0,
            min_z: 0.0,
            max_z: 200.0,
        }
    }
}

impl Bounds {
    pub const fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
        }
    }

    /// Clamp every axis into `[min + margin, max - margin]`
    pub fn clamp(&self, position: &Position, margin: f32) -> Position {
        Position {
            x: clamp_axis(position.x, self.min_x, self.max_x, margin),
            y: clamp_axis(position.y, self.min_y, self.max_y, margin),
            z: clamp_axis(position.z, self.min_z, self.max_z, margin),
        }
    }

    /// True when the point lies inside `[min + margin, max - margin]` on every axis
    pub fn contains(&self, position: &Position, margin: f32) -> bool {
        position.x >= self.min_x + margin
            && position.x <= self.max_x - margin
            && position.y >= self.min_y + margin
            && position.y <= self.max_y - margin
            && position.z >= self.min_z + margin
            && position.z <= self.max_z - margin
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_x >= self.max_x || self.min_y >= self.max_y || self.min_z >= self.max_z {
            return Err(SwarmError::ConfigError);
        }
        Ok(())
    }
}

fn clamp_axis(value: f32, min: f32, max: f32, margin: f32) -> f32 {
    // max(min + margin, min(max - margin, value)) so a degenerate band collapses to its lower edge
    let upper = max - margin;
    let lower = min + margin;
    let v = if value > upper { upper } else { value };
    if v < lower {
        lower
    } else {
        v
    }
}

/// Error types for the swarm system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwarmError {
    /// Configuration rejected by validation
    ConfigError,
    /// An essential collaborator (kinematics) is not wired
    MissingCollaborator,
    /// Unknown or duplicate agent id
    InvalidDroneId,
    /// Bounded buffer is full
    BufferFull,
    /// Swarm size exceeded
    SwarmSizeExceeded,
    /// Entropy source unavailable for seeding
    EntropyUnavailable,
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwarmError::ConfigError => write!(f, "Configuration error"),
            SwarmError::MissingCollaborator => write!(f, "Required collaborator not wired"),
            SwarmError::InvalidDroneId => write!(f, "Invalid drone ID"),
            SwarmError::BufferFull => write!(f, "Buffer overflow"),
            SwarmError::SwarmSizeExceeded => write!(f, "Swarm size exceeded"),
            SwarmError::EntropyUnavailable => write!(f, "Entropy source unavailable"),
        }
    }
}

impl std::error::Error for SwarmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_respects_margin() {
        let bounds = Bounds::new(0.0, 100.0, 0.0, 100.0, 0.0, 50.0);
        let p = bounds.clamp(&Position::new(-20.0, 120.0, 25.0), 5.0);
        assert_eq!(p, Position::new(5.0, 95.0, 25.0));
        assert!(bounds.contains(&p, 5.0));
    }

    #[test]
    fn test_zero_velocity_clamp_is_noop() {
        let v = Velocity::zero().clamped_to(0.0);
        assert_eq!(v, Velocity::zero());
    }

    #[test]
    fn test_clamp_preserves_direction() {
        let v = Velocity::new(30.0, 40.0, 0.0).clamped_to(10.0);
        assert!((v.magnitude() - 10.0).abs() < 1e-4);
        assert!((v.vx - 6.0).abs() < 1e-4);
        assert!((v.vy - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_displacement_velocity() {
        let from = Position::new(0.0, 0.0, 0.0);
        let to = Position::new(1.0, 2.0, 3.0);
        let v = Velocity::from_displacement(&from, &to, 0.5);
        assert_eq!(v, Velocity::new(2.0, 4.0, 6.0));
        assert_eq!(Velocity::from_displacement(&from, &to, 0.0), Velocity::zero());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let bounds = Bounds::new(10.0, 0.0, 0.0, 1.0, 0.0, 1.0);
        assert_eq!(bounds.validate(), Err(SwarmError::ConfigError));
    }
}
