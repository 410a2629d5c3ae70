//! Configuration management for the bat swarm system
//!
//! Every recognised option lives in one of the structs below. All of them
//! implement `Default`, deserialize with missing fields filled from the
//! defaults, and expose `validate()` so a bad value is rejected before any
//! agent is wired.

use crate::network::{MAX_PATH_NODES, MAX_ROUTES_PER_DESTINATION};
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Echolocation parameters shared by the optimizer and the routing protocol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcholocationConfig {
    /// Minimum frequency
    pub frequency_min: f32,
    /// Maximum frequency
    pub frequency_max: f32,
    /// Initial loudness A (0-1)
    pub loudness: f32,
    /// Initial pulse emission rate r (0-1)
    pub pulse_rate: f32,
    /// Loudness reduction factor
    pub alpha: f32,
    /// Pulse rate increase factor
    pub gamma: f32,
}

impl Default for EcholocationConfig {
    fn default() -> Self {
        Self {
            frequency_min: 0.0,
            frequency_max: 1.0,
            loudness: 0.95,
            pulse_rate: 0.5,
            alpha: 0.9,
            gamma: 0.9,
        }
    }
}

impl EcholocationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.frequency_min.is_finite() || !self.frequency_max.is_finite() {
            return Err(SwarmError::ConfigError);
        }
        if self.frequency_min < 0.0 || self.frequency_min > self.frequency_max {
            return Err(SwarmError::ConfigError);
        }
        if !(0.0..=1.0).contains(&self.loudness) || !(0.0..=1.0).contains(&self.pulse_rate) {
            return Err(SwarmError::ConfigError);
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) || !(self.gamma >= 0.0 && self.gamma.is_finite()) {
            return Err(SwarmError::ConfigError);
        }
        Ok(())
    }
}

/// Position optimizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub echolocation: EcholocationConfig,
    /// Tick period (milliseconds)
    pub update_interval_ms: u32,
    /// Point the swarm converges on
    pub target_position: Position,
    /// Distance at which the target counts as reached (meters)
    pub target_radius: f32,
    /// Obstacle edge clearance below which a penalty applies (meters)
    pub safety_distance: f32,
    /// Obstacles whose edge is farther than this are not sensed (meters)
    pub detection_range: f32,
    /// Weight of the obstacle penalty in the fitness
    pub obstacle_weight: f32,
    /// Minimum comfortable distance between agents (meters)
    pub uav_safety_distance: f32,
    /// Clearance kept from every boundary face (meters)
    pub boundary_margin: f32,
    /// Cache lifetime of the resolved global best (0 = resolve every tick)
    pub global_best_refresh_ms: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            echolocation: EcholocationConfig::default(),
            update_interval_ms: 100,
            target_position: Position::new(500.0, 500.0, 100.0),
            target_radius: 10.0,
            safety_distance: 15.0,
            detection_range: 100.0,
            obstacle_weight: 1.0,
            uav_safety_distance: 10.0,
            boundary_margin: 5.0,
            global_best_refresh_ms: 0,
        }
    }
}

impl OptimizerConfig {
    /// Tick period in seconds
    pub fn update_interval_s(&self) -> f32 {
        self.update_interval_ms as f32 / 1000.0
    }

    pub fn validate(&self) -> Result<()> {
        self.echolocation.validate()?;
        if self.update_interval_ms == 0 {
            return Err(SwarmError::ConfigError);
        }
        let distances = [
            self.target_radius,
            self.safety_distance,
            self.detection_range,
            self.obstacle_weight,
            self.uav_safety_distance,
            self.boundary_margin,
        ];
        if !self.target_position.is_finite() || distances.iter().any(|d| !d.is_finite()) {
            return Err(SwarmError::ConfigError);
        }
        if self.target_radius < 0.0
            || self.safety_distance < 0.0
            || self.uav_safety_distance < 0.0
            || self.obstacle_weight < 0.0
            || self.boundary_margin < 0.0
        {
            return Err(SwarmError::ConfigError);
        }
        if self.detection_range < self.safety_distance {
            return Err(SwarmError::ConfigError);
        }
        Ok(())
    }
}

/// Route discovery protocol configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub echolocation: EcholocationConfig,
    /// Discovery cycle period (milliseconds)
    pub routing_update_interval_ms: u32,
    pub hop_count_weight: f32,
    pub link_quality_weight: f32,
    pub energy_weight: f32,
    pub mobility_weight: f32,
    /// Routes kept per destination
    pub max_routes_per_destination: usize,
    /// Routes older than this are purged (milliseconds)
    pub route_timeout_ms: u64,
    /// Radio range for neighbour reachability (meters)
    pub communication_range: f32,
    /// Maximum number of nodes a discovery path may hold
    pub hop_limit: usize,
    /// Routing loudness never decays below this
    pub loudness_floor: f32,
    /// Routing pulse rate never grows above this
    pub pulse_rate_ceiling: f32,
    /// First cycle delay window (milliseconds)
    pub initial_delay_min_ms: u64,
    pub initial_delay_max_ms: u64,
    /// Mobility term used when a path node has no directory snapshot
    pub default_node_mobility: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            echolocation: EcholocationConfig::default(),
            routing_update_interval_ms: 1000,
            hop_count_weight: 1.0,
            link_quality_weight: 1.0,
            energy_weight: 0.5,
            mobility_weight: 0.5,
            max_routes_per_destination: 3,
            route_timeout_ms: 10_000,
            communication_range: 300.0,
            hop_limit: 10,
            loudness_floor: 0.1,
            pulse_rate_ceiling: 0.95,
            initial_delay_min_ms: 2000,
            initial_delay_max_ms: 3000,
            default_node_mobility: 0.1,
        }
    }
}

impl RoutingConfig {
    pub fn validate(&self) -> Result<()> {
        self.echolocation.validate()?;
        if self.routing_update_interval_ms == 0 || self.route_timeout_ms == 0 {
            return Err(SwarmError::ConfigError);
        }
        if self.hop_count_weight < 0.0
            || self.link_quality_weight < 0.0
            || self.energy_weight < 0.0
            || self.mobility_weight < 0.0
            || self.default_node_mobility < 0.0
        {
            return Err(SwarmError::ConfigError);
        }
        if self.max_routes_per_destination == 0
            || self.max_routes_per_destination > MAX_ROUTES_PER_DESTINATION
        {
            return Err(SwarmError::ConfigError);
        }
        if self.hop_limit < 2 || self.hop_limit > MAX_PATH_NODES {
            return Err(SwarmError::ConfigError);
        }
        if self.communication_range <= 0.0 {
            return Err(SwarmError::ConfigError);
        }
        if self.initial_delay_min_ms > self.initial_delay_max_ms {
            return Err(SwarmError::ConfigError);
        }
        Ok(())
    }
}

/// Kinematic stepper configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobilityConfig {
    pub bounds: Bounds,
    /// Initial speed window (m/s)
    pub min_speed: f32,
    pub max_speed: f32,
    /// Integration period (milliseconds)
    pub update_interval_ms: u32,
    /// Distance kept from a face after a bounce (meters)
    pub boundary_margin: f32,
    /// Chance per step of a random heading change
    pub direction_change_probability: f32,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            min_speed: 5.0,
            max_speed: 20.0,
            update_interval_ms: 100,
            boundary_margin: 5.0,
            direction_change_probability: 0.1,
        }
    }
}

impl MobilityConfig {
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        if self.min_speed < 0.0 || self.max_speed < self.min_speed || self.max_speed <= 0.0 {
            return Err(SwarmError::ConfigError);
        }
        if self.update_interval_ms == 0 {
            return Err(SwarmError::ConfigError);
        }
        if !(0.0..=1.0).contains(&self.direction_change_probability) {
            return Err(SwarmError::ConfigError);
        }
        Ok(())
    }
}

/// Planar bounds a dynamic obstacle bounces inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for PlanarBounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1000.0,
            min_y: 0.0,
            max_y: 1000.0,
        }
    }
}

/// One obstacle as configured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub position: Position,
    pub radius: f32,
    pub is_dynamic: bool,
    /// Speed of a dynamic obstacle (m/s)
    pub speed: f32,
    pub update_interval_ms: u32,
    pub bounds: PlanarBounds,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            position: Position::new(0.0, 0.0, 0.0),
            radius: 20.0,
            is_dynamic: false,
            speed: 5.0,
            update_interval_ms: 100,
            bounds: PlanarBounds::default(),
        }
    }
}

impl ObstacleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.radius < 0.0 || self.speed < 0.0 {
            return Err(SwarmError::ConfigError);
        }
        if self.is_dynamic {
            if self.update_interval_ms == 0 {
                return Err(SwarmError::ConfigError);
            }
            let b = &self.bounds;
            if b.max_x - b.min_x < 2.0 * self.radius || b.max_y - b.min_y < 2.0 * self.radius {
                return Err(SwarmError::ConfigError);
            }
        }
        Ok(())
    }
}

/// Initial placement of one agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub initial_position: Position,
    /// Fixed initial velocity; a random heading/speed is drawn when absent
    #[serde(default)]
    pub initial_velocity: Option<Velocity>,
}

impl AgentConfig {
    pub fn at(initial_position: Position) -> Self {
        Self {
            initial_position,
            initial_velocity: None,
        }
    }
}

/// Whole-swarm configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed seed; OS entropy is used when absent
    pub seed: Option<u64>,
    pub agents: Vec<AgentConfig>,
    pub obstacles: Vec<ObstacleConfig>,
    pub optimizer: OptimizerConfig,
    pub routing: RoutingConfig,
    pub mobility: MobilityConfig,
    /// Disable the free-flight stepper so only the optimizer moves agents
    pub optimizer_only: bool,
}

impl SimulationConfig {
    /// Small deterministic configuration for tests
    pub fn test_config(agent_positions: &[Position]) -> Self {
        Self {
            seed: Some(42),
            agents: agent_positions.iter().copied().map(AgentConfig::at).collect(),
            obstacles: Vec::new(),
            optimizer: OptimizerConfig::default(),
            routing: RoutingConfig {
                initial_delay_min_ms: 0,
                initial_delay_max_ms: 0,
                ..RoutingConfig::default()
            },
            mobility: MobilityConfig::default(),
            optimizer_only: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.agents.len() > MAX_SWARM_SIZE {
            return Err(SwarmError::SwarmSizeExceeded);
        }
        self.optimizer.validate()?;
        self.routing.validate()?;
        self.mobility.validate()?;
        for obstacle in &self.obstacles {
            obstacle.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(OptimizerConfig::default().validate().is_ok());
        assert!(RoutingConfig::default().validate().is_ok());
        assert!(MobilityConfig::default().validate().is_ok());
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_detection_range_must_cover_safety_band() {
        let config = OptimizerConfig {
            safety_distance: 50.0,
            detection_range: 10.0,
            ..OptimizerConfig::default()
        };
        assert_eq!(config.validate(), Err(SwarmError::ConfigError));
    }

    #[test]
    fn test_route_capacity_bounded() {
        let config = RoutingConfig {
            max_routes_per_destination: MAX_ROUTES_PER_DESTINATION + 1,
            ..RoutingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
