//! # Bat Swarm System
//!
//! Bat-algorithm UAV swarm: each agent converges on a target region while
//! avoiding obstacles and its peers, and discovers multi-hop communication
//! routes to the rest of the swarm as positions change.
//!
//! ## Features
//! - Per-agent bat-echolocation position optimizer with obstacle and peer penalties
//! - Flooding route discovery gated by the same loudness / pulse-rate dynamics
//! - Bounded, fitness-ordered, expiring route tables
//! - Static and bouncing dynamic obstacles
//! - Deterministic discrete-event timeline (seeded ChaCha RNG)
//!
//! ## Layout
//! - [`types`], [`config`], [`rng`]: shared vocabulary
//! - [`echolocation`]: the frequency / loudness / pulse-rate triad
//! - [`obstacle`], [`mobility`], [`directory`]: the world an agent senses
//! - [`optimizer`], [`network`]: the two bat-inspired subsystems
//! - [`scheduler`], [`swarm`], [`telemetry`]: the simulation around them

#![forbid(unsafe_code)]
#![allow(missing_docs)]
// Standard clippy allows
#![allow(clippy::manual_range_contains)]
#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]
// Pedantic clippy allows (style preferences, not bugs)
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::doc_markdown)]

/// Configuration structs with defaults and validation
pub mod config;
/// Read-only registry of published agent snapshots
pub mod directory;
/// Frequency, loudness and pulse-rate dynamics
pub mod echolocation;
/// Kinematic collaborator with boundary reflection
pub mod mobility;
/// Route discovery, route tables and the message bus
pub mod network;
/// Static and dynamic obstacles
pub mod obstacle;
/// Bat-algorithm position optimizer
pub mod optimizer;
/// Seeded random number generation
pub mod rng;
/// Discrete-event timeline
pub mod scheduler;
/// Swarm assembly and the simulation loop
pub mod swarm;
/// Counters, statistics and end-of-run reports
pub mod telemetry;
/// Core types (Position, Velocity, DroneId, Bounds, SwarmError)
pub mod types;

// Re-export configuration types for convenience
pub use config::*;
// Re-export core types for convenience
pub use types::*;

pub use directory::{AgentSnapshot, SwarmDirectory};
pub use echolocation::Echolocation;
pub use mobility::{Kinematics, ReflectingMobility};
pub use network::{DataMessage, DiscoveryMessage, RouteDiscoveryProtocol, RouteInfo, RouteTable};
pub use obstacle::{Obstacle, ObstacleField};
pub use optimizer::{PositionOptimizer, StepOutcome};
pub use rng::SimRng;
pub use swarm::{Agent, AgentBuilder, SwarmSimulation};
pub use telemetry::{SwarmReport, SwarmTelemetry};
