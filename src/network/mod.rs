//! Multi-hop route discovery for the swarm
//!
//! - `messages`: discovery and data packets
//! - `routing`: per-agent route table (bounded, fitness-ordered, expiring)
//! - `discovery`: the bat-inspired flooding protocol
//! - `bus`: predicate-filtered delivery between agents

pub mod bus;
pub mod discovery;
pub mod messages;
pub mod routing;

pub use bus::*;
pub use discovery::*;
pub use messages::*;
pub use routing::*;

/// Capacity of a discovery path (nodes, including the source)
pub const MAX_PATH_NODES: usize = 16;

/// Upper bound for `max_routes_per_destination`
pub const MAX_ROUTES_PER_DESTINATION: usize = 16;
