//! Discovery and data packets

use super::MAX_PATH_NODES;
use crate::types::*;
use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Ordered agent ids of a path, source first
pub type Path = Vec<DroneId, MAX_PATH_NODES>;

/// Flooded route request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryMessage {
    pub source: DroneId,
    pub destination: DroneId,
    /// Nodes already traversed; never holds duplicates
    pub visited: Path,
    pub accumulated_fitness: f32,
}

impl DiscoveryMessage {
    /// Fresh request seeded with `visited = [source]`
    pub fn new(source: DroneId, destination: DroneId) -> Self {
        let mut visited = Path::new();
        // capacity is at least one
        let _ = visited.push(source);
        Self {
            source,
            destination,
            visited,
            accumulated_fitness: 0.0,
        }
    }

    pub fn has_visited(&self, id: DroneId) -> bool {
        self.visited.contains(&id)
    }

    /// Last node that handled the message
    pub fn last_hop(&self) -> Option<DroneId> {
        self.visited.last().copied()
    }

    pub fn hop_count(&self) -> usize {
        self.visited.len().saturating_sub(1)
    }
}

/// Application packet following a resolved route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMessage {
    pub source: DroneId,
    pub destination: DroneId,
    /// Index into `route_path` of the node currently holding the packet
    pub current_hop: usize,
    pub route_path: Path,
}

impl DataMessage {
    pub fn new(source: DroneId, destination: DroneId) -> Self {
        Self {
            source,
            destination,
            current_hop: 0,
            route_path: Path::new(),
        }
    }

    pub fn is_routed(&self) -> bool {
        !self.route_path.is_empty()
    }

    /// Node currently holding the packet
    pub fn current_node(&self) -> Option<DroneId> {
        self.route_path.get(self.current_hop).copied()
    }

    /// Node the packet goes to next; `None` at final delivery
    pub fn next_hop(&self) -> Option<DroneId> {
        self.route_path.get(self.current_hop + 1).copied()
    }

    /// Move one hop along the path and return the new holder
    pub fn advance(&mut self) -> Option<DroneId> {
        let next = self.next_hop()?;
        self.current_hop += 1;
        Some(next)
    }

    pub fn is_delivered(&self) -> bool {
        self.is_routed() && self.current_node() == Some(self.destination)
    }
}
