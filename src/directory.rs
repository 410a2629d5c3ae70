//! Swarm directory: read-only view of every agent's published state
//!
//! Agents never reach into each other. Each optimizer tick publishes an
//! immutable [`AgentSnapshot`]; peers read copies. Iteration follows
//! insertion order until an agent is removed (removal swaps the last entry
//! into the freed slot), so "first seen" tie-breaking is deterministic.

use crate::types::*;
use heapless::{FnvIndexMap, Vec};
use serde::{Deserialize, Serialize};

/// Published state of one agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: DroneId,
    pub position: Position,
    pub velocity: Velocity,
    pub max_speed: f32,
    pub fitness: f32,
    pub personal_best_position: Position,
    pub personal_best_fitness: f32,
    /// Simulation time of publication (ms)
    pub timestamp_ms: u64,
}

impl AgentSnapshot {
    /// Speed relative to the agent's limit, in [0, 1]
    pub fn relative_speed(&self) -> Option<f32> {
        if self.max_speed > 0.0 {
            Some((self.velocity.magnitude() / self.max_speed).clamp(0.0, 1.0))
        } else {
            None
        }
    }
}

/// Registry of agent snapshots
#[derive(Debug, Clone, Default)]
pub struct SwarmDirectory {
    agents: FnvIndexMap<u64, AgentSnapshot, MAX_SWARM_SIZE>,
}

impl SwarmDirectory {
    pub fn new() -> Self {
        Self {
            agents: FnvIndexMap::new(),
        }
    }

    /// Insert or replace an agent's snapshot
    pub fn publish(&mut self, snapshot: AgentSnapshot) -> Result<()> {
        self.agents
            .insert(snapshot.id.as_u64(), snapshot)
            .map_err(|_| SwarmError::SwarmSizeExceeded)?;
        Ok(())
    }

    /// Forget an agent; later lookups return `None`
    pub fn remove(&mut self, id: DroneId) -> Option<AgentSnapshot> {
        self.agents.remove(&id.as_u64())
    }

    pub fn get(&self, id: DroneId) -> Option<AgentSnapshot> {
        self.agents.get(&id.as_u64()).copied()
    }

    pub fn contains(&self, id: DroneId) -> bool {
        self.agents.contains_key(&id.as_u64())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All known agent ids in insertion order
    pub fn agent_ids(&self) -> impl Iterator<Item = DroneId> + '_ {
        self.agents.values().map(|s| s.id)
    }

    /// Every snapshot except `id`'s, in insertion order
    pub fn peers(&self, id: DroneId) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        self.agents.values().filter(move |s| s.id != id)
    }

    pub fn position(&self, id: DroneId) -> Option<Position> {
        self.get(id).map(|s| s.position)
    }

    pub fn fitness(&self, id: DroneId) -> Option<f32> {
        self.get(id).map(|s| s.fitness)
    }

    pub fn personal_best(&self, id: DroneId) -> Option<(Position, f32)> {
        self.get(id)
            .map(|s| (s.personal_best_position, s.personal_best_fitness))
    }

    /// Distance between two agents; `None` when either is unknown
    pub fn distance(&self, a: DroneId, b: DroneId) -> Option<f32> {
        let pa = self.position(a)?;
        let pb = self.position(b)?;
        Some(pa.distance_to(&pb))
    }

    /// Agents strictly closer than `range` to `id` (excluding `id`)
    pub fn neighbor_ids(&self, id: DroneId, range: f32) -> Vec<DroneId, MAX_SWARM_SIZE> {
        let mut out = Vec::new();
        let Some(origin) = self.position(id) else {
            return out;
        };
        for peer in self.peers(id) {
            if origin.distance_to(&peer.position) < range {
                // capacity equals the directory's, cannot overflow
                let _ = out.push(peer.id);
            }
        }
        out
    }
}
