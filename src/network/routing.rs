//! Route table
//!
//! Destination -> routes ordered by ascending fitness, at most `capacity`
//! per destination. A destination whose last route expires is removed, so
//! an empty route list is never observable.

use super::messages::Path;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::vec::Vec;

/// One discovered path to a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Source first, destination last
    pub path: Path,
    /// Route cost (>= 0, lower is better)
    pub fitness: f32,
    /// `path.len() - 1`
    pub hop_count: u32,
    /// Mean link quality along the path (0-1)
    pub link_quality: f32,
    /// Distance-based transmission cost estimate
    pub energy_cost: f32,
    /// Time the route was discovered or refreshed (ms)
    pub last_update_ms: u64,
}

impl RouteInfo {
    pub fn new(path: Path, fitness: f32, last_update_ms: u64) -> Self {
        let hop_count = path.len().saturating_sub(1) as u32;
        Self {
            path,
            fitness: fitness.max(0.0),
            hop_count,
            link_quality: 0.0,
            energy_cost: 0.0,
            last_update_ms,
        }
    }

    pub fn destination(&self) -> Option<DroneId> {
        self.path.last().copied()
    }

    /// First node after the source
    pub fn next_hop(&self) -> Option<DroneId> {
        self.path.get(1).copied()
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_update_ms)
    }
}

/// Bounded, fitness-ordered route table
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: BTreeMap<DroneId, Vec<RouteInfo>>,
    capacity: usize,
}

impl RouteTable {
    /// `capacity` routes are kept per destination (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            routes: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert a route keeping ascending fitness order and the size bound.
    ///
    /// A route with the same path as a stored one replaces it. Equal fitness
    /// values keep arrival order. Returns false when the route was worse than
    /// every stored route of a full list.
    pub fn insert(&mut self, destination: DroneId, route: RouteInfo) -> bool {
        let list = self.routes.entry(destination).or_default();
        list.retain(|r| r.path != route.path);

        let index = list
            .iter()
            .position(|r| r.fitness > route.fitness)
            .unwrap_or(list.len());
        let kept = index < self.capacity;
        if kept {
            list.insert(index, route);
            list.truncate(self.capacity);
        }
        if list.is_empty() {
            self.routes.remove(&destination);
        }
        kept
    }

    /// Lowest-fitness route to `destination`
    pub fn best(&self, destination: DroneId) -> Option<&RouteInfo> {
        self.routes.get(&destination).and_then(|list| list.first())
    }

    /// All routes to `destination`, best first
    pub fn routes(&self, destination: DroneId) -> &[RouteInfo] {
        self.routes.get(&destination).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, destination: DroneId) -> bool {
        self.routes.contains_key(&destination)
    }

    pub fn destinations(&self) -> impl Iterator<Item = DroneId> + '_ {
        self.routes.keys().copied()
    }

    /// Number of destinations
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Total number of stored routes
    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Re-score every route with `score` and restore the ordering
    pub fn rescore<F>(&mut self, mut score: F)
    where
        F: FnMut(&mut RouteInfo) -> f32,
    {
        for list in self.routes.values_mut() {
            for route in list.iter_mut() {
                route.fitness = score(route).max(0.0);
            }
            list.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
        }
    }

    /// Drop routes older than `timeout_ms` and destinations left empty.
    /// Returns the number of routes removed.
    pub fn purge_expired(&mut self, now_ms: u64, timeout_ms: u64) -> usize {
        let mut removed = 0;
        self.routes.retain(|_, list| {
            let before = list.len();
            list.retain(|r| r.age_ms(now_ms) <= timeout_ms);
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }
}
