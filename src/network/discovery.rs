//! Bat-inspired route discovery
//!
//! Each agent periodically floods discovery requests toward the agents it
//! knows about. A request accumulates a link cost per hop; the destination
//! materializes the path as a [`RouteInfo`] and hands it back to the source,
//! which keeps the best few routes per destination.
//!
//! Two echolocation draws gate the flood:
//! - an agent emits a request for a destination when `U[0,1) < pulse_rate`
//! - an intermediate node forwards when `U[0,1) < loudness`
//!
//! The parameters decay once per cycle. Loudness is held above a floor so
//! the swarm never stops forwarding entirely.

use super::messages::{DataMessage, DiscoveryMessage, Path};
use super::routing::{RouteInfo, RouteTable};
use crate::config::RoutingConfig;
use crate::directory::SwarmDirectory;
use crate::echolocation::Echolocation;
use crate::rng::SimRng;
use crate::types::*;
use heapless::Vec;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Added to link quality before inversion so a dead link has finite cost
const LINK_COST_OFFSET: f32 = 0.1;

/// `max(0, 1 - distance / range)`
pub fn link_quality(distance: f32, communication_range: f32) -> f32 {
    if communication_range <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / communication_range).max(0.0)
}

/// Cost of one hop with the given link quality
pub fn link_cost(quality: f32) -> f32 {
    1.0 / (quality + LINK_COST_OFFSET)
}

/// Why a discovery message went no further
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// This node is already on the path
    Loop,
    /// The path reached the hop limit
    HopLimit,
    /// The loudness draw suppressed forwarding
    Silent,
    /// The destination is not in the directory
    UnknownDestination,
}

/// Result of handling one discovery message
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    Discarded(DiscardReason),
    /// This node is the destination; `route` goes back to `source`
    Delivered {
        source: DroneId,
        destination: DroneId,
        route: RouteInfo,
    },
    /// Re-publish to in-range neighbours not yet visited
    Forward(DiscoveryMessage),
}

/// Path quality measured against the directory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathMetrics {
    /// Mean link quality over the hops
    pub link_quality: f32,
    /// Sum of hop distances over the communication range
    pub energy_cost: f32,
    /// Sum of node mobility over the path
    pub mobility: f32,
}

/// Routing counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStats {
    pub discoveries_sent: u32,
    pub discoveries_forwarded: u32,
    pub discoveries_discarded: u32,
    pub routes_discovered: u32,
    pub routes_expired: u32,
    pub packets_routed: u32,
    pub packets_dropped: u32,
}

/// End-of-run routing state of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingSummary {
    pub id: DroneId,
    pub destinations: usize,
    /// `(destination, routes held)` in destination order
    pub routes_per_destination: std::vec::Vec<(DroneId, usize)>,
    pub stats: RoutingStats,
}

/// Per-agent route discovery protocol
#[derive(Debug, Clone)]
pub struct RouteDiscoveryProtocol {
    id: DroneId,
    config: RoutingConfig,
    echolocation: Echolocation,
    table: RouteTable,
    stats: RoutingStats,
}

impl RouteDiscoveryProtocol {
    pub fn new(id: DroneId, config: RoutingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            config,
            echolocation: Echolocation::with_guards(
                config.echolocation,
                config.loudness_floor,
                config.pulse_rate_ceiling,
            ),
            table: RouteTable::new(config.max_routes_per_destination),
            stats: RoutingStats::default(),
        })
    }

    pub fn id(&self) -> DroneId {
        self.id
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn echolocation(&self) -> &Echolocation {
        &self.echolocation
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn stats(&self) -> RoutingStats {
        self.stats
    }

    pub fn best_route(&self, destination: DroneId) -> Option<&RouteInfo> {
        self.table.best(destination)
    }

    /// Agents within communication range
    pub fn neighbor_ids(&self, directory: &SwarmDirectory) -> Vec<DroneId, MAX_SWARM_SIZE> {
        directory.neighbor_ids(self.id, self.config.communication_range)
    }

    /// Draw discovery requests for every other known agent, then decay the
    /// echolocation parameters once.
    pub fn start_discovery(
        &mut self,
        now_ms: u64,
        directory: &SwarmDirectory,
        rng: &mut SimRng,
    ) -> std::vec::Vec<DiscoveryMessage> {
        let mut requests = std::vec::Vec::new();
        for peer in directory.peers(self.id) {
            if self.echolocation.pulse_fires(rng) {
                requests.push(DiscoveryMessage::new(self.id, peer.id));
            }
        }
        self.stats.discoveries_sent += requests.len() as u32;
        self.echolocation.decay(now_ms as f32 / 1000.0);

        trace!(
            "{} emitted {} discovery requests (loudness {:.3}, pulse rate {:.3})",
            self.id,
            requests.len(),
            self.echolocation.loudness(),
            self.echolocation.pulse_rate()
        );
        requests
    }

    /// Full routing cycle: discovery, table optimisation, expiry cleanup.
    /// Returns the requests to flood.
    pub fn run_cycle(
        &mut self,
        now_ms: u64,
        directory: &SwarmDirectory,
        rng: &mut SimRng,
    ) -> std::vec::Vec<DiscoveryMessage> {
        let requests = self.start_discovery(now_ms, directory, rng);
        self.maintain(now_ms, directory);
        requests
    }

    /// Process a discovery message arriving at this agent
    pub fn handle_discovery(
        &mut self,
        mut msg: DiscoveryMessage,
        now_ms: u64,
        directory: &SwarmDirectory,
        rng: &mut SimRng,
    ) -> DiscoveryOutcome {
        if msg.has_visited(self.id) {
            return self.discard(&msg, DiscardReason::Loop);
        }

        let previous = msg.last_hop();
        if msg.visited.push(self.id).is_err() {
            return self.discard(&msg, DiscardReason::HopLimit);
        }

        if let Some(previous) = previous {
            let quality = self.hop_quality(previous, self.id, directory);
            msg.accumulated_fitness += link_cost(quality) * self.config.hop_count_weight;
        }

        if msg.destination == self.id {
            let route = self.materialize(&msg.visited, msg.accumulated_fitness, now_ms, directory);
            debug!(
                "{} reached by discovery from {} over {} hops (fitness {:.2})",
                self.id, msg.source, route.hop_count, route.fitness
            );
            return DiscoveryOutcome::Delivered {
                source: msg.source,
                destination: msg.destination,
                route,
            };
        }

        if !directory.contains(msg.destination) {
            return self.discard(&msg, DiscardReason::UnknownDestination);
        }
        if msg.visited.len() >= self.config.hop_limit {
            return self.discard(&msg, DiscardReason::HopLimit);
        }
        if !self.echolocation.loud_enough(rng) {
            return self.discard(&msg, DiscardReason::Silent);
        }

        self.stats.discoveries_forwarded += 1;
        DiscoveryOutcome::Forward(msg)
    }

    /// Accept a route delivered back from a destination.
    /// Returns whether it made it into the table.
    pub fn install_route(&mut self, destination: DroneId, mut route: RouteInfo, now_ms: u64) -> bool {
        route.last_update_ms = now_ms;
        let hops = route.hop_count;
        let inserted = self.table.insert(destination, route);
        if inserted {
            self.stats.routes_discovered += 1;
            debug!("{} learned a {}-hop route to {}", self.id, hops, destination);
        }
        inserted
    }

    /// Refresh route metrics, re-score, re-sort and purge expired routes.
    /// Returns the number of routes purged.
    pub fn maintain(&mut self, now_ms: u64, directory: &SwarmDirectory) -> usize {
        let config = self.config;
        self.table.rescore(|route| {
            let metrics = path_metrics(&route.path, directory, &config);
            route.link_quality = metrics.link_quality;
            route.energy_cost = metrics.energy_cost;
            weighted_fitness(route.hop_count, &metrics, &config)
        });

        let purged = self.table.purge_expired(now_ms, config.route_timeout_ms);
        if purged > 0 {
            self.stats.routes_expired += purged as u32;
            debug!("{} purged {} expired routes", self.id, purged);
        }
        purged
    }

    /// Weighted fitness of `route` against the current directory
    pub fn route_fitness(&self, route: &RouteInfo, directory: &SwarmDirectory) -> f32 {
        let metrics = path_metrics(&route.path, directory, &self.config);
        weighted_fitness(route.hop_count, &metrics, &self.config)
    }

    /// Stamp the best known route on a data message.
    ///
    /// Returns `None` (and counts a drop) when no route is known.
    pub fn route_data(&mut self, mut msg: DataMessage) -> Option<DataMessage> {
        let Some(route) = self.table.best(msg.destination) else {
            self.stats.packets_dropped += 1;
            debug!("{} has no route to {}, dropping data", self.id, msg.destination);
            return None;
        };
        msg.route_path = route.path.clone();
        msg.current_hop = 0;
        self.stats.packets_routed += 1;
        trace!(
            "{} routing data to {} over {} hops",
            self.id,
            msg.destination,
            route.hop_count
        );
        Some(msg)
    }

    pub fn summary(&self) -> RoutingSummary {
        RoutingSummary {
            id: self.id,
            destinations: self.table.len(),
            routes_per_destination: self
                .table
                .destinations()
                .map(|d| (d, self.table.routes(d).len()))
                .collect(),
            stats: self.stats,
        }
    }

    fn hop_quality(&self, from: DroneId, to: DroneId, directory: &SwarmDirectory) -> f32 {
        directory
            .distance(from, to)
            .map_or(0.0, |d| link_quality(d, self.config.communication_range))
    }

    fn materialize(&self, path: &Path, fitness: f32, now_ms: u64, directory: &SwarmDirectory) -> RouteInfo {
        let metrics = path_metrics(path, directory, &self.config);
        let mut route = RouteInfo::new(path.clone(), fitness, now_ms);
        route.link_quality = metrics.link_quality;
        route.energy_cost = metrics.energy_cost;
        route
    }

    fn discard(&mut self, msg: &DiscoveryMessage, reason: DiscardReason) -> DiscoveryOutcome {
        self.stats.discoveries_discarded += 1;
        trace!(
            "{} discarded discovery {} -> {}: {:?}",
            self.id,
            msg.source,
            msg.destination,
            reason
        );
        DiscoveryOutcome::Discarded(reason)
    }
}

/// Measure a path against the directory.
///
/// A hop touching an unknown agent has quality 0 and costs a full
/// communication range of energy. Unknown nodes use the default mobility.
pub fn path_metrics(path: &[DroneId], directory: &SwarmDirectory, config: &RoutingConfig) -> PathMetrics {
    let range = config.communication_range;
    let mut quality_sum = 0.0;
    let mut energy = 0.0;
    for pair in path.windows(2) {
        match directory.distance(pair[0], pair[1]) {
            Some(d) => {
                quality_sum += link_quality(d, range);
                energy += d / range;
            }
            None => energy += 1.0,
        }
    }
    let hops = path.len().saturating_sub(1);
    let link_quality = if hops > 0 { quality_sum / hops as f32 } else { 0.0 };

    let mobility: f32 = path
        .iter()
        .map(|id| {
            directory
                .get(*id)
                .and_then(|s| s.relative_speed())
                .unwrap_or(config.default_node_mobility)
        })
        .sum();

    PathMetrics {
        link_quality,
        energy_cost: energy,
        mobility,
    }
}

/// `hops * w_hop + link_cost(lq) * w_link + energy * w_energy + mobility * w_mobility`
pub fn weighted_fitness(hop_count: u32, metrics: &PathMetrics, config: &RoutingConfig) -> f32 {
    hop_count as f32 * config.hop_count_weight
        + link_cost(metrics.link_quality) * config.link_quality_weight
        + metrics.energy_cost * config.energy_weight
        + metrics.mobility * config.mobility_weight
}
