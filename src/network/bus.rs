//! In-process message bus
//!
//! Packets are queued as envelopes addressed to a single agent and handed
//! to the scheduler in FIFO order. Broadcasts are expanded at send time
//! against the directory, so a recipient is chosen by where it was when the
//! packet left the sender.

use super::discovery::DiscoveryOutcome;
use super::messages::{DataMessage, DiscoveryMessage};
use super::routing::RouteInfo;
use crate::directory::{AgentSnapshot, SwarmDirectory};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Payloads exchanged between agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Discovery(DiscoveryMessage),
    /// Route materialized at `destination`, travelling back to its source
    RouteReply {
        destination: DroneId,
        route: RouteInfo,
    },
    Data(DataMessage),
}

/// Addressed packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: DroneId,
    pub to: DroneId,
    pub packet: Packet,
}

/// FIFO of pending envelopes
#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    queue: VecDeque<Envelope>,
    sent: u64,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a unicast packet
    pub fn send(&mut self, from: DroneId, to: DroneId, packet: Packet) {
        self.sent += 1;
        self.queue.push_back(Envelope { from, to, packet });
    }

    /// Queue `packet` for every peer of `from` matching `predicate`.
    ///
    /// The predicate sees the sender's snapshot and the candidate's. Nothing
    /// is sent when the sender is not in the directory. Returns the number of
    /// recipients.
    pub fn publish_where<F>(
        &mut self,
        from: DroneId,
        packet: &Packet,
        directory: &SwarmDirectory,
        mut predicate: F,
    ) -> usize
    where
        F: FnMut(&AgentSnapshot, &AgentSnapshot) -> bool,
    {
        let Some(sender) = directory.get(from) else {
            return 0;
        };
        let mut count = 0;
        for peer in directory.peers(from) {
            if predicate(&sender, peer) {
                self.send(from, peer.id, packet.clone());
                count += 1;
            }
        }
        count
    }

    /// Flood a discovery message to in-range peers not yet on its path
    pub fn flood_discovery(
        &mut self,
        from: DroneId,
        msg: DiscoveryMessage,
        directory: &SwarmDirectory,
        communication_range: f32,
    ) -> usize {
        let visited = msg.visited.clone();
        let packet = Packet::Discovery(msg);
        self.publish_where(from, &packet, directory, |sender, peer| {
            sender.position.distance_to(&peer.position) < communication_range
                && !visited.contains(&peer.id)
        })
    }

    /// Queue whatever a discovery outcome asks for.
    /// Returns the number of envelopes queued.
    pub fn dispatch_outcome(
        &mut self,
        at: DroneId,
        outcome: DiscoveryOutcome,
        directory: &SwarmDirectory,
        communication_range: f32,
    ) -> usize {
        match outcome {
            DiscoveryOutcome::Discarded(_) => 0,
            DiscoveryOutcome::Delivered {
                source,
                destination,
                route,
            } => {
                self.send(at, source, Packet::RouteReply { destination, route });
                1
            }
            DiscoveryOutcome::Forward(msg) => self.flood_discovery(at, msg, directory, communication_range),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total envelopes ever queued
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Take every pending envelope in send order
    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, Envelope> {
        self.queue.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish(dir: &mut SwarmDirectory, id: u64, x: f32) {
        let p = Position::new(x, 0.0, 0.0);
        dir.publish(AgentSnapshot {
            id: DroneId::new(id),
            position: p,
            velocity: Velocity::zero(),
            max_speed: 20.0,
            fitness: 0.0,
            personal_best_position: p,
            personal_best_fitness: 0.0,
            timestamp_ms: 0,
        })
        .unwrap();
    }

    #[test]
    fn test_flood_respects_range_and_visited() {
        let mut dir = SwarmDirectory::new();
        publish(&mut dir, 0, 0.0);
        publish(&mut dir, 1, 100.0);
        publish(&mut dir, 2, 200.0);
        publish(&mut dir, 3, 500.0);

        let mut msg = DiscoveryMessage::new(DroneId::new(2), DroneId::new(3));
        msg.visited.push(DroneId::new(0)).unwrap();

        let mut bus = MessageBus::new();
        // sender 0: peer 1 in range, 2 on the path, 3 out of range
        let sent = bus.flood_discovery(DroneId::new(0), msg, &dir, 300.0);
        assert_eq!(sent, 1);
        let envelopes: std::vec::Vec<Envelope> = bus.drain().collect();
        assert_eq!(envelopes[0].to, DroneId::new(1));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_unknown_sender_publishes_nothing() {
        let dir = SwarmDirectory::new();
        let mut bus = MessageBus::new();
        let msg = DiscoveryMessage::new(DroneId::new(0), DroneId::new(1));
        assert_eq!(bus.flood_discovery(DroneId::new(0), msg, &dir, 300.0), 0);
        assert_eq!(bus.sent(), 0);
    }
}
