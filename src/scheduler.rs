//! Discrete-event timeline
//!
//! Events are ordered by `(time, phase, sequence)`. At any instant obstacle
//! steps run first, then free-flight mobility, optimizer ticks, routing
//! cycles and finally message delivery, so routing always sees positions
//! already updated for that instant. The sequence number keeps insertion
//! order among equal keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordering class of an event within one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Obstacle = 0,
    Mobility = 1,
    Optimizer = 2,
    Routing = 3,
    Delivery = 4,
}

/// Handle of a scheduled event, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId {
    at_ms: u64,
    phase: Phase,
    seq: u64,
}

impl TimerId {
    pub fn at_ms(&self) -> u64 {
        self.at_ms
    }
}

/// Single-threaded event queue with a monotonic clock
#[derive(Debug, Clone)]
pub struct Scheduler<E> {
    events: BTreeMap<TimerId, E>,
    now_ms: u64,
    next_seq: u64,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            now_ms: 0,
            next_seq: 0,
        }
    }

    /// Current simulation time (ms)
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `event` at `now + delay_ms`
    pub fn schedule_after(&mut self, delay_ms: u64, phase: Phase, event: E) -> TimerId {
        self.schedule_at(self.now_ms.saturating_add(delay_ms), phase, event)
    }

    /// Schedule `event` at an absolute time; past times run at `now`
    pub fn schedule_at(&mut self, at_ms: u64, phase: Phase, event: E) -> TimerId {
        let id = TimerId {
            at_ms: at_ms.max(self.now_ms),
            phase,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.events.insert(id, event);
        id
    }

    /// Remove a pending event. Returns it if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<E> {
        self.events.remove(&id)
    }

    /// Time of the next pending event
    pub fn peek_time(&self) -> Option<u64> {
        self.events.keys().next().map(|id| id.at_ms)
    }

    /// Pop the next event and advance the clock to its time
    pub fn pop(&mut self) -> Option<(TimerId, E)> {
        let (id, event) = self.events.pop_first()?;
        self.now_ms = id.at_ms;
        Some((id, event))
    }

    /// Pop the next event only if it is due at or before `until_ms`
    pub fn pop_until(&mut self, until_ms: u64) -> Option<(TimerId, E)> {
        match self.peek_time() {
            Some(at) if at <= until_ms => self.pop(),
            _ => None,
        }
    }

    /// Move the clock forward without running anything
    pub fn advance_to(&mut self, at_ms: u64) {
        self.now_ms = self.now_ms.max(at_ms);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_orders_same_instant() {
        let mut s = Scheduler::new();
        s.schedule_at(100, Phase::Routing, "routing");
        s.schedule_at(100, Phase::Optimizer, "optimizer");
        s.schedule_at(50, Phase::Delivery, "early");
        s.schedule_at(100, Phase::Obstacle, "obstacle");

        let order: Vec<&str> = std::iter::from_fn(|| s.pop().map(|(_, e)| e)).collect();
        assert_eq!(order, ["early", "obstacle", "optimizer", "routing"]);
        assert_eq!(s.now(), 100);
    }

    #[test]
    fn test_sequence_keeps_insertion_order() {
        let mut s = Scheduler::new();
        for i in 0..5 {
            s.schedule_at(10, Phase::Delivery, i);
        }
        let order: Vec<i32> = std::iter::from_fn(|| s.pop().map(|(_, e)| e)).collect();
        assert_eq!(order, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cancel() {
        let mut s = Scheduler::new();
        let a = s.schedule_after(10, Phase::Mobility, 1);
        s.schedule_after(20, Phase::Mobility, 2);
        assert_eq!(s.cancel(a), Some(1));
        assert_eq!(s.cancel(a), None);
        assert_eq!(s.pop().map(|(_, e)| e), Some(2));
    }

    #[test]
    fn test_past_events_run_now() {
        let mut s: Scheduler<u8> = Scheduler::new();
        s.advance_to(500);
        let id = s.schedule_at(100, Phase::Optimizer, 0);
        assert_eq!(id.at_ms(), 500);
        assert!(s.pop_until(499).is_none());
        assert!(s.pop_until(500).is_some());
    }
}
