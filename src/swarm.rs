//! Swarm simulation
//!
//! Wires agents, obstacles, the directory and the message bus onto one
//! discrete-event timeline:
//! - Dynamic obstacles step on their own period
//! - Free-flight mobility (optional) integrates and reflects off the bounds
//! - The optimizer moves each agent toward the target and publishes a snapshot
//! - The routing protocol floods discovery requests and maintains its table
//! - Packets queued on the bus are delivered at the instant they were sent,
//!   after every other phase of that instant
//!
//! Agents never touch each other's state. Everything crosses through the
//! directory (read-only snapshots) or the bus (owned packets).

use crate::config::{AgentConfig, OptimizerConfig, RoutingConfig, SimulationConfig};
use crate::directory::SwarmDirectory;
use crate::mobility::{Kinematics, ReflectingMobility};
use crate::network::{
    DataMessage, DiscoveryOutcome, Envelope, MessageBus, Packet, RouteDiscoveryProtocol,
};
use crate::obstacle::ObstacleField;
use crate::optimizer::PositionOptimizer;
use crate::rng::SimRng;
use crate::scheduler::{Phase, Scheduler, TimerId};
use crate::telemetry::{SwarmReport, SwarmStats, SwarmTelemetry};
use crate::types::*;
use log::{debug, info, trace};
use std::collections::BTreeMap;

/// Timeline events
#[derive(Debug, Clone, PartialEq)]
pub enum SwarmEvent {
    /// Step the dynamic obstacle at this index
    ObstacleTick(usize),
    MobilityTick(DroneId),
    OptimizerTick(DroneId),
    RoutingTick(DroneId),
    Deliver(Envelope),
}

#[derive(Debug, Clone, Copy, Default)]
struct AgentTimers {
    mobility: Option<TimerId>,
    optimizer: Option<TimerId>,
    routing: Option<TimerId>,
}

/// One UAV: kinematics plus its two bat-inspired subsystems
#[derive(Debug, Clone)]
pub struct Agent {
    id: DroneId,
    mobility: ReflectingMobility,
    optimizer: PositionOptimizer,
    routing: RouteDiscoveryProtocol,
    rng: SimRng,
    timers: AgentTimers,
}

impl Agent {
    pub fn id(&self) -> DroneId {
        self.id
    }

    pub fn kinematics(&self) -> &ReflectingMobility {
        &self.mobility
    }

    pub fn optimizer(&self) -> &PositionOptimizer {
        &self.optimizer
    }

    pub fn routing(&self) -> &RouteDiscoveryProtocol {
        &self.routing
    }

    pub fn position(&self) -> Position {
        self.mobility.position()
    }
}

/// Assembles an [`Agent`] from its collaborators
#[derive(Debug, Clone)]
pub struct AgentBuilder {
    id: DroneId,
    optimizer: OptimizerConfig,
    routing: RoutingConfig,
    kinematics: Option<ReflectingMobility>,
    rng: Option<SimRng>,
}

impl AgentBuilder {
    pub fn new(id: DroneId) -> Self {
        Self {
            id,
            optimizer: OptimizerConfig::default(),
            routing: RoutingConfig::default(),
            kinematics: None,
            rng: None,
        }
    }

    pub fn optimizer_config(mut self, config: OptimizerConfig) -> Self {
        self.optimizer = config;
        self
    }

    pub fn routing_config(mut self, config: RoutingConfig) -> Self {
        self.routing = config;
        self
    }

    pub fn kinematics(mut self, kinematics: ReflectingMobility) -> Self {
        self.kinematics = Some(kinematics);
        self
    }

    /// Random stream of the agent; OS entropy when not given
    pub fn rng(mut self, rng: SimRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Fails with `MissingCollaborator` without kinematics
    pub fn build(self, obstacles: &ObstacleField, directory: &SwarmDirectory) -> Result<Agent> {
        let mobility = self.kinematics.ok_or(SwarmError::MissingCollaborator)?;
        let rng = match self.rng {
            Some(rng) => rng,
            None => SimRng::from_entropy()?,
        };
        let optimizer = PositionOptimizer::new(self.id, self.optimizer, &mobility, obstacles, directory)?;
        let routing = RouteDiscoveryProtocol::new(self.id, self.routing)?;
        Ok(Agent {
            id: self.id,
            mobility,
            optimizer,
            routing,
            rng,
            timers: AgentTimers::default(),
        })
    }
}

/// Whole-swarm simulation on a single timeline
#[derive(Debug)]
pub struct SwarmSimulation {
    config: SimulationConfig,
    agents: BTreeMap<DroneId, Agent>,
    directory: SwarmDirectory,
    obstacles: ObstacleField,
    scheduler: Scheduler<SwarmEvent>,
    bus: MessageBus,
    rng: SimRng,
    telemetry: SwarmTelemetry,
    next_id: u64,
}

impl SwarmSimulation {
    /// Validate `config`, build the obstacle field and every configured agent
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SimRng::seed_from_u64(seed),
            None => SimRng::from_entropy()?,
        };
        let obstacles = ObstacleField::from_configs(&config.obstacles, &mut rng)?;

        let mut sim = Self {
            config: config.clone(),
            agents: BTreeMap::new(),
            directory: SwarmDirectory::new(),
            obstacles,
            scheduler: Scheduler::new(),
            bus: MessageBus::new(),
            rng,
            telemetry: SwarmTelemetry::default(),
            next_id: 0,
        };

        for index in 0..sim.obstacles.len() {
            if let Some(motion) = sim.obstacles.get(index).and_then(|o| o.motion) {
                sim.scheduler.schedule_after(
                    motion.update_interval_ms as u64,
                    Phase::Obstacle,
                    SwarmEvent::ObstacleTick(index),
                );
            }
        }
        for agent in &config.agents {
            sim.add_agent(*agent)?;
        }

        info!(
            "swarm ready: {} agents, {} obstacles, seed {:?}",
            sim.agents.len(),
            sim.obstacles.len(),
            config.seed
        );
        Ok(sim)
    }

    /// Create an agent from its placement and the swarm-wide configuration
    pub fn add_agent(&mut self, placement: AgentConfig) -> Result<DroneId> {
        let id = DroneId::new(self.next_id);
        let mut rng = self.rng.fork(id.as_u64());
        let mobility_config = self.config.mobility;
        let mobility = match placement.initial_velocity {
            Some(v) => ReflectingMobility::new(placement.initial_position, v, mobility_config),
            None => ReflectingMobility::with_random_velocity(placement.initial_position, mobility_config, &mut rng),
        };

        let agent = AgentBuilder::new(id)
            .optimizer_config(self.config.optimizer)
            .routing_config(self.config.routing)
            .kinematics(mobility)
            .rng(rng)
            .build(&self.obstacles, &self.directory)?;
        self.insert_agent(agent)
    }

    /// Register a pre-built agent and start its timers
    pub fn insert_agent(&mut self, mut agent: Agent) -> Result<DroneId> {
        let id = agent.id;
        if self.agents.contains_key(&id) {
            return Err(SwarmError::InvalidDroneId);
        }
        let now = self.scheduler.now();
        self.directory.publish(agent.optimizer.snapshot(now))?;
        agent.mobility.reset_clock(now);

        agent.timers.optimizer = Some(self.scheduler.schedule_after(
            agent.optimizer.config().update_interval_ms as u64,
            Phase::Optimizer,
            SwarmEvent::OptimizerTick(id),
        ));
        if !self.config.optimizer_only {
            agent.timers.mobility = Some(self.scheduler.schedule_after(
                agent.mobility.config().update_interval_ms as u64,
                Phase::Mobility,
                SwarmEvent::MobilityTick(id),
            ));
        }
        let routing = *agent.routing.config();
        let delay = agent
            .rng
            .uniform_u64(routing.initial_delay_min_ms, routing.initial_delay_max_ms);
        agent.timers.routing = Some(self.scheduler.schedule_after(delay, Phase::Routing, SwarmEvent::RoutingTick(id)));

        debug!("{} joined at t={}ms, first routing cycle in {}ms", id, now, delay);
        self.next_id = self.next_id.max(id.as_u64() + 1);
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Remove an agent, cancel its timers and forget its snapshot
    pub fn remove_agent(&mut self, id: DroneId) -> Option<Agent> {
        let agent = self.agents.remove(&id)?;
        for timer in [agent.timers.mobility, agent.timers.optimizer, agent.timers.routing]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(timer);
        }
        self.directory.remove(id);
        debug!("{} left the swarm at t={}ms", id, self.scheduler.now());
        Some(agent)
    }

    /// Route a data message from `source` to `destination` over the best
    /// known route. Returns false when it was dropped at the source.
    pub fn send_data(&mut self, source: DroneId, destination: DroneId) -> bool {
        let Some(agent) = self.agents.get_mut(&source) else {
            self.telemetry.packets_dropped += 1;
            return false;
        };
        match agent.routing.route_data(DataMessage::new(source, destination)) {
            Some(msg) => {
                self.telemetry.packets_routed += 1;
                self.forward_data(source, msg);
                true
            }
            None => {
                self.telemetry.packets_dropped += 1;
                false
            }
        }
    }

    /// Process the next event. Returns false when the timeline is empty.
    pub fn step(&mut self) -> Result<bool> {
        let Some((_, event)) = self.scheduler.pop() else {
            return Ok(false);
        };
        self.handle(event)?;
        self.flush_bus();
        Ok(true)
    }

    /// Process every event due up to `end_ms` and leave the clock there
    pub fn run_until(&mut self, end_ms: u64) -> Result<()> {
        // packets sent from outside the loop (send_data) go out first
        self.flush_bus();
        while let Some((_, event)) = self.scheduler.pop_until(end_ms) {
            self.handle(event)?;
            self.flush_bus();
        }
        self.scheduler.advance_to(end_ms);
        Ok(())
    }

    pub fn run_for(&mut self, duration_ms: u64) -> Result<()> {
        self.run_until(self.scheduler.now().saturating_add(duration_ms))
    }

    /// Collect summaries of every agent and log them
    pub fn finish(&self) -> SwarmReport {
        let report = SwarmReport {
            time_ms: self.scheduler.now(),
            telemetry: self.telemetry,
            stats: SwarmStats::from_directory(&self.directory),
            optimizers: self.agents.values().map(|a| a.optimizer.summary()).collect(),
            routing: self.agents.values().map(|a| a.routing.summary()).collect(),
        };
        report.log();
        report
    }

    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agent(&self, id: DroneId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = DroneId> + '_ {
        self.agents.keys().copied()
    }

    pub fn directory(&self) -> &SwarmDirectory {
        &self.directory
    }

    pub fn obstacles(&self) -> &ObstacleField {
        &self.obstacles
    }

    pub fn telemetry(&self) -> &SwarmTelemetry {
        &self.telemetry
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    fn handle(&mut self, event: SwarmEvent) -> Result<()> {
        match event {
            SwarmEvent::ObstacleTick(index) => self.on_obstacle_tick(index),
            SwarmEvent::MobilityTick(id) => self.on_mobility_tick(id),
            SwarmEvent::OptimizerTick(id) => return self.on_optimizer_tick(id),
            SwarmEvent::RoutingTick(id) => self.on_routing_tick(id),
            SwarmEvent::Deliver(envelope) => self.deliver(envelope),
        }
        Ok(())
    }

    fn on_obstacle_tick(&mut self, index: usize) {
        if let Some((interval, bounced)) = self.obstacles.step_obstacle(index) {
            if bounced {
                self.telemetry.obstacle_bounces += 1;
            }
            self.scheduler
                .schedule_after(interval as u64, Phase::Obstacle, SwarmEvent::ObstacleTick(index));
        }
    }

    fn on_mobility_tick(&mut self, id: DroneId) {
        let now = self.scheduler.now();
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        if agent.mobility.step(now, &mut agent.rng) {
            self.telemetry.boundary_bounces += 1;
        }
        agent.timers.mobility = Some(self.scheduler.schedule_after(
            agent.mobility.config().update_interval_ms as u64,
            Phase::Mobility,
            SwarmEvent::MobilityTick(id),
        ));
    }

    fn on_optimizer_tick(&mut self, id: DroneId) -> Result<()> {
        let now = self.scheduler.now();
        let Some(agent) = self.agents.get_mut(&id) else {
            return Ok(());
        };
        let outcome = agent.optimizer.step(
            now,
            &mut agent.mobility,
            &self.obstacles,
            &mut self.directory,
            &mut agent.rng,
        )?;
        self.telemetry.record_step(outcome);
        agent.timers.optimizer = Some(self.scheduler.schedule_after(
            agent.optimizer.config().update_interval_ms as u64,
            Phase::Optimizer,
            SwarmEvent::OptimizerTick(id),
        ));
        Ok(())
    }

    fn on_routing_tick(&mut self, id: DroneId) {
        let now = self.scheduler.now();
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        let requests = agent.routing.run_cycle(now, &self.directory, &mut agent.rng);
        let range = agent.routing.config().communication_range;
        self.telemetry.discoveries_sent += requests.len() as u64;
        for msg in requests {
            self.bus.flood_discovery(id, msg, &self.directory, range);
        }
        agent.timers.routing = Some(self.scheduler.schedule_after(
            agent.routing.config().routing_update_interval_ms as u64,
            Phase::Routing,
            SwarmEvent::RoutingTick(id),
        ));
    }

    fn deliver(&mut self, envelope: Envelope) {
        let now = self.scheduler.now();
        let Envelope { from, to, packet } = envelope;
        let Some(agent) = self.agents.get_mut(&to) else {
            trace!("dropping packet from {} to departed {}", from, to);
            self.telemetry.envelopes_undeliverable += 1;
            if matches!(packet, Packet::Data(_)) {
                self.telemetry.packets_dropped += 1;
            }
            return;
        };

        match packet {
            Packet::Discovery(msg) => {
                let outcome = agent.routing.handle_discovery(msg, now, &self.directory, &mut agent.rng);
                match &outcome {
                    DiscoveryOutcome::Discarded(_) => self.telemetry.discoveries_discarded += 1,
                    DiscoveryOutcome::Forward(_) => self.telemetry.discoveries_forwarded += 1,
                    DiscoveryOutcome::Delivered { .. } => {}
                }
                let range = agent.routing.config().communication_range;
                self.bus.dispatch_outcome(to, outcome, &self.directory, range);
            }
            Packet::RouteReply { destination, route } => {
                if agent.routing.install_route(destination, route, now) {
                    self.telemetry.record_routes_discovered(1);
                }
            }
            Packet::Data(msg) => self.forward_data(to, msg),
        }
    }

    /// Hand a data message held by `at` to the next node on its path
    fn forward_data(&mut self, at: DroneId, mut msg: DataMessage) {
        if msg.is_delivered() {
            self.telemetry.data_delivered += 1;
            debug!(
                "data {} -> {} delivered over {} hops",
                msg.source, msg.destination, msg.current_hop
            );
            return;
        }
        match msg.advance() {
            Some(next) if self.directory.contains(next) => {
                self.bus.send(at, next, Packet::Data(msg));
            }
            _ => {
                self.telemetry.packets_dropped += 1;
                debug!("data {} -> {} lost at {}", msg.source, msg.destination, at);
            }
        }
    }

    fn flush_bus(&mut self) {
        for envelope in self.bus.drain() {
            self.scheduler
                .schedule_after(0, Phase::Delivery, SwarmEvent::Deliver(envelope));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MobilityConfig;

    #[test]
    fn test_builder_requires_kinematics() {
        let err = AgentBuilder::new(DroneId::new(0))
            .rng(SimRng::seed_from_u64(1))
            .build(&ObstacleField::new(), &SwarmDirectory::new())
            .unwrap_err();
        assert_eq!(err, SwarmError::MissingCollaborator);
    }

    #[test]
    fn test_builder_with_kinematics() {
        let kin = ReflectingMobility::new(Position::new(10.0, 10.0, 10.0), Velocity::zero(), MobilityConfig::default());
        let agent = AgentBuilder::new(DroneId::new(3))
            .kinematics(kin)
            .rng(SimRng::seed_from_u64(1))
            .build(&ObstacleField::new(), &SwarmDirectory::new())
            .unwrap();
        assert_eq!(agent.id(), DroneId::new(3));
        assert_eq!(agent.position(), Position::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn test_agents_published_on_creation() {
        let config = SimulationConfig::test_config(&[Position::new(100.0, 100.0, 50.0), Position::new(200.0, 100.0, 50.0)]);
        let sim = SwarmSimulation::new(config).unwrap();
        assert_eq!(sim.directory().len(), 2);
        assert_eq!(sim.agent_ids().count(), 2);
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let config = SimulationConfig::test_config(&[Position::new(100.0, 100.0, 50.0)]);
        let mut sim = SwarmSimulation::new(config).unwrap();
        let kin = ReflectingMobility::new(Position::new(10.0, 10.0, 10.0), Velocity::zero(), MobilityConfig::default());
        let agent = AgentBuilder::new(DroneId::new(0))
            .kinematics(kin)
            .rng(SimRng::seed_from_u64(1))
            .build(sim.obstacles(), sim.directory())
            .unwrap();
        assert_eq!(sim.insert_agent(agent).unwrap_err(), SwarmError::InvalidDroneId);
    }

    #[test]
    fn test_remove_agent_cancels_timers() {
        let config = SimulationConfig::test_config(&[Position::new(100.0, 100.0, 50.0), Position::new(200.0, 100.0, 50.0)]);
        let mut sim = SwarmSimulation::new(config).unwrap();
        let before = sim.pending_events();
        assert!(sim.remove_agent(DroneId::new(1)).is_some());
        assert_eq!(sim.pending_events(), before - 2);
        assert!(!sim.directory().contains(DroneId::new(1)));
        assert!(sim.remove_agent(DroneId::new(1)).is_none());
    }
}
