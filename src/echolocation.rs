//! Echolocation parameter triad (frequency, loudness, pulse rate)
//!
//! Both the position optimizer and the route discovery protocol carry one
//! of these, each with independent state:
//! - Frequency is redrawn uniformly from `[f_min, f_max]` when tuned
//! - Loudness decays geometrically: `A(t+1) = alpha * A(t)`
//! - Pulse rate rises toward its initial value: `r(t) = r0 * (1 - e^(-gamma t))`
//!
//! High loudness favours exploration (acceptance, wide floods); a growing
//! pulse rate suppresses local search and gates discovery.

use crate::config::EcholocationConfig;
use crate::rng::SimRng;
use libm::expf;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Echolocation {
    config: EcholocationConfig,
    frequency: f32,
    loudness: f32,
    pulse_rate: f32,
    loudness_floor: f32,
    pulse_rate_ceiling: f32,
}

impl Echolocation {
    /// Unguarded dynamics (optimizer)
    pub fn new(config: EcholocationConfig) -> Self {
        Self::with_guards(config, 0.0, config.pulse_rate)
    }

    /// Dynamics with a loudness floor and pulse rate ceiling (routing).
    ///
    /// The floor is capped at the initial loudness and the ceiling at the
    /// initial pulse rate, so loudness stays non-increasing and the pulse rate
    /// stays below its initial value.
    pub fn with_guards(config: EcholocationConfig, loudness_floor: f32, pulse_rate_ceiling: f32) -> Self {
        Self {
            config,
            frequency: config.frequency_min,
            loudness: config.loudness,
            pulse_rate: config.pulse_rate,
            loudness_floor: loudness_floor.min(config.loudness).max(0.0),
            pulse_rate_ceiling: pulse_rate_ceiling.min(config.pulse_rate),
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn loudness(&self) -> f32 {
        self.loudness
    }

    pub fn pulse_rate(&self) -> f32 {
        self.pulse_rate
    }

    pub fn config(&self) -> &EcholocationConfig {
        &self.config
    }

    /// Draw a fresh frequency in `[f_min, f_max]`
    pub fn tune_frequency(&mut self, rng: &mut SimRng) -> f32 {
        self.frequency = rng.uniform(self.config.frequency_min, self.config.frequency_max);
        self.frequency
    }

    /// `U[0,1) < loudness`
    pub fn loud_enough(&self, rng: &mut SimRng) -> bool {
        rng.next_f32() < self.loudness
    }

    /// `U[0,1) < pulse rate`
    pub fn pulse_fires(&self, rng: &mut SimRng) -> bool {
        rng.next_f32() < self.pulse_rate
    }

    /// `U[0,1) > pulse rate`
    pub fn pulse_silent(&self, rng: &mut SimRng) -> bool {
        rng.next_f32() > self.pulse_rate
    }

    /// Apply one decay step at simulation time `t_seconds`
    pub fn decay(&mut self, t_seconds: f32) {
        self.loudness = (self.config.alpha * self.loudness).max(self.loudness_floor);
        let rate = self.config.pulse_rate * (1.0 - expf(-self.config.gamma * t_seconds.max(0.0)));
        self.pulse_rate = rate.min(self.pulse_rate_ceiling);
    }
}
