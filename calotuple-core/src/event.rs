//! Per-event identity: event number, pile-up and trigger seeds.

use crate::direction::{Direction, Directional};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A trigger seed: the region-of-interest estimate produced before clustering.
///
/// Transverse energy is in GeV, as delivered upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Seed {
    pub eta: f32,
    pub phi: f32,
    pub et: f32,
}

impl Seed {
    /// Creates a new seed.
    #[must_use]
    pub fn new(eta: f32, phi: f32, et: f32) -> Self {
        Self { eta, phi, et }
    }
}

impl Directional for Seed {
    #[inline]
    fn direction(&self) -> Direction {
        Direction::new(self.eta, self.phi)
    }
}

/// Event-level information. Every event carries exactly one of these.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EventInfo {
    /// Event number assigned by the generator.
    pub event_number: i32,
    /// Average number of pile-up interactions.
    pub avgmu: f32,
    /// All seeds of this event, in generation order.
    pub seeds: Vec<Seed>,
}

impl EventInfo {
    /// Creates event info without seeds.
    #[must_use]
    pub fn new(event_number: i32, avgmu: f32) -> Self {
        Self {
            event_number,
            avgmu,
            seeds: Vec::new(),
        }
    }

    /// Adds a seed and returns self for chaining.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seeds.push(seed);
        self
    }
}
