//! Angular positions in (eta, phi).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A direction in detector coordinates.
///
/// `phi` is periodic on `[-π, π)`; `eta` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Direction {
    /// Pseudorapidity.
    pub eta: f32,
    /// Azimuthal angle in radians.
    pub phi: f32,
}

impl Direction {
    /// Creates a new direction.
    #[must_use]
    pub fn new(eta: f32, phi: f32) -> Self {
        Self { eta, phi }
    }
}

/// Objects that sit at a single direction in the detector.
pub trait Directional {
    /// Returns the object's direction.
    fn direction(&self) -> Direction;

    /// Returns the pseudorapidity.
    #[inline]
    fn eta(&self) -> f32 {
        self.direction().eta
    }

    /// Returns the azimuthal angle.
    #[inline]
    fn phi(&self) -> f32 {
        self.direction().phi
    }
}

impl Directional for Direction {
    #[inline]
    fn direction(&self) -> Direction {
        *self
    }
}
