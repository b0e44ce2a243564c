//! Reconstructed calorimeter objects: clusters, their cells and ring profiles.

use crate::direction::{Direction, Directional};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of a cluster within one event.
///
/// Ring descriptors refer back to their cluster through this id. It is a
/// lookup key only; rings never own the cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ClusterId(pub u32);

/// A single calorimeter cell belonging to a cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CaloCell {
    /// Transverse energy.
    pub et: f32,
    pub eta: f32,
    pub phi: f32,
    /// Cell size in eta.
    pub delta_eta: f32,
    /// Cell size in phi.
    pub delta_phi: f32,
    /// Deposited energy.
    pub energy: f32,
    /// Sampling layer tag. Opaque to calotuple.
    pub layer: i32,
}

impl Directional for CaloCell {
    #[inline]
    fn direction(&self) -> Direction {
        Direction::new(self.eta, self.phi)
    }
}

/// Shower-shape variables computed by the cluster builder.
///
/// Values are copied into the ntuple verbatim; no unit conversion happens.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShowerShapes {
    /// Energy in the first EM sampling.
    pub e1: f32,
    /// Energy in the second EM sampling.
    pub e2: f32,
    /// Energy in the third EM sampling.
    pub e3: f32,
    pub ehad1: f32,
    pub ehad2: f32,
    pub ehad3: f32,
    /// Total energy over all samplings.
    pub etot: f32,
    pub reta: f32,
    pub rphi: f32,
    pub rhad: f32,
    pub eratio: f32,
    pub f0: f32,
    pub f1: f32,
    pub f2: f32,
    pub f3: f32,
    /// Lateral width in the second sampling.
    pub weta2: f32,
    pub e233: f32,
    pub e237: f32,
    pub e277: f32,
    pub emaxs1: f32,
    pub e2tsts1: f32,
}

/// A reconstructed cluster.
///
/// `id` is the only field an event file must provide.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaloCluster {
    /// Identity, unique within the cluster collection.
    pub id: ClusterId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub eta: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub phi: f32,
    /// Transverse energy.
    #[cfg_attr(feature = "serde", serde(default))]
    pub et: f32,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub shapes: ShowerShapes,
    /// Member cells in builder order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cells: Vec<CaloCell>,
}

impl CaloCluster {
    /// Creates a cluster with zeroed shower shapes and no cells.
    #[must_use]
    pub fn new(id: ClusterId, eta: f32, phi: f32, et: f32) -> Self {
        Self {
            id,
            eta,
            phi,
            et,
            shapes: ShowerShapes::default(),
            cells: Vec::new(),
        }
    }

    /// Sets the shower shapes and returns self for chaining.
    #[must_use]
    pub fn with_shapes(mut self, shapes: ShowerShapes) -> Self {
        self.shapes = shapes;
        self
    }

    /// Sets the member cells and returns self for chaining.
    #[must_use]
    pub fn with_cells(mut self, cells: Vec<CaloCell>) -> Self {
        self.cells = cells;
        self
    }
}

impl Directional for CaloCluster {
    #[inline]
    fn direction(&self) -> Direction {
        Direction::new(self.eta, self.phi)
    }
}

/// Ring-shaped energy profile around a cluster axis.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CaloRings {
    /// The cluster these rings were built from, if the link was recorded.
    pub cluster: Option<ClusterId>,
    /// Ring sums, innermost first, layer by layer.
    pub rings: Vec<f32>,
}

impl CaloRings {
    /// Creates a ring descriptor linked to `cluster`.
    #[must_use]
    pub fn new(cluster: ClusterId, rings: Vec<f32>) -> Self {
        Self {
            cluster: Some(cluster),
            rings,
        }
    }

    /// Returns true if these rings were built from `cluster`.
    #[inline]
    #[must_use]
    pub fn belongs_to(&self, cluster: &CaloCluster) -> bool {
        self.cluster == Some(cluster.id)
    }
}
