//! calotuple-algorithms: Association and ntuple assembly.
//!
//! This crate provides:
//! - **Matching** - ΔR metric and first-match seed/cluster association
//! - **Rings lookup** - identity association of ring descriptors to clusters
//! - **Physics schema** - the per-seed ntuple layout and its bound handles
//! - **NtupleMaker** - the booking / fill / finalize record assembler
//!

mod config;
pub mod matching;
mod ntuple;
pub mod physics;

pub use config::NtupleConfig;
pub use matching::{associate, delta_r, has_unique_ids, match_cluster, match_rings};
pub use ntuple::{NtupleMaker, NtupleStatistics, SEED_ET_SCALE};
pub use physics::{physics_schema, PhysicsSlots};
