//! Read-only access to the collections of one event.
//!
//! The host framework owns event objects; calotuple only looks them up by
//! key. [`EventStore`] is that lookup seam and [`MemoryEventStore`] is the
//! in-memory implementation used by the file readers and the tests.

use crate::cluster::{CaloCluster, CaloRings};
use crate::event::EventInfo;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keyed, read-only lookup of event collections.
///
/// `None` means the collection is not present in this event. Whether that is
/// fatal is up to the caller.
pub trait EventStore {
    /// Returns the event info recorded under `key`.
    fn event_info(&self, key: &str) -> Option<&EventInfo>;

    /// Returns the cluster collection recorded under `key`.
    fn clusters(&self, key: &str) -> Option<&[CaloCluster]>;

    /// Returns the ring collection recorded under `key`.
    fn rings(&self, key: &str) -> Option<&[CaloRings]>;
}

/// Collections of a single event held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryEventStore {
    pub event_info: HashMap<String, EventInfo>,
    pub clusters: HashMap<String, Vec<CaloCluster>>,
    pub rings: HashMap<String, Vec<CaloRings>>,
}

impl MemoryEventStore {
    /// Creates an empty event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records event info under `key`, replacing any previous entry.
    pub fn record_event_info(&mut self, key: impl Into<String>, info: EventInfo) {
        self.event_info.insert(key.into(), info);
    }

    /// Records a cluster collection under `key`.
    pub fn record_clusters(&mut self, key: impl Into<String>, clusters: Vec<CaloCluster>) {
        self.clusters.insert(key.into(), clusters);
    }

    /// Records a ring collection under `key`.
    pub fn record_rings(&mut self, key: impl Into<String>, rings: Vec<CaloRings>) {
        self.rings.insert(key.into(), rings);
    }
}

impl EventStore for MemoryEventStore {
    fn event_info(&self, key: &str) -> Option<&EventInfo> {
        self.event_info.get(key)
    }

    fn clusters(&self, key: &str) -> Option<&[CaloCluster]> {
        self.clusters.get(key).map(Vec::as_slice)
    }

    fn rings(&self, key: &str) -> Option<&[CaloRings]> {
        self.rings.get(key).map(Vec::as_slice)
    }
}
