//! calotuple-core: Core types for flattening calorimeter events into ntuples.
//!
//! This crate provides the event data model (seeds, clusters, cells, rings),
//! the read-only [`EventStore`] lookup seam, and the columnar table layer:
//! field schemas, typed slot handles, row buffers and the table store.
//!

pub mod cluster;
pub mod direction;
pub mod error;
pub mod event;
pub mod event_store;
pub mod row;
pub mod schema;
pub mod table;
pub mod table_store;

pub use cluster::{CaloCell, CaloCluster, CaloRings, ClusterId, ShowerShapes};
pub use direction::{Direction, Directional};
pub use error::{Error, Result};
pub use event::{EventInfo, Seed};
pub use event_store::{EventStore, MemoryEventStore};
pub use row::RowBuffer;
pub use schema::{ArrayElement, ArraySlot, FieldDef, FieldKind, ScalarField, ScalarSlot, Value};
pub use table::{Column, Jagged, Table, TableReader};
pub use table_store::TableStore;
