//! calotuple-io: Event input and table persistence for calotuple.
//!
//! This crate reads events from JSON Lines files and stores ntuple tables
//! as JSON Lines or, with the `hdf5` feature, as chunked HDF5 datasets.
//!

mod error;
mod events;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod json;
mod writer;

pub use error::{Error, Result};
pub use events::{read_events, write_events, EventFileReader};
#[cfg(feature = "hdf5")]
pub use self::hdf5::{read_tables_hdf5, write_tables_hdf5};
pub use json::{read_tables_jsonl, write_tables_jsonl};
pub use writer::{read_tables, write_tables, TableFormat, WriteOptions};
