//! Error types for calotuple-core.

use crate::schema::FieldKind;
use thiserror::Error;

/// Result type alias for calotuple operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for calotuple operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory event collection could not be read.
    #[error("cannot read mandatory collection '{0}' from this event")]
    MissingCollection(String),

    /// A table with this name is already booked.
    #[error("table '{0}' already exists")]
    DuplicateTable(String),

    /// No table with this name is booked.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// The same field name was declared twice in one table.
    #[error("field '{field}' declared twice in table '{table}'")]
    DuplicateField { table: String, field: String },

    /// An alias points at a field the table does not have.
    #[error("alias '{alias}' targets unknown field '{target}' in table '{table}'")]
    UnknownAliasTarget {
        table: String,
        alias: String,
        target: String,
    },

    /// A row or column does not fit the table schema.
    #[error("schema mismatch in table '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },

    /// A value of the wrong kind was pushed into a column.
    #[error("expected a {expected} value, found {found}")]
    KindMismatch { expected: FieldKind, found: FieldKind },

    /// Entry index past the end of a table.
    #[error("entry {entry} out of range for table '{table}' with {entries} entries")]
    EntryOutOfRange {
        table: String,
        entry: usize,
        entries: usize,
    },

    /// `fill` was called before `book`.
    #[error("ntuple '{0}' was not booked")]
    NotBooked(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
