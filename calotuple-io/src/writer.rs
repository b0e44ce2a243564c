//! Format dispatch for table files.

use crate::{Error, Result};
use calotuple_core::TableStore;
use std::path::Path;

/// Storage options for table files.
///
/// Only the HDF5 backend uses them; JSON Lines output ignores them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Rows per HDF5 chunk.
    pub chunk_rows: usize,
    /// Deflate level, or `None` for no compression.
    pub compression: Option<u8>,
    /// Apply the shuffle filter before compression.
    pub shuffle: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            chunk_rows: 10_000,
            compression: Some(1),
            shuffle: true,
        }
    }
}

/// On-disk table formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    JsonLines,
    Hdf5,
}

impl TableFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for unknown or missing extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jsonl" | "json") => Ok(Self::JsonLines),
            Some("h5" | "hdf5" | "nxs") => Ok(Self::Hdf5),
            _ => Err(Error::UnsupportedFormat(format!(
                "{}: expected a .jsonl, .json, .h5, .hdf5 or .nxs file",
                path.display()
            ))),
        }
    }

    /// False if support for this format was compiled out.
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            Self::JsonLines => true,
            Self::Hdf5 => cfg!(feature = "hdf5"),
        }
    }
}

/// Writes every table of `store` to `path`, choosing the format from the
/// extension.
///
/// # Errors
/// Returns an error if the extension is unknown, the format was compiled
/// out, or writing fails.
pub fn write_tables<P: AsRef<Path>>(
    path: P,
    store: &TableStore,
    options: &WriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    match TableFormat::from_path(path)? {
        TableFormat::JsonLines => crate::json::write_tables_jsonl(path, store),
        TableFormat::Hdf5 => write_hdf5(path, store, options),
    }
}

/// Reads every table from `path`, choosing the format from the extension.
///
/// # Errors
/// Returns an error if the extension is unknown, the format was compiled
/// out, or reading fails.
pub fn read_tables<P: AsRef<Path>>(path: P) -> Result<TableStore> {
    let path = path.as_ref();
    match TableFormat::from_path(path)? {
        TableFormat::JsonLines => crate::json::read_tables_jsonl(path),
        TableFormat::Hdf5 => read_hdf5(path),
    }
}

#[cfg(feature = "hdf5")]
fn write_hdf5(path: &Path, store: &TableStore, options: &WriteOptions) -> Result<()> {
    crate::hdf5::write_tables_hdf5(path, store, options)
}

#[cfg(not(feature = "hdf5"))]
fn write_hdf5(path: &Path, _store: &TableStore, _options: &WriteOptions) -> Result<()> {
    Err(hdf5_disabled(path))
}

#[cfg(feature = "hdf5")]
fn read_hdf5(path: &Path) -> Result<TableStore> {
    crate::hdf5::read_tables_hdf5(path)
}

#[cfg(not(feature = "hdf5"))]
fn read_hdf5(path: &Path) -> Result<TableStore> {
    Err(hdf5_disabled(path))
}

#[cfg(not(feature = "hdf5"))]
fn hdf5_disabled(path: &Path) -> Error {
    Error::UnsupportedFormat(format!(
        "{}: HDF5 support not compiled in (enable the 'hdf5' feature)",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        let cases = [
            ("out.jsonl", TableFormat::JsonLines),
            ("out.JSON", TableFormat::JsonLines),
            ("out.h5", TableFormat::Hdf5),
            ("run/out.hdf5", TableFormat::Hdf5),
            ("out.nxs", TableFormat::Hdf5),
        ];
        for (path, expected) in cases {
            assert_eq!(TableFormat::from_path(&PathBuf::from(path)).unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_extension_rejected() {
        for path in ["out.root", "out"] {
            assert!(matches!(
                TableFormat::from_path(&PathBuf::from(path)),
                Err(Error::UnsupportedFormat(_))
            ));
        }
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn test_hdf5_disabled_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.h5");
        let err = write_tables(&path, &TableStore::new(), &WriteOptions::default()).unwrap_err();
        assert!(err.to_string().contains("hdf5"));
        assert!(!TableFormat::Hdf5.is_available());
    }
}
