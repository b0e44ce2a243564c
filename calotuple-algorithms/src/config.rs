//! Ntuple maker configuration.

use calotuple_core::{Error, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Options recognized by [`NtupleMaker`](crate::NtupleMaker).
///
/// Every field has a default, so a JSON file only needs the keys it
/// changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NtupleConfig {
    /// Key of the mandatory event info collection.
    pub event_key: String,
    /// Key of the cluster collection.
    pub cluster_key: String,
    /// Key of the ring collection.
    pub ringer_key: String,
    /// Maximum ΔR between a seed and its cluster (exclusive).
    pub delta_r: f32,
    /// Copy the cells of matched clusters into the `cl_cell_*` arrays.
    pub dump_cells: bool,
    /// Name of the output table.
    pub ntuple_name: String,
    /// Message level: 0 verbose, 1 debug, 2 info, 3 warning, 4 error, 5 fatal.
    pub output_level: u8,
}

impl Default for NtupleConfig {
    fn default() -> Self {
        Self {
            event_key: "EventInfo".to_string(),
            cluster_key: "Clusters".to_string(),
            ringer_key: "Rings".to_string(),
            delta_r: 0.15,
            dump_cells: false,
            ntuple_name: "physics".to_string(),
            output_level: 1,
        }
    }
}

impl NtupleConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// values are invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed or the values are
    /// invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !self.delta_r.is_finite() || self.delta_r <= 0.0 {
            return Err(Error::ConfigError(format!(
                "delta_r must be positive and finite, got {}",
                self.delta_r
            )));
        }
        if self.ntuple_name.is_empty() {
            return Err(Error::ConfigError("ntuple_name must not be empty".into()));
        }
        if self.event_key.is_empty() {
            return Err(Error::ConfigError("event_key must not be empty".into()));
        }
        Ok(())
    }

    /// Maps `output_level` onto a log filter.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        match self.output_level {
            0 => LevelFilter::Trace,
            1 => LevelFilter::Debug,
            2 => LevelFilter::Info,
            3 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NtupleConfig::default();
        assert_eq!(config.event_key, "EventInfo");
        assert_eq!(config.cluster_key, "Clusters");
        assert_eq!(config.ringer_key, "Rings");
        assert!((config.delta_r - 0.15).abs() < f32::EPSILON);
        assert!(!config.dump_cells);
        assert_eq!(config.ntuple_name, "physics");
        assert_eq!(config.log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = NtupleConfig::from_json(r#"{"dump_cells": true, "delta_r": 0.1}"#).unwrap();
        assert!(config.dump_cells);
        assert!((config.delta_r - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.ntuple_name, "physics");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(NtupleConfig::from_json(r#"{"delta_r": 0.0}"#).is_err());
        assert!(NtupleConfig::from_json(r#"{"delta_r": -1.0}"#).is_err());
        assert!(NtupleConfig::from_json(r#"{"ntuple_name": ""}"#).is_err());
        assert!(NtupleConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"ntuple_name": "electrons", "output_level": 3}}"#).unwrap();
        let config = NtupleConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ntuple_name, "electrons");
        assert_eq!(config.log_level(), LevelFilter::Warn);
    }
}
