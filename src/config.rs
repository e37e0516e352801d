//! Ledger configuration
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! vector_len = 5
//!
//! [bands]
//! top = 2
//! foreground_service = 4
//! foreground = 6
//! background = 11
//! top_sleeping = 12
//! heavy_weight = 13
//! nonexistent = 20
//! ```

use crate::classification::ImportanceBands;
use crate::error::LedgerError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a [`crate::ProcStateLedger`]
///
/// # Example
/// ```
/// use procstate_ledger::config::LedgerConfig;
///
/// let config = LedgerConfig::default();
/// assert_eq!(config.vector_len, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Length of every measurement vector (one slot per CPU frequency)
    pub vector_len: usize,

    /// Raw importance code to classification mapping
    pub bands: ImportanceBands,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            vector_len: 5,
            bands: ImportanceBands::default(),
        }
    }
}

impl LedgerConfig {
    pub fn with_vector_len(vector_len: usize) -> Self {
        Self {
            vector_len,
            ..Self::default()
        }
    }

    /// Load and validate a TOML config file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read ledger config: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid ledger config: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LedgerConfig =
            toml::from_str(content).context("Failed to parse TOML ledger config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), LedgerError> {
        if self.vector_len == 0 {
            return Err(LedgerError::InvalidConfig(
                "vector_len must be greater than 0".to_string(),
            ));
        }
        self.bands.validate().map_err(LedgerError::InvalidConfig)
    }
}
