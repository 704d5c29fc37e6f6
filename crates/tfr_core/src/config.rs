//! Catalog Configuration
//!
//! Handles the directory conventions, cosmetic prefixes and worker pool size,
//! plus JSON (de)serialization.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hard cap on concurrent series loads, whatever the config file says.
pub const MAX_WORKERS: usize = 10;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Skip root entries with a `.` in their name (crashed or incomplete runs)
    pub exclude_malformed: bool,
    // Run layout
    pub params_suffix: String,
    pub params_depth: usize,
    pub events_prefix: String,
    pub events_depth: usize,
    // Cosmetics
    pub model_prefix: String,
    pub tag_prefix: String,
    // Loading
    pub max_workers: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            exclude_malformed: true,
            params_suffix: ".params".to_string(),
            params_depth: 1, // <run>/*/x.params
            events_prefix: "events".to_string(),
            events_depth: 2, // <run>/*/*/events.out.tfevents...
            model_prefix: "Ant ".to_string(),
            tag_prefix: "Ant-v4-".to_string(),
            max_workers: MAX_WORKERS,
        }
    }
}

impl CatalogConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Worker count actually used for a query pool.
    pub fn worker_count(&self) -> usize {
        self.max_workers.clamp(1, MAX_WORKERS)
    }

    /// Glob (relative to a run directory) for the hyperparameter dump.
    pub fn params_glob(&self) -> String {
        format!("{}*{}", "*/".repeat(self.params_depth), escape(&self.params_suffix))
    }

    /// Glob (relative to a run directory) for the event log.
    pub fn events_glob(&self) -> String {
        format!("{}{}*", "*/".repeat(self.events_depth), escape(&self.events_prefix))
    }
}

fn escape(literal: &str) -> String {
    glob::Pattern::escape(literal)
}
