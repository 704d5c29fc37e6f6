//! Training sessions: one discovered run with its resolved files and
//! parsed hyperparameters.

use std::path::{Path, PathBuf};

use crate::error::DiscoveryError;
use crate::params::HyperparameterRecord;

/// Delimiter between model tags and reward tags in a tag-folder name.
pub const TAG_DELIMITER: char = '|';

/// Removes an exact literal prefix, never a character class.
pub fn strip_cosmetic<'a>(text: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return text;
    }
    text.strip_prefix(prefix).unwrap_or(text)
}

/// The `"<model tags> | <reward tags>"` directory grouping several runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFolder {
    pub path: PathBuf,
    pub model_tags: String,
    pub reward_tags: String,
}

impl TagFolder {
    pub fn parse(path: &Path) -> Result<Self, DiscoveryError> {
        let malformed = || DiscoveryError::MalformedTagFolder {
            path: path.to_path_buf(),
        };
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(malformed)?;

        let mut parts = name.split(TAG_DELIMITER);
        let (Some(model), Some(reward), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let (model, reward) = (model.trim(), reward.trim());
        if model.is_empty() || reward.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            path: path.to_path_buf(),
            model_tags: model.to_string(),
            reward_tags: reward.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub run_dir: PathBuf,
    pub params_path: PathBuf,
    pub events_path: PathBuf,
    pub tag_folder: PathBuf,
    /// Model tags as written in the folder name (display form)
    pub model_tags: String,
    /// Model tags with the cosmetic prefix removed (index key)
    pub model_key: String,
    pub reward_tags: String,
    pub record: HyperparameterRecord,
}

impl Session {
    pub fn hidden_size(&self) -> i64 {
        self.record.hidden_size()
    }

    pub fn batch_size(&self) -> i64 {
        self.record.batch_size()
    }

    /// Two-line display label, e.g. `"LexDQN\nSparse [256,32]"`.
    pub fn label(&self) -> String {
        format!(
            "{}\n{} [{},{}]",
            self.model_key,
            self.reward_tags,
            self.hidden_size(),
            self.batch_size()
        )
    }
}
