//! Run Catalog
//!
//! Owns the discovered sessions and the facet index built over them. The
//! scanner and importers are the only writers; queries borrow the catalog
//! immutably, so an import cannot overlap a query.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::CatalogConfig;
use crate::error::DiscoveryError;
use crate::facets::{FacetIndex, SizeCount};
use crate::params::Schema;
use crate::scanner::Scanner;
use crate::session::Session;

/// Facet value meaning "match everything". Never stored in the index.
pub const WILDCARD: &str = "All";

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub sessions: usize,
    pub model_tags: Vec<String>,
    pub reward_tags: Vec<String>,
}

#[derive(Debug)]
pub struct Catalog {
    config: CatalogConfig,
    schema: Schema,
    root: Option<PathBuf>,
    sessions: Vec<Session>,
    index: FacetIndex,
    entries_changed: bool,
}

impl Catalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_schema(config, Schema::training().clone())
    }

    pub fn with_schema(config: CatalogConfig, schema: Schema) -> Self {
        let index = FacetIndex::new(config.model_prefix.clone());
        Self {
            config,
            schema,
            root: None,
            sessions: Vec::new(),
            index,
            entries_changed: false,
        }
    }

    /// Replaces the catalog with every run under `root`, honoring the
    /// configured malformed-entry filter.
    pub fn scan(&mut self, root: &Path) -> Result<ScanSummary, DiscoveryError> {
        self.scan_with(root, self.config.exclude_malformed)
    }

    /// Replaces the catalog with every run under `root`. On error the
    /// previous contents are kept.
    pub fn scan_with(
        &mut self,
        root: &Path,
        exclude_malformed: bool,
    ) -> Result<ScanSummary, DiscoveryError> {
        let sessions = Scanner::new(&self.config, &self.schema).scan_root(root, exclude_malformed)?;

        self.index = FacetIndex::rebuild(self.config.model_prefix.clone(), &sessions);
        self.sessions = sessions;
        self.root = Some(root.to_path_buf());

        Ok(ScanSummary {
            sessions: self.sessions.len(),
            model_tags: self.index.model_tags().to_vec(),
            reward_tags: self.index.reward_tags().to_vec(),
        })
    }

    /// Adds one run directory. An invalid run is returned as an error and
    /// leaves the catalog unchanged.
    pub fn import_single_run(&mut self, run_dir: &Path) -> Result<&Session, DiscoveryError> {
        let session = Scanner::new(&self.config, &self.schema)
            .scan_run(run_dir)
            .map_err(|e| {
                warn!("❌ Invalid run {:?}: {}", run_dir, e);
                e
            })?;

        let idx = self.insert(session);
        self.entries_changed = true;
        info!("✅ Imported run {:?}", self.sessions[idx].run_dir);
        Ok(&self.sessions[idx])
    }

    /// Adds every run of a tag folder. Nothing is added if any run is
    /// invalid. Returns the number of runs imported.
    pub fn import_tag_folder(&mut self, folder: &Path) -> Result<usize, DiscoveryError> {
        let sessions = Scanner::new(&self.config, &self.schema).scan_tag_folder(folder)?;

        let count = sessions.len();
        for session in sessions {
            self.insert(session);
        }
        self.entries_changed = true;
        info!("✅ Imported {} runs from {:?}", count, folder);
        Ok(count)
    }

    /// Re-importing a known run only refreshes its file paths.
    fn insert(&mut self, session: Session) -> usize {
        if let Some(idx) = self.sessions.iter().position(|s| s.run_dir == session.run_dir) {
            let existing = &mut self.sessions[idx];
            existing.params_path = session.params_path;
            existing.events_path = session.events_path;
            return idx;
        }
        self.index.update(&session);
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn index(&self) -> &FacetIndex {
        &self.index
    }

    pub fn find_run(&self, run_dir: &Path) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.run_dir == run_dir || s.run_dir.ends_with(run_dir))
    }

    /// Model tags followed by the wildcard, for selectors.
    pub fn all_model_tags(&self) -> Vec<String> {
        with_wildcard(self.index.model_tags())
    }

    /// Reward tags followed by the wildcard, for selectors.
    pub fn all_reward_tags(&self) -> Vec<String> {
        with_wildcard(self.index.reward_tags())
    }

    /// Reward tags available for `model` followed by the wildcard.
    pub fn reward_tags_for(&self, model: &str) -> Vec<String> {
        if model == WILDCARD {
            return self.all_reward_tags();
        }
        with_wildcard(self.index.rewards_for(model))
    }

    pub fn sizes_for(&self, model: &str, reward: &str) -> &[SizeCount] {
        self.index.sizes_for(model, reward)
    }

    pub fn entries_changed(&self) -> bool {
        self.entries_changed
    }

    /// Returns the "entries changed" flag and clears it.
    pub fn take_entries_changed(&mut self) -> bool {
        std::mem::take(&mut self.entries_changed)
    }
}

fn with_wildcard(tags: &[String]) -> Vec<String> {
    let mut tags = tags.to_vec();
    tags.push(WILDCARD.to_string());
    tags
}
