//! Run Directory Scanner
//!
//! Walks `<root>/<model tags> | <reward tags>/<run>/...` and resolves the
//! parameter dump and event log of every run into a [`Session`].

use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions};
use tracing::{debug, info};

use crate::config::CatalogConfig;
use crate::error::{DiscoveryError, RunFile};
use crate::params::Schema;
use crate::session::{strip_cosmetic, Session, TagFolder};

/// Hidden entries are ignored, as a shell glob would.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

pub struct Scanner<'a> {
    config: &'a CatalogConfig,
    schema: &'a Schema,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a CatalogConfig, schema: &'a Schema) -> Self {
        Self { config, schema }
    }

    /// Every run under `root`. The first structural error aborts the scan.
    pub fn scan_root(
        &self,
        root: &Path,
        exclude_malformed: bool,
    ) -> Result<Vec<Session>, DiscoveryError> {
        let root = absolute_dir(root)?;
        let mut sessions = Vec::new();

        for entry in matching(&root, "*")? {
            if !entry.is_dir() {
                continue;
            }
            let name = entry.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if exclude_malformed && name.contains('.') {
                debug!("Excluding malformed entry {:?}", entry);
                continue;
            }
            // Holds no runs, e.g. a saved report directory
            if !matching(&entry, "*")?.iter().any(|p| p.is_dir()) {
                debug!("Skipping {:?}: no run directories", entry);
                continue;
            }
            sessions.extend(self.scan_tag_folder(&entry)?);
        }

        info!("🔎 Discovered {} runs under {:?}", sessions.len(), root);
        Ok(sessions)
    }

    /// Every run inside one tag folder, or the first error.
    pub fn scan_tag_folder(&self, folder: &Path) -> Result<Vec<Session>, DiscoveryError> {
        let folder = TagFolder::parse(&absolute_dir(folder)?)?;
        matching(&folder.path, "*")?
            .into_iter()
            .filter(|run| run.is_dir())
            .map(|run| self.scan_run_in(&run, &folder))
            .collect()
    }

    /// A single run directory; its parent must be a tag folder.
    pub fn scan_run(&self, run_dir: &Path) -> Result<Session, DiscoveryError> {
        let run_dir = absolute_dir(run_dir)?;
        let parent = run_dir.parent().ok_or_else(|| DiscoveryError::OrphanRun {
            path: run_dir.clone(),
        })?;
        let folder = TagFolder::parse(parent)?;
        self.scan_run_in(&run_dir, &folder)
    }

    fn scan_run_in(&self, run_dir: &Path, folder: &TagFolder) -> Result<Session, DiscoveryError> {
        let params_path = resolve_unique(run_dir, &self.config.params_glob(), RunFile::ParamsDump)?;
        let events_path = resolve_unique(run_dir, &self.config.events_glob(), RunFile::EventLog)?;

        let text = fs::read_to_string(&params_path).map_err(|source| {
            DiscoveryError::UnreadableParams {
                path: params_path.clone(),
                source,
            }
        })?;
        let report = self.schema.parse_with_report(&text);
        if !report.skipped.is_empty() {
            debug!(
                "{} parameter fragments skipped in {:?}",
                report.skipped.len(),
                params_path
            );
        }

        Ok(Session {
            run_dir: run_dir.to_path_buf(),
            params_path,
            events_path,
            tag_folder: folder.path.clone(),
            model_key: strip_cosmetic(&folder.model_tags, &self.config.model_prefix).to_string(),
            model_tags: folder.model_tags.clone(),
            reward_tags: folder.reward_tags.clone(),
            record: report.record,
        })
    }
}

fn absolute_dir(path: &Path) -> Result<PathBuf, DiscoveryError> {
    let path = fs::canonicalize(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !path.is_dir() {
        return Err(DiscoveryError::NotADirectory { path });
    }
    Ok(path)
}

/// Paths matching `relative` under `dir`, sorted.
fn matching(dir: &Path, relative: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        relative
    );
    let paths = glob_with(&pattern, MATCH_OPTIONS).map_err(|source| DiscoveryError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    paths
        .map(|entry| {
            entry.map_err(|e| DiscoveryError::Io {
                path: e.path().to_path_buf(),
                source: e.into(),
            })
        })
        .collect()
}

/// Exactly one file must match; zero or several reject the run.
fn resolve_unique(run_dir: &Path, relative: &str, what: RunFile) -> Result<PathBuf, DiscoveryError> {
    let mut found: Vec<PathBuf> = matching(run_dir, relative)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect();
    if found.len() != 1 {
        return Err(DiscoveryError::AmbiguousRunFile {
            run: run_dir.to_path_buf(),
            what,
            found: found.len(),
        });
    }
    Ok(found.remove(0))
}
