//! Scalar Query Engine
//!
//! Resolves a (model, reward, size) filter through the facet index, loads the
//! matching runs' scalar series on a bounded worker pool and ranks them by
//! their final test performance.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, WILDCARD};
use crate::config::CatalogConfig;
use crate::error::SeriesError;
use crate::events::{EventFileReader, ScalarSource};
use crate::params::HyperparameterRecord;
use crate::series::{RankKey, ScalarTable, MISSING_METRIC};
use crate::session::Session;

/// Network size facet. `(0, 0)` means any size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeFilter {
    #[default]
    Any,
    Exact { hidden: i64, batch: i64 },
}

impl SizeFilter {
    /// Batch size first, as the size selector passes it.
    pub fn new(batch: i64, hidden: i64) -> Self {
        if hidden == 0 && batch == 0 {
            SizeFilter::Any
        } else {
            SizeFilter::Exact { hidden, batch }
        }
    }

    pub fn matches(&self, session: &Session) -> bool {
        match *self {
            SizeFilter::Any => true,
            SizeFilter::Exact { hidden, batch } => {
                session.hidden_size() == hidden && session.batch_size() == batch
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    pub model: String,
    pub reward: String,
    pub size: SizeFilter,
}

impl QueryFilter {
    /// `query(model, reward, batch, hidden)`: the size pair is batch first.
    pub fn new(model: &str, reward: &str, batch: i64, hidden: i64) -> Self {
        Self {
            model: model.trim().to_string(),
            reward: reward.trim().to_string(),
            size: SizeFilter::new(batch, hidden),
        }
    }

    /// Every discovered run.
    pub fn all() -> Self {
        Self::new(WILDCARD, WILDCARD, 0, 0)
    }

    fn accepts_folder(&self, folder: &Path) -> bool {
        if self.reward == WILDCARD {
            return true;
        }
        folder
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(self.reward.as_str()))
    }
}

/// One matching run. A failed load keeps its slot with the error.
#[derive(Debug)]
pub struct QueryEntry {
    pub label: String,
    pub run_dir: PathBuf,
    pub record: HyperparameterRecord,
    pub series: Result<ScalarTable, SeriesError>,
    pub metric: f64,
    /// Position in discovery order, the ranking tie-break
    pub order: usize,
}

impl QueryEntry {
    pub fn table(&self) -> Option<&ScalarTable> {
        self.series.as_ref().ok()
    }

    pub fn is_ok(&self) -> bool {
        self.series.is_ok()
    }

    /// Recomputes `metric` from the loaded series under `key`.
    pub fn rescore(&mut self, key: &RankKey) {
        self.metric = self.table().map_or(MISSING_METRIC, |t| t.metric(key));
    }
}

#[derive(Debug, Default)]
pub struct QueryResult {
    entries: Vec<QueryEntry>,
}

impl QueryResult {
    /// Wraps entries as they are, without reranking.
    pub fn from_entries(entries: Vec<QueryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[QueryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<QueryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_ok()).count()
    }

    /// Rescores every entry with `key`; sorts descending when there is more
    /// than one, ties in discovery order.
    pub fn rank_by(&mut self, key: &RankKey) {
        for entry in &mut self.entries {
            entry.rescore(key);
        }
        if self.entries.len() > 1 {
            rank(&mut self.entries);
        }
    }
}

/// Descending by metric, ties in discovery order.
pub fn rank(entries: &mut [QueryEntry]) {
    entries.sort_by(|a, b| b.metric.total_cmp(&a.metric).then(a.order.cmp(&b.order)));
}

pub struct QueryEngine<S = EventFileReader> {
    pool: ThreadPool,
    source: S,
    rank_key: RankKey,
}

impl QueryEngine<EventFileReader> {
    pub fn new(config: &CatalogConfig) -> Result<Self, ThreadPoolBuildError> {
        Self::with_source(config, EventFileReader)
    }
}

impl<S: ScalarSource> QueryEngine<S> {
    pub fn with_source(config: &CatalogConfig, source: S) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|i| format!("series-loader-{}", i))
            .build()?;
        Ok(Self {
            pool,
            source,
            rank_key: RankKey::default(),
        })
    }

    /// Ranks by an exact tag instead of the final-test heuristic.
    pub fn with_rank_key(mut self, key: RankKey) -> Self {
        self.rank_key = key;
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Sessions matching `filter`, in discovery order: candidate folders from
    /// the index first, then sessions under those folders, then sizes.
    pub fn resolve<'c>(&self, catalog: &'c Catalog, filter: &QueryFilter) -> Vec<&'c Session> {
        let index = catalog.index();
        let folders = if filter.model == WILDCARD {
            index.folders()
        } else {
            index.model_to_folders(&filter.model)
        };
        let folders: Vec<&Path> = folders
            .iter()
            .map(PathBuf::as_path)
            .filter(|f| filter.accepts_folder(f))
            .collect();
        if folders.is_empty() {
            debug!("No tag folder matches {:?}", filter);
            return Vec::new();
        }

        catalog
            .sessions()
            .iter()
            .filter(|s| folders.iter().any(|f| s.events_path.starts_with(f)))
            .filter(|s| filter.size.matches(s))
            .collect()
    }

    /// Loads and ranks every run matching `filter`. Blocks until all loads
    /// have finished.
    pub fn query(&self, catalog: &Catalog, filter: &QueryFilter) -> QueryResult {
        let sessions = self.resolve(catalog, filter);
        let tables: Vec<Result<ScalarTable, SeriesError>> = self
            .pool
            .install(|| sessions.par_iter().map(|s| self.load(s)).collect());

        let mut entries: Vec<QueryEntry> = sessions
            .iter()
            .zip(tables)
            .enumerate()
            .map(|(order, (session, series))| {
                let mut entry = QueryEntry {
                    label: session.label(),
                    run_dir: session.run_dir.clone(),
                    record: session.record.clone(),
                    series,
                    metric: MISSING_METRIC,
                    order,
                };
                entry.rescore(&self.rank_key);
                entry
            })
            .collect();
        if entries.len() > 1 {
            rank(&mut entries);
        }

        let result = QueryResult { entries };
        info!(
            "📊 Query {}/{} matched {} runs ({} failed)",
            filter.model,
            filter.reward,
            result.len(),
            result.failures()
        );
        result
    }

    fn load(&self, session: &Session) -> Result<ScalarTable, SeriesError> {
        let table = self.source.load(&session.events_path).and_then(|table| {
            if table.is_empty() {
                Err(SeriesError::InvalidData {
                    path: session.events_path.clone(),
                    reason: "no scalar tags recorded".to_string(),
                })
            } else {
                Ok(table)
            }
        });
        if let Err(e) = &table {
            warn!("⚠️ {}", e);
        }
        table
    }
}
