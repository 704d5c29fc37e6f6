//! Plotted Scalars
//!
//! The explicit registry of series currently shown. Query results are
//! appended to it, entries can be removed one by one or all at once, and the
//! whole set can be re-ranked by a chosen tag.

use std::path::Path;

use tfr_core::query::rank;
use tfr_core::series::display_tag;
use tfr_core::{QueryEntry, QueryResult, RankKey};
use tracing::debug;

#[derive(Debug, Default)]
pub struct PlotSet {
    entries: Vec<QueryEntry>,
    rank_key: RankKey,
    next_order: usize,
}

impl PlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the entries of `result` that are not plotted yet, in their
    /// current order. Returns how many were added.
    pub fn append(&mut self, result: QueryResult) -> usize {
        let mut added = 0;
        for mut entry in result.into_entries() {
            if self.contains(&entry.run_dir) {
                debug!("Already plotted: {:?}", entry.run_dir);
                continue;
            }
            entry.order = self.next_order;
            self.next_order += 1;
            entry.rescore(&self.rank_key);
            self.entries.push(entry);
            added += 1;
        }
        if self.entries.len() > 1 {
            rank(&mut self.entries);
        }
        added
    }

    pub fn remove(&mut self, run_dir: &Path) -> Option<QueryEntry> {
        let idx = self.entries.iter().position(|e| e.run_dir == run_dir)?;
        Some(self.entries.remove(idx))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_order = 0;
    }

    /// Rescores every series with `key` and keeps it for later appends.
    pub fn rank_by(&mut self, key: RankKey) {
        self.rank_key = key;
        for entry in &mut self.entries {
            entry.rescore(&self.rank_key);
        }
        if self.entries.len() > 1 {
            rank(&mut self.entries);
        }
    }

    pub fn rank_key(&self) -> &RankKey {
        &self.rank_key
    }

    pub fn contains(&self, run_dir: &Path) -> bool {
        self.entries.iter().any(|e| e.run_dir == run_dir)
    }

    pub fn entries(&self) -> &[QueryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display name of the tag `entry` is ranked by; empty when the series
    /// has no such tag.
    pub fn ranked_tag<'a>(&self, entry: &'a QueryEntry, tag_prefix: &str) -> &'a str {
        entry
            .table()
            .and_then(|t| t.rank_tag(&self.rank_key))
            .map(|tag| display_tag(tag, tag_prefix))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tfr_core::{HyperparameterRecord, ScalarTable, MISSING_METRIC};

    fn entry(run: &str, scalars: &[(&str, f64)]) -> QueryEntry {
        let mut table = ScalarTable::default();
        for (step, (tag, value)) in scalars.iter().enumerate() {
            table.push(*tag, step as i64, *value);
        }
        let mut entry = QueryEntry {
            label: format!("{}\nSparse [256,32]", run),
            run_dir: PathBuf::from("/runs/Ant DQN | Sparse").join(run),
            record: HyperparameterRecord::default(),
            series: Ok(table),
            metric: MISSING_METRIC,
            order: 0,
        };
        entry.rescore(&RankKey::FinalTest);
        entry
    }

    fn result(entries: Vec<QueryEntry>) -> QueryResult {
        QueryResult::from_entries(entries)
    }

    fn runs(plots: &PlotSet) -> Vec<String> {
        plots
            .entries()
            .iter()
            .map(|e| e.run_dir.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_append_ranks_and_skips_duplicates() {
        let mut plots = PlotSet::new();
        assert_eq!(plots.append(result(vec![entry("a", &[("Network/Test/Avg", 1.0)])])), 1);
        assert_eq!(
            plots.append(result(vec![
                entry("b", &[("Network/Test/Avg", 5.0)]),
                entry("a", &[("Network/Test/Avg", 1.0)]),
            ])),
            1
        );
        assert_eq!(runs(&plots), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut plots = PlotSet::new();
        plots.append(result(vec![
            entry("a", &[("Network/Test/Avg", 1.0)]),
            entry("b", &[("Network/Test/Avg", 2.0)]),
        ]));

        let removed = plots.remove(Path::new("/runs/Ant DQN | Sparse/a"));
        assert!(removed.is_some());
        assert!(plots.remove(Path::new("/runs/Ant DQN | Sparse/a")).is_none());
        assert_eq!(runs(&plots), vec!["b"]);

        plots.clear();
        assert!(plots.is_empty());
    }

    #[test]
    fn test_rank_by_tag_applies_to_later_appends() {
        let mut plots = PlotSet::new();
        plots.append(result(vec![
            entry("a", &[("Network/Test/Avg", 9.0), ("Reward", 1.0)]),
            entry("b", &[("Network/Test/Avg", 2.0), ("Reward", 4.0)]),
        ]));
        assert_eq!(runs(&plots), vec!["a", "b"]);

        plots.rank_by(RankKey::Tag("Reward".to_string()));
        assert_eq!(runs(&plots), vec!["b", "a"]);

        plots.append(result(vec![entry("c", &[("Network/Test/Avg", 50.0)])]));
        assert_eq!(runs(&plots), vec!["b", "a", "c"]);
        assert_eq!(plots.entries()[2].metric, MISSING_METRIC);
        assert_eq!(plots.ranked_tag(&plots.entries()[0], "Ant-v4-"), "Reward");
        assert_eq!(plots.ranked_tag(&plots.entries()[2], "Ant-v4-"), "");
    }

    #[test]
    fn test_equal_metrics_keep_append_order() {
        let mut plots = PlotSet::new();
        plots.append(result(vec![entry("x", &[("Network/Test/Avg", 3.0)])]));
        plots.append(result(vec![entry("y", &[("Network/Test/Avg", 3.0)])]));
        plots.append(result(vec![entry("z", &[("Network/Test/Avg", 3.0)])]));
        assert_eq!(runs(&plots), vec!["x", "y", "z"]);
    }
}
