//! Facet Index
//!
//! Multi-key lookup over discovered sessions: model tag → tag folders and
//! (model tag, reward tag) → observed network sizes with counts. The index is
//! a pure function of the session collection; `rebuild` and a sequence of
//! `update` calls over the same sessions produce equal indexes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::session::{strip_cosmetic, Session};

/// One distinct (hidden size, batch size) pair and how many runs share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCount {
    pub hidden: i64,
    pub batch: i64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetIndex {
    model_prefix: String,
    // Display forms, discovery order
    model_tags: Vec<String>,
    reward_tags: Vec<String>,
    folders: Vec<PathBuf>,
    // Keyed by model tag without the cosmetic prefix
    folders_by_model: BTreeMap<String, Vec<PathBuf>>,
    rewards_by_model: BTreeMap<String, Vec<String>>,
    sizes: BTreeMap<(String, String), Vec<SizeCount>>,
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

impl FacetIndex {
    pub fn new(model_prefix: impl Into<String>) -> Self {
        Self {
            model_prefix: model_prefix.into(),
            ..Default::default()
        }
    }

    pub fn rebuild<'a>(
        model_prefix: impl Into<String>,
        sessions: impl IntoIterator<Item = &'a Session>,
    ) -> Self {
        let mut index = Self::new(model_prefix);
        for session in sessions {
            index.update(session);
        }
        index
    }

    /// Inserts a session's facets. Duplicate sessions are counted twice.
    pub fn update(&mut self, session: &Session) {
        let key = strip_cosmetic(&session.model_tags, &self.model_prefix).to_string();

        push_unique(&mut self.model_tags, session.model_tags.clone());
        push_unique(&mut self.reward_tags, session.reward_tags.clone());
        push_unique(&mut self.folders, session.tag_folder.clone());
        push_unique(
            self.folders_by_model.entry(key.clone()).or_default(),
            session.tag_folder.clone(),
        );
        push_unique(
            self.rewards_by_model.entry(key.clone()).or_default(),
            session.reward_tags.clone(),
        );

        let (hidden, batch) = (session.hidden_size(), session.batch_size());
        let sizes = self
            .sizes
            .entry((key, session.reward_tags.clone()))
            .or_default();
        match sizes
            .iter_mut()
            .find(|s| s.hidden == hidden && s.batch == batch)
        {
            Some(existing) => existing.count += 1,
            None => sizes.push(SizeCount {
                hidden,
                batch,
                count: 1,
            }),
        }
    }

    fn key<'a>(&self, model: &'a str) -> &'a str {
        strip_cosmetic(model.trim(), &self.model_prefix)
    }

    /// Tag folders holding runs of `model`, in discovery order.
    pub fn model_to_folders(&self, model: &str) -> &[PathBuf] {
        self.folders_by_model
            .get(self.key(model))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Reward tags observed together with `model`.
    pub fn rewards_for(&self, model: &str) -> &[String] {
        self.rewards_by_model
            .get(self.key(model))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn sizes_for(&self, model: &str, reward: &str) -> &[SizeCount] {
        self.sizes
            .get(&(self.key(model).to_string(), reward.trim().to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn model_tags(&self) -> &[String] {
        &self.model_tags
    }

    pub fn reward_tags(&self) -> &[String] {
        &self.reward_tags
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    pub fn contains_folder(&self, folder: &Path) -> bool {
        self.folders.iter().any(|f| f == folder)
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Schema;

    fn session(folder: &str, model: &str, reward: &str, hidden: i64, batch: i64) -> Session {
        let record = Schema::training().parse(&format!(
            "< hidden_size: {} >, < batch_size: {} >",
            hidden, batch
        ));
        Session {
            run_dir: PathBuf::from(format!("/t/{}/run", folder)),
            params_path: PathBuf::from(format!("/t/{}/run/p/a.params", folder)),
            events_path: PathBuf::from(format!("/t/{}/run/p/l/events.out", folder)),
            tag_folder: PathBuf::from(format!("/t/{}", folder)),
            model_tags: model.to_string(),
            model_key: strip_cosmetic(model, "Ant ").to_string(),
            reward_tags: reward.to_string(),
            record,
        }
    }

    fn sample() -> Vec<Session> {
        vec![
            session("Ant LexDQN | Sparse", "Ant LexDQN", "Sparse", 256, 32),
            session("Ant LexDQN | Sparse", "Ant LexDQN", "Sparse", 256, 32),
            session("Ant LexDQN | Sparse", "Ant LexDQN", "Sparse", 512, 64),
            session("Ant LexDQN | Dense", "Ant LexDQN", "Dense", 256, 32),
            session("Ant DQN | Sparse", "Ant DQN", "Sparse", 256, 64),
        ]
    }

    #[test]
    fn test_sizes_are_merged_with_counts() {
        let index = FacetIndex::rebuild("Ant ", &sample());
        assert_eq!(
            index.sizes_for("LexDQN", "Sparse"),
            &[
                SizeCount { hidden: 256, batch: 32, count: 2 },
                SizeCount { hidden: 512, batch: 64, count: 1 },
            ]
        );
        // Display form resolves to the same key.
        assert_eq!(index.sizes_for("Ant LexDQN", "Sparse").len(), 2);
    }

    #[test]
    fn test_unknown_keys_are_empty() {
        let index = FacetIndex::rebuild("Ant ", &sample());
        assert!(index.sizes_for("PPO", "Sparse").is_empty());
        assert!(index.sizes_for("LexDQN", "Shaped").is_empty());
        assert!(index.model_to_folders("PPO").is_empty());
        assert!(index.rewards_for("PPO").is_empty());
        assert!(FacetIndex::new("Ant ").sizes_for("All", "All").is_empty());
    }

    #[test]
    fn test_folders_and_tags_keep_discovery_order() {
        let index = FacetIndex::rebuild("Ant ", &sample());
        assert_eq!(
            index.model_to_folders("LexDQN"),
            &[
                PathBuf::from("/t/Ant LexDQN | Sparse"),
                PathBuf::from("/t/Ant LexDQN | Dense"),
            ]
        );
        assert_eq!(index.model_tags(), &["Ant LexDQN", "Ant DQN"]);
        assert_eq!(index.reward_tags(), &["Sparse", "Dense"]);
        assert_eq!(index.rewards_for("DQN"), &["Sparse"]);
        assert_eq!(index.folders().len(), 3);
    }

    #[test]
    fn test_incremental_equals_rebuild() {
        let sessions = sample();
        let mut incremental = FacetIndex::rebuild("Ant ", &sessions[..2]);
        for s in &sessions[2..] {
            incremental.update(s);
        }
        assert_eq!(incremental, FacetIndex::rebuild("Ant ", &sessions));
    }
}
