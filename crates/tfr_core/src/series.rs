//! Scalar Series
//!
//! The per-run `(tag, step, value)` table read from an event log, plus the
//! ranking metric, smoothing and tag display helpers the plotting layer uses.

/// Metric assigned to a series without the requested tag, so it ranks last.
pub const MISSING_METRIC: f64 = -1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarPoint {
    pub tag: String,
    pub step: i64,
    pub value: f64,
}

/// How a series is scored for ranking.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RankKey {
    /// First tag containing "Avg", "Network" and "Test" but not "Best"
    #[default]
    FinalTest,
    /// Exact tag name
    Tag(String),
}

impl RankKey {
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            RankKey::FinalTest => {
                tag.contains("Avg")
                    && tag.contains("Network")
                    && tag.contains("Test")
                    && !tag.contains("Best")
            }
            RankKey::Tag(name) => tag == name,
        }
    }
}

/// Observations in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarTable {
    points: Vec<ScalarPoint>,
}

impl ScalarTable {
    pub fn from_points(points: Vec<ScalarPoint>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, tag: impl Into<String>, step: i64, value: f64) {
        self.points.push(ScalarPoint {
            tag: tag.into(),
            step,
            value,
        });
    }

    pub fn points(&self) -> &[ScalarPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct tags in order of first appearance.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for p in &self.points {
            if !tags.contains(&p.tag.as_str()) {
                tags.push(&p.tag);
            }
        }
        tags
    }

    /// `(step, value)` pairs recorded under `tag`.
    pub fn series(&self, tag: &str) -> Vec<(i64, f64)> {
        self.points
            .iter()
            .filter(|p| p.tag == tag)
            .map(|p| (p.step, p.value))
            .collect()
    }

    pub fn last_value(&self, tag: &str) -> Option<f64> {
        self.points.iter().rev().find(|p| p.tag == tag).map(|p| p.value)
    }

    /// The tag `key` selects: the first matching one in file order.
    pub fn rank_tag(&self, key: &RankKey) -> Option<&str> {
        self.points
            .iter()
            .map(|p| p.tag.as_str())
            .find(|tag| key.matches(tag))
    }

    /// Last value of the ranked tag, or [`MISSING_METRIC`].
    pub fn metric(&self, key: &RankKey) -> f64 {
        self.rank_tag(key)
            .and_then(|tag| self.last_value(tag))
            .unwrap_or(MISSING_METRIC)
    }
}

/// Exponential moving average as TensorBoard draws it. Non-finite samples
/// repeat the previous smoothed value.
pub fn smooth(values: &[f64], weight: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return out;
    };

    let mut last = if first.is_finite() { first } else { 0.0 };
    out.push(last);
    for &v in &values[1..] {
        if v.is_finite() {
            last = last * weight + (1.0 - weight) * v;
        }
        out.push(last);
    }
    out
}

/// Tag text for display: exact cosmetic prefix and trailing `:` removed.
pub fn display_tag<'a>(tag: &'a str, prefix: &str) -> &'a str {
    let tag = crate::session::strip_cosmetic(tag, prefix);
    tag.strip_suffix(':').unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ScalarTable {
        let mut t = ScalarTable::default();
        t.push("Train/Loss", 0, 1.0);
        t.push("Network/Test/Best Avg", 0, 90.0);
        t.push("Network/Test/Avg", 0, 10.0);
        t.push("Network/Test/Avg - 2", 0, 70.0);
        t.push("Network/Test/Avg", 1, 42.5);
        t.push("Network/Test/Avg - 2", 1, 75.0);
        t
    }

    #[test]
    fn test_final_test_metric_uses_first_matching_tag() {
        let t = table();
        assert_eq!(t.rank_tag(&RankKey::FinalTest), Some("Network/Test/Avg"));
        assert_eq!(t.metric(&RankKey::FinalTest), 42.5);
    }

    #[test]
    fn test_exact_tag_metric_and_sentinel() {
        let t = table();
        assert_eq!(t.metric(&RankKey::Tag("Network/Test/Avg - 2".into())), 75.0);
        assert_eq!(t.metric(&RankKey::Tag("Network/Test".into())), MISSING_METRIC);

        let mut no_test = ScalarTable::default();
        no_test.push("Train/Loss", 0, 0.5);
        assert_eq!(no_test.metric(&RankKey::FinalTest), MISSING_METRIC);
    }

    #[test]
    fn test_tags_and_series() {
        let t = table();
        assert_eq!(t.tags().len(), 4);
        assert_eq!(t.tags()[0], "Train/Loss");
        assert_eq!(t.series("Network/Test/Avg"), vec![(0, 10.0), (1, 42.5)]);
    }

    #[test]
    fn test_smooth() {
        assert!(smooth(&[], 0.6).is_empty());
        assert_eq!(smooth(&[1.0, 2.0, 3.0], 0.0), vec![1.0, 2.0, 3.0]);

        let s = smooth(&[f64::NAN, 10.0, f64::INFINITY, 20.0], 0.5);
        assert_eq!(s, vec![0.0, 5.0, 5.0, 12.5]);
    }

    #[test]
    fn test_display_tag() {
        assert_eq!(display_tag("Ant-v4-Network/Test/Avg:", "Ant-v4-"), "Network/Test/Avg");
        assert_eq!(display_tag("Network/Loss", "Ant-v4-"), "Network/Loss");
    }
}
