//! Shared data model for the alignment pipeline.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Score table
// ---------------------------------------------------------------------------

/// Per-pair matcher scores produced by the matching engine.
///
/// Maps a source entity id to a map of target entity ids, each carrying a
/// fixed-length feature vector with one value per matcher. Built once per
/// ontology pair and treated as read-only by all downstream stages.
///
/// Insertion order of sources and of targets within a source is preserved,
/// so iteration over the table is deterministic for a given input file.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    matchers: Vec<String>,
    scores: HashMap<String, HashMap<String, Vec<f32>>>,
    source_order: Vec<String>,
    target_order: HashMap<String, Vec<String>>,
}

impl ScoreTable {
    /// Create an empty table with the given matcher column names.
    pub fn new(matchers: Vec<String>) -> Self {
        Self {
            matchers,
            scores: HashMap::new(),
            source_order: Vec::new(),
            target_order: HashMap::new(),
        }
    }

    /// Matcher column names, in score-file order.
    pub fn matchers(&self) -> &[String] {
        &self.matchers
    }

    /// Number of matchers, i.e. the feature-vector length of every entry.
    pub fn feature_dim(&self) -> usize {
        self.matchers.len()
    }

    /// Insert the feature vector for a (source, target) pair.
    ///
    /// A repeated pair overwrites the previous vector without duplicating
    /// iteration order entries.
    pub fn insert(&mut self, src: &str, tgt: &str, features: Vec<f32>) {
        let per_src = self.scores.entry(src.to_string()).or_insert_with(|| {
            self.source_order.push(src.to_string());
            HashMap::new()
        });
        if per_src.insert(tgt.to_string(), features).is_none() {
            self.target_order
                .entry(src.to_string())
                .or_default()
                .push(tgt.to_string());
        }
    }

    /// Feature vector for a (source, target) pair, if present.
    pub fn get(&self, src: &str, tgt: &str) -> Option<&[f32]> {
        self.scores.get(src)?.get(tgt).map(Vec::as_slice)
    }

    /// Whether the table has any entry for this source.
    pub fn contains_source(&self, src: &str) -> bool {
        self.scores.contains_key(src)
    }

    /// Source ids in first-seen order.
    pub fn sources(&self) -> &[String] {
        &self.source_order
    }

    /// Target ids scored for a source, in first-seen order.
    pub fn targets_of(&self, src: &str) -> &[String] {
        self.target_order.get(src).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of scored pairs.
    pub fn len(&self) -> usize {
        self.scores.values().map(HashMap::len).sum()
    }

    /// Whether the table holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reference and candidate mappings
// ---------------------------------------------------------------------------

/// One labeled (source, target) mapping row.
///
/// Reference rows carry label 1.0, sampled negatives 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRow {
    pub src: String,
    pub tgt: String,
    pub label: f64,
}

impl MappingRow {
    pub fn new(src: impl Into<String>, tgt: impl Into<String>, label: f64) -> Self {
        Self {
            src: src.into(),
            tgt: tgt.into(),
            label,
        }
    }
}

/// An anchor mapping with its ranked candidate targets (local/ranking mode).
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAnchor {
    /// Anchor source entity.
    pub src: String,
    /// Anchor (reference) target entity.
    pub tgt: String,
    /// Candidate target ids, deduplicated, in file order.
    pub candidates: Vec<String>,
}

/// Candidate lists keyed by anchor source, preserving anchor order.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    anchors: Vec<CandidateAnchor>,
    by_src: HashMap<String, usize>,
}

impl CandidateSet {
    /// Build a candidate set, deduplicating each anchor's candidate list
    /// while preserving first-seen order.
    pub fn new(anchors: Vec<CandidateAnchor>) -> Self {
        let mut deduped = Vec::with_capacity(anchors.len());
        let mut by_src = HashMap::new();
        for mut anchor in anchors {
            let mut seen = HashMap::new();
            anchor.candidates.retain(|c| seen.insert(c.clone(), ()).is_none());
            by_src.entry(anchor.src.clone()).or_insert(deduped.len());
            deduped.push(anchor);
        }
        Self {
            anchors: deduped,
            by_src,
        }
    }

    /// Anchor rows in file order.
    pub fn anchors(&self) -> &[CandidateAnchor] {
        &self.anchors
    }

    /// Candidate list for an anchor source.
    pub fn candidates_of(&self, src: &str) -> Option<&[String]> {
        self.by_src
            .get(src)
            .map(|&i| self.anchors[i].candidates.as_slice())
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

/// A scored entity-mapping candidate produced by the trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMapping {
    pub src: String,
    pub tgt: String,
    pub score: f64,
}

impl ScoredMapping {
    pub fn new(src: impl Into<String>, tgt: impl Into<String>, score: f64) -> Self {
        Self {
            src: src.into(),
            tgt: tgt.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_table_preserves_insertion_order() {
        let mut table = ScoreTable::new(vec!["LM".into(), "WM".into()]);
        table.insert("b", "y", vec![0.1, 0.2]);
        table.insert("a", "x", vec![0.3, 0.4]);
        table.insert("b", "x", vec![0.5, 0.6]);

        assert_eq!(table.sources(), &["b".to_string(), "a".to_string()]);
        assert_eq!(table.targets_of("b"), &["y".to_string(), "x".to_string()]);
        assert_eq!(table.get("a", "x"), Some(&[0.3_f32, 0.4][..]));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn score_table_overwrite_keeps_single_order_entry() {
        let mut table = ScoreTable::new(vec!["LM".into()]);
        table.insert("a", "x", vec![0.1]);
        table.insert("a", "x", vec![0.9]);
        assert_eq!(table.targets_of("a").len(), 1);
        assert_eq!(table.get("a", "x"), Some(&[0.9_f32][..]));
    }

    #[test]
    fn candidate_set_dedups_per_anchor() {
        let set = CandidateSet::new(vec![CandidateAnchor {
            src: "a".into(),
            tgt: "x".into(),
            candidates: vec!["x".into(), "y".into(), "x".into()],
        }]);
        assert_eq!(
            set.candidates_of("a"),
            Some(&["x".to_string(), "y".to_string()][..])
        );
    }
}
