//! Alignment extraction: global dedup-by-max and local candidate-score-fill.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use ontoalign_core::{AlignError, CandidateSet, Result, ScoredMapping};

use ontoalign_data::literal;

/// Keep the best-scoring mapping per source, preserving first-seen source
/// order.
pub fn dedup_by_max(predictions: &[ScoredMapping]) -> Vec<ScoredMapping> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, ScoredMapping> = HashMap::new();
    for pred in predictions {
        match best.get_mut(&pred.src) {
            Some(current) => {
                if pred.score > current.score {
                    *current = pred.clone();
                }
            }
            None => {
                order.push(pred.src.clone());
                best.insert(pred.src.clone(), pred.clone());
            }
        }
    }
    order
        .into_iter()
        .filter_map(|src| best.remove(&src))
        .collect()
}

/// Write the global alignment: one `[SrcEntity, TgtEntity, Score]` row per
/// source, the max-score candidate.
pub fn save_global(predictions: &[ScoredMapping], dir: &Path) -> Result<PathBuf> {
    let path = dir.join("src2tgt.maps_global.tsv");
    let mut writer = tsv_writer(&path)?;
    writer
        .write_record(["SrcEntity", "TgtEntity", "Score"])
        .map_err(|e| AlignError::Table(format!("Failed to write alignment header: {e}")))?;
    for mapping in dedup_by_max(predictions) {
        let score = mapping.score.to_string();
        writer
            .write_record([mapping.src.as_str(), mapping.tgt.as_str(), score.as_str()])
            .map_err(|e| AlignError::Table(format!("Failed to write alignment row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AlignError::Table(format!("Failed to flush alignment: {e}")))?;
    info!(path = %path.display(), "wrote global alignment");
    Ok(path)
}

/// Fill each anchor's candidate list with predicted scores, preserving
/// candidate order; candidates without a prediction score 0.0.
pub fn fill_anchored_scores(
    candidates: &CandidateSet,
    predictions: &[ScoredMapping],
) -> Vec<(String, String, Vec<(String, f64)>)> {
    let mut by_pair: HashMap<(&str, &str), f64> = HashMap::new();
    for pred in predictions {
        by_pair.insert((&pred.src, &pred.tgt), pred.score);
    }

    candidates
        .anchors()
        .iter()
        .map(|anchor| {
            let scored: Vec<(String, f64)> = anchor
                .candidates
                .iter()
                .map(|cand| {
                    let score = by_pair
                        .get(&(anchor.src.as_str(), cand.as_str()))
                        .copied()
                        .unwrap_or(0.0);
                    (cand.clone(), score)
                })
                .collect();
            (anchor.src.clone(), anchor.tgt.clone(), scored)
        })
        .collect()
}

/// Write the local alignment: per anchor, the candidate list with filled-in
/// scores as `[SrcEntity, TgtEntity, TgtCandidates]`.
pub fn save_local(
    candidates: &CandidateSet,
    predictions: &[ScoredMapping],
    dir: &Path,
) -> Result<PathBuf> {
    let path = dir.join("src2tgt.maps_local.tsv");
    let mut writer = tsv_writer(&path)?;
    writer
        .write_record(["SrcEntity", "TgtEntity", "TgtCandidates"])
        .map_err(|e| AlignError::Table(format!("Failed to write alignment header: {e}")))?;
    for (src, tgt, scored) in fill_anchored_scores(candidates, predictions) {
        let filled = literal::format_scored(&scored);
        writer
            .write_record([src.as_str(), tgt.as_str(), filled.as_str()])
            .map_err(|e| AlignError::Table(format!("Failed to write alignment row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AlignError::Table(format!("Failed to flush alignment: {e}")))?;
    info!(path = %path.display(), anchors = candidates.len(), "wrote local alignment");
    Ok(path)
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| AlignError::Table(format!("Failed to create {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoalign_core::CandidateAnchor;

    fn predictions() -> Vec<ScoredMapping> {
        vec![
            ScoredMapping::new("a", "x", 0.6),
            ScoredMapping::new("a", "y", 0.9),
            ScoredMapping::new("b", "x", 0.4),
            ScoredMapping::new("a", "z", 0.7),
        ]
    }

    #[test]
    fn dedup_keeps_exactly_one_max_row_per_source() {
        let deduped = dedup_by_max(&predictions());
        assert_eq!(
            deduped,
            vec![
                ScoredMapping::new("a", "y", 0.9),
                ScoredMapping::new("b", "x", 0.4),
            ]
        );
    }

    #[test]
    fn global_file_has_one_row_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_global(&predictions(), dir.path()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "SrcEntity\tTgtEntity\tScore");
        assert_eq!(lines[1], "a\ty\t0.9");
        assert_eq!(lines[2], "b\tx\t0.4");
    }

    #[test]
    fn fill_preserves_order_and_defaults_to_zero() {
        let candidates = CandidateSet::new(vec![CandidateAnchor {
            src: "a".into(),
            tgt: "x".into(),
            candidates: vec!["z".into(), "w".into(), "x".into()],
        }]);
        let filled = fill_anchored_scores(&candidates, &predictions());
        assert_eq!(filled.len(), 1);
        let (src, tgt, scored) = &filled[0];
        assert_eq!((src.as_str(), tgt.as_str()), ("a", "x"));
        assert_eq!(
            scored,
            &vec![
                ("z".to_string(), 0.7),
                ("w".to_string(), 0.0),
                ("x".to_string(), 0.6),
            ]
        );
    }
}
