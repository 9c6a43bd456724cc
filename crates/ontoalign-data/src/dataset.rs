//! The labeled feature table consumed by the trainer.

use std::path::{Path, PathBuf};

use tracing::debug;

use ontoalign_core::{AlignError, CandidateSet, MappingRow, Result};

use crate::literal;

/// Which partition of the table an accessor operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Inference,
}

/// One labeled row of the feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub src: String,
    pub tgt: String,
    pub features: Vec<f32>,
    pub label: f32,
    pub train: bool,
    pub inference: bool,
}

impl FeatureRow {
    fn matches(&self, partition: Partition) -> bool {
        match partition {
            Partition::Train => self.train,
            Partition::Inference => self.inference,
        }
    }
}

/// Ordered collection of feature rows with train/inference partitions and a
/// CSV cache on disk.
///
/// Feature-vector length is constant across rows and equals the matcher
/// count. The reference and candidate inputs that shaped the table ride
/// along so the trainer can dispatch between the supervised/unsupervised
/// paths and the global/local alignment writers.
#[derive(Debug, Clone, Default)]
pub struct TabularDataset {
    rows: Vec<FeatureRow>,
    reference: Option<Vec<MappingRow>>,
    candidates: Option<CandidateSet>,
    cache_path: Option<PathBuf>,
}

impl TabularDataset {
    pub fn new(
        rows: Vec<FeatureRow>,
        reference: Option<Vec<MappingRow>>,
        candidates: Option<CandidateSet>,
        cache_path: Option<PathBuf>,
    ) -> Self {
        Self {
            rows,
            reference,
            candidates,
            cache_path,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by absolute index. Out-of-range access is a contract violation.
    pub fn row(&self, index: usize) -> Result<&FeatureRow> {
        self.rows.get(index).ok_or(AlignError::DatasetIndex {
            index,
            len: self.rows.len(),
        })
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Rows of one partition, in table order.
    pub fn partition(&self, partition: Partition) -> Vec<&FeatureRow> {
        self.rows.iter().filter(|r| r.matches(partition)).collect()
    }

    /// Feature matrix of one partition.
    pub fn features(&self, partition: Partition) -> Vec<Vec<f32>> {
        self.rows
            .iter()
            .filter(|r| r.matches(partition))
            .map(|r| r.features.clone())
            .collect()
    }

    /// Label vector of one partition.
    pub fn labels(&self, partition: Partition) -> Vec<f32> {
        self.rows
            .iter()
            .filter(|r| r.matches(partition))
            .map(|r| r.label)
            .collect()
    }

    /// Feature-vector length, 0 for an empty table.
    pub fn feature_dim(&self) -> usize {
        self.rows.first().map(|r| r.features.len()).unwrap_or(0)
    }

    /// Whether the table was built from a reference (supervised case).
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn reference(&self) -> Option<&[MappingRow]> {
        self.reference.as_deref()
    }

    pub fn candidates(&self) -> Option<&CandidateSet> {
        self.candidates.as_ref()
    }

    // -----------------------------------------------------------------------
    // Cache persistence
    // -----------------------------------------------------------------------

    /// Whether a cache file exists at the configured path. Existence-only:
    /// the content is not fingerprinted against the inputs, so a stale cache
    /// from different inputs is honored silently.
    pub fn has_cache(path: &Path) -> bool {
        path.exists()
    }

    /// Serialize all rows to the cache file, feature vectors literal-encoded.
    pub fn save(&self) -> Result<PathBuf> {
        let path = self.cache_path.as_ref().ok_or_else(|| {
            AlignError::Table("Dataset has no cache path configured".to_string())
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| AlignError::Table(format!("Failed to create {}: {e}", path.display())))?;
        writer
            .write_record(["SrcEntity", "TgtEntity", "Labels", "Features", "train", "inference"])
            .map_err(|e| AlignError::Table(format!("Failed to write cache header: {e}")))?;
        for row in &self.rows {
            let record = [
                row.src.clone(),
                row.tgt.clone(),
                row.label.to_string(),
                literal::format_floats(&row.features),
                row.train.to_string(),
                row.inference.to_string(),
            ];
            writer
                .write_record(&record)
                .map_err(|e| AlignError::Table(format!("Failed to write cache row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AlignError::Table(format!("Failed to flush cache: {e}")))?;
        debug!(path = %path.display(), rows = self.rows.len(), "saved dataset cache");
        Ok(path.clone())
    }

    /// Load rows verbatim from a cache file written by [`TabularDataset::save`].
    pub fn load_rows(path: &Path) -> Result<Vec<FeatureRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| AlignError::Table(format!("Failed to open {}: {e}", path.display())))?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| AlignError::Table(format!("Bad cache record: {e}")))?;
            let parse_bool = |cell: Option<&str>| -> Result<bool> {
                match cell.map(str::trim) {
                    Some("true") | Some("True") => Ok(true),
                    Some("false") | Some("False") => Ok(false),
                    other => Err(AlignError::Table(format!(
                        "Bad boolean flag in cache: {other:?}"
                    ))),
                }
            };
            rows.push(FeatureRow {
                src: record.get(0).unwrap_or_default().to_string(),
                tgt: record.get(1).unwrap_or_default().to_string(),
                label: record
                    .get(2)
                    .unwrap_or_default()
                    .trim()
                    .parse::<f32>()
                    .map_err(|e| AlignError::Table(format!("Bad label in cache: {e}")))?,
                features: literal::parse_floats(record.get(3).unwrap_or("[]"))?,
                train: parse_bool(record.get(4))?,
                inference: parse_bool(record.get(5))?,
            });
        }
        debug!(path = %path.display(), rows = rows.len(), "loaded dataset cache");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<FeatureRow> {
        vec![
            FeatureRow {
                src: "a".into(),
                tgt: "x".into(),
                features: vec![0.9, 0.8],
                label: 1.0,
                train: true,
                inference: false,
            },
            FeatureRow {
                src: "b".into(),
                tgt: "y".into(),
                features: vec![0.1, 0.2],
                label: 0.0,
                train: false,
                inference: true,
            },
        ]
    }

    #[test]
    fn partition_accessors_filter_rows() {
        let ds = TabularDataset::new(sample_rows(), None, None, None);
        assert_eq!(ds.features(Partition::Train).len(), 1);
        assert_eq!(ds.labels(Partition::Inference), vec![0.0]);
        assert_eq!(ds.feature_dim(), 2);
    }

    #[test]
    fn out_of_range_row_is_an_error() {
        let ds = TabularDataset::new(sample_rows(), None, None, None);
        assert!(ds.row(1).is_ok());
        assert!(matches!(
            ds.row(2),
            Err(AlignError::DatasetIndex { index: 2, len: 2 })
        ));
    }

    #[test]
    fn cache_round_trip_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("dataset.csv");
        let ds = TabularDataset::new(sample_rows(), None, None, Some(cache.clone()));

        let saved = ds.save().unwrap();
        assert!(TabularDataset::has_cache(&saved));

        let loaded = TabularDataset::load_rows(&saved).unwrap();
        assert_eq!(loaded, sample_rows());
    }
}
