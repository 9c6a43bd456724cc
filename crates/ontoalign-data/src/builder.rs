//! Dataset assembly: score table + reference + candidates -> feature table.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use ontoalign_core::{AlignError, CandidateSet, MappingRow, Result, ScoreTable};

use crate::dataset::{FeatureRow, TabularDataset};
use crate::sampler::NegativeSampler;
use crate::table;

/// Upper bound (exclusive) of the placeholder feature range for pairs the
/// engine produced no scores for. Matcher coverage gaps are expected, not
/// an error.
const MISSING_FEATURE_HIGH: f32 = 0.4;

/// Builds the labeled feature table and owns its disk cache.
pub struct DatasetBuilder {
    sampler: Option<Box<dyn NegativeSampler>>,
    seed: u64,
    cache_ok: bool,
}

impl DatasetBuilder {
    pub fn new(sampler: Option<Box<dyn NegativeSampler>>, seed: u64, cache_ok: bool) -> Self {
        Self {
            sampler,
            seed,
            cache_ok,
        }
    }

    /// Produce the feature table for one ontology pair.
    ///
    /// Loads the cache file verbatim when it exists (existence-only check);
    /// otherwise builds the table from the inputs and, if a cache path is
    /// given, persists it.
    pub fn process(
        &self,
        scores_file: &Path,
        reference_file: Option<&Path>,
        candidates_file: Option<&Path>,
        cache_file: Option<&Path>,
    ) -> Result<TabularDataset> {
        let reference = reference_file.map(table::read_mappings).transpose()?;
        let candidates = candidates_file.map(table::read_candidates).transpose()?;

        if reference.is_some() && self.sampler.is_none() {
            return Err(AlignError::MissingDependency(
                "a reference mapping was supplied but no negative sampler is configured"
                    .to_string(),
            ));
        }

        if let Some(cache) = cache_file {
            if self.cache_ok && TabularDataset::has_cache(cache) {
                info!(cache = %cache.display(), "dataset cache hit, skipping assembly");
                let rows = TabularDataset::load_rows(cache)?;
                return Ok(TabularDataset::new(
                    rows,
                    reference,
                    candidates,
                    Some(cache.to_path_buf()),
                ));
            }
        }

        let scores = table::read_score_table(scores_file)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut rows = Vec::new();

        if let Some(refs) = &reference {
            let sampler = self.sampler.as_deref().ok_or_else(|| {
                AlignError::MissingDependency("no negative sampler configured".to_string())
            })?;
            rows.extend(self.training_rows(refs, sampler, &scores, &mut rng));
        }
        rows.extend(self.inference_rows(
            reference.as_deref(),
            candidates.as_ref(),
            &scores,
            &mut rng,
        ));

        let dataset = TabularDataset::new(
            rows,
            reference,
            candidates,
            cache_file.map(Path::to_path_buf),
        );
        if cache_file.is_some() {
            dataset.save()?;
        }
        Ok(dataset)
    }

    /// Reference positives plus sampled negatives, shuffled.
    fn training_rows(
        &self,
        refs: &[MappingRow],
        sampler: &dyn NegativeSampler,
        scores: &ScoreTable,
        rng: &mut ChaCha8Rng,
    ) -> Vec<FeatureRow> {
        let sources: Vec<String> = refs.iter().map(|r| r.src.clone()).collect();
        let targets: Vec<String> = refs.iter().map(|r| r.tgt.clone()).collect();
        let universe = target_universe(scores, &targets);

        let negatives = sampler.sample(&sources, &targets, &universe);
        debug!(
            positives = refs.len(),
            negatives = negatives.len(),
            "assembled training pairs"
        );

        let mut rows: Vec<FeatureRow> = refs
            .iter()
            .chain(negatives.iter())
            .map(|m| FeatureRow {
                src: m.src.clone(),
                tgt: m.tgt.clone(),
                features: self.lookup_features(scores, &m.src, &m.tgt, rng),
                label: m.label as f32,
                train: true,
                inference: false,
            })
            .collect();
        rows.shuffle(rng);
        rows
    }

    /// Candidate pairs in local mode, otherwise every scored pair for
    /// sources the reference does not cover.
    fn inference_rows(
        &self,
        reference: Option<&[MappingRow]>,
        candidates: Option<&CandidateSet>,
        scores: &ScoreTable,
        rng: &mut ChaCha8Rng,
    ) -> Vec<FeatureRow> {
        let pairs: Vec<(String, String)> = if let Some(cands) = candidates {
            cands
                .anchors()
                .iter()
                .flat_map(|anchor| {
                    anchor
                        .candidates
                        .iter()
                        .map(|c| (anchor.src.clone(), c.clone()))
                })
                .collect()
        } else {
            let covered: Vec<&str> = reference
                .map(|refs| refs.iter().map(|r| r.src.as_str()).collect())
                .unwrap_or_default();
            scores
                .sources()
                .iter()
                .filter(|src| !covered.contains(&src.as_str()))
                .flat_map(|src| {
                    scores
                        .targets_of(src)
                        .iter()
                        .map(|tgt| (src.clone(), tgt.clone()))
                })
                .collect()
        };

        pairs
            .into_iter()
            .map(|(src, tgt)| {
                let features = self.lookup_features(scores, &src, &tgt, rng);
                FeatureRow {
                    src,
                    tgt,
                    features,
                    label: 0.0,
                    train: false,
                    inference: true,
                }
            })
            .collect()
    }

    /// Score-table lookup with a bounded-random placeholder for pairs the
    /// engine did not score.
    fn lookup_features(
        &self,
        scores: &ScoreTable,
        src: &str,
        tgt: &str,
        rng: &mut ChaCha8Rng,
    ) -> Vec<f32> {
        match scores.get(src, tgt) {
            Some(features) => features.to_vec(),
            None => (0..scores.feature_dim())
                .map(|_| rng.gen_range(0.0..MISSING_FEATURE_HIGH))
                .collect(),
        }
    }
}

/// Distinct targets the sampler may draw from: every target the engine
/// scored, plus reference targets it may have missed.
fn target_universe(scores: &ScoreTable, reference_targets: &[String]) -> Vec<String> {
    let mut universe: Vec<String> = Vec::new();
    for src in scores.sources() {
        for tgt in scores.targets_of(src) {
            if !universe.contains(tgt) {
                universe.push(tgt.clone());
            }
        }
    }
    for tgt in reference_targets {
        if !universe.contains(tgt) {
            universe.push(tgt.clone());
        }
    }
    universe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Partition;
    use crate::sampler::RandomNegativeSampler;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn scores_2x2(dir: &tempfile::TempDir) -> PathBuf {
        write_file(
            dir,
            "scores.tsv",
            "Src\tTgt\tLM\tWM\n\
             a\tx\t0.9\t0.8\n\
             a\ty\t0.1\t0.2\n\
             b\tx\t0.3\t0.1\n\
             b\ty\t0.7\t0.6\n",
        )
    }

    fn builder(n_negatives: usize) -> DatasetBuilder {
        DatasetBuilder::new(
            Some(Box::new(RandomNegativeSampler::new(n_negatives, 42))),
            42,
            true,
        )
    }

    #[test]
    fn reference_without_sampler_is_missing_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let scores = scores_2x2(&dir);
        let refs = write_file(&dir, "refs.tsv", "Src\tTgt\tLabel\na\tx\t1.0\n");

        let b = DatasetBuilder::new(None, 42, true);
        let err = b.process(&scores, Some(refs.as_path()), None, None).unwrap_err();
        assert!(matches!(err, AlignError::MissingDependency(_)));
    }

    #[test]
    fn unsupervised_table_is_inference_only() {
        let dir = tempfile::tempdir().unwrap();
        let scores = scores_2x2(&dir);

        let ds = builder(1).process(&scores, None, None, None).unwrap();
        assert_eq!(ds.len(), 4);
        assert!(ds.rows().iter().all(|r| r.inference && !r.train));
        assert!(!ds.has_reference());
    }

    #[test]
    fn supervised_table_matches_the_worked_example() {
        // 2 sources {a,b}, 2 targets {x,y}, reference [(a,x)], n_samples=1:
        // one positive, one negative (a,y), inference rows for b only.
        let dir = tempfile::tempdir().unwrap();
        let scores = scores_2x2(&dir);
        let refs = write_file(&dir, "refs.tsv", "Src\tTgt\tLabel\na\tx\t1.0\n");

        let ds = builder(1).process(&scores, Some(refs.as_path()), None, None).unwrap();

        let train: Vec<&FeatureRow> = ds.partition(Partition::Train);
        assert_eq!(train.len(), 2);
        let positive = train.iter().find(|r| r.label == 1.0).unwrap();
        assert_eq!((positive.src.as_str(), positive.tgt.as_str()), ("a", "x"));
        let negative = train.iter().find(|r| r.label == 0.0).unwrap();
        assert_eq!((negative.src.as_str(), negative.tgt.as_str()), ("a", "y"));

        let inference: Vec<&FeatureRow> = ds.partition(Partition::Inference);
        assert_eq!(inference.len(), 2);
        assert!(inference.iter().all(|r| r.src == "b"));
        // scored pairs keep their engine features
        assert_eq!(positive.features, vec![0.9, 0.8]);
    }

    #[test]
    fn candidates_drive_inference_pairs_in_local_mode() {
        let dir = tempfile::tempdir().unwrap();
        let scores = scores_2x2(&dir);
        let cands = write_file(
            &dir,
            "cands.tsv",
            "Src\tTgt\tCandidates\na\tx\t['y', 'x']\n",
        );

        let ds = builder(1)
            .process(&scores, None, Some(cands.as_path()), None)
            .unwrap();
        let inference = ds.partition(Partition::Inference);
        let pairs: Vec<(&str, &str)> = inference
            .iter()
            .map(|r| (r.src.as_str(), r.tgt.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "y"), ("a", "x")]);
    }

    #[test]
    fn missing_pairs_get_bounded_placeholder_features() {
        let dir = tempfile::tempdir().unwrap();
        let scores = scores_2x2(&dir);
        let cands = write_file(&dir, "cands.tsv", "Src\tTgt\tCandidates\na\tx\t['z']\n");

        let ds = builder(1)
            .process(&scores, None, Some(cands.as_path()), None)
            .unwrap();
        let row = &ds.partition(Partition::Inference)[0];
        assert_eq!(row.features.len(), 2);
        assert!(row.features.iter().all(|&v| (0.0..0.4).contains(&v)));
    }

    #[test]
    fn cache_is_loaded_instead_of_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        let scores = scores_2x2(&dir);
        let cache = dir.path().join("dataset.csv");

        let first = builder(1)
            .process(&scores, None, None, Some(cache.as_path()))
            .unwrap();
        assert!(cache.exists());

        // mutate the cache so a reload is observable
        let mut content = std::fs::read_to_string(&cache).unwrap();
        content = content.replacen("0.9", "0.55", 1);
        std::fs::write(&cache, content).unwrap();

        let second = builder(1)
            .process(&scores, None, None, Some(cache.as_path()))
            .unwrap();
        assert_eq!(second.len(), first.len());
        assert!(second
            .rows()
            .iter()
            .any(|r| r.features.contains(&0.55_f32)));
    }

    #[test]
    fn build_is_deterministic_given_seed() {
        let dir = tempfile::tempdir().unwrap();
        let scores = scores_2x2(&dir);
        let refs = write_file(&dir, "refs.tsv", "Src\tTgt\tLabel\na\tx\t1.0\nb\ty\t1.0\n");

        let a = builder(1).process(&scores, Some(refs.as_path()), None, None).unwrap();
        let b = builder(1).process(&scores, Some(refs.as_path()), None, None).unwrap();
        assert_eq!(a.rows(), b.rows());
    }
}
