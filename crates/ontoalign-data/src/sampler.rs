//! Negative sampling over reference mappings.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use ontoalign_core::MappingRow;

/// Produces negative (source, target) pairs from reference positives.
pub trait NegativeSampler {
    /// Given the reference's parallel source/target columns and the full
    /// target universe to draw from, return negative rows with label 0.0.
    fn sample(&self, sources: &[String], targets: &[String], universe: &[String])
        -> Vec<MappingRow>;
}

/// Uniform random sampler without replacement, deterministic given its seed.
///
/// For each source with true target `t`, candidate negatives are the
/// distinct targets of the universe excluding `t`. When fewer than
/// `n_samples + 1` distinct targets exist there is nothing to sample from,
/// so the full candidate set is emitted instead.
#[derive(Debug, Clone)]
pub struct RandomNegativeSampler {
    n_samples: usize,
    seed: u64,
}

impl RandomNegativeSampler {
    pub fn new(n_samples: usize, seed: u64) -> Self {
        Self { n_samples, seed }
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
}

impl NegativeSampler for RandomNegativeSampler {
    fn sample(
        &self,
        sources: &[String],
        targets: &[String],
        universe: &[String],
    ) -> Vec<MappingRow> {
        let mut distinct: Vec<&String> = Vec::new();
        for tgt in universe {
            if !distinct.contains(&tgt) {
                distinct.push(tgt);
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut rows = Vec::new();

        for (src, true_tgt) in sources.iter().zip(targets.iter()) {
            let candidates: Vec<&String> =
                distinct.iter().filter(|t| **t != true_tgt).copied().collect();

            if distinct.len() < self.n_samples + 1 {
                for cand in &candidates {
                    rows.push(MappingRow::new(src.clone(), (*cand).clone(), 0.0));
                }
            } else {
                for cand in candidates.choose_multiple(&mut rng, self.n_samples) {
                    rows.push(MappingRow::new(src.clone(), (*cand).clone(), 0.0));
                }
            }
        }
        rows
    }
}
