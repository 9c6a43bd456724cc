//! Top-level engine run: cache check, step sequencing, artifact checks.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use ontoalign_core::{AlignError, Result};

use crate::session::EngineSession;

/// Where the engine lives and how to run it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The engine's install directory; the process runs with this as its
    /// working directory.
    pub install_dir: PathBuf,
    /// Path to the engine jar.
    pub jar_path: PathBuf,
    /// Path to the JVM launcher.
    pub java_path: PathBuf,
    /// Maximum heap size, e.g. `"8g"`.
    pub max_heap: String,
    /// Matchers to compute, one score column each.
    pub matchers: Vec<String>,
    /// Similarity threshold for the `Match` step.
    pub threshold: f64,
    /// Negatives per source for the `Negatives` step.
    pub cardinality: usize,
    /// Honor pre-existing candidates/scores files instead of recomputing.
    pub cache_ok: bool,
}

/// On-disk artifacts of one engine run.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    pub candidates: PathBuf,
    pub negatives: PathBuf,
    pub pairs: PathBuf,
    pub scores: PathBuf,
    pub log: PathBuf,
}

impl EnginePaths {
    /// Default layout under an output directory.
    pub fn new(output_dir: &Path) -> Self {
        Self {
            candidates: output_dir.join("candidates.tsv"),
            negatives: output_dir.join("negatives.tsv"),
            pairs: output_dir.join("pairs.tsv"),
            scores: output_dir.join("scores.tsv"),
            log: output_dir.join("engine.log"),
        }
    }
}

/// Runs one engine process per ontology pair and produces the score table.
pub struct MatchingEngine {
    config: EngineConfig,
}

impl MatchingEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a finished score table already exists for these paths.
    pub fn has_cache(&self, paths: &EnginePaths) -> bool {
        self.config.cache_ok && paths.scores.is_file()
    }

    /// Compute matcher scores for an ontology pair.
    ///
    /// Short-circuits entirely on a cached score table. Otherwise drives
    /// the protocol: select matchers, match (unless a candidates file is
    /// already present), generate negatives (when a reference is supplied),
    /// assemble the pairs file, and score it. Each artifact-producing step
    /// is followed by an existence check.
    pub fn compute_scores(
        &self,
        source: &Path,
        target: &Path,
        reference: Option<&Path>,
        paths: &EnginePaths,
    ) -> Result<PathBuf> {
        if self.has_cache(paths) {
            info!(scores = %paths.scores.display(), "score table cached, skipping engine run");
            return Ok(paths.scores.clone());
        }
        if let Some(parent) = paths.scores.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            source = %source.display(),
            target = %target.display(),
            "launching matching engine"
        );
        let mut session = EngineSession::spawn(&self.config, source, target, &paths.log)?;

        session.set_matchers(&self.config.matchers)?;

        if paths.candidates.is_file() {
            debug!(candidates = %paths.candidates.display(), "candidates cached, skipping Match");
        } else {
            session.match_ontologies(self.config.threshold, &paths.candidates)?;
        }
        require_artifact(&paths.candidates)?;

        if let Some(reference) = reference {
            session.generate_negatives(reference, &paths.negatives, self.config.cardinality)?;
            require_artifact(&paths.negatives)?;
        }

        assemble_pairs(
            &paths.candidates,
            reference,
            reference.map(|_| paths.negatives.as_path()),
            &paths.pairs,
        )?;

        session.score_pairs(&paths.pairs, &paths.scores)?;
        require_artifact(&paths.scores)?;

        Ok(paths.scores.clone())
    }
}

fn require_artifact(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AlignError::MissingArtifact {
            path: path.to_path_buf(),
        })
    }
}

/// Concatenate candidates + reference + negatives into one pairs file for
/// the `Score` step, stripping the header rows of reference and negatives.
fn assemble_pairs(
    candidates: &Path,
    reference: Option<&Path>,
    negatives: Option<&Path>,
    pairs: &Path,
) -> Result<()> {
    let mut out = std::fs::File::create(pairs)?;

    for line in BufReader::new(std::fs::File::open(candidates)?).lines() {
        writeln!(out, "{}", line?)?;
    }
    for path in [reference, negatives].into_iter().flatten() {
        for line in BufReader::new(std::fs::File::open(path)?).lines().skip(1) {
            writeln!(out, "{}", line?)?;
        }
    }
    out.flush()?;
    Ok(())
}
