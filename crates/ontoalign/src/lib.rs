//! Ontology alignment pipeline
//!
//! Wires the stages into the documented data flow: the engine driver
//! produces a score table, the dataset builder turns it (plus optional
//! reference and candidate files) into a labeled feature table, and the
//! trainer fits a classifier and extracts the final alignment.
//!
//! Every stage checks for its expected on-disk artifact and skips
//! recomputation when it exists. The checks carry no locking, so exactly
//! one run may use a given output directory at a time; concurrent runs
//! against the same directory can race or corrupt cache files.

use std::path::PathBuf;

use tracing::info;

use ontoalign_data::{DatasetBuilder, RandomNegativeSampler};
use ontoalign_engine::{EngineConfig, EnginePaths, MatchingEngine};
use ontoalign_train::{registry, MlpTrainer};

pub use ontoalign_core::{
    AlignConfig, AlignError, CandidateAnchor, CandidateSet, MappingRow, Result, ScoreTable,
    ScoredMapping,
};

/// Where the external matching engine is installed.
#[derive(Debug, Clone)]
pub struct EngineLocation {
    /// The engine's install directory (its working directory at runtime).
    pub install_dir: PathBuf,
    /// Path to the engine jar.
    pub jar_path: PathBuf,
    /// Path to the JVM launcher.
    pub java_path: PathBuf,
}

/// Runs the full alignment for one ontology pair.
///
/// With a reference file the classifier is trained (supervised case);
/// without one the raw matcher scores decide (unsupervised case). With a
/// candidates file the output is a local (ranking) alignment; without one
/// it is a global alignment.
pub struct AlignmentRunner {
    source: PathBuf,
    target: PathBuf,
    output_dir: PathBuf,
    engine: EngineLocation,
    reference: Option<PathBuf>,
    candidates: Option<PathBuf>,
    config: AlignConfig,
}

impl AlignmentRunner {
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        engine: EngineLocation,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            output_dir: output_dir.into(),
            engine,
            reference: None,
            candidates: None,
            config: AlignConfig::default(),
        }
    }

    /// Supply a reference mapping file (switches to the supervised case).
    pub fn with_reference(mut self, reference: impl Into<PathBuf>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Supply a candidates file (switches to local/ranking alignment).
    pub fn with_candidates(mut self, candidates: impl Into<PathBuf>) -> Self {
        self.candidates = Some(candidates.into());
        self
    }

    pub fn with_config(mut self, config: AlignConfig) -> Self {
        self.config = config;
        self
    }

    /// Check that every input file exists and create the output directory.
    pub fn validate_files(&self) -> Result<()> {
        for (path, what) in [
            (Some(self.source.as_path()), "source ontology"),
            (Some(self.target.as_path()), "target ontology"),
            (self.reference.as_deref(), "reference"),
            (self.candidates.as_deref(), "candidates"),
        ] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(AlignError::Configuration(format!(
                        "{what} file {} does not exist",
                        path.display()
                    )));
                }
            }
        }
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Run the pipeline end to end and return the alignment file path.
    pub fn run(&self) -> Result<PathBuf> {
        self.validate_files()?;
        // resolve registry names before anything is launched
        registry::validate(&self.config)?;

        let scores = self.compute_scores()?;

        let sampler = RandomNegativeSampler::new(self.config.number_of_negatives, self.config.seed);
        let builder = DatasetBuilder::new(
            Some(Box::new(sampler)),
            self.config.seed,
            self.config.cache_ok,
        );
        let cache = self.output_dir.join("dataset.csv");
        let dataset = builder.process(
            &scores,
            self.reference.as_deref(),
            self.candidates.as_deref(),
            Some(cache.as_path()),
        )?;
        info!(rows = dataset.len(), "feature table ready");

        let mut trainer = MlpTrainer::new(dataset, &self.config, &self.output_dir)?;
        if self.reference.is_some() {
            let training = &self.config.training;
            trainer.train(training.epochs, training.batch_size, training.save_interval)?;
        }

        let predictions = trainer.predict(self.config.threshold)?;
        let alignment = trainer.save_alignment(&predictions)?;
        info!(alignment = %alignment.display(), "alignment written");
        Ok(alignment)
    }

    fn compute_scores(&self) -> Result<PathBuf> {
        let engine = MatchingEngine::new(EngineConfig {
            install_dir: self.engine.install_dir.clone(),
            jar_path: self.engine.jar_path.clone(),
            java_path: self.engine.java_path.clone(),
            max_heap: self.config.engine.max_heap.clone(),
            matchers: self.config.engine.matchers.clone(),
            threshold: self.config.engine.threshold,
            cardinality: self.config.engine.cardinality,
            cache_ok: self.config.cache_ok,
        });

        let mut paths = EnginePaths::new(&self.output_dir);
        if let Some(candidates) = &self.candidates {
            paths.candidates = candidates.clone();
        }
        engine.compute_scores(
            &self.source,
            &self.target,
            self.reference.as_deref(),
            &paths,
        )
    }
}
