//! Configuration structures for the alignment pipeline.
//!
//! These are the typed objects the (out-of-scope) CLI/YAML layer produces.
//! Model, loss and optimizer choices are carried as names plus parameters;
//! they resolve against explicit registries in the trainer crate, which
//! reject unknown names before any external process is launched.

use serde::{Deserialize, Serialize};

/// Parameters for the external matching-engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// JVM maximum heap size, e.g. `"8g"`.
    pub max_heap: String,
    /// Matcher names, one score column each.
    pub matchers: Vec<String>,
    /// Similarity threshold passed to the engine's `Match` step.
    pub threshold: f64,
    /// Negatives-per-source cardinality passed to the `Negatives` step.
    pub cardinality: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            max_heap: "8g".to_string(),
            matchers: vec![
                "LM".to_string(),
                "WM".to_string(),
                "SM".to_string(),
                "BKM".to_string(),
                "LLMM".to_string(),
            ],
            threshold: 0.1,
            cardinality: 20,
        }
    }
}

/// Training-loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Number of epochs to train for.
    pub epochs: usize,
    /// Mini-batch size; `None` trains full-batch.
    pub batch_size: Option<usize>,
    /// Checkpoint every this many epochs.
    pub save_interval: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: Some(32),
            save_interval: 5,
        }
    }
}

/// Classifier model choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Registry name, e.g. `"mlp"`.
    pub name: String,
    /// Hidden-layer sizes, input to output.
    pub layers: Vec<usize>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: "mlp".to_string(),
            layers: vec![128, 64],
        }
    }
}

/// Loss function choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossSpec {
    /// Registry name: `"bce"`, `"bce_weighted"` or `"bce_with_logits"`.
    pub name: String,
    /// Positive-class weight for `bce_weighted`.
    pub pos_weight: Option<f64>,
}

impl Default for LossSpec {
    fn default() -> Self {
        Self {
            name: "bce".to_string(),
            pos_weight: None,
        }
    }
}

/// Optimizer choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSpec {
    /// Registry name: `"sgd"` or `"adamw"`.
    pub name: String,
    /// Learning rate.
    pub lr: f64,
    /// Weight decay (`adamw` only).
    pub weight_decay: f64,
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self {
            name: "adamw".to_string(),
            lr: 1e-3,
            weight_decay: 1e-4,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Prediction-probability threshold for keeping a mapping candidate.
    pub threshold: f64,
    /// Negatives sampled per reference source.
    pub number_of_negatives: usize,
    /// Seed for every stochastic step in the pipeline.
    pub seed: u64,
    /// Resume training from the most recent checkpoint if one exists.
    pub use_last_checkpoint: bool,
    /// Honor existing on-disk artifacts instead of recomputing.
    pub cache_ok: bool,
    pub engine: EngineParams,
    pub training: TrainingParams,
    pub model: ModelSpec,
    pub loss: LossSpec,
    pub optimizer: OptimizerSpec,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            number_of_negatives: 5,
            seed: 42,
            use_last_checkpoint: false,
            cache_ok: true,
            engine: EngineParams::default(),
            training: TrainingParams::default(),
            model: ModelSpec::default(),
            loss: LossSpec::default(),
            optimizer: OptimizerSpec::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_consistent() {
        let cfg = AlignConfig::default();
        assert_eq!(cfg.engine.matchers.len(), 5);
        assert!(cfg.threshold > 0.0 && cfg.threshold <= 1.0);
        assert!(cfg.training.save_interval > 0);
    }
}
