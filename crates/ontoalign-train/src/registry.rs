//! Name registries for models, losses and optimizers.
//!
//! Configuration carries these choices as names plus parameters; the
//! registries resolve them eagerly so an unrecognized name fails at
//! configuration-resolution time, before the matching engine is launched.

use candle_core::Var;
use candle_nn::{Optimizer, VarBuilder};

use ontoalign_core::{AlignConfig, AlignError, LossSpec, ModelSpec, OptimizerSpec, Result};

use crate::loss::Loss;
use crate::model::MlpClassifier;
use crate::optim::TrainOptimizer;

/// Registered model names.
pub const MODELS: &[&str] = &["mlp"];
/// Registered loss names.
pub const LOSSES: &[&str] = &["bce", "bce_weighted", "bce_with_logits"];
/// Registered optimizer names.
pub const OPTIMIZERS: &[&str] = &["sgd", "adamw"];

/// Check every registry name in `config` without building anything.
pub fn validate(config: &AlignConfig) -> Result<()> {
    known(MODELS, &config.model.name, "model")?;
    known(LOSSES, &config.loss.name, "loss")?;
    known(OPTIMIZERS, &config.optimizer.name, "optimizer")?;
    Ok(())
}

fn known(registry: &[&str], name: &str, kind: &str) -> Result<()> {
    if registry.contains(&name) {
        Ok(())
    } else {
        Err(AlignError::Configuration(format!(
            "Unknown {kind} {name:?}, expected one of {registry:?}"
        )))
    }
}

/// Build the configured model under `vb`.
pub fn build_model(
    spec: &ModelSpec,
    vb: VarBuilder,
    input_dim: usize,
    n_classes: usize,
) -> Result<MlpClassifier> {
    match spec.name.as_str() {
        "mlp" => MlpClassifier::new(vb, input_dim, &spec.layers, n_classes),
        other => Err(AlignError::Configuration(format!(
            "Unknown model {other:?}, expected one of {MODELS:?}"
        ))),
    }
}

/// Resolve the configured loss.
pub fn build_loss(spec: &LossSpec) -> Result<Loss> {
    match spec.name.as_str() {
        "bce" => Ok(Loss::Bce),
        "bce_weighted" => Ok(Loss::BceWeighted {
            pos_weight: spec.pos_weight.unwrap_or(1.0),
        }),
        "bce_with_logits" => Ok(Loss::BceWithLogits),
        other => Err(AlignError::Configuration(format!(
            "Unknown loss {other:?}, expected one of {LOSSES:?}"
        ))),
    }
}

/// Build the configured optimizer over `vars`.
pub fn build_optimizer(spec: &OptimizerSpec, vars: Vec<Var>) -> Result<TrainOptimizer> {
    match spec.name.as_str() {
        "sgd" => candle_nn::SGD::new(vars, spec.lr)
            .map(TrainOptimizer::Sgd)
            .map_err(|e| AlignError::Model(format!("Failed to create SGD: {e}"))),
        "adamw" => candle_nn::AdamW::new(
            vars,
            candle_nn::ParamsAdamW {
                lr: spec.lr,
                weight_decay: spec.weight_decay,
                ..Default::default()
            },
        )
        .map(TrainOptimizer::AdamW)
        .map_err(|e| AlignError::Model(format!("Failed to create AdamW: {e}"))),
        other => Err(AlignError::Configuration(format!(
            "Unknown optimizer {other:?}, expected one of {OPTIMIZERS:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate(&AlignConfig::default()).is_ok());
    }

    #[test]
    fn unknown_names_fail_validation() {
        let mut config = AlignConfig::default();
        config.model.name = "transformer".to_string();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, AlignError::Configuration(_)));
        assert!(err.to_string().contains("transformer"));

        let mut config = AlignConfig::default();
        config.loss.name = "hinge".to_string();
        assert!(validate(&config).is_err());

        let mut config = AlignConfig::default();
        config.optimizer.name = "lbfgs".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn loss_resolution_applies_parameters() {
        let loss = build_loss(&LossSpec {
            name: "bce_weighted".to_string(),
            pos_weight: Some(2.5),
        })
        .unwrap();
        assert_eq!(loss, Loss::BceWeighted { pos_weight: 2.5 });
    }
}
