//! Optimizer wrapper dispatching between the supported candle optimizers.

use candle_core::Tensor;
use candle_nn::Optimizer;

use ontoalign_core::{AlignError, Result};

/// A resolved optimizer over the model's trainable variables.
pub enum TrainOptimizer {
    Sgd(candle_nn::SGD),
    AdamW(candle_nn::AdamW),
}

impl TrainOptimizer {
    /// Backpropagate `loss` and apply one update step.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            TrainOptimizer::Sgd(opt) => opt.backward_step(loss),
            TrainOptimizer::AdamW(opt) => opt.backward_step(loss),
        }
        .map_err(|e| AlignError::Model(format!("Optimizer step failed: {e}")))
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            TrainOptimizer::Sgd(opt) => opt.learning_rate(),
            TrainOptimizer::AdamW(opt) => opt.learning_rate(),
        }
    }
}
