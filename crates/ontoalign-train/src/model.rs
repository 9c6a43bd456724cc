//! The MLP mapping classifier.
//!
//! # Architecture
//!
//! ```text
//! Input (matchers) → [Linear(h) → ReLU]* → Linear(n_classes) → Sigmoid
//! ```
//!
//! Hidden-layer sizes come from configuration; the input width equals the
//! matcher count and the output is a single mapping probability.

use candle_core::Tensor;
use candle_nn::{Module, VarBuilder};

use ontoalign_core::{AlignError, Result};

/// Fully-connected mapping classifier with sigmoid output.
pub struct MlpClassifier {
    hidden: Vec<candle_nn::Linear>,
    classify: candle_nn::Linear,
}

impl MlpClassifier {
    /// Build the classifier under `vb`, with `input_dim` inputs, the given
    /// hidden-layer sizes, and `n_classes` outputs.
    pub fn new(
        vb: VarBuilder,
        input_dim: usize,
        hidden_layers: &[usize],
        n_classes: usize,
    ) -> Result<Self> {
        let mut dims = vec![input_dim];
        dims.extend_from_slice(hidden_layers);

        let mut hidden = Vec::with_capacity(hidden_layers.len());
        for (i, pair) in dims.windows(2).enumerate() {
            let layer = candle_nn::linear(pair[0], pair[1], vb.pp(format!("fc{i}")))
                .map_err(|e| AlignError::Model(format!("Failed to create layer fc{i}: {e}")))?;
            hidden.push(layer);
        }
        let last = *dims.last().unwrap_or(&input_dim);
        let classify = candle_nn::linear(last, n_classes, vb.pp("classify"))
            .map_err(|e| AlignError::Model(format!("Failed to create output layer: {e}")))?;

        Ok(Self { hidden, classify })
    }

    /// Forward pass: `[n, input_dim]` features to `[n, n_classes]` mapping
    /// probabilities.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for (i, layer) in self.hidden.iter().enumerate() {
            xs = layer
                .forward(&xs)
                .and_then(|t| t.relu())
                .map_err(|e| AlignError::Model(format!("Layer fc{i} forward failed: {e}")))?;
        }
        let logits = self
            .classify
            .forward(&xs)
            .map_err(|e| AlignError::Model(format!("Output layer forward failed: {e}")))?;
        candle_nn::ops::sigmoid(&logits)
            .map_err(|e| AlignError::Model(format!("Sigmoid failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn forward_outputs_probabilities() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = MlpClassifier::new(vb, 5, &[8, 4], 1).unwrap();

        let xs = Tensor::zeros((3, 5), DType::F32, &device).unwrap();
        let probs = model.forward(&xs).unwrap();
        assert_eq!(probs.dims(), &[3, 1]);

        let values: Vec<f32> = probs.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn no_hidden_layers_is_a_single_linear_head() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = MlpClassifier::new(vb, 5, &[], 1).unwrap();

        let xs = Tensor::ones((2, 5), DType::F32, &device).unwrap();
        assert_eq!(model.forward(&xs).unwrap().dims(), &[2, 1]);
    }
}
