//! Loss functions over mapping probabilities.

use candle_core::Tensor;

use ontoalign_core::{AlignError, Result};

/// Clamp bound keeping `ln` finite at probability 0 and 1.
const EPS: f64 = 1e-7;

/// Resolved loss function.
#[derive(Debug, Clone, PartialEq)]
pub enum Loss {
    /// Binary cross-entropy on probabilities.
    Bce,
    /// Binary cross-entropy with a weight applied to positive samples.
    BceWeighted { pos_weight: f64 },
    /// Binary cross-entropy on logits.
    BceWithLogits,
}

impl Loss {
    /// Mean loss of `preds` against binary `targets` (both `[n, 1]`).
    pub fn compute(&self, preds: &Tensor, targets: &Tensor) -> Result<Tensor> {
        match self {
            Loss::Bce => {
                let per_sample = bce_per_sample(preds, targets)?;
                per_sample
                    .mean_all()
                    .map_err(|e| AlignError::Model(format!("BCE reduction failed: {e}")))
            }
            Loss::BceWeighted { pos_weight } => {
                let per_sample = bce_per_sample(preds, targets)?;
                // weights: pos_weight where target is 1, 1 where target is 0
                let weights = targets
                    .affine(pos_weight - 1.0, 1.0)
                    .map_err(|e| AlignError::Model(format!("BCE weighting failed: {e}")))?;
                per_sample
                    .mul(&weights)
                    .and_then(|t| t.mean_all())
                    .map_err(|e| AlignError::Model(format!("Weighted BCE failed: {e}")))
            }
            Loss::BceWithLogits => candle_nn::loss::binary_cross_entropy_with_logit(preds, targets)
                .map_err(|e| AlignError::Model(format!("BCE-with-logits failed: {e}"))),
        }
    }
}

/// Elementwise `-(y ln p + (1-y) ln(1-p))` with clamped probabilities.
fn bce_per_sample(preds: &Tensor, targets: &Tensor) -> Result<Tensor> {
    let inner = || -> candle_core::Result<Tensor> {
        let p = preds.clamp(EPS, 1.0 - EPS)?;
        let ln_p = p.log()?;
        let ln_q = p.affine(-1.0, 1.0)?.log()?;
        let one_minus_y = targets.affine(-1.0, 1.0)?;
        targets
            .mul(&ln_p)?
            .add(&one_minus_y.mul(&ln_q)?)?
            .neg()
    };
    inner().map_err(|e| AlignError::Model(format!("BCE failed: {e}")))
}
