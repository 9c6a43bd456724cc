//! Training checkpoints: weights in safetensors, the rest in a JSON sidecar.
//!
//! Files are named by zero-padded epoch (`0005.safetensors` + `0005.json`);
//! "most recent" means highest numeric stem. The stored loss is an opaque
//! snapshot for display, not something training arithmetic depends on.

use std::path::{Path, PathBuf};

use candle_nn::VarMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ontoalign_core::{AlignError, OptimizerSpec, Result};

/// Everything a checkpoint stores besides the model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch the checkpoint was written at.
    pub epoch: usize,
    /// Last mini-batch loss observed before saving.
    pub loss: f64,
    /// Optimizer settings, used to rebuild the optimizer on resume.
    pub optimizer: OptimizerSpec,
}

fn weights_path(dir: &Path, epoch: usize) -> PathBuf {
    dir.join(format!("{epoch:04}.safetensors"))
}

fn meta_path(dir: &Path, epoch: usize) -> PathBuf {
    dir.join(format!("{epoch:04}.json"))
}

/// Write the checkpoint pair for `meta.epoch`.
pub fn save(dir: &Path, varmap: &VarMap, meta: &CheckpointMeta) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    varmap
        .save(weights_path(dir, meta.epoch))
        .map_err(|e| AlignError::Model(format!("Failed to save checkpoint weights: {e}")))?;
    let encoded = serde_json::to_string_pretty(meta)
        .map_err(|e| AlignError::Model(format!("Failed to encode checkpoint meta: {e}")))?;
    std::fs::write(meta_path(dir, meta.epoch), encoded)?;
    debug!(epoch = meta.epoch, dir = %dir.display(), "saved checkpoint");
    Ok(())
}

/// Restore weights into `varmap` and return the metadata of checkpoint
/// `epoch`.
pub fn load(dir: &Path, epoch: usize, varmap: &mut VarMap) -> Result<CheckpointMeta> {
    let weights = weights_path(dir, epoch);
    if !weights.is_file() {
        return Err(AlignError::MissingArtifact { path: weights });
    }
    varmap
        .load(&weights)
        .map_err(|e| AlignError::Model(format!("Failed to load checkpoint weights: {e}")))?;
    let raw = std::fs::read_to_string(meta_path(dir, epoch))?;
    let meta: CheckpointMeta = serde_json::from_str(&raw)
        .map_err(|e| AlignError::Model(format!("Failed to parse checkpoint meta: {e}")))?;
    debug!(epoch = meta.epoch, "loaded checkpoint");
    Ok(meta)
}

/// Highest epoch with a weights file in `dir`, if any.
pub fn last_epoch(dir: &Path) -> Option<usize> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            name.strip_suffix(".safetensors")?.parse::<usize>().ok()
        })
        .max()
}
