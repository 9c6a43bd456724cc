//! Error taxonomy for the alignment pipeline.
//!
//! Every failure class named in the pipeline contract maps to one variant
//! here. None of them is retried anywhere in the core: errors propagate to
//! the caller, which decides whether to continue with the next independent
//! task.

use std::path::PathBuf;

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    /// The external matching engine exited with a nonzero status while a
    /// protocol step was pending. The engine's own log usually explains why.
    #[error("Matching engine process failed, see engine log at {log_file}")]
    EngineProcess {
        /// Path to the engine's log file.
        log_file: PathBuf,
    },

    /// An expected output artifact is absent after its producing step
    /// reported completion.
    #[error("Expected artifact missing: {path}")]
    MissingArtifact {
        /// The path that should have existed.
        path: PathBuf,
    },

    /// Unrecognized model/loss/optimizer name, or otherwise unusable
    /// configuration. Raised at configuration-resolution time, before any
    /// process is launched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stage was invoked without a collaborator it requires (e.g. a
    /// reference file supplied without a negative sampler).
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Out-of-range dataset row access. A contract violation on the
    /// caller's side, surfaced immediately.
    #[error("Dataset index {index} out of bounds (len {len})")]
    DatasetIndex {
        /// The offending index.
        index: usize,
        /// Number of rows in the dataset.
        len: usize,
    },

    /// Malformed tabular input (score table, reference, candidates, cache).
    #[error("Table error: {0}")]
    Table(String),

    /// Model, loss or optimizer computation error.
    #[error("Model error: {0}")]
    Model(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `std::result::Result<T, AlignError>`.
pub type Result<T> = std::result::Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_process_error_names_log_file() {
        let err = AlignError::EngineProcess {
            log_file: PathBuf::from("/tmp/engine.log"),
        };
        assert!(err.to_string().contains("/tmp/engine.log"));
    }

    #[test]
    fn dataset_index_error_reports_bounds() {
        let err = AlignError::DatasetIndex { index: 7, len: 3 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('3'));
    }
}
