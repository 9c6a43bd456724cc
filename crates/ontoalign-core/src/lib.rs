//! Core types, errors, and configuration for ontoalign
//!
//! This crate contains the foundational pieces shared across all pipeline
//! stages: the score table produced by the matching engine, reference and
//! candidate mappings, scored prediction rows, the error taxonomy, and the
//! configuration structures consumed by the engine driver, dataset builder
//! and trainer.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AlignConfig, EngineParams, LossSpec, ModelSpec, OptimizerSpec, TrainingParams,
};
pub use error::{AlignError, Result};
pub use types::{CandidateAnchor, CandidateSet, MappingRow, ScoreTable, ScoredMapping};
