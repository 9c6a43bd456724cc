//! Driver for the external ontology matching engine
//!
//! Operates one engine process per ontology pair over its line-oriented
//! command protocol and produces the raw per-pair score table the dataset
//! builder consumes. The engine itself is an opaque oracle; only the
//! protocol documented here is relied upon.

mod driver;
mod session;

pub use driver::{EngineConfig, EnginePaths, MatchingEngine};
pub use session::EngineSession;
