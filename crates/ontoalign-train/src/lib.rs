//! Classifier training and alignment extraction
//!
//! Fits an MLP classifier on the training partition of the feature table,
//! checkpoints it periodically, predicts scores for the inference
//! partition, and extracts the final global or local alignment.

pub mod alignment;
pub mod checkpoint;
pub mod loss;
pub mod model;
pub mod optim;
pub mod registry;
pub mod stopper;
pub mod trainer;

pub use loss::Loss;
pub use model::MlpClassifier;
pub use optim::TrainOptimizer;
pub use stopper::{EarlyStopping, Stopper};
pub use trainer::MlpTrainer;
