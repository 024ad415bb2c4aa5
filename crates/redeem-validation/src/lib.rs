//! redeem-validation: resampling-based evaluation of predictive models.
//!
//! The crate estimates model performance by train/test split, k-fold
//! cross-validation and leave-one-out over an in-memory instance store, and
//! compares two classifiers with a paired Student-t test over repeated
//! cross-validation runs.
//!
//! Models are external: anything implementing [`models::Model`] can be
//! evaluated. The evaluator used for a run (classifier, clusterer or
//! estimator) is resolved once from the model's declared capabilities and the
//! dataset [`data_handling::Schema`].
//!
//! All randomized steps take an explicit `rand::Rng`, so a run seeded with
//! `rand_chacha::ChaCha8Rng::seed_from_u64` is fully reproducible.
pub mod comparison;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
pub mod sampler;
pub mod stats;
pub mod validation;

pub use error::{EvalError, Result};
