//! Small dense-matrix type used for confusion and cost tables.
pub mod matrix;

pub use matrix::{Array2, ShapeError};
