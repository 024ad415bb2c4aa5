pub mod kind;
pub mod model_trait;

pub use kind::ModelKind;
pub use model_trait::{Capabilities, Classification, Estimate, Model};
