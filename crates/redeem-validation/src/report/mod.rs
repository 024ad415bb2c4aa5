pub mod plots;
pub mod report;

pub use self::report::{Metrics, ValidationReport};
