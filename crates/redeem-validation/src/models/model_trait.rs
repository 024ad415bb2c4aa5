use crate::data_handling::{InstanceStore, InstanceValue};

/// Capability set a model declares up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Implements [`Model::classify`] (also used for cluster assignment).
    pub classifier: bool,
    /// Implements [`Model::estimate`] or [`Model::estimate_error`].
    pub estimator: bool,
}

impl Capabilities {
    pub const CLASSIFIER: Capabilities = Capabilities {
        classifier: true,
        estimator: false,
    };
    pub const ESTIMATOR: Capabilities = Capabilities {
        classifier: false,
        estimator: true,
    };
}

/// Output of [`Model::classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Predicted class or cluster id; -1 means the model could not decide.
    pub label: i64,
    /// Per-class confidence, indexed by class.
    pub confidences: Vec<f64>,
}

impl Classification {
    pub fn new(label: i64, confidences: Vec<f64>) -> Self {
        Self { label, confidences }
    }

    pub fn unclassifiable() -> Self {
        Self {
            label: -1,
            confidences: Vec::new(),
        }
    }
}

/// Output of [`Model::estimate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub values: Vec<f64>,
    pub confidences: Vec<f64>,
}

impl Estimate {
    pub fn scalar(value: f64) -> Self {
        Self {
            values: vec![value],
            confidences: Vec::new(),
        }
    }
}

/// The contract an externally implemented model has to satisfy to be
/// validated. Training is delegated entirely to the model.
///
/// Prediction methods return `None` when the model cannot produce an answer
/// for one instance; the evaluators record that as a per-instance failure and
/// carry on with the fold.
pub trait Model {
    fn capabilities(&self) -> Capabilities;

    /// Whether the model learns from goals (as opposed to self-supervised).
    fn is_supervised(&self) -> bool {
        true
    }

    fn train(&mut self, store: &InstanceStore) -> anyhow::Result<()>;

    fn classify(&self, _value: &InstanceValue) -> Option<Classification> {
        None
    }

    fn estimate(&self, _value: &InstanceValue) -> Option<Estimate> {
        None
    }

    /// Self-assessed error for one instance, used by self-supervised estimators.
    fn estimate_error(&self, _value: &InstanceValue) -> Option<f64> {
        None
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "model"
    }
}
