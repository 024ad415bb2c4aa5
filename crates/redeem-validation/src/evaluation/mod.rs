pub mod classifier;
pub mod clusterer;
pub mod curve;
pub mod estimator;

use serde::Serialize;

use crate::config::ValidationConfig;
use crate::data_handling::{InstanceStore, Schema};
use crate::error::Result;
use crate::models::{Model, ModelKind};

use self::classifier::ClassifierEvaluator;
use self::clusterer::ClustererEvaluator;
use self::estimator::EstimatorEvaluator;

/// Outcome of classifying one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Not tested yet.
    Pending,
    Correct,
    Incorrect,
    Unclassifiable,
}

/// The evaluator matching a resolved [`ModelKind`].
#[derive(Debug, Clone)]
pub enum Evaluator {
    Classifier(ClassifierEvaluator),
    Clusterer(ClustererEvaluator),
    Estimator(EstimatorEvaluator),
}

impl Evaluator {
    /// Buffers sized for a store of `len` instances. Estimates are scored
    /// against goals only when both the model and the data are supervised.
    pub fn new(
        kind: ModelKind,
        model: &dyn Model,
        schema: &Schema,
        len: usize,
        config: &ValidationConfig,
    ) -> Self {
        match kind {
            ModelKind::Classifier => {
                Evaluator::Classifier(ClassifierEvaluator::new(schema, len, config.curve_resolution))
            }
            ModelKind::Clusterer => Evaluator::Clusterer(ClustererEvaluator::new(schema, len)),
            ModelKind::Estimator => {
                let supervised = model.is_supervised() && schema.supervised;
                Evaluator::Estimator(EstimatorEvaluator::new(supervised, len))
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Evaluator::Classifier(_) => ModelKind::Classifier,
            Evaluator::Clusterer(_) => ModelKind::Clusterer,
            Evaluator::Estimator(_) => ModelKind::Estimator,
        }
    }

    pub fn test_fold(
        &mut self,
        model: &dyn Model,
        test: &InstanceStore,
        positions: &[usize],
        fold: usize,
    ) -> Result<()> {
        match self {
            Evaluator::Classifier(e) => e.test_fold(model, test, positions, fold),
            Evaluator::Clusterer(e) => e.test_fold(model, test, positions, fold),
            Evaluator::Estimator(e) => e.test_fold(model, test, positions, fold),
        }
    }

    pub fn finish(&mut self) {
        match self {
            Evaluator::Classifier(e) => e.finish(),
            Evaluator::Clusterer(e) => e.finish(),
            Evaluator::Estimator(e) => e.finish(),
        }
    }

    pub fn as_classifier(&self) -> Option<&ClassifierEvaluator> {
        match self {
            Evaluator::Classifier(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_clusterer(&self) -> Option<&ClustererEvaluator> {
        match self {
            Evaluator::Clusterer(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_estimator(&self) -> Option<&EstimatorEvaluator> {
        match self {
            Evaluator::Estimator(e) => Some(e),
            _ => None,
        }
    }
}
