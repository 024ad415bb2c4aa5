use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::config::SplitPolicy;
use crate::evaluation::Evaluator;
use crate::math::Array2;
use crate::models::ModelKind;
use crate::validation::FoldAssignment;

/// Headline numbers per evaluator kind.
///
/// Measures that are undefined for the run (a single class in every fold, an
/// unsupervised estimator) are `None`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metrics {
    Classifier {
        classified: usize,
        unclassifiable: usize,
        error: f64,
        /// `[lower, upper, mean, variance]` of the accuracy.
        confidence_interval: Option<[f64; 4]>,
        confusion: Array2<u64>,
        roc_auc: Option<f64>,
    },
    Clusterer {
        counts: BTreeMap<usize, usize>,
        histogram: BTreeMap<usize, f64>,
        failures: usize,
    },
    Estimator {
        evaluated: usize,
        failures: usize,
        mse: f64,
        rmse: f64,
        mae: f64,
        relative_squared_error: Option<f64>,
        root_relative_squared_error: Option<f64>,
        relative_absolute_error: Option<f64>,
        correlation: Option<f64>,
    },
}

/// Serializable summary of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub model: String,
    pub kind: ModelKind,
    pub split: SplitPolicy,
    pub num_folds: usize,
    pub folds_completed: usize,
    pub instances: usize,
    pub metrics: Metrics,
}

impl ValidationReport {
    pub fn new(
        model: &str,
        assignment: &FoldAssignment,
        folds_completed: usize,
        evaluator: &Evaluator,
        confidence_level: f64,
    ) -> Self {
        let metrics = match evaluator {
            Evaluator::Classifier(e) => Metrics::Classifier {
                classified: e.classified_count(..),
                unclassifiable: e.unclassifiable_count(..),
                error: e.classification_error(..),
                confidence_interval: e
                    .confidence_interval(.., confidence_level)
                    .ok()
                    .map(|ci| ci.to_array()),
                confusion: e.confusion(..),
                roc_auc: e.merged_roc_curve().ok().map(|c| c.area()),
            },
            Evaluator::Clusterer(e) => Metrics::Clusterer {
                counts: e.counts(..),
                histogram: e.histogram(..),
                failures: e.failure_count(..),
            },
            Evaluator::Estimator(e) => Metrics::Estimator {
                evaluated: e.evaluated_count(..),
                failures: e.failure_count(..),
                mse: e.mse(..),
                rmse: e.rmse(..),
                mae: e.mae(..),
                relative_squared_error: e.relative_squared_error(..).ok(),
                root_relative_squared_error: e.root_relative_squared_error(..).ok(),
                relative_absolute_error: e.relative_absolute_error(..).ok(),
                correlation: e.correlation(..).ok(),
            },
        };

        Self {
            model: model.to_string(),
            kind: evaluator.kind(),
            split: assignment.policy(),
            num_folds: assignment.num_folds(),
            folds_completed,
            instances: assignment.len(),
            metrics,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize validation report")
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = File::create(&path).with_context(|| {
            format!("Failed to create report file: {}", path.as_ref().display())
        })?;
        serde_json::to_writer_pretty(file, self).context("Failed to write validation report")?;
        Ok(())
    }
}
