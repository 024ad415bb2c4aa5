use std::ops::RangeBounds;

use serde::Serialize;

use crate::data_handling::InstanceStore;
use crate::error::{EvalError, Result};
use crate::models::Model;
use crate::stats::{pearson, weighted_mean};

/// Estimate of one instance. `error` is `None` when the model failed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimateRecord {
    pub fold: usize,
    pub predicted: Option<f64>,
    pub actual: Option<f64>,
    /// Predicted minus actual for supervised models, the self-assessed error otherwise.
    pub error: Option<f64>,
    pub weight: f64,
}

/// Successful records of a fold range, column-wise.
#[derive(Default)]
struct Columns {
    predicted: Vec<f64>,
    actual: Vec<f64>,
    error: Vec<f64>,
    weight: Vec<f64>,
}

/// Accumulates scalar estimates and their errors over the folds of a run.
#[derive(Debug, Clone)]
pub struct EstimatorEvaluator {
    supervised: bool,
    records: Vec<Option<EstimateRecord>>,
    completed: Vec<usize>,
}

impl EstimatorEvaluator {
    pub fn new(supervised: bool, len: usize) -> Self {
        Self {
            supervised,
            records: vec![None; len],
            completed: Vec::new(),
        }
    }

    pub fn is_supervised(&self) -> bool {
        self.supervised
    }

    pub fn records(&self) -> &[Option<EstimateRecord>] {
        &self.records
    }

    pub fn completed_folds(&self) -> &[usize] {
        &self.completed
    }

    pub fn test_fold(
        &mut self,
        model: &dyn Model,
        test: &InstanceStore,
        positions: &[usize],
        fold: usize,
    ) -> Result<()> {
        for (j, &pos) in positions.iter().enumerate() {
            let value = test.instance(j)?;
            let weight = test.weight(j)?;
            let mut record = EstimateRecord {
                fold,
                predicted: None,
                actual: None,
                error: None,
                weight,
            };

            if self.supervised {
                record.actual = test.goal(j)?.and_then(|g| g.value());
                record.predicted = model
                    .estimate(&value)
                    .and_then(|e| e.values.first().copied())
                    .filter(|v| v.is_finite());
                if let (Some(p), Some(a)) = (record.predicted, record.actual) {
                    record.error = Some(p - a);
                }
            } else {
                record.error = model.estimate_error(&value).filter(|e| e.is_finite());
            }

            if record.error.is_none() {
                log::trace!("No usable estimate for instance {}", pos);
            }
            self.records[pos] = Some(record);
        }
        self.completed.push(fold);
        Ok(())
    }

    pub fn finish(&mut self) {
        log::info!(
            "Estimation finished: MSE {:.6}, MAE {:.6}, {} failures",
            self.mse(..),
            self.mae(..),
            self.failure_count(..)
        );
    }

    fn columns<R: RangeBounds<usize>>(&self, folds: &R) -> Columns {
        let mut cols = Columns::default();
        for r in self.records.iter().flatten() {
            if let (Some(e), true) = (r.error, folds.contains(&r.fold)) {
                cols.predicted.push(r.predicted.unwrap_or(0.0));
                cols.actual.push(r.actual.unwrap_or(0.0));
                cols.error.push(e);
                cols.weight.push(r.weight);
            }
        }
        cols
    }

    fn require_supervised(&self, measure: &str) -> Result<()> {
        if self.supervised {
            Ok(())
        } else {
            Err(EvalError::unsupported(format!(
                "{} needs an independent ground truth; the estimator is self-supervised",
                measure
            )))
        }
    }

    pub fn failure_count<R: RangeBounds<usize>>(&self, folds: R) -> usize {
        self.records
            .iter()
            .flatten()
            .filter(|r| r.error.is_none() && folds.contains(&r.fold))
            .count()
    }

    pub fn evaluated_count<R: RangeBounds<usize>>(&self, folds: R) -> usize {
        self.columns(&folds).error.len()
    }

    /// Mean squared error.
    pub fn mse<R: RangeBounds<usize>>(&self, folds: R) -> f64 {
        let c = self.columns(&folds);
        let squared: Vec<f64> = c.error.iter().map(|e| e * e).collect();
        weighted_mean(&squared, &c.weight)
    }

    pub fn rmse<R: RangeBounds<usize>>(&self, folds: R) -> f64 {
        self.mse(folds).sqrt()
    }

    /// Mean absolute error.
    pub fn mae<R: RangeBounds<usize>>(&self, folds: R) -> f64 {
        let c = self.columns(&folds);
        let absolute: Vec<f64> = c.error.iter().map(|e| e.abs()).collect();
        weighted_mean(&absolute, &c.weight)
    }

    /// Squared error relative to predicting the mean target.
    pub fn relative_squared_error<R: RangeBounds<usize>>(&self, folds: R) -> Result<f64> {
        self.require_supervised("relative squared error")?;
        let c = self.columns(&folds);
        let mean = weighted_mean(&c.actual, &c.weight);
        let num: f64 = c.error.iter().zip(&c.weight).map(|(e, w)| w * e * e).sum();
        let den: f64 = c
            .actual
            .iter()
            .zip(&c.weight)
            .map(|(a, w)| w * (a - mean) * (a - mean))
            .sum();
        Ok(if den > 0.0 { num / den } else { 0.0 })
    }

    pub fn root_relative_squared_error<R: RangeBounds<usize>>(&self, folds: R) -> Result<f64> {
        Ok(self.relative_squared_error(folds)?.sqrt())
    }

    /// Absolute error relative to predicting the mean target.
    pub fn relative_absolute_error<R: RangeBounds<usize>>(&self, folds: R) -> Result<f64> {
        self.require_supervised("relative absolute error")?;
        let c = self.columns(&folds);
        let mean = weighted_mean(&c.actual, &c.weight);
        let num: f64 = c.error.iter().zip(&c.weight).map(|(e, w)| w * e.abs()).sum();
        let den: f64 = c
            .actual
            .iter()
            .zip(&c.weight)
            .map(|(a, w)| w * (a - mean).abs())
            .sum();
        Ok(if den > 0.0 { num / den } else { 0.0 })
    }

    /// Pearson correlation between estimates and targets; 0 on zero variance.
    pub fn correlation<R: RangeBounds<usize>>(&self, folds: R) -> Result<f64> {
        self.require_supervised("correlation")?;
        let c = self.columns(&folds);
        Ok(pearson(&c.predicted, &c.actual, &c.weight))
    }
}
