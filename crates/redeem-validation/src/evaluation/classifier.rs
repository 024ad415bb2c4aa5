use std::ops::RangeBounds;

use serde::Serialize;

use crate::data_handling::{InstanceStore, Schema};
use crate::error::{EvalError, Result};
use crate::evaluation::curve::{self, Curve, RankedInstance};
use crate::evaluation::RecordStatus;
use crate::math::Array2;
use crate::models::Model;
use crate::stats::normal_factor;

/// Class treated as "positive" for ROC and gain analysis.
pub const POSITIVE_CLASS: usize = 1;

/// Outcome of classifying one instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassRecord {
    pub fold: usize,
    pub status: RecordStatus,
    /// Predicted class, -1 when unclassifiable.
    pub predicted: i64,
    /// Positive-class confidence for binary problems, otherwise the
    /// confidence of the predicted class.
    pub confidence: f64,
    pub actual: Option<usize>,
}

impl ClassRecord {
    const PENDING: ClassRecord = ClassRecord {
        fold: 0,
        status: RecordStatus::Pending,
        predicted: -1,
        confidence: 0.0,
        actual: None,
    };

    fn is_classified(&self) -> bool {
        matches!(self.status, RecordStatus::Correct | RecordStatus::Incorrect)
    }
}

/// Normal-approximation interval around the observed accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub mean: f64,
    pub variance: f64,
}

impl ConfidenceInterval {
    /// `[lower, upper, mean, variance]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.lower, self.upper, self.mean, self.variance]
    }
}

/// Accumulates per-instance classification results over the folds of a run.
///
/// Buffers span the whole validated store so that statistics over a partially
/// completed run only see the folds processed so far.
#[derive(Debug, Clone)]
pub struct ClassifierEvaluator {
    num_classes: usize,
    resolution: usize,
    records: Vec<ClassRecord>,
    completed: Vec<usize>,
}

impl ClassifierEvaluator {
    pub fn new(schema: &Schema, len: usize, resolution: usize) -> Self {
        Self {
            num_classes: schema.num_classes,
            resolution,
            records: vec![ClassRecord::PENDING; len],
            completed: Vec::new(),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Per-instance records, indexed by store position.
    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    /// Folds processed so far, in order.
    pub fn completed_folds(&self) -> &[usize] {
        &self.completed
    }

    /// Classify every instance of `test`; `positions[j]` is the store position
    /// of `test` instance `j`.
    pub fn test_fold(
        &mut self,
        model: &dyn Model,
        test: &InstanceStore,
        positions: &[usize],
        fold: usize,
    ) -> Result<()> {
        for (j, &pos) in positions.iter().enumerate() {
            let value = test.instance(j)?;
            let actual = test.goal(j)?.and_then(|g| g.class());
            let mut record = ClassRecord {
                fold,
                actual,
                ..ClassRecord::PENDING
            };

            match model.classify(&value) {
                Some(c) if c.label >= 0 && (c.label as usize) < self.num_classes => {
                    let label = c.label as usize;
                    let confidence_class = if self.num_classes == 2 {
                        POSITIVE_CLASS
                    } else {
                        label
                    };
                    record.predicted = c.label;
                    record.confidence = c.confidences.get(confidence_class).copied().unwrap_or(
                        if label == confidence_class { 1.0 } else { 0.0 },
                    );
                    record.status = match actual {
                        Some(a) if a == label => RecordStatus::Correct,
                        Some(a) if a < self.num_classes => RecordStatus::Incorrect,
                        _ => {
                            log::trace!("Instance {} has no usable goal class", pos);
                            RecordStatus::Unclassifiable
                        }
                    };
                }
                other => {
                    log::trace!(
                        "Instance {} unclassifiable (model returned {:?})",
                        pos,
                        other.map(|c| c.label)
                    );
                    record.status = RecordStatus::Unclassifiable;
                }
            }
            self.records[pos] = record;
        }
        self.completed.push(fold);
        Ok(())
    }

    pub fn finish(&mut self) {
        let classified = self.classified_count(..);
        log::info!(
            "Classification finished: {} classified, {} unclassifiable, error {:.4}",
            classified,
            self.unclassifiable_count(..),
            self.classification_error(..)
        );
    }

    fn in_folds<'a, R>(&'a self, folds: &'a R) -> impl Iterator<Item = (usize, &'a ClassRecord)> + 'a
    where
        R: RangeBounds<usize>,
    {
        self.records
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.status != RecordStatus::Pending && folds.contains(&r.fold))
    }

    fn count_where<R, F>(&self, folds: &R, pred: F) -> usize
    where
        R: RangeBounds<usize>,
        F: Fn(&ClassRecord) -> bool,
    {
        self.in_folds(folds).filter(|(_, r)| pred(r)).count()
    }

    pub fn classified_count<R: RangeBounds<usize>>(&self, folds: R) -> usize {
        self.count_where(&folds, ClassRecord::is_classified)
    }

    pub fn unclassifiable_count<R: RangeBounds<usize>>(&self, folds: R) -> usize {
        self.count_where(&folds, |r| r.status == RecordStatus::Unclassifiable)
    }

    pub fn correct_count<R: RangeBounds<usize>>(&self, folds: R) -> usize {
        self.count_where(&folds, |r| r.status == RecordStatus::Correct)
    }

    /// `confusion[(actual, predicted)]` over the given folds.
    pub fn confusion<R: RangeBounds<usize>>(&self, folds: R) -> Array2<u64> {
        let mut m = Array2::zeros(self.num_classes, self.num_classes);
        for (_, r) in self.in_folds(&folds).filter(|(_, r)| r.is_classified()) {
            if let Some(actual) = r.actual {
                m[(actual, r.predicted as usize)] += 1;
            }
        }
        m
    }

    /// Incorrect over classified; 0 when nothing was classified.
    pub fn classification_error<R: RangeBounds<usize>>(&self, folds: R) -> f64 {
        let classified = self.count_where(&folds, ClassRecord::is_classified);
        if classified == 0 {
            return 0.0;
        }
        let correct = self.count_where(&folds, |r| r.status == RecordStatus::Correct);
        (classified - correct) as f64 / classified as f64
    }

    /// Accuracy interval at `level` (e.g. 0.95), clamped to [0, 1].
    pub fn confidence_interval<R: RangeBounds<usize>>(
        &self,
        folds: R,
        level: f64,
    ) -> Result<ConfidenceInterval> {
        let count = self.count_where(&folds, ClassRecord::is_classified);
        if count < 2 {
            return Err(EvalError::precondition(format!(
                "confidence interval needs at least 2 classified instances, got {}",
                count
            )));
        }
        let z = normal_factor(level)?;
        let correct = self.count_where(&folds, |r| r.status == RecordStatus::Correct);
        let mean = correct as f64 / count as f64;
        let variance = mean * (1.0 - mean) / (count - 1) as f64;
        let half = z * variance.sqrt();
        Ok(ConfidenceInterval {
            lower: (mean - half).clamp(0.0, 1.0),
            upper: (mean + half).clamp(0.0, 1.0),
            mean,
            variance,
        })
    }

    /// Σ confusion[i][j] × cost[i][j]; `None` uses 0 on the diagonal and 1 elsewhere.
    pub fn cost<R: RangeBounds<usize>>(&self, folds: R, cost: Option<&Array2<f64>>) -> Result<f64> {
        let default_cost;
        let cost = match cost {
            Some(c) => c,
            None => {
                default_cost = Array2::off_diagonal_ones(self.num_classes);
                &default_cost
            }
        };
        if cost.shape() != (self.num_classes, self.num_classes) {
            return Err(EvalError::configuration(format!(
                "cost matrix is {:?}, expected {}x{}",
                cost.shape(),
                self.num_classes,
                self.num_classes
            )));
        }
        let confusion = self.confusion(folds);
        let mut total = 0.0;
        for i in 0..self.num_classes {
            for j in 0..self.num_classes {
                total += confusion[(i, j)] as f64 * cost[(i, j)];
            }
        }
        Ok(total)
    }

    /// Fraction of instances predicted as `class` that actually are; 0 when none were.
    pub fn precision<R: RangeBounds<usize>>(&self, folds: R, class: usize) -> f64 {
        let m = self.confusion(folds);
        if class >= self.num_classes {
            return 0.0;
        }
        let predicted = m.column_sum(class);
        if predicted == 0 {
            0.0
        } else {
            m[(class, class)] as f64 / predicted as f64
        }
    }

    /// Fraction of instances of `class` predicted as such; 0 when there are none.
    pub fn recall<R: RangeBounds<usize>>(&self, folds: R, class: usize) -> f64 {
        let m = self.confusion(folds);
        if class >= self.num_classes {
            return 0.0;
        }
        let actual = m.row_sum(class);
        if actual == 0 {
            0.0
        } else {
            m[(class, class)] as f64 / actual as f64
        }
    }

    /// Classified instances of the given folds, by descending positive confidence.
    pub fn ranking<R: RangeBounds<usize>>(&self, folds: R) -> Vec<RankedInstance> {
        curve::rank(
            self.in_folds(&folds)
                .filter(|(_, r)| r.is_classified())
                .map(|(index, r)| RankedInstance {
                    index,
                    confidence: r.confidence,
                    positive: r.actual == Some(POSITIVE_CLASS),
                })
                .collect(),
        )
    }

    fn require_binary(&self) -> Result<()> {
        if self.num_classes != 2 {
            return Err(EvalError::precondition(format!(
                "ROC and gain analysis need exactly 2 goal classes, got {}",
                self.num_classes
            )));
        }
        Ok(())
    }

    pub fn roc_curve(&self, fold: usize) -> Result<Curve> {
        self.require_binary()?;
        curve::roc_curve(&self.ranking(fold..=fold), self.resolution)
    }

    pub fn gain_chart(&self, fold: usize) -> Result<Curve> {
        self.require_binary()?;
        curve::gain_chart(&self.ranking(fold..=fold), self.resolution)
    }

    /// Point-wise average of the per-fold ROC curves of all processed folds.
    pub fn merged_roc_curve(&self) -> Result<Curve> {
        self.merged(|fold| self.roc_curve(fold))
    }

    pub fn merged_gain_chart(&self) -> Result<Curve> {
        self.merged(|fold| self.gain_chart(fold))
    }

    /// Folds without both classes are skipped.
    fn merged<F>(&self, per_fold: F) -> Result<Curve>
    where
        F: Fn(usize) -> Result<Curve>,
    {
        self.require_binary()?;
        let mut curves = Vec::with_capacity(self.completed.len());
        for &fold in &self.completed {
            match per_fold(fold) {
                Ok(c) => curves.push(c),
                Err(EvalError::Precondition(msg)) => {
                    log::warn!("Skipping fold {} in merged curve: {}", fold, msg)
                }
                Err(e) => return Err(e),
            }
        }
        Curve::average(&curves).ok_or_else(|| {
            EvalError::precondition("no processed fold contains both classes")
        })
    }
}
