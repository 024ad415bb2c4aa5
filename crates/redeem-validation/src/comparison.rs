//! Paired comparison of two classifiers over repeated cross-validation.
//!
//! Both models are scored on the same folds in every repeat. The per-repeat
//! error differences are tested against zero with a two-sided Student-t test
//! on `repeats - 1` degrees of freedom.
use rand::Rng;
use serde::Serialize;

use crate::config::ComparerConfig;
use crate::data_handling::{InstanceSource, InstanceStore, Schema};
use crate::error::{EvalError, Result};
use crate::models::{Model, ModelKind};
use crate::stats::{sample_variance, students_t_critical, students_t_p_value};
use crate::validation::Validation;

/// Which of the two compared models has the lower mean error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BestModel {
    First,
    Second,
}

pub struct ModelComparer<'a> {
    store: InstanceStore,
    schema: Schema,
    first: &'a mut dyn Model,
    second: &'a mut dyn Model,
    config: ComparerConfig,
    /// (first, second) classification error per repeat.
    errors: Vec<(f64, f64)>,
}

impl<'a> ModelComparer<'a> {
    pub fn new<S: InstanceSource + ?Sized>(
        source: &S,
        schema: &Schema,
        first: &'a mut dyn Model,
        second: &'a mut dyn Model,
        config: ComparerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let kind_first = ModelKind::resolve(&*first, schema)?;
        let kind_second = ModelKind::resolve(&*second, schema)?;
        if kind_first != kind_second {
            return Err(EvalError::configuration(format!(
                "cannot compare a {:?} ('{}') with a {:?} ('{}')",
                kind_first,
                first.name(),
                kind_second,
                second.name()
            )));
        }
        if kind_first != ModelKind::Classifier {
            return Err(EvalError::configuration(format!(
                "paired comparison is defined for classifiers, got {:?}",
                kind_first
            )));
        }

        Ok(Self {
            store: source.duplicate()?,
            schema: schema.clone(),
            first,
            second,
            config,
            errors: Vec::new(),
        })
    }

    pub fn config(&self) -> &ComparerConfig {
        &self.config
    }

    /// Run all repeats, replacing earlier results.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.errors.clear();
        let vconfig = self.config.validation_config();

        for repeat in 1..=self.config.repeats {
            let (error_first, assignment) = {
                let mut run =
                    Validation::new(&self.store, &self.schema, &mut *self.first, vconfig.clone())?;
                run.create(rng)?;
                run.test()?;
                let error = run.classifier()?.classification_error(..);
                let assignment = run.assignment().cloned().ok_or_else(|| {
                    EvalError::precondition("validation finished without a fold assignment")
                })?;
                (error, assignment)
            };

            let error_second = {
                let mut run =
                    Validation::new(&self.store, &self.schema, &mut *self.second, vconfig.clone())?;
                run.with_assignment(assignment)?;
                run.test()?;
                run.classifier()?.classification_error(..)
            };

            log::info!(
                "Repeat {}/{}: error {:.4} vs {:.4}",
                repeat,
                self.config.repeats,
                error_first,
                error_second
            );
            self.errors.push((error_first, error_second));
        }
        Ok(())
    }

    /// (first, second) classification error per completed repeat.
    pub fn paired_errors(&self) -> &[(f64, f64)] {
        &self.errors
    }

    fn differences(&self) -> Result<Vec<f64>> {
        if self.errors.len() < 2 {
            return Err(EvalError::precondition(format!(
                "paired test needs at least 2 completed repeats, got {}",
                self.errors.len()
            )));
        }
        Ok(self.errors.iter().map(|(a, b)| a - b).collect())
    }

    /// Mean of first minus second error.
    pub fn mean_diff(&self) -> Result<f64> {
        let d = self.differences()?;
        Ok(d.iter().sum::<f64>() / d.len() as f64)
    }

    /// Sample variance of the paired differences.
    pub fn variance(&self) -> Result<f64> {
        Ok(sample_variance(&self.differences()?))
    }

    /// d̄ / sqrt(var / R). Zero variance gives 0 for identical errors and
    /// ±inf otherwise.
    pub fn t_statistic(&self) -> Result<f64> {
        let mean = self.mean_diff()?;
        let var = self.variance()?;
        let repeats = self.errors.len() as f64;
        if var <= 0.0 {
            return Ok(if mean == 0.0 {
                0.0
            } else {
                f64::INFINITY.copysign(mean)
            });
        }
        Ok(mean / (var / repeats).sqrt())
    }

    fn dof(&self) -> f64 {
        (self.errors.len() - 1) as f64
    }

    /// Whether |t| exceeds the two-sided critical value at `confidence`.
    pub fn are_models_different(&self, confidence: f64) -> Result<bool> {
        let t = self.t_statistic()?;
        let critical = students_t_critical(confidence, self.dof())?;
        Ok(t.abs() > critical)
    }

    /// Two-sided p-value of the paired test.
    pub fn different_probability(&self) -> Result<f64> {
        students_t_p_value(self.t_statistic()?, self.dof())
    }

    /// Lower mean error wins; ties go to the first model.
    pub fn best_model(&self) -> Result<BestModel> {
        Ok(if self.mean_diff()? <= 0.0 {
            BestModel::First
        } else {
            BestModel::Second
        })
    }
}
