pub mod split;

use rand::Rng;
use serde::Serialize;

use crate::config::ValidationConfig;
use crate::data_handling::{InstanceSource, InstanceStore, Schema};
use crate::error::{EvalError, Result};
use crate::evaluation::classifier::ClassifierEvaluator;
use crate::evaluation::clusterer::ClustererEvaluator;
use crate::evaluation::estimator::EstimatorEvaluator;
use crate::evaluation::Evaluator;
use crate::models::{Model, ModelKind};
use crate::report::ValidationReport;

pub use self::split::FoldAssignment;

/// Lifecycle of a [`Validation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationState {
    Unsplit,
    Split,
    /// The given fold was the last one processed.
    Running(usize),
    Done,
}

/// One validation run of a model over a private view of a store.
///
/// ```text
/// new -> create (or with_assignment) -> run_fold ... run_fold -> Done
/// ```
///
/// The run keeps its own index view, so reordering for folds never touches
/// the caller's store. Instance values stay shared.
pub struct Validation<'m> {
    store: InstanceStore,
    schema: Schema,
    model: &'m mut dyn Model,
    kind: ModelKind,
    config: ValidationConfig,
    assignment: Option<FoldAssignment>,
    evaluator: Evaluator,
    state: ValidationState,
    progress: usize,
}

impl<'m> Validation<'m> {
    /// Bind `model` to a duplicate of `source` and resolve which evaluator it
    /// is scored with.
    pub fn new<S: InstanceSource + ?Sized>(
        source: &S,
        schema: &Schema,
        model: &'m mut dyn Model,
        config: ValidationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store = source.duplicate()?;
        let kind = ModelKind::resolve(&*model, schema)?;
        let evaluator = Evaluator::new(kind, &*model, schema, store.count(), &config);

        log::debug!(
            "Validating model '{}' as {:?} over {} instances",
            model.name(),
            kind,
            store.count()
        );

        Ok(Self {
            store,
            schema: schema.clone(),
            model,
            kind,
            config,
            assignment: None,
            evaluator,
            state: ValidationState::Unsplit,
            progress: 0,
        })
    }

    /// Draw a fresh fold assignment and reset all results.
    pub fn create<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let assignment = FoldAssignment::create(self.config.split, self.store.count(), rng)?;
        self.install(assignment);
        Ok(())
    }

    /// Reuse an existing assignment, e.g. to score a second model on the same folds.
    pub fn with_assignment(&mut self, assignment: FoldAssignment) -> Result<()> {
        if assignment.len() != self.store.count() {
            return Err(EvalError::configuration(format!(
                "fold assignment covers {} instances, store has {}",
                assignment.len(),
                self.store.count()
            )));
        }
        self.install(assignment);
        Ok(())
    }

    fn install(&mut self, assignment: FoldAssignment) {
        self.evaluator = Evaluator::new(
            self.kind,
            &*self.model,
            &self.schema,
            self.store.count(),
            &self.config,
        );
        self.assignment = Some(assignment);
        self.state = ValidationState::Split;
        self.progress = 0;
    }

    /// Process the next fold. Returns the fold number, or `None` once every
    /// fold has been processed.
    pub fn run_fold(&mut self) -> Result<Option<usize>> {
        let assignment = match (&self.state, &self.assignment) {
            (ValidationState::Done, _) => return Ok(None),
            (ValidationState::Unsplit, _) | (_, None) => {
                return Err(EvalError::precondition(
                    "no fold assignment; call create() first",
                ))
            }
            (_, Some(a)) => a,
        };

        let fold = self.progress + 1;
        let num_folds = assignment.num_folds();
        let positions = assignment.test_indices(fold);

        let mut test = self.store.clone();
        test.reorder(&positions)?;

        log::info!(
            "Fold {}/{}: {} test instances",
            fold,
            num_folds,
            positions.len()
        );

        if !self.config.skip_train {
            let mut train = self.store.clone();
            train.reorder(&assignment.train_indices(fold))?;
            log::debug!("Training '{}' on {} instances", self.model.name(), train.count());
            self.model
                .train(&train)
                .map_err(|e| EvalError::model(self.model.name(), e))?;
        }

        self.evaluator
            .test_fold(&*self.model, &test, &positions, fold)?;
        self.progress = fold;
        self.state = ValidationState::Running(fold);

        if fold == num_folds {
            self.evaluator.finish();
            self.state = ValidationState::Done;
            log::info!("Validation of '{}' finished", self.model.name());
        }
        Ok(Some(fold))
    }

    /// Run all remaining folds.
    pub fn test(&mut self) -> Result<()> {
        while self.run_fold()?.is_some() {}
        Ok(())
    }

    /// Last processed fold, 0 before the first.
    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn num_folds(&self) -> usize {
        self.assignment.as_ref().map_or(0, |a| a.num_folds())
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn assignment(&self) -> Option<&FoldAssignment> {
        self.assignment.as_ref()
    }

    /// The run's private view of the instances.
    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn classifier(&self) -> Result<&ClassifierEvaluator> {
        self.evaluator
            .as_classifier()
            .ok_or_else(|| self.wrong_kind(ModelKind::Classifier))
    }

    pub fn clusterer(&self) -> Result<&ClustererEvaluator> {
        self.evaluator
            .as_clusterer()
            .ok_or_else(|| self.wrong_kind(ModelKind::Clusterer))
    }

    pub fn estimator(&self) -> Result<&EstimatorEvaluator> {
        self.evaluator
            .as_estimator()
            .ok_or_else(|| self.wrong_kind(ModelKind::Estimator))
    }

    fn wrong_kind(&self, wanted: ModelKind) -> EvalError {
        EvalError::unsupported(format!(
            "{:?} results requested from a {:?} run",
            wanted, self.kind
        ))
    }

    /// Summary of the folds processed so far.
    pub fn report(&self) -> Result<ValidationReport> {
        let assignment = self.assignment.as_ref().ok_or_else(|| {
            EvalError::precondition("no fold assignment; call create() first")
        })?;
        Ok(ValidationReport::new(
            self.model.name(),
            assignment,
            self.progress,
            &self.evaluator,
            self.config.confidence_level,
        ))
    }
}
