use serde::{Deserialize, Serialize};

use crate::data_handling::{GoalKind, Schema};
use crate::error::{EvalError, Result};
use crate::models::Model;

/// Which evaluator a model is validated with. Resolved once per binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Classifier,
    Clusterer,
    Estimator,
}

impl ModelKind {
    /// Resolve from the model's declared capabilities, its supervision flag and
    /// the schema's goal kind.
    ///
    /// A classifier on categorical goals is a `Classifier`; an unsupervised
    /// classifier-only model is a `Clusterer`; an estimator on continuous goals,
    /// or any self-supervised estimator, is an `Estimator`.
    pub fn resolve(model: &dyn Model, schema: &Schema) -> Result<ModelKind> {
        let caps = model.capabilities();
        let supervised = model.is_supervised();

        if supervised && !schema.supervised {
            return Err(EvalError::configuration(format!(
                "supervised model '{}' needs instances with a goal",
                model.name()
            )));
        }

        let kind = match (caps.classifier, caps.estimator, supervised, schema.goal_kind) {
            (true, _, true, GoalKind::Class) => ModelKind::Classifier,
            (true, false, false, _) => ModelKind::Clusterer,
            (_, true, true, GoalKind::Value) => ModelKind::Estimator,
            (_, true, false, _) => ModelKind::Estimator,
            _ => {
                return Err(EvalError::configuration(format!(
                    "cannot validate model '{}' ({:?}, supervised: {}) against {:?} goals",
                    model.name(),
                    caps,
                    supervised,
                    schema.goal_kind
                )))
            }
        };

        if kind == ModelKind::Classifier && schema.num_classes < 2 {
            return Err(EvalError::configuration(format!(
                "classification needs at least 2 goal classes, schema has {}",
                schema.num_classes
            )));
        }
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::InstanceStore;
    use crate::models::Capabilities;

    struct Declared {
        caps: Capabilities,
        supervised: bool,
    }

    impl Model for Declared {
        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        fn is_supervised(&self) -> bool {
            self.supervised
        }

        fn train(&mut self, _store: &InstanceStore) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn resolve(caps: Capabilities, supervised: bool, schema: &Schema) -> Result<ModelKind> {
        ModelKind::resolve(&Declared { caps, supervised }, schema)
    }

    #[test]
    fn kinds_follow_capabilities_and_goal() {
        let cls = Schema::classification(3, 2);
        let reg = Schema::regression(3);
        let unl = Schema::unsupervised(3, 4);
        let both = Capabilities {
            classifier: true,
            estimator: true,
        };

        assert_eq!(resolve(Capabilities::CLASSIFIER, true, &cls).unwrap(), ModelKind::Classifier);
        assert_eq!(resolve(both, true, &cls).unwrap(), ModelKind::Classifier);
        assert_eq!(resolve(both, true, &reg).unwrap(), ModelKind::Estimator);
        assert_eq!(resolve(Capabilities::CLASSIFIER, false, &unl).unwrap(), ModelKind::Clusterer);
        assert_eq!(resolve(Capabilities::ESTIMATOR, false, &unl).unwrap(), ModelKind::Estimator);
    }

    #[test]
    fn unresolved_combinations_fail() {
        let reg = Schema::regression(3);
        let unl = Schema::unsupervised(3, 0);
        assert!(resolve(Capabilities::CLASSIFIER, true, &reg).is_err());
        assert!(resolve(Capabilities::ESTIMATOR, true, &unl).is_err());
        assert!(resolve(Capabilities::default(), false, &unl).is_err());
        assert!(resolve(Capabilities::CLASSIFIER, true, &Schema::classification(3, 1)).is_err());
    }
}
