//! End-to-end validation runs for each evaluator kind.

mod common;

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use redeem_validation::config::{SamplerConfig, SplitPolicy, ValidationConfig};
use redeem_validation::data_handling::{Goal, InstanceSource, InstanceStore, Schema};
use redeem_validation::models::ModelKind;
use redeem_validation::report::Metrics;
use redeem_validation::sampler::BatchSampler;
use redeem_validation::validation::{Validation, ValidationState};
use redeem_validation::EvalError;

use common::*;

fn cv(folds: usize) -> ValidationConfig {
    ValidationConfig {
        split: SplitPolicy::CrossValidation { folds },
        curve_resolution: 20,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[test]
fn perfect_discriminator_has_unit_auc() {
    let store = separable(40);
    let mut model = Threshold { cut: 0.0 };
    let mut run =
        Validation::new(&store, &Schema::classification(1, 2), &mut model, cv(2)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(8)).unwrap();
    run.test().unwrap();

    let eval = run.classifier().unwrap();
    assert_eq!(eval.classification_error(..), 0.0);
    let roc = eval.merged_roc_curve().unwrap();
    assert_eq!(roc.len(), 21);
    assert!((roc.area() - 1.0).abs() < 1e-12);
}

#[test]
fn confusion_total_matches_classified_count() {
    let store = noisy(60, 5);
    let mut model = Hesitant { blind: 0.4 };
    let mut run =
        Validation::new(&store, &Schema::classification(1, 2), &mut model, cv(3)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(2)).unwrap();
    run.test().unwrap();

    let eval = run.classifier().unwrap();
    let confusion = eval.confusion(..);
    assert_eq!(confusion.sum(), eval.classified_count(..) as u64);
    assert!(eval.unclassifiable_count(..) > 0);
    assert_eq!(
        eval.classified_count(..) + eval.unclassifiable_count(..),
        60
    );
}

#[test]
fn confidence_interval_is_bounded() {
    let store = noisy(80, 11);
    let mut model = Threshold { cut: 0.0 };
    let mut run =
        Validation::new(&store, &Schema::classification(1, 2), &mut model, cv(4)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(6)).unwrap();
    run.test().unwrap();

    let ci = run.classifier().unwrap().confidence_interval(.., 0.95).unwrap();
    assert!(0.0 <= ci.lower && ci.lower <= ci.mean);
    assert!(ci.mean <= ci.upper && ci.upper <= 1.0);
}

#[test]
fn partial_run_reports_processed_folds_only() {
    let store = separable(30);
    let mut model = Threshold { cut: 0.0 };
    let mut run =
        Validation::new(&store, &Schema::classification(1, 2), &mut model, cv(3)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(1)).unwrap();
    run.run_fold().unwrap();

    assert_eq!(run.state(), ValidationState::Running(1));
    assert_eq!(run.classifier().unwrap().classified_count(..), 10);
    let report = run.report().unwrap();
    assert_eq!(report.folds_completed, 1);
    assert_eq!(report.num_folds, 3);
}

#[test]
fn majority_model_retrains_per_fold() {
    // 3 of 4 instances are class 1
    let features = (0..40).map(|i| vec![i as f64]).collect();
    let goals = (0..40)
        .map(|i| Goal::Class(if i % 4 == 0 { 0 } else { 1 }))
        .collect();
    let store = InstanceStore::from_numeric(features, goals).unwrap();
    let mut model = Majority::default();
    let mut run =
        Validation::new(&store, &Schema::classification(1, 2), &mut model, cv(5)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(0)).unwrap();
    run.test().unwrap();
    assert!((run.classifier().unwrap().classification_error(..) - 0.25).abs() < 1e-12);
}

#[test]
fn training_failure_is_a_model_error() {
    let store = separable(10);
    let mut model = Broken;
    let mut run =
        Validation::new(&store, &Schema::classification(1, 2), &mut model, cv(2)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(0)).unwrap();
    match run.test() {
        Err(EvalError::Model { model, message }) => {
            assert_eq!(model, "broken");
            assert!(message.contains("refusing"));
        }
        other => panic!("expected a model error, got {:?}", other.err()),
    }
}

#[test]
fn classifier_on_regression_data_is_rejected() {
    let store = linear(10);
    let mut model = Threshold { cut: 0.0 };
    let err = Validation::new(&store, &Schema::regression(1), &mut model, cv(2));
    assert!(matches!(err, Err(EvalError::Configuration(_))));
}

#[test]
fn classifier_report_serializes() {
    let store = separable(20);
    let mut model = Threshold { cut: 0.0 };
    let mut run =
        Validation::new(&store, &Schema::classification(1, 2), &mut model, cv(2)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(3)).unwrap();
    run.test().unwrap();

    let report = run.report().unwrap();
    assert_eq!(report.model, "threshold");
    assert_eq!(report.kind, ModelKind::Classifier);
    match &report.metrics {
        Metrics::Classifier { error, classified, .. } => {
            assert_eq!(*error, 0.0);
            assert_eq!(*classified, 20);
        }
        other => panic!("unexpected metrics {:?}", other),
    }
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["kind"], "classifier");
    assert_eq!(json["instances"], 20);
}

// ---------------------------------------------------------------------------
// Clusterer
// ---------------------------------------------------------------------------

#[test]
fn clusterer_membership_histogram() {
    let features = (0..12)
        .map(|i| vec![if i < 9 { 1.0 } else { -1.0 }])
        .chain(std::iter::once(vec![f64::NAN]))
        .collect();
    let store = InstanceStore::from_unlabeled(features);
    let mut model = SignClusterer;
    let mut run = Validation::new(
        &store,
        &Schema::unsupervised(1, 2),
        &mut model,
        ValidationConfig {
            split: SplitPolicy::LeaveOneOut,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(run.kind(), ModelKind::Clusterer);
    run.create(&mut ChaCha8Rng::seed_from_u64(0)).unwrap();
    run.test().unwrap();

    let eval = run.clusterer().unwrap();
    assert_eq!(eval.counts(..), BTreeMap::from([(0, 3), (1, 9)]));
    assert_eq!(eval.histogram(..), BTreeMap::from([(0, 0.25), (1, 0.75)]));
    assert_eq!(eval.failure_count(..), 1);
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

#[test]
fn perfect_estimator_has_zero_error() {
    let store = linear(25);
    let mut model = Identity;
    let mut run = Validation::new(&store, &Schema::regression(1), &mut model, cv(5)).unwrap();
    assert_eq!(run.kind(), ModelKind::Estimator);
    run.create(&mut ChaCha8Rng::seed_from_u64(9)).unwrap();
    run.test().unwrap();

    let eval = run.estimator().unwrap();
    assert_eq!(eval.mse(..), 0.0);
    assert_eq!(eval.mae(..), 0.0);
    assert!((eval.correlation(..).unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn constant_target_correlation_is_zero() {
    let features = (0..10).map(|i| vec![i as f64]).collect();
    let goals = vec![Goal::Value(3.0); 10];
    let store = InstanceStore::from_numeric(features, goals).unwrap();
    let mut model = Identity;
    let mut run = Validation::new(&store, &Schema::regression(1), &mut model, cv(2)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(9)).unwrap();
    run.test().unwrap();

    let eval = run.estimator().unwrap();
    assert_eq!(eval.correlation(..).unwrap(), 0.0);
    // zero target variance
    assert_eq!(eval.relative_squared_error(..).unwrap(), 0.0);
}

#[test]
fn self_supervised_estimator_uses_its_own_error() {
    let store = InstanceStore::from_unlabeled(vec![vec![1.0], vec![-2.0], vec![3.0], vec![0.0]]);
    let mut model = Reconstruction;
    let mut run = Validation::new(&store, &Schema::unsupervised(1, 0), &mut model, cv(2)).unwrap();
    run.create(&mut ChaCha8Rng::seed_from_u64(0)).unwrap();
    run.test().unwrap();

    let eval = run.estimator().unwrap();
    assert!((eval.mae(..) - 1.5).abs() < 1e-12);
    assert!((eval.mse(..) - 3.5).abs() < 1e-12);
    assert!(matches!(
        eval.relative_absolute_error(..),
        Err(EvalError::Unsupported(_))
    ));
    assert!(matches!(eval.correlation(..), Err(EvalError::Unsupported(_))));
}

// ---------------------------------------------------------------------------
// Sampler as source
// ---------------------------------------------------------------------------

#[test]
fn full_unbalanced_batch_is_the_source() {
    let store = noisy(15, 2);
    let mut sampler =
        BatchSampler::new(store.clone(), &Schema::classification(1, 2), SamplerConfig::default())
            .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let batch = sampler.next_batch(&mut rng).unwrap().to_vec();
    assert_eq!(batch, (0..15).collect::<Vec<_>>());

    let view = sampler.duplicate().unwrap();
    assert_eq!(view.indices(), store.indices());
}

#[test]
fn validation_runs_over_a_sampled_batch() {
    let store = separable(40);
    let config = SamplerConfig {
        sample_fraction: 0.5,
        ..Default::default()
    };
    let mut sampler = BatchSampler::new(store, &Schema::classification(1, 2), config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    sampler.next_batch(&mut rng).unwrap();

    let mut model = Threshold { cut: 0.0 };
    let mut run =
        Validation::new(&sampler, &Schema::classification(1, 2), &mut model, cv(4)).unwrap();
    run.create(&mut rng).unwrap();
    run.test().unwrap();
    assert_eq!(run.classifier().unwrap().classified_count(..), 20);
}
