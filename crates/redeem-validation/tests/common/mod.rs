//! Toy models and datasets shared by the integration tests.
#![allow(dead_code)]

use anyhow::bail;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use redeem_validation::data_handling::{Goal, InstanceStore, InstanceValue};
use redeem_validation::models::{Capabilities, Classification, Estimate, Model};

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// Alternating classes, class 1 on x > 0 and class 0 on x < 0.
pub fn separable(n: usize) -> InstanceStore {
    let features = (0..n)
        .map(|i| {
            let magnitude = 1.0 + i as f64 * 0.01;
            vec![if i % 2 == 0 { magnitude } else { -magnitude }]
        })
        .collect();
    let goals = (0..n).map(|i| Goal::Class(if i % 2 == 0 { 1 } else { 0 })).collect();
    InstanceStore::from_numeric(features, goals).unwrap()
}

/// Class 1 on x + noise > 0, so a threshold at 0 makes some mistakes.
pub fn noisy(n: usize, seed: u64) -> InstanceStore {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n);
    let mut goals = Vec::with_capacity(n);
    for _ in 0..n {
        let x: f64 = rng.gen_range(-1.0..1.0);
        let noise: f64 = rng.gen_range(-0.5..0.5);
        features.push(vec![x]);
        goals.push(Goal::Class(if x + noise > 0.0 { 1 } else { 0 }));
    }
    InstanceStore::from_numeric(features, goals).unwrap()
}

/// Goal equals the first feature.
pub fn linear(n: usize) -> InstanceStore {
    let features = (0..n).map(|i| vec![i as f64 * 0.5]).collect();
    let goals = (0..n).map(|i| Goal::Value(i as f64 * 0.5)).collect();
    InstanceStore::from_numeric(features, goals).unwrap()
}

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

/// Class 1 above `cut`, with a logistic confidence.
pub struct Threshold {
    pub cut: f64,
}

impl Model for Threshold {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CLASSIFIER
    }

    fn train(&mut self, _store: &InstanceStore) -> anyhow::Result<()> {
        Ok(())
    }

    fn classify(&self, value: &InstanceValue) -> Option<Classification> {
        let x = value.get(0)?;
        let p = logistic(4.0 * (x - self.cut));
        let label = if x > self.cut { 1 } else { 0 };
        Some(Classification::new(label, vec![1.0 - p, p]))
    }

    fn name(&self) -> &str {
        "threshold"
    }
}

/// Predicts the most frequent training class.
#[derive(Default)]
pub struct Majority {
    class: usize,
}

impl Model for Majority {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CLASSIFIER
    }

    fn train(&mut self, store: &InstanceStore) -> anyhow::Result<()> {
        let counts = store.class_histogram(2);
        self.class = if counts[1] > counts[0] { 1 } else { 0 };
        Ok(())
    }

    fn classify(&self, _value: &InstanceValue) -> Option<Classification> {
        let mut confidences = vec![0.0; 2];
        confidences[self.class] = 1.0;
        Some(Classification::new(self.class as i64, confidences))
    }

    fn name(&self) -> &str {
        "majority"
    }
}

/// Like [`Threshold`] at 0 but gives up on instances with |x| < `blind`.
pub struct Hesitant {
    pub blind: f64,
}

impl Model for Hesitant {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CLASSIFIER
    }

    fn train(&mut self, _store: &InstanceStore) -> anyhow::Result<()> {
        Ok(())
    }

    fn classify(&self, value: &InstanceValue) -> Option<Classification> {
        let x = value.get(0)?;
        if x.abs() < self.blind {
            return Some(Classification::unclassifiable());
        }
        Threshold { cut: 0.0 }.classify(value)
    }
}

/// Always fails to train.
pub struct Broken;

impl Model for Broken {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CLASSIFIER
    }

    fn train(&mut self, store: &InstanceStore) -> anyhow::Result<()> {
        bail!("refusing to fit {} instances", store.count())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

// ---------------------------------------------------------------------------
// Clusterers and estimators
// ---------------------------------------------------------------------------

/// Unsupervised: cluster 1 for positive x, 0 otherwise, fails on NaN.
pub struct SignClusterer;

impl Model for SignClusterer {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CLASSIFIER
    }

    fn is_supervised(&self) -> bool {
        false
    }

    fn train(&mut self, _store: &InstanceStore) -> anyhow::Result<()> {
        Ok(())
    }

    fn classify(&self, value: &InstanceValue) -> Option<Classification> {
        let x = value.get(0).filter(|x| !x.is_nan())?;
        let label = if x > 0.0 { 1 } else { 0 };
        Some(Classification::new(label, Vec::new()))
    }
}

/// Returns the first feature as the estimate.
pub struct Identity;

impl Model for Identity {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ESTIMATOR
    }

    fn train(&mut self, _store: &InstanceStore) -> anyhow::Result<()> {
        Ok(())
    }

    fn estimate(&self, value: &InstanceValue) -> Option<Estimate> {
        value.get(0).map(Estimate::scalar)
    }
}

/// Self-supervised: reconstructs every instance as 0, so its error is |x|.
pub struct Reconstruction;

impl Model for Reconstruction {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ESTIMATOR
    }

    fn is_supervised(&self) -> bool {
        false
    }

    fn train(&mut self, _store: &InstanceStore) -> anyhow::Result<()> {
        Ok(())
    }

    fn estimate_error(&self, value: &InstanceValue) -> Option<f64> {
        value.get(0).map(f64::abs)
    }
}
