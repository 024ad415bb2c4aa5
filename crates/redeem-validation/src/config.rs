use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// How a store is partitioned into folds.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// A single held-out fold holding `test_fraction` of the instances.
    TrainTest { test_fraction: f64 },
    /// `folds` disjoint test folds covering every instance once.
    CrossValidation { folds: usize },
    /// One fold per instance.
    LeaveOneOut,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        SplitPolicy::CrossValidation { folds: 10 }
    }
}

impl SplitPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            SplitPolicy::TrainTest { test_fraction } => {
                if !(test_fraction > 0.0 && test_fraction < 1.0) {
                    return Err(EvalError::configuration(format!(
                        "test fraction must lie in (0, 1), got {}",
                        test_fraction
                    )));
                }
            }
            SplitPolicy::CrossValidation { folds } => {
                if folds < 2 {
                    return Err(EvalError::configuration(format!(
                        "cross-validation needs at least 2 folds, got {}",
                        folds
                    )));
                }
            }
            SplitPolicy::LeaveOneOut => {}
        }
        Ok(())
    }
}

impl FromStr for SplitPolicy {
    type Err = String;

    /// Accepts `loo`, `cv`, `cv:<k>`, `train_test` and `train_test:<fraction>`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (name, arg) = match lower.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (lower.as_str(), None),
        };
        match (name, arg) {
            ("loo" | "leave_one_out", None) => Ok(SplitPolicy::LeaveOneOut),
            ("cv" | "cross_validation", None) => Ok(SplitPolicy::CrossValidation { folds: 10 }),
            ("cv" | "cross_validation", Some(k)) => k
                .parse::<usize>()
                .map(|folds| SplitPolicy::CrossValidation { folds })
                .map_err(|e| format!("Invalid fold count '{}': {}", k, e)),
            ("train_test" | "tt", None) => Ok(SplitPolicy::TrainTest { test_fraction: 0.3 }),
            ("train_test" | "tt", Some(f)) => f
                .parse::<f64>()
                .map(|test_fraction| SplitPolicy::TrainTest { test_fraction })
                .map_err(|e| format!("Invalid test fraction '{}': {}", f, e)),
            _ => Err(format!(
                "Unknown split policy: {}. Expected loo, cv[:k] or train_test[:fraction]",
                s
            )),
        }
    }
}

/// Goal balancing applied by the batch sampler.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceMode {
    #[default]
    None,
    /// Equal mass per goal class.
    Class,
    /// Equal mass per class, split evenly over the distinct goal values of each class.
    ClassValue,
}

impl FromStr for BalanceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(BalanceMode::None),
            "class" => Ok(BalanceMode::Class),
            "class_value" | "classvalue" => Ok(BalanceMode::ClassValue),
            _ => Err(format!("Unknown balance mode: {}", s)),
        }
    }
}

/// Whether the sampler asks its source to reload before every batch.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Reload once, then only re-draw indices.
    #[default]
    Reorder,
    Refresh,
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reorder" => Ok(RefreshMode::Reorder),
            "refresh" => Ok(RefreshMode::Refresh),
            _ => Err(format!("Unknown refresh mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub sample_fraction: f64,
    pub balance: BalanceMode,
    pub refresh: RefreshMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_fraction: 1.0,
            balance: BalanceMode::None,
            refresh: RefreshMode::Reorder,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(EvalError::configuration(format!(
                "sample fraction must lie in (0, 1], got {}",
                self.sample_fraction
            )));
        }
        Ok(())
    }
}

/// Parameters for a single validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub split: SplitPolicy,
    /// Evaluate the model as-is without retraining per fold.
    pub skip_train: bool,
    /// Number of intervals in ROC and gain curves; curves have `curve_resolution + 1` points.
    pub curve_resolution: usize,
    pub confidence_level: f64,
    pub seed: Option<u64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            split: SplitPolicy::default(),
            skip_train: false,
            curve_resolution: 100,
            confidence_level: 0.95,
            seed: None,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        if self.curve_resolution == 0 {
            return Err(EvalError::configuration("curve resolution must be positive"));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(EvalError::configuration(format!(
                "confidence level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }

    /// Random stream for this run: seeded when `seed` is set, from entropy otherwise.
    pub fn rng(&self) -> ChaCha8Rng {
        seeded_rng(self.seed)
    }
}

/// Parameters for a paired comparison of two models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparerConfig {
    /// Number of repeated cross-validation runs (R).
    pub repeats: usize,
    /// Folds per cross-validation run (k).
    pub folds: usize,
    pub skip_train: bool,
    pub seed: Option<u64>,
}

impl Default for ComparerConfig {
    fn default() -> Self {
        Self {
            repeats: 10,
            folds: 10,
            skip_train: false,
            seed: None,
        }
    }
}

impl ComparerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.repeats < 2 {
            return Err(EvalError::configuration(format!(
                "paired comparison needs at least 2 repeats, got {}",
                self.repeats
            )));
        }
        SplitPolicy::CrossValidation { folds: self.folds }.validate()
    }

    /// Configuration handed to each underlying validation run.
    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            split: SplitPolicy::CrossValidation { folds: self.folds },
            skip_train: self.skip_train,
            seed: self.seed,
            ..ValidationConfig::default()
        }
    }

    pub fn rng(&self) -> ChaCha8Rng {
        seeded_rng(self.seed)
    }
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Load any of the configuration structs from a JSON file.
pub fn load_config<T, P>(path: P) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: T = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
