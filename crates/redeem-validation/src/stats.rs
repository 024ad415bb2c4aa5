//! Statistical helpers shared by the evaluators and the model comparer.
//!
//! Distribution quantiles come from `statrs`; everything here returns a
//! defined value (usually 0) instead of NaN when a denominator vanishes.
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::error::{EvalError, Result};

/// Weighted arithmetic mean. Returns 0 when the total weight is 0.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    assert_eq!(
        values.len(),
        weights.len(),
        "values and weights must have equal lengths"
    );
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
}

/// Unbiased sample variance. Returns 0 for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64
}

/// Weighted Pearson correlation coefficient.
///
/// Returns 0 when either series has zero variance.
pub fn pearson(x: &[f64], y: &[f64], weights: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len(), "series must have equal lengths");
    let mx = weighted_mean(x, weights);
    let my = weighted_mean(y, weights);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for ((a, b), w) in x.iter().zip(y).zip(weights) {
        let dx = a - mx;
        let dy = b - my;
        sxy += w * dx * dy;
        sxx += w * dx * dx;
        syy += w * dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        0.0
    } else {
        sxy / denom
    }
}

/// Two-sided standard normal factor for a confidence level, e.g. 1.96 for 0.95.
pub fn normal_factor(level: f64) -> Result<f64> {
    check_level(level)?;
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| EvalError::precondition(format!("standard normal: {}", e)))?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}

/// Two-sided Student-t critical value for a confidence level.
pub fn students_t_critical(level: f64, dof: f64) -> Result<f64> {
    check_level(level)?;
    Ok(students_t(dof)?.inverse_cdf((1.0 + level) / 2.0))
}

/// Two-sided p-value of a Student-t statistic.
pub fn students_t_p_value(t: f64, dof: f64) -> Result<f64> {
    if t.is_nan() {
        return Err(EvalError::precondition("t statistic is NaN"));
    }
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = students_t(dof)?;
    let p = 2.0 * (1.0 - dist.cdf(t.abs()));
    Ok(p.clamp(0.0, 1.0))
}

fn students_t(dof: f64) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, dof)
        .map_err(|e| EvalError::precondition(format!("Student-t with {} dof: {}", dof, e)))
}

fn check_level(level: f64) -> Result<()> {
    if level > 0.0 && level < 1.0 {
        Ok(())
    } else {
        Err(EvalError::precondition(format!(
            "confidence level must lie in (0, 1), got {}",
            level
        )))
    }
}
