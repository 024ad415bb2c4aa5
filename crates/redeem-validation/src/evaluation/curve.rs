//! Fixed-length ROC and gain curves derived from confidence rankings.
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use plotly::Plot;
use serde::Serialize;

use crate::error::{EvalError, Result};
use crate::report::plots;

/// One classified instance in a confidence ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedInstance {
    /// Position in the validated store.
    pub index: usize,
    pub confidence: f64,
    /// Whether the actual goal is the positive class.
    pub positive: bool,
}

/// Sort by descending confidence; ties keep their store order.
pub fn rank(mut entries: Vec<RankedInstance>) -> Vec<RankedInstance> {
    entries.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.index.cmp(&b.index))
    });
    entries
}

/// Ordered (x, y) points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.0).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.1).collect()
    }

    /// Trapezoidal area under the curve.
    pub fn area(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum()
    }

    /// Point-wise average of curves sampled on the same grid.
    pub fn average(curves: &[Curve]) -> Option<Curve> {
        let first = curves.first()?;
        if curves.iter().any(|c| c.len() != first.len()) {
            return None;
        }
        let n = curves.len() as f64;
        let points = (0..first.len())
            .map(|i| {
                let y = curves.iter().map(|c| c.points[i].1).sum::<f64>() / n;
                (first.points[i].0, y)
            })
            .collect();
        Some(Curve { points })
    }

    /// Write the points as delimited text with an `x`/`y` header.
    pub fn write_delimited<W: Write>(&self, writer: W, delimiter: u8) -> anyhow::Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        wtr.write_record(["x", "y"])?;
        for (x, y) in &self.points {
            wtr.write_record([x.to_string(), y.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Line plot of the curve; see [`crate::report::plots`] for ROC and gain styling.
    pub fn to_plot(&self, title: &str) -> Plot {
        plots::plot_curve(self, title, "x", "y")
    }

    pub fn save_delimited<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> anyhow::Result<()> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create curve file: {}", path.as_ref().display()))?;
        self.write_delimited(file, delimiter)
    }
}

/// `resolution + 1` points from 0 to 1, both ends exact.
fn grid(resolution: usize) -> Vec<f64> {
    (0..=resolution)
        .map(|i| i as f64 / resolution as f64)
        .collect()
}

/// Piecewise-linear lookup on monotone vertices. Where several vertices share
/// an x, the last (highest) one wins.
fn interpolate(vertices: &[(f64, f64)], x: f64) -> f64 {
    let upto = vertices.partition_point(|v| v.0 <= x);
    if upto == 0 {
        return vertices.first().map(|v| v.1).unwrap_or(0.0);
    }
    let (x0, y0) = vertices[upto - 1];
    match vertices.get(upto) {
        Some(&(x1, y1)) if x1 > x0 => y0 + (y1 - y0) * (x - x0) / (x1 - x0),
        _ => y0,
    }
}

/// Groups of equal confidence in a ranking, as (count, positives).
fn tie_groups(ranked: &[RankedInstance]) -> Vec<(usize, usize)> {
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut last: Option<f64> = None;
    for r in ranked {
        if last != Some(r.confidence) {
            groups.push((0, 0));
            last = Some(r.confidence);
        }
        if let Some(g) = groups.last_mut() {
            g.0 += 1;
            g.1 += r.positive as usize;
        }
    }
    groups
}

fn class_totals(ranked: &[RankedInstance]) -> Result<(usize, usize)> {
    let positives = ranked.iter().filter(|r| r.positive).count();
    let negatives = ranked.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(EvalError::precondition(format!(
            "curve needs both classes, got {} positive and {} negative instances",
            positives, negatives
        )));
    }
    Ok((positives, negatives))
}

/// ROC curve (false-positive rate, true-positive rate) sampled at
/// `resolution + 1` evenly spaced false-positive rates.
pub fn roc_curve(ranked: &[RankedInstance], resolution: usize) -> Result<Curve> {
    let (positives, negatives) = class_totals(ranked)?;

    let mut vertices = vec![(0.0, 0.0)];
    let (mut tp, mut fp) = (0usize, 0usize);
    for (count, pos) in tie_groups(ranked) {
        tp += pos;
        fp += count - pos;
        vertices.push((fp as f64 / negatives as f64, tp as f64 / positives as f64));
    }

    let points = grid(resolution)
        .into_iter()
        .map(|x| (x, interpolate(&vertices, x)))
        .collect();
    Ok(Curve { points })
}

/// Gain chart: for the top fraction x of the ranking, the positive rate
/// relative to the overall positive rate, minus one.
pub fn gain_chart(ranked: &[RankedInstance], resolution: usize) -> Result<Curve> {
    let (positives, _) = class_totals(ranked)?;
    let total = ranked.len() as f64;
    let overall_rate = positives as f64 / total;

    // cumulative (instances, positives) at each tie-group boundary
    let mut vertices = vec![(0.0, 0.0)];
    let (mut seen, mut pos_seen) = (0usize, 0usize);
    let groups = tie_groups(ranked);
    for &(count, pos) in &groups {
        seen += count;
        pos_seen += pos;
        vertices.push((seen as f64 / total, pos_seen as f64));
    }
    let head_rate = groups
        .first()
        .map(|&(count, pos)| pos as f64 / count as f64)
        .unwrap_or(overall_rate);

    let points = grid(resolution)
        .into_iter()
        .map(|x| {
            let rate = if x <= 0.0 {
                head_rate
            } else {
                interpolate(&vertices, x) / (x * total)
            };
            (x, rate / overall_rate - 1.0)
        })
        .collect();
    Ok(Curve { points })
}
