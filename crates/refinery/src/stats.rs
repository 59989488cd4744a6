//! Pure statistics helpers used by the processor.
//!
//! Everything here works on the non-null numeric cells of a column; nulls
//! never reach these functions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::table::Value;

// =============================================================================
// STREAMING STATISTICS
// =============================================================================
// Welford's online algorithm for computing mean and variance in a single pass.

/// Streaming statistics accumulator using Welford's algorithm.
#[derive(Debug, Clone)]
pub struct StreamingStats {
    count: usize,
    mean: f64,
    m2: f64, // Sum of squared differences from mean
    min: f64,
    max: f64,
}

impl StreamingStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Add a value using Welford's online algorithm.
    pub fn add(&mut self, value: f64) {
        self.count += 1;

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population variance (divides by n).
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    /// Population standard deviation.
    pub fn std(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

impl Default for StreamingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<f64> for StreamingStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = StreamingStats::new();
        for x in iter {
            stats.add(x);
        }
        stats
    }
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Quantile of already sorted values, linearly interpolated between the
/// two nearest ranks. `q` is clamped to `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Quantile of unsorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Row positions whose absolute z-score exceeds `threshold`.
///
/// Uses the population standard deviation. A column with zero (or
/// undefined) spread has no outliers.
pub fn zscore_outliers(values: &[(usize, f64)], threshold: f64) -> Vec<usize> {
    let stats: StreamingStats = values.iter().map(|&(_, x)| x).collect();
    let (Some(mean), Some(std)) = (stats.mean(), stats.std()) else {
        return Vec::new();
    };
    if std == 0.0 || !std.is_finite() {
        return Vec::new();
    }

    values
        .iter()
        .filter(|&&(_, x)| ((x - mean) / std).abs() > threshold)
        .map(|&(pos, _)| pos)
        .collect()
}

/// Tukey fences for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Fences `Q1 - k*IQR` and `Q3 + k*IQR`.
    pub fn compute(values: &[f64], multiplier: f64) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// True when `x` lies strictly outside the fences.
    pub fn is_outlier(&self, x: f64) -> bool {
        x < self.lower || x > self.upper
    }
}

/// Most frequent non-null value. Ties go to the smallest value in the
/// total value order.
pub fn mode<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: HashMap<&Value, usize> = HashMap::new();
    for value in values.into_iter().filter(|v| !v.is_null()) {
        *counts.entry(value).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.total_cmp(a)))
        .map(|(v, _)| v.clone())
}
