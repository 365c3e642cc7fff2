//! Reduction of one cycle's raw readings to a single mean/stddev pair.
//!
//! Failed reads never reach this module: the sampler filters them out, so a
//! sensor error cannot drag the mean toward zero.

use crate::sensor::Millimeters;

/// Share of samples discarded from each end when trimming.
pub const TRIM_FRACTION: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimPolicy {
    /// Sort and drop the top and bottom `TRIM_FRACTION` before averaging.
    #[default]
    Trimmed,
    Untrimmed,
}

impl TrimPolicy {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Trimmed } else { Self::Untrimmed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub mean: f64,
    /// Population standard deviation over every valid reading, trimmed or not.
    pub std_dev: f64,
    pub valid: usize,
    /// Readings that contributed to `mean`.
    pub retained: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `sqrt((1/n)·Σ(x − mean)²)`.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// Mean after sorting descending and discarding `floor(n·TRIM_FRACTION)` from each end.
pub fn trimmed_mean(values: &[f64]) -> Option<(f64, usize)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let offset = (sorted.len() as f64 * TRIM_FRACTION).floor() as usize;
    let kept = &sorted[offset..sorted.len() - offset];
    mean(kept).map(|mean| (mean, kept.len()))
}

/// Reduce the valid readings of one cycle. Returns `None` when there are none.
pub fn reduce(readings: &[Millimeters], policy: TrimPolicy) -> Option<SampleStats> {
    let values: Vec<f64> = readings.iter().map(|&mm| f64::from(mm)).collect();
    let std_dev = population_std_dev(&values)?;
    let (mean, retained) = match policy {
        TrimPolicy::Trimmed => trimmed_mean(&values)?,
        TrimPolicy::Untrimmed => (mean(&values)?, values.len()),
    };
    Some(SampleStats {
        mean,
        std_dev,
        valid: values.len(),
        retained,
    })
}
