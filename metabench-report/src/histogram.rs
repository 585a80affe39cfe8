//! Summary statistics of duration samples.
//!
//! All values are nanoseconds as `f64`. The samples are copied and sorted, the input is never
//! modified. Two rank rules are used:
//!
//! - The fixed summary ranks ([`Histogram::p50`] and friends) take the sample at index
//!   `floor(q·n)`, clamped to the last sample.
//! - [`percentile`] is a nearest-rank query for an arbitrary `q`, taking the sample at index
//!   `ceil(q·n)`, clamped to the last sample. It never interpolates between samples.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::nice::nice_steps;

/// Options controlling the displayed range of a [`Histogram`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramOptions {
    /// Number of bins.
    pub bin_count: usize,
    /// Rounds the lower bound and bin spacing to nice numbers.
    pub nice_range: bool,
    /// Upper limit for the displayed maximum.
    #[serde(with = "humantime_serde")]
    pub clamp_maximum: Option<Duration>,
    /// Limits the displayed maximum to this percentile of the samples.
    pub clamp_percentile: Option<f64>,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bin_count: 10,
            nice_range: true,
            clamp_maximum: None,
            clamp_percentile: Some(0.999),
        }
    }
}

/// A single histogram bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bin {
    /// Lower bound of the bin in nanoseconds.
    pub start: f64,
    /// Number of samples in this bin.
    pub count: usize,
}

/// Summary statistics computed from a non-empty set of samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    /// Number of samples.
    pub count: usize,
    /// Smallest sample.
    pub minimum: f64,
    /// Largest sample, limited by the clamp options.
    pub maximum: f64,
    /// Largest sample, regardless of clamping.
    pub true_maximum: f64,
    /// Arithmetic mean.
    pub average: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Median.
    pub p50: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 99th percentile.
    pub p99: f64,
    /// 99.9th percentile.
    pub p999: f64,
    /// Bins spanning `minimum..=maximum`; samples above the displayed maximum land in the last bin.
    pub bins: Vec<Bin>,
}

impl Histogram {
    /// Computes the histogram of the given durations.
    ///
    /// Returns `None` if there are no samples.
    pub fn new(durations: &[Duration], options: &HistogramOptions) -> Option<Self> {
        let nanos: Vec<f64> = durations.iter().map(|d| d.as_nanos() as f64).collect();
        Self::from_nanos(&nanos, options)
    }

    /// Computes the histogram of samples given in nanoseconds.
    pub fn from_nanos(samples: &[f64], options: &HistogramOptions) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let sorted = sorted_copy(samples);
        let count = sorted.len();
        let minimum = sorted[0];
        let true_maximum = sorted[count - 1];

        let average = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|x| (x - average).powi(2)).sum::<f64>() / count as f64;

        let mut maximum = true_maximum;
        if let Some(clamp) = options.clamp_maximum {
            maximum = maximum.min(clamp.as_nanos() as f64);
        }
        if let Some(q) = options.clamp_percentile {
            let index = ((q.clamp(0.0, 1.0) * count as f64).floor() as usize).min(count - 1);
            maximum = maximum.min(sorted[index]);
        }

        let bins = bin_samples(&sorted, minimum, maximum, options);

        Some(Self {
            count,
            minimum,
            maximum,
            true_maximum,
            average,
            std_dev: variance.sqrt(),
            p50: sorted[fixed_rank(count, 500)],
            p90: sorted[fixed_rank(count, 900)],
            p99: sorted[fixed_rank(count, 990)],
            p999: sorted[fixed_rank(count, 999)],
            bins,
        })
    }
}

/// Returns the nearest-rank percentile `q` of samples sorted in ascending order.
///
/// The sample at index `ceil(q·n)` is returned, clamped to the last sample. Thus `q = 0` yields
/// the minimum and `q >= 1` the maximum. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let rank = (q.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.min(sorted.len() - 1)])
}

/// Converts durations to milliseconds, sorted in ascending order.
pub fn sorted_millis(durations: &[Duration]) -> Vec<f64> {
    let millis: Vec<f64> = durations.iter().map(|d| d.as_nanos() as f64 / 1e6).collect();
    sorted_copy(&millis)
}

fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Index of the fixed rank given in per mille.
fn fixed_rank(count: usize, per_mille: usize) -> usize {
    (count * per_mille / 1000).min(count - 1)
}

fn bin_samples(sorted: &[f64], minimum: f64, maximum: f64, options: &HistogramOptions) -> Vec<Bin> {
    let bin_count = options.bin_count.max(1);

    let (start, spacing) = if options.nice_range {
        nice_steps(minimum, maximum, bin_count)
    } else {
        (minimum, (maximum - minimum) / bin_count as f64)
    };

    let mut bins: Vec<Bin> = (0..bin_count)
        .map(|i| Bin {
            start: start + spacing * i as f64,
            count: 0,
        })
        .collect();

    for &sample in sorted {
        let index = if spacing > 0.0 {
            ((sample - start) / spacing).max(0.0) as usize
        } else {
            0
        };
        bins[index.min(bin_count - 1)].count += 1;
    }

    bins
}
