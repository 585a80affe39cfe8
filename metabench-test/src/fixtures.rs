//! Synthetic measurements with known statistics.

use std::time::Duration;

use metabench_types::{BenchmarkResult, Measurement, Scenario};

/// Shorthand for a duration in whole milliseconds.
pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Builds a measurement from `(name, samples in milliseconds)` pairs.
pub fn measurement(parts: u32, segments: u32, results: &[(&str, &[u64])]) -> Measurement {
    let mut measurement = Measurement::new(Scenario::new(parts, segments));
    for (name, samples) in results {
        for &sample in *samples {
            measurement.record(name, ms(sample));
        }
    }
    measurement
}

/// A run that recorded `10ms, 20ms, 30ms` as `"Op"` for scenario `(1, 0)`.
pub fn single_op_run() -> BenchmarkResult {
    BenchmarkResult::new("Benchmark", vec![measurement(1, 0, &[("Op", &[10, 20, 30])])])
}

/// A run covering a `parts × segments` grid plus one scenario-less iterate measurement.
///
/// Every grid cell records `"Begin Object"` and `"Commit Object"`, with samples that grow with
/// the cell's parts and segments scaled by `factor`.
pub fn grid_run(name: &str, parts: &[u32], segments: &[u32], factor: u64) -> BenchmarkResult {
    let mut measurements = Vec::new();

    for &p in parts {
        for &s in segments {
            let base = factor * (1 + u64::from(p) + u64::from(s));
            let begin: Vec<u64> = (1..=20).map(|i| base + i).collect();
            let commit: Vec<u64> = (1..=20).map(|i| 2 * base + i).collect();
            measurements.push(measurement(
                p,
                s,
                &[("Begin Object", begin.as_slice()), ("Commit Object", commit.as_slice())],
            ));
        }
    }

    measurements.push(measurement(0, 0, &[("Iterate Objects", &[5, 6, 7])]));

    BenchmarkResult::new(name, measurements)
}
