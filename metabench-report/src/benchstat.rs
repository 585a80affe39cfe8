//! Benchmark-stat lines for external comparison tools.
//!
//! Every operation of every measurement is written as one line following the Go benchmark
//! format:
//!
//! ```text
//! BenchmarkBeginObject/parts=1/segments=2           50     1203311 ns/op     1802011 ns/p90     2010000 ns/p99
//! ```
//!
//! The format does not allow whitespace within benchmark names, so it is removed from the
//! operation name.

use std::io::{self, Write};

use metabench_types::{Measurement, Scenario};

use crate::histogram::{Histogram, HistogramOptions};

/// Writes one benchmark-stat line per operation of all measurements.
pub fn write_bench_stat<W: Write>(
    mut writer: W,
    measurements: &[Measurement],
    options: &HistogramOptions,
) -> io::Result<()> {
    for measurement in measurements {
        for result in measurement.results() {
            let Some(histogram) = Histogram::new(&result.durations, options) else {
                continue;
            };

            writeln!(
                writer,
                "{}  {:>10}  {:>10.0} ns/op  {:>10.0} ns/p90  {:>10.0} ns/p99",
                benchmark_name(&result.name, measurement.scenario()),
                histogram.count,
                histogram.average,
                histogram.p90,
                histogram.p99,
            )?;
        }
    }

    writer.flush()
}

/// Builds the benchmark name of an operation in a scenario.
pub fn benchmark_name(name: &str, scenario: Scenario) -> String {
    let test: String = name.split_whitespace().collect();
    format!(
        "Benchmark{test}/parts={}/segments={}",
        scenario.parts, scenario.segments
    )
}
