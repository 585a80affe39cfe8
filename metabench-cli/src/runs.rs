//! Obtaining the runs to report on.

use std::path::PathBuf;

use anyhow::{Context, Result};
use metabench_driver::{Benchmark, metabase};
use metabench_types::BenchmarkResult;

use crate::config::Config;

/// Display name of a live benchmark run.
pub const LIVE_RUN_NAME: &str = "Benchmark";

/// Loads saved runs, named after their file stems.
///
/// Fails on the first file that cannot be read or decoded.
pub fn load_runs(paths: &[PathBuf]) -> Result<Vec<BenchmarkResult>> {
    paths
        .iter()
        .map(|path| {
            let run = BenchmarkResult::load(path)
                .with_context(|| format!("failed to load measurements from {}", path.display()))?;
            tracing::info!(
                name = %run.name,
                measurements = run.measurements.len(),
                "loaded run"
            );
            Ok(run)
        })
        .collect()
}

/// Runs the benchmark against the configured metabase.
///
/// Scenarios that failed are logged; their partial measurements are part of the result.
pub async fn run_benchmark(config: &Config) -> Result<BenchmarkResult> {
    let metabase = metabase::open(&config.database_url)
        .with_context(|| format!("failed to open metabase at {}", config.database_url))?;

    let mut benchmark = Benchmark::new(metabase, config.benchmark.clone());
    let run = benchmark.run().await.context("benchmark failed")?;

    if !run.failures.is_empty() {
        tracing::warn!(
            failed = run.failures.len(),
            "benchmark finished with failed scenarios"
        );
    }

    Ok(BenchmarkResult::new(LIVE_RUN_NAME, run.measurements))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use metabench_test::fixtures::single_op_run;

    use super::*;

    #[test]
    fn loads_named_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("before.json");
        single_op_run()
            .write_json(fs::File::create(&path).unwrap())
            .unwrap();

        let runs = load_runs(&[path]).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "before");
        assert_eq!(runs[0].measurements, single_op_run().measurements);
    }

    #[test]
    fn malformed_run_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        single_op_run()
            .write_json(fs::File::create(&good).unwrap())
            .unwrap();
        fs::write(&bad, "[{\"Parts\": ").unwrap();

        let err = load_runs(&[good, bad]).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[tokio::test]
    async fn unsupported_database() {
        let config = Config {
            database_url: "postgres://localhost/benchmark".into(),
            ..Default::default()
        };

        let err = run_benchmark(&config).await.unwrap_err();
        assert!(err.to_string().contains("postgres://localhost/benchmark"));
    }

    #[tokio::test]
    async fn live_run() {
        metabench_test::tracing::init();

        let mut config = Config::default();
        config.benchmark.count = 2;
        config.benchmark.parts_variants = vec![1];
        config.benchmark.segment_variants = vec![1];
        config.benchmark.progress = false;

        let run = run_benchmark(&config).await.unwrap();
        assert_eq!(run.name, LIVE_RUN_NAME);
        // upload, iterate, list segments, download, delete
        assert_eq!(run.measurements.len(), 5);
    }
}
