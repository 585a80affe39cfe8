//! Benchmarks the object metadata layer and renders latency reports.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    metabench_cli::cli::execute()
}
