//! Log capture for tests.

use tracing_subscriber::EnvFilter;

/// Used unless `RUST_LOG` is set.
const DEFAULT_DIRECTIVES: &str = "error,metabench_driver=trace,metabench_s3client=trace,metabench_report=debug,metabench_cli=debug";

/// Installs a compact subscriber that writes to the output captured by the test runner.
///
/// Only the first call in a test binary has an effect.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    #[test]
    fn repeated_init() {
        super::init();
        super::init();
    }
}
