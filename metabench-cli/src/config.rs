//! Configuration for the benchmark binary.
//!
//! Configuration is layered with the following precedence (highest to lowest):
//!
//! 1. Command line flags
//! 2. Environment variables (prefixed with `MB__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! # Environment Variables
//!
//! Environment variables use `MB__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `MB__DATABASE_URL=memory://` selects the metabase
//! - `MB__COUNT=10` uploads ten objects per scenario
//! - `MB__HISTOGRAM__CLAMP_PERCENTILE=0.99` clamps the displayed maximum
//!
//! # YAML Configuration File
//!
//! ```yaml
//! database_url: memory://
//! count: 10
//! max_duration: 30s
//! parts_variants: [1, 2]
//! segment_variants: [0, 1, 11]
//!
//! histogram:
//!   clamp_percentile: 0.99
//! ```

use std::path::Path;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use metabench_driver::BenchmarkConfig;
use metabench_report::RenderOptions;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "MB__";

/// Configuration of a benchmark invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the metabase under benchmark.
    ///
    /// # Default
    ///
    /// `memory://`
    pub database_url: String,

    /// Scenarios and limits of the benchmark run.
    #[serde(flatten)]
    pub benchmark: BenchmarkConfig,

    /// Statistics and plot layout of the rendered outputs.
    #[serde(flatten)]
    pub render: RenderOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "memory://".into(),
            benchmark: BenchmarkConfig::default(),
            render: RenderOptions::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from defaults, an optional YAML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.database_url, "memory://");
            assert_eq!(config.benchmark.count, 50);
            assert_eq!(config.benchmark.max_duration, Duration::from_secs(120));
            assert_eq!(config.benchmark.bucket_name, "benchmark");
            assert_eq!(config.benchmark.parts_variants, [1, 2, 10]);
            assert_eq!(config.benchmark.segment_variants, [0, 1, 2, 3, 11]);
            assert_eq!(config.benchmark.redundancy.total_shares, 90);
            assert!(config.benchmark.progress);
            assert_eq!(config.render.histogram.bin_count, 10);
            assert_eq!(config.render.histogram.clamp_percentile, Some(0.999));
            assert_eq!(config.render.plot.percentile_power, 2.0);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__DATABASE_URL", "memory://other");
            jail.set_env("MB__COUNT", "7");
            jail.set_env("MB__MAX_DURATION", "30s");
            jail.set_env("MB__PROJECT_ID", "67e55044-10b1-426f-9247-bb680e5fe0c8");
            jail.set_env("MB__PARTS_VARIANTS", "[1, 3]");
            jail.set_env("MB__REDUNDANCY__OPTIMAL_SHARES", "40");
            jail.set_env("MB__HISTOGRAM__CLAMP_PERCENTILE", "0.99");
            jail.set_env("MB__PLOT__PERCENTILE_POWER", "3");

            let config = Config::load(None).unwrap();

            assert_eq!(config.database_url, "memory://other");
            assert_eq!(config.benchmark.count, 7);
            assert_eq!(config.benchmark.max_duration, Duration::from_secs(30));
            assert_eq!(
                config.benchmark.project_id.to_string(),
                "67e55044-10b1-426f-9247-bb680e5fe0c8"
            );
            assert_eq!(config.benchmark.parts_variants, [1, 3]);
            assert_eq!(config.benchmark.redundancy.optimal_shares, 40);
            assert_eq!(config.benchmark.redundancy.required_shares, 29);
            assert_eq!(config.render.histogram.clamp_percentile, Some(0.99));
            assert_eq!(config.render.plot.percentile_power, 3.0);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            count: 3
            max_duration: 1m 30s
            segment_variants: [0, 11]
            progress: false
            histogram:
                bin_count: 20
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.benchmark.count, 3);
            assert_eq!(config.benchmark.max_duration, Duration::from_secs(90));
            assert_eq!(config.benchmark.segment_variants, [0, 11]);
            assert!(!config.benchmark.progress);
            assert_eq!(config.render.histogram.bin_count, 20);
            // untouched nested values keep their defaults
            assert!(config.render.histogram.nice_range);

            Ok(())
        });
    }

    #[test]
    fn env_overrides_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            count: 3
            bucket_name: from-yaml
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("MB__COUNT", "9");

            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.benchmark.count, 9);
            assert_eq!(config.benchmark.bucket_name, "from-yaml");

            Ok(())
        });
    }
}
