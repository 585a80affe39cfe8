use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use humantime_serde::re::humantime;

use crate::config::Config;
use crate::output::{self, OutputSpec};
use crate::{observability, runs};

/// Benchmarks the object metadata layer and reports latency distributions.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// metabase url, e.g. `memory://`
    #[argh(option)]
    database_url: Option<String>,

    /// number of objects per scenario
    #[argh(option)]
    count: Option<usize>,

    /// maximum benchmark time per scenario, e.g. `30s`
    #[argh(option, from_str_fn(parse_duration))]
    time: Option<Duration>,

    /// load measurements from a saved json run instead of benchmarking, repeatable
    #[argh(option)]
    load: Vec<PathBuf>,

    /// output as `type[:file]`, repeatable; types: table, std, json, plot-percentile
    #[argh(option)]
    out: Vec<OutputSpec>,
}

impl Args {
    /// Applies flags given on the command line on top of the loaded configuration.
    fn apply_to(&self, config: &mut Config) {
        if let Some(database_url) = &self.database_url {
            config.database_url.clone_from(database_url);
        }
        if let Some(count) = self.count {
            config.benchmark.count = count;
        }
        if let Some(time) = self.time {
            config.benchmark.max_duration = time;
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    observability::init_tracing();
    tracing::debug!(?config);

    let runs = if args.load.is_empty() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("benchmark-rt")
            .enable_all()
            .build()?;
        vec![runtime.block_on(runs::run_benchmark(&config))?]
    } else {
        runs::load_runs(&args.load)?
    };

    let outputs = if args.out.is_empty() {
        vec![OutputSpec::default()]
    } else {
        args.out
    };
    output::write_outputs(&outputs, &runs, &config.render, output::stdout());

    Ok(())
}

#[cfg(test)]
mod tests {
    use metabench_report::OutputKind;

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["metabase-benchmark"], args).unwrap()
    }

    #[test]
    fn repeatable_flags() {
        let args = parse(&[
            "--load",
            "a.json",
            "--load",
            "b.json",
            "--out",
            "table",
            "--out",
            "plot-percentile:plot.svg",
        ]);

        assert_eq!(args.load, [PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert_eq!(args.out.len(), 2);
        assert_eq!(args.out[1].kind, OutputKind::PlotPercentile);
        assert_eq!(args.out[1].file, Some(PathBuf::from("plot.svg")));
    }

    #[test]
    fn unknown_output_is_rejected() {
        assert!(Args::from_args(&["metabase-benchmark"], &["--out", "csv"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "--database-url",
            "memory://flags",
            "--count",
            "5",
            "--time",
            "1m",
        ]);

        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.database_url, "memory://flags");
        assert_eq!(config.benchmark.count, 5);
        assert_eq!(config.benchmark.max_duration, Duration::from_secs(60));
    }

    #[test]
    fn absent_flags_keep_config() {
        let args = parse(&[]);

        let mut config = Config::default();
        config.benchmark.count = 17;
        args.apply_to(&mut config);

        assert_eq!(config.benchmark.count, 17);
        assert_eq!(config.database_url, "memory://");
        assert!(args.out.is_empty());
    }

    #[test]
    fn invalid_duration() {
        assert!(Args::from_args(&["metabase-benchmark"], &["--time", "soon"]).is_err());
    }
}
