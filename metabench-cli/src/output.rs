//! Writing reports to their destinations.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use metabench_report::output::UnknownOutputKind;
use metabench_report::{OutputKind, RenderOptions, ReportResult, render};
use metabench_types::BenchmarkResult;

/// A requested output, parsed from `type[:file]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSpec {
    /// The output format.
    pub kind: OutputKind,
    /// Destination file, stdout if absent.
    pub file: Option<PathBuf>,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            kind: OutputKind::Table,
            file: None,
        }
    }
}

impl FromStr for OutputSpec {
    type Err = UnknownOutputKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, file) = match s.split_once(':') {
            Some((kind, file)) => (kind, Some(file).filter(|f| !f.is_empty())),
            None => (s, None),
        };

        Ok(Self {
            kind: kind.parse()?,
            file: file.map(PathBuf::from),
        })
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", self.kind, file.display()),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Writes every requested output.
///
/// Outputs are independent: a failing output is logged and the remaining ones are still
/// written. Returns the number of outputs that failed.
pub fn write_outputs<W: Write>(
    outputs: &[OutputSpec],
    runs: &[BenchmarkResult],
    options: &RenderOptions,
    mut stdout: W,
) -> usize {
    let mut failed = 0;

    for output in outputs {
        if let Err(error) = write_output(output, runs, options, &mut stdout) {
            tracing::error!(
                %output,
                error = &error as &dyn std::error::Error,
                "writing output failed"
            );
            failed += 1;
        }
    }

    failed
}

/// Renders a single output into its file, or into `stdout` if it has none.
///
/// If the file cannot be created, the output is written to `stdout` instead.
pub fn write_output<W: Write>(
    output: &OutputSpec,
    runs: &[BenchmarkResult],
    options: &RenderOptions,
    stdout: &mut W,
) -> ReportResult<()> {
    if let Some(path) = &output.file {
        match File::create(path) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                render(output.kind, runs, options, &mut writer)?;
                writer.flush()?;
                return Ok(());
            }
            Err(error) => tracing::error!(
                file = %path.display(),
                error = &error as &dyn std::error::Error,
                "failed to open file, writing to stdout"
            ),
        }
    }

    render_to_stdout(output.kind, runs, options, stdout)
}

fn render_to_stdout<W: Write>(
    kind: OutputKind,
    runs: &[BenchmarkResult],
    options: &RenderOptions,
    stdout: &mut W,
) -> ReportResult<()> {
    // render into a buffer first, so that rejected outputs leave stdout untouched
    let mut buffer = Vec::new();
    render(kind, runs, options, &mut buffer)?;

    writeln!(stdout)?;
    stdout.write_all(&buffer)?;
    stdout.flush()?;
    Ok(())
}

/// Returns a locked handle to stdout.
pub fn stdout() -> impl Write {
    io::stdout().lock()
}

#[cfg(test)]
mod tests {
    use metabench_test::fixtures::single_op_run;

    use super::*;

    #[test]
    fn parse_spec() {
        assert_eq!("table".parse::<OutputSpec>().unwrap(), OutputSpec::default());
        assert_eq!(
            "plot-percentile:out/plot.svg".parse::<OutputSpec>().unwrap(),
            OutputSpec {
                kind: OutputKind::PlotPercentile,
                file: Some(PathBuf::from("out/plot.svg")),
            }
        );
        assert_eq!("json:".parse::<OutputSpec>().unwrap().file, None);
        assert!("svg:plot.svg".parse::<OutputSpec>().is_err());
    }

    #[test]
    fn spec_display() {
        let spec: OutputSpec = "std:stats.txt".parse().unwrap();
        assert_eq!(spec.to_string(), "std:stats.txt");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let output = OutputSpec {
            kind: OutputKind::Json,
            file: Some(path.clone()),
        };

        let mut stdout = Vec::new();
        write_output(&output, &[single_op_run()], &RenderOptions::default(), &mut stdout).unwrap();

        assert!(stdout.is_empty());
        let loaded = BenchmarkResult::load(&path).unwrap();
        assert_eq!(loaded.measurements, single_op_run().measurements);
    }

    #[test]
    fn unwritable_file_falls_back_to_stdout() {
        metabench_test::tracing::init();

        let dir = tempfile::tempdir().unwrap();
        let output = OutputSpec {
            kind: OutputKind::Table,
            file: Some(dir.path().join("missing").join("table.txt")),
        };

        let mut stdout = Vec::new();
        write_output(&output, &[single_op_run()], &RenderOptions::default(), &mut stdout).unwrap();

        let text = String::from_utf8(stdout).unwrap();
        assert!(text.starts_with('\n'));
        assert!(text.contains("Parts"));
    }

    #[test]
    fn failing_output_does_not_stop_others() {
        metabench_test::tracing::init();

        let runs = [single_op_run(), single_op_run()];
        let outputs = [
            OutputSpec::default(),
            "plot-percentile".parse().unwrap(),
        ];

        let mut stdout = Vec::new();
        let failed = write_outputs(&outputs, &runs, &RenderOptions::default(), &mut stdout);

        assert_eq!(failed, 1);
        let text = String::from_utf8(stdout).unwrap();
        assert!(!text.contains("Parts"));
        assert!(text.contains("<svg"));
    }
}
