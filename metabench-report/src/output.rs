//! Selection of output formats.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use metabench_types::BenchmarkResult;
use serde::{Deserialize, Serialize};

use crate::benchstat::write_bench_stat;
use crate::error::{ReportError, ReportResult};
use crate::histogram::HistogramOptions;
use crate::plot::{PlotOptions, plot_percentiles};
use crate::table::write_table;

/// The supported output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Human-readable table (`table`).
    Table,
    /// Benchmark-stat lines (`std`).
    Std,
    /// The saved-run JSON format (`json`).
    Json,
    /// SVG percentile plot (`plot-percentile`).
    PlotPercentile,
}

impl OutputKind {
    /// All output kinds.
    pub const ALL: [OutputKind; 4] = [
        OutputKind::Table,
        OutputKind::Std,
        OutputKind::Json,
        OutputKind::PlotPercentile,
    ];

    /// The name used to select this output.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Table => "table",
            OutputKind::Std => "std",
            OutputKind::Json => "json",
            OutputKind::PlotPercentile => "plot-percentile",
        }
    }

    /// Returns `true` if this output can combine multiple runs.
    pub fn supports_multiple_runs(self) -> bool {
        matches!(self, OutputKind::PlotPercentile)
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`OutputKind`].
#[derive(Debug, thiserror::Error)]
#[error("output type `{0}` not supported, expected one of: table, std, json, plot-percentile")]
pub struct UnknownOutputKind(String);

impl FromStr for OutputKind {
    type Err = UnknownOutputKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownOutputKind(s.to_owned()))
    }
}

/// Options shared by all renderers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Statistics used by the table and benchmark-stat outputs.
    pub histogram: HistogramOptions,
    /// Layout of the percentile plot.
    pub plot: PlotOptions,
}

/// Renders the runs in the given output format.
///
/// Outputs other than [`OutputKind::PlotPercentile`] require exactly one run. This is checked
/// before anything is written to `writer`.
pub fn render<W: Write>(
    kind: OutputKind,
    runs: &[BenchmarkResult],
    options: &RenderOptions,
    writer: W,
) -> ReportResult<()> {
    if kind.supports_multiple_runs() {
        return plot_percentiles(writer, runs, &options.plot);
    }

    let [run] = runs else {
        return Err(ReportError::UnsupportedRunCount {
            output: kind,
            count: runs.len(),
        });
    };

    match kind {
        OutputKind::Table => write_table(writer, &run.measurements, &options.histogram)?,
        OutputKind::Std => write_bench_stat(writer, &run.measurements, &options.histogram)?,
        OutputKind::Json => run.write_json(writer)?,
        OutputKind::PlotPercentile => unreachable!("handled above"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use metabench_test::fixtures::{grid_run, single_op_run};

    use super::*;

    #[test]
    fn parses_all_kinds() {
        for kind in OutputKind::ALL {
            assert_eq!(kind.as_str().parse::<OutputKind>().unwrap(), kind);
        }
        assert!("csv".parse::<OutputKind>().is_err());
    }

    #[test]
    fn single_run_outputs_reject_multiple_runs() {
        let runs = [single_op_run(), single_op_run()];

        for kind in [OutputKind::Table, OutputKind::Std, OutputKind::Json] {
            let mut out = Vec::new();
            let err = render(kind, &runs, &RenderOptions::default(), &mut out).unwrap_err();

            assert!(
                matches!(err, ReportError::UnsupportedRunCount { output, count: 2 } if output == kind),
                "{err}"
            );
            assert!(out.is_empty(), "{kind} wrote partial output");
        }
    }

    #[test]
    fn single_run_outputs_reject_no_runs() {
        let mut out = Vec::new();
        let err = render(OutputKind::Table, &[], &RenderOptions::default(), &mut out).unwrap_err();

        assert!(matches!(err, ReportError::UnsupportedRunCount { count: 0, .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn plot_accepts_multiple_runs() {
        let runs = [
            grid_run("before", &[1, 2], &[0, 1], 1),
            grid_run("after", &[1, 2], &[0, 1], 2),
        ];

        let mut out = Vec::new();
        render(OutputKind::PlotPercentile, &runs, &RenderOptions::default(), &mut out).unwrap();

        let svg = String::from_utf8(out).unwrap();
        assert!(svg.contains(">before</text>"));
        assert!(svg.contains(">after</text>"));
    }

    #[test]
    fn json_output_decodes_to_same_run() {
        let run = single_op_run();

        let mut out = Vec::new();
        render(OutputKind::Json, std::slice::from_ref(&run), &RenderOptions::default(), &mut out)
            .unwrap();

        let decoded = BenchmarkResult::from_json(run.name.clone(), &out).unwrap();
        assert_eq!(decoded, run);
    }

    #[test]
    fn table_of_single_run() {
        let mut out = Vec::new();
        render(OutputKind::Table, &[single_op_run()], &RenderOptions::default(), &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        let row: Vec<_> = output.lines().nth(2).unwrap().split_whitespace().collect();
        assert_eq!(row[3..5], ["20.00", "30.00"]);
        assert_eq!(row[5], "20.00");
    }
}
