//! Human-readable table of a single run.
//!
//! One row is written per measurement and operation, with all statistics in milliseconds:
//!
//! ```text
//! Parts    Segments                     Avg     Max     P50     P90     P99
//!                                       ms      ms      ms      ms      ms
//! 1        0           Begin Object     1.23    2.01    1.20    1.80    2.01
//! ```

use std::io::{self, Write};

use comfy_table::presets::NOTHING;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use metabench_types::Measurement;

use crate::histogram::{Histogram, HistogramOptions};

/// Spaces between two columns.
const PADDING: u16 = 4;

/// Writes the statistics of all measurements as an aligned table.
///
/// Operations without samples are skipped.
pub fn write_table<W: Write>(
    mut writer: W,
    measurements: &[Measurement],
    options: &HistogramOptions,
) -> io::Result<()> {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled)
        .add_row(["Parts", "Segments", "", "Avg", "Max", "P50", "P90", "P99"])
        .add_row(["", "", "", "ms", "ms", "ms", "ms", "ms"]);

    for measurement in measurements {
        let scenario = measurement.scenario();
        for result in measurement.results() {
            let Some(histogram) = Histogram::new(&result.durations, options) else {
                continue;
            };

            table.add_row([
                scenario.parts.to_string(),
                scenario.segments.to_string(),
                result.name.clone(),
                msec(histogram.average),
                msec(histogram.maximum),
                msec(histogram.p50),
                msec(histogram.p90),
                msec(histogram.p99),
            ]);
        }
    }

    for column in table.column_iter_mut() {
        column
            .set_padding((0, PADDING))
            .set_cell_alignment(CellAlignment::Left);
    }

    // padding of the last column is not part of the layout
    for line in table.lines() {
        writeln!(writer, "{}", line.trim_end())?;
    }
    writer.flush()
}

/// Formats nanoseconds as milliseconds with two decimals.
fn msec(nanos: f64) -> String {
    format!("{:.2}", nanos / 1e6)
}
