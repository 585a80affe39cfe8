//! Percentile plots comparing any number of runs.
//!
//! The image starts with a header naming every run in its color. Below follows one section per
//! operation name. Each section is a grid of small plots with one row per `parts` value and one
//! column per `segments` value. Every cell draws one percentile curve per run that measured the
//! operation in that scenario. All cells of a section share the same y-axis, so they can be
//! compared visually.
//!
//! Operations that were only measured without a scenario (such as iterating all objects) have
//! nothing to lay out on a grid and are drawn as a placeholder.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use metabench_types::{BenchmarkResult, Scenario};
use serde::{Deserialize, Serialize};

use crate::error::ReportResult;
use crate::histogram::{percentile, sorted_millis};
use crate::nice::nice_ceil;
use crate::svg::{Anchor, Rgb, Svg, TextStyle};

const PAD: f64 = 5.0;
const HEADER_HEIGHT: f64 = 25.0 + PAD * 2.0;
const CAPTION_HEIGHT: f64 = 20.0 + PAD * 2.0;
const GRID_CELL_HEIGHT: f64 = 150.0;
const GRID_ROW_GAP: f64 = 5.0;
const GRID_CELL_WIDTH: f64 = 200.0;

/// The y-axis of a section covers this percentile of every curve.
const Y_BOUND_PERCENTILE: f64 = 0.98;
/// Lower limit for the y-axis bound, in milliseconds.
const MIN_Y_BOUND: f64 = 0.1;

const X_TICKS: &[(f64, &str)] = &[
    (0.25, "25"),
    (0.5, "50"),
    (0.75, "75"),
    (0.9, "90"),
    (0.95, "95"),
    (0.99, "99"),
];

/// Colors of the runs, reused cyclically.
const PALETTE: &[Rgb] = &[Rgb(0, 200, 0), Rgb(0, 0, 200), Rgb(200, 0, 0)];

const WHITE: Rgb = Rgb(255, 255, 255);
const FRAME: Rgb = Rgb(160, 160, 160);
const GRID_LINE: Rgb = Rgb(220, 220, 220);
const MUTED: Rgb = Rgb(120, 120, 120);

const STYLE: &str = "\ntext { font-family: sans-serif; }\n.bold { font-weight: bolder; }\nsvg { background: #fff; }\n";

/// Options for [`plot_percentiles`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// Exponent of the percentile axis transform.
    ///
    /// A percentile `p` is drawn at `1 - (1 - p)^(1 / power)`, which widens the tail of the
    /// distribution. A power of `1` draws percentiles linearly.
    pub percentile_power: f64,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            percentile_power: 2.0,
        }
    }
}

impl PlotOptions {
    fn transform(&self, p: f64) -> f64 {
        let power = if self.percentile_power > 0.0 {
            self.percentile_power
        } else {
            1.0
        };
        1.0 - (1.0 - p.clamp(0.0, 1.0)).powf(1.0 / power)
    }
}

/// Returns the color of the run at the given index.
pub(crate) fn run_color(index: usize) -> Rgb {
    PALETTE[index % PALETTE.len()]
}

/// The sorted samples of one run for one cell, in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    /// Index of the run this curve belongs to.
    pub run: usize,
    /// Samples in ascending order.
    pub millis: Vec<f64>,
}

/// The cells of a gridded section.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    /// Upper bound of the shared y-axis, in milliseconds.
    pub y_max: f64,
    cells: HashMap<Scenario, Vec<Curve>>,
}

impl Grid {
    /// Returns the curves of one cell.
    pub fn cell(&self, scenario: Scenario) -> &[Curve] {
        self.cells.get(&scenario).map(Vec::as_slice).unwrap_or_default()
    }
}

/// How a section is laid out.
#[derive(Clone, Debug, PartialEq)]
pub enum SectionLayout {
    /// The operation has no scenario grid.
    Placeholder,
    /// One cell per scenario.
    Grid(Grid),
}

/// All plots of one operation name.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    /// The operation name.
    pub name: String,
    /// The layout of this section.
    pub layout: SectionLayout,
}

/// The laid out contents of a percentile plot, before drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct PercentilePlot {
    /// Display names of all runs.
    pub runs: Vec<String>,
    /// Distinct `parts` values in first-seen order, one grid row each.
    pub parts: Vec<u32>,
    /// Distinct `segments` values in first-seen order, one grid column each.
    pub segments: Vec<u32>,
    /// One section per operation name.
    pub sections: Vec<Section>,
}

impl PercentilePlot {
    /// Collects sections and grid cells from the given runs.
    pub fn build(runs: &[BenchmarkResult]) -> Self {
        // Scan in reverse, since the first measurements of a run don't contain all the names.
        let mut names = Vec::new();
        for run in runs {
            for measurement in run.measurements.iter().rev() {
                for result in measurement.results().iter().rev() {
                    if !result.is_empty() {
                        include(&mut names, &result.name);
                    }
                }
            }
        }
        names.reverse();

        let mut parts = Vec::new();
        let mut segments = Vec::new();
        for measurement in runs.iter().flat_map(|run| &run.measurements) {
            let scenario = measurement.scenario();
            if scenario.is_none() {
                continue;
            }
            include(&mut parts, &scenario.parts);
            include(&mut segments, &scenario.segments);
        }

        let sections = names
            .into_iter()
            .map(|name| {
                let layout = build_layout(runs, &name, &parts, &segments);
                Section { name, layout }
            })
            .collect();

        Self {
            runs: runs.iter().map(|run| run.name.clone()).collect(),
            parts,
            segments,
            sections,
        }
    }

    /// Width of the image in pixels.
    pub fn width(&self) -> f64 {
        self.segments.len().max(1) as f64 * GRID_CELL_WIDTH + CAPTION_HEIGHT
    }

    /// Height of the image in pixels.
    pub fn height(&self) -> f64 {
        let grid_height = CAPTION_HEIGHT + self.parts.len() as f64 * (GRID_CELL_HEIGHT + GRID_ROW_GAP);

        self.sections
            .iter()
            .map(|section| match section.layout {
                SectionLayout::Placeholder => CAPTION_HEIGHT * 2.0,
                SectionLayout::Grid(_) => CAPTION_HEIGHT + grid_height,
            })
            .sum::<f64>()
            + HEADER_HEIGHT
    }

    /// Renders the plot as an SVG document.
    pub fn to_svg(&self, options: &PlotOptions) -> Result<String, fmt::Error> {
        let width = self.width();
        let mut svg = Svg::new(width, self.height(), STYLE)?;

        let slot = (width - PAD * 2.0) / self.runs.len().max(1) as f64;
        for (index, name) in self.runs.iter().enumerate() {
            let style = TextStyle {
                size: 15.0,
                fill: run_color(index),
                anchor: Anchor::Middle,
                class: Some("bold"),
            };
            let x = PAD + slot * index as f64 + slot / 2.0;
            svg.text(x, HEADER_HEIGHT / 2.0, style, name)?;
        }

        let mut y = HEADER_HEIGHT;
        for section in &self.sections {
            let caption = format!("[{}]", section.name);
            svg.text(PAD, y + CAPTION_HEIGHT / 2.0, TextStyle::default(), &caption)?;
            y += CAPTION_HEIGHT;

            match &section.layout {
                SectionLayout::Placeholder => {
                    let style = TextStyle {
                        fill: MUTED,
                        class: Some("placeholder"),
                        ..Default::default()
                    };
                    let text = "no parts/segments scenario";
                    svg.text(PAD + CAPTION_HEIGHT, y + CAPTION_HEIGHT / 2.0, style, text)?;
                    y += CAPTION_HEIGHT;
                }
                SectionLayout::Grid(grid) => {
                    y = self.draw_grid(&mut svg, grid, y, options)?;
                }
            }
        }

        Ok(svg.finish())
    }

    fn draw_grid(&self, svg: &mut Svg, grid: &Grid, mut y: f64, options: &PlotOptions) -> Result<f64, fmt::Error> {
        let left = PAD + CAPTION_HEIGHT;
        let cell_width = (self.width() - PAD * 2.0 - CAPTION_HEIGHT) / self.segments.len().max(1) as f64;

        for (column, segments) in self.segments.iter().enumerate() {
            let style = TextStyle {
                anchor: Anchor::Middle,
                ..Default::default()
            };
            let x = left + cell_width * column as f64 + cell_width / 2.0;
            svg.text(x, y + CAPTION_HEIGHT / 2.0, style, &format!("segments:{segments}"))?;
        }
        y += CAPTION_HEIGHT;

        for parts in &self.parts {
            svg.text(PAD, y + GRID_CELL_HEIGHT / 2.0, TextStyle::default(), &format!("P:{parts}"))?;

            for (column, segments) in self.segments.iter().enumerate() {
                let area = Area {
                    x: left + cell_width * column as f64,
                    y,
                    width: cell_width,
                    height: GRID_CELL_HEIGHT,
                };
                let curves = grid.cell(Scenario::new(*parts, *segments));
                self.draw_cell(svg, area, curves, grid.y_max, options)?;
            }

            y += GRID_CELL_HEIGHT + GRID_ROW_GAP;
        }

        Ok(y)
    }

    fn draw_cell(
        &self,
        svg: &mut Svg,
        area: Area,
        curves: &[Curve],
        y_max: f64,
        options: &PlotOptions,
    ) -> fmt::Result {
        svg.rect(area.x, area.y, area.width, area.height, FRAME, WHITE)?;

        let left = area.x + 2.0;
        let right = area.x + area.width - 2.0;
        let top = area.y + 2.0;
        let bottom = area.y + area.height - 12.0;

        let label = TextStyle {
            size: 8.0,
            fill: MUTED,
            anchor: Anchor::Middle,
            class: None,
        };

        for &(p, text) in X_TICKS {
            let x = left + options.transform(p) * (right - left);
            svg.line((x, top), (x, bottom), GRID_LINE)?;
            svg.text(x, bottom + 6.0, label, text)?;
        }

        for fraction in [0.0, 0.5, 1.0] {
            let y = bottom - fraction * (bottom - top);
            svg.line((left, y), (right, y), GRID_LINE)?;
            let style = TextStyle {
                anchor: Anchor::Start,
                ..label
            };
            svg.text(left + 1.0, y, style, &format_millis(fraction * y_max))?;
        }

        for curve in curves {
            let count = curve.millis.len();
            let to_point = |rank: f64, value: f64| {
                let x = left + options.transform(rank) * (right - left);
                let y = bottom - (value / y_max).clamp(0.0, 1.0) * (bottom - top);
                (x, y)
            };

            let points: Vec<(f64, f64)> = match curve.millis.as_slice() {
                [] => continue,
                [single] => vec![to_point(0.0, *single), to_point(1.0, *single)],
                millis => millis
                    .iter()
                    .enumerate()
                    .map(|(i, &value)| to_point(i as f64 / (count - 1) as f64, value))
                    .collect(),
            };

            let title = self.runs.get(curve.run).map_or("", String::as_str);
            svg.polyline(points, run_color(curve.run), title)?;
        }

        let end = TextStyle {
            anchor: Anchor::End,
            ..label
        };
        svg.text(right - 1.0, top + 6.0, end, "ms")
    }
}

#[derive(Clone, Copy, Debug)]
struct Area {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

fn build_layout(runs: &[BenchmarkResult], name: &str, parts: &[u32], segments: &[u32]) -> SectionLayout {
    let gridded = runs
        .iter()
        .flat_map(|run| &run.measurements)
        .filter(|measurement| !measurement.scenario().is_none())
        .any(|measurement| measurement.result_by_name(name).is_some_and(|r| !r.is_empty()));

    if !gridded {
        return SectionLayout::Placeholder;
    }

    let mut cells: HashMap<Scenario, Vec<Curve>> = HashMap::new();
    for &p in parts {
        for &s in segments {
            cells.insert(Scenario::new(p, s), Vec::new());
        }
    }

    let mut y_max = MIN_Y_BOUND;
    for (index, run) in runs.iter().enumerate() {
        for measurement in &run.measurements {
            let Some(result) = measurement.result_by_name(name) else {
                continue;
            };
            let Some(cell) = cells.get_mut(&measurement.scenario()) else {
                continue;
            };

            let millis = sorted_millis(&result.durations);
            let Some(bound) = percentile(&millis, Y_BOUND_PERCENTILE) else {
                continue;
            };
            y_max = y_max.max(bound);
            cell.push(Curve { run: index, millis });
        }
    }

    SectionLayout::Grid(Grid {
        y_max: nice_ceil(y_max),
        cells,
    })
}

fn include<T: PartialEq + Clone>(values: &mut Vec<T>, value: &T) {
    if !values.contains(value) {
        values.push(value.clone());
    }
}

fn format_millis(value: f64) -> String {
    if value >= 10.0 || value == 0.0 {
        format!("{value:.0}")
    } else if value >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

/// Writes a percentile plot of all runs as a single SVG image.
pub fn plot_percentiles<W: Write>(
    mut writer: W,
    runs: &[BenchmarkResult],
    options: &PlotOptions,
) -> ReportResult<()> {
    let plot = PercentilePlot::build(runs);
    tracing::debug!(
        sections = plot.sections.len(),
        rows = plot.parts.len(),
        columns = plot.segments.len(),
        "drawing percentile plot"
    );

    let svg = plot.to_svg(options).map_err(std::io::Error::other)?;
    writer.write_all(svg.as_bytes())?;
    Ok(())
}
