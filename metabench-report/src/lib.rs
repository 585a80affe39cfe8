//! Statistics and renderers for benchmark measurements.
//!
//! The [`histogram`] module turns the raw duration samples of an
//! [`OperationResult`](metabench_types::OperationResult) into summary statistics. The renderers
//! consume whole runs:
//!
//! - [`table`] writes a human-readable table of one run,
//! - [`benchstat`] writes one benchmark-stat line per result of one run,
//! - [`plot`] draws percentile curves of any number of runs into a single SVG image.
//!
//! [`render`] dispatches an [`OutputKind`] to the matching renderer and enforces that the
//! single-run renderers never see more than one run.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod benchstat;
pub mod error;
pub mod histogram;
pub mod nice;
pub mod output;
pub mod plot;
mod svg;
pub mod table;

pub use error::{ReportError, ReportResult};
pub use histogram::{Histogram, HistogramOptions};
pub use output::{OutputKind, RenderOptions, render};
pub use plot::PlotOptions;
