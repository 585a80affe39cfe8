//! Shared data model of the metabase benchmark.
//!
//! A benchmark run produces one [`Measurement`] per [`Scenario`] and phase. Every measurement
//! holds a list of named [`OperationResult`]s, each being the raw sequence of durations that
//! were recorded for one logical operation such as `"Begin Object"`.
//!
//! A full run, either live or loaded from a saved file, is a [`BenchmarkResult`]. Saved runs use
//! a JSON array of measurements, see the [`run`] module for the wire format.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod measurement;
pub mod run;
pub mod scenario;

pub use error::LoadError;
pub use measurement::{Measurement, OperationResult, Recorder};
pub use run::BenchmarkResult;
pub use scenario::Scenario;
