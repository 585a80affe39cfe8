//! Benchmark driver for the object metadata layer.
//!
//! The [`Benchmark`] uploads objects of every configured [`Scenario`](metabench_types::Scenario)
//! into a [`Metabase`], then lists, downloads and deletes them again. Every operation is timed
//! and recorded into a [`Measurement`](metabench_types::Measurement) per scenario and phase.
//!
//! The metabase itself is an external collaborator behind the [`Metabase`] trait. An in-memory
//! implementation is available via the `memory://` URL, see [`metabase::open`].
#![warn(missing_debug_implementations)]

pub mod benchmark;
pub mod error;
pub mod metabase;

pub use benchmark::{Benchmark, BenchmarkConfig, BenchmarkRun};
pub use error::{DriverError, DriverResult};
pub use metabase::{BoxedMetabase, Metabase, MetabaseError, MetabaseResult};
