//! The `metabase-benchmark` command line tool.
//!
//! It either benchmarks a metabase or loads previously saved runs, and renders the
//! measurements in any number of output formats. See [`config`] for the available settings.

pub mod cli;
pub mod config;
pub mod observability;
pub mod output;
pub mod runs;
