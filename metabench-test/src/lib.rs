//! Test utilities for the metabase benchmark crates.
//!
//! This crate provides utilities to facilitate testing of the renderers and the driver. See the
//! modules for all available utilities.

pub mod fixtures;
pub mod tracing;
