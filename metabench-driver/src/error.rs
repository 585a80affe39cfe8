use metabench_types::Scenario;
use thiserror::Error;

use crate::metabase::MetabaseError;

/// Errors that abort a benchmark phase.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A metabase operation failed while benchmarking a scenario.
    #[error("{operation} failed ({scenario})")]
    Operation {
        /// Name of the failed operation, e.g. `"begin object"`.
        operation: &'static str,
        /// The scenario that was being benchmarked.
        scenario: Scenario,
        /// The error returned by the metabase.
        #[source]
        source: MetabaseError,
    },

    /// The metabase could not be prepared for the benchmark.
    #[error("failed to migrate metabase")]
    Migration(#[source] MetabaseError),
}

impl DriverError {
    /// The scenario the error occurred in, if any.
    pub fn scenario(&self) -> Option<Scenario> {
        match self {
            DriverError::Operation { scenario, .. } => Some(*scenario),
            DriverError::Migration(_) => None,
        }
    }
}

/// Result type for benchmark phases.
pub type DriverResult<T> = Result<T, DriverError>;

/// Returns a closure that wraps a [`MetabaseError`] with the operation and scenario.
pub(crate) fn operation(
    operation: &'static str,
    scenario: Scenario,
) -> impl FnOnce(MetabaseError) -> DriverError {
    move |source| DriverError::Operation {
        operation,
        scenario,
        source,
    }
}
