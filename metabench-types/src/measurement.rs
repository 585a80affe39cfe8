//! Named duration samples collected for a single [`Scenario`].
//!
//! A [`Measurement`] keeps its [`OperationResult`]s in the order in which their names were first
//! recorded, so tables and plots list operations in a stable and reproducible order. Name
//! lookups go through an index, the ordered list stays the source of truth.
//!
//! Measurements are mutated through `&mut self` by a single producer. When multiple concurrent
//! workers record into the same measurement, they share a [`Recorder`] instead.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::scenario::Scenario;

/// The sequence of durations recorded for one named operation.
///
/// Samples are kept in input order and are never deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperationResult {
    /// Display name of the operation, e.g. `"Commit Object"`.
    pub name: String,
    /// All recorded samples, in recording order.
    #[serde(with = "nanos")]
    pub durations: Vec<Duration>,
}

impl OperationResult {
    /// Creates an empty result with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durations: Vec::new(),
        }
    }

    /// Returns `true` if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Returns the number of recorded samples.
    pub fn len(&self) -> usize {
        self.durations.len()
    }
}

/// Timing results of all operations that ran for one scenario.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Measurement {
    scenario: Scenario,
    results: Vec<OperationResult>,
    /// Maps a name to the position of its first occurrence in `results`.
    index: HashMap<String, usize>,
}

impl Measurement {
    /// Creates an empty measurement for the given scenario.
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            results: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a measurement from already collected results.
    ///
    /// Duplicate names are retained, lookups resolve to the first one.
    pub fn from_results(scenario: Scenario, results: Vec<OperationResult>) -> Self {
        let mut index = HashMap::with_capacity(results.len());
        for (position, result) in results.iter().enumerate() {
            index.entry(result.name.clone()).or_insert(position);
        }

        Self {
            scenario,
            results,
            index,
        }
    }

    /// The scenario these results belong to.
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// All results in first-seen order.
    pub fn results(&self) -> &[OperationResult] {
        &self.results
    }

    /// Returns `true` if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Finds or creates the result with the given name.
    ///
    /// New names are appended after all names seen so far.
    pub fn result(&mut self, name: &str) -> &mut OperationResult {
        let position = match self.index.entry(name.to_owned()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let position = self.results.len();
                self.results.push(OperationResult::new(name));
                *entry.insert(position)
            }
        };

        &mut self.results[position]
    }

    /// Looks up the result with the given name without creating it.
    pub fn result_by_name(&self, name: &str) -> Option<&OperationResult> {
        self.index
            .get(name)
            .and_then(|&position| self.results.get(position))
    }

    /// Appends a sample to the result with the given name.
    pub fn record(&mut self, name: &str, duration: Duration) {
        self.result(name).durations.push(duration);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct MeasurementRef<'a> {
    parts: u32,
    segments: u32,
    results: &'a [OperationResult],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MeasurementRepr {
    parts: u32,
    segments: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    results: Vec<OperationResult>,
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MeasurementRef {
            parts: self.scenario.parts,
            segments: self.scenario.segments,
            results: &self.results,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Measurement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = MeasurementRepr::deserialize(deserializer)?;
        let scenario = Scenario::new(repr.parts, repr.segments);
        Ok(Self::from_results(scenario, repr.results))
    }
}

/// Saved runs may contain `null` instead of an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Durations are stored as integer nanoseconds.
mod nanos {
    use std::time::Duration;

    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            durations
                .iter()
                .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Duration>, D::Error> {
        let nanos = super::null_as_empty::<D, u64>(deserializer)?;
        Ok(nanos.into_iter().map(Duration::from_nanos).collect())
    }
}

/// A [`Measurement`] that can be recorded into from concurrent workers.
///
/// Once all workers have finished, [`into_measurement`](Self::into_measurement) hands out the
/// collected data for rendering, which then needs no further synchronization.
#[derive(Debug, Default)]
pub struct Recorder(Mutex<Measurement>);

impl Recorder {
    /// Creates a recorder for the given scenario.
    pub fn new(scenario: Scenario) -> Self {
        Self(Mutex::new(Measurement::new(scenario)))
    }

    /// Appends a sample to the result with the given name.
    pub fn record(&self, name: &str, duration: Duration) {
        self.lock().record(name, duration);
    }

    /// Returns the number of samples recorded under the given name so far.
    pub fn count(&self, name: &str) -> usize {
        self.lock().result_by_name(name).map_or(0, OperationResult::len)
    }

    /// Consumes the recorder and returns everything recorded.
    pub fn into_measurement(self) -> Measurement {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Measurement> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
