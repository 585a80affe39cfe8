//! Complete benchmark runs and their JSON representation.
//!
//! A saved run is a JSON array of measurements:
//!
//! ```json
//! [
//!   {
//!     "Parts": 1,
//!     "Segments": 2,
//!     "Results": [
//!       { "Name": "Begin Object", "Durations": [1203311, 982011] }
//!     ]
//!   }
//! ]
//! ```
//!
//! Durations are integer nanoseconds. Decoding and re-encoding a saved run reproduces the same
//! values in the same order.

use std::io::Write;
use std::path::Path;

use crate::error::LoadError;
use crate::measurement::Measurement;

/// A named collection of measurements representing one full run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BenchmarkResult {
    /// Display label of the run, e.g. derived from the file name.
    pub name: String,
    /// All measurements of the run in collection order.
    pub measurements: Vec<Measurement>,
}

impl BenchmarkResult {
    /// Creates a run from already collected measurements.
    pub fn new(name: impl Into<String>, measurements: Vec<Measurement>) -> Self {
        Self {
            name: name.into(),
            measurements,
        }
    }

    /// Decodes a run from its JSON representation.
    pub fn from_json(name: impl Into<String>, data: &[u8]) -> serde_json::Result<Self> {
        let measurements = serde_json::from_slice(data)?;
        Ok(Self::new(name, measurements))
    }

    /// Loads a saved run, naming it after the file name without its extension.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let data = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::from_json(display_name(path), &data).map_err(|source| LoadError::Decode {
            path: path.to_owned(),
            source,
        })
    }

    /// Writes the measurements as a single JSON line.
    pub fn write_json<W: Write>(&self, mut writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(&mut writer, &self.measurements)?;
        writeln!(writer).map_err(serde_json::Error::io)
    }
}

/// Derives the display name of a saved run from its path.
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::Scenario;

    fn sample_run() -> BenchmarkResult {
        let mut upload = Measurement::new(Scenario::new(1, 2));
        upload.record("Begin Object", Duration::from_nanos(1_203_311));
        upload.record("Commit Remote Segment", Duration::from_nanos(77));
        upload.record("Begin Object", Duration::from_nanos(982_011));

        let mut iterate = Measurement::new(Scenario::NONE);
        iterate.record("Iterate Objects", Duration::from_millis(4));

        BenchmarkResult::new("Benchmark", vec![upload, Measurement::new(Scenario::new(2, 0)), iterate])
    }

    #[test]
    fn json_round_trip() {
        let run = sample_run();

        let mut encoded = Vec::new();
        run.write_json(&mut encoded).unwrap();
        assert_eq!(encoded.last(), Some(&b'\n'));

        let decoded = BenchmarkResult::from_json("Benchmark", &encoded).unwrap();
        assert_eq!(decoded, run);

        let mut reencoded = Vec::new();
        decoded.write_json(&mut reencoded).unwrap();
        assert_eq!(reencoded, encoded);
    }

    #[test]
    fn load_names_run_after_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postgres-v1.json");

        let mut file = std::fs::File::create(&path).unwrap();
        sample_run().write_json(&mut file).unwrap();
        drop(file);

        let loaded = BenchmarkResult::load(&path).unwrap();
        assert_eq!(loaded.name, "postgres-v1");
        assert_eq!(loaded.measurements, sample_run().measurements);
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"[{\"Parts\": 1,").unwrap();

        let err = BenchmarkResult::load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }), "{err:?}");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = BenchmarkResult::load(Path::new("/nonexistent/run.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }), "{err:?}");
    }
}
