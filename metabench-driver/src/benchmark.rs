//! Runs the benchmark phases against a metabase.
//!
//! A run consists of these phases, in order:
//!
//! 1. Upload objects for every scenario.
//! 2. Iterate the whole bucket once, recorded under [`Scenario::NONE`].
//! 3. List the segments of every uploaded object.
//! 4. Download every uploaded object segment by segment.
//! 5. Delete every uploaded object.
//!
//! A failing operation aborts only the scenario it belongs to. Everything recorded up to the
//! failure is kept, and the remaining scenarios still run.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{StreamExt, future};
use indicatif::{ProgressBar, ProgressStyle};
use metabench_types::{Measurement, Recorder, Scenario};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DriverError, DriverResult, operation};
use crate::metabase::{
    BeginSegment, BoxedMetabase, CipherSuite, CommitInlineSegment, CommitSegment,
    EncryptionParameters, KEY_SIZE, ListSegments, MetabaseResult, NONCE_SIZE, NodeId,
    ObjectLocation, ObjectStream, Piece, PieceId, RedundancyScheme, SegmentPosition,
};

const MIB: u32 = 1024 * 1024;
const KIB: u32 = 1024;

const ENCRYPTION: EncryptionParameters = EncryptionParameters {
    cipher_suite: CipherSuite::AesGcm,
    block_size: 256,
};

/// Parameters of a benchmark run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of objects uploaded per scenario, and number of bucket iterations.
    pub count: usize,
    /// Time after which a phase stops starting new iterations.
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
    /// Project owning the benchmark bucket.
    pub project_id: Uuid,
    /// Bucket the objects are uploaded to.
    pub bucket_name: String,
    /// Number of parts per object to benchmark.
    pub parts_variants: Vec<u32>,
    /// Number of segments per part to benchmark.
    pub segment_variants: Vec<u32>,
    /// Redundancy of remote segments.
    pub redundancy: RedundancyScheme,
    /// Shows a progress bar per scenario.
    pub progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            count: 50,
            max_duration: Duration::from_secs(120),
            project_id: Uuid::new_v4(),
            bucket_name: "benchmark".into(),
            parts_variants: vec![1, 2, 10],
            segment_variants: vec![0, 1, 2, 3, 11],
            redundancy: RedundancyScheme::default(),
            progress: true,
        }
    }
}

impl BenchmarkConfig {
    /// Returns all scenarios, `parts_variants × segment_variants` in configuration order.
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.parts_variants
            .iter()
            .flat_map(|&parts| {
                self.segment_variants
                    .iter()
                    .map(move |&segments| Scenario::new(parts, segments))
            })
            .collect()
    }
}

/// Everything recorded during [`Benchmark::run`].
#[derive(Debug, Default)]
pub struct BenchmarkRun {
    /// One measurement per phase and scenario, in execution order.
    pub measurements: Vec<Measurement>,
    /// Errors that aborted individual scenarios.
    pub failures: Vec<DriverError>,
}

/// A benchmark against a single metabase.
///
/// The locations of uploaded objects are kept per scenario for the later phases. They are
/// scoped to this value, so separate benchmarks never see each other's objects.
#[derive(Debug)]
pub struct Benchmark {
    metabase: BoxedMetabase,
    config: BenchmarkConfig,
    objects: HashMap<Scenario, Vec<ObjectLocation>>,
}

impl Benchmark {
    /// Creates a benchmark for the given metabase.
    pub fn new(metabase: BoxedMetabase, config: BenchmarkConfig) -> Self {
        Self {
            metabase,
            config,
            objects: HashMap::new(),
        }
    }

    /// Returns the configuration of this benchmark.
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Returns the objects uploaded for a scenario and not deleted yet.
    pub fn objects(&self, scenario: Scenario) -> &[ObjectLocation] {
        self.objects
            .get(&scenario)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Runs all phases.
    ///
    /// Only a failing migration is returned as an error. Failures within a scenario are
    /// logged and collected in [`BenchmarkRun::failures`].
    pub async fn run(&mut self) -> DriverResult<BenchmarkRun> {
        tracing::info!(metabase = self.metabase.name(), "migrating metabase");
        self.metabase
            .migrate_to_latest()
            .await
            .map_err(DriverError::Migration)?;

        let scenarios = self.config.scenarios();
        let mut run = BenchmarkRun::default();

        for &scenario in &scenarios {
            let recorder = Recorder::new(scenario);
            let result = self.upload(scenario, &recorder).await;
            run.finish("upload", recorder, result);
        }

        let recorder = Recorder::new(Scenario::NONE);
        let result = self.iterate(&recorder).await;
        run.finish("iterate", recorder, result);

        for &scenario in &scenarios {
            let recorder = Recorder::new(scenario);
            let result = self.list_segments(scenario, &recorder).await;
            run.finish("list segments", recorder, result);
        }

        for &scenario in &scenarios {
            let recorder = Recorder::new(scenario);
            let result = self.download(scenario, &recorder).await;
            run.finish("download", recorder, result);
        }

        for &scenario in &scenarios {
            let recorder = Recorder::new(scenario);
            let result = self.delete(scenario, &recorder).await;
            run.finish("delete", recorder, result);
        }

        Ok(run)
    }

    /// Uploads `count` objects of the given shape.
    ///
    /// Every part consists of `segments - 1` remote segments followed by one inline segment.
    /// Parts are uploaded concurrently.
    pub async fn upload(&mut self, scenario: Scenario, recorder: &Recorder) -> DriverResult<()> {
        let remote_segments = scenario.segments.saturating_sub(1);
        let inline_segments = scenario.segments.min(1);

        let progress = self.progress("upload", scenario, self.config.count);
        let started = Instant::now();

        for _ in 0..self.config.count {
            if started.elapsed() > self.config.max_duration {
                tracing::info!(%scenario, "upload reached maximum duration");
                break;
            }
            progress.inc(1);

            let stream = ObjectStream {
                project_id: self.config.project_id,
                bucket_name: self.config.bucket_name.clone(),
                object_key: format!("{}/{}", random_path(), Uuid::new_v4()),
                version: 1,
                stream_id: Uuid::new_v4(),
            };
            let total = Instant::now();

            timed(
                recorder,
                "Begin Object",
                self.metabase
                    .begin_object_exact_version(&stream, ENCRYPTION),
            )
            .await
            .map_err(operation("begin object", scenario))?;

            let parts = (0..scenario.parts).map(|part| {
                self.upload_part(&stream, part, remote_segments, inline_segments, recorder)
            });
            future::try_join_all(parts)
                .await
                .map_err(|(name, err)| operation(name, scenario)(err))?;

            timed(recorder, "Commit Object", self.metabase.commit_object(&stream))
                .await
                .map_err(operation("commit object", scenario))?;

            recorder.record("Upload Total", total.elapsed());
            self.objects
                .entry(scenario)
                .or_default()
                .push(stream.location());
        }

        progress.finish_and_clear();
        Ok(())
    }

    async fn upload_part(
        &self,
        stream: &ObjectStream,
        part: u32,
        remote_segments: u32,
        inline_segments: u32,
        recorder: &Recorder,
    ) -> Result<(), (&'static str, crate::metabase::MetabaseError)> {
        for index in 0..remote_segments {
            let position = SegmentPosition::new(part, index);
            let root_piece_id = PieceId(rand::random());
            let pieces = random_pieces(self.config.redundancy.optimal_shares);

            let begin = BeginSegment {
                stream: stream.clone(),
                position,
                root_piece_id,
                pieces: pieces.clone(),
            };
            timed(
                recorder,
                "Begin Remote Segment",
                self.metabase.begin_segment(begin),
            )
            .await
            .map_err(|err| ("begin remote segment", err))?;

            let size = rand::random_range(1..=64 * MIB);
            let commit = CommitSegment {
                stream: stream.clone(),
                position,
                encrypted_key: random_bytes(KEY_SIZE),
                encrypted_key_nonce: random_bytes(NONCE_SIZE),
                plain_size: size,
                encrypted_size: size,
                root_piece_id,
                pieces,
                redundancy: self.config.redundancy,
            };
            timed(
                recorder,
                "Commit Remote Segment",
                self.metabase.commit_segment(commit),
            )
            .await
            .map_err(|err| ("commit remote segment", err))?;
        }

        for offset in 0..inline_segments {
            let size = rand::random_range(1..=4 * KIB);
            let commit = CommitInlineSegment {
                stream: stream.clone(),
                position: SegmentPosition::new(part, remote_segments + offset),
                inline_data: Bytes::from(random_bytes(size as usize)),
                encrypted_key: random_bytes(KEY_SIZE),
                encrypted_key_nonce: random_bytes(NONCE_SIZE),
                plain_size: size,
            };
            timed(
                recorder,
                "Commit Inline Segment",
                self.metabase.commit_inline_segment(commit),
            )
            .await
            .map_err(|err| ("commit inline segment", err))?;
        }

        Ok(())
    }

    /// Iterates all objects of the benchmark bucket `count` times.
    pub async fn iterate(&self, recorder: &Recorder) -> DriverResult<()> {
        let scenario = Scenario::NONE;
        let progress = self.progress("iterate", scenario, self.config.count);
        let started = Instant::now();

        for _ in 0..self.config.count {
            if started.elapsed() > self.config.max_duration {
                tracing::info!("iterate reached maximum duration");
                break;
            }
            progress.inc(1);

            let start = Instant::now();
            let mut entries = self
                .metabase
                .iterate_objects_all_versions(self.config.project_id, &self.config.bucket_name)
                .await
                .map_err(operation("iterate objects", scenario))?;
            while let Some(entry) = entries.next().await {
                entry.map_err(operation("iterate objects", scenario))?;
            }
            recorder.record("Iterate Objects", start.elapsed());
        }

        progress.finish_and_clear();
        Ok(())
    }

    /// Lists all segments of every object uploaded for the scenario.
    pub async fn list_segments(&self, scenario: Scenario, recorder: &Recorder) -> DriverResult<()> {
        let objects = self.objects(scenario);
        let progress = self.progress("list segments", scenario, objects.len());

        for location in objects {
            progress.inc(1);

            let object = self
                .metabase
                .get_object_latest_version(location)
                .await
                .map_err(operation("get object", scenario))?;

            let start = Instant::now();
            let mut cursor = None;
            loop {
                let page = self
                    .metabase
                    .list_segments(ListSegments {
                        stream_id: object.stream.stream_id,
                        cursor,
                        limit: 0,
                    })
                    .await
                    .map_err(operation("list segments", scenario))?;

                match (page.more, page.segments.last()) {
                    (true, Some(last)) => cursor = Some(last.position),
                    _ => break,
                }
            }
            recorder.record("List Segments", start.elapsed());
        }

        progress.finish_and_clear();
        Ok(())
    }

    /// Fetches every object uploaded for the scenario and all of its segments.
    pub async fn download(&self, scenario: Scenario, recorder: &Recorder) -> DriverResult<()> {
        let objects = self.objects(scenario);
        let progress = self.progress("download", scenario, objects.len());

        for location in objects {
            progress.inc(1);
            let total = Instant::now();

            let object = timed(
                recorder,
                "Get Object",
                self.metabase.get_object_latest_version(location),
            )
            .await
            .map_err(operation("get object", scenario))?;

            for part in 0..scenario.parts {
                for index in 0..scenario.segments {
                    let position = SegmentPosition::new(part, index);
                    timed(
                        recorder,
                        "Get Segment",
                        self.metabase
                            .get_segment_by_position(object.stream.stream_id, position),
                    )
                    .await
                    .map_err(operation("get segment", scenario))?;
                }
            }

            recorder.record("Download Total", total.elapsed());
        }

        progress.finish_and_clear();
        Ok(())
    }

    /// Deletes every object uploaded for the scenario.
    ///
    /// The objects are forgotten even if a deletion fails.
    pub async fn delete(&mut self, scenario: Scenario, recorder: &Recorder) -> DriverResult<()> {
        let objects = self.objects.remove(&scenario).unwrap_or_default();
        let progress = self.progress("delete", scenario, objects.len());

        for location in &objects {
            progress.inc(1);

            timed(
                recorder,
                "Delete Object",
                self.metabase.delete_object_latest_version(location),
            )
            .await
            .map_err(operation("delete object", scenario))?;
        }

        progress.finish_and_clear();
        Ok(())
    }

    fn progress(&self, phase: &str, scenario: Scenario, len: usize) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let message = if scenario.is_none() {
            format!("Benchmark {phase}")
        } else {
            format!("Benchmark {phase} ({scenario})")
        };

        ProgressBar::new(len as u64)
            .with_style(style)
            .with_message(message)
    }
}

impl BenchmarkRun {
    fn finish(&mut self, phase: &str, recorder: Recorder, result: DriverResult<()>) {
        let measurement = recorder.into_measurement();
        let scenario = measurement.scenario();

        match result {
            Ok(()) => tracing::info!(phase, %scenario, "benchmark phase finished"),
            Err(err) => {
                tracing::error!(
                    phase,
                    %scenario,
                    error = &err as &dyn std::error::Error,
                    "benchmark scenario failed"
                );
                self.failures.push(err);
            }
        }

        self.measurements.push(measurement);
    }
}

/// Awaits `future` and records its duration under `name` if it succeeds.
async fn timed<T>(
    recorder: &Recorder,
    name: &str,
    future: impl Future<Output = MetabaseResult<T>>,
) -> MetabaseResult<T> {
    let start = Instant::now();
    let value = future.await?;
    recorder.record(name, start.elapsed());
    Ok(value)
}

fn random_path() -> String {
    let depth = rand::random_range(1..=3);
    (0..depth)
        .map(|_| format!("{:08x}", rand::random::<u32>()))
        .collect::<Vec<_>>()
        .join("/")
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0; len];
    rand::fill(bytes.as_mut_slice());
    bytes
}

fn random_pieces(count: u16) -> Vec<Piece> {
    (0..count)
        .map(|number| Piece {
            number,
            storage_node: NodeId(rand::random()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::metabase::{
        EncryptionParameters, InMemoryMetabase, ListSegmentsResult, Metabase, MetabaseError,
        Object, ObjectEntryStream, Segment,
    };

    use super::*;

    fn config(parts: Vec<u32>, segments: Vec<u32>, count: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            count,
            parts_variants: parts,
            segment_variants: segments,
            progress: false,
            ..Default::default()
        }
    }

    fn counts(measurement: &Measurement) -> Vec<(&str, usize)> {
        measurement
            .results()
            .iter()
            .map(|result| (result.name.as_str(), result.len()))
            .collect()
    }

    #[test]
    fn scenarios_are_the_cartesian_product() {
        let config = config(vec![1, 2], vec![0, 3], 1);
        assert_eq!(
            config.scenarios(),
            [
                Scenario::new(1, 0),
                Scenario::new(1, 3),
                Scenario::new(2, 0),
                Scenario::new(2, 3),
            ]
        );
    }

    #[test]
    fn default_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.count, 50);
        assert_eq!(config.max_duration, Duration::from_secs(120));
        assert_eq!(config.bucket_name, "benchmark");
        assert_eq!(config.scenarios().len(), 15);
        assert_eq!(config.redundancy.optimal_shares, 85);
    }

    #[tokio::test]
    async fn upload_records_every_operation() {
        metabench_test::tracing::init();

        let metabase = InMemoryMetabase::new();
        metabase.migrate_to_latest().await.unwrap();
        let mut benchmark = Benchmark::new(Box::new(metabase.clone()), config(vec![], vec![], 3));

        let scenario = Scenario::new(2, 3);
        let recorder = Recorder::new(scenario);
        benchmark.upload(scenario, &recorder).await.unwrap();

        let measurement = recorder.into_measurement();
        assert_eq!(
            counts(&measurement),
            [
                ("Begin Object", 3),
                ("Begin Remote Segment", 12),
                ("Commit Remote Segment", 12),
                ("Commit Inline Segment", 6),
                ("Commit Object", 3),
                ("Upload Total", 3),
            ]
        );
        assert_eq!(benchmark.objects(scenario).len(), 3);
        assert_eq!(metabase.object_count(), 3);
    }

    #[tokio::test]
    async fn upload_without_segments() {
        let metabase = InMemoryMetabase::new();
        metabase.migrate_to_latest().await.unwrap();
        let mut benchmark = Benchmark::new(Box::new(metabase), config(vec![], vec![], 2));

        let scenario = Scenario::new(1, 0);
        let recorder = Recorder::new(scenario);
        benchmark.upload(scenario, &recorder).await.unwrap();

        assert_eq!(
            counts(&recorder.into_measurement()),
            [("Begin Object", 2), ("Commit Object", 2), ("Upload Total", 2)]
        );
    }

    #[tokio::test]
    async fn max_duration_stops_at_loop_top() {
        let metabase = InMemoryMetabase::new();
        metabase.migrate_to_latest().await.unwrap();
        let mut config = config(vec![], vec![], 1000);
        config.max_duration = Duration::ZERO;
        let mut benchmark = Benchmark::new(Box::new(metabase), config);

        let scenario = Scenario::new(1, 1);
        let recorder = Recorder::new(scenario);
        benchmark.upload(scenario, &recorder).await.unwrap();

        assert!(recorder.count("Upload Total") < 1000);
    }

    #[tokio::test]
    async fn full_run() {
        metabench_test::tracing::init();

        let metabase = InMemoryMetabase::new();
        let mut benchmark = Benchmark::new(Box::new(metabase.clone()), config(vec![1, 2], vec![0, 2], 2));

        let run = benchmark.run().await.unwrap();
        assert!(run.failures.is_empty());

        // 4 uploads, 1 iterate, 4 list segments, 4 downloads, 4 deletes
        assert_eq!(run.measurements.len(), 17);
        assert_eq!(run.measurements[4].scenario(), Scenario::NONE);
        assert_eq!(counts(&run.measurements[4]), [("Iterate Objects", 2)]);

        let list = &run.measurements[8];
        assert_eq!(list.scenario(), Scenario::new(2, 2));
        assert_eq!(counts(list), [("List Segments", 2)]);

        let download = &run.measurements[12];
        assert_eq!(download.scenario(), Scenario::new(2, 2));
        assert_eq!(
            counts(download),
            [("Get Object", 2), ("Get Segment", 8), ("Download Total", 2)]
        );

        let delete = &run.measurements[16];
        assert_eq!(counts(delete), [("Delete Object", 2)]);

        assert_eq!(metabase.object_count(), 0);
        assert!(benchmark.objects(Scenario::new(1, 0)).is_empty());
    }

    /// Delegates to an in-memory metabase, but rejects all inline segments.
    #[derive(Debug)]
    struct FailingInline {
        inner: InMemoryMetabase,
    }

    #[async_trait::async_trait]
    impl Metabase for FailingInline {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn migrate_to_latest(&self) -> MetabaseResult<()> {
            self.inner.migrate_to_latest().await
        }

        async fn begin_object_exact_version(
            &self,
            stream: &ObjectStream,
            encryption: EncryptionParameters,
        ) -> MetabaseResult<Object> {
            self.inner
                .begin_object_exact_version(stream, encryption)
                .await
        }

        async fn begin_segment(&self, request: BeginSegment) -> MetabaseResult<()> {
            self.inner.begin_segment(request).await
        }

        async fn commit_segment(&self, request: CommitSegment) -> MetabaseResult<()> {
            self.inner.commit_segment(request).await
        }

        async fn commit_inline_segment(&self, _request: CommitInlineSegment) -> MetabaseResult<()> {
            Err(MetabaseError::InvalidRequest("inline segments disabled".into()))
        }

        async fn commit_object(&self, stream: &ObjectStream) -> MetabaseResult<Object> {
            self.inner.commit_object(stream).await
        }

        async fn get_object_latest_version(
            &self,
            location: &ObjectLocation,
        ) -> MetabaseResult<Object> {
            self.inner.get_object_latest_version(location).await
        }

        async fn get_segment_by_position(
            &self,
            stream_id: Uuid,
            position: SegmentPosition,
        ) -> MetabaseResult<Segment> {
            self.inner.get_segment_by_position(stream_id, position).await
        }

        async fn list_segments(&self, request: ListSegments) -> MetabaseResult<ListSegmentsResult> {
            self.inner.list_segments(request).await
        }

        async fn delete_object_latest_version(
            &self,
            location: &ObjectLocation,
        ) -> MetabaseResult<Vec<Object>> {
            self.inner.delete_object_latest_version(location).await
        }

        async fn iterate_objects_all_versions(
            &self,
            project_id: Uuid,
            bucket_name: &str,
        ) -> MetabaseResult<ObjectEntryStream> {
            self.inner
                .iterate_objects_all_versions(project_id, bucket_name)
                .await
        }
    }

    #[tokio::test]
    async fn failing_scenario_keeps_partial_measurement() {
        metabench_test::tracing::init();

        let metabase = FailingInline {
            inner: InMemoryMetabase::new(),
        };
        // (1, 0) has no inline segment and succeeds, (1, 2) fails after its remote segment
        let mut benchmark = Benchmark::new(Box::new(metabase), config(vec![1], vec![0, 2], 3));

        let run = benchmark.run().await.unwrap();

        assert_eq!(run.failures.len(), 1);
        let failure = &run.failures[0];
        assert_eq!(failure.scenario(), Some(Scenario::new(1, 2)));
        assert_eq!(
            failure.to_string(),
            "commit inline segment failed (parts: 1, segments: 2)"
        );

        let upload = &run.measurements[1];
        assert_eq!(upload.scenario(), Scenario::new(1, 2));
        assert_eq!(
            counts(upload),
            [
                ("Begin Object", 1),
                ("Begin Remote Segment", 1),
                ("Commit Remote Segment", 1),
            ]
        );

        // later phases still run, the failed scenario has nothing to work on
        assert_eq!(run.measurements.len(), 2 + 1 + 2 + 2 + 2);
        let download = &run.measurements[5];
        assert_eq!(download.scenario(), Scenario::new(1, 0));
        assert_eq!(
            counts(download),
            [("Get Object", 3), ("Download Total", 3)]
        );
        assert!(run.measurements[6].is_empty());
    }
}
