//! In-memory metabase.
//!
//! Keeps all objects and segments in a map guarded by a mutex. The metabase is [`Clone`], so
//! tests can keep a handle for inspection while the benchmark owns a boxed copy.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use uuid::Uuid;

use super::{
    BeginSegment, CommitInlineSegment, CommitSegment, DEFAULT_LIST_LIMIT, EncryptionParameters,
    ListSegments, ListSegmentsResult, Metabase, MetabaseError, MetabaseResult, Object, ObjectEntry,
    ObjectEntryStream, ObjectLocation, ObjectStatus, ObjectStream, PieceId, Segment,
    SegmentPosition,
};

type ObjectKey = (ObjectLocation, i64);

#[derive(Debug)]
enum SegmentState {
    Pending { root_piece_id: PieceId },
    Committed(Segment),
}

#[derive(Debug)]
struct ObjectRecord {
    object: Object,
    segments: BTreeMap<SegmentPosition, SegmentState>,
}

impl ObjectRecord {
    fn committed_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values().filter_map(|state| match state {
            SegmentState::Committed(segment) => Some(segment),
            SegmentState::Pending { .. } => None,
        })
    }
}

#[derive(Debug, Default)]
struct State {
    migrated: bool,
    objects: BTreeMap<ObjectKey, ObjectRecord>,
    streams: HashMap<Uuid, ObjectKey>,
}

impl State {
    fn check_migrated(&self) -> MetabaseResult<()> {
        if self.migrated {
            Ok(())
        } else {
            Err(MetabaseError::NotMigrated)
        }
    }

    /// Returns the pending object of `stream`.
    fn pending_object(&mut self, stream: &ObjectStream) -> MetabaseResult<&mut ObjectRecord> {
        self.check_migrated()?;

        let key = (stream.location(), stream.version);
        let record = self
            .objects
            .get_mut(&key)
            .filter(|record| record.object.stream.stream_id == stream.stream_id)
            .ok_or_else(|| MetabaseError::ObjectNotFound(stream.object_key.clone()))?;

        if record.object.status != ObjectStatus::Pending {
            return Err(MetabaseError::Conflict(format!(
                "object `{}` is already committed",
                stream.object_key
            )));
        }

        Ok(record)
    }

    fn by_stream(&self, stream_id: Uuid) -> MetabaseResult<&ObjectRecord> {
        self.check_migrated()?;

        self.streams
            .get(&stream_id)
            .and_then(|key| self.objects.get(key))
            .ok_or_else(|| MetabaseError::ObjectNotFound(stream_id.to_string()))
    }

    fn latest_committed(&self, location: &ObjectLocation) -> Option<&ObjectKey> {
        let versions = (location.clone(), i64::MIN)..=(location.clone(), i64::MAX);
        self.objects
            .range(versions)
            .rev()
            .find(|(_, record)| record.object.status == ObjectStatus::Committed)
            .map(|(key, _)| key)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMetabase {
    state: Arc<Mutex<State>>,
}

impl InMemoryMetabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored object versions, pending ones included.
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Metabase for InMemoryMetabase {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn migrate_to_latest(&self) -> MetabaseResult<()> {
        self.lock().migrated = true;
        Ok(())
    }

    async fn begin_object_exact_version(
        &self,
        stream: &ObjectStream,
        encryption: EncryptionParameters,
    ) -> MetabaseResult<Object> {
        if stream.bucket_name.is_empty() || stream.object_key.is_empty() {
            return Err(MetabaseError::InvalidRequest(
                "bucket name and object key must not be empty".into(),
            ));
        }
        if stream.version <= 0 {
            return Err(MetabaseError::InvalidRequest(format!(
                "version must be positive, got {}",
                stream.version
            )));
        }

        let mut state = self.lock();
        state.check_migrated()?;

        let key = (stream.location(), stream.version);
        if state.objects.contains_key(&key) {
            return Err(MetabaseError::Conflict(format!(
                "object `{}` version {} already exists",
                stream.object_key, stream.version
            )));
        }
        if state.streams.contains_key(&stream.stream_id) {
            return Err(MetabaseError::Conflict(format!(
                "stream {} already exists",
                stream.stream_id
            )));
        }

        let object = Object {
            stream: stream.clone(),
            status: ObjectStatus::Pending,
            segment_count: 0,
            encryption,
        };
        state.streams.insert(stream.stream_id, key.clone());
        state.objects.insert(
            key,
            ObjectRecord {
                object: object.clone(),
                segments: BTreeMap::new(),
            },
        );

        Ok(object)
    }

    async fn begin_segment(&self, request: BeginSegment) -> MetabaseResult<()> {
        if request.pieces.is_empty() {
            return Err(MetabaseError::InvalidRequest("pieces missing".into()));
        }

        let mut state = self.lock();
        let record = state.pending_object(&request.stream)?;

        if let Some(SegmentState::Committed(_)) = record.segments.get(&request.position) {
            return Err(MetabaseError::Conflict(format!(
                "segment {} already committed",
                request.position
            )));
        }

        record.segments.insert(
            request.position,
            SegmentState::Pending {
                root_piece_id: request.root_piece_id,
            },
        );
        Ok(())
    }

    async fn commit_segment(&self, request: CommitSegment) -> MetabaseResult<()> {
        if request.pieces.is_empty() {
            return Err(MetabaseError::InvalidRequest("pieces missing".into()));
        }

        let mut state = self.lock();
        let record = state.pending_object(&request.stream)?;

        match record.segments.get(&request.position) {
            Some(SegmentState::Pending { root_piece_id })
                if *root_piece_id == request.root_piece_id => {}
            Some(SegmentState::Pending { .. }) => {
                return Err(MetabaseError::InvalidRequest(format!(
                    "root piece id of segment {} does not match",
                    request.position
                )));
            }
            Some(SegmentState::Committed(_)) => {
                return Err(MetabaseError::Conflict(format!(
                    "segment {} already committed",
                    request.position
                )));
            }
            None => {
                return Err(MetabaseError::InvalidRequest(format!(
                    "segment {} was not begun",
                    request.position
                )));
            }
        }

        let segment = Segment {
            stream_id: request.stream.stream_id,
            position: request.position,
            root_piece_id: Some(request.root_piece_id),
            encrypted_key: request.encrypted_key,
            encrypted_key_nonce: request.encrypted_key_nonce,
            plain_size: request.plain_size,
            encrypted_size: request.encrypted_size,
            inline_data: None,
            pieces: request.pieces,
            redundancy: Some(request.redundancy),
        };
        record
            .segments
            .insert(request.position, SegmentState::Committed(segment));
        Ok(())
    }

    async fn commit_inline_segment(&self, request: CommitInlineSegment) -> MetabaseResult<()> {
        let mut state = self.lock();
        let record = state.pending_object(&request.stream)?;

        if let Some(SegmentState::Committed(_)) = record.segments.get(&request.position) {
            return Err(MetabaseError::Conflict(format!(
                "segment {} already committed",
                request.position
            )));
        }

        let encrypted_size = request.inline_data.len() as u32;
        let segment = Segment {
            stream_id: request.stream.stream_id,
            position: request.position,
            root_piece_id: None,
            encrypted_key: request.encrypted_key,
            encrypted_key_nonce: request.encrypted_key_nonce,
            plain_size: request.plain_size,
            encrypted_size,
            inline_data: Some(request.inline_data),
            pieces: Vec::new(),
            redundancy: None,
        };
        record
            .segments
            .insert(request.position, SegmentState::Committed(segment));
        Ok(())
    }

    async fn commit_object(&self, stream: &ObjectStream) -> MetabaseResult<Object> {
        let mut state = self.lock();
        let record = state.pending_object(stream)?;

        // segments that were begun but never committed are discarded
        record
            .segments
            .retain(|_, segment| matches!(segment, SegmentState::Committed(_)));

        record.object.status = ObjectStatus::Committed;
        record.object.segment_count = record.segments.len() as u32;
        Ok(record.object.clone())
    }

    async fn get_object_latest_version(&self, location: &ObjectLocation) -> MetabaseResult<Object> {
        let state = self.lock();
        state.check_migrated()?;

        state
            .latest_committed(location)
            .and_then(|key| state.objects.get(key))
            .map(|record| record.object.clone())
            .ok_or_else(|| MetabaseError::ObjectNotFound(location.object_key.clone()))
    }

    async fn get_segment_by_position(
        &self,
        stream_id: Uuid,
        position: SegmentPosition,
    ) -> MetabaseResult<Segment> {
        let state = self.lock();
        let record = state.by_stream(stream_id)?;

        match record.segments.get(&position) {
            Some(SegmentState::Committed(segment)) => Ok(segment.clone()),
            _ => Err(MetabaseError::SegmentNotFound {
                stream_id,
                position,
            }),
        }
    }

    async fn list_segments(&self, request: ListSegments) -> MetabaseResult<ListSegmentsResult> {
        let limit = match request.limit {
            0 => DEFAULT_LIST_LIMIT,
            limit => limit,
        };

        let state = self.lock();
        let record = state.by_stream(request.stream_id)?;

        let mut remaining = record
            .committed_segments()
            .filter(|segment| request.cursor.is_none_or(|cursor| segment.position > cursor));

        let segments: Vec<Segment> = remaining.by_ref().take(limit).cloned().collect();
        let more = remaining.next().is_some();

        Ok(ListSegmentsResult { segments, more })
    }

    async fn delete_object_latest_version(
        &self,
        location: &ObjectLocation,
    ) -> MetabaseResult<Vec<Object>> {
        let mut state = self.lock();
        state.check_migrated()?;

        let key = state
            .latest_committed(location)
            .cloned()
            .ok_or_else(|| MetabaseError::ObjectNotFound(location.object_key.clone()))?;

        let mut deleted = Vec::new();
        if let Some(record) = state.objects.remove(&key) {
            state.streams.remove(&record.object.stream.stream_id);
            deleted.push(record.object);
        }
        Ok(deleted)
    }

    async fn iterate_objects_all_versions(
        &self,
        project_id: Uuid,
        bucket_name: &str,
    ) -> MetabaseResult<ObjectEntryStream> {
        let state = self.lock();
        state.check_migrated()?;

        let mut entries: Vec<ObjectEntry> = state
            .objects
            .values()
            .map(|record| &record.object)
            .filter(|object| {
                object.status == ObjectStatus::Committed
                    && object.stream.project_id == project_id
                    && object.stream.bucket_name == bucket_name
            })
            .map(|object| ObjectEntry {
                object_key: object.stream.object_key.clone(),
                version: object.stream.version,
                stream_id: object.stream.stream_id,
                segment_count: object.segment_count,
            })
            .collect();

        entries.sort_by(|a, b| {
            a.object_key
                .cmp(&b.object_key)
                .then(b.version.cmp(&a.version))
        });

        Ok(futures_util::stream::iter(entries.into_iter().map(Ok)).boxed())
    }
}
