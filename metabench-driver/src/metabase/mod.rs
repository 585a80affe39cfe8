//! The object metadata store under benchmark.
//!
//! Objects are identified by their [`ObjectLocation`] and version, and consist of segments
//! addressed by a [`SegmentPosition`]. An object is first begun, then its segments are begun
//! and committed, and finally the object itself is committed. Only committed objects are
//! visible to reads.

use std::fmt::Debug;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod in_memory;
pub use in_memory::InMemoryMetabase;

/// Size of an encrypted segment key.
pub const KEY_SIZE: usize = 32;
/// Size of the nonce of an encrypted segment key.
pub const NONCE_SIZE: usize = 24;

/// A type-erased [`Metabase`] instance.
pub type BoxedMetabase = Box<dyn Metabase>;

/// A stream of objects, as returned by [`Metabase::iterate_objects_all_versions`].
pub type ObjectEntryStream = BoxStream<'static, MetabaseResult<ObjectEntry>>;

/// Opens the metabase at the given URL.
///
/// Supported schemes:
/// - `memory://`: a fresh [`InMemoryMetabase`].
pub fn open(url: &str) -> MetabaseResult<BoxedMetabase> {
    let scheme = url.split_once("://").map_or(url, |(scheme, _)| scheme);
    match scheme {
        "memory" => Ok(Box::new(InMemoryMetabase::new())),
        _ => Err(MetabaseError::UnsupportedUrl(url.to_owned())),
    }
}

#[async_trait::async_trait]
pub trait Metabase: Debug + Send + Sync + 'static {
    /// The backend name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Brings the schema up to date. Must be called before any other operation.
    async fn migrate_to_latest(&self) -> MetabaseResult<()>;

    /// Starts a new pending object with exactly the version given in `stream`.
    async fn begin_object_exact_version(
        &self,
        stream: &ObjectStream,
        encryption: EncryptionParameters,
    ) -> MetabaseResult<Object>;

    /// Starts a remote segment of a pending object.
    async fn begin_segment(&self, request: BeginSegment) -> MetabaseResult<()>;

    /// Commits a previously begun remote segment.
    async fn commit_segment(&self, request: CommitSegment) -> MetabaseResult<()>;

    /// Commits a segment whose data is stored inline.
    async fn commit_inline_segment(&self, request: CommitInlineSegment) -> MetabaseResult<()>;

    /// Commits a pending object, making it visible.
    async fn commit_object(&self, stream: &ObjectStream) -> MetabaseResult<Object>;

    /// Returns the latest committed version of the object at `location`.
    async fn get_object_latest_version(&self, location: &ObjectLocation) -> MetabaseResult<Object>;

    /// Returns a single segment of an object.
    async fn get_segment_by_position(
        &self,
        stream_id: Uuid,
        position: SegmentPosition,
    ) -> MetabaseResult<Segment>;

    /// Returns one page of an object's segments, ordered by position.
    async fn list_segments(&self, request: ListSegments) -> MetabaseResult<ListSegmentsResult>;

    /// Deletes the latest committed version of the object at `location`.
    async fn delete_object_latest_version(
        &self,
        location: &ObjectLocation,
    ) -> MetabaseResult<Vec<Object>>;

    /// Streams all committed objects of a bucket, ordered by key and descending version.
    async fn iterate_objects_all_versions(
        &self,
        project_id: Uuid,
        bucket_name: &str,
    ) -> MetabaseResult<ObjectEntryStream>;
}

/// Errors returned by a [`Metabase`].
#[derive(Debug, Error)]
pub enum MetabaseError {
    /// No metabase implementation is available for the URL.
    #[error("unsupported metabase url `{0}`")]
    UnsupportedUrl(String),

    /// The schema has not been migrated yet.
    #[error("metabase is not migrated")]
    NotMigrated,

    /// The object does not exist or is not committed.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The segment does not exist.
    #[error("segment {position} of stream {stream_id} not found")]
    SegmentNotFound {
        /// Stream of the object.
        stream_id: Uuid,
        /// Requested position.
        position: SegmentPosition,
    },

    /// The request conflicts with the current state of the object.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other error stemming from the metabase implementation.
    #[error("metabase error: {context}")]
    Generic {
        /// What was being done.
        context: String,
        /// The underlying error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for metabase operations.
pub type MetabaseResult<T> = Result<T, MetabaseError>;

/// Where an object lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectLocation {
    pub project_id: Uuid,
    pub bucket_name: String,
    pub object_key: String,
}

/// A single version of an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectStream {
    pub project_id: Uuid,
    pub bucket_name: String,
    pub object_key: String,
    pub version: i64,
    pub stream_id: Uuid,
}

impl ObjectStream {
    /// Returns the location of this object.
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation {
            project_id: self.project_id,
            bucket_name: self.bucket_name.clone(),
            object_key: self.object_key.clone(),
        }
    }
}

/// Position of a segment within an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentPosition {
    pub part: u32,
    pub index: u32,
}

impl SegmentPosition {
    pub fn new(part: u32, index: u32) -> Self {
        Self { part, index }
    }
}

impl std::fmt::Display for SegmentPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.part, self.index)
    }
}

/// Identifies a storage node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; 32]);

/// Identifies the pieces of a remote segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PieceId(pub [u8; 32]);

/// A piece of a remote segment stored on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    pub number: u16,
    pub storage_node: NodeId,
}

/// Erasure coding parameters of remote segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedundancyScheme {
    pub required_shares: u16,
    pub repair_shares: u16,
    pub optimal_shares: u16,
    pub total_shares: u16,
    pub share_size: u32,
}

impl Default for RedundancyScheme {
    fn default() -> Self {
        Self {
            required_shares: 29,
            repair_shares: 50,
            optimal_shares: 85,
            total_shares: 90,
            share_size: 256,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipherSuite {
    Null,
    AesGcm,
    SecretBox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptionParameters {
    pub cipher_suite: CipherSuite,
    pub block_size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectStatus {
    Pending,
    Committed,
}

/// Metadata of an object version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
    pub stream: ObjectStream,
    pub status: ObjectStatus,
    pub segment_count: u32,
    pub encryption: EncryptionParameters,
}

/// Metadata of a committed segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub stream_id: Uuid,
    pub position: SegmentPosition,
    pub root_piece_id: Option<PieceId>,
    pub encrypted_key: Vec<u8>,
    pub encrypted_key_nonce: Vec<u8>,
    pub plain_size: u32,
    pub encrypted_size: u32,
    pub inline_data: Option<Bytes>,
    pub pieces: Vec<Piece>,
    pub redundancy: Option<RedundancyScheme>,
}

impl Segment {
    /// Returns `true` if the segment data is stored in the metabase.
    pub fn is_inline(&self) -> bool {
        self.inline_data.is_some()
    }
}

/// An object yielded while iterating a bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    pub object_key: String,
    pub version: i64,
    pub stream_id: Uuid,
    pub segment_count: u32,
}

#[derive(Clone, Debug)]
pub struct BeginSegment {
    pub stream: ObjectStream,
    pub position: SegmentPosition,
    pub root_piece_id: PieceId,
    pub pieces: Vec<Piece>,
}

#[derive(Clone, Debug)]
pub struct CommitSegment {
    pub stream: ObjectStream,
    pub position: SegmentPosition,
    pub encrypted_key: Vec<u8>,
    pub encrypted_key_nonce: Vec<u8>,
    pub plain_size: u32,
    pub encrypted_size: u32,
    pub root_piece_id: PieceId,
    pub pieces: Vec<Piece>,
    pub redundancy: RedundancyScheme,
}

#[derive(Clone, Debug)]
pub struct CommitInlineSegment {
    pub stream: ObjectStream,
    pub position: SegmentPosition,
    pub inline_data: Bytes,
    pub encrypted_key: Vec<u8>,
    pub encrypted_key_nonce: Vec<u8>,
    pub plain_size: u32,
}

/// Requests a page of segments after `cursor`.
#[derive(Clone, Debug)]
pub struct ListSegments {
    pub stream_id: Uuid,
    /// Only positions after the cursor are returned.
    pub cursor: Option<SegmentPosition>,
    /// Maximum number of segments to return, `0` means [`DEFAULT_LIST_LIMIT`].
    pub limit: usize,
}

/// Page size of [`ListSegments`] if no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 1000;

#[derive(Clone, Debug)]
pub struct ListSegmentsResult {
    pub segments: Vec<Segment>,
    /// More segments follow the last one in this page.
    pub more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_by_scheme() {
        assert_eq!(open("memory://").unwrap().name(), "memory");

        let err = open("postgres://postgres@localhost/benchmark").unwrap_err();
        assert!(matches!(err, MetabaseError::UnsupportedUrl(_)));
    }

    #[test]
    fn positions_order_by_part_first() {
        let mut positions = vec![
            SegmentPosition::new(1, 0),
            SegmentPosition::new(0, 2),
            SegmentPosition::new(0, 1),
        ];
        positions.sort();
        assert_eq!(
            positions,
            [
                SegmentPosition::new(0, 1),
                SegmentPosition::new(0, 2),
                SegmentPosition::new(1, 0),
            ]
        );
    }
}
