//! Bucket and object operations through S3-compatible command line tools.
//!
//! Two implementations of [`Client`] are available:
//!
//! - [`AwsCli`] runs the `aws` command line interface against an S3 gateway.
//! - [`Uplink`] runs the `uplink` command line tool, authenticated by an access grant or an
//!   existing configuration directory.
//!
//! Both capture the output of the spawned process. Failures carry its stderr and stdout for
//! diagnostics.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::fmt::Debug;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

mod aws_cli;
mod command;
mod error;
mod uplink;

pub use aws_cli::AwsCli;
pub use command::Invocation;
pub use error::{ClientError, ClientResult};
pub use uplink::Uplink;

/// Connection settings shared by all clients.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address of the S3 gateway, with or without scheme.
    pub s3_gateway: String,
    /// Access key for the S3 gateway.
    pub access_key: String,
    /// Secret key for the S3 gateway.
    pub secret_key: String,
    /// Disables TLS certificate verification.
    pub no_ssl: bool,
    /// Existing uplink configuration directory.
    pub config_dir: Option<PathBuf>,
    /// Serialized uplink access grant, used if there is no `config_dir`.
    pub access: Option<String>,
}

/// A client for bucket and object operations.
#[async_trait::async_trait]
pub trait Client: Debug + Send + Sync {
    /// Creates a bucket in the given region.
    async fn make_bucket(&self, bucket: &str, location: &str) -> ClientResult<()>;

    /// Removes an empty bucket.
    async fn remove_bucket(&self, bucket: &str) -> ClientResult<()>;

    /// Returns the names of all buckets.
    async fn list_buckets(&self) -> ClientResult<Vec<String>>;

    /// Uploads an object.
    async fn upload(&self, bucket: &str, object: &str, data: Bytes) -> ClientResult<()>;

    /// Uploads an object, splitting it into parts of `threshold` bytes where supported.
    async fn upload_multipart(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        threshold: usize,
    ) -> ClientResult<()>;

    /// Downloads an object.
    async fn download(&self, bucket: &str, object: &str) -> ClientResult<Bytes>;

    /// Deletes an object.
    async fn delete(&self, bucket: &str, object: &str) -> ClientResult<()>;

    /// Lists objects and common prefixes directly below `prefix`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> ClientResult<Vec<String>>;
}

/// Formats the `s3://` URL of a bucket or object.
fn s3_url(bucket: &str, object: Option<&str>) -> String {
    match object {
        Some(object) => format!("s3://{bucket}/{object}"),
        None => format!("s3://{bucket}"),
    }
}
