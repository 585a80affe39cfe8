use bytes::Bytes;
use serde::Deserialize;

use crate::command::Invocation;
use crate::error::{ClientError, ClientResult};
use crate::{Client, Config, s3_url};

const PROGRAM: &str = "aws";

/// A [`Client`] backed by the `aws` command line interface.
///
/// Credentials are passed through the environment of the spawned process.
#[derive(Debug)]
pub struct AwsCli {
    config: Config,
}

impl AwsCli {
    /// Creates a client for the configured gateway.
    ///
    /// The gateway address is prefixed with `http://` if it has no scheme.
    pub fn new(mut config: Config) -> Self {
        if !config.s3_gateway.starts_with("https://") && !config.s3_gateway.starts_with("http://")
        {
            config.s3_gateway = format!("http://{}", config.s3_gateway);
        }
        Self { config }
    }

    /// Returns the gateway address including its scheme.
    pub fn gateway(&self) -> &str {
        &self.config.s3_gateway
    }

    /// Assembles the command for the given subcommand arguments.
    pub fn command<'a>(&self, subargs: impl IntoIterator<Item = &'a str>) -> Invocation {
        let mut invocation = Invocation::new(PROGRAM).args(["--endpoint", self.gateway()]);
        if self.config.no_ssl {
            invocation = invocation.arg("--no-verify-ssl");
        }

        invocation
            .args(subargs)
            .env("AWS_ACCESS_KEY_ID", &self.config.access_key)
            .env("AWS_SECRET_ACCESS_KEY", &self.config.secret_key)
    }

    async fn copy_in(&self, bucket: &str, object: &str, data: Bytes) -> ClientResult<()> {
        let target = s3_url(bucket, Some(object));
        self.command(["s3", "cp", "-", target.as_str()])
            .output(Some(data))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketsResponse {
    #[serde(default)]
    buckets: Vec<BucketEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BucketEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListObjectsResponse {
    #[serde(default)]
    contents: Vec<ObjectEntry>,
    #[serde(default)]
    common_prefixes: Vec<PrefixEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectEntry {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PrefixEntry {
    prefix: String,
}

fn decode<'a, T: Deserialize<'a>>(output: &'a [u8]) -> ClientResult<T> {
    serde_json::from_slice(output).map_err(|source| ClientError::Decode {
        program: PROGRAM.to_owned(),
        source,
    })
}

/// Parses the output of `s3api list-buckets`.
fn parse_buckets(output: &[u8]) -> ClientResult<Vec<String>> {
    let response: ListBucketsResponse = decode(output)?;
    Ok(response.buckets.into_iter().map(|b| b.name).collect())
}

/// Parses the output of `s3api list-objects`, objects first and then prefixes.
fn parse_objects(output: &[u8]) -> ClientResult<Vec<String>> {
    // an empty listing produces no output at all
    if output.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let response: ListObjectsResponse = decode(output)?;
    let objects = response.contents.into_iter().map(|o| o.key);
    let prefixes = response.common_prefixes.into_iter().map(|p| p.prefix);
    Ok(objects.chain(prefixes).collect())
}

#[async_trait::async_trait]
impl Client for AwsCli {
    async fn make_bucket(&self, bucket: &str, location: &str) -> ClientResult<()> {
        let target = s3_url(bucket, None);
        self.command(["s3", "mb", target.as_str(), "--region", location])
            .output(None)
            .await?;
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> ClientResult<()> {
        let target = s3_url(bucket, None);
        self.command(["s3", "rb", target.as_str()]).output(None).await?;
        Ok(())
    }

    async fn list_buckets(&self) -> ClientResult<Vec<String>> {
        let output = self
            .command(["s3api", "list-buckets", "--output", "json"])
            .output(None)
            .await?;
        parse_buckets(&output)
    }

    async fn upload(&self, bucket: &str, object: &str, data: Bytes) -> ClientResult<()> {
        self.copy_in(bucket, object, data).await
    }

    async fn upload_multipart(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        threshold: usize,
    ) -> ClientResult<()> {
        // the cli picks its own multipart threshold
        tracing::trace!(threshold, "ignoring multipart threshold");
        self.copy_in(bucket, object, data).await
    }

    async fn download(&self, bucket: &str, object: &str) -> ClientResult<Bytes> {
        let source = s3_url(bucket, Some(object));
        self.command(["s3", "cp", source.as_str(), "-"]).output(None).await
    }

    async fn delete(&self, bucket: &str, object: &str) -> ClientResult<()> {
        let target = s3_url(bucket, Some(object));
        self.command(["s3", "rm", target.as_str()]).output(None).await?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> ClientResult<Vec<String>> {
        let output = self
            .command([
                "s3api",
                "list-objects",
                "--output",
                "json",
                "--bucket",
                bucket,
                "--prefix",
                prefix,
                "--delimiter",
                "/",
            ])
            .output(None)
            .await?;
        parse_objects(&output)
    }
}
