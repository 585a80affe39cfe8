use bytes::Bytes;

use crate::command::Invocation;
use crate::error::{ClientError, ClientResult};
use crate::{Client, Config, s3_url};

const PROGRAM: &str = "uplink";

/// A [`Client`] backed by the `uplink` command line tool.
#[derive(Debug)]
pub struct Uplink {
    config: Config,
}

impl Uplink {
    /// Creates a client.
    ///
    /// An existing configuration directory takes precedence. Without one, an access grant is
    /// required.
    pub fn new(config: Config) -> ClientResult<Self> {
        if let Some(dir) = &config.config_dir {
            tracing::info!(config_dir = %dir.display(), "using existing uplink config");
        } else if config.access.as_deref().is_none_or(str::is_empty) {
            return Err(ClientError::Config("access cannot be empty"));
        }

        Ok(Self { config })
    }

    /// Assembles the command for the given subcommand arguments.
    pub fn command<'a>(&self, subargs: impl IntoIterator<Item = &'a str>) -> Invocation {
        let invocation = Invocation::new(PROGRAM).args(subargs);
        match (&self.config.config_dir, &self.config.access) {
            (Some(dir), _) => invocation.arg("--config-dir").arg(dir),
            (None, access) => invocation
                .arg("--access")
                .arg(access.as_deref().unwrap_or_default()),
        }
    }
}

/// Splits line-oriented `ls` output.
fn parse_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .trim_end_matches('\n')
        .split('\n')
        .map(str::to_owned)
        .collect()
}

#[async_trait::async_trait]
impl Client for Uplink {
    async fn make_bucket(&self, bucket: &str, _location: &str) -> ClientResult<()> {
        let target = s3_url(bucket, None);
        self.command(["mb", target.as_str()]).output(None).await?;
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> ClientResult<()> {
        let target = s3_url(bucket, None);
        self.command(["rb", target.as_str()]).output(None).await?;
        Ok(())
    }

    async fn list_buckets(&self) -> ClientResult<Vec<String>> {
        let output = self.command(["ls"]).output(None).await?;
        Ok(parse_lines(&output))
    }

    async fn upload(&self, bucket: &str, object: &str, data: Bytes) -> ClientResult<()> {
        let target = s3_url(bucket, Some(object));
        self.command(["put", target.as_str()])
            .output(Some(data))
            .await?;
        Ok(())
    }

    async fn upload_multipart(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        _threshold: usize,
    ) -> ClientResult<()> {
        self.upload(bucket, object, data).await
    }

    async fn download(&self, bucket: &str, object: &str) -> ClientResult<Bytes> {
        let source = s3_url(bucket, Some(object));
        self.command(["cat", source.as_str()]).output(None).await
    }

    async fn delete(&self, bucket: &str, object: &str) -> ClientResult<()> {
        let target = s3_url(bucket, Some(object));
        self.command(["rm", target.as_str()]).output(None).await?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> ClientResult<Vec<String>> {
        let target = format!("{}/{prefix}", s3_url(bucket, None));
        let output = self.command(["ls", target.as_str()]).output(None).await?;
        Ok(parse_lines(&output))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args(invocation: &Invocation) -> Vec<&str> {
        invocation
            .args
            .iter()
            .map(|arg| arg.to_str().unwrap())
            .collect()
    }

    #[test]
    fn requires_access_without_config_dir() {
        let err = Uplink::new(Config::default()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = Uplink::new(Config {
            access: Some(String::new()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn access_grant_is_appended() {
        let client = Uplink::new(Config {
            access: Some("grant".into()),
            ..Default::default()
        })
        .unwrap();

        let invocation = client.command(["ls", "s3://bucket/dir/"]);
        assert_eq!(invocation.program, "uplink");
        assert_eq!(
            args(&invocation),
            ["ls", "s3://bucket/dir/", "--access", "grant"]
        );
        assert!(invocation.env.is_empty());
    }

    #[test]
    fn config_dir_takes_precedence() {
        let client = Uplink::new(Config {
            config_dir: Some(PathBuf::from("/etc/uplink")),
            access: Some("grant".into()),
            ..Default::default()
        })
        .unwrap();

        let invocation = client.command(["rb", "s3://bucket"]);
        assert_eq!(
            args(&invocation),
            ["rb", "s3://bucket", "--config-dir", "/etc/uplink"]
        );
    }

    #[test]
    fn ls_output_lines() {
        assert_eq!(
            parse_lines(b"first\nsecond\n\n"),
            ["first", "second"]
        );
        assert_eq!(parse_lines(b"single"), ["single"]);
    }
}
