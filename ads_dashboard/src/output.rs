//! Report destinations: a local file or an S3 object.

use anyhow::{bail, Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Local(String),
    S3 { bucket: String, key: String },
}

impl Destination {
    /// `s3://bucket/key` uploads; anything else is a local path. An `s3://`
    /// target without both a bucket and a key is rejected.
    pub fn parse(target: &str) -> Result<Self> {
        if let Some((bucket, key)) = parse_s3_uri(target) {
            return Ok(Self::S3 { bucket, key });
        }
        if target.starts_with("s3://") {
            bail!("Invalid S3 URI '{target}', expected s3://bucket/key");
        }
        Ok(Self::Local(target.to_string()))
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{path}"),
            Self::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Parse an S3 URI like s3://bucket/key into (bucket, key)
pub fn parse_s3_uri(uri: &str) -> Option<(String, String)> {
    let stripped = uri.strip_prefix("s3://")?;
    let (bucket, key) = stripped.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket.to_string(), key.to_string()))
}

async fn upload_to_s3(client: &S3Client, bucket: &str, key: &str, html: String) -> Result<()> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type("text/html; charset=utf-8")
        .body(ByteStream::from(html.into_bytes()))
        .send()
        .await
        .with_context(|| format!("Failed to upload s3://{bucket}/{key}"))?;
    Ok(())
}

pub async fn write_report(destination: &Destination, html: String) -> Result<()> {
    match destination {
        Destination::S3 { bucket, key } => {
            let aws_conf = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .load()
                .await;
            let client = S3Client::new(&aws_conf);
            upload_to_s3(&client, bucket, key, html).await
        }
        Destination::Local(path) => tokio::fs::write(path, html)
            .await
            .with_context(|| format!("Failed to write HTML report to {path}")),
    }
}
