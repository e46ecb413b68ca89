//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from sh3-core.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{BucketCannedAcl, ObjectCannedAcl};
use tokio::io::AsyncReadExt;
use tracing::debug;

use sh3_core::{
    AclTarget, BucketInfo, CannedAcl, Connector, Credentials, Error, ListOptions, ListingEntry,
    Metadata, ObjectReader, ObjectStore, ObjectStream, PolicyDocument, PutOptions, Result, Status,
};

use crate::acl::{policy_from_sdk, policy_to_sdk};

/// Settings shared by every client a connector builds
#[derive(Debug, Clone)]
pub struct S3Options {
    pub region: String,
    /// Use https when the host carries no scheme
    pub secure: bool,
}

impl Default for S3Options {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            secure: true,
        }
    }
}

/// Endpoint URL for a shell host such as `s3.amazonaws.com` or `localhost:9000`
pub fn endpoint_url(host: &str, secure: bool) -> Result<String> {
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        let scheme = if secure { "https" } else { "http" };
        format!("{scheme}://{host}")
    };
    let url = url::Url::parse(&raw)?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client for one account
    pub async fn new(credentials: &Credentials, options: &S3Options) -> Result<Self> {
        let endpoint = endpoint_url(&credentials.host, options.secure)?;

        let provider = aws_credential_types::Credentials::new(
            credentials.access_key.clone(),
            credentials.secret_key.clone(),
            None, // session token
            None, // expiry
            "sh3-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(provider)
            .region(aws_config::Region::new(options.region.clone()))
            .endpoint_url(&endpoint)
            .load()
            .await;

        // Path-style addressing keeps bucket names out of the host
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        debug!(endpoint = %endpoint, region = %options.region, "Created S3 client");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

fn timestamp(dt: &DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(dt.secs()).ok()
}

/// Classify an SDK failure
fn map_error<E>(err: SdkError<E, HttpResponse>, target: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().unwrap_or_default();

    if status == Some(404) || matches!(code, "NoSuchKey" | "NoSuchBucket" | "NotFound") {
        return Error::NotFound(target.to_string());
    }

    match status {
        Some(status) => Error::Remote {
            status,
            message: err.message().unwrap_or(code).to_string(),
        },
        None => Error::Network(DisplayErrorContext(&err).to_string()),
    }
}

/// Report a rejected write as its status instead of an error
fn write_status(result: Result<()>, success: Status) -> Result<Status> {
    match result {
        Ok(()) => Ok(success),
        Err(Error::Remote { status, message }) => Ok(Status::new(status, message)),
        Err(e) => Err(e),
    }
}

async fn collect(body: ByteStream) -> Result<Vec<u8>> {
    Ok(body
        .collect()
        .await
        .map_err(|e| Error::Network(e.to_string()))?
        .into_bytes()
        .to_vec())
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_error(e, "bucket list"))?;

        Ok(response
            .buckets()
            .iter()
            .map(|b| BucketInfo {
                name: b.name().unwrap_or_default().to_string(),
                creation_time: b.creation_date().and_then(timestamp),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        options: &ListOptions,
    ) -> Result<Vec<ListingEntry>> {
        let mut request = self.inner.list_objects_v2().bucket(bucket).fetch_owner(true);

        if let Some(prefix) = &options.prefix {
            request = request.prefix(prefix);
        }
        if let Some(after) = &options.after {
            request = request.start_after(after);
        }
        if let Some(limit) = options.limit {
            request = request.max_keys(limit);
        }

        let response = request.send().await.map_err(|e| map_error(e, bucket))?;
        debug!(bucket, count = response.contents().len(), "Listed objects");

        Ok(response
            .contents()
            .iter()
            .map(|object| ListingEntry {
                key: object.key().unwrap_or_default().to_string(),
                size_bytes: object.size().unwrap_or(0),
                last_modified: object.last_modified().and_then(timestamp),
                owner_display_name: object
                    .owner()
                    .and_then(|o| o.display_name())
                    .map(str::to_string),
            })
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let target = format!("{bucket}/{key}");
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_error(e, &target))?;

        collect(response.body).await
    }

    async fn get_object_reader(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
        let target = format!("{bucket}/{key}");
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_error(e, &target))?;

        let length = response
            .content_length()
            .and_then(|n| u64::try_from(n).ok());
        Ok(ObjectStream {
            reader: Box::pin(response.body.into_async_read()),
            length,
        })
    }

    async fn get_torrent(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let target = format!("{bucket}/{key}");
        let response = self
            .inner
            .get_object_torrent()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_error(e, &target))?;

        collect(response.body).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<Status> {
        let target = format!("{bucket}/{key}");
        let size = data.len() as i64;

        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size)
            .body(ByteStream::from(data));

        if let Some(ct) = &options.content_type {
            request = request.content_type(ct);
        }
        if let Some(acl) = options.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }

        let result = request
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_error(e, &target));
        debug!(object = %target, size, ok = result.is_ok(), "Put object");

        write_status(result, Status::ok())
    }

    async fn put_object_reader(
        &self,
        bucket: &str,
        key: &str,
        mut reader: ObjectReader,
        length: Option<u64>,
        options: &PutOptions,
    ) -> Result<Status> {
        // A single PUT needs a known length, so the stream is buffered here.
        let mut data = Vec::with_capacity(length.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        reader.read_to_end(&mut data).await?;
        self.put_object(bucket, key, data, options).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<Status> {
        let target = format!("{bucket}/{key}");
        let result = self
            .inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_error(e, &target));

        write_status(result, Status::no_content())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Metadata> {
        let target = format!("{bucket}/{key}");
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_error(e, &target))?;

        let mut meta = Metadata::new();
        if let Some(len) = response.content_length() {
            meta.insert("Content-Length".into(), len.to_string());
        }
        if let Some(ct) = response.content_type() {
            meta.insert("Content-Type".into(), ct.to_string());
        }
        if let Some(etag) = response.e_tag() {
            meta.insert("ETag".into(), etag.trim_matches('"').to_string());
        }
        if let Some(modified) = response.last_modified().and_then(timestamp) {
            meta.insert("Last-Modified".into(), modified.to_string());
        }
        if let Some(sc) = response.storage_class() {
            meta.insert("Storage-Class".into(), sc.as_str().to_string());
        }
        if let Some(user) = response.metadata() {
            for (k, v) in user {
                meta.insert(format!("x-amz-meta-{k}"), v.clone());
            }
        }

        Ok(meta)
    }

    async fn head_bucket(&self, bucket: &str) -> Result<Metadata> {
        let response = self
            .inner
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_error(e, bucket))?;

        let mut meta = Metadata::new();
        if let Some(region) = response.bucket_region() {
            meta.insert("Bucket-Region".into(), region.to_string());
        }
        Ok(meta)
    }

    async fn get_acl(&self, target: &AclTarget) -> Result<PolicyDocument> {
        let name = target.to_string();
        match target {
            AclTarget::Bucket(bucket) => {
                let response = self
                    .inner
                    .get_bucket_acl()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| map_error(e, &name))?;
                policy_from_sdk(response.owner(), response.grants())
            }
            AclTarget::Item { bucket, key } => {
                let response = self
                    .inner
                    .get_object_acl()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| map_error(e, &name))?;
                policy_from_sdk(response.owner(), response.grants())
            }
        }
    }

    async fn put_acl(&self, target: &AclTarget, policy: &PolicyDocument) -> Result<Status> {
        let name = target.to_string();
        let sdk_policy = policy_to_sdk(policy)?;

        let result = match target {
            AclTarget::Bucket(bucket) => self
                .inner
                .put_bucket_acl()
                .bucket(bucket)
                .access_control_policy(sdk_policy)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| map_error(e, &name)),
            AclTarget::Item { bucket, key } => self
                .inner
                .put_object_acl()
                .bucket(bucket)
                .key(key)
                .access_control_policy(sdk_policy)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| map_error(e, &name)),
        };

        write_status(result, Status::ok())
    }

    async fn create_bucket(&self, bucket: &str, acl: Option<CannedAcl>) -> Result<Status> {
        let mut request = self.inner.create_bucket().bucket(bucket);
        if let Some(acl) = acl {
            request = request.acl(BucketCannedAcl::from(acl.as_str()));
        }

        let result = request
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_error(e, bucket));

        write_status(result, Status::ok())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<Status> {
        let result = self
            .inner
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_error(e, bucket));

        write_status(result, Status::no_content())
    }
}

/// Builds [`S3Client`]s for session credentials
#[derive(Debug, Clone, Default)]
pub struct S3Connector {
    options: S3Options,
}

impl S3Connector {
    pub fn new(options: S3Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for S3Connector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStore>> {
        let client = S3Client::new(credentials, &self.options).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_adds_scheme() {
        assert_eq!(
            endpoint_url("s3.amazonaws.com", true).unwrap(),
            "https://s3.amazonaws.com"
        );
        assert_eq!(
            endpoint_url("localhost:9000", false).unwrap(),
            "http://localhost:9000"
        );
    }

    #[test]
    fn test_endpoint_url_keeps_explicit_scheme() {
        assert_eq!(
            endpoint_url("http://127.0.0.1:9000", true).unwrap(),
            "http://127.0.0.1:9000"
        );
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert!(endpoint_url("http://", true).is_err());
    }

    #[test]
    fn test_write_status_keeps_remote_code() {
        let status = write_status(
            Err(Error::Remote {
                status: 403,
                message: "AccessDenied".into(),
            }),
            Status::no_content(),
        )
        .unwrap();
        assert_eq!(status.code, 403);
        assert!(!status.is_no_content());

        let status = write_status(Ok(()), Status::no_content()).unwrap();
        assert!(status.is_no_content());

        assert!(write_status(Err(Error::Network("reset".into())), Status::ok()).is_err());
    }
}
