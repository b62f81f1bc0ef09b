//! The object-store collaborator: the minimal surface the upload algorithms
//! need from a storage backend, and its implementation on top of the AWS SDK.

use crate::err::Error;
use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use std::path::Path;

/// Storage backend seam. All calls are stateless, so one handle can be
/// cloned and shared across concurrent workers.
#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, Error>;
    /// Write the contents of the local file at `path` to `bucket`/`key`,
    /// overwriting any existing object under that key.
    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), Error>;
    /// Make an existing object publicly readable.
    async fn set_public(&self, bucket: &str, key: &str) -> Result<(), Error>;
    async fn list_buckets(&self) -> Result<Vec<String>, Error>;
}

/// `ObjectStore` over an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration (environment,
    /// profile, instance metadata).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

/// Classify an SDK error into the crate's taxonomy. The service error code
/// is the only reliable discriminator across S3-compatible backends.
fn classify<E>(err: SdkError<E>, bucket: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err.code() {
        Some("NoSuchBucket") => Error::BucketNotFound {
            bucket: bucket.to_owned(),
        },
        Some("AccessDenied") | Some("Forbidden") | Some("InvalidAccessKeyId")
        | Some("SignatureDoesNotMatch") => Error::AccessDenied {
            detail: format!("{}", DisplayErrorContext(&err)),
        },
        _ => Error::Transfer {
            detail: format!("{}", DisplayErrorContext(&err)),
        },
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, Error> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if let SdkError::ServiceError(ref ctx) = e {
                    if ctx.err().is_not_found() {
                        return Ok(false);
                    }
                }
                // HeadBucket reports inaccessible buckets as a bare 403
                match classify(e, bucket) {
                    Error::AccessDenied { .. } => Ok(false),
                    other => Err(other),
                }
            }
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), Error> {
        let body = ByteStream::from_path(path).await.map_err(|e| {
            if path.exists() {
                Error::Transfer {
                    detail: e.to_string(),
                }
            } else {
                Error::LocalNotFound {
                    path: path.to_owned(),
                }
            }
        })?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify(e, bucket))
    }

    async fn set_public(&self, bucket: &str, key: &str) -> Result<(), Error> {
        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify(e, bucket))
    }

    async fn list_buckets(&self) -> Result<Vec<String>, Error> {
        let out = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| classify(e, ""))?;
        Ok(out
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_owned))
            .collect())
    }
}
