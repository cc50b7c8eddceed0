use std::fmt;
use std::path::Path;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::error::IngestError;

/// Short-lived object storage credentials issued by the platform.
///
/// Passed explicitly to every transfer; never exported to the process environment.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct StorageCredentials {
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "SessionToken", default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

pub trait ObjectStore: Send + Sync {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        credentials: &StorageCredentials,
    ) -> Result<(), IngestError>;
}

/// S3 transfers driven from a private single-threaded runtime.
pub struct S3ObjectStore {
    runtime: Runtime,
    region: String,
}

impl S3ObjectStore {
    pub fn new(region: impl Into<String>) -> Result<Self, IngestError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| IngestError::Storage(err.to_string()))?;
        Ok(Self {
            runtime,
            region: region.into(),
        })
    }

    fn client(&self, credentials: &StorageCredentials) -> Client {
        let credentials = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            "plate-ingest",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .build();
        Client::from_conf(config)
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        credentials: &StorageCredentials,
    ) -> Result<(), IngestError> {
        let client = self.client(credentials);
        tracing::debug!(bucket, key, source = %source.display(), "put object");
        self.runtime.block_on(async {
            let body = ByteStream::from_path(source)
                .await
                .map_err(|err| IngestError::Storage(err.to_string()))?;
            client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|err| IngestError::Storage(DisplayErrorContext(&err).to_string()))?;
            Ok(())
        })
    }
}
