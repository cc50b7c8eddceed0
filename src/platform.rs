use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{CreatedSample, EntityName, MsDataRegistration, SampleRegistration};
use crate::error::IngestError;
use crate::storage::StorageCredentials;

/// Authenticated session parameters for the platform API.
#[derive(Clone)]
pub struct Session {
    pub base_url: String,
    pub id_token: String,
    pub access_token: String,
    pub tenant_id: String,
    pub role: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("tenant_id", &self.tenant_id)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadConfig {
    #[serde(rename = "s3Bucket")]
    pub bucket: String,
    #[serde(rename = "s3UploadPath")]
    pub upload_path: String,
}

/// Entry for the file index registration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRegistration {
    #[serde(rename = "filePath")]
    pub path: String,
    #[serde(rename = "fileSize")]
    pub size: u64,
    #[serde(rename = "userGroupId", skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexedFile {
    pub key: String,
    #[serde(rename = "rawFilePath")]
    pub raw_file_path: String,
}

pub trait PlatformClient: Send + Sync {
    /// Tenant prefix used in file index keys.
    fn tenant_id(&self) -> &str;
    fn existing_plate_ids(&self) -> Result<BTreeSet<String>, IngestError>;
    /// Returns the durable plate id; empty when the platform assigned none.
    fn create_plate(
        &self,
        plate_id: &EntityName,
        plate_name: &EntityName,
        space: Option<&str>,
    ) -> Result<String, IngestError>;
    fn upload_config(&self, durable_plate_id: &str) -> Result<UploadConfig, IngestError>;
    fn storage_credentials(&self) -> Result<StorageCredentials, IngestError>;
    fn register_files(&self, files: &[FileRegistration]) -> Result<(), IngestError>;
    fn create_samples(
        &self,
        samples: &[SampleRegistration],
    ) -> Result<Vec<CreatedSample>, IngestError>;
    fn create_ms_data(&self, records: &[MsDataRegistration]) -> Result<(), IngestError>;
    fn folder_metadata(&self, folder_key: Option<&str>) -> Result<Vec<IndexedFile>, IngestError>;
}

#[derive(Clone)]
pub struct PlatformHttpClient {
    client: Client,
    base_url: String,
    tenant_id: String,
}

impl PlatformHttpClient {
    pub fn new(session: &Session, timeout: Option<Duration>) -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("plate-ingest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| IngestError::PlatformHttp(err.to_string()))?,
        );
        headers.insert(AUTHORIZATION, header_value(&session.id_token)?);
        headers.insert("Access-Token", header_value(&session.access_token)?);
        headers.insert("Tenant-Id", header_value(&session.tenant_id)?);
        if let Some(role) = &session.role {
            headers.insert("Role", header_value(role)?);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| IngestError::PlatformHttp(err.to_string()))?;

        let mut base_url = session.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            tenant_id: session.tenant_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, IngestError> {
        let response = request
            .send()
            .map_err(|err| IngestError::PlatformHttp(err.to_string()))?;
        Self::handle_status(response)
    }

    fn handle_status(response: Response) -> Result<Response, IngestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "platform request failed".to_string());
        Err(IngestError::PlatformStatus { status, message })
    }

    fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, IngestError> {
        response
            .json()
            .map_err(|err| IngestError::PlatformHttp(err.to_string()))
    }
}

impl PlatformClient for PlatformHttpClient {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn existing_plate_ids(&self) -> Result<BTreeSet<String>, IngestError> {
        #[derive(Deserialize)]
        struct PlateIds {
            data: Vec<String>,
        }
        let url = self.url("api/v1/plateids");
        tracing::debug!(%url, "fetching plate ids");
        let response = self.send(self.client.get(&url))?;
        let body: PlateIds = Self::json(response)?;
        Ok(body.data.into_iter().collect())
    }

    fn create_plate(
        &self,
        plate_id: &EntityName,
        plate_name: &EntityName,
        space: Option<&str>,
    ) -> Result<String, IngestError> {
        #[derive(Deserialize)]
        struct CreatedPlate {
            #[serde(default)]
            id: Option<String>,
        }
        let url = self.url("api/v1/plates");
        let mut body = json!({
            "plateId": plate_id.as_str(),
            "plateName": plate_name.as_str(),
        });
        if let Some(space) = space {
            body["plateUserGroup"] = json!(space);
        }
        let response = self.send(self.client.post(&url).json(&body))?;
        let body: CreatedPlate = Self::json(response)?;
        Ok(body.id.unwrap_or_default())
    }

    fn upload_config(&self, durable_plate_id: &str) -> Result<UploadConfig, IngestError> {
        let url = self.url("api/v1/msdatas/getuploadconfig");
        let response = self.send(
            self.client
                .post(&url)
                .json(&json!({ "plateId": durable_plate_id })),
        )?;
        Self::json(response)
    }

    fn storage_credentials(&self) -> Result<StorageCredentials, IngestError> {
        #[derive(Deserialize)]
        struct CredentialResponse {
            credentials: StorageCredentials,
        }
        let url = self.url("auth/getawscredential");
        let response = self.send(self.client.get(&url))?;
        let body: CredentialResponse = Self::json(response)?;
        Ok(body.credentials)
    }

    fn register_files(&self, files: &[FileRegistration]) -> Result<(), IngestError> {
        let url = self.url("api/v1/msdataindex/file");
        tracing::debug!(%url, count = files.len(), "registering files");
        let response = self.send(self.client.post(&url).json(&json!({ "files": files })))?;
        let body: serde_json::Value = Self::json(response)?;
        if body.get("created").is_none() {
            return Err(IngestError::PlatformHttp(
                "file index response has no `created` entry".to_string(),
            ));
        }
        Ok(())
    }

    fn create_samples(
        &self,
        samples: &[SampleRegistration],
    ) -> Result<Vec<CreatedSample>, IngestError> {
        let url = self.url("api/v1/samples/batch");
        tracing::debug!(%url, count = samples.len(), "creating samples");
        let response = self.send(
            self.client
                .post(&url)
                .json(&json!({ "samples": samples })),
        )?;
        Self::json(response)
    }

    fn create_ms_data(&self, records: &[MsDataRegistration]) -> Result<(), IngestError> {
        let url = self.url("api/v1/msdatas/batch");
        tracing::debug!(%url, count = records.len(), "creating MS data records");
        self.send(
            self.client
                .post(&url)
                .json(&json!({ "msdatas": records })),
        )?;
        Ok(())
    }

    fn folder_metadata(&self, folder_key: Option<&str>) -> Result<Vec<IndexedFile>, IngestError> {
        #[derive(Deserialize)]
        struct FolderMetadata {
            data: Vec<IndexedFile>,
        }
        let url = self.url("api/v2/msdataindex/getmetadata");
        let mut request = self.client.get(&url).query(&[("all", "true")]);
        if let Some(folder_key) = folder_key {
            request = request.query(&[("folderKey", folder_key)]);
        }
        let response = self.send(request)?;
        let body: FolderMetadata = Self::json(response)?;
        Ok(body.data)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, IngestError> {
    let mut header = HeaderValue::from_str(value.trim())
        .map_err(|err| IngestError::PlatformHttp(err.to_string()))?;
    header.set_sensitive(true);
    Ok(header)
}
