use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{EntityName, FilePathMapping, SchemaVariant};
use crate::error::IngestError;
use crate::paths::{self, FileSource, IngestMode};
use crate::platemap::PlateMap;
use crate::platform::{FileRegistration, PlatformClient, UploadConfig};
use crate::samples;
use crate::schema::{self, ValidatedPlateMap};
use crate::serialize;
use crate::storage::{ObjectStore, StorageCredentials};
use crate::table::PlateMapTable;

#[derive(Debug, Clone)]
pub enum PlateMapSource {
    File(Utf8PathBuf),
    InMemory(PlateMap),
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub plate_map: PlateMapSource,
    pub sample_description: Option<Utf8PathBuf>,
    pub files: FileSource,
    pub plate_id: String,
    pub plate_name: String,
    pub space: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub plate_id: String,
    pub plate_name: String,
    pub mode: IngestMode,
    pub variant: SchemaVariant,
    pub samples: usize,
    pub ms_data: usize,
    pub files_uploaded: usize,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub variant: SchemaVariant,
    pub rows: usize,
    pub samples: usize,
    pub files: usize,
}

/// Pipeline stage, used in progress messages and failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Preflight,
    PlateCreation,
    UploadConfig,
    ManifestTransfer,
    SampleBatch,
    MetadataBatch,
    FileTransfer,
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "Validate",
            Stage::Preflight => "Preflight",
            Stage::PlateCreation => "PlateCreation",
            Stage::UploadConfig => "UploadConfig",
            Stage::ManifestTransfer => "ManifestTransfer",
            Stage::SampleBatch => "SampleBatch",
            Stage::MetadataBatch => "MetadataBatch",
            Stage::FileTransfer => "FileTransfer",
            Stage::Complete => "Complete",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Inputs checked locally, before any remote call.
#[derive(Debug, Clone)]
pub struct PreparedPlate {
    pub plate_id: EntityName,
    pub plate_name: EntityName,
    pub plate_map: ValidatedPlateMap,
    pub description: Option<PlateMapTable>,
}

pub fn prepare(request: &IngestRequest) -> Result<PreparedPlate, IngestError> {
    let plate_id = EntityName::new("Plate ID", &request.plate_id)?;
    let plate_name = EntityName::new("Plate Name", &request.plate_name)?;
    let (plate_map, description) = load(
        &request.plate_map,
        request.sample_description.as_deref(),
        &request.files,
    )?;
    Ok(PreparedPlate {
        plate_id,
        plate_name,
        plate_map,
        description,
    })
}

/// Offline check of a plate map against its files; no platform access.
pub fn validate_only(
    plate_map: &PlateMapSource,
    description: Option<&Utf8Path>,
    files: &FileSource,
) -> Result<ValidationReport, IngestError> {
    let (plate_map, description) = load(plate_map, description, files)?;
    let samples = samples::extract("", &plate_map, None, description.as_ref());
    Ok(ValidationReport {
        variant: plate_map.variant(),
        rows: plate_map.table().len(),
        samples: samples.len(),
        files: plate_map.file_names().len(),
    })
}

fn load(
    plate_map: &PlateMapSource,
    description: Option<&Utf8Path>,
    files: &FileSource,
) -> Result<(ValidatedPlateMap, Option<PlateMapTable>), IngestError> {
    files.check()?;
    let table = match plate_map {
        PlateMapSource::File(path) => PlateMapTable::from_csv_path(path.as_std_path())?,
        PlateMapSource::InMemory(plate_map) => plate_map.to_table(),
    };
    let validated = schema::validate(table, &files.file_names())?;
    let description = description
        .map(|path| PlateMapTable::from_csv_path(path.as_std_path()))
        .transpose()?;
    Ok((validated, description))
}

#[derive(Clone)]
pub struct Ingestor<P: PlatformClient, S: ObjectStore> {
    platform: P,
    storage: S,
}

impl<P: PlatformClient, S: ObjectStore> Ingestor<P, S> {
    pub fn new(platform: P, storage: S) -> Self {
        Self { platform, storage }
    }

    /// Registers a plate, its samples and MS files; returns the durable plate id.
    ///
    /// Stages run in order and the first failure aborts the rest. Records
    /// created before the failing stage stay on the platform.
    pub fn ingest(
        &self,
        request: IngestRequest,
        sink: &dyn ProgressSink,
    ) -> Result<IngestResult, IngestError> {
        let started = Instant::now();
        progress(sink, Stage::Validate, "checking plate map", None);
        let prepared = prepare(&request)?;
        let space = request.space.as_deref();

        progress(sink, Stage::Preflight, "checking existing plate ids", None);
        let existing = self
            .platform
            .existing_plate_ids()
            .map_err(|err| IngestError::DuplicateCheckUnavailable(err.to_string()))?;
        if existing.contains(prepared.plate_id.as_str()) {
            return Err(IngestError::DuplicatePlateId(
                prepared.plate_id.as_str().to_string(),
            ));
        }

        let linked = match &request.files {
            FileSource::Link(display_paths) => {
                progress(sink, Stage::Preflight, "resolving linked MS files", None);
                let resolved = paths::resolve_linked_paths(&self.platform, display_paths)?;
                Some(paths::by_file_name(&resolved)?)
            }
            FileSource::Upload(_) => None,
        };

        progress(sink, Stage::PlateCreation, "creating plate", None);
        let durable_id = self
            .platform
            .create_plate(&prepared.plate_id, &prepared.plate_name, space)
            .map_err(|err| IngestError::PlateCreationFailed(err.to_string()))?;
        if durable_id.trim().is_empty() {
            return Err(IngestError::PlateCreationFailed(
                "platform returned no plate id".to_string(),
            ));
        }
        tracing::info!(plate_id = %prepared.plate_id, %durable_id, "plate created");

        let outcome = self.register(&request, &prepared, &durable_id, linked, sink);
        if let Err(err) = &outcome {
            tracing::warn!(
                %durable_id,
                error = %err,
                "ingestion aborted after plate creation; plate and any registered records remain on the platform"
            );
        }
        let (samples, ms_data, files_uploaded) = outcome?;

        progress(
            sink,
            Stage::Complete,
            &format!("plate {durable_id} registered"),
            Some(started.elapsed()),
        );
        Ok(IngestResult {
            plate_id: durable_id,
            plate_name: prepared.plate_name.as_str().to_string(),
            mode: request.files.mode(),
            variant: prepared.plate_map.variant(),
            samples,
            ms_data,
            files_uploaded,
            completed_at: Utc::now(),
        })
    }

    fn register(
        &self,
        request: &IngestRequest,
        prepared: &PreparedPlate,
        durable_id: &str,
        linked: Option<FilePathMapping>,
        sink: &dyn ProgressSink,
    ) -> Result<(usize, usize, usize), IngestError> {
        let space = request.space.as_deref();

        progress(sink, Stage::UploadConfig, "fetching upload configuration", None);
        let upload = self
            .platform
            .upload_config(durable_id)
            .map_err(|err| IngestError::UploadConfigUnavailable(err.to_string()))?;
        if upload.bucket.trim().is_empty() {
            return Err(IngestError::UploadConfigUnavailable(
                "platform returned no bucket".to_string(),
            ));
        }
        let credentials = self.credentials()?;

        progress(sink, Stage::ManifestTransfer, "uploading plate map", None);
        // Removed on drop, after the manifests are transferred or on the first error.
        let mut generated = None;
        let plate_map_path = match &request.plate_map {
            PlateMapSource::File(path) => path.clone(),
            PlateMapSource::InMemory(plate_map) => {
                let dir = tempfile::Builder::new()
                    .prefix("plate-ingest")
                    .tempdir()
                    .map_err(|err| IngestError::Filesystem(err.to_string()))?;
                let path = dir.path().join(format!("plateMap_{durable_id}.csv"));
                plate_map.write_csv(&path)?;
                let path = Utf8PathBuf::from_path_buf(path).map_err(|_| {
                    IngestError::Filesystem("non-utf8 temporary path".to_string())
                })?;
                generated = Some(dir);
                path
            }
        };
        self.transfer_manifest(&plate_map_path, &upload, &credentials, space)?;
        if let Some(description) = &request.sample_description {
            progress(sink, Stage::ManifestTransfer, "uploading sample description", None);
            self.transfer_manifest(description, &upload, &credentials, space)?;
        }
        drop(generated);

        progress(sink, Stage::SampleBatch, "creating samples", None);
        let registrations = samples::extract(
            durable_id,
            &prepared.plate_map,
            space,
            prepared.description.as_ref(),
        );
        for (index, sample) in registrations.iter().enumerate() {
            if let Some(field) = sample.missing_required_field() {
                return Err(IngestError::SampleBatchFailed(format!(
                    "sample entry {} ({:?}) is missing {field}",
                    index + 1,
                    sample.sample_id
                )));
            }
        }
        let created = self
            .platform
            .create_samples(&registrations)
            .map_err(|err| IngestError::SampleBatchFailed(err.to_string()))?;
        tracing::info!(count = created.len(), "samples created");

        progress(sink, Stage::MetadataBatch, "registering MS data", None);
        let mapping = match (linked, &request.files) {
            (Some(mapping), _) => mapping,
            (None, FileSource::Upload(files)) => {
                paths::resolve_upload_paths(files, &upload.upload_path, &upload.bucket)?
            }
            (None, FileSource::Link(display_paths)) => {
                let resolved = paths::resolve_linked_paths(&self.platform, display_paths)?;
                paths::by_file_name(&resolved)?
            }
        };
        let records = serialize::serialize(&prepared.plate_map, &created, &mapping, space)?;
        self.platform
            .create_ms_data(&records)
            .map_err(|err| IngestError::MetadataBatchFailed(err.to_string()))?;
        tracing::info!(count = records.len(), "MS data registered");

        let files_uploaded = match &request.files {
            FileSource::Upload(files) => {
                progress(sink, Stage::FileTransfer, "uploading MS files", None);
                self.transfer_raw_files(files, &upload, space)?
            }
            FileSource::Link(_) => 0,
        };

        Ok((registrations.len(), records.len(), files_uploaded))
    }

    fn credentials(&self) -> Result<StorageCredentials, IngestError> {
        self.platform
            .storage_credentials()
            .map_err(|err| IngestError::CredentialsUnavailable(err.to_string()))
    }

    fn transfer_manifest(
        &self,
        path: &Utf8PathBuf,
        upload: &UploadConfig,
        credentials: &StorageCredentials,
        space: Option<&str>,
    ) -> Result<(), IngestError> {
        let name = path.file_name().unwrap_or(path.as_str());
        let key = format!("{}{}", upload.upload_path, name);
        let failed = |err: IngestError| IngestError::ManifestUploadFailed {
            file: name.to_string(),
            message: err.to_string(),
        };
        self.storage
            .put_object(&upload.bucket, &key, path.as_std_path(), credentials)
            .map_err(failed)?;
        let size = file_size(path.as_std_path()).map_err(failed)?;
        self.platform
            .register_files(&[FileRegistration {
                path: key,
                size,
                space: space.map(str::to_string),
            }])
            .map_err(failed)
    }

    fn transfer_raw_files(
        &self,
        files: &[Utf8PathBuf],
        upload: &UploadConfig,
        space: Option<&str>,
    ) -> Result<usize, IngestError> {
        let credentials = self.credentials()?;
        let mut registrations = Vec::with_capacity(files.len());
        for file in files {
            let name = file.file_name().unwrap_or(file.as_str());
            let key = format!("{}{}", upload.upload_path, name);
            let failed = |err: IngestError| IngestError::FileUploadFailed {
                file: name.to_string(),
                message: err.to_string(),
            };
            let size = file_size(file.as_std_path()).map_err(failed)?;
            self.storage
                .put_object(&upload.bucket, &key, file.as_std_path(), &credentials)
                .map_err(failed)?;
            tracing::debug!(file = name, size, "MS file uploaded");
            registrations.push(FileRegistration {
                path: key,
                size,
                space: space.map(str::to_string),
            });
        }
        self.platform
            .register_files(&registrations)
            .map_err(|err| IngestError::FileUploadFailed {
                file: "file index registration".to_string(),
                message: err.to_string(),
            })?;
        Ok(registrations.len())
    }
}

fn file_size(path: &Path) -> Result<u64, IngestError> {
    fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|err| IngestError::Filesystem(format!("{}: {err}", path.display())))
}

fn progress(sink: &dyn ProgressSink, stage: Stage, detail: &str, elapsed: Option<Duration>) {
    tracing::info!(%stage, "{detail}");
    sink.event(ProgressEvent {
        message: format!("phase={stage}; {detail}"),
        elapsed,
    });
}
