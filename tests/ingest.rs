use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use plate_ingest::domain::{
    CreatedSample, EntityName, MsDataRegistration, SampleRegistration, SchemaVariant,
};
use plate_ingest::error::IngestError;
use plate_ingest::ingest::{IngestRequest, Ingestor, PlateMapSource, ProgressEvent, ProgressSink};
use plate_ingest::output::JsonOutput;
use plate_ingest::paths::{FileSource, IngestMode};
use plate_ingest::platemap::{PlateMap, PlateMapAttribute};
use plate_ingest::platform::{FileRegistration, IndexedFile, PlatformClient, UploadConfig};
use plate_ingest::storage::{ObjectStore, StorageCredentials};

const PLATE_MAP: &str = "MS file name,Sample name,Sample ID,Well location,Control,Plate ID,Plate Name\n\
                         a.raw,S1,s1,A1,,P1,Plate One\n\
                         b.raw,S2,s2,A2,,P1,Plate One\n";

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Default)]
struct MockPlatform {
    log: Log,
    existing: BTreeSet<String>,
    durable_id: String,
    fail_on: Option<&'static str>,
    index: Vec<IndexedFile>,
    samples: Arc<Mutex<Vec<SampleRegistration>>>,
    ms_data: Arc<Mutex<Vec<MsDataRegistration>>>,
    files: Arc<Mutex<Vec<FileRegistration>>>,
}

impl MockPlatform {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            durable_id: "plate-uuid-1".to_string(),
            ..Self::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.log.lock().unwrap().push(call.into());
    }

    fn check(&self, method: &str) -> Result<(), IngestError> {
        if self.fail_on == Some(method) {
            return Err(IngestError::PlatformStatus {
                status: 500,
                message: format!("{method} rejected"),
            });
        }
        Ok(())
    }
}

impl PlatformClient for MockPlatform {
    fn tenant_id(&self) -> &str {
        "tenant"
    }

    fn existing_plate_ids(&self) -> Result<BTreeSet<String>, IngestError> {
        self.record("existing_plate_ids");
        self.check("existing_plate_ids")?;
        Ok(self.existing.clone())
    }

    fn create_plate(
        &self,
        plate_id: &EntityName,
        _plate_name: &EntityName,
        _space: Option<&str>,
    ) -> Result<String, IngestError> {
        self.record(format!("create_plate {plate_id}"));
        Ok(self.durable_id.clone())
    }

    fn upload_config(&self, durable_plate_id: &str) -> Result<UploadConfig, IngestError> {
        self.record(format!("upload_config {durable_plate_id}"));
        Ok(UploadConfig {
            bucket: "ms-bucket".to_string(),
            upload_path: format!("tenant/{durable_plate_id}/"),
        })
    }

    fn storage_credentials(&self) -> Result<StorageCredentials, IngestError> {
        self.record("storage_credentials");
        Ok(StorageCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: Some("token".to_string()),
        })
    }

    fn register_files(&self, files: &[FileRegistration]) -> Result<(), IngestError> {
        self.record(format!("register_files {}", files.len()));
        self.check("register_files")?;
        self.files.lock().unwrap().extend_from_slice(files);
        Ok(())
    }

    fn create_samples(
        &self,
        samples: &[SampleRegistration],
    ) -> Result<Vec<CreatedSample>, IngestError> {
        self.record("create_samples");
        self.check("create_samples")?;
        self.samples.lock().unwrap().extend_from_slice(samples);
        let created = samples
            .iter()
            .map(|sample| {
                serde_json::json!({
                    "id": format!("uuid-{}", sample.sample_id),
                    "sample_id": sample.sample_id,
                })
            })
            .collect::<Vec<_>>();
        Ok(serde_json::from_value(serde_json::Value::Array(created)).unwrap())
    }

    fn create_ms_data(&self, records: &[MsDataRegistration]) -> Result<(), IngestError> {
        self.record("create_ms_data");
        self.check("create_ms_data")?;
        self.ms_data.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    fn folder_metadata(&self, folder_key: Option<&str>) -> Result<Vec<IndexedFile>, IngestError> {
        self.record(format!("folder_metadata {}", folder_key.unwrap_or("-")));
        self.check("folder_metadata")?;
        Ok(self.index.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Put {
    bucket: String,
    key: String,
    source: PathBuf,
    content: String,
}

#[derive(Clone, Default)]
struct MockStore {
    log: Log,
    puts: Arc<Mutex<Vec<Put>>>,
    fail_key_suffix: Option<&'static str>,
}

impl ObjectStore for MockStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        _credentials: &StorageCredentials,
    ) -> Result<(), IngestError> {
        self.log.lock().unwrap().push(format!("put {key}"));
        self.puts.lock().unwrap().push(Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: source.to_path_buf(),
            content: String::new(),
        });
        if self.fail_key_suffix.is_some_and(|suffix| key.ends_with(suffix)) {
            return Err(IngestError::Storage("connection reset".to_string()));
        }
        let content = fs::read_to_string(source).map_err(|err| IngestError::Storage(err.to_string()))?;
        if let Some(put) = self.puts.lock().unwrap().last_mut() {
            put.content = content;
        }
        Ok(())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    plate_map: Utf8PathBuf,
    files: Vec<Utf8PathBuf>,
}

fn fixture() -> Fixture {
    let dir = tempfile::Builder::new()
        .prefix("plate-ingest-test")
        .tempdir()
        .unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let plate_map = root.join("plate.csv");
    fs::write(&plate_map, PLATE_MAP).unwrap();
    let files = ["a.raw", "b.raw"]
        .iter()
        .map(|name| {
            let path = root.join(name);
            fs::write(&path, format!("raw {name}")).unwrap();
            path
        })
        .collect();
    Fixture {
        _dir: dir,
        plate_map,
        files,
    }
}

fn request(plate_map: PlateMapSource, files: FileSource) -> IngestRequest {
    IngestRequest {
        plate_map,
        sample_description: None,
        files,
        plate_id: "P1".to_string(),
        plate_name: "Plate One".to_string(),
        space: None,
    }
}

fn calls(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

fn upload_request(fixture: &Fixture) -> IngestRequest {
    request(
        PlateMapSource::File(fixture.plate_map.clone()),
        FileSource::Upload(fixture.files.clone()),
    )
}

fn recording_store(log: &Log, fail_key_suffix: Option<&'static str>) -> MockStore {
    MockStore {
        log: log.clone(),
        fail_key_suffix,
        ..MockStore::default()
    }
}

#[test]
fn upload_registers_plate_samples_and_files_in_order() {
    let fixture = fixture();
    let description = fixture.plate_map.with_file_name("description.csv");
    fs::write(&description, "Sample name,Tissue\nS1,liver\nS2,serum\n").unwrap();

    let log = Log::default();
    let platform = MockPlatform::new(&log);
    let store = MockStore {
        log: log.clone(),
        ..MockStore::default()
    };
    let ingestor = Ingestor::new(platform.clone(), store.clone());

    let mut request = request(
        PlateMapSource::File(fixture.plate_map.clone()),
        FileSource::Upload(fixture.files.clone()),
    );
    request.sample_description = Some(description);
    request.space = Some("lab".to_string());
    let result = ingestor.ingest(request, &JsonOutput).unwrap();

    assert_eq!(result.plate_id, "plate-uuid-1");
    assert_eq!(result.mode, IngestMode::Upload);
    assert_eq!(result.variant, SchemaVariant::Legacy);
    assert_eq!(result.samples, 2);
    assert_eq!(result.ms_data, 2);
    assert_eq!(result.files_uploaded, 2);

    assert_eq!(
        calls(&log),
        vec![
            "existing_plate_ids",
            "create_plate P1",
            "upload_config plate-uuid-1",
            "storage_credentials",
            "put tenant/plate-uuid-1/plate.csv",
            "register_files 1",
            "put tenant/plate-uuid-1/description.csv",
            "register_files 1",
            "create_samples",
            "create_ms_data",
            "storage_credentials",
            "put tenant/plate-uuid-1/a.raw",
            "put tenant/plate-uuid-1/b.raw",
            "register_files 2",
        ]
    );

    let samples = platform.samples.lock().unwrap();
    assert!(samples.iter().all(|sample| sample.plate_id == "plate-uuid-1"));
    assert_eq!(
        samples[0].custom_fields.get("tissue").map(String::as_str),
        Some("liver")
    );

    let ms_data = platform.ms_data.lock().unwrap();
    assert_eq!(ms_data[0].sample_id, "uuid-s1");
    assert_eq!(ms_data[0].raw_file_path, "/ms-bucket/tenant/plate-uuid-1/a.raw");
    assert_eq!(ms_data[1].raw_file_path, "/ms-bucket/tenant/plate-uuid-1/b.raw");

    let files = platform.files.lock().unwrap();
    assert_eq!(files.len(), 4);
    assert_eq!(files[2].path, "tenant/plate-uuid-1/a.raw");
    assert_eq!(files[2].size, "raw a.raw".len() as u64);
    assert_eq!(files[2].space.as_deref(), Some("lab"));

    let puts = store.puts.lock().unwrap();
    assert!(puts.iter().all(|put| put.bucket == "ms-bucket"));
}

#[test]
fn invalid_plate_map_makes_no_remote_calls() {
    let fixture = fixture();
    let log = Log::default();
    let ingestor = Ingestor::new(MockPlatform::new(&log), MockStore::default());

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Upload(fixture.files[..1].to_vec()),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(
        err,
        IngestError::FileCountMismatch {
            in_table: 2,
            supplied: 1
        }
    );
    assert!(calls(&log).is_empty());
}

#[test]
fn invalid_plate_id_argument_makes_no_remote_calls() {
    let fixture = fixture();
    let log = Log::default();
    let ingestor = Ingestor::new(MockPlatform::new(&log), MockStore::default());

    let mut request = request(
        PlateMapSource::File(fixture.plate_map.clone()),
        FileSource::Upload(fixture.files.clone()),
    );
    request.plate_id = "P1&".to_string();
    let err = ingestor.ingest(request, &JsonOutput).unwrap_err();

    assert_matches!(err, IngestError::InvalidEntityName { .. });
    assert!(calls(&log).is_empty());
}

#[test]
fn existing_plate_id_stops_before_creation() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.existing = BTreeSet::from(["P1".to_string()]);
    let ingestor = Ingestor::new(platform, MockStore::default());

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Upload(fixture.files.clone()),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::DuplicatePlateId(id) if id == "P1");
    assert_eq!(calls(&log), vec!["existing_plate_ids"]);
}

#[test]
fn empty_durable_id_is_a_creation_failure() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.durable_id = String::new();
    let ingestor = Ingestor::new(platform, MockStore::default());

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Upload(fixture.files.clone()),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::PlateCreationFailed(_));
    assert_eq!(calls(&log).last().map(String::as_str), Some("create_plate P1"));
}

#[test]
fn rejected_sample_batch_stops_before_ms_data() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.fail_on = Some("create_samples");
    let store = MockStore {
        log: log.clone(),
        ..MockStore::default()
    };
    let ingestor = Ingestor::new(platform.clone(), store);

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Upload(fixture.files.clone()),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::SampleBatchFailed(message) if message.contains("create_samples rejected"));
    let calls = calls(&log);
    assert_eq!(calls.last().map(String::as_str), Some("create_samples"));
    assert!(!calls.iter().any(|call| call == "create_ms_data"));
    assert!(!calls.iter().any(|call| call.ends_with("a.raw")));
}

#[test]
fn link_mode_resolves_paths_before_creating_the_plate() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.index = vec![
        IndexedFile {
            key: "tenant/runs/2024/a.raw".to_string(),
            raw_file_path: "/ms-bucket/tenant/runs/2024/a.raw".to_string(),
        },
        IndexedFile {
            key: "tenant/runs/2024/b.raw".to_string(),
            raw_file_path: "/ms-bucket/tenant/runs/2024/b.raw".to_string(),
        },
    ];
    let store = MockStore {
        log: log.clone(),
        ..MockStore::default()
    };
    let ingestor = Ingestor::new(platform.clone(), store.clone());

    let result = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Link(vec![
                    "runs/2024/a.raw".to_string(),
                    "runs/2024/b.raw".to_string(),
                ]),
            ),
            &JsonOutput,
        )
        .unwrap();

    assert_eq!(result.mode, IngestMode::Link);
    assert_eq!(result.files_uploaded, 0);
    let calls = calls(&log);
    assert_eq!(calls[1], "folder_metadata tenant/runs/2024");
    assert_eq!(calls[2], "create_plate P1");
    assert!(!calls.iter().any(|call| call.ends_with(".raw")));

    let ms_data = platform.ms_data.lock().unwrap();
    assert_eq!(ms_data[1].raw_file_path, "/ms-bucket/tenant/runs/2024/b.raw");
    assert_eq!(store.puts.lock().unwrap().len(), 1);
}

#[test]
fn link_mode_missing_files_fail_without_mutation() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.index = vec![IndexedFile {
        key: "tenant/runs/a.raw".to_string(),
        raw_file_path: "/ms-bucket/tenant/runs/a.raw".to_string(),
    }];
    let ingestor = Ingestor::new(platform, MockStore::default());

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Link(vec!["runs/a.raw".to_string(), "runs/b.raw".to_string()]),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::LinkedFilesNotFound(paths) if paths == vec!["runs/b.raw"]);
    assert!(!calls(&log).iter().any(|call| call.starts_with("create_plate")));
}

fn in_memory_plate_map() -> PlateMap {
    PlateMap::builder(SchemaVariant::Legacy)
        .values(PlateMapAttribute::MsFileName, ["a.raw", "b.raw"])
        .values(PlateMapAttribute::SampleName, ["S1", "S2"])
        .values(PlateMapAttribute::SampleId, ["s1", "s2"])
        .values(PlateMapAttribute::WellLocation, ["A1", "A2"])
        .values(PlateMapAttribute::PlateId, ["P1", "P1"])
        .values(PlateMapAttribute::PlateName, ["Plate One", "Plate One"])
        .build()
        .unwrap()
}

#[test]
fn in_memory_plate_map_is_uploaded_from_a_removed_temp_file() {
    let fixture = fixture();
    let plate_map = in_memory_plate_map();

    let log = Log::default();
    let store = MockStore {
        log: log.clone(),
        ..MockStore::default()
    };
    let ingestor = Ingestor::new(MockPlatform::new(&log), store.clone());
    ingestor
        .ingest(
            request(
                PlateMapSource::InMemory(plate_map),
                FileSource::Upload(fixture.files.clone()),
            ),
            &JsonOutput,
        )
        .unwrap();

    let puts = store.puts.lock().unwrap();
    let manifest = &puts[0];
    assert_eq!(manifest.key, "tenant/plate-uuid-1/plateMap_plate-uuid-1.csv");
    assert!(manifest.content.starts_with("MS file name,Sample name,Sample ID"));
    assert!(!manifest.source.exists());
    assert!(!manifest.source.parent().unwrap().exists());
}

#[test]
fn repeated_basenames_fail_before_any_remote_call() {
    let fixture = fixture();
    let other = fixture.plate_map.with_file_name("other");
    fs::create_dir(&other).unwrap();
    let duplicate = other.join("a.raw");
    fs::write(&duplicate, "raw copy").unwrap();

    let log = Log::default();
    let ingestor = Ingestor::new(MockPlatform::new(&log), recording_store(&log, None));
    let mut files = fixture.files.clone();
    files.push(duplicate);

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Upload(files),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::DuplicateFileName(name) if name == "a.raw");
    assert!(calls(&log).is_empty());
}

#[test]
fn zero_row_plate_map_fails_before_any_remote_call() {
    let fixture = fixture();
    fs::write(
        &fixture.plate_map,
        "MS file name,Sample name,Sample ID,Well location,Control,Plate ID,Plate Name\n",
    )
    .unwrap();

    let log = Log::default();
    let ingestor = Ingestor::new(MockPlatform::new(&log), recording_store(&log, None));
    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Upload(Vec::new()),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::EmptyPlateMap);
    assert!(calls(&log).is_empty());
}

#[test]
fn unavailable_plate_listing_stops_preflight() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.fail_on = Some("existing_plate_ids");
    let ingestor = Ingestor::new(platform, recording_store(&log, None));

    let err = ingestor.ingest(upload_request(&fixture), &JsonOutput).unwrap_err();

    assert_matches!(err, IngestError::DuplicateCheckUnavailable(message) if message.contains("existing_plate_ids rejected"));
    assert_eq!(calls(&log), vec!["existing_plate_ids"]);
}

#[test]
fn failed_manifest_put_stops_before_samples() {
    let fixture = fixture();
    let log = Log::default();
    let ingestor = Ingestor::new(
        MockPlatform::new(&log),
        recording_store(&log, Some("plate.csv")),
    );

    let err = ingestor.ingest(upload_request(&fixture), &JsonOutput).unwrap_err();

    assert_matches!(err, IngestError::ManifestUploadFailed { file, .. } if file == "plate.csv");
    assert_eq!(
        calls(&log).last().map(String::as_str),
        Some("put tenant/plate-uuid-1/plate.csv")
    );
    assert!(!calls(&log).iter().any(|call| call.starts_with("register_files")));
}

#[test]
fn failed_manifest_registration_stops_before_samples() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.fail_on = Some("register_files");
    let ingestor = Ingestor::new(platform, recording_store(&log, None));

    let err = ingestor.ingest(upload_request(&fixture), &JsonOutput).unwrap_err();

    assert_matches!(err, IngestError::ManifestUploadFailed { file, message } if file == "plate.csv" && message.contains("register_files rejected"));
    assert_eq!(calls(&log).last().map(String::as_str), Some("register_files 1"));
    assert!(!calls(&log).iter().any(|call| call == "create_samples"));
}

#[test]
fn rejected_ms_data_batch_stops_before_raw_transfer() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.fail_on = Some("create_ms_data");
    let ingestor = Ingestor::new(platform, recording_store(&log, None));

    let err = ingestor.ingest(upload_request(&fixture), &JsonOutput).unwrap_err();

    assert_matches!(err, IngestError::MetadataBatchFailed(message) if message.contains("create_ms_data rejected"));
    let calls = calls(&log);
    assert_eq!(calls.last().map(String::as_str), Some("create_ms_data"));
    assert!(!calls.iter().any(|call| call.ends_with(".raw")));
}

#[test]
fn failed_raw_transfer_names_the_first_failing_file() {
    let fixture = fixture();
    let log = Log::default();
    let ingestor = Ingestor::new(MockPlatform::new(&log), recording_store(&log, Some("b.raw")));

    let err = ingestor.ingest(upload_request(&fixture), &JsonOutput).unwrap_err();

    assert_matches!(err, IngestError::FileUploadFailed { file, message } if file == "b.raw" && message.contains("connection reset"));
    let calls = calls(&log);
    assert_eq!(
        calls.last().map(String::as_str),
        Some("put tenant/plate-uuid-1/b.raw")
    );
    assert!(calls.iter().any(|call| call == "put tenant/plate-uuid-1/a.raw"));
    assert!(!calls.iter().any(|call| call == "register_files 2"));
}

#[test]
fn failed_folder_lookup_reports_every_path_without_mutation() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.fail_on = Some("folder_metadata");
    let ingestor = Ingestor::new(platform, recording_store(&log, None));

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Link(vec!["runs/a.raw".to_string(), "runs/b.raw".to_string()]),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::LinkedFilesNotFound(paths) if paths == vec!["runs/a.raw", "runs/b.raw"]);
    assert_eq!(
        calls(&log),
        vec!["existing_plate_ids", "folder_metadata tenant/runs"]
    );
}

#[test]
fn in_memory_temp_file_is_removed_when_manifest_transfer_fails() {
    let fixture = fixture();
    let log = Log::default();
    let store = recording_store(&log, Some(".csv"));
    let ingestor = Ingestor::new(MockPlatform::new(&log), store.clone());

    let err = ingestor
        .ingest(
            request(
                PlateMapSource::InMemory(in_memory_plate_map()),
                FileSource::Upload(fixture.files.clone()),
            ),
            &JsonOutput,
        )
        .unwrap_err();

    assert_matches!(err, IngestError::ManifestUploadFailed { file, .. } if file == "plateMap_plate-uuid-1.csv");
    let puts = store.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert!(!puts[0].source.exists());
    assert!(!puts[0].source.parent().unwrap().exists());
}

#[test]
fn link_mode_completion_is_not_reported_as_file_transfer() {
    let fixture = fixture();
    let log = Log::default();
    let mut platform = MockPlatform::new(&log);
    platform.index = ["a.raw", "b.raw"]
        .iter()
        .map(|name| IndexedFile {
            key: format!("tenant/runs/{name}"),
            raw_file_path: format!("/ms-bucket/tenant/runs/{name}"),
        })
        .collect();
    let ingestor = Ingestor::new(platform, recording_store(&log, None));
    let sink = RecordingSink::default();

    ingestor
        .ingest(
            request(
                PlateMapSource::File(fixture.plate_map.clone()),
                FileSource::Link(vec!["runs/a.raw".to_string(), "runs/b.raw".to_string()]),
            ),
            &sink,
        )
        .unwrap();

    let messages = sink.messages.lock().unwrap();
    assert!(!messages.iter().any(|message| message.starts_with("phase=FileTransfer")));
    assert_eq!(
        messages.last().map(String::as_str),
        Some("phase=Complete; plate plate-uuid-1 registered")
    );
}
