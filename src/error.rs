use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("plate map is missing required columns: {}", .0.join(", "))]
    #[diagnostic(help("legacy plate maps also require a `Control` column"))]
    MissingColumns(Vec<String>),

    #[error("plate map row {row} has no value in required column `{column}`")]
    MissingRequiredValue { column: String, row: usize },

    #[error("{field} contains unsupported characters: {value:?}")]
    #[diagnostic(help("use letters, digits, spaces and `_ - . , ( )` only"))]
    InvalidEntityName { field: String, value: String },

    #[error("columns must be numeric: {}", .0.join(", "))]
    NonNumericColumn(Vec<String>),

    #[error("plate map references {in_table} distinct MS files but {supplied} were supplied")]
    FileCountMismatch { in_table: usize, supplied: usize },

    #[error("plate map does not reference the supplied MS files: {}", .0.join(", "))]
    MissingFileReference(Vec<String>),

    #[error("unsupported MS file extension: {}", .0.join(", "))]
    #[diagnostic(help("supported: .d, .d.zip, .mzml, .raw, .wiff, .wiff.scan"))]
    InvalidRawFileExtension(Vec<String>),

    #[error("samples are assigned to more than one plate: {}", .0.join(", "))]
    AmbiguousPlateAssignment(Vec<String>),

    #[error("MS file name supplied more than once: {0}")]
    DuplicateFileName(String),

    #[error("plate map lists no MS files")]
    EmptyPlateMap,

    #[error("plate map column `{column}` has {len} values but only {files} MS files were given")]
    PlateMapColumnTooLong {
        column: String,
        len: usize,
        files: usize,
    },

    #[error("invalid platform folder path: {0:?}")]
    InvalidFolderPath(String),

    #[error("no created sample matches sample id {0:?}")]
    UnknownSampleId(String),

    #[error("no resolved storage path for MS file {0:?}")]
    UnresolvedFilePath(String),

    #[error("could not fetch existing plate ids: {0}")]
    DuplicateCheckUnavailable(String),

    #[error("plate id {0:?} already exists")]
    DuplicatePlateId(String),

    #[error("plate creation failed: {0}")]
    PlateCreationFailed(String),

    #[error("could not fetch upload configuration: {0}")]
    UploadConfigUnavailable(String),

    #[error("could not fetch storage credentials: {0}")]
    CredentialsUnavailable(String),

    #[error("failed to transfer manifest {file}: {message}")]
    ManifestUploadFailed { file: String, message: String },

    #[error("sample batch rejected: {0}")]
    SampleBatchFailed(String),

    #[error("MS data batch rejected: {0}")]
    MetadataBatchFailed(String),

    #[error("failed to upload MS file {file}: {message}")]
    FileUploadFailed { file: String, message: String },

    #[error("could not locate MS files on the platform: {}", .0.join(", "))]
    LinkedFilesNotFound(Vec<String>),

    #[error("platform request failed: {0}")]
    PlatformHttp(String),

    #[error("platform returned status {status}: {message}")]
    PlatformStatus { status: u16, message: String },

    #[error("object storage request failed: {0}")]
    Storage(String),

    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("{0} is a directory; only single files can be uploaded")]
    #[diagnostic(help("zip instrument `.d` directories and upload them as `.d.zip`"))]
    DirectoryUpload(PathBuf),

    #[error("failed to parse table {path}: {message}")]
    TableParse { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("missing platform URL: set PAS_URL or `base_url` in plate-ingest.json")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),
}

impl IngestError {
    /// True for failures raised before any remote call is attempted.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            IngestError::MissingColumns(_)
                | IngestError::MissingRequiredValue { .. }
                | IngestError::InvalidEntityName { .. }
                | IngestError::NonNumericColumn(_)
                | IngestError::FileCountMismatch { .. }
                | IngestError::MissingFileReference(_)
                | IngestError::InvalidRawFileExtension(_)
                | IngestError::AmbiguousPlateAssignment(_)
                | IngestError::DuplicateFileName(_)
                | IngestError::EmptyPlateMap
                | IngestError::PlateMapColumnTooLong { .. }
                | IngestError::InvalidFolderPath(_)
                | IngestError::PathNotFound(_)
                | IngestError::DirectoryUpload(_)
                | IngestError::TableParse { .. }
        )
    }
}
