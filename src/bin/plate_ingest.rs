use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use plate_ingest::config::ConfigLoader;
use plate_ingest::domain::basename;
use plate_ingest::error::IngestError;
use plate_ingest::ingest::{self, IngestRequest, Ingestor, PlateMapSource};
use plate_ingest::output::{JsonOutput, OutputMode};
use plate_ingest::paths::FileSource;
use plate_ingest::platform::PlatformHttpClient;
use plate_ingest::storage::S3ObjectStore;

#[derive(Parser)]
#[command(name = "plate-ingest")]
#[command(about = "Register plate maps, samples and MS data files with the analysis platform")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Validate a plate map against local file names without contacting the platform")]
    Validate(ValidateArgs),
    #[command(about = "Register a plate and upload its local MS files")]
    Upload(IngestArgs),
    #[command(about = "Register a plate and link MS files already on the platform")]
    Link(IngestArgs),
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(long)]
    plate_map: Utf8PathBuf,

    #[arg(long)]
    description: Option<Utf8PathBuf>,

    /// File names or paths referenced by the plate map.
    #[arg(required = true)]
    files: Vec<String>,
}

#[derive(Args)]
struct IngestArgs {
    #[arg(long)]
    plate_map: Utf8PathBuf,

    #[arg(long)]
    plate_id: String,

    #[arg(long)]
    plate_name: String,

    #[arg(long)]
    space: Option<String>,

    #[arg(long)]
    description: Option<Utf8PathBuf>,

    #[arg(long)]
    config: Option<String>,

    /// Local file paths (upload) or platform display paths (link).
    #[arg(required = true)]
    files: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<IngestError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngestError) -> u8 {
    if error.is_input_error() {
        return 2;
    }
    match error {
        IngestError::MissingConfig
        | IngestError::ConfigRead(_)
        | IngestError::ConfigParse(_)
        | IngestError::MissingCredential(_) => 2,
        IngestError::DuplicateCheckUnavailable(_)
        | IngestError::DuplicatePlateId(_)
        | IngestError::PlateCreationFailed(_)
        | IngestError::UploadConfigUnavailable(_)
        | IngestError::CredentialsUnavailable(_)
        | IngestError::ManifestUploadFailed { .. }
        | IngestError::SampleBatchFailed(_)
        | IngestError::MetadataBatchFailed(_)
        | IngestError::FileUploadFailed { .. }
        | IngestError::LinkedFilesNotFound(_)
        | IngestError::PlatformHttp(_)
        | IngestError::PlatformStatus { .. }
        | IngestError::Storage(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Upload(args) => {
            let files = FileSource::Upload(args.files.iter().map(Utf8PathBuf::from).collect());
            run_ingest(args, files, output_mode)
        }
        Commands::Link(args) => {
            let files = FileSource::Link(args.files.clone());
            run_ingest(args, files, output_mode)
        }
    }
}

fn run_validate(args: ValidateArgs) -> miette::Result<()> {
    // Only names are compared offline, so the files need not exist locally.
    let files = FileSource::Link(
        args.files
            .iter()
            .map(|file| basename(file).to_string())
            .collect(),
    );
    let report = ingest::validate_only(
        &PlateMapSource::File(args.plate_map),
        args.description.as_deref(),
        &files,
    )?;
    JsonOutput::print_validation(&report).into_diagnostic()?;
    Ok(())
}

fn run_ingest(args: IngestArgs, files: FileSource, output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(args.config.as_deref())?;
    tracing::debug!(session = ?resolved.session, "configuration resolved");
    let platform = PlatformHttpClient::new(&resolved.session, resolved.timeout)?;
    let storage = S3ObjectStore::new(resolved.storage_region)?;
    let ingestor = Ingestor::new(platform, storage);

    let request = IngestRequest {
        plate_map: PlateMapSource::File(args.plate_map),
        sample_description: args.description,
        files,
        plate_id: args.plate_id,
        plate_name: args.plate_name,
        space: args.space,
    };
    let result = ingestor.ingest(request, output_mode.sink())?;
    JsonOutput::print_ingest(&result).into_diagnostic()?;
    Ok(())
}
