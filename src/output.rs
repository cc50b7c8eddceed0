use std::io::{self, Write};

use serde::Serialize;

use crate::ingest::{IngestResult, ProgressEvent, ProgressSink, ValidationReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

impl OutputMode {
    pub fn sink(self) -> &'static dyn ProgressSink {
        match self {
            OutputMode::Interactive => &StderrProgress,
            OutputMode::NonInteractive => &JsonOutput,
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_ingest(result: &IngestResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_validation(report: &ValidationReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable stage lines on stderr, keeping stdout for the JSON result.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        let mut stderr = io::stderr();
        let _ = match event.elapsed {
            Some(elapsed) => writeln!(
                stderr,
                "{} ({:.1}s)",
                event.message,
                elapsed.as_secs_f64()
            ),
            None => writeln!(stderr, "{}", event.message),
        };
    }
}
