use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure that can stop the processing of a file, or of the whole run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("File does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("File is not an MKV file: {}", .0.display())]
    NotMkvFile(PathBuf),

    /// The metadata query reported a container family other than Matroska.
    #[error("File is not a valid Matroska container (reported type '{0}')")]
    NotMatroska(String),

    #[error("No subtitle tracks found in {}", .0.display())]
    NoSubtitleTracks(PathBuf),

    #[error("No subtitle tracks match the specified selection criteria")]
    NoMatchingTracks,

    #[error("Failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The external tool ran but reported a failure. `output` holds whatever
    /// diagnostic text the tool produced.
    #[error("{tool} failed with exit code {code:?}: {output}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Error parsing track information: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{0}' not found in configuration")]
    ProfileNotFound(String),

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No MKV files found matching: {0}")]
    NoFilesFound(String),

    #[error("Unknown language code, format, or invalid track ID: {}", .0.join(", "))]
    InvalidSelection(Vec<String>),

    #[error("Failed to start the worker pool: {0}")]
    WorkerPool(String),

    #[error("Batch processing completed with {failed} error(s) out of {total} file(s)")]
    BatchFailed { failed: usize, total: usize },
}

impl Error {
    /// A short label for the failure category, used in one-line reports.
    pub fn category(&self) -> &'static str {
        match self {
            Error::FileNotFound(_) | Error::NotMkvFile(_) | Error::NotMatroska(_) => {
                "invalid input"
            }
            Error::NoSubtitleTracks(_) | Error::NoMatchingTracks => "no matching tracks",
            Error::ToolLaunch { .. } | Error::ToolFailed { .. } | Error::Json(_) => {
                "external tool failure"
            }
            Error::InvalidSelection(_) => "invalid selection",
            Error::Config(_) | Error::ProfileNotFound(_) => "configuration",
            Error::InvalidPattern { .. } | Error::NoFilesFound(_) => "invalid input",
            Error::Io(_) | Error::WorkerPool(_) => "system error",
            Error::BatchFailed { .. } => "batch failure",
        }
    }
}
