use crate::config::CliFlags;

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mkv-subtitle-extract")]
#[command(
    author,
    version,
    about = "Extract subtitle tracks from MKV files by language, track number or format"
)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["extract", "batch", "info", "paths"])
))]
pub struct Cli {
    /// Extract the subtitles of a single file
    #[arg(short = 'x', long, value_name = "FILE")]
    pub extract: Option<PathBuf>,

    /// Extract the subtitles of every MKV file matching a glob pattern, e.g. "shows/**/*.mkv"
    #[arg(short, long, value_name = "PATTERN")]
    pub batch: Option<String>,

    /// Show the subtitle tracks of a file without extracting anything
    #[arg(short, long, value_name = "FILE")]
    pub info: Option<PathBuf>,

    /// Files or directories to handle interactively
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Tracks to extract: language codes, track numbers or formats, e.g. "eng,14,srt"
    #[arg(short, long, value_name = "EXPR")]
    pub select: Option<String>,

    /// Tracks to leave out, using the same syntax as --select
    #[arg(short, long, value_name = "EXPR")]
    pub exclude: Option<String>,

    /// Output directory. Without a value, a "<basename>-subtitles" directory is used for each file
    #[arg(short, long, value_name = "DIR", num_args = 0..=1)]
    pub output_dir: Option<Option<PathBuf>>,

    /// Output filename template, e.g. "{basename}.{language}.{trackno}.{extension}"
    #[arg(short = 'f', long = "format", value_name = "TEMPLATE")]
    pub template: Option<String>,

    /// Show what would be extracted without writing anything
    #[arg(short, long)]
    pub dry_run: bool,

    /// Extract each track with its own mkvextract call, so a failing track does not stop the others
    #[arg(long)]
    pub per_track: bool,

    /// Path to a JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Name of a profile from the configuration file
    #[arg(short, long, value_name = "NAME", requires = "config")]
    pub profile: Option<String>,

    /// Number of files processed at the same time in batch mode (at most 4)
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Increase the logging verbosity, can be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write a detailed log to a file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,
}

/// What the program has been asked to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Extract(PathBuf),
    Batch(String),
    Info(PathBuf),
    Interactive(Vec<PathBuf>),
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if let Some(file) = &self.extract {
            Mode::Extract(file.clone())
        } else if let Some(pattern) = &self.batch {
            Mode::Batch(pattern.clone())
        } else if let Some(file) = &self.info {
            Mode::Info(file.clone())
        } else {
            Mode::Interactive(self.paths.clone())
        }
    }

    /// The values that override the configuration file.
    pub fn flags(&self) -> CliFlags {
        CliFlags {
            select: self.select.clone(),
            exclude: self.exclude.clone(),
            output_template: self.template.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    pub fn workers(&self) -> Option<usize> {
        self.jobs.map(usize::from)
    }
}
