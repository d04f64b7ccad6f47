use crate::{
    extract::ExtractionJob, logger::SECTION_WIDTH, media_info::SubtitleSummary, track::Track,
    utils,
};

use colored::Colorize;
use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Mutex,
};

/// User facing output.
///
/// Diagnostics go through the `log` macros; everything the user is meant
/// to read as a result of a command goes through here.
pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Box::new(io::stdout()))
    }
}

impl Console {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            _ = writeln!(out, "{text}");
        }
    }

    /// Write text without a trailing newline, e.g. a prompt.
    pub fn inline(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            _ = write!(out, "{text}");
            _ = out.flush();
        }
    }

    pub fn title(&self, title: &str) {
        let banner = format!("{:=^1$}", format!(" {title} "), SECTION_WIDTH);
        self.line(&banner.bold().cyan().to_string());
    }

    pub fn section(&self, title: &str) {
        self.line(&format!("{:-^1$}", format!(" {title} "), SECTION_WIDTH).bold().to_string());
    }

    pub fn info(&self, message: &str) {
        self.line(&format!("{} {message}", "::".blue()));
    }

    pub fn success(&self, message: &str) {
        self.line(&format!("{} {message}", "✓".green().bold()));
    }

    pub fn warning(&self, message: &str) {
        self.line(&format!("{} {message}", "!".yellow().bold()));
    }

    pub fn error(&self, message: &str) {
        self.line(&format!("{} {message}", "✗".red().bold()));
    }

    /// List subtitle tracks, one per line.
    pub fn tracks(&self, tracks: &[Track]) {
        for track in tracks {
            let name = track.name().unwrap_or("-");
            self.line(&format!(
                "  {:>4}  {:<4} {:<12} {:<7} forced: {:<3}  default: {:<3}  {}",
                track.number.to_string().bold(),
                if track.language.is_empty() { "und" } else { track.language.as_str() },
                track.language_name(),
                track.codec().to_string(),
                utils::bool_to_yes_no(track.forced),
                utils::bool_to_yes_no(track.default_track),
                name
            ));
        }
    }

    pub fn summary(&self, summary: &SubtitleSummary) {
        let or_none = |v: &[String]| {
            if v.is_empty() {
                "none".to_string()
            } else {
                v.join(", ")
            }
        };

        self.line(&format!(
            "  {} subtitle track(s), languages: {}, formats: {}",
            summary.track_count,
            or_none(&summary.languages),
            or_none(&summary.formats)
        ));
    }

    /// Describe the files a set of jobs will write.
    pub fn plan(&self, jobs: &[ExtractionJob]) {
        for job in jobs {
            let files: Vec<String> = job
                .output_files()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            self.line(&format!(
                "  {} -> {}",
                job.original.describe(),
                files.join(" + ")
            ));
        }
    }

    /// List the files that were written.
    pub fn written(&self, files: &[PathBuf]) {
        for file in files {
            self.line(&format!("  {}", file.display()));
        }
    }
}
