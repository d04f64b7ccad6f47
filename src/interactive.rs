use crate::{
    console::Console,
    error::{Error, Result},
    file_processor::{BatchSummary, FileProcessor, FileReport, ProcessOptions},
    mkvtoolnix::TrackExtractor,
    selection::{self, Selection, TrackFilter},
};

use colored::Colorize;
use log::warn;
use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

const SELECTION_EXAMPLE: &str =
    "Language: eng,spa,fre  |  Track ID: 14,16,18  |  Format: srt,ass,sup  |  Mixed: eng,14,srt";

/// Asks the user which tracks to extract.
pub struct Prompter<'a, R: BufRead> {
    input: R,
    console: &'a Console,
}

impl<'a, R: BufRead> Prompter<'a, R> {
    pub fn new(input: R, console: &'a Console) -> Self {
        Self { input, console }
    }

    /// Show a prompt and read one trimmed line. Returns `None` once the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.console.inline(&prompt.bold().to_string());

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_string()))
    }

    /// Ask whether every track should be extracted. An empty answer means yes.
    pub fn confirm_extract_all(&mut self) -> Result<bool> {
        loop {
            let Some(answer) = self.read_line("Extract all tracks? Y/n (default: Y): ")? else {
                return Ok(true);
            };

            match answer.to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self
                    .console
                    .warning("Please enter 'Y' for yes or 'N' for no."),
            }
        }
    }

    /// Ask for a filter, asking again for as long as any item is invalid.
    fn ask_filter(
        &mut self,
        heading: &str,
        prompt: &str,
        available: &[u32],
        parse: fn(&str, &[u32]) -> (TrackFilter, Vec<String>),
    ) -> Result<TrackFilter> {
        self.console.section(heading);
        self.console.info("Enter a comma separated list, or leave empty to skip:");
        self.console.line(&format!("  {}", SELECTION_EXAMPLE.dimmed()));

        let mut rejected: Option<Vec<String>> = None;
        loop {
            let Some(answer) = self.read_line(prompt)? else {
                // Input ended while the last answer was still invalid.
                return match rejected {
                    Some(invalid) => Err(Error::InvalidSelection(invalid)),
                    None => Ok(TrackFilter::default()),
                };
            };

            let (filter, invalid) = parse(&answer, available);
            if invalid.is_empty() {
                return Ok(filter);
            }

            self.console.warning(&format!(
                "Not recognised: {}. Please try again.",
                invalid.join(", ")
            ));
            rejected = Some(invalid);
        }
    }

    /// Ask which tracks should be extracted.
    pub fn ask_selection(&mut self, available: &[u32]) -> Result<TrackFilter> {
        self.ask_filter(
            "Track Selection",
            "Selection: ",
            available,
            selection::parse_selection_validated,
        )
    }

    /// Ask which tracks should be left out.
    pub fn ask_exclusion(&mut self, available: &[u32]) -> Result<TrackFilter> {
        self.ask_filter(
            "Track Exclusion",
            "Exclude: ",
            available,
            selection::parse_exclusion_validated,
        )
    }

    /// Run the whole dialogue and build the resulting selection.
    ///
    /// Extracting everything skips both questions; otherwise an exclusion is
    /// asked for after the selection.
    ///
    /// # Arguments
    ///
    /// * `available` - The track numbers that may be chosen.
    pub fn choose(&mut self, available: &[u32]) -> Result<Selection> {
        if self.confirm_extract_all()? {
            return Ok(Selection::default());
        }

        let filter = self.ask_selection(available)?;
        let exclusions = self.ask_exclusion(available)?;

        Ok(Selection::new(filter, exclusions))
    }
}

/// Identify several files, listing their subtitle tracks.
///
/// Files that cannot be identified, or have no subtitle tracks, are
/// reported and left out.
///
/// # Returns
///
/// The usable files, and the union of their subtitle track numbers.
pub fn analyze_files<E: TrackExtractor + ?Sized>(
    extractor: &E,
    console: &Console,
    files: &[PathBuf],
) -> (Vec<PathBuf>, Vec<u32>) {
    console.section(&format!("Analyzing {} file(s)", files.len()));

    let mut usable = Vec::new();
    let mut numbers = Vec::new();

    for file in files {
        let identified =
            FileProcessor::<E>::validate_input(file).and_then(|_| extractor.identify(file));
        let info = match identified {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping '{}': {e}", file.display());
                console.error(&format!("{}: {e}", file.display()));
                continue;
            }
        };

        let summary = info.summary();
        if summary.track_count == 0 {
            console.warning(&format!("{}: no subtitle tracks", file.display()));
            continue;
        }

        console.line(&file.display().to_string().bold().to_string());
        console.tracks(&info.subtitle_tracks());
        console.summary(&summary);

        numbers.extend(info.subtitle_track_numbers());
        usable.push(file.clone());
    }

    numbers.sort_unstable();
    numbers.dedup();

    (usable, numbers)
}

/// Interactively extract the subtitles of a single file.
pub fn run_single<E: TrackExtractor + ?Sized, R: BufRead>(
    extractor: &E,
    console: &Console,
    input: &Path,
    reader: R,
    mut options: ProcessOptions,
) -> Result<FileReport> {
    FileProcessor::<E>::validate_input(input)?;

    let info = extractor.identify(input)?;
    let tracks = info.subtitle_tracks();
    if tracks.is_empty() {
        return Err(Error::NoSubtitleTracks(input.to_path_buf()));
    }

    console.section(&format!("Subtitle tracks in {}", input.display()));
    console.tracks(&tracks);

    options.selection = Prompter::new(reader, console).choose(&info.subtitle_track_numbers())?;

    FileProcessor::new(extractor, console, options).run_single(input)
}

/// Interactively extract the subtitles of several files with one shared selection.
pub fn run_batch<E: TrackExtractor + ?Sized, R: BufRead>(
    extractor: &E,
    console: &Console,
    files: &[PathBuf],
    reader: R,
    mut options: ProcessOptions,
    workers: Option<usize>,
) -> Result<BatchSummary> {
    let (usable, available) = analyze_files(extractor, console, files);
    if usable.is_empty() {
        return Err(Error::NoFilesFound(
            "no file with subtitle tracks among the given paths".to_string(),
        ));
    }

    options.selection = Prompter::new(reader, console).choose(&available)?;

    FileProcessor::new(extractor, console, options).process_batch(&usable, workers)
}
