use crate::{
    console::Console,
    discovery,
    error::{Error, Result},
    extract::{self, ExtractionJob, FileState},
    logger,
    mkvtoolnix::TrackExtractor,
    progress::MuxProgress,
    selection::Selection,
    template::{self, OutputSpec},
    utils,
};

use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// The suffix of the temporary subtitle-only file, `<basename>.subtitles.mks`.
const INTERMEDIATE_SUFFIX: &str = ".subtitles.mks";

/// How the tracks of each file should be selected and written.
#[derive(Clone, Debug, Default)]
pub struct ProcessOptions {
    pub selection: Selection,
    pub output: OutputSpec,
    pub dry_run: bool,
    /// Show a progress bar while muxing. Only used when a single file is processed at a time.
    pub show_progress: bool,
    /// Extract each track with its own call, so that one bad track does not fail the rest.
    pub per_track: bool,
}

/// The result of processing one file.
#[derive(Debug)]
pub struct FileReport {
    pub jobs: Vec<ExtractionJob>,
    /// The files that were written. Empty for a dry run.
    pub files: Vec<PathBuf>,
}

/// The outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<(PathBuf, Error)>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Convert into an error if any of the files failed.
    pub fn into_result(self) -> Result<BatchSummary> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::BatchFailed {
                failed: self.failed.len(),
                total: self.total,
            })
        }
    }
}

/// Removes the temporary subtitle-only file when dropped.
struct IntermediateFile(PathBuf);

impl Drop for IntermediateFile {
    fn drop(&mut self) {
        if utils::file_exists(&self.0) {
            debug!("Removing intermediate file '{}'", self.0.display());
            utils::remove_file_quietly(&self.0);
        }
    }
}

pub struct FileProcessor<'a, E: TrackExtractor + ?Sized> {
    extractor: &'a E,
    console: &'a Console,
    options: ProcessOptions,
}

impl<'a, E: TrackExtractor + ?Sized> FileProcessor<'a, E> {
    pub fn new(extractor: &'a E, console: &'a Console, options: ProcessOptions) -> Self {
        Self {
            extractor,
            console,
            options,
        }
    }

    /// Check that an input path names an existing Matroska file.
    ///
    /// # Arguments
    ///
    /// * `input` - The path to the input file.
    pub fn validate_input(input: &Path) -> Result<()> {
        if !utils::file_exists(input) {
            return Err(Error::FileNotFound(input.to_path_buf()));
        }

        if !discovery::is_mkv_file(input) {
            return Err(Error::NotMkvFile(input.to_path_buf()));
        }

        Ok(())
    }

    /// Get the path of the temporary subtitle-only file for an input file.
    pub fn intermediate_path(input: &Path) -> PathBuf {
        input.with_file_name(format!("{}{INTERMEDIATE_SUFFIX}", template::basename(input)))
    }

    /// Run the whole pipeline for a single file.
    ///
    /// # Arguments
    ///
    /// * `input` - The path to the input file.
    /// * `progress` - The progress sink for the muxing step.
    pub fn process_file(&self, input: &Path, progress: &mut MuxProgress) -> Result<FileReport> {
        self.run_pipeline(input, progress).inspect_err(|e| {
            if !matches!(e, Error::NoMatchingTracks) {
                log_state(input, FileState::Failed);
            }
        })
    }

    fn run_pipeline(&self, input: &Path, progress: &mut MuxProgress) -> Result<FileReport> {
        log_state(input, FileState::Pending);

        Self::validate_input(input)?;

        // Identify the file and decide which of its tracks are wanted.
        log_state(input, FileState::Filtering);

        let info = self.extractor.identify(input)?;
        for track in info.all_tracks().iter().filter(|t| !t.is_subtitle()) {
            trace!("Ignoring {} track {}", track.kind, track.number);
        }

        let tracks = info.subtitle_tracks();
        if tracks.is_empty() {
            return Err(Error::NoSubtitleTracks(input.to_path_buf()));
        }

        // This resolves (and creates) the output directory.
        let opts = &self.options;
        let jobs = extract::plan(&tracks, &opts.selection, input, &opts.output);
        if jobs.is_empty() {
            log_state(input, FileState::AbortedEmpty);
            return Err(Error::NoMatchingTracks);
        }

        if opts.dry_run {
            self.console.info(&format!(
                "Dry run: {} track(s) would be extracted from {}",
                jobs.len(),
                input.display()
            ));
            self.console.plan(&jobs);

            return Ok(FileReport {
                jobs,
                files: Vec::new(),
            });
        }

        log_state(input, FileState::Extracting);

        // Mux the selected tracks into a subtitle-only file; extracting from
        // it is far quicker than from the full file.
        let intermediate = IntermediateFile(Self::intermediate_path(input));
        let ids: Vec<u32> = jobs.iter().map(|j| j.source_id).collect();
        self.extractor.mux_subtitles(input, &ids, &intermediate.0, progress)?;

        // The intermediate file renumbers its tracks, so pair them up again.
        let muxed = self.extractor.identify(&intermediate.0)?;
        let jobs = extract::rebind(
            &jobs,
            &muxed.subtitle_tracks(),
            input,
            opts.output.template(),
        );

        let files = if opts.per_track {
            self.extract_each(&intermediate.0, &jobs)?
        } else {
            extract::execute(self.extractor, &intermediate.0, &jobs)?
        };
        drop(intermediate);

        log_state(input, FileState::Succeeded);

        Ok(FileReport { jobs, files })
    }

    /// Extract the jobs one at a time. Fails only when no track could be extracted.
    fn extract_each(&self, source: &Path, jobs: &[ExtractionJob]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut first_error = None;

        for (job, result) in jobs
            .iter()
            .zip(extract::execute_each(self.extractor, source, jobs))
        {
            match result {
                Ok(written) => files.extend(written),
                Err(e) => {
                    warn!("Failed to extract {}: {e}", job.original.describe());
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if files.is_empty() => Err(e),
            _ => Ok(files),
        }
    }

    /// Process a single file, reporting the outcome on the console.
    pub fn run_single(&self, input: &Path) -> Result<FileReport> {
        let start = Instant::now();
        self.console.section("Extracting Subtitles");
        self.console.info(&self.options.selection.message());

        let mut progress = MuxProgress::new(self.options.show_progress);
        let report = self.process_file(input, &mut progress)?;

        if !self.options.dry_run {
            self.console.success(&format!(
                "Extracted {} track(s) in {}",
                report.jobs.len(),
                utils::format_duration(start.elapsed().as_secs())
            ));
            self.console.written(&report.files);
        }

        Ok(report)
    }

    /// Process several files using a bounded pool of workers.
    ///
    /// A failure of one file never stops the others.
    ///
    /// # Arguments
    ///
    /// * `inputs` - The files to be processed.
    /// * `requested_workers` - A user supplied worker count, if any.
    pub fn process_batch(
        &self,
        inputs: &[PathBuf],
        requested_workers: Option<usize>,
    ) -> Result<BatchSummary> {
        let start = Instant::now();
        let total = inputs.len();
        let workers = extract::worker_count(total, requested_workers);

        logger::section("Batch Processing", false);
        info!("Processing {total} file(s) with {workers} worker(s)");

        self.console.section("Batch Processing");
        self.console.info(&self.options.selection.message());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        // Progress bars from several workers would overwrite each other.
        let show_progress = self.options.show_progress && workers == 1;

        let results: Vec<(PathBuf, Result<FileReport>)> = pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(i, input)| {
                    logger::subsection(&format!("File {} of {total}", i + 1), false);

                    let mut progress = MuxProgress::new(show_progress);
                    let result = self.process_file(input, &mut progress);
                    self.report_batch_file(i + 1, total, input, &result);

                    (input.clone(), result)
                })
                .collect()
        });

        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };
        for (input, result) in results {
            match result {
                Ok(_) => summary.succeeded += 1,
                Err(e) => summary.failed.push((input, e)),
            }
        }
        summary.elapsed = start.elapsed();

        self.print_summary(&summary);
        Ok(summary)
    }

    fn report_batch_file(&self, n: usize, total: usize, input: &Path, result: &Result<FileReport>) {
        let name = input
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| input.display().to_string());

        match result {
            Ok(report) if self.options.dry_run => self.console.success(&format!(
                "[{n}/{total}] {name}: {} track(s) planned",
                report.jobs.len()
            )),
            Ok(report) => self.console.success(&format!(
                "[{n}/{total}] {name}: extracted {} track(s)",
                report.jobs.len()
            )),
            Err(e) => self.console.error(&format!("[{n}/{total}] {name}: {e}")),
        }
    }

    fn print_summary(&self, summary: &BatchSummary) {
        self.console.section("Summary");
        self.console.info(&format!(
            "Processed {} file(s) in {}",
            summary.total,
            utils::format_duration(summary.elapsed.as_secs())
        ));

        if summary.is_success() {
            self.console
                .success(&format!("All {} file(s) processed successfully", summary.succeeded));
            return;
        }

        self.console.warning(&format!(
            "{} succeeded, {} failed",
            summary.succeeded,
            summary.failed.len()
        ));
        for (input, e) in &summary.failed {
            self.console.error(&format!("{}: {e}", input.display()));
        }
    }
}

/// Show the subtitle tracks of a file without extracting anything.
///
/// # Arguments
///
/// * `extractor` - Used to identify the file.
/// * `console` - Where the track list is written.
/// * `input` - The path to the input file.
pub fn show_info<E: TrackExtractor + ?Sized>(
    extractor: &E,
    console: &Console,
    input: &Path,
) -> Result<()> {
    FileProcessor::<E>::validate_input(input)?;

    let info = extractor.identify(input)?;
    let tracks = info.subtitle_tracks();

    console.section(&format!("Subtitle tracks in {}", input.display()));
    if tracks.is_empty() {
        console.warning("No subtitle tracks found");
        return Ok(());
    }

    console.tracks(&tracks);
    console.summary(&info.summary());

    Ok(())
}

fn log_state(input: &Path, state: FileState) {
    if state.is_finished() {
        info!("{}: {state}", input.display());
    } else {
        debug!("{}: {state}", input.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extract::tests::MockExtractor,
        selection::{parse_exclusion, parse_selection},
        template::{DEFAULT_TEMPLATE, OutputDirectory},
    };
    use std::{fs, io};

    const MOVIE: &str = r#"{
        "container": { "type": "Matroska" },
        "tracks": [
            { "id": 0, "type": "video", "properties": { "codec_id": "V_MPEG4/ISO/AVC", "number": 1 } },
            { "id": 1, "type": "subtitles", "properties": { "codec_id": "S_TEXT/UTF8", "language": "eng", "number": 2, "track_name": "Full" } },
            { "id": 2, "type": "subtitles", "properties": { "codec_id": "S_HDMV/PGS", "language": "eng", "number": 3, "forced_track": true } },
            { "id": 3, "type": "subtitles", "properties": { "codec_id": "S_TEXT/ASS", "language": "jpn", "number": 4 } }
        ]
    }"#;

    const MUXED: &str = r#"{
        "container": { "type": "Matroska" },
        "tracks": [
            { "id": 0, "type": "subtitles", "properties": { "codec_id": "S_TEXT/UTF8", "language": "eng", "number": 1, "track_name": "Full" } },
            { "id": 1, "type": "subtitles", "properties": { "codec_id": "S_HDMV/PGS", "language": "eng", "number": 2, "forced_track": true } }
        ]
    }"#;

    const NO_SUBS: &str = r#"{
        "container": { "type": "Matroska" },
        "tracks": [ { "id": 0, "type": "video", "properties": { "number": 1 } } ]
    }"#;

    fn quiet_console() -> Console {
        Console::new(Box::new(io::sink()))
    }

    fn options(include: &str, exclude: &str, dry_run: bool) -> ProcessOptions {
        ProcessOptions {
            selection: Selection::new(parse_selection(include).0, parse_exclusion(exclude).0),
            output: OutputSpec::new(OutputDirectory::PerInput, DEFAULT_TEMPLATE),
            dry_run,
            show_progress: false,
            per_track: false,
        }
    }

    /// Create an input file, and register its track information with the mock.
    fn movie(dir: &Path, name: &str, mock: &mut MockExtractor, json: &str) -> PathBuf {
        let input = dir.join(name);
        fs::write(&input, b"").expect("write input");
        mock.infos.insert(input.clone(), json.to_string());
        mock.infos.insert(
            FileProcessor::<MockExtractor>::intermediate_path(&input),
            MUXED.to_string(),
        );
        input
    }

    #[test]
    fn extracts_through_the_intermediate_file() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor::default();
        let input = movie(tmp.path(), "movie.mkv", &mut mock, MOVIE);

        let console = quiet_console();
        let processor = FileProcessor::new(&mock, &console, options("eng", "", false));
        let report = processor
            .process_file(&input, &mut MuxProgress::new(false))
            .expect("extraction succeeds");

        let mks = tmp.path().join("movie.subtitles.mks");
        let out = tmp.path().join("movie-subtitles");

        // Only the selected tracks are muxed, by their original IDs.
        let mux_calls = mock.mux_calls.lock().expect("lock");
        assert_eq!(mux_calls.len(), 1);
        assert_eq!(mux_calls[0].1, vec![1, 2]);
        assert_eq!(mux_calls[0].2, mks);

        // Extraction uses the renumbered IDs but the original names.
        let extract_calls = mock.extract_calls.lock().expect("lock");
        assert_eq!(extract_calls.len(), 1);
        assert_eq!(extract_calls[0].0, mks);
        assert_eq!(
            extract_calls[0].1,
            vec![
                (0, out.join("movie.eng.002.Full.srt")),
                (1, out.join("movie.eng.003.forced.sup")),
            ]
        );

        assert_eq!(report.files.len(), 2);
        assert!(out.is_dir());
        assert!(!mks.exists(), "intermediate file must be removed");
    }

    #[test]
    fn intermediate_is_removed_on_failure() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor {
            fail_extract: true,
            ..Default::default()
        };
        let input = movie(tmp.path(), "movie.mkv", &mut mock, MOVIE);

        let console = quiet_console();
        let processor = FileProcessor::new(&mock, &console, options("", "", false));
        let result = processor.process_file(&input, &mut MuxProgress::new(false));

        assert!(matches!(result, Err(Error::ToolFailed { .. })));
        assert!(!tmp.path().join("movie.subtitles.mks").exists());
    }

    #[test]
    fn per_track_extraction() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor::default();
        let input = movie(tmp.path(), "movie.mkv", &mut mock, MOVIE);

        let console = quiet_console();
        let mut opts = options("eng", "", false);
        opts.per_track = true;
        let report = FileProcessor::new(&mock, &console, opts)
            .process_file(&input, &mut MuxProgress::new(false))
            .expect("extraction succeeds");

        assert_eq!(mock.extract_calls.lock().expect("lock").len(), 2);
        assert_eq!(report.files.len(), 2);

        // Every track failing fails the file.
        let mut mock = MockExtractor {
            fail_extract: true,
            ..Default::default()
        };
        let input = movie(tmp.path(), "other.mkv", &mut mock, MOVIE);
        let mut opts = options("eng", "", false);
        opts.per_track = true;

        assert!(matches!(
            FileProcessor::new(&mock, &console, opts)
                .process_file(&input, &mut MuxProgress::new(false)),
            Err(Error::ToolFailed { .. })
        ));
    }

    #[test]
    fn no_matching_tracks() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor::default();
        let input = movie(tmp.path(), "movie.mkv", &mut mock, MOVIE);

        let console = quiet_console();
        let processor = FileProcessor::new(&mock, &console, options("spa", "", false));

        assert!(matches!(
            processor.process_file(&input, &mut MuxProgress::new(false)),
            Err(Error::NoMatchingTracks)
        ));
        assert!(mock.mux_calls.lock().expect("lock").is_empty());
        assert!(!tmp.path().join("movie-subtitles").exists());
    }

    #[test]
    fn files_without_subtitles() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor::default();
        let input = movie(tmp.path(), "movie.mkv", &mut mock, NO_SUBS);

        let console = quiet_console();
        let processor = FileProcessor::new(&mock, &console, options("", "", false));

        assert!(matches!(
            processor.process_file(&input, &mut MuxProgress::new(false)),
            Err(Error::NoSubtitleTracks(_))
        ));
    }

    #[test]
    fn dry_run_only_prepares_directories() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor::default();
        let input = movie(tmp.path(), "movie.mkv", &mut mock, MOVIE);

        let console = quiet_console();
        let processor = FileProcessor::new(&mock, &console, options("", "sup", true));
        let report = processor
            .process_file(&input, &mut MuxProgress::new(false))
            .expect("dry run succeeds");

        assert_eq!(report.jobs.len(), 2);
        assert!(report.files.is_empty());
        assert!(mock.mux_calls.lock().expect("lock").is_empty());
        assert!(mock.extract_calls.lock().expect("lock").is_empty());
        assert!(tmp.path().join("movie-subtitles").is_dir());
        assert!(!tmp.path().join("movie.subtitles.mks").exists());
    }

    #[test]
    fn input_validation() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let missing = tmp.path().join("missing.mkv");
        assert!(matches!(
            FileProcessor::<MockExtractor>::validate_input(&missing),
            Err(Error::FileNotFound(_))
        ));

        let text = tmp.path().join("notes.txt");
        fs::write(&text, b"").expect("write file");
        assert!(matches!(
            FileProcessor::<MockExtractor>::validate_input(&text),
            Err(Error::NotMkvFile(_))
        ));
    }

    #[test]
    fn batch_continues_past_failures() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor::default();
        let good = movie(tmp.path(), "ep1.mkv", &mut mock, MOVIE);
        let empty = movie(tmp.path(), "ep2.mkv", &mut mock, NO_SUBS);
        let missing = tmp.path().join("ep3.mkv");

        let console = quiet_console();
        let processor = FileProcessor::new(&mock, &console, options("eng", "", false));
        let summary = processor
            .process_batch(&[good.clone(), empty.clone(), missing.clone()], None)
            .expect("pool starts");

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 2);
        assert!(matches!(
            summary.into_result(),
            Err(Error::BatchFailed { failed: 2, total: 3 })
        ));
    }

    #[test]
    fn info_mode() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut mock = MockExtractor::default();
        let input = movie(tmp.path(), "movie.mkv", &mut mock, MOVIE);

        assert!(show_info(&mock, &quiet_console(), &input).is_ok());
        assert!(mock.mux_calls.lock().expect("lock").is_empty());
    }
}
