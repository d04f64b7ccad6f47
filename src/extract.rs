use crate::{
    codec,
    error::Result,
    matcher,
    mkvtoolnix::TrackExtractor,
    selection::Selection,
    template::{self, OutputSpec},
    track::Track,
};

use core::fmt;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// The largest number of files processed at the same time.
pub const MAX_WORKERS: usize = 4;

/// A single track to be written to a single destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionJob {
    /// The query-local ID of the track inside the file being extracted from.
    pub source_id: u32,
    /// The track as reported by the input file. Used for naming.
    pub original: Track,
    pub destination: PathBuf,
}

impl ExtractionJob {
    /// Every file this job will produce.
    pub fn output_files(&self) -> Vec<PathBuf> {
        codec::output_files(&self.destination, &self.original.codec_id)
    }
}

/// The processing state of a single input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Filtering,
    AbortedEmpty,
    Extracting,
    Succeeded,
    Failed,
}

impl FileState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            FileState::AbortedEmpty | FileState::Succeeded | FileState::Failed
        )
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            FileState::Pending => "pending",
            FileState::Filtering => "filtering",
            FileState::AbortedEmpty => "no matching tracks",
            FileState::Extracting => "extracting",
            FileState::Succeeded => "succeeded",
            FileState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Build the extraction jobs for the tracks of an input file.
///
/// Only subtitle tracks that belong to the selection are planned. The
/// output directory is created once a track is planned into it.
///
/// # Arguments
///
/// * `tracks` - The tracks of the input file.
/// * `selection` - The user's selection and exclusions.
/// * `input` - The path to the input file.
/// * `spec` - Where, and under which names, the tracks should be written.
pub fn plan(
    tracks: &[Track],
    selection: &Selection,
    input: &Path,
    spec: &OutputSpec,
) -> Vec<ExtractionJob> {
    let subtitles: Vec<Track> = tracks.iter().filter(|t| t.is_subtitle()).cloned().collect();

    matcher::select(&subtitles, selection)
        .into_iter()
        .map(|t| ExtractionJob {
            source_id: t.id,
            original: t.clone(),
            destination: template::resolve_output_path(input, t, spec),
        })
        .collect()
}

/// Point planned jobs at the tracks of a subtitle-only intermediate file.
///
/// The intermediate file holds the selected tracks in their original order
/// but renumbers them, so tracks are paired by position. Names always come
/// from the original track. An intermediate track without an original is
/// named after itself.
///
/// # Arguments
///
/// * `jobs` - The jobs planned against the input file.
/// * `intermediate` - The subtitle tracks of the intermediate file.
/// * `input` - The path to the input file.
/// * `template` - The file name template.
pub fn rebind(
    jobs: &[ExtractionJob],
    intermediate: &[Track],
    input: &Path,
    template: &str,
) -> Vec<ExtractionJob> {
    if jobs.len() != intermediate.len() {
        warn!(
            "Track count mismatch: {} selected, {} in the intermediate file",
            jobs.len(),
            intermediate.len()
        );
    }

    let basename = template::basename(input);
    let fallback_dir = jobs
        .first()
        .and_then(|j| j.destination.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();

    intermediate
        .iter()
        .enumerate()
        .map(|(i, track)| match jobs.get(i) {
            Some(job) => ExtractionJob {
                source_id: track.id,
                original: job.original.clone(),
                destination: job.destination.clone(),
            },
            None => {
                warn!(
                    "No original track for intermediate track {}, using its own metadata",
                    track.number
                );
                ExtractionJob {
                    source_id: track.id,
                    original: track.clone(),
                    destination: fallback_dir
                        .join(template::render_filename(&basename, track, template)),
                }
            }
        })
        .collect()
}

/// Extract every job from `source` with a single call.
///
/// The call either succeeds for every job or fails for all of them.
///
/// # Returns
///
/// The files that were written.
pub fn execute<E: TrackExtractor + ?Sized>(
    extractor: &E,
    source: &Path,
    jobs: &[ExtractionJob],
) -> Result<Vec<PathBuf>> {
    let pairs: Vec<(u32, PathBuf)> = jobs
        .iter()
        .map(|j| (j.source_id, j.destination.clone()))
        .collect();

    debug!("Extracting {} track(s) from '{}'", pairs.len(), source.display());
    extractor.extract(source, &pairs)?;

    Ok(jobs.iter().flat_map(ExtractionJob::output_files).collect())
}

/// Extract every job from `source` with one call per track.
///
/// Each track succeeds or fails on its own.
pub fn execute_each<E: TrackExtractor + ?Sized>(
    extractor: &E,
    source: &Path,
    jobs: &[ExtractionJob],
) -> Vec<Result<Vec<PathBuf>>> {
    jobs.iter()
        .map(|job| execute(extractor, source, std::slice::from_ref(job)))
        .collect()
}

/// Compute the number of batch workers.
///
/// # Arguments
///
/// * `files` - The number of files to be processed.
/// * `requested` - A user supplied worker count, if any.
pub fn worker_count(files: usize, requested: Option<usize>) -> usize {
    let wanted = requested.unwrap_or(files).min(files);
    wanted.clamp(1, MAX_WORKERS)
}
