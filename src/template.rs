use crate::track::Track;

use log::warn;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The template used when none is configured.
pub const DEFAULT_TEMPLATE: &str =
    "{basename}.{language}.{trackno}.{trackname}.{forced}.{default}.{extension}";

/// The suffix of the per-input output directory, `<basename>-subtitles`.
const PER_INPUT_DIR_SUFFIX: &str = "-subtitles";

/// The characters that are replaced with a dash in a track name.
const REPLACED_CHARS: [char; 4] = ['/', '\\', ':', '|'];

/// The characters that are removed from a track name.
const STRIPPED_CHARS: [char; 5] = ['*', '?', '"', '<', '>'];

/// Where the extracted files of an input file should be written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputDirectory {
    /// The directory holding the input file.
    #[default]
    InputDirectory,
    /// A `<basename>-subtitles` directory next to each input file.
    PerInput,
    /// A fixed directory, used as given.
    Fixed(PathBuf),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputSpec {
    pub directory: OutputDirectory,
    pub template: String,
}

impl OutputSpec {
    pub fn new(directory: OutputDirectory, template: &str) -> Self {
        Self {
            directory,
            template: template.to_string(),
        }
    }

    /// The template to render, with a blank template replaced by the default.
    pub fn template(&self) -> &str {
        if self.template.trim().is_empty() {
            DEFAULT_TEMPLATE
        } else {
            &self.template
        }
    }

    /// Compute the directory for an input file without touching the filesystem.
    ///
    /// # Arguments
    ///
    /// * `input` - The path to the input file.
    pub fn directory_for(&self, input: &Path) -> PathBuf {
        match &self.directory {
            OutputDirectory::InputDirectory => input_directory(input),
            OutputDirectory::PerInput => {
                input_directory(input).join(format!("{}{PER_INPUT_DIR_SUFFIX}", basename(input)))
            }
            OutputDirectory::Fixed(dir) => dir.clone(),
        }
    }
}

/// Get the name of a file without its final extension.
pub fn basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn input_directory(input: &Path) -> PathBuf {
    input.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Render the file name of an extracted track.
///
/// Each recognised placeholder is substituted exactly once, so text coming
/// from the track (such as its name) is never itself treated as a
/// placeholder. Unrecognised placeholders are left as they are.
///
/// # Arguments
///
/// * `basename` - The name of the input file, without its extension.
/// * `track` - The track being extracted.
/// * `template` - The file name template.
pub fn render_filename(basename: &str, track: &Track, template: &str) -> String {
    let template = if template.trim().is_empty() {
        DEFAULT_TEMPLATE
    } else {
        template
    };

    let rendered = cleanup_file_name(&substitute(basename, track, template));
    if rendered.is_empty() && template != DEFAULT_TEMPLATE {
        return render_filename(basename, track, DEFAULT_TEMPLATE);
    }

    rendered
}

fn substitute(basename: &str, track: &Track, template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match candidate[1..].find(['{', '}']) {
            Some(i) if candidate.as_bytes()[i + 1] == b'}' => {
                let placeholder = &candidate[..i + 2];
                match placeholder_value(placeholder, basename, track) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(placeholder),
                }
                rest = &candidate[i + 2..];
            }
            // A nested brace starts a new candidate.
            Some(i) => {
                out.push_str(&candidate[..=i]);
                rest = &candidate[i + 1..];
            }
            None => {
                out.push_str(candidate);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn placeholder_value(placeholder: &str, basename: &str, track: &Track) -> Option<String> {
    let value = match placeholder {
        "{basename}" => basename.to_string(),
        "{language}" => track.language.clone(),
        "{trackno}" => format!("{:03}", track.number),
        "{trackname}" => track
            .track_name
            .as_deref()
            .map(sanitize_track_name)
            .unwrap_or_default(),
        "{forced}" => flag(track.forced, "forced"),
        "{default}" => flag(track.default_track, "default"),
        // VobSub renders as .sub; mkvextract derives the .idx index from it.
        "{extension}" => track.codec().extension().to_string(),
        _ => return None,
    };

    Some(value)
}

fn flag(set: bool, text: &str) -> String {
    if set { text.to_string() } else { String::new() }
}

/// Make a track name safe for use inside a file name.
pub fn sanitize_track_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .map(|c| if REPLACED_CHARS.contains(&c) { '-' } else { c })
        .collect();

    cleaned.trim_matches(|c| c == ' ' || c == '.').to_string()
}

/// Remove the empty segments left behind by empty placeholders.
///
/// The name is split on `.`, empty segments are dropped and the rest are
/// joined back together. Applying this twice gives the same result.
pub fn cleanup_file_name(name: &str) -> String {
    name.split('.')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Ensure that the output directory for an input file exists.
///
/// If the directory cannot be created a warning is logged and the
/// directory of the input file is used instead.
///
/// # Arguments
///
/// * `input` - The path to the input file.
/// * `spec` - The output specification.
pub fn resolve_output_dir(input: &Path, spec: &OutputSpec) -> PathBuf {
    let dir = spec.directory_for(input);
    if spec.directory == OutputDirectory::InputDirectory {
        return dir;
    }

    match fs::create_dir_all(&dir) {
        Ok(()) => dir,
        Err(e) => {
            let fallback = input_directory(input);
            warn!(
                "Failed to create output directory '{}': {e}. Using '{}' instead",
                dir.display(),
                fallback.display()
            );
            fallback
        }
    }
}

/// Compute the full output path of a track, creating its directory if needed.
///
/// # Arguments
///
/// * `input` - The path to the input file.
/// * `track` - The track being extracted.
/// * `spec` - The output specification.
pub fn resolve_output_path(input: &Path, track: &Track, spec: &OutputSpec) -> PathBuf {
    let name = render_filename(&basename(input), track, spec.template());
    resolve_output_dir(input, spec).join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackKind;

    fn track() -> Track {
        Track {
            id: 2,
            number: 7,
            codec_id: "S_TEXT/UTF8".to_string(),
            language: "eng".to_string(),
            track_name: None,
            forced: false,
            default_track: false,
            kind: TrackKind::Subtitles,
        }
    }

    #[test]
    fn default_template_drops_empty_segments() {
        assert_eq!(render_filename("movie", &track(), DEFAULT_TEMPLATE), "movie.eng.007.srt");
    }

    #[test]
    fn short_template() {
        assert_eq!(
            render_filename("movie", &track(), "{basename}.{language}.{trackno}.{extension}"),
            "movie.eng.007.srt"
        );
    }

    #[test]
    fn flags_and_names() {
        let t = Track {
            track_name: Some(" Signs: Songs / \"Full\"? ".to_string()),
            forced: true,
            default_track: true,
            ..track()
        };

        assert_eq!(
            render_filename("movie", &t, DEFAULT_TEMPLATE),
            "movie.eng.007.Signs- Songs - Full.forced.default.srt"
        );
    }

    #[test]
    fn vobsub_uses_sub_extension() {
        let t = Track {
            codec_id: "S_VOBSUB".to_string(),
            ..track()
        };
        assert_eq!(render_filename("movie", &t, DEFAULT_TEMPLATE), "movie.eng.007.sub");
    }

    #[test]
    fn unknown_placeholders_stay_literal() {
        assert_eq!(
            render_filename("movie", &track(), "{basename}-{lang}.{extension}"),
            "movie-{lang}.srt"
        );
        assert_eq!(render_filename("movie", &track(), "{basename}{"), "movie{");
        assert_eq!(render_filename("movie", &track(), "{x{basename}"), "{xmovie");
    }

    #[test]
    fn track_text_is_not_substituted_again() {
        let t = Track {
            track_name: Some("{language}".to_string()),
            ..track()
        };
        assert_eq!(render_filename("movie", &t, "{trackname}.{extension}"), "{language}.srt");
    }

    #[test]
    fn empty_templates_fall_back_to_default() {
        assert_eq!(render_filename("movie", &track(), ""), "movie.eng.007.srt");
        assert_eq!(render_filename("movie", &track(), "{forced}..{default}"), "movie.eng.007.srt");
    }

    #[test]
    fn rendered_names_are_clean() {
        let templates = [
            DEFAULT_TEMPLATE,
            "{basename}..{language}.",
            ".{trackname}.{forced}.{extension}.",
            "{basename}-{language}.{extension}",
        ];

        for template in templates {
            let name = render_filename("movie", &track(), template);
            assert!(!name.is_empty());
            assert!(!name.contains(".."), "{name}");
            assert!(!name.starts_with('.') && !name.ends_with('.'), "{name}");
            assert!(!name.contains('{'), "{name}");
            assert_eq!(cleanup_file_name(&name), name);
        }
    }

    #[test]
    fn sanitizing() {
        assert_eq!(sanitize_track_name("a/b\\c:d|e"), "a-b-c-d-e");
        assert_eq!(sanitize_track_name("*what?* \"<x>\""), "what x");
        assert_eq!(sanitize_track_name(" ..Commentary.. "), "Commentary");
        assert_eq!(sanitize_track_name("?*"), "");
    }

    #[test]
    fn directories() {
        let input = Path::new("/media/show/movie.mkv");

        let spec = OutputSpec::default();
        assert_eq!(spec.directory_for(input), PathBuf::from("/media/show"));

        let spec = OutputSpec::new(OutputDirectory::PerInput, "");
        assert_eq!(
            spec.directory_for(input),
            PathBuf::from("/media/show/movie-subtitles")
        );

        let spec = OutputSpec::new(OutputDirectory::Fixed(PathBuf::from("out")), "");
        assert_eq!(spec.directory_for(input), PathBuf::from("out"));
        assert_eq!(spec.template(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn resolving_creates_the_directory() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let input = tmp.path().join("movie.mkv");
        let spec = OutputSpec::new(OutputDirectory::PerInput, DEFAULT_TEMPLATE);

        let path = resolve_output_path(&input, &track(), &spec);
        assert_eq!(path, tmp.path().join("movie-subtitles").join("movie.eng.007.srt"));
        assert!(tmp.path().join("movie-subtitles").is_dir());

        // Idempotent.
        assert_eq!(resolve_output_path(&input, &track(), &spec), path);
    }

    #[test]
    fn creation_failure_falls_back_to_input_directory() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"not a directory").expect("write file");

        let input = tmp.path().join("movie.mkv");
        let spec = OutputSpec::new(OutputDirectory::Fixed(blocker.join("subs")), "");

        assert_eq!(resolve_output_dir(&input, &spec), tmp.path().to_path_buf());
    }
}
