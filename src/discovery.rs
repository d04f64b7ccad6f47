use crate::{
    error::{Error, Result},
    utils,
};

use lexical_sort::natural_cmp;
use log::{debug, info, warn};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const VALID_EXTENSIONS: [&str; 2] = ["mkv", "mks"];

const WILDCARD_CHARS: [char; 3] = ['*', '?', '['];

/// Return a boolean value indicating whether a path names a Matroska file.
///
/// # Arguments
///
/// * `path` - The path to the file.
pub fn is_mkv_file(path: &Path) -> bool {
    utils::get_file_extension(path).is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.as_str()))
}

/// Sort paths using a natural sorting algorithm, so that `ep2` comes before `ep10`.
pub fn natural_sort(paths: &mut [PathBuf]) {
    paths.sort_unstable_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
}

/// Recursively collect the Matroska files inside a directory, naturally sorted.
///
/// # Arguments
///
/// * `dir` - The directory to be scanned.
pub fn find_mkv_files(dir: &Path) -> Vec<PathBuf> {
    info!("Scanning directory: {}", dir.display());

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Error while scanning '{}': {err}", dir.display());
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_mkv_file(e.path()))
        .map(|e| e.into_path())
        .collect();

    natural_sort(&mut files);
    files
}

/// Expand the paths given on the command line into a list of Matroska files.
///
/// Files are kept in the order given, non-Matroska files are dropped and
/// directories are replaced by their (recursive) contents.
///
/// # Arguments
///
/// * `paths` - The files and directories to be expanded.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut directories = Vec::new();

    for path in paths {
        if utils::dir_exists(path) {
            directories.push(path);
        } else if utils::file_exists(path) && is_mkv_file(path) {
            files.push(path.clone());
        } else {
            warn!("Skipping '{}': not an MKV file or directory", path.display());
        }
    }

    for dir in directories {
        files.extend(find_mkv_files(dir));
    }

    if files.is_empty() {
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        return Err(Error::NoFilesFound(names.join(", ")));
    }

    Ok(files)
}

/// A compiled file name pattern supporting `*`, `?`, `**` and `[...]`.
#[derive(Debug)]
pub struct GlobPattern {
    base: PathBuf,
    regex: Regex,
    recursive: bool,
    depth: usize,
}

impl GlobPattern {
    /// Compile a pattern.
    ///
    /// # Arguments
    ///
    /// * `pattern` - The pattern, e.g. `shows/**/*.mkv`.
    pub fn new(pattern: &str) -> Result<Self> {
        let normalized = pattern.replace('\\', "/");

        // The longest leading run of components without wildcards is walked from.
        let mut base = PathBuf::new();
        let mut rest: Vec<String> = Vec::new();
        for (i, part) in normalized.split('/').enumerate() {
            if rest.is_empty() && !part.contains(WILDCARD_CHARS) {
                if i == 0 && part.is_empty() {
                    base.push("/");
                } else {
                    base.push(part);
                }
            } else {
                rest.push(part.to_string());
            }
        }

        // A pattern without wildcards names a single file.
        if rest.is_empty() {
            let last = base
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            base.pop();
            rest.push(last);
        }

        let recursive = rest.iter().any(|p| p == "**");
        let depth = rest.len();
        let body = translate(&rest.join("/")).map_err(|reason| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        })?;

        let regex = Regex::new(&format!("^{body}$")).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        debug!("Pattern '{pattern}' -> base '{}', regex '{}'", base.display(), regex.as_str());

        Ok(Self {
            base,
            regex,
            recursive,
            depth,
        })
    }

    /// Check a path, relative to the pattern's base directory.
    pub fn matches_relative(&self, relative: &Path) -> bool {
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();

        self.regex.is_match(&parts.join("/"))
    }

    /// Find every file matching the pattern.
    pub fn find(&self) -> Vec<PathBuf> {
        let root = if self.base.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.base.as_path()
        };

        let mut walker = WalkDir::new(root).min_depth(1);
        if !self.recursive {
            walker = walker.max_depth(self.depth);
        }

        walker
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .strip_prefix(root)
                    .is_ok_and(|rel| self.matches_relative(rel))
            })
            .map(|e| {
                let path = e.into_path();
                // Relative patterns give relative results, without a leading `./`.
                if self.base.as_os_str().is_empty()
                    && let Ok(rel) = path.strip_prefix(root)
                {
                    return rel.to_path_buf();
                }
                path
            })
            .collect()
    }
}

/// Translate the wildcard part of a pattern into a regular expression.
fn translate(pattern: &str) -> std::result::Result<String, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                // `**/` matches zero or more directories, a bare `**` anything at all.
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| "unclosed '['".to_string())?;
                let class: String = chars[i + 1..i + 1 + end].iter().collect();
                if class.is_empty() {
                    return Err("empty character class".to_string());
                }

                out.push('[');
                let class = match class.strip_prefix('!') {
                    Some(negated) => {
                        out.push('^');
                        negated.to_string()
                    }
                    None => class,
                };
                out.push_str(&class.replace('\\', "\\\\").replace('[', "\\["));
                out.push(']');
                i += end + 2;
                continue;
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    Ok(out)
}

/// Expand a batch pattern into a naturally sorted list of Matroska files.
///
/// # Arguments
///
/// * `pattern` - The pattern, e.g. `season1/*.mkv`.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let glob = GlobPattern::new(pattern)?;

    let mut files: Vec<PathBuf> = glob.find().into_iter().filter(|p| is_mkv_file(p)).collect();
    if files.is_empty() {
        return Err(Error::NoFilesFound(pattern.to_string()));
    }

    natural_sort(&mut files);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dir");
        }
        fs::write(path, b"").expect("write file");
    }

    #[test]
    fn mkv_extensions() {
        assert!(is_mkv_file(Path::new("a/movie.mkv")));
        assert!(is_mkv_file(Path::new("a/movie.MKS")));
        assert!(!is_mkv_file(Path::new("a/movie.mp4")));
        assert!(!is_mkv_file(Path::new("a/mkv")));
    }

    #[test]
    fn natural_order() {
        let mut paths = vec![
            PathBuf::from("ep10.mkv"),
            PathBuf::from("ep2.mkv"),
            PathBuf::from("ep1.mkv"),
        ];
        natural_sort(&mut paths);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("ep1.mkv"),
                PathBuf::from("ep2.mkv"),
                PathBuf::from("ep10.mkv")
            ]
        );
    }

    #[test]
    fn pattern_translation() {
        let glob = GlobPattern::new("shows/*.mkv").expect("valid pattern");
        assert_eq!(glob.base, PathBuf::from("shows"));
        assert!(glob.matches_relative(Path::new("ep1.mkv")));
        assert!(!glob.matches_relative(Path::new("s1/ep1.mkv")));

        let glob = GlobPattern::new("**/ep?.mkv").expect("valid pattern");
        assert!(glob.matches_relative(Path::new("ep1.mkv")));
        assert!(glob.matches_relative(Path::new("a/b/ep2.mkv")));
        assert!(!glob.matches_relative(Path::new("a/ep10.mkv")));

        let glob = GlobPattern::new("ep[0-4].mkv").expect("valid pattern");
        assert!(glob.matches_relative(Path::new("ep3.mkv")));
        assert!(!glob.matches_relative(Path::new("ep5.mkv")));

        let glob = GlobPattern::new("ep[!0-4].mkv").expect("valid pattern");
        assert!(glob.matches_relative(Path::new("ep5.mkv")));
        assert!(!glob.matches_relative(Path::new("ep3.mkv")));

        let glob = GlobPattern::new("movie (1).mkv").expect("valid pattern");
        assert!(glob.matches_relative(Path::new("movie (1).mkv")));
    }

    #[test]
    fn invalid_patterns() {
        assert!(matches!(
            GlobPattern::new("ep[1.mkv"),
            Err(Error::InvalidPattern { .. })
        ));
        assert!(matches!(
            GlobPattern::new("ep[].mkv"),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn expanding_patterns() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let root = tmp.path();
        for name in ["ep10.mkv", "ep2.mkv", "ep1.mkv", "notes.txt", "s2/ep3.mkv"] {
            touch(&root.join(name));
        }

        let pattern = format!("{}/*", root.display());
        let files = expand_pattern(&pattern).expect("files found");
        assert_eq!(
            files,
            vec![root.join("ep1.mkv"), root.join("ep2.mkv"), root.join("ep10.mkv")]
        );

        let pattern = format!("{}/**/*.mkv", root.display());
        assert_eq!(expand_pattern(&pattern).expect("files found").len(), 4);

        let pattern = format!("{}/*.mp4", root.display());
        assert!(matches!(expand_pattern(&pattern), Err(Error::NoFilesFound(_))));
    }

    #[test]
    fn discovering_paths() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let root = tmp.path();
        let single = root.join("single.mkv");
        touch(&single);
        touch(&root.join("dir/b10.mkv"));
        touch(&root.join("dir/b9.mkv"));
        touch(&root.join("dir/nested/c.mks"));
        touch(&root.join("dir/readme.md"));

        let files = discover(&[single.clone(), root.join("dir"), root.join("missing.mkv")])
            .expect("files found");

        assert_eq!(
            files,
            vec![
                single,
                root.join("dir/b9.mkv"),
                root.join("dir/b10.mkv"),
                root.join("dir/nested/c.mks"),
            ]
        );

        assert!(matches!(
            discover(&[root.join("dir/readme.md")]),
            Err(Error::NoFilesFound(_))
        ));
    }
}
