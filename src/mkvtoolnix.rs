use crate::{
    error::{Error, Result},
    media_info::MkvInfo,
    progress::MuxProgress,
};

use log::{debug, trace};
use std::{
    ffi::OsString,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

const MKVMERGE: &str = "mkvmerge";
const MKVEXTRACT: &str = "mkvextract";

/// The operations needed from the MKVToolNix suite.
///
/// Implementations must be shareable between batch workers.
pub trait TrackExtractor: Sync {
    /// Query the container and track metadata of a file.
    fn identify(&self, path: &Path) -> Result<MkvInfo>;

    /// Write a subtitle-only copy of `input` holding just the given tracks.
    fn mux_subtitles(
        &self,
        input: &Path,
        track_ids: &[u32],
        output: &Path,
        progress: &mut MuxProgress,
    ) -> Result<()>;

    /// Extract one or more tracks of `source` in a single call.
    fn extract(&self, source: &Path, pairs: &[(u32, PathBuf)]) -> Result<()>;
}

/// Runs the real MKVToolNix executables.
#[derive(Clone, Debug, Default)]
pub struct MkvToolNix {
    /// The directory holding the executables. When absent they are looked up on `PATH`.
    pub directory: Option<PathBuf>,
}

impl MkvToolNix {
    pub fn new(directory: Option<PathBuf>) -> Self {
        Self { directory }
    }

    /// Get the path to one of the MKVToolNix executables.
    ///
    /// # Arguments
    ///
    /// * `exe` - The name of the executable, without any extension.
    pub fn get_exe(&self, exe: &str) -> PathBuf {
        let name = format!("{exe}{}", std::env::consts::EXE_SUFFIX);
        match &self.directory {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    fn command(&self, exe: &str, args: &[OsString]) -> Command {
        let path = self.get_exe(exe);
        debug!(
            "Running: {} {}",
            path.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut cmd = Command::new(path);
        cmd.args(args);
        cmd
    }

    fn run(&self, exe: &str, args: &[OsString]) -> Result<String> {
        let output = self
            .command(exe, args)
            .output()
            .map_err(|source| Error::ToolLaunch {
                tool: exe.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ToolFailed {
                tool: exe.to_string(),
                code: output.status.code(),
                output: tool_output(&stdout, &stderr),
            });
        }

        Ok(stdout)
    }
}

impl TrackExtractor for MkvToolNix {
    fn identify(&self, path: &Path) -> Result<MkvInfo> {
        let json = self.run(MKVMERGE, &["-J".into(), path.into()])?;
        trace!("mkvmerge -J output for '{}': {json}", path.display());

        MkvInfo::parse_json(&json)
    }

    fn mux_subtitles(
        &self,
        input: &Path,
        track_ids: &[u32],
        output: &Path,
        progress: &mut MuxProgress,
    ) -> Result<()> {
        let args = mux_arguments(input, track_ids, output);

        let mut child = self
            .command(MKVMERGE, &args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::ToolLaunch {
                tool: MKVMERGE.to_string(),
                source,
            })?;

        // Drain stderr on its own thread so that a chatty tool can never block.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut text = String::new();
                _ = stderr.read_to_string(&mut text);
                text
            })
        });

        // Progress lines arrive on stdout; everything else is kept for diagnostics.
        let mut stdout_text = String::new();
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            // File names in the output need not be valid UTF-8.
            while matches!(reader.read_until(b'\n', &mut buf), Ok(n) if n > 0) {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']);
                if !progress.feed(line) {
                    trace!("mkvmerge: {line}");
                    stdout_text.push_str(line);
                    stdout_text.push('\n');
                }
                buf.clear();
            }
        }

        let status = child.wait()?;
        let stderr_text = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if status.success() {
            progress.finish();
            return Ok(());
        }

        progress.abandon();
        Err(Error::ToolFailed {
            tool: MKVMERGE.to_string(),
            code: status.code(),
            output: tool_output(&stdout_text, &stderr_text),
        })
    }

    fn extract(&self, source: &Path, pairs: &[(u32, PathBuf)]) -> Result<()> {
        self.run(MKVEXTRACT, &extract_arguments(source, pairs))?;
        Ok(())
    }
}

/// Build the mkvmerge arguments for a subtitle-only copy of a file.
pub fn mux_arguments(input: &Path, track_ids: &[u32], output: &Path) -> Vec<OsString> {
    let ids = track_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut args: Vec<OsString> = vec!["--gui-mode".into(), "-o".into(), output.into()];
    args.extend(
        [
            "--no-video",
            "--no-audio",
            "--no-chapters",
            "--no-attachments",
            "--no-global-tags",
            "--no-track-tags",
            "--subtitle-tracks",
        ]
        .map(OsString::from),
    );
    args.push(ids.into());
    args.push(input.into());

    args
}

/// Build the mkvextract arguments for a grouped extraction.
pub fn extract_arguments(source: &Path, pairs: &[(u32, PathBuf)]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![source.into(), "tracks".into()];

    for (id, dest) in pairs {
        let mut pair = OsString::from(format!("{id}:"));
        pair.push(dest);
        args.push(pair);
    }

    args
}

fn tool_output(stdout: &str, stderr: &str) -> String {
    [stdout.trim(), stderr.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn exe_lookup() {
        let suffix = std::env::consts::EXE_SUFFIX;

        let tools = MkvToolNix::default();
        assert_eq!(tools.get_exe("mkvmerge"), PathBuf::from(format!("mkvmerge{suffix}")));

        let tools = MkvToolNix::new(Some(PathBuf::from("/opt/mkvtoolnix")));
        assert_eq!(
            tools.get_exe("mkvextract"),
            PathBuf::from(format!("/opt/mkvtoolnix/mkvextract{suffix}"))
        );
    }

    #[test]
    fn mux_argument_list() {
        let args = mux_arguments(
            Path::new("/m/movie.mkv"),
            &[2, 5],
            Path::new("/m/movie.subtitles.mks"),
        );

        assert_eq!(
            strings(&args),
            vec![
                "--gui-mode",
                "-o",
                "/m/movie.subtitles.mks",
                "--no-video",
                "--no-audio",
                "--no-chapters",
                "--no-attachments",
                "--no-global-tags",
                "--no-track-tags",
                "--subtitle-tracks",
                "2,5",
                "/m/movie.mkv",
            ]
        );
    }

    #[test]
    fn extract_argument_list() {
        let pairs = vec![
            (0, PathBuf::from("/out/movie.eng.003.srt")),
            (1, PathBuf::from("/out/movie.eng.004.sub")),
        ];

        assert_eq!(
            strings(&extract_arguments(Path::new("movie.subtitles.mks"), &pairs)),
            vec![
                "movie.subtitles.mks",
                "tracks",
                "0:/out/movie.eng.003.srt",
                "1:/out/movie.eng.004.sub",
            ]
        );
    }

    #[test]
    fn missing_tool_is_a_launch_error() {
        let tools = MkvToolNix::new(Some(PathBuf::from("/nonexistent/mkvtoolnix")));
        match tools.identify(Path::new("movie.mkv")) {
            Err(Error::ToolLaunch { tool, .. }) => assert_eq!(tool, "mkvmerge"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    /// Install a shell script standing in for one of the tools.
    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, script: &str) {
        use std::{fs, os::unix::fs::PermissionsExt};

        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("make executable");
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_one_is_a_failure() {
        let tmp = tempfile::tempdir().expect("temp dir");
        fake_tool(
            tmp.path(),
            MKVEXTRACT,
            "echo 'Error: track 7 does not exist' >&2\nexit 1",
        );

        let tools = MkvToolNix::new(Some(tmp.path().to_path_buf()));
        let pairs = vec![(7, tmp.path().join("movie.eng.007.srt"))];
        match tools.extract(Path::new("movie.subtitles.mks"), &pairs) {
            Err(Error::ToolFailed { tool, code, output }) => {
                assert_eq!(tool, MKVEXTRACT);
                assert_eq!(code, Some(1));
                assert!(output.contains("track 7 does not exist"), "{output}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn mux_output_survives_invalid_utf8() {
        let tmp = tempfile::tempdir().expect("temp dir");
        fake_tool(
            tmp.path(),
            MKVMERGE,
            "printf 'Opening \\377\\376.mkv\\n#GUI#progress 50%%\\nWarning: damaged cluster\\n'\nexit 1",
        );

        let tools = MkvToolNix::new(Some(tmp.path().to_path_buf()));
        let result = tools.mux_subtitles(
            Path::new("movie.mkv"),
            &[2],
            &tmp.path().join("movie.subtitles.mks"),
            &mut MuxProgress::new(false),
        );

        match result {
            Err(Error::ToolFailed { code, output, .. }) => {
                assert_eq!(code, Some(1));
                assert!(output.contains("Opening"), "{output}");
                assert!(output.contains("Warning: damaged cluster"), "{output}");
                assert!(!output.contains("#GUI#progress"), "{output}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn tool_output_joins_streams() {
        assert_eq!(tool_output(" out \n", ""), "out");
        assert_eq!(tool_output("", "err"), "err");
        assert_eq!(tool_output("out", "err"), "out\nerr");
    }
}
