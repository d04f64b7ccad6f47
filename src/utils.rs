use std::{fmt::Display, path::Path};

/// Convert a boolean value to yes or no.
///
/// # Arguments
///
/// * `b` - The boolean value to be converted.
#[inline]
pub fn bool_to_yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Return a boolean value indicating whether a given directory exists.
///
/// # Arguments
///
/// * `path` - The path to the directory.
#[inline]
pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}

/// Return a boolean value indicating whether a given file exists.
///
/// # Arguments
///
/// * `path` - The path to the file.
#[inline]
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// Get the lowercase extension of a given file path.
///
/// # Arguments
///
/// * `path` - The path to the file.
#[inline]
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Remove a file, ignoring any errors.
///
/// # Arguments
///
/// * `path` - The path to the file.
pub fn remove_file_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::debug!("Could not remove '{}': {e}", path.display());
    }
}

const SECONDS_IN_MINUTE: u64 = 60;
const SECONDS_IN_HOUR: u64 = SECONDS_IN_MINUTE * 60;

const DURATION_UNITS: [(u64, &str); 3] = [
    (SECONDS_IN_HOUR, "hour"),
    (SECONDS_IN_MINUTE, "minute"),
    (1, "second"),
];

struct DurationUnit {
    amount: u64,
    unit: &'static str,
}

impl Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)?;
        if self.amount != 1 {
            write!(f, "s")?;
        }
        Ok(())
    }
}

/// Convert a duration (in seconds) into hours, minutes and seconds, e.g. `1 minute, and 5 seconds`.
///
/// # Arguments
///
/// * `seconds` - The duration, in seconds.
pub fn format_duration(seconds: u64) -> String {
    let mut remaining = seconds;
    let mut parts = Vec::new();

    for (size, unit) in DURATION_UNITS {
        let amount = remaining / size;
        remaining %= size;

        if amount > 0 {
            parts.push(DurationUnit { amount, unit }.to_string());
        }
    }

    match parts.len() {
        0 => DurationUnit { amount: 0, unit: "second" }.to_string(),
        1 => parts.remove(0),
        n => {
            parts[n - 1] = format!("and {}", parts[n - 1]);
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0 seconds");
        assert_eq!(format_duration(1), "1 second");
        assert_eq!(format_duration(61), "1 minute, and 1 second");
        assert_eq!(format_duration(3600), "1 hour");
        assert_eq!(format_duration(7322), "2 hours, 2 minutes, and 2 seconds");
    }

    #[test]
    fn extensions() {
        assert_eq!(get_file_extension(Path::new("a/Movie.MKV")), Some("mkv".to_string()));
        assert_eq!(get_file_extension(Path::new("a/movie")), None);
    }
}
