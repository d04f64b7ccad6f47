use crate::error::{Error, Result};

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record, debug, info};
use std::{
    io::{self, prelude::*},
    path::Path,
    sync::Mutex,
};
#[cfg(feature = "logging")]
use std::fs::File;

/// The width of a section header.
pub const SECTION_WIDTH: usize = 60;

/// Write a section header, e.g. `-------Batch Processing-------`.
///
/// # Arguments
///
/// * `title` - The title of the section.
/// * `console` - Whether the header should also be shown on the console.
pub fn section(title: &str, console: bool) {
    let line = format!("{:-^1$}", title, SECTION_WIDTH);
    if console {
        info!("{line}");
    } else {
        debug!("{line}");
    }
}

/// Write a subsection header, e.g. `[File 1 of 3]`.
pub fn subsection(title: &str, console: bool) {
    if console {
        info!("[{title}]");
    } else {
        debug!("[{title}]");
    }
}

/// Map the number of `-v` flags onto a console log level.
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Writes log records to the console and, optionally, to a log file.
///
/// The log file receives everything down to debug level, regardless of
/// the console level.
pub struct Logger {
    console_level: LevelFilter,
    file: Option<Mutex<Box<dyn Write + Send>>>,
}

impl Logger {
    pub fn new(console_level: LevelFilter) -> Logger {
        Self {
            console_level,
            file: None,
        }
    }

    /// Mirror every record into a writer, normally the log file.
    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Logger {
        self.file = Some(Mutex::new(writer));
        self
    }

    fn file_level(&self) -> LevelFilter {
        if self.file.is_some() {
            LevelFilter::Debug
        } else {
            LevelFilter::Off
        }
    }

    /// The most verbose level that either destination accepts.
    pub fn max_level(&self) -> LevelFilter {
        self.console_level.max(self.file_level())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if record.level() <= self.console_level {
            let line = console_line(record.level(), &record.args().to_string());
            _ = writeln!(io::stderr(), "{line}");
        }

        if record.level() <= self.file_level()
            && let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            _ = write!(file, "{}\r\n", file_line(record));
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            _ = file.flush();
        }
    }
}

fn console_line(level: Level, message: &str) -> String {
    match level {
        Level::Error => format!("{} {message}", "error:".red().bold()),
        Level::Warn => format!("{} {message}", "warning:".yellow().bold()),
        Level::Info => message.to_string(),
        Level::Debug | Level::Trace => message.dimmed().to_string(),
    }
}

fn file_line(record: &Record) -> String {
    format!("[{:<5}] {}: {}", record.level(), record.target(), record.args())
}

/// Install the logger.
///
/// # Arguments
///
/// * `console_level` - The most verbose level shown on the console.
/// * `log_file` - A file that should receive a copy of every record, if any.
pub fn init(console_level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    #[allow(unused_mut)]
    let mut logger = Logger::new(console_level);

    #[cfg(feature = "logging")]
    if let Some(path) = log_file {
        let file = File::create(path).map_err(|e| {
            Error::Config(format!("failed to open log file '{}': {e}", path.display()))
        })?;
        logger = logger.with_writer(Box::new(file));
    }

    #[cfg(not(feature = "logging"))]
    if log_file.is_some() {
        eprintln!("Log file support is not enabled in this build");
    }

    let max = logger.max_level();
    log::set_boxed_logger(Box::new(logger)).map_err(|e| Error::Config(e.to_string()))?;
    log::set_max_level(max);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_from_verbosity(1), LevelFilter::Info);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn file_receives_debug_records() {
        let buffer = SharedBuffer::default();
        let logger = Logger::new(LevelFilter::Error).with_writer(Box::new(buffer.clone()));
        assert_eq!(logger.max_level(), LevelFilter::Debug);

        for (level, message) in [
            (Level::Debug, "running mkvmerge"),
            (Level::Trace, "raw json"),
        ] {
            logger.log(
                &Record::builder()
                    .level(level)
                    .target("extract")
                    .args(format_args!("{message}"))
                    .build(),
            );
        }

        let text = String::from_utf8(buffer.0.lock().expect("lock").clone()).expect("utf8");
        assert_eq!(text, "[DEBUG] extract: running mkvmerge\r\n");
    }

    #[test]
    fn console_only_logger() {
        let logger = Logger::new(LevelFilter::Info);
        assert_eq!(logger.max_level(), LevelFilter::Info);
        assert!(logger.enabled(&Metadata::builder().level(Level::Info).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Debug).build()));
    }
}
