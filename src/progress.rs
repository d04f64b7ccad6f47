use crate::utils;

use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::time::Instant;

lazy_static! {
    static ref PROGRESS_LINE: Regex =
        Regex::new(r"^#GUI#progress\s+(\d{1,3})\s*%\s*$").expect("valid progress regex");
}

const BAR_TEMPLATE: &str =
    "{spinner:.green} Muxing subtitle tracks {bar:40.cyan/blue} {pos:>3}% {msg}";

/// Extract the percentage from a line of `mkvmerge --gui-mode` output.
///
/// # Arguments
///
/// * `line` - A line of output, e.g. `#GUI#progress 45%`.
///
/// # Returns
///
/// The percentage, or `None` if this is not a progress line.
pub fn parse_progress_line(line: &str) -> Option<u8> {
    let caps = PROGRESS_LINE.captures(line.trim_end())?;
    let value = caps[1].parse::<u16>().ok()?;

    Some(value.min(100) as u8)
}

/// A progress bar for a muxing run.
///
/// The bar stays hidden until the first non-zero percentage arrives and
/// only ever moves forward.
pub struct MuxProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
    last: u8,
    start: Instant,
}

impl MuxProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: None,
            last: 0,
            start: Instant::now(),
        }
    }

    /// Feed a line of tool output.
    ///
    /// # Returns
    ///
    /// `true` if the line was a progress line, `false` if it should be kept as tool output.
    pub fn feed(&mut self, line: &str) -> bool {
        match parse_progress_line(line) {
            Some(percentage) => {
                self.update(percentage);
                true
            }
            None => false,
        }
    }

    pub fn update(&mut self, percentage: u8) {
        if percentage <= self.last {
            return;
        }
        self.last = percentage;

        if !self.enabled {
            return;
        }

        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(100);
            if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                bar.set_style(style.progress_chars("##-"));
            }
            bar
        });
        bar.set_position(u64::from(percentage));
    }

    /// Close the bar, if it was ever shown.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            let elapsed = utils::format_duration(self.start.elapsed().as_secs());
            bar.finish_with_message(format!("done in {elapsed}"));
        }
    }

    /// Remove the bar without a completion message, e.g. when the tool failed.
    pub fn abandon(&mut self) {
        debug!("Muxing stopped at {}%", self.last);
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
