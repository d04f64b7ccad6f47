mod cli;
mod codec;
mod config;
mod console;
mod discovery;
mod error;
mod extract;
mod file_processor;
mod interactive;
mod language;
mod logger;
mod matcher;
mod media_info;
mod mkvtoolnix;
mod progress;
mod selection;
mod template;
mod track;
mod utils;

use clap::Parser;
use cli::{Cli, Mode};
use colored::Colorize;
use config::{AppliedConfig, Config};
use console::Console;
use error::Result;
use file_processor::{FileProcessor, ProcessOptions};
use log::{debug, info, warn};
use mkvtoolnix::MkvToolNix;
use selection::Selection;
use std::{io, process::ExitCode};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = logger::init(
        logger::level_from_verbosity(cli.verbose),
        cli.log_file.as_deref(),
    ) {
        eprintln!("{} {e}", "error:".red().bold());
        return ExitCode::FAILURE;
    }

    let console = Console::default();
    match run(&cli, &console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", format!("{}:", e.category()).red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, console: &Console) -> Result<()> {
    logger::section("Initial Setup", false);

    let settings = load_settings(cli)?.merge_with_cli(&cli.flags());
    debug!("Effective settings: {settings:?}");

    console.title(&format!("MKV Subtitle Extractor v{}", env!("CARGO_PKG_VERSION")));

    let extractor = MkvToolNix::new(settings.mkvtoolnix.clone());
    let options = ProcessOptions {
        selection: build_selection(&settings),
        output: settings.output_spec(),
        dry_run: cli.dry_run,
        show_progress: true,
        per_track: cli.per_track,
    };

    match cli.mode() {
        Mode::Info(file) => file_processor::show_info(&extractor, console, &file),
        Mode::Extract(file) => FileProcessor::new(&extractor, console, options)
            .run_single(&file)
            .map(|_| ()),
        Mode::Batch(pattern) => {
            let files = discovery::expand_pattern(&pattern)?;
            console.info(&format!("Found {} MKV file(s) matching '{pattern}'", files.len()));

            FileProcessor::new(&extractor, console, options)
                .process_batch(&files, cli.workers())?
                .into_result()
                .map(|_| ())
        }
        Mode::Interactive(paths) => {
            let files = discovery::discover(&paths)?;
            let stdin = io::stdin().lock();

            if let [file] = files.as_slice() {
                interactive::run_single(&extractor, console, file, stdin, options).map(|_| ())
            } else {
                interactive::run_batch(&extractor, console, &files, stdin, options, cli.workers())?
                    .into_result()
                    .map(|_| ())
            }
        }
    }
}

/// Read the configuration file, if one was given, and apply the chosen profile.
fn load_settings(cli: &Cli) -> Result<AppliedConfig> {
    let Some(path) = &cli.config else {
        return Ok(AppliedConfig::default());
    };

    let config = Config::load(path)?;
    let Some(name) = &cli.profile else {
        return Ok(config.apply_defaults());
    };

    info!("Using profile '{name}'");
    config.apply_profile(name).inspect_err(|_| {
        warn!("Available profiles: {}", config.profile_names().join(", "));
    })
}

/// Invalid items are reported by the parser and otherwise ignored.
fn build_selection(settings: &AppliedConfig) -> Selection {
    let (filter, _) = selection::parse_selection(&settings.selection_expression());
    let (exclusions, _) = selection::parse_exclusion(&settings.exclusion_expression());
    debug!(
        "Selection '{}', exclusion '{}'",
        filter.to_expression(),
        exclusions.to_expression()
    );

    Selection::new(filter, exclusions)
}
