use crate::{
    error::{Error, Result},
    template::{OutputDirectory, OutputSpec},
    utils,
};

use log::debug;
use serde_derive::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// The contents of a configuration file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// The selection applied when none is given on the command line.
    #[serde(alias = "default_languages")]
    pub languages: Vec<String>,
    pub exclusions: Vec<String>,
    pub output_template: String,
    pub output_dir: String,
    /// The directory holding the MKVToolNix executables.
    pub mkvtoolnix: Option<PathBuf>,
    pub profiles: BTreeMap<String, Profile>,
}

/// A named set of overrides for the top-level values.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Profile {
    pub languages: Vec<String>,
    pub exclusions: Vec<String>,
    pub output_template: String,
    pub output_dir: String,
}

/// The settings left once the configuration file and a profile have been combined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedConfig {
    pub languages: Vec<String>,
    pub exclusions: Vec<String>,
    pub output_template: String,
    pub output_dir: OutputDirectory,
    pub mkvtoolnix: Option<PathBuf>,
}

/// The command line values that can override the configuration.
#[derive(Clone, Debug, Default)]
pub struct CliFlags {
    pub select: Option<String>,
    pub exclude: Option<String>,
    pub output_template: Option<String>,
    /// `Some(None)` when the output directory flag was given without a value.
    pub output_dir: Option<Option<PathBuf>>,
}

impl Config {
    /// Read and validate a configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !utils::file_exists(path) {
            return Err(Error::Config(format!(
                "configuration file '{}' does not exist",
                path.display()
            )));
        }

        let json = fs::read_to_string(path)?;
        let config = serde_json::from_str::<Config>(&json).map_err(|e| {
            Error::Config(format!("failed to parse '{}': {e}", path.display()))
        })?;
        config.validate()?;

        debug!(
            "Loaded configuration from '{}' with {} profile(s)",
            path.display(),
            config.profiles.len()
        );

        Ok(config)
    }

    /// Check that language codes are 2 or 3 characters and profile names are not empty.
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in &self.profiles {
            if name.trim().is_empty() {
                return Err(Error::Config("profile name cannot be empty".to_string()));
            }

            if let Some(lang) = invalid_language(&profile.languages) {
                return Err(Error::Config(format!(
                    "invalid language code '{lang}' in profile '{name}': must be 2 or 3 characters"
                )));
            }
        }

        if let Some(lang) = invalid_language(&self.languages) {
            return Err(Error::Config(format!(
                "invalid default language code '{lang}': must be 2 or 3 characters"
            )));
        }

        Ok(())
    }

    /// Combine the top-level values with a named profile. Values set in the profile win.
    pub fn apply_profile(&self, name: &str) -> Result<AppliedConfig> {
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))?;

        let mut applied = self.apply_defaults();

        if !profile.languages.is_empty() {
            applied.languages = profile.languages.clone();
        }
        if !profile.exclusions.is_empty() {
            applied.exclusions = profile.exclusions.clone();
        }
        if !profile.output_template.is_empty() {
            applied.output_template = profile.output_template.clone();
        }
        if !profile.output_dir.is_empty() {
            applied.output_dir = output_directory(&profile.output_dir);
        }

        Ok(applied)
    }

    /// The top-level values, with no profile applied.
    pub fn apply_defaults(&self) -> AppliedConfig {
        AppliedConfig {
            languages: self.languages.clone(),
            exclusions: self.exclusions.clone(),
            output_template: self.output_template.clone(),
            output_dir: output_directory(&self.output_dir),
            mkvtoolnix: self.mkvtoolnix.clone(),
        }
    }

    /// The names of every profile, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

impl AppliedConfig {
    /// Override the configured values with any that were given on the command line.
    pub fn merge_with_cli(&self, cli: &CliFlags) -> AppliedConfig {
        let mut merged = self.clone();

        if let Some(select) = &cli.select {
            merged.languages = split_list(select);
        }
        if let Some(exclude) = &cli.exclude {
            merged.exclusions = split_list(exclude);
        }
        if let Some(template) = cli.output_template.as_ref().filter(|t| !t.is_empty()) {
            merged.output_template = template.clone();
        }
        match &cli.output_dir {
            Some(Some(dir)) => merged.output_dir = OutputDirectory::Fixed(dir.clone()),
            Some(None) => merged.output_dir = OutputDirectory::PerInput,
            None => {}
        }

        merged
    }

    /// The selection expression, e.g. `eng,spa`.
    pub fn selection_expression(&self) -> String {
        self.languages.join(",")
    }

    /// The exclusion expression.
    pub fn exclusion_expression(&self) -> String {
        self.exclusions.join(",")
    }

    pub fn output_spec(&self) -> OutputSpec {
        OutputSpec::new(self.output_dir.clone(), &self.output_template)
    }
}

fn output_directory(value: &str) -> OutputDirectory {
    if value.trim().is_empty() {
        OutputDirectory::InputDirectory
    } else {
        OutputDirectory::Fixed(PathBuf::from(value))
    }
}

fn invalid_language(codes: &[String]) -> Option<&str> {
    codes
        .iter()
        .map(String::as_str)
        .find(|c| !(2..=3).contains(&c.chars().count()))
}

fn split_list(expr: &str) -> Vec<String> {
    expr.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
