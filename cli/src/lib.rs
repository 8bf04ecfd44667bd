use std::fs;
use std::path::{Path, PathBuf};

use consensus::{BatchConfig, CombinationMode, ConsensusError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Logging section of a run file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct LogSection {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// On-disk description of a batch run
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct RunFile {
    /// Where to write the JSON report, if anywhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub log: LogSection,
}

impl RunFile {
    /// Load a run file from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a run file from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a run file from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a run file from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load the run file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Convert the run file to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Save the run file to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Convert the run file to JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Save the run file to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Save in the format matching the file extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml_file(path),
            Some("json") => self.to_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Get the JSON schema of the run file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RunFile)
    }
}

/// Command-line values that take precedence over the run file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub quorum: Option<u32>,
    pub modes: Vec<CombinationMode>,
    pub masks_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn apply_to(&self, config: &mut BatchConfig) {
        if let Some(quorum) = self.quorum {
            config.quorum = quorum;
        }
        if !self.modes.is_empty() {
            config.modes = self.modes.clone();
        }
        if let Some(dir) = &self.masks_dir {
            config.masks_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }
}
