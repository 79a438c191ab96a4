//! Configuration loading and per-tool profiles.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::remap::OutputFormat;

pub const CONFIG_FILE_NAME: &str = ".nblint.toml";

/// Blank lines appended after each projected cell unless a tool profile
/// overrides it.
pub const DEFAULT_CELL_PADDING: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Per-tool overrides, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ToolProfile {
    pub cell_padding: Option<usize>,
    pub string_nonce: Option<bool>,
    pub output_format: Option<OutputFormat>,
    /// Arguments always passed to the tool, before any from the command line.
    pub addopts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub skip_celltags: Vec<String>,
    pub process_cells: Vec<String>,
    pub dont_skip_bad_cells: bool,
    pub allow_mutation: bool,
    /// Tool timeout in milliseconds; 0 means no timeout.
    pub timeout: u64,
    pub tools: HashMap<String, ToolProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_celltags: Vec::new(),
            process_cells: Vec::new(),
            dont_skip_bad_cells: false,
            allow_mutation: false,
            timeout: 0,
            tools: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration: an explicit file if given, otherwise the nearest
    /// `.nblint.toml` walking up from the current directory, otherwise the
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match discover_config_file() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn cell_padding_for(&self, tool: &str) -> usize {
        self.profile_field(tool, |p| p.cell_padding)
            .unwrap_or(DEFAULT_CELL_PADDING)
    }

    pub fn string_nonce_for(&self, tool: &str) -> bool {
        self.profile_field(tool, |p| p.string_nonce).unwrap_or(false)
    }

    pub fn output_format_for(&self, tool: &str) -> OutputFormat {
        self.profile_field(tool, |p| p.output_format).unwrap_or_default()
    }

    /// Extra arguments for `tool`. A user profile with addopts replaces the
    /// built-in ones entirely.
    pub fn addopts_for(&self, tool: &str) -> Vec<String> {
        if let Some(profile) = self.tools.get(tool)
            && !profile.addopts.is_empty()
        {
            return profile.addopts.clone();
        }
        builtin_profile(tool).map(|p| p.addopts).unwrap_or_default()
    }

    fn profile_field<T>(&self, tool: &str, get: impl Fn(&ToolProfile) -> Option<T>) -> Option<T> {
        self.tools
            .get(tool)
            .and_then(&get)
            .or_else(|| builtin_profile(tool).as_ref().and_then(&get))
    }
}

/// Built-in profiles for tools whose conventions are known.
fn builtin_profile(tool: &str) -> Option<ToolProfile> {
    match tool {
        "isort" => Some(ToolProfile {
            cell_padding: Some(2),
            ..Default::default()
        }),
        "flake8" => Some(ToolProfile {
            string_nonce: Some(true),
            ..Default::default()
        }),
        "black" | "blackdoc" => Some(ToolProfile {
            output_format: Some(OutputFormat::CannotParse),
            ..Default::default()
        }),
        "doctest" => Some(ToolProfile {
            output_format: Some(OutputFormat::FileLine),
            ..Default::default()
        }),
        _ => None,
    }
}

fn discover_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
