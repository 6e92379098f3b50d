use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::TraceError;
use crate::format::DEFAULT_DISPATCH_FUNCTIONS;
use crate::snapshot::DEFAULT_MAX_DEPTH;
use crate::util::paths::{config_path, default_log_file};

/// Example configuration file contents (bundled with the library)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Settings shared by the snapshotter, formatter and log sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    /// Log file reports are appended to
    pub log_file: PathBuf,
    /// Maximum number of frames per report
    pub max_depth: usize,
    /// Function names treated as event dispatch calls
    pub dispatch_functions: Vec<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            max_depth: DEFAULT_MAX_DEPTH,
            dispatch_functions: DEFAULT_DISPATCH_FUNCTIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlTraceConfig {
    pub log_file: Option<PathBuf>,
    pub max_depth: Option<usize>,
    /// Replaces the default dispatch function list
    pub dispatch_functions: Option<Vec<String>>,
    /// Appended to the dispatch function list
    pub extra_dispatch_functions: Option<Vec<String>>,
}

impl TomlTraceConfig {
    /// Overlay the values present in this file onto `config`
    pub fn merge_into(self, config: &mut TraceConfig) -> Result<(), TraceError> {
        if let Some(log_file) = self.log_file {
            config.log_file = log_file;
        }

        if let Some(max_depth) = self.max_depth {
            if max_depth == 0 {
                return Err(TraceError::InvalidConfig(
                    "max_depth must be at least 1".to_string(),
                ));
            }
            config.max_depth = max_depth;
        }

        if let Some(functions) = self.dispatch_functions {
            config.dispatch_functions = functions;
        }

        if let Some(extra) = self.extra_dispatch_functions {
            for name in extra {
                if !config.dispatch_functions.contains(&name) {
                    config.dispatch_functions.push(name);
                }
            }
        }

        Ok(())
    }
}

impl TraceConfig {
    /// Load configuration from ~/.hooktrace/config.toml, merging with defaults.
    ///
    /// See [`TraceConfig::load_or_default`] for how a missing or invalid file
    /// is handled.
    pub fn load() -> Self {
        Self::load_or_default(&config_path())
    }

    /// Load configuration from `path`, merging with defaults.
    ///
    /// A missing file yields the defaults. An unreadable or invalid file is
    /// logged and ignored.
    pub fn load_or_default(config_file: &Path) -> Self {
        if !config_file.exists() {
            return Self::default();
        }

        match Self::load_from(config_file) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %config_file.display(),
                    error = %e,
                    "Ignoring invalid config file"
                );
                Self::default()
            }
        }
    }

    /// Load configuration from `path`, merging with defaults
    pub fn load_from(path: &Path) -> Result<Self, TraceError> {
        let contents = fs::read_to_string(path).map_err(|source| TraceError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let toml_config: TomlTraceConfig =
            toml::from_str(&contents).map_err(|source| TraceError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::default();
        toml_config.merge_into(&mut config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text, merging with defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, TraceError> {
        let toml_config: TomlTraceConfig = toml::from_str(contents)
            .map_err(|e| TraceError::InvalidConfig(e.to_string()))?;

        let mut config = Self::default();
        toml_config.merge_into(&mut config)?;
        Ok(config)
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_dispatch_function(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.dispatch_functions.contains(&name) {
            self.dispatch_functions.push(name);
        }
        self
    }
}
