//! Conventional locations for hooktrace files

use std::path::PathBuf;

/// File name of the default log, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "stacktrace.log";

/// Base hooktrace directory (~/.hooktrace)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".hooktrace"))
        .unwrap_or_else(|| PathBuf::from(".hooktrace"))
}

/// Get the config file path (~/.hooktrace/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Default log file (`stacktrace.log` in the current working directory)
pub fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}
