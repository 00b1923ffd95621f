//! Logging configuration
//!
//! A crate-wide level, per-module overrides and output destinations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Modules of this crate that accept a level override
pub const MODULES: [&str; 5] = ["algorithms", "imgproc", "pipeline", "warp", "data"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for everything in the crate without an override
    pub global_level: String,

    /// Human readable output on stderr
    pub console_output: bool,

    /// Directory for daily rolling JSON logs, none disables file output
    pub log_directory: Option<PathBuf>,

    pub file_name: String,

    /// Add source file and line to console events
    pub include_file_location: bool,

    /// Module name (see [`MODULES`]) to level. `algorithms = "trace"`
    /// shows every Gauss-Newton step.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
            console_output: true,
            log_directory: None,
            file_name: "lk-align.log".to_string(),
            include_file_location: false,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Per-iteration tracing of the solvers, files under `logs/`
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            log_directory: Some(PathBuf::from("logs")),
            include_file_location: true,
            ..Self::default()
        }
        .with_module("algorithms", "trace")
    }

    /// Warnings on files only, pipeline summaries kept
    pub fn production() -> Self {
        Self {
            global_level: "warn".to_string(),
            console_output: false,
            log_directory: Some(PathBuf::from("/var/log/lk-align")),
            ..Self::default()
        }
        .with_module("pipeline", "info")
    }

    pub fn with_module(mut self, module: &str, level: &str) -> Self {
        self.modules.insert(module.to_string(), level.to_string());
        self
    }

    /// Raise every level for a `-v` count; zero keeps the configuration
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        let level = match verbose {
            0 => return self,
            1 => "debug",
            _ => "trace",
        };
        self.global_level = level.to_string();
        self.modules.values_mut().for_each(|l| *l = level.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !LEVELS.contains(&self.global_level.as_str()) {
            return Err(format!(
                "Invalid global_level '{}', expected one of {:?}",
                self.global_level, LEVELS
            ));
        }
        for (module, level) in &self.modules {
            if !MODULES.contains(&module.as_str()) {
                return Err(format!("Unknown module '{}', expected one of {:?}", module, MODULES));
            }
            if !LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid level '{}' for module '{}', expected one of {:?}",
                    level, module, LEVELS
                ));
            }
        }

        if self.file_name.trim().is_empty() {
            return Err("Log file_name must not be empty".to_string());
        }

        if let Some(dir) = &self.log_directory {
            if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Effective level for one module
    pub fn get_component_level(&self, module: &str) -> &str {
        self.modules
            .get(module)
            .map_or(self.global_level.as_str(), String::as_str)
    }

    /// `EnvFilter` directives: the crate level first, then the overrides
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        std::iter::once(format!("{krate}={}", self.global_level))
            .chain(
                self.modules
                    .iter()
                    .map(|(module, level)| format!("{krate}::{module}={level}")),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}
