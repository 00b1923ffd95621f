use crate::algorithms::AlgorithmKind;
use crate::data::SyntheticParams;
use crate::logging::LoggingConfig;
use crate::warp::WarpMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub alignment: AlignmentConfig,
    pub pyramid: PyramidConfig,
    pub synthetic: SyntheticParams,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub algorithm: AlgorithmKind,
    pub mode: WarpMode,
    /// Iteration budget per level, coarsest first. The last entry applies
    /// to any further levels.
    pub iterations_per_level: Vec<usize>,
    /// Stop a level once the L2 norm of the increment falls below this
    pub epsilon: f64,
    /// Leave a level as soon as the error grows between iterations
    pub stop_on_error_increase: bool,
    /// Keep per-iteration metrics
    pub collect_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidConfig {
    /// Number of levels, 0 picks the maximum the template size allows
    pub levels: usize,
    /// Smallest accepted template/target extent
    pub min_image_size: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::InverseCompositional,
            mode: WarpMode::Translation,
            iterations_per_level: vec![30, 30, 15],
            epsilon: 1e-3,
            stop_on_error_increase: false,
            collect_metrics: true,
        }
    }
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            levels: 3,
            min_image_size: 4,
        }
    }
}

impl AlignmentConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.iterations_per_level.is_empty() {
            errors.push("iterations_per_level must contain at least one entry".to_string());
        }

        if self.iterations_per_level.iter().all(|n| *n == 0) {
            errors.push("iterations_per_level must allow at least one iteration".to_string());
        }

        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            errors.push("epsilon must be finite and non-negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> crate::Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Collects every problem instead of stopping at the first one
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.alignment.validate() {
            errors.extend(e);
        }

        if self.pyramid.levels > 16 {
            errors.push("pyramid levels must not exceed 16".to_string());
        }

        if self.synthetic.template_size == 0 {
            errors.push("synthetic template_size must be positive".to_string());
        }

        if self.synthetic.template_size > self.synthetic.width.min(self.synthetic.height) {
            errors.push("synthetic template must fit into the synthetic target".to_string());
        }

        if self.synthetic.noise_sigma < 0.0 {
            errors.push("synthetic noise_sigma must be non-negative".to_string());
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigFormat {
    Json,
    Toml,
}

pub fn load_config_or_default(config_path: Option<&str>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    eprintln!("Configuration validation errors:");
                    for error in errors {
                        eprintln!("  - {}", error);
                    }
                    eprintln!("Using default configuration instead.");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", path, e);
                eprintln!("Using default configuration.");
                Config::default()
            }
        },
        None => Config::default(),
    }
}
