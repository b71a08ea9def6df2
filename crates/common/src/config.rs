//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PosewatchError, PosewatchResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Analysis thresholds.
    pub analysis: AnalysisDefaults,

    /// Output locations.
    pub output: OutputDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Mean per-joint displacement (normalized units) above which a frame
    /// is flagged as an anomaly.
    pub anomaly_threshold: f64,

    /// Wrist-to-nose distance (normalized, 2D) below which a hand counts
    /// as touching the face.
    pub hand_near_face_threshold: f64,
}

/// Default output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDefaults {
    /// Where the summary report is written when no path is given.
    pub report_path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "posewatch=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            anomaly_threshold: 0.05,
            hand_near_face_threshold: 0.36,
        }
    }
}

impl Default for OutputDefaults {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from("output").join("summary_report.txt"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing fields take defaults.
    pub fn load_from(path: impl AsRef<Path>) -> PosewatchResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PosewatchError::from_io_at(e, path))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds the analysis cannot work with.
    pub fn validate(&self) -> PosewatchResult<()> {
        check_threshold("analysis.anomaly_threshold", self.analysis.anomaly_threshold)?;
        check_threshold(
            "analysis.hand_near_face_threshold",
            self.analysis.hand_near_face_threshold,
        )
    }
}

/// A threshold must be finite and strictly positive.
pub fn check_threshold(name: &str, value: f64) -> PosewatchResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PosewatchError::config(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("posewatch").join("config.json")
}
