use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub references: ReferenceConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Directory of still images, or a raw MJPEG stream file.
    pub path: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    /// First frame to classify, 1-based inclusive.
    #[serde(default = "default_start_frame")]
    pub start_frame: u64,
    /// Last frame to classify, inclusive. Omit to run to the end of the source.
    #[serde(default)]
    pub end_frame: Option<u64>,
    /// Frame rate used to synthesize stream timestamps (mjpeg mode).
    #[serde(default = "default_fps")]
    pub fps: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// A frame scoring >= threshold against any reference is background.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    /// Frames between status lines while no foreground is found.
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            report_every: default_report_every(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Value constraints that deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.start_frame < 1 {
            return Err(ConfigError::Invalid(
                "input.start_frame must be at least 1".into(),
            ));
        }
        if self.input.end_frame == Some(0) {
            return Err(ConfigError::Invalid(
                "input.end_frame must be at least 1".into(),
            ));
        }
        if !matches!(self.input.mode.as_str(), "auto" | "directory" | "mjpeg") {
            return Err(ConfigError::Invalid(format!(
                "input.mode must be auto, directory or mjpeg, got {:?}",
                self.input.mode
            )));
        }
        if !(self.input.fps > 0.0) {
            return Err(ConfigError::Invalid("input.fps must be positive".into()));
        }
        if !self.classifier.threshold.is_finite() || self.classifier.threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "classifier.threshold must be a non-negative finite number".into(),
            ));
        }
        if self.classifier.width == 0 || self.classifier.height == 0 {
            return Err(ConfigError::Invalid(
                "classifier.width and classifier.height must be non-zero".into(),
            ));
        }
        if self.progress.report_every < 1 {
            return Err(ConfigError::Invalid(
                "progress.report_every must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_mode() -> String {
    "auto".into()
}
fn default_start_frame() -> u64 {
    1
}
fn default_fps() -> f64 {
    25.0
}
fn default_threshold() -> f32 {
    0.97
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_report_every() -> u64 {
    100
}
fn default_log_level() -> String {
    "info".into()
}
