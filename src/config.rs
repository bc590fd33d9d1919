use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::backends::DEFAULT_THERMAL_THRESHOLD;
use crate::frame::SplitLayout;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_MODEL_INPUT_SIZE: u32 = 640;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Debug, Deserialize, Default)]
struct FirelineConfigFile {
    confidence_threshold: Option<f32>,
    thermal_threshold: Option<f32>,
    split_layout: Option<SplitLayout>,
    enable_detection: Option<bool>,
    models: Option<ModelsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    color_model_path: Option<PathBuf>,
    thermal_model_path: Option<PathBuf>,
    input_size: Option<u32>,
    iou_threshold: Option<f32>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct FirelineConfig {
    /// Used when a request carries no confidence threshold.
    pub confidence_threshold: f32,
    /// Binarization threshold for the thermal heuristic (0-255).
    pub thermal_threshold: f32,
    /// Used when a split request carries no layout.
    pub split_layout: SplitLayout,
    /// Service-wide switch; a request runs detection only when this is on.
    pub enable_detection: bool,
    pub models: ModelSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub color_model_path: Option<PathBuf>,
    /// When set, a learned thermal model replaces the intensity heuristic.
    pub thermal_model_path: Option<PathBuf>,
    pub input_size: u32,
    pub iou_threshold: f32,
    pub labels: Vec<String>,
}

impl Default for FirelineConfig {
    fn default() -> Self {
        Self::from_file(FirelineConfigFile::default())
    }
}

impl FirelineConfig {
    /// Load from the file named by `FIRELINE_CONFIG` (if any), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = env_value("FIRELINE_CONFIG");
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => FirelineConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FirelineConfigFile) -> Self {
        let models = file.models.unwrap_or_default();
        Self {
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            thermal_threshold: file.thermal_threshold.unwrap_or(DEFAULT_THERMAL_THRESHOLD),
            split_layout: file.split_layout.unwrap_or_default(),
            enable_detection: file.enable_detection.unwrap_or(true),
            models: ModelSettings {
                color_model_path: models.color_model_path,
                thermal_model_path: models.thermal_model_path,
                input_size: models.input_size.unwrap_or(DEFAULT_MODEL_INPUT_SIZE),
                iou_threshold: models.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
                labels: models.labels.unwrap_or_default(),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(value) = env_value("FIRELINE_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = value
                .parse()
                .map_err(|_| anyhow!("FIRELINE_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        if let Some(value) = env_value("FIRELINE_THERMAL_THRESHOLD") {
            self.thermal_threshold = value
                .parse()
                .map_err(|_| anyhow!("FIRELINE_THERMAL_THRESHOLD must be a number"))?;
        }
        if let Some(value) = env_value("FIRELINE_SPLIT_LAYOUT") {
            self.split_layout = value
                .parse()
                .map_err(|e| anyhow!("FIRELINE_SPLIT_LAYOUT: {}", e))?;
        }
        if let Some(value) = env_value("FIRELINE_ENABLE_DETECTION") {
            self.enable_detection = parse_bool(&value)
                .ok_or_else(|| anyhow!("FIRELINE_ENABLE_DETECTION must be true or false"))?;
        }
        if let Some(path) = env_value("FIRELINE_MODEL_PATH") {
            self.models.color_model_path = Some(PathBuf::from(path));
        }
        if let Some(path) = env_value("FIRELINE_THERMAL_MODEL_PATH") {
            self.models.thermal_model_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold {} is outside [0, 1]",
                self.confidence_threshold
            ));
        }
        if !(0.0..=255.0).contains(&self.thermal_threshold) {
            return Err(anyhow!(
                "thermal threshold {} is outside [0, 255]",
                self.thermal_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.models.iou_threshold) {
            return Err(anyhow!(
                "IoU threshold {} is outside [0, 1]",
                self.models.iou_threshold
            ));
        }
        if self.models.input_size == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FirelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: FirelineConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
