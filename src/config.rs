use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classify::{BackendKind, ClassifierSettings};
use crate::pipeline::DEFAULT_JPEG_QUALITY;
use crate::scheduler::{SamplingConfig, DEFAULT_CHANGE_THRESHOLD, DEFAULT_STEP};

const DEFAULT_MASK_PATH: &str = "mask_1920_1080.png";
const DEFAULT_MODEL_PATH: &str = "model/model.onnx";
const DEFAULT_BACKEND: BackendKind = BackendKind::Tract;
const DEFAULT_INTENSITY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Deserialize, Default)]
struct ParkwatchConfigFile {
    mask_path: Option<PathBuf>,
    classifier: Option<ClassifierConfigFile>,
    sampling: Option<SamplingConfigFile>,
    overlay: Option<OverlayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    backend: Option<BackendKind>,
    model_path: Option<PathBuf>,
    threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SamplingConfigFile {
    step: Option<u32>,
    change_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    font_path: Option<PathBuf>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParkwatchConfig {
    pub mask_path: PathBuf,
    pub classifier: ClassifierSettings,
    pub sampling: SamplingConfig,
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub font_path: Option<PathBuf>,
    pub jpeg_quality: u8,
}

impl Default for ParkwatchConfig {
    fn default() -> Self {
        Self::from_file(ParkwatchConfigFile::default())
    }
}

impl ParkwatchConfig {
    /// Defaults, then the file named by `PARKWATCH_CONFIG`, then environment
    /// overrides. The result is validated.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PARKWATCH_CONFIG")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like `load`, but reads the given file (if any) instead of looking at
    /// `PARKWATCH_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => ParkwatchConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ParkwatchConfigFile) -> Self {
        let mask_path = file
            .mask_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MASK_PATH));
        let classifier_file = file.classifier.unwrap_or_default();
        let classifier = ClassifierSettings {
            backend: classifier_file.backend.unwrap_or(DEFAULT_BACKEND),
            model_path: classifier_file
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            threshold: classifier_file
                .threshold
                .unwrap_or(DEFAULT_INTENSITY_THRESHOLD),
        };
        let sampling_file = file.sampling.unwrap_or_default();
        let sampling = SamplingConfig {
            step: sampling_file.step.unwrap_or(DEFAULT_STEP),
            change_threshold: sampling_file
                .change_threshold
                .unwrap_or(DEFAULT_CHANGE_THRESHOLD),
        };
        let overlay_file = file.overlay.unwrap_or_default();
        let overlay = OverlaySettings {
            font_path: overlay_file.font_path,
            jpeg_quality: overlay_file.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
        };
        Self {
            mask_path,
            classifier,
            sampling,
            overlay,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PARKWATCH_MASK_PATH") {
            if !path.trim().is_empty() {
                self.mask_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("PARKWATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.classifier.model_path = PathBuf::from(path);
            }
        }
        if let Ok(backend) = std::env::var("PARKWATCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.classifier.backend = backend.parse()?;
            }
        }
        if let Ok(step) = std::env::var("PARKWATCH_STEP") {
            self.sampling.step = step
                .trim()
                .parse()
                .map_err(|_| anyhow!("PARKWATCH_STEP must be a positive integer"))?;
        }
        if let Ok(threshold) = std::env::var("PARKWATCH_CHANGE_THRESHOLD") {
            self.sampling.change_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("PARKWATCH_CHANGE_THRESHOLD must be a number"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling.step == 0 {
            return Err(anyhow!("sampling step must be at least 1 frame"));
        }
        let t = self.sampling.change_threshold;
        if !t.is_finite() || !(0.0..1.0).contains(&t) {
            return Err(anyhow!(
                "change threshold must be in [0, 1), got {}",
                self.sampling.change_threshold
            ));
        }
        if !(1..=100).contains(&self.overlay.jpeg_quality) {
            return Err(anyhow!("jpeg quality must be between 1 and 100"));
        }
        if !self.classifier.threshold.is_finite() {
            return Err(anyhow!("classifier threshold must be finite"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ParkwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_preserve_tuning_constants() {
        let cfg = ParkwatchConfig::default();
        assert_eq!(cfg.sampling.step, 30);
        assert_eq!(cfg.sampling.change_threshold, 0.4);
        assert_eq!(cfg.classifier.backend, BackendKind::Tract);
        assert_eq!(cfg.overlay.jpeg_quality, 90);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_rejects_degenerate_sampling() {
        let mut cfg = ParkwatchConfig::default();
        cfg.sampling.step = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ParkwatchConfig::default();
        cfg.sampling.change_threshold = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = ParkwatchConfig::default();
        cfg.sampling.change_threshold = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file: ParkwatchConfigFile =
            serde_json::from_str(r#"{ "sampling": { "step": 5 } }"#).unwrap();
        let cfg = ParkwatchConfig::from_file(file);
        assert_eq!(cfg.sampling.step, 5);
        assert_eq!(cfg.sampling.change_threshold, 0.4);
        assert_eq!(cfg.mask_path, PathBuf::from("mask_1920_1080.png"));
    }
}
