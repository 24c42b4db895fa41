use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::anyhow;
use image::RgbImage;
use serde::Deserialize;

use crate::classify::backend::{OccupancyBackend, SpotStatus};
use crate::classify::backends::{LinearBackend, ThresholdBackend};
use crate::classify::features::patch_features;
use crate::error::{PipelineError, Result};

/// Which model implementation to load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Tract,
    Linear,
    Threshold,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tract" | "onnx" => Ok(BackendKind::Tract),
            "linear" => Ok(BackendKind::Linear),
            "threshold" => Ok(BackendKind::Threshold),
            other => Err(anyhow!(
                "unknown classifier backend '{}' (expected tract, linear or threshold)",
                other
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Tract => "tract",
            BackendKind::Linear => "linear",
            BackendKind::Threshold => "threshold",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierSettings {
    pub backend: BackendKind,
    pub model_path: PathBuf,
    /// Mean-intensity cut used by the threshold backend.
    pub threshold: f32,
}

/// Owned classifier service.
///
/// Constructed once at startup and passed by reference into the pipeline
/// drivers. Construction is the only place a model artifact is loaded.
pub struct Classifier {
    backend: Box<dyn OccupancyBackend>,
}

impl Classifier {
    /// Wrap an already constructed backend.
    pub fn new<B: OccupancyBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Load the configured backend, failing with `ModelUnavailable`.
    pub fn load(settings: &ClassifierSettings) -> Result<Self> {
        let classifier = match settings.backend {
            BackendKind::Tract => Self::load_tract(settings)?,
            BackendKind::Linear => LinearBackend::load(&settings.model_path)
                .map(Self::new)
                .map_err(|e| PipelineError::ModelUnavailable(PipelineError::detail(&e)))?,
            BackendKind::Threshold => Self::new(ThresholdBackend::new(settings.threshold)),
        };
        log::info!("classifier backend '{}' ready", classifier.name());
        Ok(classifier)
    }

    #[cfg(feature = "backend-tract")]
    fn load_tract(settings: &ClassifierSettings) -> Result<Self> {
        crate::classify::backends::TractBackend::new(&settings.model_path)
            .map(Self::new)
            .map_err(|e| PipelineError::ModelUnavailable(PipelineError::detail(&e)))
    }

    #[cfg(not(feature = "backend-tract"))]
    fn load_tract(_settings: &ClassifierSettings) -> Result<Self> {
        Err(PipelineError::ModelUnavailable(
            "the tract backend requires the backend-tract feature".to_string(),
        ))
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Classify a crop of arbitrary size.
    pub fn classify(&self, crop: &RgbImage) -> Result<SpotStatus> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(PipelineError::ClassificationError(format!(
                "crop is empty ({}x{})",
                crop.width(),
                crop.height()
            )));
        }
        let features = patch_features(crop);
        self.backend
            .predict(&features)
            .map_err(|e| PipelineError::ClassificationError(PipelineError::detail(&e)))
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn settings(backend: BackendKind, model_path: &str) -> ClassifierSettings {
        ClassifierSettings {
            backend,
            model_path: PathBuf::from(model_path),
            threshold: 0.5,
        }
    }

    #[test]
    fn missing_linear_artifact_is_model_unavailable() {
        let err = Classifier::load(&settings(BackendKind::Linear, "/nonexistent/model.json"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable(_)));
    }

    #[cfg(not(feature = "backend-tract"))]
    #[test]
    fn tract_without_feature_is_model_unavailable() {
        let err = Classifier::load(&settings(BackendKind::Tract, "model.onnx")).unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable(_)));
    }

    #[cfg(feature = "backend-tract")]
    #[test]
    fn missing_onnx_artifact_is_model_unavailable() {
        let err = Classifier::load(&settings(BackendKind::Tract, "/nonexistent/model.onnx"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable(_)));
    }

    #[test]
    fn threshold_classifier_labels_crops() {
        let classifier = Classifier::load(&settings(BackendKind::Threshold, "")).unwrap();

        let dark = RgbImage::from_pixel(20, 10, Rgb([10, 10, 10]));
        let bright = RgbImage::from_pixel(20, 10, Rgb([240, 240, 240]));

        assert_eq!(classifier.classify(&dark).unwrap(), SpotStatus::Empty);
        assert_eq!(classifier.classify(&bright).unwrap(), SpotStatus::Occupied);
    }

    #[test]
    fn empty_crop_is_a_classification_error() {
        let classifier = Classifier::new(ThresholdBackend::default());
        let err = classifier.classify(&RgbImage::new(0, 5)).unwrap_err();
        assert!(matches!(err, PipelineError::ClassificationError(_)));
    }

    #[test]
    fn backend_failure_is_not_defaulted() {
        struct Broken;
        impl OccupancyBackend for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn predict(&self, _features: &[f32]) -> anyhow::Result<SpotStatus> {
                Err(anyhow!("inference exploded"))
            }
        }

        let classifier = Classifier::new(Broken);
        let err = classifier
            .classify(&RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ClassificationError(msg) if msg.contains("exploded")));
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("ONNX".parse::<BackendKind>().unwrap(), BackendKind::Tract);
        assert_eq!(" linear ".parse::<BackendKind>().unwrap(), BackendKind::Linear);
        assert!("svm".parse::<BackendKind>().is_err());
    }
}
