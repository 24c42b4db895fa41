use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::classify::backend::{OccupancyBackend, SpotStatus};
use crate::classify::features::FEATURE_LEN;

#[derive(Debug, Deserialize)]
struct LinearArtifact {
    weights: Vec<f32>,
    bias: f32,
}

/// Linear decision function exported as JSON (`weights` + `bias`).
///
/// A positive decision value is the "occupied" class, matching the sign
/// convention of a linear SVM's `coef_`/`intercept_` with label 1 = occupied.
#[derive(Clone, Debug)]
pub struct LinearBackend {
    weights: Vec<f32>,
    bias: f32,
}

impl LinearBackend {
    pub fn new(weights: Vec<f32>, bias: f32) -> Result<Self> {
        if weights.len() != FEATURE_LEN {
            return Err(anyhow!(
                "linear model has {} weights, expected {}",
                weights.len(),
                FEATURE_LEN
            ));
        }
        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(anyhow!("linear model contains non-finite coefficients"));
        }
        Ok(Self { weights, bias })
    }

    /// Load a JSON artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read linear model {}", path.display()))?;
        let artifact: LinearArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("invalid linear model {}", path.display()))?;
        Self::new(artifact.weights, artifact.bias)
    }

    fn decision(&self, features: &[f32]) -> f32 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + self.bias
    }
}

impl OccupancyBackend for LinearBackend {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn predict(&self, features: &[f32]) -> Result<SpotStatus> {
        if features.len() != self.weights.len() {
            return Err(anyhow!(
                "expected {} features, received {}",
                self.weights.len(),
                features.len()
            ));
        }
        let decision = self.decision(features);
        if !decision.is_finite() {
            return Err(anyhow!("decision value is not finite"));
        }
        Ok(if decision > 0.0 {
            SpotStatus::Occupied
        } else {
            SpotStatus::Empty
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sign_of_decision_selects_label() {
        let backend = LinearBackend::new(vec![1.0; FEATURE_LEN], -0.5 * FEATURE_LEN as f32).unwrap();

        let dark = vec![0.2; FEATURE_LEN];
        let bright = vec![0.8; FEATURE_LEN];

        assert_eq!(backend.predict(&dark).unwrap(), SpotStatus::Empty);
        assert_eq!(backend.predict(&bright).unwrap(), SpotStatus::Occupied);
    }

    #[test]
    fn rejects_wrong_feature_length() {
        let backend = LinearBackend::new(vec![0.0; FEATURE_LEN], 0.0).unwrap();
        assert!(backend.predict(&[0.5; 3]).is_err());
    }

    #[test]
    fn loads_json_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::json!({ "weights": vec![0.0; FEATURE_LEN], "bias": 1.0 });
        file.write_all(json.to_string().as_bytes()).unwrap();

        let backend = LinearBackend::load(file.path()).unwrap();
        assert_eq!(
            backend.predict(&[0.0; FEATURE_LEN]).unwrap(),
            SpotStatus::Occupied
        );
    }

    #[test]
    fn short_artifact_fails_to_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "weights": [1.0, 2.0], "bias": 0.0 }"#)
            .unwrap();
        assert!(LinearBackend::load(file.path()).is_err());
    }
}
