use anyhow::{anyhow, Result};

use crate::classify::backend::{OccupancyBackend, SpotStatus};

/// Artifact-free backend for demos and smoke runs.
///
/// Calls a patch occupied when its mean intensity exceeds `threshold`.
pub struct ThresholdBackend {
    threshold: f32,
}

impl ThresholdBackend {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for ThresholdBackend {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl OccupancyBackend for ThresholdBackend {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn predict(&self, features: &[f32]) -> Result<SpotStatus> {
        if features.is_empty() {
            return Err(anyhow!("empty feature vector"));
        }
        let mean = features.iter().sum::<f32>() / features.len() as f32;
        Ok(if mean > self.threshold {
            SpotStatus::Occupied
        } else {
            SpotStatus::Empty
        })
    }
}
