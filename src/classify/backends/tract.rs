#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::{OccupancyBackend, SpotStatus};
use crate::classify::features::FEATURE_LEN;

/// Tract-based backend for an ONNX export of the occupancy estimator.
///
/// The model takes a `[1, FEATURE_LEN]` f32 batch and its first output is the
/// predicted class label. Label 0 is "empty".
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_LEN)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model })
    }

    fn build_input(&self, features: &[f32]) -> Result<Tensor> {
        if features.len() != FEATURE_LEN {
            return Err(anyhow!(
                "expected {} features, received {}",
                FEATURE_LEN,
                features.len()
            ));
        }
        let input = tract_ndarray::Array2::from_shape_vec((1, FEATURE_LEN), features.to_vec())
            .context("failed to shape feature vector")?;
        Ok(input.into_tensor())
    }

    fn extract_label(&self, outputs: TVec<TValue>) -> Result<i64> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let label = match output.datum_type() {
            DatumType::I64 => output.to_array_view::<i64>()?.iter().next().copied(),
            DatumType::I32 => output
                .to_array_view::<i32>()?
                .iter()
                .next()
                .map(|v| *v as i64),
            DatumType::F32 => output
                .to_array_view::<f32>()?
                .iter()
                .next()
                .map(|v| v.round() as i64),
            other => return Err(anyhow!("unsupported label tensor type {:?}", other)),
        };
        label.ok_or_else(|| anyhow!("model label output was empty"))
    }
}

impl OccupancyBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn predict(&self, features: &[f32]) -> Result<SpotStatus> {
        let input = self.build_input(features)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        Ok(SpotStatus::from_label(self.extract_label(outputs)?))
    }
}
