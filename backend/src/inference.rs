use crate::models::{feature_names, FeatureVector, FEATURE_COUNT};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tract_onnx::prelude::*;

pub const MODEL_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", .0.display())]
    Unavailable(PathBuf),

    #[error("failed to load model from {}: {cause}", .path.display())]
    Load { path: PathBuf, cause: TractError },
}

/// Anything that can turn an encoded record into a class label.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64>;

    fn info(&self) -> ModelInfo;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Binary classifier exported to ONNX, loaded once and only read afterwards.
///
/// See [`interpret_output`] for how the graph output becomes a label.
pub struct ModelInference {
    model: OnnxPlan,
    pub threshold: f32,
}

impl ModelInference {
    pub fn load<P: AsRef<Path>>(model_path: P, threshold: f32) -> Result<Self, ModelError> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(ModelError::Unavailable(path.to_path_buf()));
        }

        let model = Self::build_plan(path).map_err(|cause| ModelError::Load {
            path: path.to_path_buf(),
            cause,
        })?;

        Ok(Self { model, threshold })
    }

    fn build_plan(path: &Path) -> TractResult<OnnxPlan> {
        tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
            )?
            .into_optimized()?
            .into_runnable()
    }
}

impl Predictor for ModelInference {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64> {
        let input = Tensor::from_shape(&[1, FEATURE_COUNT], &features.to_f32())?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let first = outputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("model produced no outputs"))?;
        interpret_output(first, self.threshold)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo::new(self.threshold)
    }
}

/// Turns the first model output into a class label.
///
/// Integer outputs of any width are labels. Float outputs are scores: one
/// value is the positive-class probability, two values are `[p0, p1]`. Only
/// scores are compared against `threshold`.
pub fn interpret_output(output: &Tensor, threshold: f32) -> TractResult<i64> {
    if output.datum_type().is_integer() {
        let labels = output.cast_to::<i64>()?;
        return labels
            .to_array_view::<i64>()?
            .iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("model produced an empty label tensor"));
    }

    let scores = output.cast_to::<f32>()?;
    let scores: Vec<f32> = scores.to_array_view::<f32>()?.iter().copied().collect();
    let probability = match scores.as_slice() {
        [p] | [_, p] => *p,
        other => anyhow::bail!("unexpected model output of {} values", other.len()),
    };
    if !(0.0..=1.0).contains(&probability) {
        anyhow::bail!("model score {} is not a probability", probability);
    }
    Ok(i64::from(probability >= threshold))
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ModelInfo {
    pub input_shape: Vec<usize>,
    pub threshold: f32,
    pub version: String,
    pub features: Vec<String>,
}

impl ModelInfo {
    pub fn new(threshold: f32) -> Self {
        ModelInfo {
            input_shape: vec![1, FEATURE_COUNT],
            threshold,
            version: MODEL_VERSION.to_string(),
            features: feature_names(),
        }
    }
}
