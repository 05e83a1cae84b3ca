//! The composed recognition pipeline.
//!
//! Preprocess -> predict -> top-K, with a best-effort Grad-CAM overlay
//! for the top prediction. The pipeline is an explicitly constructed,
//! read-only context: model, label table and configuration are injected
//! once at startup and shared across requests without mutation. The
//! original image stays in a per-request in-memory buffer; there is no
//! shared scratch file.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use otosearch_core::{ClassLabels, PipelineConfig, Result};

use crate::backend::{default_device, InferenceBackend};
use crate::explain::{overlay, FeatureLayerSelector, GradCam};
use crate::inference::predictor::{top_k, CarPredictor, PredictionResult};
use crate::inference::preprocess::{ImagePreprocessor, PreprocessConfig};

/// Result of analyzing one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Ranked candidates, best first
    pub prediction: PredictionResult,
    /// Heatmap overlay as a data URI; absent when the explanation was
    /// skipped or failed
    pub heatmap: Option<String>,
}

/// Read-only recognition context shared by all requests.
pub struct RecognitionPipeline {
    preprocessor: ImagePreprocessor,
    predictor: CarPredictor,
    labels: ClassLabels,
    explainer: GradCam,
    config: PipelineConfig,
}

impl RecognitionPipeline {
    /// Assemble the pipeline. Fails when the label table does not match
    /// the model's output size: that is an artifact mismatch and the
    /// process should not come up with it.
    pub fn new(
        predictor: CarPredictor,
        labels: ClassLabels,
        config: PipelineConfig,
    ) -> Result<Self> {
        labels.expect_len(predictor.num_classes())?;

        let preprocessor = ImagePreprocessor::new(
            PreprocessConfig::default().with_image_size(config.image_size),
        );

        Ok(Self {
            preprocessor,
            predictor,
            labels,
            explainer: GradCam::default(),
            config,
        })
    }

    /// Replace the feature-layer selection strategy.
    pub fn with_selector(mut self, selector: FeatureLayerSelector) -> Self {
        self.explainer = GradCam::new(selector);
        self
    }

    /// The class-label table.
    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Run the full pipeline on a decoded image.
    ///
    /// The prediction is the primary result; the heatmap is best-effort
    /// and any failure there is logged and degraded to `None`.
    pub fn analyze(&self, image: &DynamicImage) -> Result<Analysis> {
        let device = default_device();
        let input = self.preprocessor.to_tensor::<InferenceBackend>(image, &device);

        let probabilities = self.predictor.predict(input.clone())?;
        let prediction = top_k(&probabilities, &self.labels, self.config.top_k)?;

        let best_index = argmax(&probabilities);
        let heatmap = match self.explain(image, input, best_index) {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!("saliency explanation skipped: {}", e);
                None
            }
        };

        Ok(Analysis {
            prediction,
            heatmap,
        })
    }

    fn explain(
        &self,
        image: &DynamicImage,
        input: burn::tensor::Tensor<InferenceBackend, 4>,
        class_index: usize,
    ) -> Result<String> {
        let map = self.explainer.compute(
            self.predictor.autodiff_model(),
            self.predictor.model(),
            input,
            class_index,
        )?;

        if map.is_degenerate() {
            return Err(otosearch_core::Error::Model(
                "saliency map has no positive contributions".to_string(),
            ));
        }

        let composite = overlay::render_overlay(image, &map, self.config.heatmap_alpha);
        overlay::to_data_uri(&composite)
    }
}

/// Index of the highest probability; equal values resolve to the lowest
/// index, matching the top-K tie-break.
fn argmax(probabilities: &[f32]) -> usize {
    probabilities
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}
