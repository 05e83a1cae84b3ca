//! Gradient-weighted class activation mapping.
//!
//! For a chosen output class, computes how strongly each spatial
//! location of the target feature layer contributed to that class's
//! score:
//!
//! 1. run the backbone up to the target stage (inference mode),
//! 2. lift the feature map into the autodiff graph as a gradient root
//!    and finish the forward pass under autodiff,
//! 3. backpropagate the class logit to get d(score)/d(features),
//! 4. average each gradient channel spatially into one weight per
//!    channel,
//! 5. channel-weighted sum of the feature map, ReLU, normalize by max.
//!
//! The backbone runs in inference mode on purpose: under autodiff the
//! batch-norm layers would switch to batch statistics and the map would
//! explain a different function than the one that produced the served
//! prediction. The class-score gradient with respect to the feature map
//! is unchanged by this split.

use burn::tensor::{activation, Tensor};
use tracing::debug;

use otosearch_core::{Error, Result};

use crate::backend::{ExplainBackend, InferenceBackend};
use crate::explain::selector::{stage_catalog, FeatureLayerSelector};
use crate::explain::SaliencyMap;
use crate::model::cnn::CarClassifier;

/// Grad-CAM explainer with a pluggable feature-layer strategy.
#[derive(Debug, Clone)]
pub struct GradCam {
    selector: FeatureLayerSelector,
}

impl Default for GradCam {
    fn default() -> Self {
        Self::new(FeatureLayerSelector::default())
    }
}

impl GradCam {
    pub fn new(selector: FeatureLayerSelector) -> Self {
        Self { selector }
    }

    /// Resolve the target stage. A name-pattern strategy falls back to
    /// shape-based selection; an explicit configuration does not.
    fn resolve_stage(&self, model: &CarClassifier<ExplainBackend>) -> Option<usize> {
        let stages = stage_catalog(model);
        match &self.selector {
            FeatureLayerSelector::ByNamePattern(_) => self
                .selector
                .select(&stages)
                .or_else(|| FeatureLayerSelector::ByShape.select(&stages)),
            _ => self.selector.select(&stages),
        }
    }

    /// Compute the normalized saliency map for `class_index`.
    ///
    /// `model` is the autodiff copy of the classifier and `valid` its
    /// plain inference counterpart; both must hold the same weights.
    pub fn compute(
        &self,
        model: &CarClassifier<ExplainBackend>,
        valid: &CarClassifier<InferenceBackend>,
        input: Tensor<InferenceBackend, 4>,
        class_index: usize,
    ) -> Result<SaliencyMap> {
        let stage = self.resolve_stage(model).ok_or_else(|| {
            Error::Model("no spatial feature stage available for explanation".to_string())
        })?;
        debug!("computing grad-cam against stage {}", stage);

        // Backbone in inference mode up to and including the target.
        let features_inner = valid.features_to(input, stage);
        let [_, _, height, width] = features_inner.dims();

        // Lift the feature map into the autodiff graph as a gradient
        // root, then finish the network under autodiff.
        let features: Tensor<ExplainBackend, 4> =
            Tensor::from_inner(features_inner).require_grad();
        let logits = model.forward_from(features.clone(), stage + 1);

        let [_, num_classes] = logits.dims();
        if class_index >= num_classes {
            return Err(Error::InvalidArgument(format!(
                "class index {} out of range for {} classes",
                class_index, num_classes
            )));
        }

        // Pre-softmax score of the target class.
        let score = logits
            .slice([0..1, class_index..class_index + 1])
            .reshape([1]);
        let grads = score.backward();
        let grad = features.grad(&grads).ok_or_else(|| {
            Error::Model("no gradient recorded for the feature stage".to_string())
        })?;

        // One importance weight per channel: spatial mean of the
        // gradient, then a channel-weighted sum of the feature map.
        let weights = grad.mean_dim(2).mean_dim(3); // [1, C, 1, 1]
        let cam = (features.inner() * weights).sum_dim(1); // [1, 1, H, W]

        // Only positive contributions matter for the predicted class.
        let cam = activation::relu(cam);

        let max_val: f32 = cam.clone().max().into_scalar();
        let values = if max_val > 0.0 {
            cam.div_scalar(max_val)
                .into_data()
                .to_vec()
                .map_err(|e| Error::Model(format!("failed to read saliency map: {:?}", e)))?
        } else {
            // Degenerate map: no salient region. Not an error, and in
            // particular not a division by zero.
            vec![0.0f32; height * width]
        };

        Ok(SaliencyMap::new(width, height, values))
    }
}
