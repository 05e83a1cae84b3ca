//! Feature-layer selection strategies.
//!
//! Grad-CAM needs the last layer whose output is still spatial. Which
//! layer that is depends on the architecture, so the choice is a
//! pluggable strategy over the model's stage catalog rather than a
//! hard-coded layer name.

use burn::tensor::backend::Backend;

use crate::model::cnn::{CarClassifier, STAGE_NAMES};

/// Description of one convolutional stage of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureStageInfo {
    /// Position in forward order
    pub index: usize,
    /// Stage name ("conv1" .. "conv4")
    pub name: &'static str,
    /// Whether the stage output keeps spatial extent (4D: B x C x H x W)
    pub spatial: bool,
}

/// Build the stage catalog for a model.
pub fn stage_catalog<B: Backend>(model: &CarClassifier<B>) -> Vec<FeatureStageInfo> {
    STAGE_NAMES
        .iter()
        .take(model.num_stages())
        .enumerate()
        .map(|(index, &name)| FeatureStageInfo {
            index,
            name,
            spatial: true,
        })
        .collect()
}

/// Strategy for picking the target feature stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureLayerSelector {
    /// Last spatial stage whose name contains the pattern
    ByNamePattern(String),
    /// Last stage with a spatial (4D) output
    ByShape,
    /// A specific stage by exact name
    Explicit(String),
}

impl Default for FeatureLayerSelector {
    fn default() -> Self {
        FeatureLayerSelector::ByNamePattern("conv".to_string())
    }
}

impl FeatureLayerSelector {
    /// Select a stage index from the catalog, or `None` when no stage
    /// satisfies the strategy.
    pub fn select(&self, stages: &[FeatureStageInfo]) -> Option<usize> {
        match self {
            FeatureLayerSelector::ByNamePattern(pattern) => stages
                .iter()
                .rev()
                .find(|s| s.spatial && s.name.contains(pattern.as_str()))
                .map(|s| s.index),
            FeatureLayerSelector::ByShape => stages
                .iter()
                .rev()
                .find(|s| s.spatial)
                .map(|s| s.index),
            FeatureLayerSelector::Explicit(name) => stages
                .iter()
                .find(|s| s.name == name.as_str())
                .map(|s| s.index),
        }
    }
}
