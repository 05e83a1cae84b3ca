//! Configuration structures for the recognition pipeline.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_IMAGE_SIZE, TOP_K};

/// Configuration for the end-to-end recognition pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model input size (images are stretched to a square of this size)
    pub image_size: u32,
    /// Number of candidate predictions to return
    pub top_k: usize,
    /// Heatmap blend weight when compositing onto the original image
    pub heatmap_alpha: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            top_k: TOP_K,
            heatmap_alpha: 0.4,
        }
    }
}

impl PipelineConfig {
    /// Configure the model input size
    pub fn with_image_size(mut self, size: u32) -> Self {
        self.image_size = size;
        self
    }

    /// Configure the heatmap blend weight
    pub fn with_heatmap_alpha(mut self, alpha: f32) -> Self {
        self.heatmap_alpha = alpha;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.image_size, 224);
        assert_eq!(config.top_k, 3);
        assert!((config.heatmap_alpha - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::default()
            .with_image_size(256)
            .with_heatmap_alpha(0.5);
        assert_eq!(config.image_size, 256);
        assert!((config.heatmap_alpha - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.image_size, config.image_size);
        assert_eq!(parsed.top_k, config.top_k);
    }
}
