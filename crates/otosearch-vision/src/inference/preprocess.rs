//! Image preprocessing for the car classifier.
//!
//! Converts an arbitrary uploaded image into the model's input tensor:
//! force RGB, stretch (non-aspect-preserving) to the fixed square input
//! size, scale to [0, 1], apply ImageNet normalization and lay out as a
//! [1, 3, H, W] tensor. The transform is pure and deterministic: the
//! same image and target size always produce the same tensor.

use burn::tensor::{backend::Backend, Tensor};
use image::{imageops, imageops::FilterType, DynamicImage, ImageBuffer, Rgb};
use serde::{Deserialize, Serialize};

use otosearch_core::DEFAULT_IMAGE_SIZE;

/// ImageNet normalization mean values (RGB)
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Configuration for image preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Target square size the image is stretched to
    pub image_size: u32,
    /// Normalization means [R, G, B]
    pub mean: [f32; 3],
    /// Normalization standard deviations [R, G, B]
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

impl PreprocessConfig {
    /// Configure the target size
    pub fn with_image_size(mut self, size: u32) -> Self {
        self.image_size = size;
        self
    }
}

/// Image preprocessor for classifier input
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

impl ImagePreprocessor {
    /// Creates a new image preprocessor with the given configuration
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Target square size.
    pub fn image_size(&self) -> u32 {
        self.config.image_size
    }

    /// Force RGB and stretch to the target square. Bilinear, no aspect
    /// preservation: the model was trained on stretched inputs.
    pub fn prepare(&self, image: &DynamicImage) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
        let rgb = image.to_rgb8();
        let size = self.config.image_size;

        if rgb.dimensions() == (size, size) {
            return rgb;
        }

        imageops::resize(&rgb, size, size, FilterType::Triangle)
    }

    /// Preprocess an image into the model input tensor [1, 3, H, W].
    pub fn to_tensor<B: Backend>(&self, image: &DynamicImage, device: &B::Device) -> Tensor<B, 4> {
        let rgb = self.prepare(image);
        let size = self.config.image_size as usize;
        let num_pixels = size * size;

        // CHW layout: all R values, then all G values, then all B values
        let mut data = vec![0.0f32; 3 * num_pixels];
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                data[c * num_pixels + i] =
                    (pixel[c] as f32 / 255.0 - self.config.mean[c]) / self.config.std[c];
            }
        }

        Tensor::<B, 1>::from_floats(data.as_slice(), device).reshape([1, 3, size, size])
    }
}
