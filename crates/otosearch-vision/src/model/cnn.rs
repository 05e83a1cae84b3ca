//! CNN architecture for car make/model/year classification.
//!
//! This module implements a Convolutional Neural Network using the Burn
//! framework for classifying car photographs into fine-grained
//! make/model/year categories. The convolutional stages are named so the
//! saliency explainer can address them individually.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Names of the convolutional stages, in forward order. These form the
/// introspection surface used by the feature-layer selector.
pub const STAGE_NAMES: [&str; 4] = ["conv1", "conv2", "conv3", "conv4"];

/// Configuration for the CarClassifier CNN model
#[derive(Config, Debug)]
pub struct CarClassifierConfig {
    /// Number of output classes (196 for Stanford Cars)
    #[config(default = "196")]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "224")]
    pub input_size: usize,

    /// Dropout rate for the classifier head
    #[config(default = "0.3")]
    pub dropout_rate: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Base number of convolutional filters
    #[config(default = "32")]
    pub base_filters: usize,
}

/// A CNN block with Conv2d, BatchNorm, ReLU, and optional MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        with_pool: bool,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);

        let pool = if with_pool {
            Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
        } else {
            None
        };

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);

        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// Car classifier CNN
///
/// Architecture:
/// - 4 convolutional stages with increasing filter counts
/// - BatchNorm and ReLU after each convolution, MaxPooling per stage
/// - Global average pooling
/// - Fully connected classifier head with dropout
#[derive(Module, Debug)]
pub struct CarClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,

    pub global_pool: AdaptiveAvgPool2d,

    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> CarClassifier<B> {
    /// Create a new CarClassifier from configuration
    pub fn new(config: &CarClassifierConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        // Convolutional stages: 3 -> 32 -> 64 -> 128 -> 256
        let conv1 = ConvBlock::new(config.in_channels, base, 3, true, device); // 224 -> 112
        let conv2 = ConvBlock::new(base, base * 2, 3, true, device); // 112 -> 56
        let conv3 = ConvBlock::new(base * 2, base * 4, 3, true, device); // 56 -> 28
        let conv4 = ConvBlock::new(base * 4, base * 8, 3, true, device); // 28 -> 14

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        let fc1 = LinearConfig::new(base * 8, 256).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(256, config.num_classes).init(device);

        Self {
            conv1,
            conv2,
            conv3,
            conv4,
            global_pool,
            fc1,
            dropout,
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// The convolutional stages in forward order.
    pub fn stages(&self) -> [&ConvBlock<B>; 4] {
        [&self.conv1, &self.conv2, &self.conv3, &self.conv4]
    }

    /// Number of convolutional stages.
    pub fn num_stages(&self) -> usize {
        STAGE_NAMES.len()
    }

    /// Run the backbone through stage `stage` (inclusive), returning the
    /// spatial feature map produced by that stage.
    pub fn features_to(&self, x: Tensor<B, 4>, stage: usize) -> Tensor<B, 4> {
        let mut x = x;
        for block in self.stages().iter().take(stage + 1) {
            x = block.forward(x);
        }
        x
    }

    /// Resume the forward pass from stage `start` (inclusive) and run
    /// through the classifier head. `start` equal to the number of
    /// stages applies the head only.
    pub fn forward_from(&self, x: Tensor<B, 4>, start: usize) -> Tensor<B, 2> {
        let mut x = x;
        for block in self.stages().iter().skip(start) {
            x = block.forward(x);
        }
        self.head(x)
    }

    /// Classifier head: global average pooling followed by the fully
    /// connected layers.
    ///
    /// # Arguments
    /// * `x` - Spatial feature map of shape [batch_size, channels, h, w]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn head(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        // Global pooling: [B, C, H, W] -> [B, C, 1, 1]
        let x = self.global_pool.forward(x);

        // Flatten: [B, C, 1, 1] -> [B, C]
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.features_to(x, STAGE_NAMES.len() - 1);
        self.head(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;

    type TestBackend = InferenceBackend;

    fn small_config() -> CarClassifierConfig {
        CarClassifierConfig::new()
            .with_num_classes(7)
            .with_input_size(32)
            .with_base_filters(4)
    }

    #[test]
    fn test_car_classifier_output_shape() {
        let device = Default::default();
        let config = small_config();
        let model = CarClassifier::<TestBackend>::new(&config, &device);

        // Dummy input: [batch=2, channels=3, height=32, width=32]
        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);

        let output = model.forward(input);
        let dims = output.dims();

        assert_eq!(dims[0], 2); // batch size
        assert_eq!(dims[1], 7); // num classes
    }

    #[test]
    fn test_forward_softmax_sums_to_one() {
        let device = Default::default();
        let model = CarClassifier::<TestBackend>::new(&small_config(), &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        let probs: Vec<f32> = model
            .forward_softmax(input)
            .into_data()
            .to_vec()
            .unwrap();

        assert_eq!(probs.len(), 7);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_split_forward_matches_full_forward() {
        let device = Default::default();
        let model = CarClassifier::<TestBackend>::new(&small_config(), &device);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);

        let full: Vec<f32> = model
            .forward(input.clone())
            .into_data()
            .to_vec()
            .unwrap();

        let last = model.num_stages() - 1;
        let features = model.features_to(input, last);
        let split: Vec<f32> = model
            .forward_from(features, last + 1)
            .into_data()
            .to_vec()
            .unwrap();

        assert_eq!(full.len(), split.len());
        for (a, b) in full.iter().zip(split.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_feature_map_is_spatial() {
        let device = Default::default();
        let model = CarClassifier::<TestBackend>::new(&small_config(), &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        let features = model.features_to(input, 3);
        let [b, c, h, w] = features.dims();

        assert_eq!(b, 1);
        assert_eq!(c, 32); // base_filters * 8
        assert_eq!(h, 2); // 32 halved four times
        assert_eq!(w, 2);
    }
}
