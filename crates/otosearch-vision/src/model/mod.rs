//! Model architectures.

pub mod cnn;

pub use cnn::{CarClassifier, CarClassifierConfig, ConvBlock};
