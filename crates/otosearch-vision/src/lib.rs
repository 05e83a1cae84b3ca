//! # Otosearch vision pipeline
//!
//! Car make/model/year recognition built on the Burn framework:
//!
//! - `model`: CNN classifier architecture
//! - `inference`: image preprocessing, prediction and top-K selection
//! - `explain`: gradient-weighted class activation maps (Grad-CAM)
//! - `pipeline`: the composed, dependency-injected recognition pipeline
//!
//! The classifier and label table are loaded once at startup and shared
//! read-only across requests; everything per-request (decoded image,
//! input tensor, saliency map) is owned by the request and dropped with
//! it.

pub mod backend;
pub mod explain;
pub mod inference;
pub mod model;
pub mod pipeline;

pub use backend::{ExplainBackend, InferenceBackend};
pub use explain::{FeatureLayerSelector, GradCam, SaliencyMap};
pub use inference::predictor::{CarPredictor, ClassPrediction, PredictionResult};
pub use inference::preprocess::{ImagePreprocessor, PreprocessConfig};
pub use model::cnn::{CarClassifier, CarClassifierConfig};
pub use pipeline::{Analysis, RecognitionPipeline};
