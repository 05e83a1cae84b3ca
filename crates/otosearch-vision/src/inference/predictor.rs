//! Classifier adapter and top-K selection.
//!
//! `CarPredictor` wraps the frozen classifier: the model record is
//! loaded exactly once at process start (a missing or corrupt artifact
//! is a fatal startup error) and shared read-only across requests.

use std::path::Path;

use burn::module::{AutodiffModule, Module};
use burn::record::CompactRecorder;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use otosearch_core::{ClassLabels, Error, Result};

use crate::backend::{ExplainBackend, InferenceBackend};
use crate::model::cnn::{CarClassifier, CarClassifierConfig};

/// A single ranked candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPrediction {
    /// Class label (raw, as stored in the label table)
    pub name: String,
    /// Confidence in percent, rounded to 2 decimal places
    pub confidence: f32,
}

/// Ordered top-K prediction result, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predictions: Vec<ClassPrediction>,
}

impl PredictionResult {
    /// The top prediction, if any candidates were produced.
    pub fn best(&self) -> Option<&ClassPrediction> {
        self.predictions.first()
    }
}

/// Select the `k` highest-probability classes from a softmax output.
///
/// The sort is stable and descending, so exactly equal probabilities
/// keep their class-index order. Confidences are percentages rounded to
/// 2 decimals. A probability vector whose length differs from the label
/// table is an artifact mismatch and fails loudly.
pub fn top_k(probabilities: &[f32], labels: &ClassLabels, k: usize) -> Result<PredictionResult> {
    labels.expect_len(probabilities.len())?;
    if k == 0 {
        return Err(Error::InvalidArgument("top-k requires k >= 1".to_string()));
    }

    let mut indices: Vec<usize> = (0..probabilities.len()).collect();
    indices.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

    let predictions = indices
        .iter()
        .take(k)
        .map(|&idx| {
            // expect_len above guarantees the index is in range
            let name = labels.get(idx).unwrap_or_default().to_string();
            ClassPrediction {
                name,
                confidence: round2(probabilities[idx] * 100.0),
            }
        })
        .collect();

    Ok(PredictionResult { predictions })
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Predictor wrapping the frozen car classifier.
#[derive(Debug)]
pub struct CarPredictor {
    /// Autodiff copy of the model, used by the saliency explainer
    model: CarClassifier<ExplainBackend>,
    /// Inference copy (`valid()` of the autodiff model)
    infer: CarClassifier<InferenceBackend>,
    num_classes: usize,
}

impl CarPredictor {
    /// Load the frozen model record from disk. Called once at startup;
    /// any failure here means the process must not start.
    pub fn load(model_path: &Path, config: &CarClassifierConfig) -> Result<Self> {
        if !model_path.exists() {
            return Err(Error::NotFound(format!(
                "model artifact not found at {}",
                model_path.display()
            )));
        }

        let device = crate::backend::default_device();

        // Dropout is inactive on the plain inference path but would fire
        // on the autodiff path used by the explainer; the serving model
        // runs with it zeroed so both paths compute the same function.
        let serving_config = CarClassifierConfig::new()
            .with_num_classes(config.num_classes)
            .with_input_size(config.input_size)
            .with_in_channels(config.in_channels)
            .with_base_filters(config.base_filters)
            .with_dropout_rate(0.0);

        let model = CarClassifier::<ExplainBackend>::new(&serving_config, &device);
        let model = model
            .load_file(model_path, &CompactRecorder::new(), &device)
            .map_err(|e| {
                Error::Model(format!(
                    "failed to load model record from {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        Ok(Self::from_model(model))
    }

    /// Build a predictor from an already-constructed model. Used by the
    /// loader above and by tests that initialize a model in memory.
    pub fn from_model(model: CarClassifier<ExplainBackend>) -> Self {
        let infer = model.valid();
        let num_classes = model.num_classes();
        Self {
            model,
            infer,
            num_classes,
        }
    }

    /// Run forward inference and return the softmax probability vector
    /// (length = number of classes).
    pub fn predict(&self, input: Tensor<InferenceBackend, 4>) -> Result<Vec<f32>> {
        let output = self.infer.forward_softmax(input);
        output
            .into_data()
            .to_vec()
            .map_err(|e| Error::Model(format!("failed to read model output: {:?}", e)))
    }

    /// The autodiff model, for gradient-based explanations.
    pub fn autodiff_model(&self) -> &CarClassifier<ExplainBackend> {
        &self.model
    }

    /// The plain inference model.
    pub fn model(&self) -> &CarClassifier<InferenceBackend> {
        &self.infer
    }

    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> ClassLabels {
        ClassLabels::new((0..n).map(|i| format!("class {}", i)).collect()).unwrap()
    }

    #[test]
    fn test_top_k_scenario_196_classes() {
        // 196 labels, probability vector of 196, index 5 at 0.87.
        let table = labels(196);
        let mut probs = vec![0.0005f32; 196];
        probs[5] = 0.87;
        probs[17] = 0.06;
        probs[100] = 0.02;

        let result = top_k(&probs, &table, 3).unwrap();

        assert_eq!(result.predictions.len(), 3);
        let best = result.best().unwrap();
        assert_eq!(best.name, "class 5");
        assert_eq!(best.confidence, 87.0);
        assert_eq!(result.predictions[1].name, "class 17");
        assert_eq!(result.predictions[2].name, "class 100");
    }

    #[test]
    fn test_top_k_sorted_descending_within_bounds() {
        let table = labels(10);
        let probs: Vec<f32> = (0..10).map(|i| (i as f32 + 1.0) / 55.0).collect();

        let result = top_k(&probs, &table, 3).unwrap();
        assert_eq!(result.predictions.len(), 3);

        for pair in result.predictions.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        for p in &result.predictions {
            assert!((0.0..=100.0).contains(&p.confidence));
        }
    }

    #[test]
    fn test_top_k_tie_break_is_stable() {
        let table = labels(6);
        // Indices 1, 3 and 4 share the max; lower index must win.
        let probs = vec![0.1, 0.2, 0.1, 0.2, 0.2, 0.1];

        let result = top_k(&probs, &table, 3).unwrap();
        assert_eq!(result.predictions[0].name, "class 1");
        assert_eq!(result.predictions[1].name, "class 3");
        assert_eq!(result.predictions[2].name, "class 4");
    }

    #[test]
    fn test_top_k_confidence_rounding() {
        let table = labels(2);
        let probs = vec![0.87654, 0.12346];

        let result = top_k(&probs, &table, 2).unwrap();
        assert_eq!(result.predictions[0].confidence, 87.65);
        assert_eq!(result.predictions[1].confidence, 12.35);
    }

    #[test]
    fn test_top_k_length_mismatch_fails_loudly() {
        let table = labels(196);
        let probs = vec![0.5f32; 195];

        let err = top_k(&probs, &table, 3).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_top_k_clamps_to_class_count() {
        let table = labels(2);
        let probs = vec![0.9, 0.1];

        let result = top_k(&probs, &table, 3).unwrap();
        assert_eq!(result.predictions.len(), 2);
    }

    #[test]
    fn test_load_missing_artifact() {
        let config = CarClassifierConfig::new();
        let err = CarPredictor::load(Path::new("/nonexistent/model.mpk"), &config).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_predict_returns_distribution() {
        let config = CarClassifierConfig::new()
            .with_num_classes(5)
            .with_base_filters(4);
        let device = Default::default();
        let model = CarClassifier::<ExplainBackend>::new(&config, &device);
        let predictor = CarPredictor::from_model(model);

        let input = Tensor::<InferenceBackend, 4>::zeros([1, 3, 32, 32], &Default::default());
        let probs = predictor.predict(input).unwrap();

        assert_eq!(probs.len(), 5);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }
}
