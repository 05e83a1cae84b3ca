//! Backend selection for the Burn framework.
//!
//! The service is CPU-hosted, so inference runs on the portable ndarray
//! backend. Saliency explanations need gradients and use the autodiff
//! wrapper around the same backend.

use burn::backend::{Autodiff, NdArray};

/// Backend used for plain forward inference.
pub type InferenceBackend = NdArray<f32>;

/// Autodiff backend used by the saliency explainer.
pub type ExplainBackend = Autodiff<InferenceBackend>;

/// Get the default device for the inference backend.
pub fn default_device() -> <InferenceBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Human-readable name for the configured backend.
pub fn backend_name() -> &'static str {
    "ndarray (CPU)"
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;

    #[test]
    fn test_backend_tensor_roundtrip() {
        let device = default_device();
        let tensor = Tensor::<InferenceBackend, 1>::from_floats([1.0, 2.0, 3.0], &device);
        let values: Vec<f32> = tensor.into_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_backend_name() {
        assert!(!backend_name().is_empty());
    }
}
