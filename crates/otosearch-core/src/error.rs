//! Error types for the Otosearch service.

use thiserror::Error;

/// Main error type for the car recognition pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    Model(String),

    /// Class-label table error
    #[error("Label error: {0}")]
    Labels(String),

    /// Configuration error (e.g. label table / output vector mismatch)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Specification store error
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

/// Specialized Result type for car recognition operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Model("test error".to_string());
        assert_eq!(err.to_string(), "Model error: test error");

        let err = Error::Config("196 classes, 195 labels".to_string());
        assert_eq!(err.to_string(), "Configuration error: 196 classes, 195 labels");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
