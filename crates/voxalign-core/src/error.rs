//! Error types for core volume operations.

use thiserror::Error;

/// Error type for core volume and transform operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Feature derivation failed (degenerate spacing or empty extent).
    #[error("Feature computation error: {0}")]
    FeatureComputation(String),

    /// Error in transform construction or application.
    #[error("Transform error: {0}")]
    Transform(String),

    /// Two volumes that must share a grid do not.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a feature computation error.
    pub fn feature(msg: impl Into<String>) -> Self {
        Self::FeatureComputation(msg.into())
    }

    /// Create a transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::feature("zero spacing on axis 1");
        assert_eq!(
            err.to_string(),
            "Feature computation error: zero spacing on axis 1"
        );
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = CoreError::ShapeMismatch {
            expected: [4, 4, 4],
            actual: [4, 4, 5],
        };
        assert!(err.to_string().contains("expected"));
        assert!(err.to_string().contains("got"));
    }
}
