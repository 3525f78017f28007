//! Execution error types
//!
//! Errors raised while a backend evaluates an IR tree. These are the
//! deferred failures that cannot be detected while the tree is being built
//! because they depend on data (array lengths, ndarray extents, indices).

use thiserror::Error;

/// Runtime error type
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Operand has the wrong runtime shape for the operation
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Index out of bounds error
    #[error("BoundsError: attempt to access index {index} of collection with length {length}")]
    BoundsError {
        /// Attempted index
        index: i64,
        /// Collection length
        length: usize,
    },

    /// Key not found in dictionary
    #[error("KeyError: key {0} not found")]
    KeyError(String),

    /// Positional arithmetic between arrays of different lengths
    #[error("LengthMismatch: arrays have different lengths ({left} vs {right})")]
    LengthMismatch {
        /// Length of the left operand
        left: usize,
        /// Length of the right operand
        right: usize,
    },

    /// A slice step resolved to zero
    #[error("SliceStepZero: slice step cannot be zero")]
    SliceStepZero,

    /// NDArray extents incompatible for broadcasting
    #[error("BroadcastMismatch: incompatible extents {left} and {right} on axis {axis}")]
    BroadcastMismatch {
        /// Axis on which extents disagree
        axis: usize,
        /// Left extent
        left: u64,
        /// Right extent
        right: u64,
    },

    /// Matrix multiply with mismatched inner dimensions
    #[error("MatMulMismatch: inner dimensions do not match ({left} vs {right})")]
    MatMulMismatch {
        /// Inner extent of the left operand
        left: u64,
        /// Inner extent of the right operand
        right: u64,
    },

    /// Reshape to a shape with a different element count
    #[error("ShapeError: {0}")]
    ShapeError(String),

    /// Division by zero error
    #[error("DivideError: integer division by zero")]
    DivisionByZero,

    /// Reference to a name with no binding
    #[error("UnboundReference: no value bound to '{0}'")]
    UnboundReference(String),

    /// Error raised explicitly by the IR (`Die` node)
    #[error("UserError: {0}")]
    UserError(String),

    /// Operation the backend does not implement
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Malformed interchange data
    #[error("FormatError: {0}")]
    Format(String),

    /// I/O failure while persisting or loading values
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Create a type error
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::TypeError(msg.into())
    }

    /// Create a bounds error
    pub fn bounds_error(index: i64, length: usize) -> Self {
        RuntimeError::BoundsError { index, length }
    }

    /// Create a key error
    pub fn key_error<S: Into<String>>(key: S) -> Self {
        RuntimeError::KeyError(key.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported<S: Into<String>>(what: S) -> Self {
        RuntimeError::Unsupported(what.into())
    }

    /// Create a format error
    pub fn format_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::Format(msg.into())
    }

    /// Create a shape error
    pub fn shape_error<S: Into<String>>(msg: S) -> Self {
        RuntimeError::ShapeError(msg.into())
    }
}

/// Result type alias for backend operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::type_error("expected int32, got str");
        assert_eq!(format!("{}", err), "TypeError: expected int32, got str");

        let err = RuntimeError::bounds_error(10, 5);
        assert_eq!(
            format!("{}", err),
            "BoundsError: attempt to access index 10 of collection with length 5"
        );

        let err = RuntimeError::SliceStepZero;
        assert_eq!(format!("{}", err), "SliceStepZero: slice step cannot be zero");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RuntimeError = io.into();
        assert!(matches!(err, RuntimeError::Io(_)));
    }
}
