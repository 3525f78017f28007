//! Construction-time errors
//!
//! Every failure raised while an expression tree is being built. These are
//! detected synchronously from types and context metadata alone; failures
//! that depend on data are reported by a backend as `RuntimeError` and
//! surface here through `ExprError::Execution`.

use lazy_expr_runtime::RuntimeError;
use thiserror::Error;

use crate::types::ExprType;

/// Construction error type
#[derive(Debug, Error)]
pub enum ExprError {
    /// Operand type not coercible to the required type
    #[error("TypeMismatch: {0}")]
    TypeMismatch(String),

    /// Two operands anchored to incompatible source axes
    #[error("ContextUnification: cannot combine expressions from {left} and {right}")]
    ContextUnification {
        /// Axes of the first operand
        left: String,
        /// Axes of the conflicting operand
        right: String,
    },

    /// Aggregated expression used outside its aggregation scope
    #[error("AggregationScope: {0}")]
    AggregationScope(String),

    /// Struct field lookup by an unknown name
    #[error("FieldNotFound: struct has no field '{name}'; fields are [{available}]")]
    FieldNotFound {
        /// Requested field name
        name: String,
        /// Comma-separated field names that do exist
        available: String,
    },

    /// Field name given twice, or selected and assigned at once
    #[error("DuplicateField: {0}")]
    DuplicateField(String),

    /// Invalid axis list, non-permutation transpose axes, rank-0 matmul operand
    #[error("ShapeError: {0}")]
    Shape(String),

    /// The dispatcher cannot wrap the given type
    #[error("UnsupportedType: {0}")]
    UnsupportedType(String),

    /// Statically known index outside a fixed-size container
    #[error("IndexOutOfBounds: index {index} out of range for {what} of length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Container description
        what: String,
        /// Container length
        length: usize,
    },

    /// Malformed type notation
    #[error("InvalidTypeString: cannot parse '{0}'")]
    InvalidTypeString(String),

    /// Malformed builder configuration
    #[error("ConfigError: {0}")]
    Config(String),

    /// Evaluation failed in the backend
    #[error(transparent)]
    Execution(#[from] RuntimeError),
}

impl ExprError {
    /// Create a type mismatch error
    pub fn type_mismatch<S: Into<String>>(msg: S) -> Self {
        ExprError::TypeMismatch(msg.into())
    }

    /// Create a type mismatch error for an expected/found pair
    pub fn expected(what: &str, found: &ExprType) -> Self {
        ExprError::TypeMismatch(format!("expected {}, found '{}'", what, found))
    }

    /// Create a field-not-found error listing the available names
    pub fn field_not_found<'a>(
        name: &str,
        available: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        ExprError::FieldNotFound {
            name: name.to_string(),
            available: available
                .into_iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Create a duplicate field error
    pub fn duplicate_field<S: Into<String>>(msg: S) -> Self {
        ExprError::DuplicateField(msg.into())
    }

    /// Create a shape error
    pub fn shape<S: Into<String>>(msg: S) -> Self {
        ExprError::Shape(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ExprError::Config(msg.into())
    }
}

/// Result type alias for expression construction
pub type ExprResult<T> = Result<T, ExprError>;
