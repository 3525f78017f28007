//! lazy_expr runtime library
//!
//! The engine side of the IR hand-off. This crate knows nothing about IR
//! nodes; it provides what an execution backend needs to produce values:
//!
//! - `Value` enum, the materialized counterpart of every expression type
//! - `RuntimeError` for deferred (evaluation-time) failures
//! - `NDArrayValue` and the NPY interchange format
//! - Scalar operator dispatch
//! - String intrinsics
//! - Numeric cast utilities

pub mod array;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod intrinsics;
pub mod value;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use lazy_expr_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use super::array::NDArrayValue;
    pub use super::convert::{cast, ScalarKind};
    pub use super::dispatch::{dynamic_binop, dynamic_compare, dynamic_unop, BinOp, CompOp, UnaryOp};
    pub use super::error::{RuntimeError, RuntimeResult};
    pub use super::value::Value;
}

pub use prelude::*;
