//! lazy_expr
//!
//! A typed, lazily evaluated expression language that lowers to an
//! immutable IR tree for an external engine.
//!
//! Expressions are built from a [`Builder`]. Every operation checks its
//! operand types and context (source axes and aggregation scopes) at
//! construction time and returns a new expression; nothing is evaluated
//! until the tree is handed to a [`Backend`]:
//!
//! ```ignore
//! use lazy_expr::prelude::*;
//!
//! let b = Builder::new();
//! let xs = b.array([1i32, 2, 3])?.into_array()?;
//! let total = xs.fold(|acc, x| acc.into_numeric()?.add(x), 0i64)?;
//! assert_eq!(total.eval(&Interpreter::new())?, Value::I64(6));
//! ```
//!
//! # Module Organization
//!
//! - `types`: the type lattice and its textual notation
//! - `ir`: IR nodes, their typing rules and rendering
//! - `context`: source axes and aggregation scopes
//! - `coercion`: type unification and implicit conversions
//! - `expr`: the builder and the typed façades
//! - `eval`: the backend boundary and the reference interpreter
//! - `config`, `names`, `diagnostics`, `error`: supporting pieces

// Library code reports through tracing, never straight to the terminal.
#![deny(clippy::print_stderr)]

pub mod coercion;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod expr;
pub mod ir;
pub mod names;
pub mod types;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use lazy_expr::prelude::*;
/// ```
pub mod prelude {
    pub use super::config::BuilderConfig;
    pub use super::context::{Aggregation, Aggregations, Axis, Indices};
    pub use super::error::{ExprError, ExprResult};
    pub use super::eval::{Backend, Handoff, Interpreter};
    pub use super::expr::{
        ArrayExpr, BooleanExpr, Bound, Builder, CallExpr, DictExpr, ExprLike, Expression,
        FieldProjection, IntervalExpr, LocusExpr, NDArrayExpr, NDIndex, NumericExpr, NumericOps,
        SetExpr, Slice, StringExpr, StructExpr, ToExpr, TupleExpr, TypedExpr,
    };
    pub use super::ir::Ir;
    pub use super::types::{ExprType, TypeTag};
    pub use lazy_expr_runtime::{NDArrayValue, RuntimeError, Value};
}

pub use prelude::*;
