//! IR node set.
//!
//! The immutable tree handed to an execution engine. Nodes own their
//! children, are never mutated after construction, and carry enough type
//! information for `infer_type` to work without an environment.
//!
//! # Module Organization
//!
//! - `node.rs`: The `Ir` enum, constructor helpers and tree walking
//! - `typing.rs`: Per-node typing rules (`Ir::infer_type`)
//! - `display.rs`: S-expression rendering
//! - `dedup.rs`: `InsertFields` construction with source hoisting
//! - `tests.rs`: Tests

mod dedup;
mod display;
mod node;
mod typing;
#[cfg(test)]
mod tests;

pub use node::Ir;
pub(crate) use typing::matmul_ndim;
