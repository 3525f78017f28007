//! Coercion lattice.
//!
//! Numeric types promote along int32 < int64 < float32 < float64. Booleans,
//! strings, calls, loci and intervals coerce only to themselves. Containers,
//! structs, tuples and ndarrays coerce part by part when every part does.
//!
//! # Module Organization
//!
//! - `coercer.rs`: `Coercer` and the process-wide coercer cache
//! - `unify.rs`: `unify_types`, the least upper bound of two types

mod coercer;
mod unify;

pub use coercer::{coercer_for, Coercer};
pub use unify::{unify_many, unify_types};
