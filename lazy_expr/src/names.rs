//! Fresh-name generation for bound variables
//!
//! Lambda-like constructs (`map`, `filter`, `fold`, ...) bind a variable in
//! their body. Each binding needs a name that cannot collide with any other
//! name in the same tree. A `NameGenerator` is owned by a `Builder` and
//! shared, via `Arc`, by every expression built from it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe source of unique identifiers
#[derive(Debug)]
pub struct NameGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl NameGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Mint a new name of the form `{prefix}_{n}`, with `n` starting at 1
    pub fn fresh(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{}", self.prefix, n)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of names minted so far
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new("__uid")
    }
}
