//! Context tracking for expressions.
//!
//! Every expression carries two pieces of metadata besides its IR and type:
//!
//! - `Indices`: the source axes (row, column, ...) the value depends on.
//!   Two expressions may be combined only if their axis sets unify: one is
//!   empty, or both are equal.
//! - `Aggregations`: the stack of aggregation scopes the expression was built
//!   inside, outermost first. An aggregated value may only be used where the
//!   enclosing scope extends its stack.
//!
//! Both are checked while the tree is built, never during evaluation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExprError, ExprResult};

/// Identifier of a source axis
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Axis(String);

impl Axis {
    pub fn new(name: impl Into<String>) -> Self {
        Axis(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of source axes an expression is anchored to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Indices {
    axes: BTreeSet<Axis>,
}

impl Indices {
    /// Global context: no axes
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I, S>(axes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            axes: axes.into_iter().map(Axis::new).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn axes(&self) -> impl Iterator<Item = &Axis> {
        self.axes.iter()
    }

    pub fn contains(&self, axis: &str) -> bool {
        self.axes.iter().any(|a| a.name() == axis)
    }

    /// Unify two axis sets: empty unifies with anything, otherwise equal sets
    pub fn unify(&self, other: &Indices) -> ExprResult<Indices> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() || self == other {
            return Ok(self.clone());
        }
        Err(ExprError::ContextUnification {
            left: self.to_string(),
            right: other.to_string(),
        })
    }
}

impl fmt::Display for Indices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{global}}");
        }
        let names: Vec<&str> = self.axes.iter().map(Axis::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Marker for one aggregation scope
///
/// Markers are identified by `id`, which is minted fresh for every
/// aggregation, so two aggregations over the same axes remain distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregation {
    /// Unique identifier of this scope
    pub id: String,
    /// Aggregator name
    pub op: String,
    /// Axes of the aggregated operand
    pub indices: Indices,
}

/// Ordered stack of aggregation scopes, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregations {
    stack: Vec<Aggregation>,
}

impl Aggregations {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Aggregation> {
        self.stack.iter()
    }

    /// New stack with `marker` pushed innermost
    pub fn push(&self, marker: Aggregation) -> Aggregations {
        let mut stack = self.stack.clone();
        stack.push(marker);
        Aggregations { stack }
    }

    /// Concatenate, keeping the first occurrence of each marker
    pub fn merge(&self, other: &Aggregations) -> Aggregations {
        let mut stack = self.stack.clone();
        for marker in &other.stack {
            if !stack.contains(marker) {
                stack.push(marker.clone());
            }
        }
        Aggregations { stack }
    }

    /// True if this stack is a prefix of `enclosing`
    pub fn is_prefix_of(&self, enclosing: &Aggregations) -> bool {
        self.stack.len() <= enclosing.stack.len()
            && self.stack.iter().zip(&enclosing.stack).all(|(a, b)| a == b)
    }

    /// Fail unless this stack may be used inside `enclosing`
    pub fn check_scope(&self, enclosing: &Aggregations) -> ExprResult<()> {
        if self.is_prefix_of(enclosing) {
            return Ok(());
        }
        let ops: Vec<&str> = self.stack.iter().map(|a| a.op.as_str()).collect();
        Err(ExprError::AggregationScope(format!(
            "expression built inside aggregation [{}] used outside that aggregation",
            ops.join(" > ")
        )))
    }
}

/// Unify the context of every operand of one construction
///
/// Returns the union of all axis sets and the concatenation (without
/// duplicates) of all scope stacks. Fails if any two non-empty axis sets
/// differ.
pub fn unify_all<'a, I>(parts: I) -> ExprResult<(Indices, Aggregations)>
where
    I: IntoIterator<Item = (&'a Indices, &'a Aggregations)>,
{
    let mut indices = Indices::empty();
    let mut aggregations = Aggregations::empty();
    for (i, a) in parts {
        indices = indices.unify(i)?;
        aggregations = aggregations.merge(a);
    }
    Ok((indices, aggregations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str) -> Aggregation {
        Aggregation {
            id: id.to_string(),
            op: "sum".to_string(),
            indices: Indices::new(["row"]),
        }
    }

    #[test]
    fn test_unify_rules() {
        let row = Indices::new(["row"]);
        let col = Indices::new(["column"]);
        let global = Indices::empty();

        assert_eq!(row.unify(&global).unwrap(), row);
        assert_eq!(global.unify(&row).unwrap(), row);
        assert_eq!(row.unify(&row).unwrap(), row);
        assert!(matches!(
            row.unify(&col),
            Err(ExprError::ContextUnification { .. })
        ));
    }

    #[test]
    fn test_unify_all_merges_stacks() {
        let a = Aggregations::empty().push(marker("a1"));
        let b = Aggregations::empty().push(marker("a1")).push(marker("a2"));
        let row = Indices::new(["row"]);
        let global = Indices::empty();

        let (indices, aggs) = unify_all([(&row, &a), (&global, &b)]).unwrap();
        assert_eq!(indices, row);
        let ids: Vec<&str> = aggs.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[test]
    fn test_check_scope_prefix() {
        let outer = Aggregations::empty().push(marker("a1"));
        let inner = outer.push(marker("a2"));

        assert!(Aggregations::empty().check_scope(&Aggregations::empty()).is_ok());
        assert!(outer.check_scope(&inner).is_ok());
        assert!(matches!(
            inner.check_scope(&outer),
            Err(ExprError::AggregationScope(_))
        ));
        assert!(outer.check_scope(&Aggregations::empty()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Indices::empty().to_string(), "{global}");
        assert_eq!(Indices::new(["row", "column"]).to_string(), "{column, row}");
    }
}
