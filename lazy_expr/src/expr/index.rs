//! Index and slice arguments.
//!
//! Positions can be literals or integer expressions. Literal bounds become
//! literal nodes of the integer type the container expects (int32 for
//! arrays and strings, int64 for ndarrays).

use std::sync::Arc;

use super::{BuildContext, ExprLike, Expression, NumericExpr};
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

/// One position: a literal or an integer expression
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Literal(i64),
    Expr(Expression),
}

impl From<i64> for Bound {
    fn from(v: i64) -> Self {
        Bound::Literal(v)
    }
}

impl From<i32> for Bound {
    fn from(v: i32) -> Self {
        Bound::Literal(i64::from(v))
    }
}

impl From<Expression> for Bound {
    fn from(e: Expression) -> Self {
        Bound::Expr(e)
    }
}

impl From<NumericExpr> for Bound {
    fn from(e: NumericExpr) -> Self {
        Bound::Expr(e.into_expression())
    }
}

impl From<&NumericExpr> for Bound {
    fn from(e: &NumericExpr) -> Self {
        Bound::Expr(e.to_expression())
    }
}

impl Bound {
    /// Expression of integer type `target` for this position
    ///
    /// Literals must fit `target`; expressions must be integral and
    /// promote to `target` without narrowing.
    pub(crate) fn to_index_expr(
        self,
        ctx: &Arc<BuildContext>,
        target: &ExprType,
    ) -> ExprResult<Expression> {
        match self {
            Bound::Literal(v) => match target {
                ExprType::Int32 => {
                    let v = i32::try_from(v).map_err(|_| {
                        ExprError::type_mismatch(format!("index {} does not fit in int32", v))
                    })?;
                    Ok(Expression::literal(ctx, Ir::I32(v), ExprType::Int32))
                }
                _ => Ok(Expression::literal(ctx, Ir::I64(v), ExprType::Int64)),
            },
            Bound::Expr(e) => {
                let fits = e.dtype().is_integral()
                    && e.dtype().numeric_rank() <= target.numeric_rank();
                if !fits {
                    return Err(ExprError::expected(
                        &format!("index of type '{}'", target),
                        e.dtype(),
                    ));
                }
                e.coerce_to(target)
            }
        }
    }
}

/// `start:stop:step` slice; absent bounds take their defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slice {
    pub start: Option<Bound>,
    pub stop: Option<Bound>,
    pub step: Option<Bound>,
}

impl Slice {
    /// `[:]`
    pub fn full() -> Self {
        Self::default()
    }

    /// `[start:stop]`
    pub fn range(start: impl Into<Bound>, stop: impl Into<Bound>) -> Self {
        Slice {
            start: Some(start.into()),
            stop: Some(stop.into()),
            step: None,
        }
    }

    /// `[start:stop:step]`
    pub fn new(start: impl Into<Bound>, stop: impl Into<Bound>, step: impl Into<Bound>) -> Self {
        Slice {
            start: Some(start.into()),
            stop: Some(stop.into()),
            step: Some(step.into()),
        }
    }

    pub fn with_start(mut self, start: impl Into<Bound>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_stop(mut self, stop: impl Into<Bound>) -> Self {
        self.stop = Some(stop.into());
        self
    }

    pub fn with_step(mut self, step: impl Into<Bound>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// One entry of an ndarray index: drops the axis (`At`) or keeps it
#[derive(Debug, Clone, PartialEq)]
pub enum NDIndex {
    At(Bound),
    Slice(Slice),
}

impl From<i64> for NDIndex {
    fn from(v: i64) -> Self {
        NDIndex::At(Bound::Literal(v))
    }
}

impl From<i32> for NDIndex {
    fn from(v: i32) -> Self {
        NDIndex::At(Bound::from(v))
    }
}

impl From<Bound> for NDIndex {
    fn from(b: Bound) -> Self {
        NDIndex::At(b)
    }
}

impl From<Slice> for NDIndex {
    fn from(s: Slice) -> Self {
        NDIndex::Slice(s)
    }
}
