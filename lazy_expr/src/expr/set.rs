//! Set-only operations.

use super::collection::SetKind;
use super::{
    ArrayExpr, BooleanExpr, CollectionExpr, ExprLike, Expression, NumericExpr, SetExpr, ToExpr,
};
use crate::error::{ExprError, ExprResult};
use crate::types::ExprType;

impl CollectionExpr<SetKind> {
    fn with_item(&self, name: &str, item: impl ToExpr) -> ExprResult<SetExpr> {
        let item = self.coerce_item(item, "an item")?;
        Ok(CollectionExpr::wrap(self.expr().method(
            name,
            self.dtype().clone(),
            vec![item],
        )?))
    }

    /// Other set, which must have exactly this element type
    fn same_set(&self, other: impl ToExpr, op: &str) -> ExprResult<Expression> {
        let other = other.to_expr(self.ctx());
        if other.dtype() != self.dtype() {
            return Err(ExprError::type_mismatch(format!(
                "{}: expected '{}', found '{}'",
                op,
                self.dtype(),
                other.dtype()
            )));
        }
        Ok(other)
    }

    fn set_op(&self, name: &str, other: impl ToExpr) -> ExprResult<SetExpr> {
        let other = self.same_set(other, name)?;
        Ok(CollectionExpr::wrap(self.expr().method(
            name,
            self.dtype().clone(),
            vec![other],
        )?))
    }

    /// This set with `item` added
    pub fn add(&self, item: impl ToExpr) -> ExprResult<SetExpr> {
        self.with_item("add", item)
    }

    /// This set without `item`
    pub fn remove(&self, item: impl ToExpr) -> ExprResult<SetExpr> {
        self.with_item("remove", item)
    }

    /// Elements of this set not in `other`
    pub fn difference(&self, other: impl ToExpr) -> ExprResult<SetExpr> {
        self.set_op("difference", other)
    }

    pub fn intersection(&self, other: impl ToExpr) -> ExprResult<SetExpr> {
        self.set_op("intersection", other)
    }

    pub fn union(&self, other: impl ToExpr) -> ExprResult<SetExpr> {
        self.set_op("union", other)
    }

    /// True if every element of this set is in `other`
    pub fn is_subset(&self, other: impl ToExpr) -> ExprResult<BooleanExpr> {
        let other = self.same_set(other, "isSubset")?;
        Ok(BooleanExpr::wrap(self.expr().method(
            "isSubset",
            ExprType::Bool,
            vec![other],
        )?))
    }

    pub fn size(&self) -> NumericExpr {
        self.length()
    }

    /// Elements in ascending order
    pub fn to_array(&self) -> ArrayExpr {
        CollectionExpr::wrap(self.as_array())
    }
}
