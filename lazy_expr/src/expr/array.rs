//! Array-only operations.

use lazy_expr_runtime::CompOp;

use super::collection::ArrayKind;
use super::index::{Bound, Slice};
use super::{
    construct, ArrayExpr, CollectionExpr, ExprLike, Expression, SetExpr, ToExpr, TypedExpr,
};
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

impl CollectionExpr<ArrayKind> {
    /// Element at an int32 index; negative indices count from the end
    pub fn index(&self, i: impl Into<Bound>) -> ExprResult<TypedExpr> {
        let i = i.into().to_index_expr(self.ctx(), &ExprType::Int32)?;
        let ir = Ir::ArrayRef {
            array: Box::new(self.ir().clone()),
            index: Box::new(i.ir().clone()),
        };
        construct(Expression::combine(
            self.ctx(),
            ir,
            self.element_type().clone(),
            &[self.expr(), &i],
        )?)
    }

    /// Sub-array selected by a slice
    ///
    /// An absent start is the first element in iteration order (0 for a
    /// positive step, -1 for a negative one); an absent stop runs to the end.
    pub fn slice(&self, slice: Slice) -> ExprResult<TypedExpr> {
        let ctx = self.ctx();
        let step = match slice.step {
            Some(b) => b.to_index_expr(ctx, &ExprType::Int32)?,
            None => 1i32.to_expr(ctx),
        };
        let start = match slice.start {
            Some(b) => b.to_index_expr(ctx, &ExprType::Int32)?,
            None => step.derive(
                Ir::if_(
                    Ir::compare(CompOp::Ge, step.ir().clone(), Ir::I32(0)),
                    Ir::I32(0),
                    Ir::I32(-1),
                ),
                ExprType::Int32,
            ),
        };
        let stop = slice
            .stop
            .map(|b| b.to_index_expr(ctx, &ExprType::Int32))
            .transpose()?;

        let ir = Ir::ArraySlice {
            array: Box::new(self.ir().clone()),
            start: Box::new(start.ir().clone()),
            stop: stop.as_ref().map(|s| Box::new(s.ir().clone())),
            step: Box::new(step.ir().clone()),
        };
        let mut parts = vec![self.expr(), &start, &step];
        if let Some(stop) = &stop {
            parts.push(stop);
        }
        construct(Expression::combine(
            ctx,
            ir,
            self.dtype().clone(),
            &parts,
        )?)
    }

    /// First element, missing when empty
    pub fn head(&self) -> ExprResult<TypedExpr> {
        let uid = self.ctx().fresh();
        let elem = self.element_type().clone();
        let a = Ir::reference(uid.clone(), self.dtype().clone());
        let non_empty = Ir::compare(CompOp::Gt, Ir::ArrayLen(Box::new(a.clone())), Ir::I32(0));
        let first = Ir::ArrayRef {
            array: Box::new(a),
            index: Box::new(Ir::I32(0)),
        };
        let ir = Ir::let_(
            uid,
            self.ir().clone(),
            Ir::if_(non_empty, first, Ir::NA(elem.clone())),
        );
        construct(self.expr().derive(ir, elem))
    }

    /// `range(0, len).filter(pred).head()` with the array bound once
    fn first_position<F>(&self, pred: F) -> ExprResult<TypedExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<Expression>,
    {
        let uid = self.ctx().fresh();
        let bound: ArrayExpr = CollectionExpr::wrap(self.expr().variable(&uid, self.dtype().clone()));
        let range = bound.expr().derive(
            Ir::ArrayRange {
                start: Box::new(Ir::I32(0)),
                stop: Box::new(Ir::ArrayLen(Box::new(bound.ir().clone()))),
                step: Box::new(Ir::I32(1)),
            },
            ExprType::array(ExprType::Int32),
        );
        let found = CollectionExpr::<ArrayKind>::wrap(range)
            .filter(|i| pred(bound.index(Bound::Expr(i.into_expression()))?))?
            .into_array()?
            .head()?
            .into_expression();
        let ir = Ir::let_(uid, self.ir().clone(), found.ir().clone());
        construct(Expression::combine(
            self.ctx(),
            ir,
            ExprType::Int32,
            &[self.expr(), &found],
        )?)
    }

    /// Position of the first element equal to `value`, missing if absent
    pub fn index_of(&self, value: impl ToExpr) -> ExprResult<TypedExpr> {
        let value = value.to_expr(self.ctx());
        self.first_position(|x| Ok(x.equals(value)?.into_expression()))
    }

    /// Position of the first element satisfying `f`, missing if none does
    pub fn index_where<F, R>(&self, f: F) -> ExprResult<TypedExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let ctx = std::sync::Arc::clone(self.ctx());
        self.first_position(|x| Ok(f(x)?.to_expr(&ctx)))
    }

    fn same_type_method(&self, name: &str, arg: Expression) -> ExprResult<TypedExpr> {
        construct(self.expr().method(name, self.dtype().clone(), vec![arg])?)
    }

    /// New array with `item` at the end; `item` must have the element type
    pub fn append(&self, item: impl ToExpr) -> ExprResult<TypedExpr> {
        let item = item.to_expr(self.ctx());
        if item.dtype() != self.element_type() {
            return Err(ExprError::type_mismatch(format!(
                "cannot append '{}' to an array of '{}'",
                item.dtype(),
                self.element_type()
            )));
        }
        self.same_type_method("append", item)
    }

    /// Concatenation with an array of the same type
    pub fn extend(&self, other: impl ToExpr) -> ExprResult<TypedExpr> {
        let other = other.to_expr(self.ctx());
        if other.dtype() != self.dtype() {
            return Err(ExprError::type_mismatch(format!(
                "cannot extend '{}' with '{}'",
                self.dtype(),
                other.dtype()
            )));
        }
        self.same_type_method("extend", other)
    }

    /// Running fold: the zero followed by every intermediate accumulator
    pub fn scan<F, R, Z>(&self, f: F, zero: Z) -> ExprResult<TypedExpr>
    where
        F: Fn(TypedExpr, TypedExpr) -> ExprResult<R>,
        R: ToExpr,
        Z: ToExpr,
    {
        let zero = zero.to_expr(self.ctx());
        let folded = self.reconcile("scan", &f, zero)?;
        let typ = ExprType::array(folded.zero.dtype().clone());
        let ir = Ir::ArrayScan {
            array: Box::new(self.ir().clone()),
            zero: Box::new(folded.zero.ir().clone()),
            accum_name: folded.accum_name,
            value_name: folded.value_name,
            body: Box::new(folded.body.ir().clone()),
        };
        construct(Expression::combine(
            self.ctx(),
            ir,
            typ,
            &[self.expr(), &folded.zero, &folded.body],
        )?)
    }

    pub fn to_set(&self) -> SetExpr {
        CollectionExpr::wrap(self.expr().derive(
            Ir::ToSet(Box::new(self.ir().clone())),
            ExprType::set(self.element_type().clone()),
        ))
    }
}
