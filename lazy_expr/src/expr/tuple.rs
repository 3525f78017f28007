//! Tuple façade.

use super::{construct, make_tuple, ExprLike, Expression, TypedExpr};
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

facade! {
    /// Expression of type `tuple(...)`
    TupleExpr
}

impl TupleExpr {
    pub fn types(&self) -> &[ExprType] {
        match self.0.dtype() {
            ExprType::Tuple(types) => types,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.types().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types().is_empty()
    }

    /// Normalize a possibly negative position
    fn position(&self, i: i64) -> ExprResult<usize> {
        let len = self.len();
        let resolved = if i < 0 { i + len as i64 } else { i };
        if resolved < 0 || resolved >= len as i64 {
            return Err(ExprError::IndexOutOfBounds {
                index: i,
                what: "tuple".to_string(),
                length: len,
            });
        }
        Ok(resolved as usize)
    }

    fn element(&self, of: &Expression, idx: usize) -> Expression {
        of.derive(
            Ir::get_tuple_element(of.ir().clone(), idx),
            self.types()[idx].clone(),
        )
    }

    /// Element at a position known at construction; negative counts from
    /// the end
    pub fn get(&self, i: i64) -> ExprResult<TypedExpr> {
        let idx = self.position(i)?;
        construct(self.element(&self.0, idx))
    }

    /// Tuple of the elements in `start..stop`, with out-of-range bounds clamped
    pub fn slice(&self, start: Option<i64>, stop: Option<i64>) -> ExprResult<TupleExpr> {
        let len = self.len() as i64;
        let clamp = |b: i64| if b < 0 { (b + len).max(0) } else { b.min(len) };
        let start = start.map_or(0, clamp);
        let stop = stop.map_or(len, clamp);
        if start >= stop {
            return Ok(TupleExpr(
                self.0.derive(Ir::MakeTuple(Vec::new()), ExprType::Tuple(Vec::new())),
            ));
        }

        let uid = self.0.context().fresh();
        let bound = self.0.variable(&uid, self.0.dtype().clone());
        let items = (start as usize..stop as usize)
            .map(|i| self.element(&bound, i))
            .collect();
        let made = make_tuple(self.0.context(), items)?;
        let typ = made.dtype().clone();
        Ok(TupleExpr(self.0.derive(
            Ir::let_(uid, self.0.ir().clone(), made.into_ir()),
            typ,
        )))
    }
}
