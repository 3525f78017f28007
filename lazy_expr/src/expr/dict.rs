//! Dict façade.

use std::sync::Arc;

use super::{
    construct, make_tuple, ArrayExpr, BooleanExpr, CollectionExpr, ExprLike, Expression,
    NumericExpr, SetExpr, ToExpr, TypedExpr,
};
use crate::coercion::coercer_for;
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

facade! {
    /// Expression of type `dict<K, V>`
    DictExpr
}

impl DictExpr {
    pub fn key_type(&self) -> &ExprType {
        match self.0.dtype() {
            ExprType::Dict(k, _) => k,
            other => other,
        }
    }

    pub fn value_type(&self) -> &ExprType {
        match self.0.dtype() {
            ExprType::Dict(_, v) => v,
            other => other,
        }
    }

    fn coerce_to_part(&self, x: impl ToExpr, target: &ExprType, what: &str) -> ExprResult<Expression> {
        let x = x.to_expr(self.0.context());
        if !coercer_for(target).can_coerce(x.dtype()) {
            return Err(ExprError::type_mismatch(format!(
                "dict {} must be coercible to '{}', found '{}'",
                what,
                target,
                x.dtype()
            )));
        }
        x.coerce_to(target)
    }

    fn key(&self, key: impl ToExpr) -> ExprResult<Expression> {
        let target = self.key_type().clone();
        self.coerce_to_part(key, &target, "key")
    }

    /// Value at `key`; evaluation fails if the key is absent
    pub fn get_item(&self, key: impl ToExpr) -> ExprResult<TypedExpr> {
        let key = self.key(key)?;
        construct(self.0.method("index", self.value_type().clone(), vec![key])?)
    }

    pub fn contains(&self, key: impl ToExpr) -> ExprResult<BooleanExpr> {
        let key = self.key(key)?;
        Ok(BooleanExpr::wrap(self.0.method(
            "contains",
            ExprType::Bool,
            vec![key],
        )?))
    }

    /// Value at `key`, missing if absent
    pub fn get(&self, key: impl ToExpr) -> ExprResult<TypedExpr> {
        let key = self.key(key)?;
        construct(self.0.method("get", self.value_type().clone(), vec![key])?)
    }

    /// Value at `key`, or `default` if absent
    pub fn get_or(&self, key: impl ToExpr, default: impl ToExpr) -> ExprResult<TypedExpr> {
        let key = self.key(key)?;
        let value_type = self.value_type().clone();
        let default = self.coerce_to_part(default, &value_type, "default value")?;
        construct(self.0.method("get", value_type, vec![key, default])?)
    }

    pub fn key_set(&self) -> ExprResult<SetExpr> {
        let typ = ExprType::set(self.key_type().clone());
        Ok(CollectionExpr::wrap(self.0.method("keySet", typ, vec![])?))
    }

    /// Keys in ascending order
    pub fn keys(&self) -> ExprResult<ArrayExpr> {
        let typ = ExprType::array(self.key_type().clone());
        Ok(CollectionExpr::wrap(self.0.method("keys", typ, vec![])?))
    }

    /// Values in ascending order of their keys
    pub fn values(&self) -> ExprResult<ArrayExpr> {
        let typ = ExprType::array(self.value_type().clone());
        Ok(CollectionExpr::wrap(self.0.method("values", typ, vec![])?))
    }

    /// Apply `f` to every value, keeping the keys
    pub fn map_values<F, R>(&self, f: F) -> ExprResult<DictExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let ctx = Arc::clone(self.0.context());
        let uid = ctx.fresh();
        let pair = ExprType::tuple([self.key_type().clone(), self.value_type().clone()]);
        let entry = self.0.variable(&uid, pair);
        let key = entry.derive(
            Ir::get_tuple_element(entry.ir().clone(), 0),
            self.key_type().clone(),
        );
        let value = entry.derive(
            Ir::get_tuple_element(entry.ir().clone(), 1),
            self.value_type().clone(),
        );
        let body = f(value.typed()?)?.to_expr(&ctx);
        let new_value = body.dtype().clone();
        let mapped = make_tuple(&ctx, vec![key, body])?;
        let ir = Ir::ToDict(Box::new(Ir::array_map(
            Ir::ToArray(Box::new(self.0.ir().clone())),
            uid,
            mapped.ir().clone(),
        )));
        let typ = ExprType::dict(self.key_type().clone(), new_value);
        Ok(DictExpr(Expression::combine(&ctx, ir, typ, &[&self.0, &mapped])?))
    }

    /// Number of entries
    pub fn size(&self) -> NumericExpr {
        NumericExpr::wrap(self.0.derive(
            Ir::ArrayLen(Box::new(Ir::ToArray(Box::new(self.0.ir().clone())))),
            ExprType::Int32,
        ))
    }
}
