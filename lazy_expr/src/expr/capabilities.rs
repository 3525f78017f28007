//! Optional façade capabilities.
//!
//! The dispatcher decorates a base façade with the capabilities its type
//! supports instead of picking from a fixed class hierarchy:
//!
//! - `WithNumericOps<T>`: arithmetic and ordering, for numeric arrays and
//!   numeric ndarrays (numeric scalars implement `NumericOps` directly)
//! - `WithFieldProjection<T>`: `get_field` mapped through every level of a
//!   nested array/set of structs
//!
//! Both wrappers deref to the base façade, so its own operations stay
//! available.

use std::ops::Deref;

use lazy_expr_runtime::{BinOp, CompOp};

use super::collection::map_elements;
use super::numeric;
use super::{construct, ExprLike, Expression, ToExpr, TypedExpr};
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

/// Façade decorated with numeric operators
#[derive(Debug, Clone, PartialEq)]
pub struct WithNumericOps<T>(T);

impl<T> WithNumericOps<T> {
    pub(crate) fn new(inner: T) -> Self {
        WithNumericOps(inner)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for WithNumericOps<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ExprLike> ExprLike for WithNumericOps<T> {
    fn expr(&self) -> &Expression {
        self.0.expr()
    }
}

/// Façade decorated with field projection
#[derive(Debug, Clone, PartialEq)]
pub struct WithFieldProjection<T>(T);

impl<T> WithFieldProjection<T> {
    pub(crate) fn new(inner: T) -> Self {
        WithFieldProjection(inner)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for WithFieldProjection<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ExprLike> ExprLike for WithFieldProjection<T> {
    fn expr(&self) -> &Expression {
        self.0.expr()
    }
}

/// Arithmetic and ordering shared by numeric scalars, arrays and ndarrays
///
/// Operands of different numeric types are promoted to their least upper
/// bound first. Scalars combine with arrays and ndarrays elementwise, arrays
/// combine positionally, and ndarrays of different rank broadcast.
pub trait NumericOps: ExprLike {
    fn add(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary(self.expr(), other, BinOp::Add)
    }

    fn sub(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary(self.expr(), other, BinOp::Sub)
    }

    fn mul(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary(self.expr(), other, BinOp::Mul)
    }

    /// True division; integer operands give float32
    fn div(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary(self.expr(), other, BinOp::Div)
    }

    fn floor_div(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary(self.expr(), other, BinOp::FloorDiv)
    }

    fn rem(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary(self.expr(), other, BinOp::Mod)
    }

    /// Exponentiation; always float64
    fn pow(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary(self.expr(), other, BinOp::Pow)
    }

    fn neg(&self) -> ExprResult<TypedExpr> {
        numeric::negate(self.expr())
    }

    fn lt(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::comparison(self.expr(), other, CompOp::Lt)
    }

    fn le(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::comparison(self.expr(), other, CompOp::Le)
    }

    fn gt(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::comparison(self.expr(), other, CompOp::Gt)
    }

    fn ge(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::comparison(self.expr(), other, CompOp::Ge)
    }

    // Reversed forms: `other <op> self`

    fn radd(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary_reversed(self.expr(), other, BinOp::Add)
    }

    fn rsub(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary_reversed(self.expr(), other, BinOp::Sub)
    }

    fn rmul(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary_reversed(self.expr(), other, BinOp::Mul)
    }

    fn rdiv(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary_reversed(self.expr(), other, BinOp::Div)
    }

    fn rfloor_div(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary_reversed(self.expr(), other, BinOp::FloorDiv)
    }

    fn rrem(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary_reversed(self.expr(), other, BinOp::Mod)
    }

    fn rpow(&self, other: impl ToExpr) -> ExprResult<TypedExpr>
    where
        Self: Sized,
    {
        numeric::binary_reversed(self.expr(), other, BinOp::Pow)
    }
}

impl<T: ExprLike> NumericOps for WithNumericOps<T> {}

/// Field access through structs and nested collections of structs
pub trait FieldProjection: ExprLike {
    /// `s.name` for a struct; for a (nested) array or set of structs, the
    /// same container shape holding `name` of every struct
    fn get_field(&self, name: &str) -> ExprResult<TypedExpr> {
        construct(project_field(self.expr(), name)?)
    }
}

impl<T: ExprLike> FieldProjection for WithFieldProjection<T> {}

/// Project `name` out of a struct, mapping through arrays and sets
pub(crate) fn project_field(expr: &Expression, name: &str) -> ExprResult<Expression> {
    match expr.dtype() {
        ExprType::Struct(fields) => {
            let typ = fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t.clone())
                .ok_or_else(|| ExprError::field_not_found(name, fields.iter().map(|(n, _)| n)))?;
            Ok(expr.derive(Ir::get_field(expr.ir().clone(), name), typ))
        }
        ExprType::Array(_) | ExprType::Set(_) => {
            map_elements(expr, |elem| project_field(&elem, name))
        }
        other => Err(ExprError::expected("struct or collection of structs", other)),
    }
}
