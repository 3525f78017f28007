//! Numeric scalars and operator dispatch.
//!
//! Every arithmetic or ordering operator goes through `combine_numeric`,
//! which classifies each operand as a scalar, an array or an ndarray of
//! numbers, promotes both element types to their least upper bound, and
//! emits the node for that pair of shapes:
//!
//! ```text
//! scalar  op scalar   ApplyBinaryPrimOp / ApplyComparisonOp
//! array   op scalar   ArrayMap      (either side)
//! array   op array    ArrayZip      (length checked at evaluation)
//! ndarray op scalar   NDArrayMap    (either side)
//! ndarray op ndarray  NDArrayMap2   (lower rank broadcast first)
//! ```

use std::sync::Arc;

use lazy_expr_runtime::{BinOp, CompOp, UnaryOp};

use super::capabilities::NumericOps;
use super::ndarray::broadcast_to;
use super::{construct, ExprLike, Expression, ToExpr, TypedExpr};
use crate::coercion::unify_types;
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

facade! {
    /// Expression of type `int32`, `int64`, `float32` or `float64`
    NumericExpr
}

impl NumericOps for NumericExpr {}

/// Operator applied elementwise
#[derive(Debug, Clone, Copy)]
enum Op {
    Arith(BinOp),
    Compare(CompOp),
}

impl Op {
    fn result_element(self, unified: &ExprType) -> ExprType {
        match self {
            Op::Arith(BinOp::Div) if unified.is_integral() => ExprType::Float32,
            Op::Arith(BinOp::Pow) => ExprType::Float64,
            Op::Arith(_) => unified.clone(),
            Op::Compare(_) => ExprType::Bool,
        }
    }

    fn scalar_ir(self, left: Ir, right: Ir) -> Ir {
        match self {
            Op::Arith(op) => Ir::binary(op, left, right),
            Op::Compare(op) => Ir::compare(op, left, right),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Op::Arith(op) => op.as_str(),
            Op::Compare(op) => op.as_str(),
        }
    }
}

/// Shape class of a numeric operand
#[derive(Debug, Clone)]
enum Operand {
    Scalar(ExprType),
    Array(ExprType),
    NDArray(ExprType, usize),
}

impl Operand {
    fn classify(e: &Expression) -> ExprResult<Operand> {
        match e.dtype() {
            t if t.is_numeric() => Ok(Operand::Scalar(t.clone())),
            ExprType::Array(elem) if elem.is_numeric() => Ok(Operand::Array((**elem).clone())),
            ExprType::NDArray(elem, n) if elem.is_numeric() => {
                Ok(Operand::NDArray((**elem).clone(), *n))
            }
            other => Err(ExprError::expected(
                "numeric scalar, array or ndarray",
                other,
            )),
        }
    }

    fn element(&self) -> &ExprType {
        match self {
            Operand::Scalar(t) | Operand::Array(t) | Operand::NDArray(t, _) => t,
        }
    }

    /// This shape with element type `elem`
    fn with_element(&self, elem: ExprType) -> ExprType {
        match self {
            Operand::Scalar(_) => elem,
            Operand::Array(_) => ExprType::array(elem),
            Operand::NDArray(_, n) => ExprType::ndarray(elem, *n),
        }
    }
}

/// Fresh bound name for one element of `like`, and its reference
fn bind_element(like: &Expression, unified: &ExprType) -> (String, Ir) {
    let uid = like.context().fresh();
    let r = Ir::reference(uid.clone(), unified.clone());
    (uid, r)
}

fn combine_numeric(lhs: Expression, rhs: Expression, op: Op) -> ExprResult<TypedExpr> {
    let ls = Operand::classify(&lhs)?;
    let rs = Operand::classify(&rhs)?;
    let unified = unify_types(ls.element(), rs.element()).ok_or_else(|| {
        ExprError::type_mismatch(format!(
            "no operator {} for '{}' and '{}'",
            op.symbol(),
            lhs.dtype(),
            rhs.dtype()
        ))
    })?;
    let result_elem = op.result_element(&unified);
    let l = lhs.coerce_to(&ls.with_element(unified.clone()))?;
    let r = rhs.coerce_to(&rs.with_element(unified.clone()))?;
    let ctx = Arc::clone(l.context());

    let (ir, typ) = match (&ls, &rs) {
        (Operand::Scalar(_), Operand::Scalar(_)) => (
            op.scalar_ir(l.ir().clone(), r.ir().clone()),
            result_elem,
        ),
        (Operand::Array(_), Operand::Scalar(_)) => {
            let (uid, x) = bind_element(&l, &unified);
            let body = op.scalar_ir(x, r.ir().clone());
            (
                Ir::array_map(l.ir().clone(), uid, body),
                ExprType::array(result_elem),
            )
        }
        (Operand::Scalar(_), Operand::Array(_)) => {
            let (uid, x) = bind_element(&r, &unified);
            let body = op.scalar_ir(l.ir().clone(), x);
            (
                Ir::array_map(r.ir().clone(), uid, body),
                ExprType::array(result_elem),
            )
        }
        (Operand::Array(_), Operand::Array(_)) => {
            let (ln, lx) = bind_element(&l, &unified);
            let (rn, rx) = bind_element(&r, &unified);
            (
                Ir::ArrayZip {
                    left: Box::new(l.ir().clone()),
                    right: Box::new(r.ir().clone()),
                    left_name: ln,
                    right_name: rn,
                    body: Box::new(op.scalar_ir(lx, rx)),
                },
                ExprType::array(result_elem),
            )
        }
        (Operand::NDArray(_, n), Operand::Scalar(_)) => {
            let (uid, x) = bind_element(&l, &unified);
            (
                Ir::NDArrayMap {
                    nd: Box::new(l.ir().clone()),
                    name: uid,
                    body: Box::new(op.scalar_ir(x, r.ir().clone())),
                },
                ExprType::ndarray(result_elem, *n),
            )
        }
        (Operand::Scalar(_), Operand::NDArray(_, n)) => {
            let (uid, x) = bind_element(&r, &unified);
            (
                Ir::NDArrayMap {
                    nd: Box::new(r.ir().clone()),
                    name: uid,
                    body: Box::new(op.scalar_ir(l.ir().clone(), x)),
                },
                ExprType::ndarray(result_elem, *n),
            )
        }
        (Operand::NDArray(_, n), Operand::NDArray(_, m)) => {
            let ndim = (*n).max(*m);
            let left = broadcast_to(&l, ndim);
            let right = broadcast_to(&r, ndim);
            let (ln, lx) = bind_element(&l, &unified);
            let (rn, rx) = bind_element(&r, &unified);
            (
                Ir::NDArrayMap2 {
                    left: Box::new(left.into_ir()),
                    right: Box::new(right.into_ir()),
                    left_name: ln,
                    right_name: rn,
                    body: Box::new(op.scalar_ir(lx, rx)),
                },
                ExprType::ndarray(result_elem, ndim),
            )
        }
        (Operand::Array(_), Operand::NDArray(..)) | (Operand::NDArray(..), Operand::Array(_)) => {
            return Err(ExprError::type_mismatch(format!(
                "no operator {} between '{}' and '{}'",
                op.symbol(),
                l.dtype(),
                r.dtype()
            )))
        }
    };
    construct(Expression::combine(&ctx, ir, typ, &[&l, &r])?)
}

/// `lhs <op> other`
pub(crate) fn binary(lhs: &Expression, other: impl ToExpr, op: BinOp) -> ExprResult<TypedExpr> {
    let rhs = other.to_expr(lhs.context());
    combine_numeric(lhs.clone(), rhs, Op::Arith(op))
}

/// `other <op> rhs`
pub(crate) fn binary_reversed(
    rhs: &Expression,
    other: impl ToExpr,
    op: BinOp,
) -> ExprResult<TypedExpr> {
    let lhs = other.to_expr(rhs.context());
    combine_numeric(lhs, rhs.clone(), Op::Arith(op))
}

pub(crate) fn comparison(lhs: &Expression, other: impl ToExpr, op: CompOp) -> ExprResult<TypedExpr> {
    let rhs = other.to_expr(lhs.context());
    combine_numeric(lhs.clone(), rhs, Op::Compare(op))
}

/// Scalars negate directly; arrays and ndarrays multiply by -1
pub(crate) fn negate(e: &Expression) -> ExprResult<TypedExpr> {
    match Operand::classify(e)? {
        Operand::Scalar(t) => construct(e.derive(
            Ir::ApplyUnaryPrimOp {
                op: UnaryOp::Neg,
                value: Box::new(e.ir().clone()),
            },
            t,
        )),
        Operand::Array(_) | Operand::NDArray(..) => binary(e, -1i32, BinOp::Mul),
    }
}

impl NumericExpr {
    /// Convert to another numeric type
    ///
    /// Unlike promotion this may narrow (float to integer truncates).
    pub fn cast(&self, to: ExprType) -> ExprResult<NumericExpr> {
        if !to.is_numeric() {
            return Err(ExprError::expected("numeric target type", &to));
        }
        if *self.dtype() == to {
            return Ok(self.clone());
        }
        let e = self.expr();
        Ok(NumericExpr::wrap(e.derive(Ir::cast(e.ir().clone(), to.clone()), to)))
    }
}
