//! Construction dispatcher.
//!
//! `construct` picks the façade for an expression's type with one match arm
//! per type tag. Arrays and sets whose innermost element is a struct get
//! field projection; numeric arrays and ndarrays get numeric operators.

use super::capabilities::{WithFieldProjection, WithNumericOps};
use super::collection::CollectionExpr;
use super::{
    ArrayExpr, BooleanExpr, CallExpr, DictExpr, ExprLike, Expression, IntervalExpr, LocusExpr,
    NDArrayExpr, NumericExpr, SetExpr, StringExpr, StructExpr, TupleExpr,
};
use crate::error::{ExprError, ExprResult};
use crate::types::{ExprType, TypeTag};

/// An expression wrapped in the façade for its type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedExpr {
    Boolean(BooleanExpr),
    Numeric(NumericExpr),
    String(StringExpr),
    Call(CallExpr),
    Locus(LocusExpr),
    Interval(IntervalExpr),
    Array(ArrayExpr),
    NumericArray(WithNumericOps<ArrayExpr>),
    StructArray(WithFieldProjection<ArrayExpr>),
    Set(SetExpr),
    StructSet(WithFieldProjection<SetExpr>),
    Dict(DictExpr),
    Struct(StructExpr),
    Tuple(TupleExpr),
    NDArray(NDArrayExpr),
    NumericNDArray(WithNumericOps<NDArrayExpr>),
}

/// Wrap an expression in the façade selected by its type
pub fn construct(expr: Expression) -> ExprResult<TypedExpr> {
    let typed = match expr.dtype().tag() {
        TypeTag::Bool => TypedExpr::Boolean(BooleanExpr::wrap(expr)),
        TypeTag::Numeric => TypedExpr::Numeric(NumericExpr::wrap(expr)),
        TypeTag::Str => TypedExpr::String(StringExpr::wrap(expr)),
        TypeTag::Call => TypedExpr::Call(CallExpr::wrap(expr)),
        TypeTag::Locus => TypedExpr::Locus(LocusExpr::wrap(expr)),
        TypeTag::Interval => TypedExpr::Interval(IntervalExpr::wrap(expr)),
        TypeTag::Array => {
            let numeric = expr.dtype().element_type().is_some_and(ExprType::is_numeric);
            let structs = expr.dtype().is_struct_collection();
            let array = CollectionExpr::wrap(expr);
            if numeric {
                TypedExpr::NumericArray(WithNumericOps::new(array))
            } else if structs {
                TypedExpr::StructArray(WithFieldProjection::new(array))
            } else {
                TypedExpr::Array(array)
            }
        }
        TypeTag::Set => {
            if expr.dtype().is_struct_collection() {
                TypedExpr::StructSet(WithFieldProjection::new(CollectionExpr::wrap(expr)))
            } else {
                TypedExpr::Set(CollectionExpr::wrap(expr))
            }
        }
        TypeTag::Dict => TypedExpr::Dict(DictExpr::wrap(expr)),
        TypeTag::Struct => TypedExpr::Struct(StructExpr::wrap(expr)),
        TypeTag::Tuple => TypedExpr::Tuple(TupleExpr::wrap(expr)),
        TypeTag::NDArray => match expr.dtype().element_type() {
            Some(e) if e.is_numeric() => {
                TypedExpr::NumericNDArray(WithNumericOps::new(NDArrayExpr::wrap(expr)))
            }
            Some(ExprType::Bool) => TypedExpr::NDArray(NDArrayExpr::wrap(expr)),
            _ => {
                return Err(ExprError::UnsupportedType(format!(
                    "ndarray elements must be numeric or boolean, found '{}'",
                    expr.dtype()
                )))
            }
        },
    };
    Ok(typed)
}

fn wrong_kind(what: &str, found: &ExprType) -> ExprError {
    ExprError::expected(what, found)
}

impl TypedExpr {
    pub fn into_expression(self) -> Expression {
        self.expr().clone()
    }

    pub fn into_bool(self) -> ExprResult<BooleanExpr> {
        match self {
            TypedExpr::Boolean(e) => Ok(e),
            other => Err(wrong_kind("boolean", other.dtype())),
        }
    }

    pub fn into_numeric(self) -> ExprResult<NumericExpr> {
        match self {
            TypedExpr::Numeric(e) => Ok(e),
            other => Err(wrong_kind("numeric scalar", other.dtype())),
        }
    }

    pub fn into_str(self) -> ExprResult<StringExpr> {
        match self {
            TypedExpr::String(e) => Ok(e),
            other => Err(wrong_kind("string", other.dtype())),
        }
    }

    pub fn into_call(self) -> ExprResult<CallExpr> {
        match self {
            TypedExpr::Call(e) => Ok(e),
            other => Err(wrong_kind("call", other.dtype())),
        }
    }

    pub fn into_locus(self) -> ExprResult<LocusExpr> {
        match self {
            TypedExpr::Locus(e) => Ok(e),
            other => Err(wrong_kind("locus", other.dtype())),
        }
    }

    pub fn into_interval(self) -> ExprResult<IntervalExpr> {
        match self {
            TypedExpr::Interval(e) => Ok(e),
            other => Err(wrong_kind("interval", other.dtype())),
        }
    }

    /// Any array, without its capabilities
    pub fn into_array(self) -> ExprResult<ArrayExpr> {
        match self {
            TypedExpr::Array(e) => Ok(e),
            TypedExpr::NumericArray(e) => Ok(e.into_inner()),
            TypedExpr::StructArray(e) => Ok(e.into_inner()),
            other => Err(wrong_kind("array", other.dtype())),
        }
    }

    pub fn into_numeric_array(self) -> ExprResult<WithNumericOps<ArrayExpr>> {
        match self {
            TypedExpr::NumericArray(e) => Ok(e),
            other => Err(wrong_kind("numeric array", other.dtype())),
        }
    }

    pub fn into_struct_array(self) -> ExprResult<WithFieldProjection<ArrayExpr>> {
        match self {
            TypedExpr::StructArray(e) => Ok(e),
            other => Err(wrong_kind("array of structs", other.dtype())),
        }
    }

    /// Any set, without its capabilities
    pub fn into_set(self) -> ExprResult<SetExpr> {
        match self {
            TypedExpr::Set(e) => Ok(e),
            TypedExpr::StructSet(e) => Ok(e.into_inner()),
            other => Err(wrong_kind("set", other.dtype())),
        }
    }

    pub fn into_struct_set(self) -> ExprResult<WithFieldProjection<SetExpr>> {
        match self {
            TypedExpr::StructSet(e) => Ok(e),
            other => Err(wrong_kind("set of structs", other.dtype())),
        }
    }

    pub fn into_dict(self) -> ExprResult<DictExpr> {
        match self {
            TypedExpr::Dict(e) => Ok(e),
            other => Err(wrong_kind("dict", other.dtype())),
        }
    }

    pub fn into_struct(self) -> ExprResult<StructExpr> {
        match self {
            TypedExpr::Struct(e) => Ok(e),
            other => Err(wrong_kind("struct", other.dtype())),
        }
    }

    pub fn into_tuple(self) -> ExprResult<TupleExpr> {
        match self {
            TypedExpr::Tuple(e) => Ok(e),
            other => Err(wrong_kind("tuple", other.dtype())),
        }
    }

    /// Any ndarray, without its capabilities
    pub fn into_ndarray(self) -> ExprResult<NDArrayExpr> {
        match self {
            TypedExpr::NDArray(e) => Ok(e),
            TypedExpr::NumericNDArray(e) => Ok(e.into_inner()),
            other => Err(wrong_kind("ndarray", other.dtype())),
        }
    }

    pub fn into_numeric_ndarray(self) -> ExprResult<WithNumericOps<NDArrayExpr>> {
        match self {
            TypedExpr::NumericNDArray(e) => Ok(e),
            other => Err(wrong_kind("numeric ndarray", other.dtype())),
        }
    }
}

impl ExprLike for TypedExpr {
    fn expr(&self) -> &Expression {
        match self {
            TypedExpr::Boolean(e) => e.expr(),
            TypedExpr::Numeric(e) => e.expr(),
            TypedExpr::String(e) => e.expr(),
            TypedExpr::Call(e) => e.expr(),
            TypedExpr::Locus(e) => e.expr(),
            TypedExpr::Interval(e) => e.expr(),
            TypedExpr::Array(e) => e.expr(),
            TypedExpr::NumericArray(e) => e.expr(),
            TypedExpr::StructArray(e) => e.expr(),
            TypedExpr::Set(e) => e.expr(),
            TypedExpr::StructSet(e) => e.expr(),
            TypedExpr::Dict(e) => e.expr(),
            TypedExpr::Struct(e) => e.expr(),
            TypedExpr::Tuple(e) => e.expr(),
            TypedExpr::NDArray(e) => e.expr(),
            TypedExpr::NumericNDArray(e) => e.expr(),
        }
    }
}
