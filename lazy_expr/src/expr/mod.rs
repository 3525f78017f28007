//! Expression façades.
//!
//! An `Expression` is one (IR node, type, axes, aggregation scopes) tuple.
//! Typed façades wrap an `Expression` and expose the operations legal for its
//! type category; `construct` picks the façade for a type.
//!
//! # Module Organization
//!
//! - `construct.rs`: `TypedExpr` and the construction dispatcher
//! - `builder.rs`: `Builder`, the construction context and literal source
//! - `capabilities.rs`: `NumericOps` / `FieldProjection` decorators
//! - `scalar.rs`: Boolean and string façades
//! - `numeric.rs`: Numeric scalars and operator dispatch across shapes
//! - `genetics.rs`: Call, locus and interval façades
//! - `collection.rs`: Shared array/set algebra (`map`, `filter`, `fold`, ...)
//! - `array.rs`, `set.rs`, `dict.rs`: Container-specific operations
//! - `structs.rs`, `tuple.rs`: Field algebra
//! - `ndarray.rs`: Shape algebra for n-dimensional arrays
//! - `index.rs`: Index and slice arguments

/// Declare a newtype façade over `Expression`
macro_rules! facade {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name($crate::expr::Expression);

        impl $name {
            pub(crate) fn wrap(expr: $crate::expr::Expression) -> Self {
                $name(expr)
            }

            pub fn into_expression(self) -> $crate::expr::Expression {
                self.0
            }
        }

        impl $crate::expr::ExprLike for $name {
            fn expr(&self) -> &$crate::expr::Expression {
                &self.0
            }
        }
    };
}

mod array;
mod builder;
mod capabilities;
mod collection;
mod construct;
mod dict;
mod genetics;
mod index;
mod ndarray;
mod numeric;
mod scalar;
mod set;
mod structs;
mod tuple;

use std::sync::Arc;

use lazy_expr_runtime::{CompOp, UnaryOp, Value};

use crate::coercion::{coercer_for, unify_types};
use crate::config::BuilderConfig;
use crate::context::{unify_all, Aggregations, Indices};
use crate::error::{ExprError, ExprResult};
use crate::eval::Backend;
use crate::ir::Ir;
use crate::names::NameGenerator;
use crate::types::ExprType;

pub use builder::Builder;
pub use capabilities::{FieldProjection, NumericOps, WithFieldProjection, WithNumericOps};
pub use collection::{ArrayKind, CollectionExpr, CollectionKind, SetKind};
pub use construct::{construct, TypedExpr};
pub use dict::DictExpr;
pub use genetics::{CallExpr, IntervalExpr, LocusExpr};
pub use index::{Bound, NDIndex, Slice};
pub use ndarray::NDArrayExpr;
pub use numeric::NumericExpr;
pub use scalar::{BooleanExpr, StringExpr};
pub use structs::StructExpr;
pub use tuple::TupleExpr;

/// Array façade
pub type ArrayExpr = CollectionExpr<ArrayKind>;
/// Set façade
pub type SetExpr = CollectionExpr<SetKind>;

/// Resources shared by every expression built from one `Builder`
#[derive(Debug)]
pub struct BuildContext {
    names: NameGenerator,
    config: BuilderConfig,
}

impl BuildContext {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            names: NameGenerator::new(config.uid_prefix.clone()),
            config,
        }
    }

    pub fn names(&self) -> &NameGenerator {
        &self.names
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Mint a fresh bound-variable name
    pub fn fresh(&self) -> String {
        self.names.fresh()
    }
}

/// Untyped expression: an IR node with its type and context metadata
///
/// The type is always the type `ir.infer_type()` elaborates to.
#[derive(Debug, Clone)]
pub struct Expression {
    ir: Ir,
    typ: ExprType,
    indices: Indices,
    aggregations: Aggregations,
    ctx: Arc<BuildContext>,
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.ir == other.ir
            && self.typ == other.typ
            && self.indices == other.indices
            && self.aggregations == other.aggregations
    }
}

impl Expression {
    pub(crate) fn new(
        ctx: &Arc<BuildContext>,
        ir: Ir,
        typ: ExprType,
        indices: Indices,
        aggregations: Aggregations,
    ) -> Self {
        tracing::trace!(node = ir.node_name(), typ = %typ, "constructed");
        Self {
            ir,
            typ,
            indices,
            aggregations,
            ctx: Arc::clone(ctx),
        }
    }

    /// Global-context expression with no aggregation scope
    pub(crate) fn literal(ctx: &Arc<BuildContext>, ir: Ir, typ: ExprType) -> Self {
        Self::new(ctx, ir, typ, Indices::empty(), Aggregations::empty())
    }

    /// Expression over the same context metadata as `self`
    pub(crate) fn derive(&self, ir: Ir, typ: ExprType) -> Self {
        Self::new(
            &self.ctx,
            ir,
            typ,
            self.indices.clone(),
            self.aggregations.clone(),
        )
    }

    /// Expression whose context is unified from `parts`
    pub(crate) fn combine(
        ctx: &Arc<BuildContext>,
        ir: Ir,
        typ: ExprType,
        parts: &[&Expression],
    ) -> ExprResult<Self> {
        let (indices, aggregations) =
            unify_all(parts.iter().map(|e| (&e.indices, &e.aggregations)))?;
        Ok(Self::new(ctx, ir, typ, indices, aggregations))
    }

    /// Bound variable carrying the context of `self`
    pub(crate) fn variable(&self, name: &str, typ: ExprType) -> Self {
        self.derive(Ir::reference(name, typ.clone()), typ)
    }

    pub fn ir(&self) -> &Ir {
        &self.ir
    }

    pub fn into_ir(self) -> Ir {
        self.ir
    }

    pub fn dtype(&self) -> &ExprType {
        &self.typ
    }

    pub fn indices(&self) -> &Indices {
        &self.indices
    }

    pub fn aggregations(&self) -> &Aggregations {
        &self.aggregations
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    /// Wrap in the façade for this expression's type
    pub fn typed(self) -> ExprResult<TypedExpr> {
        construct(self)
    }

    /// Promote to `target`; a no-op when the type already matches
    pub(crate) fn coerce_to(self, target: &ExprType) -> ExprResult<Expression> {
        if self.typ == *target {
            return Ok(self);
        }
        let ir = coercer_for(target).coerce_ir(self.ir, &self.typ, self.ctx.names())?;
        Ok(Expression {
            ir,
            typ: target.clone(),
            indices: self.indices,
            aggregations: self.aggregations,
            ctx: self.ctx,
        })
    }

    /// `Apply(name, [self, args...])` with unified context
    pub(crate) fn method(
        &self,
        name: &str,
        ret_type: ExprType,
        args: Vec<Expression>,
    ) -> ExprResult<Expression> {
        let mut irs = Vec::with_capacity(args.len() + 1);
        irs.push(self.ir.clone());
        irs.extend(args.iter().map(|a| a.ir.clone()));
        let mut parts: Vec<&Expression> = vec![self];
        parts.extend(args.iter());
        Expression::combine(&self.ctx, Ir::apply(name, ret_type.clone(), irs), ret_type, &parts)
    }

    /// Fail unless this expression may be used inside `enclosing`
    pub fn check_scope(&self, enclosing: &Aggregations) -> ExprResult<()> {
        self.aggregations.check_scope(enclosing)
    }
}

/// Anything that wraps an `Expression`
pub trait ExprLike {
    fn expr(&self) -> &Expression;

    fn ir(&self) -> &Ir {
        self.expr().ir()
    }

    fn dtype(&self) -> &ExprType {
        self.expr().dtype()
    }

    fn indices(&self) -> &Indices {
        self.expr().indices()
    }

    fn aggregations(&self) -> &Aggregations {
        self.expr().aggregations()
    }

    fn to_expression(&self) -> Expression {
        self.expr().clone()
    }

    /// Equality with any value of a unifiable type
    fn equals(&self, other: impl ToExpr) -> ExprResult<BooleanExpr>
    where
        Self: Sized,
    {
        compare_any(self.expr(), other, CompOp::Eq)
    }

    fn not_equals(&self, other: impl ToExpr) -> ExprResult<BooleanExpr>
    where
        Self: Sized,
    {
        compare_any(self.expr(), other, CompOp::Ne)
    }

    fn is_missing(&self) -> BooleanExpr {
        let e = self.expr();
        BooleanExpr::wrap(e.derive(Ir::IsNA(Box::new(e.ir().clone())), ExprType::Bool))
    }

    fn is_defined(&self) -> BooleanExpr {
        let e = self.expr();
        let is_na = Ir::IsNA(Box::new(e.ir().clone()));
        BooleanExpr::wrap(e.derive(
            Ir::ApplyUnaryPrimOp {
                op: UnaryOp::Not,
                value: Box::new(is_na),
            },
            ExprType::Bool,
        ))
    }

    /// Evaluate eagerly on a backend
    ///
    /// Only global expressions outside any aggregation can be evaluated.
    fn eval(&self, backend: &dyn Backend) -> ExprResult<Value> {
        let e = self.expr();
        e.check_scope(&Aggregations::empty())?;
        if !e.indices().is_empty() {
            return Err(ExprError::ContextUnification {
                left: e.indices().to_string(),
                right: Indices::empty().to_string(),
            });
        }
        tracing::debug!(typ = %e.dtype(), nodes = e.ir().size(), "eval");
        Ok(backend.execute(e.ir(), e.dtype())?)
    }
}

impl ExprLike for Expression {
    fn expr(&self) -> &Expression {
        self
    }
}

impl<T: ExprLike + ?Sized> ExprLike for &T {
    fn expr(&self) -> &Expression {
        (**self).expr()
    }
}

/// Conversion of literals and façades into expressions
pub trait ToExpr {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression;
}

impl<T: ExprLike> ToExpr for T {
    fn to_expr(self, _ctx: &Arc<BuildContext>) -> Expression {
        self.expr().clone()
    }
}

impl ToExpr for bool {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression {
        Expression::literal(ctx, Ir::bool(self), ExprType::Bool)
    }
}

impl ToExpr for i32 {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression {
        Expression::literal(ctx, Ir::I32(self), ExprType::Int32)
    }
}

impl ToExpr for i64 {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression {
        Expression::literal(ctx, Ir::I64(self), ExprType::Int64)
    }
}

impl ToExpr for f32 {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression {
        Expression::literal(ctx, Ir::F32(self), ExprType::Float32)
    }
}

impl ToExpr for f64 {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression {
        Expression::literal(ctx, Ir::F64(self), ExprType::Float64)
    }
}

impl ToExpr for &str {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression {
        Expression::literal(ctx, Ir::str(self), ExprType::Str)
    }
}

impl ToExpr for String {
    fn to_expr(self, ctx: &Arc<BuildContext>) -> Expression {
        Expression::literal(ctx, Ir::Str(self), ExprType::Str)
    }
}

/// Comparison after unifying both operand types
pub(crate) fn compare_any(
    lhs: &Expression,
    other: impl ToExpr,
    op: CompOp,
) -> ExprResult<BooleanExpr> {
    let rhs = other.to_expr(lhs.context());
    let unified = unify_types(lhs.dtype(), rhs.dtype()).ok_or_else(|| {
        ExprError::type_mismatch(format!(
            "cannot compare '{}' with '{}'",
            lhs.dtype(),
            rhs.dtype()
        ))
    })?;
    let l = lhs.clone().coerce_to(&unified)?;
    let r = rhs.coerce_to(&unified)?;
    let ir = Ir::compare(op, l.ir().clone(), r.ir().clone());
    Ok(BooleanExpr::wrap(Expression::combine(
        lhs.context(),
        ir,
        ExprType::Bool,
        &[&l, &r],
    )?))
}

/// `If` over a boolean condition and two unifiable branches
pub(crate) fn if_else_expr(
    cond: Expression,
    then: Expression,
    otherwise: Expression,
) -> ExprResult<Expression> {
    if *cond.dtype() != ExprType::Bool {
        return Err(ExprError::expected("boolean condition", cond.dtype()));
    }
    let unified = unify_types(then.dtype(), otherwise.dtype()).ok_or_else(|| {
        ExprError::type_mismatch(format!(
            "branches have incompatible types '{}' and '{}'",
            then.dtype(),
            otherwise.dtype()
        ))
    })?;
    let then = then.coerce_to(&unified)?;
    let otherwise = otherwise.coerce_to(&unified)?;
    let ir = Ir::if_(cond.ir().clone(), then.ir().clone(), otherwise.ir().clone());
    let ctx = Arc::clone(cond.context());
    Expression::combine(&ctx, ir, unified, &[&cond, &then, &otherwise])
}

/// Missing value of `typ` in the context of `like`
pub(crate) fn missing_like(like: &Expression, typ: ExprType) -> Expression {
    Expression::literal(like.context(), Ir::NA(typ.clone()), typ)
}

/// `MakeTuple` over the given expressions
pub(crate) fn make_tuple(ctx: &Arc<BuildContext>, items: Vec<Expression>) -> ExprResult<Expression> {
    let typ = ExprType::Tuple(items.iter().map(|e| e.dtype().clone()).collect());
    let ir = Ir::MakeTuple(items.iter().map(|e| e.ir().clone()).collect());
    let parts: Vec<&Expression> = items.iter().collect();
    Expression::combine(ctx, ir, typ, &parts)
}
