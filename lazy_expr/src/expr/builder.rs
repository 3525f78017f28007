//! Construction context and literal constructors.
//!
//! A `Builder` owns the name generator and configuration shared by every
//! expression built from it. Literals start in the global context; use
//! `variable` for values anchored to source axes.

use std::collections::HashSet;
use std::sync::Arc;

use super::scalar::typed_arg;
use super::{
    construct, if_else_expr, make_tuple, BooleanExpr, BuildContext, CallExpr, DictExpr,
    Expression, IntervalExpr, LocusExpr, NumericExpr, StringExpr, StructExpr, ToExpr, TupleExpr,
    TypedExpr,
};
use crate::coercion::unify_many;
use crate::config::BuilderConfig;
use crate::context::{Aggregation, Aggregations, Indices};
use crate::diagnostics::DiagnosticsCollector;
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

/// Entry point for building expressions
#[derive(Debug, Clone)]
pub struct Builder {
    ctx: Arc<BuildContext>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Builder with the default configuration
    pub fn new() -> Self {
        Builder {
            ctx: Arc::new(BuildContext::new(BuilderConfig::default())),
        }
    }

    /// Builder with a validated configuration
    ///
    /// `diagnostics = true` enables the collector on the calling thread.
    pub fn with_config(config: BuilderConfig) -> ExprResult<Self> {
        config.validate()?;
        if config.diagnostics {
            DiagnosticsCollector::enable();
        }
        tracing::debug!(uid_prefix = %config.uid_prefix, "builder created");
        Ok(Builder {
            ctx: Arc::new(BuildContext::new(config)),
        })
    }

    /// Builder configured from the file named by `LAZY_EXPR_CONFIG`
    pub fn from_env() -> ExprResult<Self> {
        Self::with_config(BuilderConfig::from_env()?)
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    pub fn config(&self) -> &BuilderConfig {
        self.ctx.config()
    }

    /// Untyped expression for any literal or façade
    pub fn lit(&self, v: impl ToExpr) -> Expression {
        v.to_expr(&self.ctx)
    }

    pub fn bool(&self, v: bool) -> BooleanExpr {
        BooleanExpr::wrap(self.lit(v))
    }

    pub fn int32(&self, v: i32) -> NumericExpr {
        NumericExpr::wrap(self.lit(v))
    }

    pub fn int64(&self, v: i64) -> NumericExpr {
        NumericExpr::wrap(self.lit(v))
    }

    pub fn float32(&self, v: f32) -> NumericExpr {
        NumericExpr::wrap(self.lit(v))
    }

    pub fn float64(&self, v: f64) -> NumericExpr {
        NumericExpr::wrap(self.lit(v))
    }

    pub fn str(&self, v: impl Into<String>) -> StringExpr {
        StringExpr::wrap(self.lit(v.into()))
    }

    /// Missing value of `typ`
    pub fn missing(&self, typ: ExprType) -> ExprResult<TypedExpr> {
        construct(Expression::literal(&self.ctx, Ir::NA(typ.clone()), typ))
    }

    /// Convert items and promote them to their unified type
    fn unified<I>(&self, items: I, what: &str) -> ExprResult<(Vec<Expression>, ExprType)>
    where
        I: IntoIterator,
        I::Item: ToExpr,
    {
        let exprs: Vec<Expression> = items.into_iter().map(|x| x.to_expr(&self.ctx)).collect();
        if exprs.is_empty() {
            return Err(ExprError::type_mismatch(format!(
                "cannot infer the element type of an empty {}",
                what
            )));
        }
        let typ = unify_many(exprs.iter().map(Expression::dtype)).ok_or_else(|| {
            let found: Vec<String> = exprs.iter().map(|e| e.dtype().to_string()).collect();
            ExprError::type_mismatch(format!(
                "{} elements have no common type: [{}]",
                what,
                found.join(", ")
            ))
        })?;
        let exprs = exprs
            .into_iter()
            .map(|e| e.coerce_to(&typ))
            .collect::<ExprResult<Vec<_>>>()?;
        Ok((exprs, typ))
    }

    fn make_array(&self, items: Vec<Expression>, elem: ExprType) -> ExprResult<Expression> {
        let ir = Ir::MakeArray {
            elements: items.iter().map(|e| e.ir().clone()).collect(),
            elem_type: elem.clone(),
        };
        let parts: Vec<&Expression> = items.iter().collect();
        Expression::combine(&self.ctx, ir, ExprType::array(elem), &parts)
    }

    /// Array literal; elements are promoted to a common type
    pub fn array<I>(&self, items: I) -> ExprResult<TypedExpr>
    where
        I: IntoIterator,
        I::Item: ToExpr,
    {
        let (items, elem) = self.unified(items, "array")?;
        construct(self.make_array(items, elem)?)
    }

    pub fn empty_array(&self, elem: ExprType) -> ExprResult<TypedExpr> {
        construct(self.make_array(Vec::new(), elem)?)
    }

    /// Set literal; duplicates collapse at evaluation
    pub fn set<I>(&self, items: I) -> ExprResult<TypedExpr>
    where
        I: IntoIterator,
        I::Item: ToExpr,
    {
        let (items, elem) = self.unified(items, "set")?;
        let array = self.make_array(items, elem.clone())?;
        construct(array.derive(Ir::ToSet(Box::new(array.ir().clone())), ExprType::set(elem)))
    }

    /// Dict literal from `(key, value)` pairs
    pub fn dict<I, K, V>(&self, pairs: I) -> ExprResult<DictExpr>
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToExpr,
        V: ToExpr,
    {
        let (keys, values): (Vec<K>, Vec<V>) = pairs.into_iter().unzip();
        let (keys, key_type) = self.unified(keys, "dict key")?;
        let (values, value_type) = self.unified(values, "dict value")?;
        let entries = keys
            .into_iter()
            .zip(values)
            .map(|(k, v)| make_tuple(&self.ctx, vec![k, v]))
            .collect::<ExprResult<Vec<_>>>()?;
        let pair = ExprType::tuple([key_type.clone(), value_type.clone()]);
        let array = self.make_array(entries, pair)?;
        Ok(DictExpr::wrap(array.derive(
            Ir::ToDict(Box::new(array.ir().clone())),
            ExprType::dict(key_type, value_type),
        )))
    }

    /// Struct literal with fields in the given order
    pub fn struct_<I, S, E>(&self, fields: I) -> ExprResult<StructExpr>
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: ToExpr,
    {
        let mut seen = HashSet::new();
        let mut made = Vec::new();
        for (name, value) in fields {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(ExprError::duplicate_field(format!(
                    "field '{}' given more than once",
                    name
                )));
            }
            made.push((name, value.to_expr(&self.ctx)));
        }
        let typ = ExprType::Struct(
            made.iter()
                .map(|(n, e)| (n.clone(), e.dtype().clone()))
                .collect(),
        );
        let ir = Ir::MakeStruct(
            made.iter()
                .map(|(n, e)| (n.clone(), e.ir().clone()))
                .collect(),
        );
        let parts: Vec<&Expression> = made.iter().map(|(_, e)| e).collect();
        Ok(StructExpr::wrap(Expression::combine(
            &self.ctx, ir, typ, &parts,
        )?))
    }

    pub fn tuple<I>(&self, items: I) -> ExprResult<TupleExpr>
    where
        I: IntoIterator,
        I::Item: ToExpr,
    {
        let items = items.into_iter().map(|x| x.to_expr(&self.ctx)).collect();
        Ok(TupleExpr::wrap(make_tuple(&self.ctx, items)?))
    }

    /// NDArray literal from row-major data
    pub fn ndarray<I>(&self, data: I, shape: &[u64]) -> ExprResult<TypedExpr>
    where
        I: IntoIterator,
        I::Item: ToExpr,
    {
        let (items, elem) = self.unified(data, "ndarray")?;
        let expected: u64 = shape.iter().product();
        if expected != items.len() as u64 {
            return Err(ExprError::shape(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                items.len()
            )));
        }
        let data = self.make_array(items, elem.clone())?;
        let dims: Vec<Ir> = shape
            .iter()
            .map(|&d| i64::try_from(d).map(Ir::I64))
            .collect::<Result<_, _>>()
            .map_err(|_| ExprError::shape(format!("extent out of range in {:?}", shape)))?;
        let ir = Ir::MakeNDArray {
            data: Box::new(data.ir().clone()),
            shape: Box::new(Ir::MakeTuple(dims)),
        };
        construct(data.derive(ir, ExprType::ndarray(elem, shape.len())))
    }

    /// int32 array `start, start + step, ...` up to but excluding `stop`
    pub fn range_step(
        &self,
        start: impl ToExpr,
        stop: impl ToExpr,
        step: impl ToExpr,
    ) -> ExprResult<TypedExpr> {
        let start = typed_arg(&self.ctx, start, &ExprType::Int32, "range start")?;
        let stop = typed_arg(&self.ctx, stop, &ExprType::Int32, "range stop")?;
        let step = typed_arg(&self.ctx, step, &ExprType::Int32, "range step")?;
        let ir = Ir::ArrayRange {
            start: Box::new(start.ir().clone()),
            stop: Box::new(stop.ir().clone()),
            step: Box::new(step.ir().clone()),
        };
        construct(Expression::combine(
            &self.ctx,
            ir,
            ExprType::array(ExprType::Int32),
            &[&start, &stop, &step],
        )?)
    }

    pub fn range(&self, start: impl ToExpr, stop: impl ToExpr) -> ExprResult<TypedExpr> {
        self.range_step(start, stop, 1i32)
    }

    /// Locus on `genome` at a contig and 1-based position
    pub fn locus(
        &self,
        contig: impl ToExpr,
        position: impl ToExpr,
        genome: &str,
    ) -> ExprResult<LocusExpr> {
        let contig = typed_arg(&self.ctx, contig, &ExprType::Str, "contig")?;
        let position = typed_arg(&self.ctx, position, &ExprType::Int32, "position")?;
        let typ = ExprType::locus(genome);
        let ir = Ir::apply(
            "Locus",
            typ.clone(),
            vec![contig.ir().clone(), position.ir().clone()],
        );
        Ok(LocusExpr::wrap(Expression::combine(
            &self.ctx,
            ir,
            typ,
            &[&contig, &position],
        )?))
    }

    /// Interval between two points of a common type
    pub fn interval(
        &self,
        start: impl ToExpr,
        end: impl ToExpr,
        includes_start: bool,
        includes_end: bool,
    ) -> ExprResult<IntervalExpr> {
        let endpoints = [start.to_expr(&self.ctx), end.to_expr(&self.ctx)];
        let (points, point) = self.unified(endpoints, "interval")?;
        let typ = ExprType::interval(point);
        let mut args: Vec<Ir> = points.iter().map(|p| p.ir().clone()).collect();
        args.push(Ir::bool(includes_start));
        args.push(Ir::bool(includes_end));
        let parts: Vec<&Expression> = points.iter().collect();
        Ok(IntervalExpr::wrap(Expression::combine(
            &self.ctx,
            Ir::apply("Interval", typ.clone(), args),
            typ,
            &parts,
        )?))
    }

    /// Genotype call from allele indices
    pub fn call(&self, alleles: &[i32], phased: bool) -> CallExpr {
        let alleles = Ir::MakeArray {
            elements: alleles.iter().map(|&a| Ir::I32(a)).collect(),
            elem_type: ExprType::Int32,
        };
        CallExpr::wrap(Expression::literal(
            &self.ctx,
            Ir::apply("Call", ExprType::Call, vec![alleles, Ir::bool(phased)]),
            ExprType::Call,
        ))
    }

    /// `cond ? then : otherwise`, with both branches promoted to a common type
    pub fn if_else(
        &self,
        cond: impl ToExpr,
        then: impl ToExpr,
        otherwise: impl ToExpr,
    ) -> ExprResult<TypedExpr> {
        construct(if_else_expr(
            cond.to_expr(&self.ctx),
            then.to_expr(&self.ctx),
            otherwise.to_expr(&self.ctx),
        )?)
    }

    /// Free variable anchored to `indices`, such as a row field
    pub fn variable(
        &self,
        name: &str,
        typ: ExprType,
        indices: Indices,
    ) -> ExprResult<TypedExpr> {
        construct(Expression::new(
            &self.ctx,
            Ir::reference(name, typ.clone()),
            typ,
            indices,
            Aggregations::empty(),
        ))
    }

    /// Global value the backend supplies by name
    pub fn reference(&self, name: &str, typ: ExprType) -> ExprResult<TypedExpr> {
        construct(Expression::literal(
            &self.ctx,
            Ir::TopLevelReference {
                name: name.to_string(),
                typ: typ.clone(),
            },
            typ,
        ))
    }

    /// Aggregator `op` over `expr`, returning `ret_type`
    ///
    /// The result is global (the operand's axes are consumed) and carries a
    /// new aggregation scope on top of the operand's stack.
    pub fn aggregate(
        &self,
        op: &str,
        expr: impl ToExpr,
        ret_type: ExprType,
    ) -> ExprResult<TypedExpr> {
        let operand = expr.to_expr(&self.ctx);
        let marker = Aggregation {
            id: self.ctx.fresh(),
            op: op.to_string(),
            indices: operand.indices().clone(),
        };
        let ir = Ir::ApplyAggOp {
            op: op.to_string(),
            ret_type: ret_type.clone(),
            args: vec![operand.ir().clone()],
        };
        construct(Expression::new(
            &self.ctx,
            ir,
            ret_type,
            Indices::empty(),
            operand.aggregations().push(marker),
        ))
    }
}
