//! Array and set algebra.
//!
//! Arrays and sets share one façade, `CollectionExpr<K>`, parameterized by a
//! `CollectionKind` that says how to get an array out of the container and
//! how to rebuild the container from an array. Every lambda-style operation
//! is emitted over the array form:
//!
//! ```text
//! set.map(f)  =>  ToSet(ArrayMap(ToArray(set), uid, f(Ref uid)))
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use super::{
    construct, if_else_expr, make_tuple, missing_like, BooleanExpr, DictExpr, ExprLike,
    Expression, NumericExpr, ToExpr, TypedExpr,
};
use crate::coercion::coercer_for;
use crate::diagnostics::emit_fold_zero_promoted;
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

/// Container family of a `CollectionExpr`
pub trait CollectionKind: std::fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Name used in messages
    const NAME: &'static str;

    /// Container type holding `elem`
    fn container(elem: ExprType) -> ExprType;

    /// Element type, if `t` is this kind of container
    fn element_of(t: &ExprType) -> Option<&ExprType>;

    /// Array view of a container node
    fn to_array_ir(ir: Ir) -> Ir;

    /// Container node from an array node
    fn from_array_ir(ir: Ir) -> Ir;
}

/// Ordered sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayKind;

/// Unordered collections of distinct values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetKind;

impl CollectionKind for ArrayKind {
    const NAME: &'static str = "array";

    fn container(elem: ExprType) -> ExprType {
        ExprType::array(elem)
    }

    fn element_of(t: &ExprType) -> Option<&ExprType> {
        match t {
            ExprType::Array(e) => Some(e),
            _ => None,
        }
    }

    fn to_array_ir(ir: Ir) -> Ir {
        ir
    }

    fn from_array_ir(ir: Ir) -> Ir {
        ir
    }
}

impl CollectionKind for SetKind {
    const NAME: &'static str = "set";

    fn container(elem: ExprType) -> ExprType {
        ExprType::set(elem)
    }

    fn element_of(t: &ExprType) -> Option<&ExprType> {
        match t {
            ExprType::Set(e) => Some(e),
            _ => None,
        }
    }

    fn to_array_ir(ir: Ir) -> Ir {
        Ir::ToArray(Box::new(ir))
    }

    fn from_array_ir(ir: Ir) -> Ir {
        Ir::ToSet(Box::new(ir))
    }
}

/// Array or set façade
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionExpr<K: CollectionKind> {
    expr: Expression,
    kind: PhantomData<K>,
}

impl<K: CollectionKind> ExprLike for CollectionExpr<K> {
    fn expr(&self) -> &Expression {
        &self.expr
    }
}

/// Element type of an array or set expression
fn element_type_of<K: CollectionKind>(expr: &Expression) -> ExprResult<ExprType> {
    K::element_of(expr.dtype())
        .cloned()
        .ok_or_else(|| ExprError::expected(K::NAME, expr.dtype()))
}

/// `container.map(f)` over the array form, rebuilt as the same container
fn map_with<K, F>(expr: &Expression, f: F) -> ExprResult<Expression>
where
    K: CollectionKind,
    F: FnOnce(Expression) -> ExprResult<Expression>,
{
    let elem = element_type_of::<K>(expr)?;
    let uid = expr.context().fresh();
    let body = f(expr.variable(&uid, elem))?;
    let ir = K::from_array_ir(Ir::array_map(
        K::to_array_ir(expr.ir().clone()),
        uid,
        body.ir().clone(),
    ));
    let typ = K::container(body.dtype().clone());
    Expression::combine(expr.context(), ir, typ, &[expr, &body])
}

/// Map `f` over the elements of an array or set expression
pub(crate) fn map_elements(
    expr: &Expression,
    f: impl FnOnce(Expression) -> ExprResult<Expression>,
) -> ExprResult<Expression> {
    match expr.dtype() {
        ExprType::Array(_) => map_with::<ArrayKind, _>(expr, f),
        ExprType::Set(_) => map_with::<SetKind, _>(expr, f),
        other => Err(ExprError::expected("array or set", other)),
    }
}

/// Zero and body of a fold or scan after type reconciliation
pub(crate) struct Folded {
    pub(crate) accum_name: String,
    pub(crate) value_name: String,
    pub(crate) zero: Expression,
    pub(crate) body: Expression,
}

impl<K: CollectionKind> CollectionExpr<K> {
    pub(crate) fn wrap(expr: Expression) -> Self {
        CollectionExpr {
            expr,
            kind: PhantomData,
        }
    }

    pub fn into_expression(self) -> Expression {
        self.expr
    }

    pub fn element_type(&self) -> &ExprType {
        self.expr.dtype().element_type().unwrap_or(self.expr.dtype())
    }

    pub(crate) fn ctx(&self) -> &Arc<super::BuildContext> {
        self.expr.context()
    }

    /// Array node over the elements, in iteration order
    pub(crate) fn array_ir(&self) -> Ir {
        K::to_array_ir(self.expr.ir().clone())
    }

    /// The collection viewed as an array expression
    pub(crate) fn as_array(&self) -> Expression {
        self.expr
            .derive(self.array_ir(), ExprType::array(self.element_type().clone()))
    }

    /// Convert and promote `item` to the element type
    pub(crate) fn coerce_item(&self, item: impl ToExpr, what: &str) -> ExprResult<Expression> {
        let item = item.to_expr(self.ctx());
        let elem = self.element_type();
        if !coercer_for(elem).can_coerce(item.dtype()) {
            return Err(ExprError::type_mismatch(format!(
                "{} of '{}' cannot take {} of type '{}'",
                K::NAME,
                elem,
                what,
                item.dtype()
            )));
        }
        item.coerce_to(elem)
    }

    /// Apply `f` to every element
    pub fn map<F, R>(&self, f: F) -> ExprResult<TypedExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let ctx = Arc::clone(self.ctx());
        construct(map_with::<K, _>(&self.expr, |x| {
            Ok(f(x.typed()?)?.to_expr(&ctx))
        })?)
    }

    /// Keep the elements for which `f` is true
    pub fn filter<F, R>(&self, f: F) -> ExprResult<TypedExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let uid = self.ctx().fresh();
        let x = self.expr.variable(&uid, self.element_type().clone());
        let cond = f(x.typed()?)?.to_expr(self.ctx());
        if *cond.dtype() != ExprType::Bool {
            return Err(ExprError::expected("boolean filter predicate", cond.dtype()));
        }
        let ir = K::from_array_ir(Ir::ArrayFilter {
            array: Box::new(self.array_ir()),
            name: uid,
            cond: Box::new(cond.ir().clone()),
        });
        construct(Expression::combine(
            self.ctx(),
            ir,
            self.expr.dtype().clone(),
            &[&self.expr, &cond],
        )?)
    }

    /// Map every element to a container of the same kind and concatenate
    pub fn flatmap<F, R>(&self, f: F) -> ExprResult<TypedExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let uid = self.ctx().fresh();
        let x = self.expr.variable(&uid, self.element_type().clone());
        let body = f(x.typed()?)?.to_expr(self.ctx());
        let inner = K::element_of(body.dtype()).cloned().ok_or_else(|| {
            ExprError::expected(&format!("{} from flatmap function", K::NAME), body.dtype())
        })?;
        let ir = K::from_array_ir(Ir::ArrayFlatMap {
            array: Box::new(self.array_ir()),
            name: uid,
            body: Box::new(K::to_array_ir(body.ir().clone())),
        });
        construct(Expression::combine(
            self.ctx(),
            ir,
            K::container(inner),
            &[&self.expr, &body],
        )?)
    }

    /// Reconcile the types of `zero` and `f(acc, x)`
    ///
    /// The body is promoted to the zero's type when possible. Otherwise the
    /// zero is promoted to the body's type and `f` is rebuilt over an
    /// accumulator of the new type.
    pub(crate) fn reconcile<F, R>(&self, op: &str, f: &F, zero: Expression) -> ExprResult<Folded>
    where
        F: Fn(TypedExpr, TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let accum_name = self.ctx().fresh();
        let value_name = self.ctx().fresh();
        let elem = self.element_type().clone();
        let build = |acc_type: &ExprType| -> ExprResult<Expression> {
            let acc = self.expr.variable(&accum_name, acc_type.clone());
            let x = self.expr.variable(&value_name, elem.clone());
            Ok(f(acc.typed()?, x.typed()?)?.to_expr(self.ctx()))
        };

        let mut zero = zero;
        let mut body = build(zero.dtype())?;
        if body.dtype() != zero.dtype() {
            if coercer_for(zero.dtype()).can_coerce(body.dtype()) {
                body = body.coerce_to(zero.dtype())?;
            } else if coercer_for(body.dtype()).can_coerce(zero.dtype()) {
                let target = body.dtype().clone();
                emit_fold_zero_promoted(op, zero.dtype(), &target);
                zero = zero.coerce_to(&target)?;
                let rebuilt = build(&target)?;
                body = if coercer_for(&target).can_coerce(rebuilt.dtype()) {
                    rebuilt.coerce_to(&target)?
                } else {
                    rebuilt
                };
            }
        }
        if body.dtype() != zero.dtype() {
            return Err(ExprError::type_mismatch(format!(
                "{}: function returns '{}' but zero value has type '{}'",
                op,
                body.dtype(),
                zero.dtype()
            )));
        }
        Ok(Folded {
            accum_name,
            value_name,
            zero,
            body,
        })
    }

    /// Left fold with `f(accumulator, element)`
    pub fn fold<F, R, Z>(&self, f: F, zero: Z) -> ExprResult<TypedExpr>
    where
        F: Fn(TypedExpr, TypedExpr) -> ExprResult<R>,
        R: ToExpr,
        Z: ToExpr,
    {
        let zero = zero.to_expr(self.ctx());
        let folded = self.reconcile("fold", &f, zero)?;
        let typ = folded.zero.dtype().clone();
        let ir = Ir::ArrayFold {
            array: Box::new(self.array_ir()),
            zero: Box::new(folded.zero.ir().clone()),
            accum_name: folded.accum_name,
            value_name: folded.value_name,
            body: Box::new(folded.body.ir().clone()),
        };
        construct(Expression::combine(
            self.ctx(),
            ir,
            typ,
            &[&self.expr, &folded.zero, &folded.body],
        )?)
    }

    /// True if `f` holds for some element; false when empty
    pub fn any<F, R>(&self, f: F) -> ExprResult<BooleanExpr>
    where
        F: Fn(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        self.fold(
            |acc, x| acc.into_bool()?.or(f(x)?),
            false,
        )?
        .into_bool()
    }

    /// True if `f` holds for every element; true when empty
    pub fn all<F, R>(&self, f: F) -> ExprResult<BooleanExpr>
    where
        F: Fn(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        self.fold(
            |acc, x| acc.into_bool()?.and(f(x)?),
            true,
        )?
        .into_bool()
    }

    /// First element for which `f` holds, missing if there is none
    pub fn find<F, R>(&self, f: F) -> ExprResult<TypedExpr>
    where
        F: Fn(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let missing = missing_like(&self.expr, self.element_type().clone());
        self.fold(
            |acc, x| {
                let hit = acc.is_missing().and(f(x.clone())?)?;
                if_else_expr(hit.into_expression(), x.into_expression(), acc.into_expression())
            },
            missing,
        )
    }

    /// Group elements by `f`, giving a dict of key to array of elements
    pub fn group_by<F, R>(&self, f: F) -> ExprResult<DictExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let ctx = Arc::clone(self.ctx());
        let keyed = map_with::<ArrayKind, _>(&self.as_array(), |x| {
            let key = f(x.clone().typed()?)?.to_expr(&ctx);
            make_tuple(&ctx, vec![key, x])
        })?;
        let key_type = match keyed.dtype().element_type() {
            Some(ExprType::Tuple(kv)) => kv[0].clone(),
            _ => return Err(ExprError::expected("keyed array", keyed.dtype())),
        };
        let typ = ExprType::dict(key_type, ExprType::array(self.element_type().clone()));
        let ir = Ir::GroupByKey(Box::new(keyed.ir().clone()));
        Ok(DictExpr::wrap(keyed.derive(ir, typ)))
    }

    /// True if some element equals `item`
    pub fn contains(&self, item: impl ToExpr) -> ExprResult<BooleanExpr> {
        let item = self.coerce_item(item, "an item")?;
        Ok(BooleanExpr::wrap(self.expr.method(
            "contains",
            ExprType::Bool,
            vec![item],
        )?))
    }

    /// Number of elements
    pub fn length(&self) -> NumericExpr {
        NumericExpr::wrap(
            self.expr
                .derive(Ir::ArrayLen(Box::new(self.array_ir())), ExprType::Int32),
        )
    }
}
