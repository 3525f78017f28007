//! Engine boundary and reference interpreter.
//!
//! The builder hands a finished `(Ir, ExprType)` pair to a [`Backend`] and
//! gets a [`Value`] back. [`Interpreter`] is the in-process backend used for
//! eager evaluation and tests: a direct tree walk over
//! `lazy_expr_runtime::Value` that raises the deferred errors (length
//! mismatches, zero slice steps, broadcast and matmul extents, bounds).
//!
//! # Module Organization
//!
//! - `mod.rs`: `Backend`, `Interpreter` and the node dispatch
//! - `arrays.rs`: Array, set and dict nodes
//! - `ndarray.rs`: NDArray nodes, including the `nalgebra` matrix kernel
//! - `functions.rs`: Named functions reached through `Apply`
//! - `tests.rs`: Tests

mod arrays;
mod functions;
mod ndarray;
#[cfg(test)]
mod tests;

use std::collections::HashMap;

use lazy_expr_runtime::{
    cast, dynamic_binop, dynamic_compare, dynamic_unop, RuntimeError, RuntimeResult, Value,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::expr::ExprLike;
use crate::ir::Ir;
use crate::types::ExprType;

/// What an out-of-process engine receives: the IR tree and its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub ir: Ir,
    pub typ: ExprType,
}

impl Handoff {
    pub fn of(e: &impl ExprLike) -> Self {
        Handoff {
            ir: e.ir().clone(),
            typ: e.dtype().clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Run on `backend`
    pub fn execute(&self, backend: &dyn Backend) -> RuntimeResult<Value> {
        backend.execute(&self.ir, &self.typ)
    }
}

/// Execution engine for IR trees
///
/// `execute` must return a value whose shape matches `typ`, or a deferred
/// failure. Named values reachable through `TopLevelReference` are supplied
/// with `bind`.
pub trait Backend {
    fn execute(&self, ir: &Ir, typ: &ExprType) -> RuntimeResult<Value>;

    /// Make `value` available to `TopLevelReference` nodes named `name`
    fn bind(&mut self, name: &str, value: Value);
}

/// Tree-walking reference backend
#[derive(Debug, Default, Clone)]
pub struct Interpreter {
    globals: HashMap<String, Value>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `bind`
    pub fn with_global(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bind(name, value.into());
        self
    }
}

impl Backend for Interpreter {
    fn execute(&self, ir: &Ir, typ: &ExprType) -> RuntimeResult<Value> {
        debug!(typ = %typ, root = ir.node_name(), "interpreting");
        let mut scope = Scope::new(&self.globals);
        let value = scope.eval(ir)?;
        trace!(value = %value, "interpreted");
        Ok(value)
    }

    fn bind(&mut self, name: &str, value: Value) {
        debug!(name, kind = value.type_name(), "bound top-level reference");
        self.globals.insert(name.to_string(), value);
    }
}

/// Return `Ok(Value::Missing)` from the enclosing function when the value
/// is missing
macro_rules! present {
    ($value:expr) => {
        match $value {
            Value::Missing => return Ok(Value::Missing),
            v => v,
        }
    };
}
pub(crate) use present;

/// Lexical environment of one evaluation
///
/// Bindings introduced by `Let` and the lambda-style nodes live on a stack;
/// lookup walks it from the innermost binding outwards.
pub(crate) struct Scope<'a> {
    globals: &'a HashMap<String, Value>,
    locals: Vec<(String, Value)>,
}

impl<'a> Scope<'a> {
    fn new(globals: &'a HashMap<String, Value>) -> Self {
        Scope {
            globals,
            locals: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        self.locals
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| RuntimeError::UnboundReference(name.to_string()))
    }

    /// Evaluate `body` with `name` bound to `value`
    pub(crate) fn with(&mut self, name: &str, value: Value, body: &Ir) -> RuntimeResult<Value> {
        self.locals.push((name.to_string(), value));
        let out = self.eval(body);
        self.locals.pop();
        out
    }

    /// Evaluate `body` with two names bound
    pub(crate) fn with2(
        &mut self,
        (n1, v1): (&str, Value),
        (n2, v2): (&str, Value),
        body: &Ir,
    ) -> RuntimeResult<Value> {
        self.locals.push((n1.to_string(), v1));
        self.locals.push((n2.to_string(), v2));
        let out = self.eval(body);
        self.locals.truncate(self.locals.len() - 2);
        out
    }

    pub(crate) fn eval_all(&mut self, irs: &[Ir]) -> RuntimeResult<Vec<Value>> {
        irs.iter().map(|ir| self.eval(ir)).collect()
    }

    pub(crate) fn eval(&mut self, ir: &Ir) -> RuntimeResult<Value> {
        trace!(node = ir.node_name(), "eval");
        match ir {
            Ir::True => Ok(Value::Bool(true)),
            Ir::False => Ok(Value::Bool(false)),
            Ir::I32(v) => Ok(Value::I32(*v)),
            Ir::I64(v) => Ok(Value::I64(*v)),
            Ir::F32(v) => Ok(Value::F32(*v)),
            Ir::F64(v) => Ok(Value::F64(*v)),
            Ir::Str(s) => Ok(Value::Str(s.clone())),
            Ir::NA(_) => Ok(Value::Missing),

            Ir::Ref { name, .. } => self.lookup(name),
            Ir::TopLevelReference { name, .. } => self
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UnboundReference(name.clone())),
            Ir::Let { name, value, body } => {
                let value = self.eval(value)?;
                self.with(name, value, body)
            }
            Ir::If {
                cond,
                then,
                otherwise,
            } => match self.eval(cond)? {
                Value::Missing => Ok(Value::Missing),
                Value::Bool(true) => self.eval(then),
                Value::Bool(false) => self.eval(otherwise),
                other => Err(expected("bool condition", &other)),
            },
            Ir::IsNA(x) => Ok(Value::Bool(self.eval(x)?.is_missing())),
            Ir::Die { message, .. } => Err(RuntimeError::UserError(message.clone())),

            Ir::Cast { value, typ } => {
                let kind = typ.scalar_kind().ok_or_else(|| {
                    RuntimeError::type_error(format!("cannot cast to '{}'", typ))
                })?;
                cast(&self.eval(value)?, kind)
            }
            Ir::ApplyBinaryPrimOp { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                dynamic_binop(*op, &l, &r)
            }
            Ir::ApplyUnaryPrimOp { op, value } => dynamic_unop(*op, &self.eval(value)?),
            Ir::ApplyComparisonOp { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                dynamic_compare(*op, &l, &r)
            }
            Ir::Apply { function, args, .. } => self.apply(function, args),
            Ir::ApplyAggOp { op, .. } => Err(RuntimeError::unsupported(format!(
                "aggregator '{}' needs an engine that scans an axis",
                op
            ))),

            Ir::MakeStruct(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for (name, ir) in fields {
                    out.push((name.clone(), self.eval(ir)?));
                }
                Ok(Value::Struct(out))
            }
            Ir::SelectFields { old, fields } => {
                let old = into_struct(present!(self.eval(old)?))?;
                let mut out = Vec::with_capacity(fields.len());
                for name in fields {
                    out.push((name.clone(), struct_field(&old, name)?));
                }
                Ok(Value::Struct(out))
            }
            Ir::InsertFields {
                old,
                fields,
                field_order,
            } => self.insert_fields(old, fields, field_order.as_deref()),
            Ir::GetField { o, name } => {
                let o = into_struct(present!(self.eval(o)?))?;
                struct_field(&o, name)
            }
            Ir::MakeTuple(elements) => Ok(Value::Tuple(self.eval_all(elements)?)),
            Ir::GetTupleElement { o, idx } => match present!(self.eval(o)?) {
                Value::Tuple(mut items) if *idx < items.len() => Ok(items.swap_remove(*idx)),
                Value::Tuple(items) => Err(RuntimeError::bounds_error(*idx as i64, items.len())),
                other => Err(expected("tuple", &other)),
            },

            Ir::MakeArray { .. }
            | Ir::ArrayRef { .. }
            | Ir::ArrayLen(_)
            | Ir::ArraySlice { .. }
            | Ir::ArrayRange { .. }
            | Ir::ArrayZip { .. }
            | Ir::ToSet(_)
            | Ir::ToArray(_)
            | Ir::ToDict(_)
            | Ir::ArrayMap { .. }
            | Ir::ArrayFilter { .. }
            | Ir::ArrayFlatMap { .. }
            | Ir::ArrayFold { .. }
            | Ir::ArrayScan { .. }
            | Ir::GroupByKey(_) => self.eval_collection(ir),

            Ir::MakeNDArray { .. }
            | Ir::NDArrayShape(_)
            | Ir::NDArrayReshape { .. }
            | Ir::NDArrayRef { .. }
            | Ir::NDArraySlice { .. }
            | Ir::NDArrayReindex { .. }
            | Ir::NDArrayMap { .. }
            | Ir::NDArrayMap2 { .. }
            | Ir::NDArrayMatMul { .. }
            | Ir::NDArrayAgg { .. }
            | Ir::NDArrayWrite { .. } => self.eval_ndarray(ir),
        }
    }

    fn insert_fields(
        &mut self,
        old: &Ir,
        fields: &[(String, Ir)],
        field_order: Option<&[String]>,
    ) -> RuntimeResult<Value> {
        let mut out = into_struct(present!(self.eval(old)?))?;
        for (name, ir) in fields {
            let value = self.eval(ir)?;
            match out.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value,
                None => out.push((name.clone(), value)),
            }
        }
        if let Some(order) = field_order {
            let mut ordered = Vec::with_capacity(order.len());
            for name in order {
                ordered.push((name.clone(), struct_field(&out, name)?));
            }
            out = ordered;
        }
        Ok(Value::Struct(out))
    }
}

pub(crate) fn expected(what: &str, found: &Value) -> RuntimeError {
    RuntimeError::type_error(format!("expected {}, found {}", what, found.type_name()))
}

fn into_struct(value: Value) -> RuntimeResult<Vec<(String, Value)>> {
    match value {
        Value::Struct(fields) => Ok(fields),
        other => Err(expected("struct", &other)),
    }
}

fn struct_field(fields: &[(String, Value)], name: &str) -> RuntimeResult<Value> {
    fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| RuntimeError::type_error(format!("struct has no field '{}'", name)))
}

/// Integer operand of an index or extent
pub(crate) fn index_value(value: &Value, what: &str) -> RuntimeResult<i64> {
    value.as_i64().ok_or_else(|| expected(what, value))
}
