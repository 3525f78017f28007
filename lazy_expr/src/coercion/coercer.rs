//! Per-type coercers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::diagnostics::emit_lossy_promotion;
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::names::NameGenerator;
use crate::types::ExprType;

/// Coercer cache, one entry per distinct target type
static COERCERS: Lazy<RwLock<HashMap<ExprType, Arc<Coercer>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

#[derive(Debug)]
enum CoercerKind {
    /// Only the identical type coerces
    Exact,
    /// Numeric promotion along int32 < int64 < float32 < float64
    Numeric(u8),
    Array(Arc<Coercer>),
    Set(Arc<Coercer>),
    Dict(Arc<Coercer>, Arc<Coercer>),
    Struct(Vec<(String, Arc<Coercer>)>),
    Tuple(Vec<Arc<Coercer>>),
    NDArray(Arc<Coercer>, usize),
}

/// Promotion of values into one target type
///
/// Stateless; composite coercers hold the coercers of their parts.
#[derive(Debug)]
pub struct Coercer {
    target: ExprType,
    kind: CoercerKind,
}

/// Get the (cached) coercer targeting `target`
pub fn coercer_for(target: &ExprType) -> Arc<Coercer> {
    if let Ok(cache) = COERCERS.read() {
        if let Some(c) = cache.get(target) {
            return Arc::clone(c);
        }
    }
    let coercer = Arc::new(Coercer::build(target));
    if let Ok(mut cache) = COERCERS.write() {
        cache
            .entry(target.clone())
            .or_insert_with(|| Arc::clone(&coercer));
    }
    coercer
}

/// True if a numeric promotion from `from` to `to` can lose precision
fn is_lossy(from: &ExprType, to: &ExprType) -> bool {
    matches!(
        (from, to),
        (ExprType::Int32 | ExprType::Int64, ExprType::Float32)
            | (ExprType::Int64, ExprType::Float64)
    )
}

impl Coercer {
    fn build(target: &ExprType) -> Self {
        let kind = match target {
            ExprType::Int32 | ExprType::Int64 | ExprType::Float32 | ExprType::Float64 => {
                match target.numeric_rank() {
                    Some(rank) => CoercerKind::Numeric(rank),
                    None => CoercerKind::Exact,
                }
            }
            ExprType::Array(e) => CoercerKind::Array(coercer_for(e)),
            ExprType::Set(e) => CoercerKind::Set(coercer_for(e)),
            ExprType::Dict(k, v) => CoercerKind::Dict(coercer_for(k), coercer_for(v)),
            ExprType::Struct(fields) => CoercerKind::Struct(
                fields
                    .iter()
                    .map(|(n, t)| (n.clone(), coercer_for(t)))
                    .collect(),
            ),
            ExprType::Tuple(types) => CoercerKind::Tuple(types.iter().map(coercer_for).collect()),
            ExprType::NDArray(e, n) => CoercerKind::NDArray(coercer_for(e), *n),
            ExprType::Bool
            | ExprType::Str
            | ExprType::Call
            | ExprType::Locus(_)
            | ExprType::Interval(_) => CoercerKind::Exact,
        };
        Coercer {
            target: target.clone(),
            kind,
        }
    }

    pub fn target(&self) -> &ExprType {
        &self.target
    }

    /// True if a value of type `from` can be promoted to the target
    pub fn can_coerce(&self, from: &ExprType) -> bool {
        if *from == self.target {
            return true;
        }
        match (&self.kind, from) {
            (CoercerKind::Exact, _) => false,
            (CoercerKind::Numeric(rank), _) => from.numeric_rank().is_some_and(|r| r <= *rank),
            (CoercerKind::Array(c), ExprType::Array(e)) | (CoercerKind::Set(c), ExprType::Set(e)) => {
                c.can_coerce(e)
            }
            (CoercerKind::Dict(kc, vc), ExprType::Dict(k, v)) => kc.can_coerce(k) && vc.can_coerce(v),
            (CoercerKind::Struct(cs), ExprType::Struct(fields)) => {
                cs.len() == fields.len()
                    && cs
                        .iter()
                        .zip(fields)
                        .all(|((cn, c), (n, t))| cn == n && c.can_coerce(t))
            }
            (CoercerKind::Tuple(cs), ExprType::Tuple(types)) => {
                cs.len() == types.len() && cs.iter().zip(types).all(|(c, t)| c.can_coerce(t))
            }
            (CoercerKind::NDArray(c, n), ExprType::NDArray(e, m)) => n == m && c.can_coerce(e),
            _ => false,
        }
    }

    /// Wrap `ir` (of type `from`) so that it produces the target type
    ///
    /// A no-op when the types already match.
    pub fn coerce_ir(&self, ir: Ir, from: &ExprType, names: &NameGenerator) -> ExprResult<Ir> {
        if *from == self.target {
            return Ok(ir);
        }
        if !self.can_coerce(from) {
            return Err(ExprError::type_mismatch(format!(
                "cannot coerce '{}' to '{}'",
                from, self.target
            )));
        }
        let out = match (&self.kind, from) {
            (CoercerKind::Numeric(_), _) => {
                if is_lossy(from, &self.target) {
                    emit_lossy_promotion(from, &self.target);
                }
                Ir::cast(ir, self.target.clone())
            }
            (CoercerKind::Array(c), ExprType::Array(e)) => {
                let uid = names.fresh();
                let body = c.coerce_ir(Ir::reference(uid.clone(), (**e).clone()), e, names)?;
                Ir::array_map(ir, uid, body)
            }
            (CoercerKind::Set(c), ExprType::Set(e)) => {
                let uid = names.fresh();
                let body = c.coerce_ir(Ir::reference(uid.clone(), (**e).clone()), e, names)?;
                Ir::ToSet(Box::new(Ir::array_map(Ir::ToArray(Box::new(ir)), uid, body)))
            }
            (CoercerKind::Dict(kc, vc), ExprType::Dict(k, v)) => {
                let uid = names.fresh();
                let pair = ExprType::tuple([(**k).clone(), (**v).clone()]);
                let elem = Ir::reference(uid.clone(), pair);
                let key = kc.coerce_ir(Ir::get_tuple_element(elem.clone(), 0), k, names)?;
                let value = vc.coerce_ir(Ir::get_tuple_element(elem, 1), v, names)?;
                Ir::ToDict(Box::new(Ir::array_map(
                    Ir::ToArray(Box::new(ir)),
                    uid,
                    Ir::MakeTuple(vec![key, value]),
                )))
            }
            (CoercerKind::Struct(cs), ExprType::Struct(fields)) => {
                let uid = names.fresh();
                let bound = Ir::reference(uid.clone(), from.clone());
                let mut made = Vec::with_capacity(cs.len());
                for ((name, c), (_, t)) in cs.iter().zip(fields) {
                    let field = Ir::get_field(bound.clone(), name.clone());
                    made.push((name.clone(), c.coerce_ir(field, t, names)?));
                }
                Ir::let_(uid, ir, Ir::MakeStruct(made))
            }
            (CoercerKind::Tuple(cs), ExprType::Tuple(types)) => {
                let uid = names.fresh();
                let bound = Ir::reference(uid.clone(), from.clone());
                let mut made = Vec::with_capacity(cs.len());
                for (i, (c, t)) in cs.iter().zip(types).enumerate() {
                    made.push(c.coerce_ir(Ir::get_tuple_element(bound.clone(), i), t, names)?);
                }
                Ir::let_(uid, ir, Ir::MakeTuple(made))
            }
            (CoercerKind::NDArray(c, _), ExprType::NDArray(e, _)) => {
                let uid = names.fresh();
                let body = c.coerce_ir(Ir::reference(uid.clone(), (**e).clone()), e, names)?;
                Ir::NDArrayMap {
                    nd: Box::new(ir),
                    name: uid,
                    body: Box::new(body),
                }
            }
            _ => {
                return Err(ExprError::type_mismatch(format!(
                    "cannot coerce '{}' to '{}'",
                    from, self.target
                )))
            }
        };
        tracing::trace!(from = %from, to = %self.target, "coerced");
        Ok(out)
    }
}
