//! Typing rules for IR nodes.
//!
//! Every node's type follows from its children alone: references carry the
//! type of what they name, so no environment is threaded through.

use lazy_expr_runtime::{BinOp, UnaryOp};

use super::Ir;
use crate::error::{ExprError, ExprResult};
use crate::types::ExprType;

fn malformed(node: &str, detail: impl std::fmt::Display) -> ExprError {
    ExprError::type_mismatch(format!("malformed {} node: {}", node, detail))
}

fn array_element(node: &str, t: ExprType) -> ExprResult<ExprType> {
    match t {
        ExprType::Array(e) => Ok(*e),
        other => Err(malformed(node, format!("expected array, found '{}'", other))),
    }
}

fn ndarray_parts(node: &str, t: ExprType) -> ExprResult<(ExprType, usize)> {
    match t {
        ExprType::NDArray(e, n) => Ok((*e, n)),
        other => Err(malformed(node, format!("expected ndarray, found '{}'", other))),
    }
}

fn key_value_pair(node: &str, t: ExprType) -> ExprResult<(ExprType, ExprType)> {
    match array_element(node, t)? {
        ExprType::Tuple(mut kv) if kv.len() == 2 => {
            let v = kv.pop();
            let k = kv.pop();
            match (k, v) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err(malformed(node, "expected (key, value) tuples")),
            }
        }
        other => Err(malformed(
            node,
            format!("expected (key, value) tuples, found '{}'", other),
        )),
    }
}

/// Result rank of a matrix product
pub(crate) fn matmul_ndim(left: usize, right: usize) -> usize {
    match (left, right) {
        (1, 1) => 0,
        (1, n) | (n, 1) => n.saturating_sub(1),
        (l, r) => l.max(r),
    }
}

impl Ir {
    /// Elaborate the type of this node
    pub fn infer_type(&self) -> ExprResult<ExprType> {
        let t = match self {
            Ir::True | Ir::False => ExprType::Bool,
            Ir::I32(_) => ExprType::Int32,
            Ir::I64(_) => ExprType::Int64,
            Ir::F32(_) => ExprType::Float32,
            Ir::F64(_) => ExprType::Float64,
            Ir::Str(_) => ExprType::Str,
            Ir::NA(t) => t.clone(),
            Ir::Ref { typ, .. } | Ir::TopLevelReference { typ, .. } => typ.clone(),
            Ir::Let { body, .. } => body.infer_type()?,
            Ir::If { then, .. } => then.infer_type()?,
            Ir::IsNA(_) => ExprType::Bool,
            Ir::Die { typ, .. } | Ir::Cast { typ, .. } => typ.clone(),
            Ir::ApplyBinaryPrimOp { op, left, .. } => {
                let lt = left.infer_type()?;
                match op {
                    BinOp::Div if lt.is_integral() => ExprType::Float32,
                    BinOp::Pow => ExprType::Float64,
                    _ => lt,
                }
            }
            Ir::ApplyUnaryPrimOp { op, value } => match op {
                UnaryOp::Not => ExprType::Bool,
                UnaryOp::Neg => value.infer_type()?,
            },
            Ir::ApplyComparisonOp { .. } => ExprType::Bool,
            Ir::Apply { ret_type, .. } | Ir::ApplyAggOp { ret_type, .. } => ret_type.clone(),

            Ir::MakeArray { elem_type, .. } => ExprType::array(elem_type.clone()),
            Ir::ArrayRef { array, .. } => array_element("ArrayRef", array.infer_type()?)?,
            Ir::ArrayLen(_) => ExprType::Int32,
            Ir::ArraySlice { array, .. } => array.infer_type()?,
            Ir::ArrayRange { start, .. } => ExprType::array(start.infer_type()?),
            Ir::ArrayZip { body, .. } | Ir::ArrayMap { body, .. } => {
                ExprType::array(body.infer_type()?)
            }
            Ir::ToSet(x) => match x.infer_type()? {
                ExprType::Array(e) | ExprType::Set(e) => ExprType::Set(e),
                other => return Err(malformed("ToSet", format!("found '{}'", other))),
            },
            Ir::ToArray(x) => match x.infer_type()? {
                ExprType::Array(e) | ExprType::Set(e) => ExprType::Array(e),
                ExprType::Dict(k, v) => ExprType::array(ExprType::Tuple(vec![*k, *v])),
                other => return Err(malformed("ToArray", format!("found '{}'", other))),
            },
            Ir::ToDict(x) => {
                let (k, v) = key_value_pair("ToDict", x.infer_type()?)?;
                ExprType::dict(k, v)
            }
            Ir::ArrayFilter { array, .. } => array.infer_type()?,
            Ir::ArrayFlatMap { body, .. } => {
                ExprType::array(array_element("ArrayFlatMap", body.infer_type()?)?)
            }
            Ir::ArrayFold { zero, .. } => zero.infer_type()?,
            Ir::ArrayScan { zero, .. } => ExprType::array(zero.infer_type()?),
            Ir::GroupByKey(x) => {
                let (k, v) = key_value_pair("GroupByKey", x.infer_type()?)?;
                ExprType::dict(k, ExprType::array(v))
            }

            Ir::MakeStruct(fields) => ExprType::Struct(
                fields
                    .iter()
                    .map(|(n, ir)| Ok((n.clone(), ir.infer_type()?)))
                    .collect::<ExprResult<_>>()?,
            ),
            Ir::SelectFields { old, fields } => {
                let old_t = old.infer_type()?;
                let mut out = Vec::with_capacity(fields.len());
                for name in fields {
                    let t = old_t
                        .field_type(name)
                        .ok_or_else(|| malformed("SelectFields", format!("no field '{}'", name)))?;
                    out.push((name.clone(), t.clone()));
                }
                ExprType::Struct(out)
            }
            Ir::InsertFields {
                old,
                fields,
                field_order,
            } => {
                let mut out = match old.infer_type()? {
                    ExprType::Struct(f) => f,
                    other => return Err(malformed("InsertFields", format!("found '{}'", other))),
                };
                for (name, ir) in fields {
                    let t = ir.infer_type()?;
                    match out.iter_mut().find(|(n, _)| n == name) {
                        Some(slot) => slot.1 = t,
                        None => out.push((name.clone(), t)),
                    }
                }
                if let Some(order) = field_order {
                    let mut ordered = Vec::with_capacity(order.len());
                    for name in order {
                        let pos = out.iter().position(|(n, _)| n == name).ok_or_else(|| {
                            malformed("InsertFields", format!("no field '{}' to order", name))
                        })?;
                        ordered.push(out[pos].clone());
                    }
                    out = ordered;
                }
                ExprType::Struct(out)
            }
            Ir::GetField { o, name } => {
                let t = o.infer_type()?;
                t.field_type(name)
                    .cloned()
                    .ok_or_else(|| malformed("GetField", format!("'{}' has no field '{}'", t, name)))?
            }
            Ir::MakeTuple(elements) => ExprType::Tuple(
                elements
                    .iter()
                    .map(Ir::infer_type)
                    .collect::<ExprResult<_>>()?,
            ),
            Ir::GetTupleElement { o, idx } => match o.infer_type()? {
                ExprType::Tuple(mut types) if *idx < types.len() => types.swap_remove(*idx),
                other => {
                    return Err(malformed(
                        "GetTupleElement",
                        format!("no element {} in '{}'", idx, other),
                    ))
                }
            },

            Ir::MakeNDArray { data, shape } => {
                let elem = array_element("MakeNDArray", data.infer_type()?)?;
                match shape.infer_type()? {
                    ExprType::Tuple(dims) => ExprType::ndarray(elem, dims.len()),
                    other => return Err(malformed("MakeNDArray", format!("shape '{}'", other))),
                }
            }
            Ir::NDArrayShape(nd) => {
                let (_, n) = ndarray_parts("NDArrayShape", nd.infer_type()?)?;
                ExprType::Tuple(vec![ExprType::Int64; n])
            }
            Ir::NDArrayReshape { nd, shape } => {
                let (elem, _) = ndarray_parts("NDArrayReshape", nd.infer_type()?)?;
                match shape.infer_type()? {
                    ExprType::Tuple(dims) => ExprType::ndarray(elem, dims.len()),
                    other => return Err(malformed("NDArrayReshape", format!("shape '{}'", other))),
                }
            }
            Ir::NDArrayRef { nd, .. } => ndarray_parts("NDArrayRef", nd.infer_type()?)?.0,
            Ir::NDArraySlice { nd, slices } => {
                let (elem, _) = ndarray_parts("NDArraySlice", nd.infer_type()?)?;
                match slices.infer_type()? {
                    ExprType::Tuple(entries) => {
                        let kept = entries
                            .iter()
                            .filter(|t| matches!(t, ExprType::Tuple(_)))
                            .count();
                        ExprType::ndarray(elem, kept)
                    }
                    other => return Err(malformed("NDArraySlice", format!("slices '{}'", other))),
                }
            }
            Ir::NDArrayReindex { nd, idx_expr } => {
                let (elem, _) = ndarray_parts("NDArrayReindex", nd.infer_type()?)?;
                ExprType::ndarray(elem, idx_expr.len())
            }
            Ir::NDArrayMap { nd, body, .. } => {
                let (_, n) = ndarray_parts("NDArrayMap", nd.infer_type()?)?;
                ExprType::ndarray(body.infer_type()?, n)
            }
            Ir::NDArrayMap2 {
                left, right, body, ..
            } => {
                let (_, l) = ndarray_parts("NDArrayMap2", left.infer_type()?)?;
                let (_, r) = ndarray_parts("NDArrayMap2", right.infer_type()?)?;
                ExprType::ndarray(body.infer_type()?, l.max(r))
            }
            Ir::NDArrayMatMul { left, right } => {
                let (elem, l) = ndarray_parts("NDArrayMatMul", left.infer_type()?)?;
                let (_, r) = ndarray_parts("NDArrayMatMul", right.infer_type()?)?;
                ExprType::ndarray(elem, matmul_ndim(l, r))
            }
            Ir::NDArrayAgg { nd, axes } => {
                let (elem, n) = ndarray_parts("NDArrayAgg", nd.infer_type()?)?;
                if axes.len() > n {
                    return Err(malformed("NDArrayAgg", "more axes than dimensions"));
                }
                ExprType::ndarray(elem, n - axes.len())
            }
            Ir::NDArrayWrite { .. } => ExprType::Str,
        };
        Ok(t)
    }
}
