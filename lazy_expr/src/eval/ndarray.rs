//! NDArray nodes.
//!
//! Arrays are row-major `NDArrayValue`s. Broadcasting aligns shapes on the
//! right and stretches extents of 1; the matrix kernel goes through
//! `nalgebra::DMatrix` one batch at a time.

// SAFETY: u64/i64→usize casts are on extents of in-memory arrays and on
// positions already clamped to them.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::fs;

use lazy_expr_runtime::{
    cast, dynamic_binop, BinOp, NDArrayValue, RuntimeError, RuntimeResult, ScalarKind, Value,
};
use nalgebra::DMatrix;
use tracing::debug;

use super::arrays::{into_array, resolve_index, stepped};
use super::{expected, index_value, present, Scope};
use crate::ir::Ir;
use crate::types::ExprType;

fn into_ndarray(value: Value) -> RuntimeResult<NDArrayValue> {
    match value {
        Value::NDArray(nd) => Ok(nd),
        other => Err(expected("ndarray", &other)),
    }
}

fn into_tuple(value: Value, what: &str) -> RuntimeResult<Vec<Value>> {
    match value {
        Value::Tuple(items) => Ok(items),
        other => Err(expected(what, &other)),
    }
}

/// Scalar kind of the elements of an ndarray-typed node, if known
fn element_kind(nd: &Ir) -> Option<ScalarKind> {
    match nd.infer_type().ok()? {
        ExprType::NDArray(elem, _) => elem.scalar_kind(),
        _ => None,
    }
}

fn extents(shape: Vec<Value>) -> RuntimeResult<Vec<u64>> {
    shape
        .iter()
        .map(|v| {
            let e = index_value(v, "int64 extent")?;
            u64::try_from(e).map_err(|_| {
                RuntimeError::shape_error(format!("negative extent {} in shape", e))
            })
        })
        .collect()
}

/// Shape of a reshape target; one extent of -1 is inferred from the rest
fn reshape_extents(shape: Vec<Value>, total: usize) -> RuntimeResult<Vec<u64>> {
    let dims = shape
        .iter()
        .map(|v| index_value(v, "int64 extent"))
        .collect::<RuntimeResult<Vec<i64>>>()?;
    let inferred: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] == -1).collect();
    if inferred.len() > 1 {
        return Err(RuntimeError::shape_error("can only infer one extent in reshape"));
    }
    let known: i64 = dims.iter().filter(|&&d| d != -1).product();
    dims.iter()
        .map(|&d| match d {
            -1 if known > 0 && total as i64 % known == 0 => Ok((total as i64 / known) as u64),
            -1 => Err(RuntimeError::shape_error(format!(
                "cannot reshape {} elements into {:?}",
                total, dims
            ))),
            d => u64::try_from(d).map_err(|_| {
                RuntimeError::shape_error(format!("negative extent {} in shape", d))
            }),
        })
        .collect()
}

/// Shape two operands broadcast to
pub(crate) fn broadcast_shape(left: &[u64], right: &[u64]) -> RuntimeResult<Vec<u64>> {
    let ndim = left.len().max(right.len());
    let pad = |s: &[u64], axis: usize| {
        let offset = ndim - s.len();
        if axis < offset {
            1
        } else {
            s[axis - offset]
        }
    };
    (0..ndim)
        .map(|axis| match (pad(left, axis), pad(right, axis)) {
            (l, r) if l == r => Ok(l),
            (1, r) => Ok(r),
            (l, 1) => Ok(l),
            (l, r) => Err(RuntimeError::BroadcastMismatch {
                axis,
                left: l,
                right: r,
            }),
        })
        .collect()
}

/// Flat offset into an array of `shape` read at a broadcast `index`
fn broadcast_offset(shape: &[u64], index: &[u64]) -> usize {
    let skip = index.len() - shape.len();
    let mut offset = 0u64;
    let mut stride = 1u64;
    for (axis, &extent) in shape.iter().enumerate().rev() {
        let i = if extent == 1 { 0 } else { index[skip + axis] };
        offset += i * stride;
        stride *= extent;
    }
    offset as usize
}

impl Scope<'_> {
    pub(super) fn eval_ndarray(&mut self, ir: &Ir) -> RuntimeResult<Value> {
        match ir {
            Ir::MakeNDArray { data, shape } => {
                let data = into_array(present!(self.eval(data)?))?;
                let shape = extents(into_tuple(present!(self.eval(shape)?), "shape tuple")?)?;
                Ok(Value::NDArray(NDArrayValue::new(shape, data)?))
            }
            Ir::NDArrayShape(nd) => {
                let nd = into_ndarray(present!(self.eval(nd)?))?;
                Ok(Value::Tuple(
                    nd.shape.iter().map(|&e| Value::I64(e as i64)).collect(),
                ))
            }
            Ir::NDArrayReshape { nd, shape } => {
                let nd = into_ndarray(present!(self.eval(nd)?))?;
                let dims = into_tuple(present!(self.eval(shape)?), "shape tuple")?;
                let shape = reshape_extents(dims, nd.len())?;
                Ok(Value::NDArray(NDArrayValue::new(shape, nd.data)?))
            }
            Ir::NDArrayRef { nd, indices } => {
                let nd = into_ndarray(present!(self.eval(nd)?))?;
                let mut at = Vec::with_capacity(indices.len());
                for (axis, ir) in indices.iter().enumerate() {
                    let i = index_value(&present!(self.eval(ir)?), "int64 index")?;
                    let extent = nd.shape.get(axis).copied().unwrap_or(0);
                    at.push(resolve_index(i, extent as usize)? as u64);
                }
                Ok(nd.get(&at)?.clone())
            }
            Ir::NDArraySlice { nd, slices } => {
                let nd = into_ndarray(present!(self.eval(nd)?))?;
                let slices = into_tuple(present!(self.eval(slices)?), "slice tuple")?;
                slice(nd, slices).map(Value::NDArray)
            }
            Ir::NDArrayReindex { nd, idx_expr } => {
                let nd = into_ndarray(present!(self.eval(nd)?))?;
                Ok(Value::NDArray(reindex(&nd, idx_expr)?))
            }
            Ir::NDArrayMap { nd, name, body } => {
                let nd = into_ndarray(present!(self.eval(nd)?))?;
                let mut data = Vec::with_capacity(nd.len());
                for item in nd.data {
                    data.push(self.with(name, item, body)?);
                }
                Ok(Value::NDArray(NDArrayValue::new(nd.shape, data)?))
            }
            Ir::NDArrayMap2 {
                left,
                right,
                left_name,
                right_name,
                body,
            } => {
                let l = into_ndarray(present!(self.eval(left)?))?;
                let r = into_ndarray(present!(self.eval(right)?))?;
                let shape = broadcast_shape(&l.shape, &r.shape)?;
                let mut data = Vec::new();
                for index in NDArrayValue::indices(&shape) {
                    let a = l.data[broadcast_offset(&l.shape, &index)].clone();
                    let b = r.data[broadcast_offset(&r.shape, &index)].clone();
                    data.push(self.with2((left_name, a), (right_name, b), body)?);
                }
                Ok(Value::NDArray(NDArrayValue::new(shape, data)?))
            }
            Ir::NDArrayMatMul { left, right } => {
                let kind = element_kind(left).unwrap_or(ScalarKind::Float64);
                let l = into_ndarray(present!(self.eval(left)?))?;
                let r = into_ndarray(present!(self.eval(right)?))?;
                matmul(&l, &r, kind).map(Value::NDArray)
            }
            Ir::NDArrayAgg { nd, axes } => {
                let zero = match element_kind(nd) {
                    Some(kind) => cast(&Value::I32(0), kind)?,
                    None => Value::I32(0),
                };
                let nd = into_ndarray(present!(self.eval(nd)?))?;
                sum_axes(&nd, axes, zero).map(Value::NDArray)
            }
            Ir::NDArrayWrite { nd, path } => {
                let kind = element_kind(nd);
                let value = into_ndarray(present!(self.eval(nd)?))?;
                let path = match present!(self.eval(path)?) {
                    Value::Str(p) => p,
                    other => return Err(expected("str path", &other)),
                };
                write_npy(&value, kind, &path)?;
                Ok(Value::Str(path))
            }
            other => Err(RuntimeError::unsupported(format!(
                "{} is not an ndarray node",
                other.node_name()
            ))),
        }
    }
}

/// Apply one entry per axis: an int64 drops the axis, a `(start, stop,
/// step)` tuple keeps it. Bounds arrive resolved and are only clamped.
fn slice(nd: NDArrayValue, slices: Vec<Value>) -> RuntimeResult<NDArrayValue> {
    if slices.len() != nd.ndim() {
        return Err(RuntimeError::shape_error(format!(
            "{} slice entries for an ndarray of rank {}",
            slices.len(),
            nd.ndim()
        )));
    }
    let mut positions: Vec<Vec<u64>> = Vec::with_capacity(slices.len());
    let mut shape = Vec::new();
    for (entry, &extent) in slices.into_iter().zip(&nd.shape) {
        match entry {
            Value::Tuple(parts) => {
                let [start, stop, step] = parts.as_slice() else {
                    return Err(RuntimeError::type_error("slice entries are (start, stop, step)"));
                };
                let step = index_value(step, "slice step")?;
                if step == 0 {
                    return Err(RuntimeError::SliceStepZero);
                }
                let len = extent as i64;
                let (lo, hi) = if step > 0 { (0, len) } else { (-1, len - 1) };
                let start = index_value(start, "slice start")?.clamp(lo, hi);
                let stop = index_value(stop, "slice stop")?.clamp(lo, hi);
                let axis: Vec<u64> = stepped(start, stop, step)
                    .into_iter()
                    .map(|i| i as u64)
                    .collect();
                shape.push(axis.len() as u64);
                positions.push(axis);
            }
            Value::Missing => return Err(RuntimeError::type_error("missing slice entry")),
            index => {
                let i = resolve_index(index_value(&index, "int64 index")?, extent as usize)?;
                positions.push(vec![i as u64]);
            }
        }
    }

    let kept: Vec<u64> = positions.iter().map(|p| p.len() as u64).collect();
    let mut data = Vec::new();
    for local in NDArrayValue::indices(&kept) {
        let at: Vec<u64> = local
            .iter()
            .zip(&positions)
            .map(|(&i, axis)| axis[i as usize])
            .collect();
        data.push(nd.get(&at)?.clone());
    }
    NDArrayValue::new(shape, data)
}

fn reindex(nd: &NDArrayValue, idx: &[usize]) -> RuntimeResult<NDArrayValue> {
    let rank = nd.ndim();
    let shape: Vec<u64> = idx
        .iter()
        .map(|&src| if src < rank { nd.shape[src] } else { 1 })
        .collect();
    let mut data = Vec::with_capacity(nd.len());
    let mut at = vec![0u64; rank];
    for out in NDArrayValue::indices(&shape) {
        for (&i, &src) in out.iter().zip(idx) {
            if src < rank {
                at[src] = i;
            }
        }
        data.push(nd.get(&at)?.clone());
    }
    NDArrayValue::new(shape, data)
}

fn sum_axes(nd: &NDArrayValue, axes: &[usize], zero: Value) -> RuntimeResult<NDArrayValue> {
    let kept: Vec<usize> = (0..nd.ndim()).filter(|a| !axes.contains(a)).collect();
    let shape: Vec<u64> = kept.iter().map(|&a| nd.shape[a]).collect();
    let count = shape.iter().product::<u64>() as usize;
    let mut out = NDArrayValue::new(shape, vec![zero; count])?;
    let strides = out.strides();
    for (index, value) in NDArrayValue::indices(&nd.shape).zip(&nd.data) {
        let target: u64 = kept
            .iter()
            .zip(&strides)
            .map(|(&a, &stride)| index[a] * stride)
            .sum();
        let slot = &mut out.data[target as usize];
        *slot = dynamic_binop(BinOp::Add, slot, value)?;
    }
    Ok(out)
}

/// Dense matrix of `rows` x `cols` read row-major from `data[base..]`
fn block<T, F>(
    data: &[Value],
    base: usize,
    rows: usize,
    cols: usize,
    conv: F,
) -> RuntimeResult<DMatrix<T>>
where
    T: nalgebra::Scalar,
    F: Fn(&Value) -> Option<T>,
{
    let values = data[base..base + rows * cols]
        .iter()
        .map(|v| conv(v).ok_or_else(|| expected("numeric matmul element", v)))
        .collect::<RuntimeResult<Vec<T>>>()?;
    Ok(DMatrix::from_row_slice(rows, cols, &values))
}

fn matmul(l: &NDArrayValue, r: &NDArrayValue, kind: ScalarKind) -> RuntimeResult<NDArrayValue> {
    let left_vector = l.ndim() == 1;
    let right_vector = r.ndim() == 1;
    let ls: Vec<u64> = if left_vector { vec![1, l.shape[0]] } else { l.shape.clone() };
    let rs: Vec<u64> = if right_vector { vec![r.shape[0], 1] } else { r.shape.clone() };
    if ls.len() < 2 || rs.len() < 2 {
        return Err(RuntimeError::shape_error("matmul operands must have rank at least 1"));
    }

    let (lb, lm) = ls.split_at(ls.len() - 2);
    let (rb, rm) = rs.split_at(rs.len() - 2);
    let (m, k, k2, n) = (lm[0] as usize, lm[1] as usize, rm[0] as usize, rm[1] as usize);
    if k != k2 {
        return Err(RuntimeError::MatMulMismatch {
            left: k as u64,
            right: k2 as u64,
        });
    }
    let batch = broadcast_shape(lb, rb)?;
    debug!(?batch, m, k, n, "matmul");

    let mut data = Vec::with_capacity(batch.iter().product::<u64>() as usize * m * n);
    for index in NDArrayValue::indices(&batch) {
        let lbase = broadcast_offset(lb, &index) * m * k;
        let rbase = broadcast_offset(rb, &index) * k * n;
        if kind.is_integral() {
            // wraps on overflow like scalar integer arithmetic
            let a = block(&l.data, lbase, m, k, Value::as_i64)?;
            let b = block(&r.data, rbase, k, n, Value::as_i64)?;
            for i in 0..m {
                for j in 0..n {
                    let dot = a
                        .row(i)
                        .iter()
                        .zip(b.column(j).iter())
                        .fold(0i64, |acc, (x, y)| acc.wrapping_add(x.wrapping_mul(*y)));
                    data.push(cast(&Value::I64(dot), kind)?);
                }
            }
        } else {
            let a = block(&l.data, lbase, m, k, Value::as_f64)?;
            let b = block(&r.data, rbase, k, n, Value::as_f64)?;
            let c = a * b;
            for i in 0..m {
                for j in 0..n {
                    data.push(cast(&Value::F64(c[(i, j)]), kind)?);
                }
            }
        }
    }

    let mut shape = batch;
    if !left_vector {
        shape.push(m as u64);
    }
    if !right_vector {
        shape.push(n as u64);
    }
    NDArrayValue::new(shape, data)
}

fn write_npy(nd: &NDArrayValue, kind: Option<ScalarKind>, path: &str) -> RuntimeResult<()> {
    if path.contains("://") && !path.starts_with("file://") {
        return Err(RuntimeError::unsupported(format!(
            "writing to remote location '{}'",
            path
        )));
    }
    let kind = kind
        .or_else(|| nd.data.first().and_then(ScalarKind::of))
        .unwrap_or(ScalarKind::Float64);
    let bytes = nd.to_npy_bytes(kind)?;
    fs::write(path.trim_start_matches("file://"), bytes)?;
    debug!(path, elements = nd.len(), kind = kind.name(), "wrote ndarray");
    Ok(())
}
