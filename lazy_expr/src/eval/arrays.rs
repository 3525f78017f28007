//! Array, set and dict nodes.
//!
//! Negative indices count from the end and slices
//! clamp instead of failing.

// SAFETY: i64→usize casts are on positions already clamped to [0, len).
#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use std::collections::{BTreeMap, BTreeSet};

use lazy_expr_runtime::{RuntimeError, RuntimeResult, Value};

use super::{expected, index_value, present, Scope};
use crate::ir::Ir;

pub(crate) fn into_array(value: Value) -> RuntimeResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(expected("array", &other)),
    }
}

/// Elements of an array, set or dict (as key/value tuples), in order
pub(crate) fn into_elements(value: Value) -> RuntimeResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Set(items) => Ok(items.into_iter().collect()),
        Value::Dict(entries) => Ok(entries
            .into_iter()
            .map(|(k, v)| Value::Tuple(vec![k, v]))
            .collect()),
        other => Err(expected("collection", &other)),
    }
}

fn key_value(pair: Value) -> RuntimeResult<(Value, Value)> {
    match pair {
        Value::Tuple(kv) if kv.len() == 2 => {
            let mut kv = kv.into_iter();
            match (kv.next(), kv.next()) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err(RuntimeError::type_error("expected (key, value) tuple")),
            }
        }
        other => Err(expected("(key, value) tuple", &other)),
    }
}

/// Resolve a possibly negative position against `len`
pub(crate) fn resolve_index(index: i64, len: usize) -> RuntimeResult<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeError::bounds_error(index, len));
    }
    Ok(resolved as usize)
}

/// Positions selected by a `start:stop:step` slice over `len` elements
pub(crate) fn slice_positions(
    len: usize,
    start: i64,
    stop: Option<i64>,
    step: i64,
) -> RuntimeResult<Vec<usize>> {
    if step == 0 {
        return Err(RuntimeError::SliceStepZero);
    }
    let len = len as i64;
    let wrap = |b: i64| if b < 0 { b + len } else { b };
    let mut out = Vec::new();
    if step > 0 {
        let start = wrap(start).clamp(0, len);
        let stop = stop.map_or(len, |s| wrap(s).clamp(0, len));
        out.extend(stepped(start, stop, step).into_iter().map(|i| i as usize));
    } else {
        let start = wrap(start).clamp(-1, len - 1);
        let stop = stop.map_or(-1, |s| wrap(s).clamp(-1, len - 1));
        out.extend(stepped(start, stop, step).into_iter().map(|i| i as usize));
    }
    Ok(out)
}

/// `start, start + step, ...` up to but excluding `stop`
///
/// Stops early instead of overflowing when a step would leave the `i64`
/// range, so huge steps select just `start`.
pub(crate) fn stepped(start: i64, stop: i64, step: i64) -> Vec<i64> {
    let mut out = Vec::new();
    let mut next = Some(start);
    while let Some(i) = next {
        if (step > 0 && i >= stop) || (step < 0 && i <= stop) {
            break;
        }
        out.push(i);
        next = i.checked_add(step);
    }
    out
}

impl Scope<'_> {
    pub(super) fn eval_collection(&mut self, ir: &Ir) -> RuntimeResult<Value> {
        match ir {
            Ir::MakeArray { elements, .. } => Ok(Value::Array(self.eval_all(elements)?)),
            Ir::ArrayRef { array, index } => {
                let items = into_array(present!(self.eval(array)?))?;
                let index = present!(self.eval(index)?);
                let i = resolve_index(index_value(&index, "integer index")?, items.len())?;
                Ok(items[i].clone())
            }
            Ir::ArrayLen(x) => {
                let len = into_elements(present!(self.eval(x)?))?.len();
                let len = i32::try_from(len)
                    .map_err(|_| RuntimeError::type_error("collection too long for int32"))?;
                Ok(Value::I32(len))
            }
            Ir::ArraySlice {
                array,
                start,
                stop,
                step,
            } => {
                let items = into_array(present!(self.eval(array)?))?;
                let start = index_value(&present!(self.eval(start)?), "slice start")?;
                let stop = match stop {
                    Some(stop) => Some(index_value(&present!(self.eval(stop)?), "slice stop")?),
                    None => None,
                };
                let step = index_value(&present!(self.eval(step)?), "slice step")?;
                let positions = slice_positions(items.len(), start, stop, step)?;
                Ok(Value::Array(
                    positions.into_iter().map(|i| items[i].clone()).collect(),
                ))
            }
            Ir::ArrayRange { start, stop, step } => {
                let start = present!(self.eval(start)?);
                let stop = present!(self.eval(stop)?);
                let step = present!(self.eval(step)?);
                range(&start, &stop, &step)
            }
            Ir::ArrayZip {
                left,
                right,
                left_name,
                right_name,
                body,
            } => {
                let l = into_array(present!(self.eval(left)?))?;
                let r = into_array(present!(self.eval(right)?))?;
                if l.len() != r.len() {
                    return Err(RuntimeError::LengthMismatch {
                        left: l.len(),
                        right: r.len(),
                    });
                }
                let mut out = Vec::with_capacity(l.len());
                for (a, b) in l.into_iter().zip(r) {
                    out.push(self.with2((left_name, a), (right_name, b), body)?);
                }
                Ok(Value::Array(out))
            }
            Ir::ToSet(x) => {
                let items = into_elements(present!(self.eval(x)?))?;
                Ok(Value::Set(items.into_iter().collect()))
            }
            Ir::ToArray(x) => Ok(Value::Array(into_elements(present!(self.eval(x)?))?)),
            Ir::ToDict(x) => {
                let mut out = BTreeMap::new();
                for pair in into_elements(present!(self.eval(x)?))? {
                    let (k, v) = key_value(pair)?;
                    out.insert(k, v);
                }
                Ok(Value::Dict(out))
            }
            Ir::ArrayMap { array, name, body } => {
                let items = into_elements(present!(self.eval(array)?))?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.with(name, item, body)?);
                }
                Ok(Value::Array(out))
            }
            Ir::ArrayFilter { array, name, cond } => {
                let items = into_array(present!(self.eval(array)?))?;
                let mut out = Vec::new();
                for item in items {
                    // a missing predicate drops the element
                    match self.with(name, item.clone(), cond)? {
                        Value::Bool(true) => out.push(item),
                        Value::Bool(false) | Value::Missing => {}
                        other => return Err(expected("bool predicate", &other)),
                    }
                }
                Ok(Value::Array(out))
            }
            Ir::ArrayFlatMap { array, name, body } => {
                let items = into_array(present!(self.eval(array)?))?;
                let mut out = Vec::new();
                for item in items {
                    match self.with(name, item, body)? {
                        Value::Missing => {}
                        inner => out.extend(into_array(inner)?),
                    }
                }
                Ok(Value::Array(out))
            }
            Ir::ArrayFold {
                array,
                zero,
                accum_name,
                value_name,
                body,
            } => {
                let items = into_array(present!(self.eval(array)?))?;
                let mut acc = self.eval(zero)?;
                for item in items {
                    acc = self.with2((accum_name, acc), (value_name, item), body)?;
                }
                Ok(acc)
            }
            Ir::ArrayScan {
                array,
                zero,
                accum_name,
                value_name,
                body,
            } => {
                let items = into_array(present!(self.eval(array)?))?;
                let mut acc = self.eval(zero)?;
                let mut out = Vec::with_capacity(items.len() + 1);
                for item in items {
                    out.push(acc.clone());
                    acc = self.with2((accum_name, acc), (value_name, item), body)?;
                }
                out.push(acc);
                Ok(Value::Array(out))
            }
            Ir::GroupByKey(x) => {
                let mut groups: BTreeMap<Value, Vec<Value>> = BTreeMap::new();
                for pair in into_elements(present!(self.eval(x)?))? {
                    let (k, v) = key_value(pair)?;
                    groups.entry(k).or_default().push(v);
                }
                Ok(Value::Dict(
                    groups
                        .into_iter()
                        .map(|(k, vs)| (k, Value::Array(vs)))
                        .collect(),
                ))
            }
            other => Err(RuntimeError::unsupported(format!(
                "{} is not a collection node",
                other.node_name()
            ))),
        }
    }
}

fn range(start: &Value, stop: &Value, step: &Value) -> RuntimeResult<Value> {
    let (a, b, s) = (
        index_value(start, "range start")?,
        index_value(stop, "range stop")?,
        index_value(step, "range step")?,
    );
    if s == 0 {
        return Err(RuntimeError::SliceStepZero);
    }
    let make = |v: i64| match start {
        Value::I64(_) => Value::I64(v),
        _ => Value::I32(v as i32),
    };
    let mut out = Vec::new();
    let mut i = a;
    while (s > 0 && i < b) || (s < 0 && i > b) {
        out.push(make(i));
        i += s;
    }
    Ok(Value::Array(out))
}

/// Set of the elements of a set or array value
pub(crate) fn into_set(value: Value) -> RuntimeResult<BTreeSet<Value>> {
    match value {
        Value::Set(items) => Ok(items),
        Value::Array(items) => Ok(items.into_iter().collect()),
        other => Err(expected("set", &other)),
    }
}
