//! Scalar conversion utilities
//!
//! Casting between the primitive scalar kinds. Numeric casts follow the
//! usual widening/narrowing rules of the primitive types; narrowing a
//! float to an integer truncates toward zero and fails when out of range.

// SAFETY: float→int casts are guarded by explicit range checks below.
#![allow(clippy::cast_possible_truncation)]

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;

/// Primitive scalar kinds that can be cast between and stored densely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ScalarKind {
    /// Name used in IR text and error messages
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
        }
    }

    /// NPY dtype descriptor (little-endian)
    pub fn descr(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "|b1",
            ScalarKind::Int32 => "<i4",
            ScalarKind::Int64 => "<i8",
            ScalarKind::Float32 => "<f4",
            ScalarKind::Float64 => "<f8",
        }
    }

    /// Parse an NPY dtype descriptor
    pub fn from_descr(descr: &str) -> Option<Self> {
        match descr {
            "|b1" => Some(ScalarKind::Bool),
            "<i4" => Some(ScalarKind::Int32),
            "<i8" => Some(ScalarKind::Int64),
            "<f4" => Some(ScalarKind::Float32),
            "<f8" => Some(ScalarKind::Float64),
            _ => None,
        }
    }

    /// Width of one element in bytes
    pub fn byte_width(&self) -> usize {
        match self {
            ScalarKind::Bool => 1,
            ScalarKind::Int32 | ScalarKind::Float32 => 4,
            ScalarKind::Int64 | ScalarKind::Float64 => 8,
        }
    }

    /// Kind of a present scalar value
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(ScalarKind::Bool),
            Value::I32(_) => Some(ScalarKind::Int32),
            Value::I64(_) => Some(ScalarKind::Int64),
            Value::F32(_) => Some(ScalarKind::Float32),
            Value::F64(_) => Some(ScalarKind::Float64),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, ScalarKind::Int32 | ScalarKind::Int64)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }
}

/// Cast a scalar to the given kind. Missing stays missing.
pub fn cast(value: &Value, to: ScalarKind) -> RuntimeResult<Value> {
    if value.is_missing() {
        return Ok(Value::Missing);
    }
    match to {
        ScalarKind::Bool => to_bool(value).map(Value::Bool),
        ScalarKind::Int32 => to_i32(value).map(Value::I32),
        ScalarKind::Int64 => to_i64(value).map(Value::I64),
        ScalarKind::Float32 => to_f32(value).map(Value::F32),
        ScalarKind::Float64 => to_f64(value).map(Value::F64),
    }
}

/// Convert a Value to i64
pub fn to_i64(value: &Value) -> RuntimeResult<i64> {
    match value {
        Value::I64(v) => Ok(*v),
        Value::I32(v) => Ok(*v as i64),
        Value::F64(v) => float_to_int(*v, i64::MIN as f64, i64::MAX as f64, "int64").map(|x| x as i64),
        Value::F32(v) => {
            float_to_int(*v as f64, i64::MIN as f64, i64::MAX as f64, "int64").map(|x| x as i64)
        }
        Value::Bool(v) => Ok(i64::from(*v)),
        _ => Err(RuntimeError::type_error(format!(
            "cannot convert {} to int64",
            value.type_name()
        ))),
    }
}

/// Convert a Value to i32
pub fn to_i32(value: &Value) -> RuntimeResult<i32> {
    match value {
        Value::I32(v) => Ok(*v),
        Value::I64(v) => i32::try_from(*v).map_err(|_| {
            RuntimeError::type_error(format!("{} is out of range for int32", v))
        }),
        Value::F64(v) => float_to_int(*v, i32::MIN as f64, i32::MAX as f64, "int32").map(|x| x as i32),
        Value::F32(v) => {
            float_to_int(*v as f64, i32::MIN as f64, i32::MAX as f64, "int32").map(|x| x as i32)
        }
        Value::Bool(v) => Ok(i32::from(*v)),
        _ => Err(RuntimeError::type_error(format!(
            "cannot convert {} to int32",
            value.type_name()
        ))),
    }
}

/// Convert a Value to f64
pub fn to_f64(value: &Value) -> RuntimeResult<f64> {
    match value {
        Value::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
        other => other.as_f64().ok_or_else(|| {
            RuntimeError::type_error(format!("cannot convert {} to float64", other.type_name()))
        }),
    }
}

/// Convert a Value to f32
pub fn to_f32(value: &Value) -> RuntimeResult<f32> {
    match value {
        Value::F32(v) => Ok(*v),
        Value::F64(v) => Ok(*v as f32),
        Value::I64(v) => Ok(*v as f32),
        Value::I32(v) => Ok(*v as f32),
        Value::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
        _ => Err(RuntimeError::type_error(format!(
            "cannot convert {} to float32",
            value.type_name()
        ))),
    }
}

/// Convert a Value to bool (numeric zero is false)
pub fn to_bool(value: &Value) -> RuntimeResult<bool> {
    match value {
        Value::Bool(v) => Ok(*v),
        Value::I32(v) => Ok(*v != 0),
        Value::I64(v) => Ok(*v != 0),
        Value::F32(v) => Ok(*v != 0.0),
        Value::F64(v) => Ok(*v != 0.0),
        _ => Err(RuntimeError::type_error(format!(
            "cannot convert {} to bool",
            value.type_name()
        ))),
    }
}

fn float_to_int(v: f64, min: f64, max: f64, target: &str) -> RuntimeResult<f64> {
    if !v.is_finite() || v < min || v > max {
        return Err(RuntimeError::type_error(format!(
            "{} is out of range for {}",
            v, target
        )));
    }
    Ok(v.trunc())
}
