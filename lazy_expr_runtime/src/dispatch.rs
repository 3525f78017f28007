//! Scalar operator dispatch
//!
//! Evaluates the primitive binary, unary and comparison operators that the
//! builder emits. Operands arrive already unified to one numeric kind, so
//! the dispatch tables only pair like with like. Any missing operand makes
//! the result missing.

// SAFETY: i64→i32 cast in pow is guarded by a range check.
#![allow(clippy::cast_possible_truncation)]

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// True division; integer operands produce float32
    Div,
    /// Division rounded toward negative infinity
    FloorDiv,
    /// Remainder with the sign of the divisor
    Mod,
    /// Exponentiation; always float64
    Pow,
}

impl BinOp {
    /// Operator symbol as rendered in IR text
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }

    /// Parse an operator symbol
    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "+" => Some(BinOp::Add),
            "-" => Some(BinOp::Sub),
            "*" => Some(BinOp::Mul),
            "/" => Some(BinOp::Div),
            "//" => Some(BinOp::FloorDiv),
            "%" => Some(BinOp::Mod),
            "**" => Some(BinOp::Pow),
            _ => None,
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompOp::Lt => "<",
            CompOp::Le => "<=",
            CompOp::Gt => ">",
            CompOp::Ge => ">=",
            CompOp::Eq => "==",
            CompOp::Ne => "!=",
        }
    }

    fn holds(&self, ord: Ordering) -> bool {
        match self {
            CompOp::Lt => ord == Ordering::Less,
            CompOp::Le => ord != Ordering::Greater,
            CompOp::Gt => ord == Ordering::Greater,
            CompOp::Ge => ord != Ordering::Less,
            CompOp::Eq => ord == Ordering::Equal,
            CompOp::Ne => ord != Ordering::Equal,
        }
    }
}

/// Apply a binary arithmetic operator
pub fn dynamic_binop(op: BinOp, lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    if lhs.is_missing() || rhs.is_missing() {
        return Ok(Value::Missing);
    }
    match op {
        BinOp::Add => dynamic_add(lhs, rhs),
        BinOp::Sub => arith(op, lhs, rhs, i32::wrapping_sub, i64::wrapping_sub, |a, b| a - b),
        BinOp::Mul => arith(op, lhs, rhs, i32::wrapping_mul, i64::wrapping_mul, |a, b| a * b),
        BinOp::Div => dynamic_div(lhs, rhs),
        BinOp::FloorDiv => dynamic_floor_div(lhs, rhs),
        BinOp::Mod => dynamic_mod(lhs, rhs),
        BinOp::Pow => dynamic_pow(lhs, rhs),
    }
}

/// Apply a unary operator
pub fn dynamic_unop(op: UnaryOp, operand: &Value) -> RuntimeResult<Value> {
    match (op, operand) {
        (_, Value::Missing) => Ok(Value::Missing),
        (UnaryOp::Neg, Value::I32(v)) => Ok(Value::I32(v.wrapping_neg())),
        (UnaryOp::Neg, Value::I64(v)) => Ok(Value::I64(v.wrapping_neg())),
        (UnaryOp::Neg, Value::F32(v)) => Ok(Value::F32(-v)),
        (UnaryOp::Neg, Value::F64(v)) => Ok(Value::F64(-v)),
        (UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
        _ => Err(RuntimeError::type_error(format!(
            "no operator {} for {}",
            op.as_str(),
            operand.type_name()
        ))),
    }
}

/// Apply a comparison operator. Missing operands yield missing.
pub fn dynamic_compare(op: CompOp, lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    if lhs.is_missing() || rhs.is_missing() {
        return Ok(Value::Missing);
    }
    let ord = match (lhs, rhs) {
        (Value::F32(a), Value::F32(b)) => a.partial_cmp(b),
        (Value::F64(a), Value::F64(b)) => a.partial_cmp(b),
        _ if std::mem::discriminant(lhs) == std::mem::discriminant(rhs) => Some(lhs.cmp(rhs)),
        _ => return Err(operand_error(op.as_str(), lhs, rhs)),
    };
    // NaN compares unequal to everything
    Ok(Value::Bool(match ord {
        Some(ord) => op.holds(ord),
        None => op == CompOp::Ne,
    }))
}

fn operand_error(sym: &str, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "no operator {} for ({}, {})",
        sym,
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn arith(
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
    i32_op: fn(i32, i32) -> i32,
    i64_op: fn(i64, i64) -> i64,
    f_op: fn(f64, f64) -> f64,
) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::I32(a), Value::I32(b)) => Ok(Value::I32(i32_op(*a, *b))),
        (Value::I64(a), Value::I64(b)) => Ok(Value::I64(i64_op(*a, *b))),
        (Value::F32(a), Value::F32(b)) => Ok(Value::F32(f_op(*a as f64, *b as f64) as f32)),
        (Value::F64(a), Value::F64(b)) => Ok(Value::F64(f_op(*a, *b))),
        _ => Err(operand_error(op.as_str(), lhs, rhs)),
    }
}

fn dynamic_add(lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        _ => arith(BinOp::Add, lhs, rhs, i32::wrapping_add, i64::wrapping_add, |a, b| a + b),
    }
}

fn dynamic_div(lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::I32(_), Value::I32(_)) | (Value::I64(_), Value::I64(_)) => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            match (a, b) {
                (Some(a), Some(b)) => Ok(Value::F32((a / b) as f32)),
                _ => Err(operand_error("/", lhs, rhs)),
            }
        }
        (Value::F32(a), Value::F32(b)) => Ok(Value::F32(a / b)),
        (Value::F64(a), Value::F64(b)) => Ok(Value::F64(a / b)),
        _ => Err(operand_error("/", lhs, rhs)),
    }
}

fn floor_div_i64(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    if (a.wrapping_rem(b) != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn floor_mod_i64(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

fn floor_mod_f64(a: f64, b: f64) -> f64 {
    a - b * (a / b).floor()
}

fn dynamic_floor_div(lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::I32(_), Value::I32(0)) | (Value::I64(_), Value::I64(0)) => {
            Err(RuntimeError::DivisionByZero)
        }
        (Value::I32(a), Value::I32(b)) => Ok(Value::I32(floor_div_i64(*a as i64, *b as i64) as i32)),
        (Value::I64(a), Value::I64(b)) => Ok(Value::I64(floor_div_i64(*a, *b))),
        (Value::F32(a), Value::F32(b)) => Ok(Value::F32((a / b).floor())),
        (Value::F64(a), Value::F64(b)) => Ok(Value::F64((a / b).floor())),
        _ => Err(operand_error("//", lhs, rhs)),
    }
}

fn dynamic_mod(lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::I32(_), Value::I32(0)) | (Value::I64(_), Value::I64(0)) => {
            Err(RuntimeError::DivisionByZero)
        }
        (Value::I32(a), Value::I32(b)) => Ok(Value::I32(floor_mod_i64(*a as i64, *b as i64) as i32)),
        (Value::I64(a), Value::I64(b)) => Ok(Value::I64(floor_mod_i64(*a, *b))),
        (Value::F32(a), Value::F32(b)) => {
            Ok(Value::F32(floor_mod_f64(*a as f64, *b as f64) as f32))
        }
        (Value::F64(a), Value::F64(b)) => Ok(Value::F64(floor_mod_f64(*a, *b))),
        _ => Err(operand_error("%", lhs, rhs)),
    }
}

fn dynamic_pow(lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match (lhs.as_f64(), rhs) {
        (Some(a), Value::I32(b)) => Ok(Value::F64(a.powi(*b))),
        (Some(a), Value::I64(b)) if i32::try_from(*b).is_ok() => Ok(Value::F64(a.powi(*b as i32))),
        (Some(a), other) => match other.as_f64() {
            Some(b) => Ok(Value::F64(a.powf(b))),
            None => Err(operand_error("**", lhs, rhs)),
        },
        (None, _) => Err(operand_error("**", lhs, rhs)),
    }
}
