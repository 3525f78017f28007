//! Shared helpers for integration tests
// Each test target uses a different subset of these helpers.
#![allow(dead_code)]

use lazy_expr::prelude::*;

/// Evaluate on a fresh interpreter, panicking on failure
pub fn eval(e: &impl ExprLike) -> Value {
    e.eval(&Interpreter::new())
        .unwrap_or_else(|err| panic!("evaluation failed: {}", err))
}

/// Evaluate and return the deferred runtime failure
pub fn eval_err(e: &impl ExprLike) -> RuntimeError {
    match e.eval(&Interpreter::new()) {
        Err(ExprError::Execution(err)) => err,
        Err(other) => panic!("expected a runtime error, got {}", other),
        Ok(value) => panic!("expected a runtime error, got {}", value),
    }
}

pub fn ints(values: &[i32]) -> Value {
    Value::from(values.to_vec())
}

pub fn longs(values: &[i64]) -> Value {
    Value::from(values.to_vec())
}

pub fn strs(values: &[&str]) -> Value {
    Value::from(values.to_vec())
}

/// Shape and int64 data of an ndarray value
pub fn nd_parts(value: Value) -> (Vec<u64>, Vec<i64>) {
    match value {
        Value::NDArray(nd) => {
            let data = nd
                .data
                .iter()
                .map(|v| v.as_i64().expect("integral element"))
                .collect();
            (nd.shape, data)
        }
        other => panic!("expected ndarray, got {}", other),
    }
}
