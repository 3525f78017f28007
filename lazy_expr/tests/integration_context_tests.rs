//! Integration tests: context tracking, missing values, configuration and
//! the engine hand-off

mod common;
use common::*;

use lazy_expr::diagnostics::{DiagnosticReason, DiagnosticsCollector};
use lazy_expr::prelude::*;
use pretty_assertions::assert_eq;

fn row_field(b: &Builder, name: &str) -> ExprResult<NumericExpr> {
    b.variable(name, ExprType::Int32, Indices::new(["row"]))?
        .into_numeric()
}

// ==================== Source Axes ====================

#[test]
fn test_literals_adopt_axes_of_indexed_operands() -> ExprResult<()> {
    let b = Builder::new();
    let x = row_field(&b, "x")?;
    let shifted = x.add(1)?;
    assert!(shifted.indices().contains("row"));
    assert!(b.int32(1).indices().is_empty());
    Ok(())
}

#[test]
fn test_different_axes_do_not_combine() -> ExprResult<()> {
    let b = Builder::new();
    let x = row_field(&b, "x")?;
    let y = b
        .variable("y", ExprType::Int32, Indices::new(["col"]))?
        .into_numeric()?;
    let err = x.add(y).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"ContextUnification: cannot combine expressions from {row} and {col}"
    );
    Ok(())
}

#[test]
fn test_eval_requires_global_expression() -> ExprResult<()> {
    let b = Builder::new();
    let x = row_field(&b, "x")?;
    assert!(matches!(
        x.eval(&Interpreter::new()),
        Err(ExprError::ContextUnification { .. })
    ));
    Ok(())
}

// ==================== Aggregation Scopes ====================

#[test]
fn test_aggregate_consumes_axes_and_opens_scope() -> ExprResult<()> {
    let b = Builder::new();
    let x = row_field(&b, "x")?;
    let total = b.aggregate("sum", x.clone(), ExprType::Int64)?;
    assert!(total.indices().is_empty());
    assert_eq!(total.aggregations().len(), 1);

    let mean_ish = total.into_numeric()?.div(2)?;
    assert_eq!(mean_ish.aggregations().len(), 1);
    assert!(matches!(
        mean_ish.eval(&Interpreter::new()),
        Err(ExprError::AggregationScope(_))
    ));
    Ok(())
}

#[test]
fn test_separate_aggregations_stay_distinct() -> ExprResult<()> {
    let b = Builder::new();
    let x = row_field(&b, "x")?;
    let a = b.aggregate("sum", x.clone(), ExprType::Int64)?.into_numeric()?;
    let c = b.aggregate("sum", x, ExprType::Int64)?;
    let both = a.add(c)?;
    assert_eq!(both.aggregations().len(), 2);
    Ok(())
}

// ==================== Missing Values ====================

#[test]
fn test_missing_propagation() -> ExprResult<()> {
    let b = Builder::new();
    let na = b.missing(ExprType::Int32)?;
    assert_eq!(eval(&na.is_missing()), Value::Bool(true));
    assert_eq!(eval(&na.clone().into_numeric()?.add(1)?), Value::Missing);
    assert_eq!(eval(&b.int32(3).is_defined()), Value::Bool(true));

    let unknown = b.missing(ExprType::Bool)?.into_bool()?;
    assert_eq!(eval(&unknown.or(true)?), Value::Bool(true));
    assert_eq!(eval(&unknown.and(true)?), Value::Missing);
    assert_eq!(eval(&unknown.and(false)?), Value::Bool(false));
    Ok(())
}

#[test]
fn test_if_else_unifies_branches() -> ExprResult<()> {
    let b = Builder::new();
    let picked = b.if_else(true, 1i32, 2.5f64)?;
    assert_eq!(*picked.dtype(), ExprType::Float64);
    assert_eq!(eval(&picked), Value::F64(1.0));

    let undecided = b.if_else(b.missing(ExprType::Bool)?, 1i32, 2i32)?;
    assert_eq!(eval(&undecided), Value::Missing);

    assert!(matches!(
        b.if_else(1i32, 1i32, 2i32),
        Err(ExprError::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn test_equality_across_numeric_types() -> ExprResult<()> {
    let b = Builder::new();
    assert_eq!(eval(&b.int32(1).equals(1.0f64)?), Value::Bool(true));
    assert_eq!(eval(&b.str("a").not_equals("b")?), Value::Bool(true));
    assert!(matches!(
        b.str("a").equals(1i32),
        Err(ExprError::TypeMismatch(_))
    ));
    Ok(())
}

// ==================== Engine Hand-off ====================

#[test]
fn test_top_level_reference_is_bound_by_backend() -> ExprResult<()> {
    let b = Builder::new();
    let answer = b
        .reference("threshold", ExprType::Int32)?
        .into_numeric()?
        .add(1)?;
    let backend = Interpreter::new().with_global("threshold", 41i32);
    assert_eq!(answer.eval(&backend)?, Value::I32(42));
    assert!(matches!(
        eval_err(&answer),
        RuntimeError::UnboundReference(_)
    ));
    Ok(())
}

#[test]
fn test_handoff_json_round_trip() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2, 3])?.into_numeric_array()?.mul(2)?;
    let handoff = Handoff::of(&xs);
    assert_eq!(handoff.typ, ExprType::array(ExprType::Int32));

    let json = handoff.to_json().unwrap();
    let back = Handoff::from_json(&json).unwrap();
    assert_eq!(back, handoff);
    assert_eq!(back.execute(&Interpreter::new())?, ints(&[2, 4, 6]));
    Ok(())
}

#[test]
fn test_type_notation_round_trip() {
    let t: ExprType = "dict<str, array<struct{a: int32, b: float64}>>".parse().unwrap();
    assert_eq!(
        t,
        ExprType::dict(
            ExprType::Str,
            ExprType::array(ExprType::struct_([
                ("a", ExprType::Int32),
                ("b", ExprType::Float64),
            ])),
        )
    );
    assert_eq!(t.to_string().parse::<ExprType>().unwrap(), t);
}

// ==================== Configuration ====================

#[test]
fn test_builder_from_config_file() -> ExprResult<()> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lazy_expr.toml");
    std::fs::write(&path, "uid_prefix = \"tmp\"\ndedup_threshold = 3\n").unwrap();

    let config = BuilderConfig::from_path(&path)?;
    assert_eq!(config.dedup_threshold, 3);
    let b = Builder::with_config(config)?;
    let shifted = b.array([1i32])?.into_numeric_array()?.add(1)?;
    assert!(shifted.ir().to_string().contains("tmp_1"));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = BuilderConfig {
        uid_prefix: "not an identifier".to_string(),
        ..BuilderConfig::default()
    };
    assert!(matches!(
        Builder::with_config(config),
        Err(ExprError::Config(_))
    ));
    assert!(matches!(
        BuilderConfig::from_path("/nonexistent/lazy_expr.toml"),
        Err(ExprError::Config(_))
    ));
}

#[test]
fn test_diagnostics_enabled_by_config() -> ExprResult<()> {
    DiagnosticsCollector::clear();
    let config = BuilderConfig {
        diagnostics: true,
        ..BuilderConfig::default()
    };
    let b = Builder::with_config(config)?;
    let xs = b.array([0.5f64, 1.5])?.into_array()?;
    xs.fold(|acc, x| acc.into_numeric()?.add(x), 0i32)?;

    let found = DiagnosticsCollector::take();
    DiagnosticsCollector::disable();
    assert!(found.iter().any(|d| matches!(
        d.reason,
        DiagnosticReason::FoldZeroPromoted { .. }
    )));
    Ok(())
}
