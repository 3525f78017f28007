//! Integration tests: algebraic laws of the builder and worked scenarios

mod common;
use common::*;

use lazy_expr::context::unify_all;
use lazy_expr::prelude::*;
use pretty_assertions::assert_eq;

fn as_i32(v: Value) -> i32 {
    match v {
        Value::I32(n) => n,
        other => panic!("expected int32, got {}", other),
    }
}

// ==================== Laws ====================

#[test]
fn test_select_all_fields_is_identity() -> ExprResult<()> {
    let b = Builder::new();
    let s = b.struct_([("a", b.lit(5i32)), ("b", b.lit("Foo")), ("c", b.lit(0.5f64))])?;
    let names = s.field_names();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let same = s.select(&names, Vec::<(String, Expression)>::new())?;
    assert_eq!(same.dtype(), s.dtype());
    assert_eq!(eval(&same), eval(&s));
    Ok(())
}

#[test]
fn test_map_identity_keeps_type_and_length() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array(["x", "y", "z"])?.into_array()?;
    let same = xs.map(Ok)?.into_array()?;
    assert_eq!(same.dtype(), xs.dtype());
    assert_eq!(eval(&same.length()), eval(&xs.length()));
    Ok(())
}

#[test]
fn test_filter_never_grows() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.range(0, 20)?.into_array()?;
    for cut in [0i32, 7, 25] {
        let kept = xs.filter(|x| x.into_numeric()?.lt(cut))?.into_array()?;
        assert!(as_i32(eval(&kept.length())) <= as_i32(eval(&xs.length())));
    }
    Ok(())
}

#[test]
fn test_fold_keeps_zero_type_when_body_promotes_to_it() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2, 3])?.into_array()?;
    let last = xs.fold(|_acc, x| Ok(x), 0i64)?;
    assert_eq!(*last.dtype(), ExprType::Int64);
    assert_eq!(eval(&last), Value::I64(3));
    Ok(())
}

#[test]
fn test_unify_all_ignores_grouping_and_order() {
    let row = Indices::new(["row"]);
    let col = Indices::new(["col"]);
    let global = Indices::empty();
    let none = Aggregations::empty();

    let orders = [
        [&row, &global, &row],
        [&global, &row, &row],
        [&row, &row, &global],
    ];
    for order in orders {
        let (indices, _) = unify_all(order.iter().map(|i| (*i, &none))).unwrap();
        assert_eq!(indices, row);
    }

    let grouped = unify_all([(&row, &none), (&global, &none)])
        .and_then(|(left, _)| unify_all([(&left, &none), (&row, &none)]));
    assert_eq!(grouped.unwrap().0, row);

    for order in [[&row, &col, &global], [&global, &col, &row], [&col, &global, &row]] {
        assert!(matches!(
            unify_all(order.iter().map(|i| (*i, &none))),
            Err(ExprError::ContextUnification { .. })
        ));
    }
}

#[test]
fn test_reshape_round_trip() -> ExprResult<()> {
    let b = Builder::new();
    let m = b.ndarray([1i64, 2, 3, 4, 5, 6], &[2, 3])?.into_ndarray()?;
    let back = m.reshape(&[3, 2])?.into_ndarray()?.reshape(&[2, 3])?;
    assert_eq!(nd_parts(eval(&back)), nd_parts(eval(&m)));
    Ok(())
}

#[test]
fn test_dtype_matches_ir_typing() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2])?.into_numeric_array()?;
    let built: Vec<TypedExpr> = vec![
        xs.add(1.5f64)?,
        b.struct_([("a", b.lit(1i32))])?
            .annotate([("b", b.lit("x"))])?
            .into_expression()
            .typed()?,
        b.set([1i32])?.into_set()?.add(2i64)?.into_expression().typed()?,
        b.ndarray([1i64, 2, 3, 4], &[2, 2])?.into_ndarray()?.sum(Some(&[0]))?,
        b.dict([("k", 1i32)])?.key_set()?.into_expression().typed()?,
    ];
    for e in built {
        assert_eq!(e.ir().infer_type()?, *e.dtype(), "{}", e.ir());
    }
    Ok(())
}

// ==================== Scenarios ====================

#[test]
fn test_any_and_all_over_small_array() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2, 3, 4, 5])?.into_array()?;
    let has_even = xs.any(|x| x.into_numeric()?.rem(2)?.equals(0))?;
    let all_small = xs.all(|x| x.into_numeric()?.lt(10))?;
    assert_eq!(eval(&has_even), Value::Bool(true));
    assert_eq!(eval(&all_small), Value::Bool(true));
    Ok(())
}

#[test]
fn test_set_difference() -> ExprResult<()> {
    let b = Builder::new();
    let s = b.set([1i32, 2, 3])?.into_set()?;
    let diff = s.difference(b.set([1i32, 3, 5])?)?;
    assert_eq!(eval(&diff.to_array()), ints(&[2]));
    Ok(())
}

#[test]
fn test_annotate_and_drop_scenario() -> ExprResult<()> {
    let b = Builder::new();
    let s = b.struct_([("a", b.lit(5i32)), ("b", b.lit("Foo"))])?;

    let annotated = s.annotate([("a", 10i32), ("c", 8i32)])?;
    assert_eq!(
        annotated.field_names(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert_eq!(eval(&annotated.get_field("a")?), Value::I32(10));
    assert_eq!(eval(&annotated.get_field("c")?), Value::I32(8));

    let dropped = s.drop(&["b"])?;
    assert_eq!(dropped.field_names(), vec!["a".to_string()]);
    assert_eq!(eval(&dropped.get_field("a")?), Value::I32(5));
    Ok(())
}

#[test]
fn test_transpose_changes_flattened_order() -> ExprResult<()> {
    let b = Builder::new();
    let flat = b.ndarray([1i64, 2, 3, 4], &[4])?.into_ndarray()?;
    let square = flat.reshape(&[2, 2])?.into_ndarray()?;

    let swapped = square.t()?.into_ndarray()?.reshape(&[4])?;
    assert_eq!(nd_parts(eval(&swapped)), (vec![4], vec![1, 3, 2, 4]));

    let kept = square
        .transpose(Some(&[0, 1]))?
        .into_ndarray()?
        .reshape(&[4])?;
    assert_eq!(nd_parts(eval(&kept)), (vec![4], vec![1, 2, 3, 4]));
    Ok(())
}
