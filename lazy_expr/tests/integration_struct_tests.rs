//! Integration tests: structs, tuples, dicts and genomic types

mod common;
use common::*;

use lazy_expr::prelude::*;
use pretty_assertions::assert_eq;

fn point(b: &Builder) -> ExprResult<StructExpr> {
    b.struct_([("x", b.lit(1i32)), ("y", b.lit("a"))])
}

fn fields(pairs: &[(&str, Value)]) -> Value {
    Value::Struct(
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect(),
    )
}

// ==================== Structs ====================

#[test]
fn test_struct_literal_and_projection() -> ExprResult<()> {
    let b = Builder::new();
    let p = point(&b)?;
    assert_eq!(p.field_names(), vec!["x".to_string(), "y".to_string()]);
    assert_eq!(eval(&p.get_field("y")?), Value::from("a"));
    assert_eq!(eval(&p.get_index(0)?), Value::I32(1));

    assert!(matches!(
        p.get_field("z"),
        Err(ExprError::FieldNotFound { .. })
    ));
    assert!(matches!(
        b.struct_([("x", b.lit(1i32)), ("x", b.lit(2i32))]),
        Err(ExprError::DuplicateField(_))
    ));
    Ok(())
}

#[test]
fn test_annotate_replaces_in_place_and_appends() -> ExprResult<()> {
    let b = Builder::new();
    let p = point(&b)?.annotate([("x", b.lit(2.5f64)), ("z", b.lit(true))])?;
    assert_eq!(
        *p.dtype(),
        ExprType::struct_([
            ("x", ExprType::Float64),
            ("y", ExprType::Str),
            ("z", ExprType::Bool),
        ])
    );
    assert_eq!(
        eval(&p),
        fields(&[
            ("x", Value::F64(2.5)),
            ("y", Value::from("a")),
            ("z", Value::Bool(true)),
        ])
    );
    Ok(())
}

#[test]
fn test_select_and_drop() -> ExprResult<()> {
    let b = Builder::new();
    let p = point(&b)?;

    let picked = p.select(&["y"], [("w", b.lit(0i64))])?;
    assert_eq!(
        eval(&picked),
        fields(&[("y", Value::from("a")), ("w", Value::I64(0))])
    );

    let dropped = p.drop(&["x"])?;
    assert_eq!(eval(&dropped), fields(&[("y", Value::from("a"))]));

    assert!(matches!(
        p.select(&["y", "y"], Vec::<(String, Expression)>::new()),
        Err(ExprError::DuplicateField(_))
    ));
    assert!(matches!(p.drop(&["nope"]), Err(ExprError::FieldNotFound { .. })));
    Ok(())
}

#[test]
fn test_flatten_nested_struct() -> ExprResult<()> {
    let b = Builder::new();
    let inner = b.struct_([("c", b.lit("deep"))])?;
    let outer = b.struct_([("a", b.lit(1i32)), ("b", inner.into_expression())])?;
    let flat = outer.flatten()?;
    assert_eq!(flat.field_names(), vec!["a".to_string(), "b.c".to_string()]);
    assert_eq!(
        eval(&flat),
        fields(&[("a", Value::I32(1)), ("b.c", Value::from("deep"))])
    );
    Ok(())
}

#[test]
fn test_field_projection_through_arrays() -> ExprResult<()> {
    let b = Builder::new();
    let rows = b.array([point(&b)?, point(&b)?.annotate([("x", b.lit(5i32))])?])?;
    let xs = rows.into_struct_array()?.get_field("x")?;
    assert_eq!(*xs.dtype(), ExprType::array(ExprType::Int32));
    assert_eq!(eval(&xs), ints(&[1, 5]));
    Ok(())
}

#[test]
fn test_field_projection_through_nested_arrays() -> ExprResult<()> {
    let b = Builder::new();
    let far = point(&b)?.annotate([("x", b.lit(7i32))])?;
    let inner = b.array([point(&b)?, far])?;
    let nested = b.array([inner.clone(), inner])?;
    let xs = nested.into_struct_array()?.get_field("x")?;
    assert_eq!(
        *xs.dtype(),
        ExprType::array(ExprType::array(ExprType::Int32))
    );
    assert_eq!(
        eval(&xs),
        Value::Array(vec![ints(&[1, 7]), ints(&[1, 7])])
    );
    Ok(())
}

#[test]
fn test_flatten_leaves_struct_arrays_intact() -> ExprResult<()> {
    let b = Builder::new();
    let items = b.array([b.struct_([("x", b.lit(1i32))])?])?;
    let inner = b.struct_([("m", b.lit(2i32))])?;
    let outer = b.struct_([("a", items.into_expression()), ("n", inner.into_expression())])?;
    let flat = outer.flatten()?;
    assert_eq!(
        *flat.dtype(),
        ExprType::struct_([
            ("a", ExprType::array(ExprType::struct_([("x", ExprType::Int32)]))),
            ("n.m", ExprType::Int32),
        ])
    );
    Ok(())
}

// ==================== Tuples ====================

#[test]
fn test_tuple_access() -> ExprResult<()> {
    let b = Builder::new();
    let t = b.tuple([b.lit(1i32), b.lit("two"), b.lit(3.0f64)])?;
    assert_eq!(eval(&t.get(-1)?), Value::F64(3.0));
    assert_eq!(
        eval(&t.slice(Some(1), None)?),
        Value::Tuple(vec![Value::from("two"), Value::F64(3.0)])
    );
    assert_eq!(eval(&t.slice(Some(2), Some(1))?), Value::Tuple(vec![]));
    assert!(matches!(
        t.get(3),
        Err(ExprError::IndexOutOfBounds { index: 3, length: 3, .. })
    ));
    Ok(())
}

// ==================== Dicts ====================

#[test]
fn test_dict_lookups() -> ExprResult<()> {
    let b = Builder::new();
    let d = b.dict([("a", 1i32), ("b", 2i32)])?;
    assert_eq!(eval(&d.get_item("b")?), Value::I32(2));
    assert_eq!(eval(&d.get("z")?), Value::Missing);
    assert_eq!(eval(&d.get_or("z", 0i32)?), Value::I32(0));
    assert_eq!(eval(&d.contains("a")?), Value::Bool(true));
    assert_eq!(eval(&d.keys()?), strs(&["a", "b"]));
    assert_eq!(eval(&d.size()), Value::I32(2));

    assert!(matches!(
        eval_err(&d.get_item("z")?),
        RuntimeError::KeyError(_)
    ));
    assert!(matches!(d.get(1i32), Err(ExprError::TypeMismatch(_))));
    Ok(())
}

#[test]
fn test_dict_map_values() -> ExprResult<()> {
    let b = Builder::new();
    let d = b.dict([("a", 1i32), ("b", 2i32)])?;
    let doubled = d.map_values(|v| v.into_numeric()?.mul(2))?;
    assert_eq!(eval(&doubled.values()?), ints(&[2, 4]));
    Ok(())
}

// ==================== Genomics ====================

#[test]
fn test_call_queries() -> ExprResult<()> {
    let b = Builder::new();
    let het = b.call(&[0, 1], false);
    assert_eq!(eval(&het.is_het()?), Value::Bool(true));
    assert_eq!(eval(&het.is_het_ref()?), Value::Bool(true));
    assert_eq!(eval(&het.is_diploid()?), Value::Bool(true));
    assert_eq!(eval(&het.allele(1)?), Value::I32(1));
    assert_eq!(eval(&het.n_alt_alleles()?), Value::I32(1));
    assert_eq!(eval(&het.one_hot_alleles(3)?), ints(&[1, 1, 0]));
    assert_eq!(eval(&het.unphased_diploid_gt_index()?), Value::I32(1));

    let hom = b.call(&[2, 2], true);
    assert_eq!(eval(&hom.is_hom_var()?), Value::Bool(true));
    assert_eq!(eval(&hom.phased()?), Value::Bool(true));
    Ok(())
}

#[test]
fn test_locus_fields_and_genome_lookups() -> ExprResult<()> {
    let b = Builder::new();
    let locus = b.locus("1", 100_000, "GRCh38")?;
    assert_eq!(locus.genome(), "GRCh38");
    assert_eq!(eval(&locus.contig()?), Value::from("1"));
    assert_eq!(eval(&locus.position()?), Value::I32(100_000));

    // needs reference tables the interpreter does not carry
    assert!(matches!(
        eval_err(&locus.in_autosome()?),
        RuntimeError::Unsupported(_)
    ));
    let window = locus.window(10, 10)?;
    assert_eq!(
        *window.dtype(),
        ExprType::interval(ExprType::locus("GRCh38"))
    );
    Ok(())
}

#[test]
fn test_interval_queries() -> ExprResult<()> {
    let b = Builder::new();
    let iv = b.interval(1i32, 5i32, true, false)?;
    assert_eq!(eval(&iv.start()?), Value::I32(1));
    assert_eq!(eval(&iv.contains(1i32)?), Value::Bool(true));
    assert_eq!(eval(&iv.contains(5i32)?), Value::Bool(false));
    assert_eq!(
        eval(&iv.overlaps(b.interval(4i32, 8i32, true, true)?)?),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&iv.overlaps(b.interval(5i32, 8i32, true, true)?)?),
        Value::Bool(false)
    );

    assert!(matches!(iv.contains(1.5f64), Err(ExprError::TypeMismatch(_))));
    Ok(())
}
