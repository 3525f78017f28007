//! Integration tests: arrays, sets, strings and numeric broadcasting

mod common;
use common::*;

use lazy_expr::prelude::*;
use pretty_assertions::assert_eq;

// ==================== Array Algebra ====================

#[test]
fn test_filter_then_fold() -> ExprResult<()> {
    let b = Builder::new();
    let evens = b
        .range(0, 10)?
        .into_array()?
        .filter(|x| x.into_numeric()?.rem(2)?.equals(0))?;
    assert_eq!(eval(&evens), ints(&[0, 2, 4, 6, 8]));

    let total = evens
        .into_array()?
        .fold(|acc, x| acc.into_numeric()?.add(x), 0i32)?;
    assert_eq!(*total.dtype(), ExprType::Int32);
    assert_eq!(eval(&total), Value::I32(20));
    Ok(())
}

#[test]
fn test_fold_promotes_zero_to_body_type() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([0.5f64, 1.5])?.into_array()?;
    let total = xs.fold(|acc, x| acc.into_numeric()?.add(x), 0i32)?;
    assert_eq!(*total.dtype(), ExprType::Float64);
    assert_eq!(eval(&total), Value::F64(2.0));
    Ok(())
}

#[test]
fn test_fold_rejects_irreconcilable_types() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2])?.into_array()?;
    assert!(matches!(
        xs.fold(|_acc, _x| Ok("s"), 0i32),
        Err(ExprError::TypeMismatch(_))
    ));
    assert!(matches!(
        xs.scan(|_acc, _x| Ok("s"), 0i32),
        Err(ExprError::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn test_scan_starts_with_zero() -> ExprResult<()> {
    let b = Builder::new();
    let running = b
        .array([1i32, 2, 3])?
        .into_array()?
        .scan(|acc, x| acc.into_numeric()?.add(x), 0i32)?;
    assert_eq!(eval(&running), ints(&[0, 1, 3, 6]));
    Ok(())
}

#[test]
fn test_flatmap_keeps_container_kind() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2, 3])?.into_array()?;
    let runs = xs.flatmap(|x| b.range(0, x))?;
    assert_eq!(eval(&runs), ints(&[0, 0, 1, 0, 1, 2]));

    let s = b.set([1i32, 2])?.into_set()?;
    let spread = s.flatmap(|x| b.set([x.clone(), x.into_numeric()?.mul(10)?]))?;
    assert_eq!(eval(&spread.into_set()?.to_array()), ints(&[1, 2, 10, 20]));

    assert!(matches!(
        xs.flatmap(|x| b.set([x])),
        Err(ExprError::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn test_index_and_slice() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([0i32, 1, 2, 3, 4])?.into_array()?;

    assert_eq!(eval(&xs.index(-1)?), Value::I32(4));
    assert_eq!(eval(&xs.slice(Slice::range(1, -1))?), ints(&[1, 2, 3]));
    assert_eq!(eval(&xs.slice(Slice::full().with_step(-2))?), ints(&[4, 2, 0]));
    assert_eq!(eval(&xs.slice(Slice::full().with_start(10))?), ints(&[]));

    assert!(matches!(
        eval_err(&xs.index(7)?),
        RuntimeError::BoundsError { index: 7, length: 5 }
    ));
    assert!(matches!(
        eval_err(&xs.slice(Slice::full().with_step(0))?),
        RuntimeError::SliceStepZero
    ));
    Ok(())
}

#[test]
fn test_head_and_positions() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([5i32, 6, 7])?.into_array()?;
    assert_eq!(eval(&xs.head()?), Value::I32(5));
    assert_eq!(eval(&xs.index_of(7)?), Value::I32(2));
    assert_eq!(eval(&xs.index_of(9)?), Value::Missing);
    assert_eq!(
        eval(&xs.index_where(|x| x.into_numeric()?.gt(5))?),
        Value::I32(1)
    );

    let empty = b.empty_array(ExprType::Int32)?.into_array()?;
    assert_eq!(eval(&empty.head()?), Value::Missing);
    Ok(())
}

#[test]
fn test_find_any_all() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 6, 8])?.into_array()?;
    assert_eq!(eval(&xs.find(|x| x.into_numeric()?.gt(5))?), Value::I32(6));
    assert_eq!(eval(&xs.find(|x| x.into_numeric()?.gt(50))?), Value::Missing);
    assert_eq!(
        eval(&xs.any(|x| x.into_numeric()?.lt(2))?),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&xs.all(|x| x.into_numeric()?.lt(2))?),
        Value::Bool(false)
    );

    let empty = b.empty_array(ExprType::Int32)?.into_array()?;
    assert_eq!(eval(&empty.all(|x| x.into_numeric()?.lt(0))?), Value::Bool(true));
    Ok(())
}

#[test]
fn test_group_by_first_letter() -> ExprResult<()> {
    let b = Builder::new();
    let words = b.array(["apple", "banana", "avocado"])?.into_array()?;
    let groups = words.group_by(|w| w.into_str()?.index(0))?;
    assert_eq!(
        *groups.dtype(),
        ExprType::dict(ExprType::Str, ExprType::array(ExprType::Str))
    );
    let Value::Dict(groups) = eval(&groups) else {
        panic!("expected dict");
    };
    assert_eq!(groups[&Value::from("a")], strs(&["apple", "avocado"]));
    assert_eq!(groups[&Value::from("b")], strs(&["banana"]));
    Ok(())
}

#[test]
fn test_append_and_extend_check_types() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2])?.into_array()?;
    assert_eq!(eval(&xs.append(3)?), ints(&[1, 2, 3]));
    assert_eq!(eval(&xs.extend(b.array([3i32, 4])?)?), ints(&[1, 2, 3, 4]));

    assert!(matches!(xs.append(1.5f64), Err(ExprError::TypeMismatch(_))));
    assert!(matches!(
        xs.extend(b.array(["a"])?),
        Err(ExprError::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn test_array_literal_needs_common_type() {
    let b = Builder::new();
    assert!(matches!(
        b.array(Vec::<i32>::new()),
        Err(ExprError::TypeMismatch(_))
    ));
    assert!(matches!(
        b.array([b.lit(1i32), b.lit("x")]),
        Err(ExprError::TypeMismatch(_))
    ));
}

#[test]
fn test_array_literal_promotes_elements() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([b.lit(1i32), b.lit(2.5f64)])?;
    assert_eq!(*xs.dtype(), ExprType::array(ExprType::Float64));
    assert_eq!(
        eval(&xs),
        Value::Array(vec![Value::F64(1.0), Value::F64(2.5)])
    );
    Ok(())
}

// ==================== Numeric Broadcasting ====================

#[test]
fn test_array_scalar_arithmetic() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2, 3])?.into_numeric_array()?;
    assert_eq!(eval(&xs.mul(2)?), ints(&[2, 4, 6]));
    assert_eq!(eval(&xs.rsub(10)?), ints(&[9, 8, 7]));
    assert_eq!(eval(&xs.neg()?), ints(&[-1, -2, -3]));

    let halves = xs.div(2)?;
    assert_eq!(*halves.dtype(), ExprType::array(ExprType::Float32));
    assert_eq!(
        eval(&halves),
        Value::Array(vec![Value::F32(0.5), Value::F32(1.0), Value::F32(1.5)])
    );
    Ok(())
}

#[test]
fn test_array_map_ir_shape() -> ExprResult<()> {
    let b = Builder::new();
    let shifted = b.array([1i32, 2])?.into_numeric_array()?.add(10)?;
    insta::assert_snapshot!(
        shifted.ir().to_string(),
        @"(ArrayMap __uid_1 (MakeArray int32 (I32 1) (I32 2)) (ApplyBinaryPrimOp + (Ref __uid_1) (I32 10)))"
    );
    Ok(())
}

#[test]
fn test_array_zip_defers_length_check() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i32, 2])?.into_numeric_array()?;
    assert_eq!(eval(&xs.add(b.array([10i32, 20])?)?), ints(&[11, 22]));

    let mismatched = xs.add(b.array([1i32, 2, 3])?)?;
    assert!(matches!(
        eval_err(&mismatched),
        RuntimeError::LengthMismatch { left: 2, right: 3 }
    ));
    Ok(())
}

#[test]
fn test_comparison_over_arrays() -> ExprResult<()> {
    let b = Builder::new();
    let xs = b.array([1i64, 5, 9])?.into_numeric_array()?;
    let big = xs.ge(5)?;
    assert_eq!(*big.dtype(), ExprType::array(ExprType::Bool));
    assert_eq!(
        eval(&big),
        Value::from(vec![false, true, true])
    );
    Ok(())
}

// ==================== Sets ====================

#[test]
fn test_set_algebra() -> ExprResult<()> {
    let b = Builder::new();
    let s = b.set([1i32, 2, 3])?.into_set()?;
    let union = s.union(b.set([3i32, 4])?)?;
    assert_eq!(eval(&union.size()), Value::I32(4));
    assert_eq!(eval(&s.contains(2)?), Value::Bool(true));
    assert_eq!(
        eval(&s.is_subset(b.set([1i32, 2, 3, 4])?)?),
        Value::Bool(true)
    );
    assert_eq!(eval(&s.remove(2)?.to_array()), ints(&[1, 3]));
    Ok(())
}

#[test]
fn test_set_literal_drops_duplicates() -> ExprResult<()> {
    let b = Builder::new();
    let s = b.set([2i32, 1, 2])?.into_set()?;
    assert_eq!(eval(&s.to_array()), ints(&[1, 2]));
    Ok(())
}

// ==================== Strings ====================

#[test]
fn test_string_methods() -> ExprResult<()> {
    let b = Builder::new();
    let s = b.str("Hello, World");
    assert_eq!(eval(&s.lower()?), Value::from("hello, world"));
    assert_eq!(eval(&s.slice(Slice::range(0, 5))?), Value::from("Hello"));
    assert_eq!(eval(&s.slice(Slice::full().with_start(-5))?), Value::from("World"));
    assert_eq!(eval(&s.index(-1)?), Value::from("d"));
    assert_eq!(eval(&s.length()?), Value::I32(12));
    assert_eq!(eval(&s.split(", ", None)?), strs(&["Hello", "World"]));
    assert_eq!(eval(&s.concat("!")?), Value::from("Hello, World!"));
    assert_eq!(eval(&s.matches("W.rld$")?), Value::Bool(true));
    assert_eq!(eval(&s.replace("o", "0")?), Value::from("Hell0, W0rld"));

    assert!(matches!(
        s.slice(Slice::full().with_step(2)),
        Err(ExprError::UnsupportedType(_))
    ));
    Ok(())
}

#[test]
fn test_first_match_and_translate() -> ExprResult<()> {
    let b = Builder::new();
    let s = b.str("chr7:1234");
    assert_eq!(
        eval(&s.first_match_in(r"chr(\d+):(\d+)")?),
        strs(&["7", "1234"])
    );
    assert_eq!(eval(&s.first_match_in("^X")?), Value::Missing);

    let mapping = b.dict([("c", "C"), ("h", "H")])?;
    assert_eq!(eval(&s.translate(mapping)?), Value::from("CHr7:1234"));
    Ok(())
}
