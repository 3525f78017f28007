//! Interpreter tests over hand-built IR.

use lazy_expr_runtime::{BinOp, CompOp, RuntimeError, RuntimeResult, Value};

use super::{Backend, Interpreter};
use crate::ir::Ir;
use crate::types::ExprType;

fn run(ir: Ir) -> RuntimeResult<Value> {
    let typ = ir.infer_type().unwrap();
    Interpreter::new().execute(&ir, &typ)
}

fn i32s(values: &[i32]) -> Ir {
    Ir::MakeArray {
        elements: values.iter().map(|&v| Ir::I32(v)).collect(),
        elem_type: ExprType::Int32,
    }
}

fn vals(values: &[i32]) -> Value {
    Value::from(values.to_vec())
}

fn ndarray(values: &[i64], shape: &[i64]) -> Ir {
    Ir::MakeNDArray {
        data: Box::new(Ir::MakeArray {
            elements: values.iter().map(|&v| Ir::I64(v)).collect(),
            elem_type: ExprType::Int64,
        }),
        shape: Box::new(Ir::MakeTuple(shape.iter().map(|&d| Ir::I64(d)).collect())),
    }
}

fn nd_value(result: Value) -> (Vec<u64>, Vec<i64>) {
    match result {
        Value::NDArray(nd) => {
            let data = nd.data.iter().map(|v| v.as_i64().unwrap()).collect();
            (nd.shape, data)
        }
        other => panic!("expected ndarray, got {:?}", other),
    }
}

fn slice(array: Ir, start: i32, stop: Option<i32>, step: i32) -> Ir {
    Ir::ArraySlice {
        array: Box::new(array),
        start: Box::new(Ir::I32(start)),
        stop: stop.map(|s| Box::new(Ir::I32(s))),
        step: Box::new(Ir::I32(step)),
    }
}

// ==================== Bindings and control ====================

#[test]
fn test_let_binds_for_body() {
    let ir = Ir::let_(
        "x",
        Ir::I32(20),
        Ir::binary(
            BinOp::Add,
            Ir::reference("x", ExprType::Int32),
            Ir::I32(22),
        ),
    );
    assert_eq!(run(ir).unwrap(), Value::I32(42));
}

#[test]
fn test_unbound_reference() {
    let err = run(Ir::reference("nope", ExprType::Int32)).unwrap_err();
    assert!(matches!(err, RuntimeError::UnboundReference(ref n) if n == "nope"));
}

#[test]
fn test_top_level_reference_uses_bound_global() {
    let ir = Ir::TopLevelReference {
        name: "g".to_string(),
        typ: ExprType::Str,
    };
    let interp = Interpreter::new().with_global("g", "hello");
    assert_eq!(interp.execute(&ir, &ExprType::Str).unwrap(), Value::from("hello"));
}

#[test]
fn test_missing_condition_is_missing() {
    let ir = Ir::if_(Ir::NA(ExprType::Bool), Ir::I32(1), Ir::I32(2));
    assert_eq!(run(ir).unwrap(), Value::Missing);
}

#[test]
fn test_die_raises_user_error() {
    let ir = Ir::Die {
        message: "boom".to_string(),
        typ: ExprType::Int32,
    };
    assert!(matches!(run(ir), Err(RuntimeError::UserError(m)) if m == "boom"));
}

#[test]
fn test_three_valued_logic() {
    let and = |l: Ir, r: Ir| run(Ir::apply("&&", ExprType::Bool, vec![l, r])).unwrap();
    let or = |l: Ir, r: Ir| run(Ir::apply("||", ExprType::Bool, vec![l, r])).unwrap();
    let na = || Ir::NA(ExprType::Bool);

    assert_eq!(and(Ir::False, na()), Value::Bool(false));
    assert_eq!(and(na(), Ir::True), Value::Missing);
    assert_eq!(and(Ir::True, Ir::True), Value::Bool(true));
    assert_eq!(or(na(), Ir::True), Value::Bool(true));
    assert_eq!(or(Ir::False, na()), Value::Missing);
    assert_eq!(or(Ir::False, Ir::False), Value::Bool(false));
}

#[test]
fn test_aggregator_is_unsupported() {
    let ir = Ir::ApplyAggOp {
        op: "sum".to_string(),
        ret_type: ExprType::Int64,
        args: vec![Ir::I64(1)],
    };
    assert!(matches!(run(ir), Err(RuntimeError::Unsupported(_))));
}

// ==================== Arrays ====================

#[test]
fn test_array_ref_wraps_negative() {
    let at = |i: i32| {
        run(Ir::ArrayRef {
            array: Box::new(i32s(&[10, 20, 30])),
            index: Box::new(Ir::I32(i)),
        })
    };
    assert_eq!(at(-1).unwrap(), Value::I32(30));
    assert!(matches!(
        at(3),
        Err(RuntimeError::BoundsError {
            index: 3,
            length: 3
        })
    ));
}

#[test]
fn test_array_slice_clamps_and_wraps() {
    let a = || i32s(&[0, 1, 2, 3, 4]);
    assert_eq!(run(slice(a(), -2, None, 1)).unwrap(), vals(&[3, 4]));
    assert_eq!(run(slice(a(), 1, Some(100), 2)).unwrap(), vals(&[1, 3]));
    assert_eq!(run(slice(a(), -1, None, -1)).unwrap(), vals(&[4, 3, 2, 1, 0]));
    assert_eq!(run(slice(a(), 3, Some(0), -2)).unwrap(), vals(&[3, 1]));
    assert!(matches!(
        run(slice(a(), 0, None, 0)),
        Err(RuntimeError::SliceStepZero)
    ));
}

#[test]
fn test_array_zip_length_mismatch() {
    let ir = Ir::ArrayZip {
        left: Box::new(i32s(&[1, 2])),
        right: Box::new(i32s(&[1, 2, 3])),
        left_name: "l".to_string(),
        right_name: "r".to_string(),
        body: Box::new(Ir::reference("l", ExprType::Int32)),
    };
    assert!(matches!(
        run(ir),
        Err(RuntimeError::LengthMismatch { left: 2, right: 3 })
    ));
}

#[test]
fn test_scan_includes_zero() {
    let ir = Ir::ArrayScan {
        array: Box::new(i32s(&[1, 2, 3])),
        zero: Box::new(Ir::I32(0)),
        accum_name: "acc".to_string(),
        value_name: "x".to_string(),
        body: Box::new(Ir::binary(
            BinOp::Add,
            Ir::reference("acc", ExprType::Int32),
            Ir::reference("x", ExprType::Int32),
        )),
    };
    assert_eq!(run(ir).unwrap(), vals(&[0, 1, 3, 6]));
}

#[test]
fn test_filter_drops_missing_predicate() {
    let x = || Ir::reference("x", ExprType::Int32);
    let ir = Ir::ArrayFilter {
        array: Box::new(i32s(&[1, 2, 3])),
        name: "x".to_string(),
        cond: Box::new(Ir::if_(
            Ir::compare(CompOp::Eq, x(), Ir::I32(2)),
            Ir::NA(ExprType::Bool),
            Ir::compare(CompOp::Gt, x(), Ir::I32(0)),
        )),
    };
    assert_eq!(run(ir).unwrap(), vals(&[1, 3]));
}

#[test]
fn test_range_negative_step() {
    let ir = Ir::ArrayRange {
        start: Box::new(Ir::I32(5)),
        stop: Box::new(Ir::I32(0)),
        step: Box::new(Ir::I32(-2)),
    };
    assert_eq!(run(ir).unwrap(), vals(&[5, 3, 1]));
}

#[test]
fn test_group_by_key_keeps_input_order() {
    let pair = |k: &str, v: i32| Ir::MakeTuple(vec![Ir::str(k), Ir::I32(v)]);
    let ir = Ir::GroupByKey(Box::new(Ir::MakeArray {
        elements: vec![pair("b", 1), pair("a", 2), pair("b", 3)],
        elem_type: ExprType::tuple([ExprType::Str, ExprType::Int32]),
    }));
    let Value::Dict(groups) = run(ir).unwrap() else {
        panic!("expected dict");
    };
    assert_eq!(groups[&Value::from("a")], vals(&[2]));
    assert_eq!(groups[&Value::from("b")], vals(&[1, 3]));
}

// ==================== Named functions ====================

fn dict_ir() -> Ir {
    let pair = |k: &str, v: i32| Ir::MakeTuple(vec![Ir::str(k), Ir::I32(v)]);
    Ir::ToDict(Box::new(Ir::MakeArray {
        elements: vec![pair("a", 1), pair("b", 2)],
        elem_type: ExprType::tuple([ExprType::Str, ExprType::Int32]),
    }))
}

#[test]
fn test_dict_index_missing_key() {
    let ir = Ir::apply("index", ExprType::Int32, vec![dict_ir(), Ir::str("z")]);
    assert!(matches!(run(ir), Err(RuntimeError::KeyError(_))));
}

#[test]
fn test_dict_get_with_default() {
    let get = |key: &str| {
        run(Ir::apply(
            "get",
            ExprType::Int32,
            vec![dict_ir(), Ir::str(key), Ir::I32(-1)],
        ))
        .unwrap()
    };
    assert_eq!(get("b"), Value::I32(2));
    assert_eq!(get("z"), Value::I32(-1));
}

#[test]
fn test_set_functions() {
    let set = |v: &[i32]| Ir::ToSet(Box::new(i32s(v)));
    let set_t = ExprType::set(ExprType::Int32);
    let out = run(Ir::apply(
        "difference",
        set_t.clone(),
        vec![set(&[1, 2, 3]), set(&[2])],
    ))
    .unwrap();
    assert_eq!(out, Value::Set([Value::I32(1), Value::I32(3)].into_iter().collect()));

    let subset = run(Ir::apply(
        "isSubset",
        ExprType::Bool,
        vec![set(&[1]), set(&[1, 2])],
    ))
    .unwrap();
    assert_eq!(subset, Value::Bool(true));

    let with_missing = run(Ir::apply(
        "add",
        set_t,
        vec![set(&[1]), Ir::NA(ExprType::Int32)],
    ))
    .unwrap();
    assert_eq!(
        with_missing,
        Value::Set([Value::I32(1), Value::Missing].into_iter().collect())
    );
}

#[test]
fn test_string_functions() {
    let s = || Ir::str("Hello");
    let str_fn = |name: &str, args: Vec<Ir>| {
        let mut all = vec![s()];
        all.extend(args);
        run(Ir::apply(name, ExprType::Str, all)).unwrap()
    };
    assert_eq!(str_fn("sliceRight", vec![Ir::I32(-3)]), Value::from("llo"));
    assert_eq!(str_fn("slice", vec![Ir::I32(1), Ir::I32(3)]), Value::from("el"));
    assert_eq!(str_fn("index", vec![Ir::I32(-1)]), Value::from("o"));
    assert_eq!(str_fn("upper", vec![]), Value::from("HELLO"));
    assert_eq!(str_fn("firstMatchIn", vec![Ir::str("x(y)")]), Value::Missing);
    assert_eq!(
        str_fn("firstMatchIn", vec![Ir::str("H(e)(l+)")]),
        Value::from(vec!["e", "ll"])
    );
}

#[test]
fn test_string_functions_propagate_missing() {
    let ir = Ir::apply(
        "replace",
        ExprType::Str,
        vec![Ir::str("abc"), Ir::NA(ExprType::Str), Ir::str("x")],
    );
    assert_eq!(run(ir).unwrap(), Value::Missing);
}

#[test]
fn test_call_predicates() {
    let call = |alleles: &[i32]| {
        Ir::apply("Call", ExprType::Call, vec![i32s(alleles), Ir::False])
    };
    let flag = |name: &str, alleles: &[i32]| {
        run(Ir::apply(name, ExprType::Bool, vec![call(alleles)])).unwrap()
    };
    assert_eq!(flag("isHet", &[0, 1]), Value::Bool(true));
    assert_eq!(flag("isHetRef", &[0, 1]), Value::Bool(true));
    assert_eq!(flag("isHetNonRef", &[1, 2]), Value::Bool(true));
    assert_eq!(flag("isHomVar", &[1, 1]), Value::Bool(true));
    assert_eq!(flag("isHomRef", &[0, 0]), Value::Bool(true));
    assert_eq!(flag("isNonRef", &[0, 0]), Value::Bool(false));

    let index = run(Ir::apply(
        "unphasedDiploidGtIndex",
        ExprType::Int32,
        vec![call(&[2, 1])],
    ))
    .unwrap();
    assert_eq!(index, Value::I32(4));

    let one_hot = run(Ir::apply(
        "oneHotAlleles",
        ExprType::array(ExprType::Int32),
        vec![call(&[0, 2]), Ir::I32(3)],
    ))
    .unwrap();
    assert_eq!(one_hot, vals(&[1, 0, 1]));
}

#[test]
fn test_interval_contains_and_overlaps() {
    let iv = |s: i32, e: i32, incl_e: bool| {
        Ir::apply(
            "Interval",
            ExprType::interval(ExprType::Int32),
            vec![Ir::I32(s), Ir::I32(e), Ir::True, Ir::bool(incl_e)],
        )
    };
    let contains = |p: i32| {
        run(Ir::apply("contains", ExprType::Bool, vec![iv(1, 5, false), Ir::I32(p)])).unwrap()
    };
    assert_eq!(contains(1), Value::Bool(true));
    assert_eq!(contains(5), Value::Bool(false));

    let overlaps = |a: Ir, b: Ir| run(Ir::apply("overlaps", ExprType::Bool, vec![a, b])).unwrap();
    assert_eq!(overlaps(iv(1, 5, false), iv(5, 8, false)), Value::Bool(false));
    assert_eq!(overlaps(iv(1, 5, true), iv(5, 8, false)), Value::Bool(true));
}

#[test]
fn test_genome_functions_unsupported() {
    let locus = Ir::apply(
        "Locus",
        ExprType::locus("GRCh38"),
        vec![Ir::str("1"), Ir::I32(100)],
    );
    let ir = Ir::apply("isAutosomal", ExprType::Bool, vec![locus]);
    assert!(matches!(run(ir), Err(RuntimeError::Unsupported(_))));
}

// ==================== NDArrays ====================

#[test]
fn test_ndarray_reindex_transposes() {
    let ir = Ir::NDArrayReindex {
        nd: Box::new(ndarray(&[1, 2, 3, 4, 5, 6], &[2, 3])),
        idx_expr: vec![1, 0],
    };
    assert_eq!(nd_value(run(ir).unwrap()), (vec![3, 2], vec![1, 4, 2, 5, 3, 6]));
}

#[test]
fn test_ndarray_reindex_new_axis() {
    let ir = Ir::NDArrayReindex {
        nd: Box::new(ndarray(&[7, 8], &[2])),
        idx_expr: vec![1, 0],
    };
    assert_eq!(nd_value(run(ir).unwrap()), (vec![1, 2], vec![7, 8]));
}

#[test]
fn test_stepped_stops_before_overflow() {
    use super::arrays::stepped;
    assert_eq!(stepped(1, 3, i64::MAX), vec![1]);
    assert_eq!(stepped(-1, i64::MIN, i64::MIN), vec![-1]);
    assert_eq!(stepped(i64::MAX - 1, i64::MAX, 1), vec![i64::MAX - 1]);
    assert_eq!(stepped(4, 0, -3), vec![4, 1]);
    assert!(stepped(2, 2, 1).is_empty());
}

#[test]
fn test_ndarray_matmul_wraps_integer_overflow() {
    let product = Ir::NDArrayMatMul {
        left: Box::new(ndarray(&[i64::MAX, 1], &[1, 2])),
        right: Box::new(ndarray(&[2, 0], &[2, 1])),
    };
    assert_eq!(
        nd_value(run(product).unwrap()),
        (vec![1, 1], vec![i64::MAX.wrapping_mul(2)])
    );
}

#[test]
fn test_ndarray_slice_clamps_resolved_bounds() {
    let range = |start: i64, stop: i64, step: i64| {
        Ir::MakeTuple(vec![Ir::I64(start), Ir::I64(stop), Ir::I64(step)])
    };
    let m = || ndarray(&[1, 2, 3, 4, 5, 6], &[2, 3]);

    let row = Ir::NDArraySlice {
        nd: Box::new(m()),
        slices: Box::new(Ir::MakeTuple(vec![Ir::I64(1), range(0, 10, 1)])),
    };
    assert_eq!(nd_value(run(row).unwrap()), (vec![3], vec![4, 5, 6]));

    let reversed = Ir::NDArraySlice {
        nd: Box::new(m()),
        slices: Box::new(Ir::MakeTuple(vec![range(1, -1, -1), range(2, -1, -2)])),
    };
    assert_eq!(
        nd_value(run(reversed).unwrap()),
        (vec![2, 2], vec![6, 4, 3, 1])
    );

    let zero = Ir::NDArraySlice {
        nd: Box::new(m()),
        slices: Box::new(Ir::MakeTuple(vec![Ir::I64(0), range(0, 3, 0)])),
    };
    assert!(matches!(run(zero), Err(RuntimeError::SliceStepZero)));
}

#[test]
fn test_ndarray_reshape_infers_extent() {
    let ir = Ir::NDArrayReshape {
        nd: Box::new(ndarray(&[1, 2, 3, 4, 5, 6], &[6])),
        shape: Box::new(Ir::MakeTuple(vec![Ir::I64(-1), Ir::I64(2)])),
    };
    assert_eq!(nd_value(run(ir).unwrap()).0, vec![3, 2]);

    let bad = Ir::NDArrayReshape {
        nd: Box::new(ndarray(&[1, 2, 3], &[3])),
        shape: Box::new(Ir::MakeTuple(vec![Ir::I64(2), Ir::I64(2)])),
    };
    assert!(matches!(run(bad), Err(RuntimeError::ShapeError(_))));
}

#[test]
fn test_ndarray_map2_broadcasts() {
    let add = |l: Ir, r: Ir| Ir::NDArrayMap2 {
        left: Box::new(l),
        right: Box::new(r),
        left_name: "l".to_string(),
        right_name: "r".to_string(),
        body: Box::new(Ir::binary(
            BinOp::Add,
            Ir::reference("l", ExprType::Int64),
            Ir::reference("r", ExprType::Int64),
        )),
    };
    let out = run(add(
        ndarray(&[1, 2, 3, 4, 5, 6], &[2, 3]),
        ndarray(&[10, 20, 30], &[1, 3]),
    ))
    .unwrap();
    assert_eq!(nd_value(out), (vec![2, 3], vec![11, 22, 33, 14, 25, 36]));

    let err = run(add(
        ndarray(&[1, 2, 3, 4, 5, 6], &[2, 3]),
        ndarray(&[1, 2], &[1, 2]),
    ))
    .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::BroadcastMismatch {
            axis: 1,
            left: 3,
            right: 2
        }
    ));
}

#[test]
fn test_ndarray_matmul() {
    let product = Ir::NDArrayMatMul {
        left: Box::new(ndarray(&[1, 2, 3, 4, 5, 6], &[2, 3])),
        right: Box::new(ndarray(&[7, 8, 9, 10, 11, 12], &[3, 2])),
    };
    assert_eq!(
        nd_value(run(product).unwrap()),
        (vec![2, 2], vec![58, 64, 139, 154])
    );

    let dot = Ir::NDArrayMatMul {
        left: Box::new(ndarray(&[1, 2, 3], &[3])),
        right: Box::new(ndarray(&[4, 5, 6], &[3])),
    };
    assert_eq!(nd_value(run(dot).unwrap()), (vec![], vec![32]));

    let mismatch = Ir::NDArrayMatMul {
        left: Box::new(ndarray(&[1, 2, 3, 4], &[2, 2])),
        right: Box::new(ndarray(&[1, 2, 3], &[3])),
    };
    assert!(matches!(
        run(mismatch),
        Err(RuntimeError::MatMulMismatch { left: 2, right: 3 })
    ));
}

#[test]
fn test_ndarray_agg_sums_axes() {
    let ir = Ir::NDArrayAgg {
        nd: Box::new(ndarray(&[1, 2, 3, 4, 5, 6], &[2, 3])),
        axes: vec![0],
    };
    assert_eq!(nd_value(run(ir).unwrap()), (vec![3], vec![5, 7, 9]));

    let all = Ir::NDArrayAgg {
        nd: Box::new(ndarray(&[1, 2, 3, 4], &[2, 2])),
        axes: vec![0, 1],
    };
    assert_eq!(nd_value(run(all).unwrap()), (vec![], vec![10]));
}

#[test]
fn test_ndarray_write_npy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m.npy");
    let path_str = path.to_string_lossy().to_string();
    let ir = Ir::NDArrayWrite {
        nd: Box::new(ndarray(&[1, 2, 3, 4], &[2, 2])),
        path: Box::new(Ir::str(path_str.clone())),
    };
    assert_eq!(run(ir).unwrap(), Value::Str(path_str));

    let bytes = std::fs::read(&path).unwrap();
    let (nd, kind) = lazy_expr_runtime::NDArrayValue::from_npy_bytes(&bytes).unwrap();
    assert_eq!(kind, lazy_expr_runtime::ScalarKind::Int64);
    assert_eq!(nd.shape, vec![2, 2]);
    assert_eq!(nd.data[3], Value::I64(4));
}

#[test]
fn test_ndarray_write_remote_unsupported() {
    let ir = Ir::NDArrayWrite {
        nd: Box::new(ndarray(&[1], &[1])),
        path: Box::new(Ir::str("gs://bucket/m.npy")),
    };
    assert!(matches!(run(ir), Err(RuntimeError::Unsupported(_))));
}
