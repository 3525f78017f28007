use super::*;
use crate::diagnostics::{DiagnosticReason, DiagnosticsCollector};
use crate::names::NameGenerator;
use crate::types::ExprType;
use lazy_expr_runtime::{BinOp, CompOp};

fn point_ref() -> Ir {
    Ir::reference(
        "p",
        ExprType::struct_([("x", ExprType::Int32), ("y", ExprType::Float64)]),
    )
}

#[test]
fn test_literal_types() {
    assert_eq!(Ir::True.infer_type().unwrap(), ExprType::Bool);
    assert_eq!(Ir::I64(3).infer_type().unwrap(), ExprType::Int64);
    assert_eq!(Ir::str("a").infer_type().unwrap(), ExprType::Str);
    assert_eq!(
        Ir::NA(ExprType::array(ExprType::Int32)).infer_type().unwrap(),
        ExprType::array(ExprType::Int32)
    );
}

#[test]
fn test_division_and_pow_types() {
    let div = Ir::binary(BinOp::Div, Ir::I32(1), Ir::I32(2));
    assert_eq!(div.infer_type().unwrap(), ExprType::Float32);
    let fdiv = Ir::binary(BinOp::Div, Ir::F64(1.0), Ir::F64(2.0));
    assert_eq!(fdiv.infer_type().unwrap(), ExprType::Float64);
    let pow = Ir::binary(BinOp::Pow, Ir::I64(2), Ir::I64(3));
    assert_eq!(pow.infer_type().unwrap(), ExprType::Float64);
    let cmp = Ir::compare(CompOp::Lt, Ir::I32(1), Ir::I32(2));
    assert_eq!(cmp.infer_type().unwrap(), ExprType::Bool);
}

#[test]
fn test_collection_types() {
    let arr = Ir::reference("a", ExprType::array(ExprType::Int32));
    let mapped = Ir::array_map(
        arr.clone(),
        "x",
        Ir::cast(Ir::reference("x", ExprType::Int32), ExprType::Float64),
    );
    assert_eq!(
        mapped.infer_type().unwrap(),
        ExprType::array(ExprType::Float64)
    );

    let pairs = Ir::array_map(
        arr,
        "x",
        Ir::MakeTuple(vec![Ir::str("k"), Ir::reference("x", ExprType::Int32)]),
    );
    assert_eq!(
        Ir::GroupByKey(Box::new(pairs.clone())).infer_type().unwrap(),
        ExprType::dict(ExprType::Str, ExprType::array(ExprType::Int32))
    );
    assert_eq!(
        Ir::ToDict(Box::new(pairs)).infer_type().unwrap(),
        ExprType::dict(ExprType::Str, ExprType::Int32)
    );
}

#[test]
fn test_insert_fields_type_order() {
    let ir = Ir::InsertFields {
        old: Box::new(point_ref()),
        fields: vec![
            ("x".to_string(), Ir::str("replaced")),
            ("z".to_string(), Ir::True),
        ],
        field_order: None,
    };
    assert_eq!(
        ir.infer_type().unwrap(),
        ExprType::struct_([
            ("x", ExprType::Str),
            ("y", ExprType::Float64),
            ("z", ExprType::Bool)
        ])
    );

    let reordered = Ir::InsertFields {
        old: Box::new(point_ref()),
        fields: vec![],
        field_order: Some(vec!["y".to_string(), "x".to_string()]),
    };
    assert_eq!(
        reordered.infer_type().unwrap(),
        ExprType::struct_([("y", ExprType::Float64), ("x", ExprType::Int32)])
    );
}

#[test]
fn test_ndarray_ranks() {
    let nd = Ir::reference("m", ExprType::ndarray(ExprType::Float64, 3));
    let slices = Ir::MakeTuple(vec![
        Ir::I64(0),
        Ir::MakeTuple(vec![Ir::I64(0), Ir::I64(2), Ir::I64(1)]),
        Ir::MakeTuple(vec![Ir::I64(0), Ir::I64(2), Ir::I64(1)]),
    ]);
    let sliced = Ir::NDArraySlice {
        nd: Box::new(nd.clone()),
        slices: Box::new(slices),
    };
    assert_eq!(
        sliced.infer_type().unwrap(),
        ExprType::ndarray(ExprType::Float64, 2)
    );

    let summed = Ir::NDArrayAgg {
        nd: Box::new(nd.clone()),
        axes: vec![0, 2],
    };
    assert_eq!(
        summed.infer_type().unwrap(),
        ExprType::ndarray(ExprType::Float64, 1)
    );

    let shape = Ir::NDArrayShape(Box::new(nd));
    assert_eq!(
        shape.infer_type().unwrap(),
        ExprType::tuple([ExprType::Int64, ExprType::Int64, ExprType::Int64])
    );
}

#[test]
fn test_matmul_ranks() {
    assert_eq!(matmul_ndim(1, 1), 0);
    assert_eq!(matmul_ndim(1, 2), 1);
    assert_eq!(matmul_ndim(2, 1), 1);
    assert_eq!(matmul_ndim(2, 2), 2);
    assert_eq!(matmul_ndim(3, 2), 3);
}

#[test]
fn test_malformed_get_field() {
    let ir = Ir::get_field(point_ref(), "nope");
    assert!(ir.infer_type().is_err());
}

#[test]
fn test_display_sexpr() {
    let ir = Ir::array_map(
        Ir::reference("__uid_0", ExprType::array(ExprType::Int32)),
        "__uid_1",
        Ir::binary(
            BinOp::Add,
            Ir::reference("__uid_1", ExprType::Int32),
            Ir::I32(1),
        ),
    );
    assert_eq!(
        ir.to_string(),
        "(ArrayMap __uid_1 (Ref __uid_0) (ApplyBinaryPrimOp + (Ref __uid_1) (I32 1)))"
    );
    assert_eq!(Ir::NA(ExprType::Int32).to_string(), "(NA int32)");
    assert_eq!(Ir::F64(1.0).to_string(), "(F64 1.0)");
    assert_eq!(
        Ir::get_field(point_ref(), "a.b").to_string(),
        "(GetField `a.b` (Ref p))"
    );
}

#[test]
fn test_size_and_count() {
    let ir = Ir::if_(Ir::True, Ir::I32(1), Ir::IsNA(Box::new(Ir::I32(2))));
    assert_eq!(ir.size(), 5);
    assert_eq!(ir.count_where(&|n| matches!(n, Ir::I32(_))), 2);
}

fn computed_source() -> Ir {
    Ir::MakeStruct(vec![
        ("a".to_string(), Ir::I32(1)),
        ("b".to_string(), Ir::I32(2)),
        ("c".to_string(), Ir::I32(3)),
    ])
}

#[test]
fn test_dedup_hoists_repeated_source() {
    DiagnosticsCollector::enable();
    DiagnosticsCollector::clear();

    let names = NameGenerator::new("t");
    let fields: Vec<(String, Ir)> = ["a", "b", "c"]
        .iter()
        .map(|n| (format!("new_{}", n), Ir::get_field(computed_source(), *n)))
        .collect();
    let ir = Ir::insert_fields_dedup(point_ref(), fields, None, 3, &names).unwrap();

    match &ir {
        Ir::Let { name, body, .. } => {
            assert_eq!(name, "t_1");
            assert_eq!(body.count_where(&|n| matches!(n, Ir::MakeStruct(_))), 0);
        }
        other => panic!("expected Let, got {}", other),
    }
    assert_eq!(
        ir.infer_type().unwrap().fields().map(|f| f.len()),
        Some(5)
    );

    let diags = DiagnosticsCollector::take();
    assert!(diags
        .iter()
        .any(|d| d.reason == DiagnosticReason::FieldsDeduplicated(1)));
    DiagnosticsCollector::disable();
}

#[test]
fn test_dedup_below_threshold_is_plain() {
    let names = NameGenerator::new("t");
    let fields = vec![
        ("a".to_string(), Ir::get_field(computed_source(), "a")),
        ("r".to_string(), Ir::get_field(point_ref(), "x")),
    ];
    let ir = Ir::insert_fields_dedup(point_ref(), fields, None, 2, &names).unwrap();
    assert!(matches!(ir, Ir::InsertFields { .. }));
    assert_eq!(names.issued(), 0);
}

#[test]
fn test_serde_json_handoff() {
    let ir = Ir::get_field(point_ref(), "y");
    let json = serde_json::to_string(&ir).unwrap();
    let back: Ir = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ir);
}
