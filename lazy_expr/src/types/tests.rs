use super::*;
use crate::error::ExprError;

fn sample_types() -> Vec<ExprType> {
    vec![
        ExprType::Bool,
        ExprType::Float32,
        ExprType::locus("GRCh38"),
        ExprType::interval(ExprType::Int32),
        ExprType::dict(ExprType::Str, ExprType::array(ExprType::Int64)),
        ExprType::set(ExprType::tuple([ExprType::Int32, ExprType::Str])),
        ExprType::struct_([
            ("a", ExprType::Int32),
            ("b.c", ExprType::array(ExprType::struct_([("x", ExprType::Call)]))),
        ]),
        ExprType::ndarray(ExprType::Float64, 3),
        ExprType::Tuple(vec![]),
        ExprType::Struct(vec![]),
    ]
}

#[test]
fn test_display_notation() {
    assert_eq!(ExprType::array(ExprType::Str).to_string(), "array<str>");
    assert_eq!(
        ExprType::struct_([("a", ExprType::Int32), ("b", ExprType::Str)]).to_string(),
        "struct{a: int32, b: str}"
    );
    assert_eq!(
        ExprType::tuple([ExprType::Int64, ExprType::Int64]).to_string(),
        "tuple(int64, int64)"
    );
    assert_eq!(
        ExprType::ndarray(ExprType::Float64, 2).to_string(),
        "ndarray<float64, 2>"
    );
    assert_eq!(
        ExprType::dict(ExprType::Str, ExprType::Int32).to_string(),
        "dict<str, int32>"
    );
    assert_eq!(ExprType::locus("GRCh37").to_string(), "locus<GRCh37>");
}

#[test]
fn test_display_escapes_field_names() {
    let t = ExprType::struct_([("a.b", ExprType::Int32)]);
    assert_eq!(t.to_string(), "struct{`a.b`: int32}");
}

#[test]
fn test_parse_roundtrip() {
    for t in sample_types() {
        let text = t.to_string();
        let parsed: ExprType = text.parse().unwrap();
        assert_eq!(parsed, t, "roundtrip of {}", text);
    }
}

#[test]
fn test_parse_whitespace_insensitive() {
    let t: ExprType = " dict< str ,array<int32 > > ".parse().unwrap();
    assert_eq!(t, ExprType::dict(ExprType::Str, ExprType::array(ExprType::Int32)));
}

#[test]
fn test_parse_rejects_malformed() {
    for bad in [
        "",
        "array<>",
        "int16",
        "array<int32",
        "struct{a: int32, a: str}",
        "ndarray<float64, x>",
        "int32 int32",
    ] {
        assert!(
            matches!(bad.parse::<ExprType>(), Err(ExprError::InvalidTypeString(_))),
            "accepted {:?}",
            bad
        );
    }
}

#[test]
fn test_numeric_rank_order() {
    let ranks: Vec<u8> = [
        ExprType::Int32,
        ExprType::Int64,
        ExprType::Float32,
        ExprType::Float64,
    ]
    .iter()
    .filter_map(ExprType::numeric_rank)
    .collect();
    assert_eq!(ranks, vec![0, 1, 2, 3]);
    assert_eq!(ExprType::Bool.numeric_rank(), None);
    assert_eq!(ExprType::from_numeric_rank(2), Some(ExprType::Float32));
}

#[test]
fn test_struct_collection_detection() {
    let s = ExprType::struct_([("x", ExprType::Int32)]);
    assert!(ExprType::array(s.clone()).is_struct_collection());
    assert!(ExprType::set(ExprType::array(s.clone())).is_struct_collection());
    assert!(!ExprType::array(ExprType::Int32).is_struct_collection());
    assert!(!s.is_struct_collection());
}

#[test]
fn test_field_lookup() {
    let s = ExprType::struct_([("x", ExprType::Int32), ("y", ExprType::Str)]);
    assert_eq!(s.field_type("y"), Some(&ExprType::Str));
    assert_eq!(s.field_type("z"), None);
    assert_eq!(ExprType::Int32.field_type("x"), None);
}

#[test]
fn test_serde_json() {
    let t = ExprType::array(ExprType::struct_([("a", ExprType::Float32)]));
    let json = serde_json::to_string(&t).unwrap();
    let back: ExprType = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t);
}
