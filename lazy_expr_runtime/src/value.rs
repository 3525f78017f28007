//! Concrete values returned by a backend
//!
//! A `Value` is the materialized counterpart of an expression type: a
//! scalar, an ordered sequence, a mapping, or a nested composite of those.
//! Values are totally ordered so that sets and dictionary keys have a
//! deterministic layout; missing sorts after every present value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::array::NDArrayValue;

/// Materialized value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Missing (NA) value of any type
    Missing,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// 32-bit floating point
    F32(f32),
    /// 64-bit floating point
    F64(f64),
    /// String
    Str(String),
    /// Genotype call: allele indices and phasing
    Call { alleles: Vec<i32>, phased: bool },
    /// Genomic position
    Locus { contig: String, position: i32 },
    /// Interval over points of one type
    Interval {
        start: Box<Value>,
        end: Box<Value>,
        includes_start: bool,
        includes_end: bool,
    },
    /// Ordered sequence
    Array(Vec<Value>),
    /// Ordered set
    Set(BTreeSet<Value>),
    /// Ordered mapping
    Dict(BTreeMap<Value, Value>),
    /// Named fields in declaration order
    Struct(Vec<(String, Value)>),
    /// Unnamed slots
    Tuple(Vec<Value>),
    /// N-dimensional array (row-major)
    NDArray(NDArrayValue),
}

impl Value {
    /// Short name of the runtime shape, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Missing => "missing",
            Value::Bool(_) => "bool",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::Str(_) => "str",
            Value::Call { .. } => "call",
            Value::Locus { .. } => "locus",
            Value::Interval { .. } => "interval",
            Value::Array(_) => "array",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Struct(_) => "struct",
            Value::Tuple(_) => "tuple",
            Value::NDArray(_) => "ndarray",
        }
    }

    /// Check if this value is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Try to extract as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to extract an integer, widening int32
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            Value::I32(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Try to extract a float, widening every numeric kind
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::F32(v) => Some(*v as f64),
            Value::I64(v) => Some(*v as f64),
            Value::I32(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to borrow as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to borrow the elements of an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a struct field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::I32(_) => 1,
            Value::I64(_) => 2,
            Value::F32(_) => 3,
            Value::F64(_) => 4,
            Value::Str(_) => 5,
            Value::Call { .. } => 6,
            Value::Locus { .. } => 7,
            Value::Interval { .. } => 8,
            Value::Array(_) => 9,
            Value::Set(_) => 10,
            Value::Dict(_) => 11,
            Value::Struct(_) => 12,
            Value::Tuple(_) => 13,
            Value::NDArray(_) => 14,
            Value::Missing => 15,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::I32(a), Value::I32(b)) => a.cmp(b),
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::F32(a), Value::F32(b)) => a.total_cmp(b),
            (Value::F64(a), Value::F64(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (
                Value::Call {
                    alleles: a,
                    phased: pa,
                },
                Value::Call {
                    alleles: b,
                    phased: pb,
                },
            ) => a.cmp(b).then(pa.cmp(pb)),
            (
                Value::Locus {
                    contig: ca,
                    position: pa,
                },
                Value::Locus {
                    contig: cb,
                    position: pb,
                },
            ) => ca.cmp(cb).then(pa.cmp(pb)),
            (
                Value::Interval {
                    start: sa,
                    end: ea,
                    includes_start: isa,
                    includes_end: iea,
                },
                Value::Interval {
                    start: sb,
                    end: eb,
                    includes_start: isb,
                    includes_end: ieb,
                },
            ) => sa
                .cmp(sb)
                .then_with(|| ea.cmp(eb))
                .then(isa.cmp(isb))
                .then(iea.cmp(ieb)),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Dict(a), Value::Dict(b)) => a.cmp(b),
            (Value::Struct(a), Value::Struct(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => a.cmp(b),
            (Value::NDArray(a), Value::NDArray(b)) => {
                a.shape.cmp(&b.shape).then_with(|| a.data.cmp(&b.data))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<'a>(
            f: &mut fmt::Formatter<'_>,
            items: impl Iterator<Item = &'a Value>,
        ) -> fmt::Result {
            for (i, v) in items.enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            Ok(())
        }

        match self {
            Value::Missing => write!(f, "NA"),
            Value::Bool(v) => write!(f, "{}", if *v { "True" } else { "False" }),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{:?}", v),
            Value::F64(v) => write!(f, "{:?}", v),
            Value::Str(s) => write!(f, "'{}'", s),
            Value::Call { alleles, phased } => {
                let sep = if *phased { "|" } else { "/" };
                let parts: Vec<String> = alleles.iter().map(|a| a.to_string()).collect();
                write!(f, "{}", parts.join(sep))
            }
            Value::Locus { contig, position } => write!(f, "{}:{}", contig, position),
            Value::Interval {
                start,
                end,
                includes_start,
                includes_end,
            } => write!(
                f,
                "{}{}-{}{}",
                if *includes_start { "[" } else { "(" },
                start,
                end,
                if *includes_end { "]" } else { ")" }
            ),
            Value::Array(items) => {
                write!(f, "[")?;
                join(f, items.iter())?;
                write!(f, "]")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                join(f, items.iter())?;
                write!(f, "}}")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Struct(fields) => {
                write!(f, "Struct(")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, v)?;
                }
                write!(f, ")")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                join(f, items.iter())?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::NDArray(nd) => write!(f, "{}", nd),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sorts_last() {
        let mut values = vec![Value::Missing, Value::I32(3), Value::I32(1)];
        values.sort();
        assert_eq!(values, vec![Value::I32(1), Value::I32(3), Value::Missing]);
    }

    #[test]
    fn test_float_total_order() {
        assert!(Value::F64(-0.5) < Value::F64(2.0));
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
    }

    #[test]
    fn test_set_deduplicates() {
        let set: BTreeSet<Value> = vec![Value::I32(2), Value::I32(1), Value::I32(2)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        let v = Value::Struct(vec![
            ("a".to_string(), Value::I32(5)),
            ("b".to_string(), Value::from("Foo")),
        ]);
        assert_eq!(v.to_string(), "Struct(a=5, b='Foo')");
        assert_eq!(Value::Tuple(vec![Value::I64(1)]).to_string(), "(1,)");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_field_lookup() {
        let v = Value::Struct(vec![("x".to_string(), Value::Bool(true))]);
        assert_eq!(v.field("x"), Some(&Value::Bool(true)));
        assert_eq!(v.field("y"), None);
    }
}
