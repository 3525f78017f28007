//! Type lattice for lazy expressions.
//!
//! `ExprType` is the closed set of value types an expression can have. Types
//! are compared structurally: two types are equal iff their tags and all
//! parameters are recursively equal.
//!
//! ```text
//! scalars     bool, int32, int64, float32, float64, str, call
//! genomic     locus<genome>, interval<point>
//! collections array<T>, set<T>, dict<K, V>
//! composites  struct{name: T, ...}, tuple(T, ...)
//! tensors     ndarray<T, rank>
//! ```
//!
//! # Module Organization
//!
//! - `display`: textual notation (`array<struct{a: int32}>`)
//! - `parsing`: `FromStr` for the same notation

mod display;
mod parsing;

#[cfg(test)]
mod tests;

pub(crate) use display::escape_field_name;

use lazy_expr_runtime::ScalarKind;
use serde::{Deserialize, Serialize};

/// Value type of an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Str,
    /// Genotype call
    Call,
    /// Genomic position on the named reference genome
    Locus(String),
    /// Interval over a point type
    Interval(Box<ExprType>),
    Array(Box<ExprType>),
    Set(Box<ExprType>),
    Dict(Box<ExprType>, Box<ExprType>),
    /// Ordered named fields; names are unique
    Struct(Vec<(String, ExprType)>),
    /// Ordered unnamed slots
    Tuple(Vec<ExprType>),
    /// Element type and rank
    NDArray(Box<ExprType>, usize),
}

/// Category tag of a type, one per façade family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Numeric,
    Str,
    Call,
    Locus,
    Interval,
    Array,
    Set,
    Dict,
    Struct,
    Tuple,
    NDArray,
}

impl ExprType {
    pub fn array(elem: ExprType) -> Self {
        ExprType::Array(Box::new(elem))
    }

    pub fn set(elem: ExprType) -> Self {
        ExprType::Set(Box::new(elem))
    }

    pub fn dict(key: ExprType, value: ExprType) -> Self {
        ExprType::Dict(Box::new(key), Box::new(value))
    }

    pub fn interval(point: ExprType) -> Self {
        ExprType::Interval(Box::new(point))
    }

    pub fn locus(genome: impl Into<String>) -> Self {
        ExprType::Locus(genome.into())
    }

    pub fn ndarray(elem: ExprType, ndim: usize) -> Self {
        ExprType::NDArray(Box::new(elem), ndim)
    }

    /// Struct type from `(name, type)` pairs
    pub fn struct_<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ExprType)>,
        S: Into<String>,
    {
        ExprType::Struct(fields.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }

    pub fn tuple(types: impl IntoIterator<Item = ExprType>) -> Self {
        ExprType::Tuple(types.into_iter().collect())
    }

    /// Category tag used by the construction dispatcher
    pub fn tag(&self) -> TypeTag {
        match self {
            ExprType::Bool => TypeTag::Bool,
            ExprType::Int32 | ExprType::Int64 | ExprType::Float32 | ExprType::Float64 => {
                TypeTag::Numeric
            }
            ExprType::Str => TypeTag::Str,
            ExprType::Call => TypeTag::Call,
            ExprType::Locus(_) => TypeTag::Locus,
            ExprType::Interval(_) => TypeTag::Interval,
            ExprType::Array(_) => TypeTag::Array,
            ExprType::Set(_) => TypeTag::Set,
            ExprType::Dict(_, _) => TypeTag::Dict,
            ExprType::Struct(_) => TypeTag::Struct,
            ExprType::Tuple(_) => TypeTag::Tuple,
            ExprType::NDArray(_, _) => TypeTag::NDArray,
        }
    }

    /// int32, int64, float32 or float64
    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, ExprType::Int32 | ExprType::Int64)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ExprType::Float32 | ExprType::Float64)
    }

    /// Position in the numeric promotion order int32 < int64 < float32 < float64
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            ExprType::Int32 => Some(0),
            ExprType::Int64 => Some(1),
            ExprType::Float32 => Some(2),
            ExprType::Float64 => Some(3),
            _ => None,
        }
    }

    /// Numeric type at a promotion rank
    pub fn from_numeric_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(ExprType::Int32),
            1 => Some(ExprType::Int64),
            2 => Some(ExprType::Float32),
            3 => Some(ExprType::Float64),
            _ => None,
        }
    }

    /// Runtime scalar kind, for numeric and boolean types
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            ExprType::Bool => Some(ScalarKind::Bool),
            ExprType::Int32 => Some(ScalarKind::Int32),
            ExprType::Int64 => Some(ScalarKind::Int64),
            ExprType::Float32 => Some(ScalarKind::Float32),
            ExprType::Float64 => Some(ScalarKind::Float64),
            _ => None,
        }
    }

    /// Element type of an array, set or ndarray
    pub fn element_type(&self) -> Option<&ExprType> {
        match self {
            ExprType::Array(e) | ExprType::Set(e) | ExprType::NDArray(e, _) => Some(e),
            _ => None,
        }
    }

    /// Innermost element type through any nesting of arrays and sets
    pub fn innermost_element(&self) -> &ExprType {
        match self {
            ExprType::Array(e) | ExprType::Set(e) => e.innermost_element(),
            other => other,
        }
    }

    /// True for arrays/sets whose possibly nested element is a struct
    pub fn is_struct_collection(&self) -> bool {
        matches!(self, ExprType::Array(_) | ExprType::Set(_))
            && matches!(self.innermost_element(), ExprType::Struct(_))
    }

    /// Struct fields, if this is a struct
    pub fn fields(&self) -> Option<&[(String, ExprType)]> {
        match self {
            ExprType::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Type of a named struct field
    pub fn field_type(&self, name: &str) -> Option<&ExprType> {
        self.fields()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Rank of an ndarray
    pub fn ndim(&self) -> Option<usize> {
        match self {
            ExprType::NDArray(_, n) => Some(*n),
            _ => None,
        }
    }
}
