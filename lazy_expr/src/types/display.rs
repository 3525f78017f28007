//! Display name and formatting for ExprType.

use std::borrow::Cow;
use std::fmt;

use super::ExprType;

/// True if `name` can be written bare inside `struct{...}`
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Field name as written in type notation; non-identifiers are backquoted
pub(crate) fn escape_field_name(name: &str) -> Cow<'_, str> {
    if is_plain_identifier(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`")))
    }
}

impl ExprType {
    /// Get the display name for this type.
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            ExprType::Bool => "bool".into(),
            ExprType::Int32 => "int32".into(),
            ExprType::Int64 => "int64".into(),
            ExprType::Float32 => "float32".into(),
            ExprType::Float64 => "float64".into(),
            ExprType::Str => "str".into(),
            ExprType::Call => "call".into(),
            ExprType::Locus(genome) => format!("locus<{}>", genome).into(),
            ExprType::Interval(point) => format!("interval<{}>", point.name()).into(),
            ExprType::Array(elem) => format!("array<{}>", elem.name()).into(),
            ExprType::Set(elem) => format!("set<{}>", elem.name()).into(),
            ExprType::Dict(k, v) => format!("dict<{}, {}>", k.name(), v.name()).into(),
            ExprType::Struct(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(n, t)| format!("{}: {}", escape_field_name(n), t.name()))
                    .collect();
                format!("struct{{{}}}", parts.join(", ")).into()
            }
            ExprType::Tuple(types) => {
                let parts: Vec<String> = types.iter().map(|t| t.name().to_string()).collect();
                format!("tuple({})", parts.join(", ")).into()
            }
            ExprType::NDArray(elem, ndim) => format!("ndarray<{}, {}>", elem.name(), ndim).into(),
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
