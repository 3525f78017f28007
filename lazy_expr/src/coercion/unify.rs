//! Least upper bound of two types under coercion.

use crate::types::ExprType;

/// Smallest type both `a` and `b` coerce to, if any
///
/// Numerics unify to the wider of the two; composites unify part by part,
/// with struct field names and order required to match exactly.
pub fn unify_types(a: &ExprType, b: &ExprType) -> Option<ExprType> {
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        _ if a.is_numeric() && b.is_numeric() => {
            let rank = a.numeric_rank()?.max(b.numeric_rank()?);
            ExprType::from_numeric_rank(rank)
        }
        (ExprType::Array(x), ExprType::Array(y)) => Some(ExprType::array(unify_types(x, y)?)),
        (ExprType::Set(x), ExprType::Set(y)) => Some(ExprType::set(unify_types(x, y)?)),
        (ExprType::Dict(k1, v1), ExprType::Dict(k2, v2)) => Some(ExprType::dict(
            unify_types(k1, k2)?,
            unify_types(v1, v2)?,
        )),
        (ExprType::Tuple(xs), ExprType::Tuple(ys)) if xs.len() == ys.len() => Some(
            ExprType::Tuple(
                xs.iter()
                    .zip(ys)
                    .map(|(x, y)| unify_types(x, y))
                    .collect::<Option<_>>()?,
            ),
        ),
        (ExprType::Struct(xs), ExprType::Struct(ys)) if xs.len() == ys.len() => {
            let mut fields = Vec::with_capacity(xs.len());
            for ((xn, xt), (yn, yt)) in xs.iter().zip(ys) {
                if xn != yn {
                    return None;
                }
                fields.push((xn.clone(), unify_types(xt, yt)?));
            }
            Some(ExprType::Struct(fields))
        }
        (ExprType::NDArray(x, n), ExprType::NDArray(y, m)) if n == m => {
            Some(ExprType::ndarray(unify_types(x, y)?, *n))
        }
        _ => None,
    }
}

/// Unify a non-empty sequence of types
pub fn unify_many<'a>(types: impl IntoIterator<Item = &'a ExprType>) -> Option<ExprType> {
    let mut iter = types.into_iter();
    let first = iter.next()?.clone();
    iter.try_fold(first, |acc, t| unify_types(&acc, t))
}
