//! Boolean and string façades.

use std::sync::Arc;

use lazy_expr_runtime::{BinOp, UnaryOp};

use super::index::{Bound, Slice};
use super::{ArrayExpr, CollectionExpr, ExprLike, Expression, NumericExpr, ToExpr};
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

facade! {
    /// Expression of type `bool`
    BooleanExpr
}

facade! {
    /// Expression of type `str`
    StringExpr
}

/// Convert `x` and require it to have type `typ`
pub(crate) fn typed_arg(
    ctx: &Arc<super::BuildContext>,
    x: impl ToExpr,
    typ: &ExprType,
    what: &str,
) -> ExprResult<Expression> {
    let e = x.to_expr(ctx);
    if e.dtype() != typ {
        return Err(ExprError::type_mismatch(format!(
            "{} must have type '{}', found '{}'",
            what,
            typ,
            e.dtype()
        )));
    }
    Ok(e)
}

impl BooleanExpr {
    fn logical(&self, function: &str, other: impl ToExpr) -> ExprResult<BooleanExpr> {
        let rhs = typed_arg(self.0.context(), other, &ExprType::Bool, "boolean operand")?;
        let ir = Ir::apply(
            function,
            ExprType::Bool,
            vec![self.0.ir().clone(), rhs.ir().clone()],
        );
        Ok(BooleanExpr(Expression::combine(
            self.0.context(),
            ir,
            ExprType::Bool,
            &[&self.0, &rhs],
        )?))
    }

    /// Conjunction; missing only when the result is not decided by the
    /// other operand
    pub fn and(&self, other: impl ToExpr) -> ExprResult<BooleanExpr> {
        self.logical("&&", other)
    }

    pub fn or(&self, other: impl ToExpr) -> ExprResult<BooleanExpr> {
        self.logical("||", other)
    }

    pub fn not(&self) -> BooleanExpr {
        BooleanExpr(self.0.derive(
            Ir::ApplyUnaryPrimOp {
                op: UnaryOp::Not,
                value: Box::new(self.0.ir().clone()),
            },
            ExprType::Bool,
        ))
    }
}

impl StringExpr {
    fn str_method(&self, name: &str, ret: ExprType, args: Vec<Expression>) -> ExprResult<Expression> {
        self.0.method(name, ret, args)
    }

    fn str_arg(&self, x: impl ToExpr, what: &str) -> ExprResult<Expression> {
        typed_arg(self.0.context(), x, &ExprType::Str, what)
    }

    /// Character at an int32 index; negative indices count from the end
    pub fn index(&self, i: impl Into<Bound>) -> ExprResult<StringExpr> {
        let i = i.into().to_index_expr(self.0.context(), &ExprType::Int32)?;
        Ok(StringExpr(self.str_method("index", ExprType::Str, vec![i])?))
    }

    /// Substring; steps are not supported
    pub fn slice(&self, slice: Slice) -> ExprResult<StringExpr> {
        if slice.step.is_some() {
            return Err(ExprError::UnsupportedType(
                "string slices do not support a step".to_string(),
            ));
        }
        let ctx = self.0.context();
        let start = slice
            .start
            .map(|b| b.to_index_expr(ctx, &ExprType::Int32))
            .transpose()?;
        let stop = slice
            .stop
            .map(|b| b.to_index_expr(ctx, &ExprType::Int32))
            .transpose()?;
        let out = match (start, stop) {
            (None, None) => return Ok(self.clone()),
            (Some(start), None) => self.str_method("sliceRight", ExprType::Str, vec![start])?,
            (None, Some(stop)) => self.str_method("sliceLeft", ExprType::Str, vec![stop])?,
            (Some(start), Some(stop)) => {
                self.str_method("slice", ExprType::Str, vec![start, stop])?
            }
        };
        Ok(StringExpr(out))
    }

    pub fn concat(&self, other: impl ToExpr) -> ExprResult<StringExpr> {
        let rhs = self.str_arg(other, "concatenated value")?;
        let ir = Ir::binary(BinOp::Add, self.0.ir().clone(), rhs.ir().clone());
        Ok(StringExpr(Expression::combine(
            self.0.context(),
            ir,
            ExprType::Str,
            &[&self.0, &rhs],
        )?))
    }

    /// Number of characters
    pub fn length(&self) -> ExprResult<NumericExpr> {
        Ok(NumericExpr::wrap(self.str_method("length", ExprType::Int32, vec![])?))
    }

    /// Replace every match of a regular expression
    pub fn replace(&self, pattern: impl ToExpr, replacement: impl ToExpr) -> ExprResult<StringExpr> {
        let pattern = self.str_arg(pattern, "pattern")?;
        let replacement = self.str_arg(replacement, "replacement")?;
        Ok(StringExpr(self.str_method(
            "replace",
            ExprType::Str,
            vec![pattern, replacement],
        )?))
    }

    /// Split on a delimiter pattern, into at most `n` pieces if given
    pub fn split(&self, delim: impl ToExpr, n: Option<i32>) -> ExprResult<ArrayExpr> {
        let mut args = vec![self.str_arg(delim, "delimiter")?];
        if let Some(n) = n {
            args.push(n.to_expr(self.0.context()));
        }
        let out = self.str_method("split", ExprType::array(ExprType::Str), args)?;
        Ok(CollectionExpr::wrap(out))
    }

    pub fn lower(&self) -> ExprResult<StringExpr> {
        Ok(StringExpr(self.str_method("lower", ExprType::Str, vec![])?))
    }

    pub fn upper(&self) -> ExprResult<StringExpr> {
        Ok(StringExpr(self.str_method("upper", ExprType::Str, vec![])?))
    }

    /// Trim surrounding whitespace
    pub fn strip(&self) -> ExprResult<StringExpr> {
        Ok(StringExpr(self.str_method("strip", ExprType::Str, vec![])?))
    }

    pub fn contains(&self, substr: impl ToExpr) -> ExprResult<BooleanExpr> {
        let substr = self.str_arg(substr, "substring")?;
        Ok(BooleanExpr(self.str_method("contains", ExprType::Bool, vec![substr])?))
    }

    pub fn starts_with(&self, prefix: impl ToExpr) -> ExprResult<BooleanExpr> {
        let prefix = self.str_arg(prefix, "prefix")?;
        Ok(BooleanExpr(self.str_method("startswith", ExprType::Bool, vec![prefix])?))
    }

    pub fn ends_with(&self, suffix: impl ToExpr) -> ExprResult<BooleanExpr> {
        let suffix = self.str_arg(suffix, "suffix")?;
        Ok(BooleanExpr(self.str_method("endswith", ExprType::Bool, vec![suffix])?))
    }

    /// Capture groups of the first match, missing if there is none
    pub fn first_match_in(&self, regex: impl ToExpr) -> ExprResult<ArrayExpr> {
        let regex = self.str_arg(regex, "regex")?;
        let out = self.str_method("firstMatchIn", ExprType::array(ExprType::Str), vec![regex])?;
        Ok(CollectionExpr::wrap(out))
    }

    /// Replace characters by a `dict<str, str>` of single characters
    pub fn translate(&self, mapping: impl ToExpr) -> ExprResult<StringExpr> {
        let mapping = typed_arg(
            self.0.context(),
            mapping,
            &ExprType::dict(ExprType::Str, ExprType::Str),
            "translation mapping",
        )?;
        Ok(StringExpr(self.str_method("translate", ExprType::Str, vec![mapping])?))
    }

    /// True if the regular expression matches anywhere in the string
    pub fn matches(&self, regex: impl ToExpr) -> ExprResult<BooleanExpr> {
        let regex = self.str_arg(regex, "regex")?;
        let ir = Ir::apply(
            "~",
            ExprType::Bool,
            vec![regex.ir().clone(), self.0.ir().clone()],
        );
        Ok(BooleanExpr(Expression::combine(
            self.0.context(),
            ir,
            ExprType::Bool,
            &[&regex, &self.0],
        )?))
    }

    pub fn reverse(&self) -> ExprResult<StringExpr> {
        Ok(StringExpr(self.str_method("reverse", ExprType::Str, vec![])?))
    }
}
