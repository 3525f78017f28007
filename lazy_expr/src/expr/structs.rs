//! Struct façade and field algebra.
//!
//! `annotate`, `select`, `drop` and `flatten` only build `SelectFields` and
//! `InsertFields` nodes; the resulting type is computed here so that field
//! errors surface at construction.

use std::collections::HashSet;

use super::capabilities::{project_field, FieldProjection};
use super::{construct, ExprLike, Expression, ToExpr, TypedExpr};
use crate::diagnostics::emit_duplicate_drop_field;
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

facade! {
    /// Expression of type `struct{...}`
    StructExpr
}

impl FieldProjection for StructExpr {}

impl StructExpr {
    pub fn fields(&self) -> &[(String, ExprType)] {
        self.0.dtype().fields().unwrap_or(&[])
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields().iter().any(|(n, _)| n == name)
    }

    /// Field at a position
    pub fn get_index(&self, i: usize) -> ExprResult<TypedExpr> {
        let name = self
            .fields()
            .get(i)
            .map(|(n, _)| n.clone())
            .ok_or_else(|| ExprError::IndexOutOfBounds {
                index: i as i64,
                what: "struct".to_string(),
                length: self.len(),
            })?;
        construct(project_field(&self.0, &name)?)
    }

    fn check_exists(&self, name: &str) -> ExprResult<()> {
        if self.has_field(name) {
            Ok(())
        } else {
            Err(ExprError::field_not_found(
                name,
                self.fields().iter().map(|(n, _)| n),
            ))
        }
    }

    /// Insert or replace fields
    ///
    /// Existing names keep their position; new names are appended in the
    /// order given.
    pub fn annotate<I, S, E>(&self, fields: I) -> ExprResult<StructExpr>
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: ToExpr,
    {
        let ctx = self.0.context();
        let mut seen = HashSet::new();
        let mut exprs: Vec<(String, Expression)> = Vec::new();
        for (name, value) in fields {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(ExprError::duplicate_field(format!(
                    "field '{}' assigned more than once",
                    name
                )));
            }
            exprs.push((name, value.to_expr(ctx)));
        }
        if exprs.is_empty() {
            return Ok(self.clone());
        }

        let mut typ = self.fields().to_vec();
        for (name, e) in &exprs {
            match typ.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = e.dtype().clone(),
                None => typ.push((name.clone(), e.dtype().clone())),
            }
        }

        let ir = Ir::insert_fields_dedup(
            self.0.ir().clone(),
            exprs
                .iter()
                .map(|(n, e)| (n.clone(), e.ir().clone()))
                .collect(),
            None,
            ctx.config().dedup_threshold,
            ctx.names(),
        )?;
        let mut parts: Vec<&Expression> = vec![&self.0];
        parts.extend(exprs.iter().map(|(_, e)| e));
        Ok(StructExpr(Expression::combine(
            ctx,
            ir,
            ExprType::Struct(typ),
            &parts,
        )?))
    }

    /// Keep `names`, in that order, then add the `named` fields
    pub fn select<I, S, E>(&self, names: &[&str], named: I) -> ExprResult<StructExpr>
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: ToExpr,
    {
        let mut selected = HashSet::new();
        let mut typ = Vec::with_capacity(names.len());
        for name in names {
            self.check_exists(name)?;
            if !selected.insert(*name) {
                return Err(ExprError::duplicate_field(format!(
                    "field '{}' selected more than once",
                    name
                )));
            }
            if let Some(t) = self.0.dtype().field_type(name) {
                typ.push((name.to_string(), t.clone()));
            }
        }

        let named: Vec<(String, E)> = named.into_iter().map(|(n, e)| (n.into(), e)).collect();
        for (name, _) in &named {
            if selected.contains(name.as_str()) {
                return Err(ExprError::duplicate_field(format!(
                    "cannot select and assign field '{}'",
                    name
                )));
            }
        }

        let ir = Ir::SelectFields {
            old: Box::new(self.0.ir().clone()),
            fields: names.iter().map(|n| n.to_string()).collect(),
        };
        StructExpr(self.0.derive(ir, ExprType::Struct(typ))).annotate(named)
    }

    /// All fields except `names`
    pub fn drop(&self, names: &[&str]) -> ExprResult<StructExpr> {
        let mut dropped = HashSet::new();
        for name in names {
            self.check_exists(name)?;
            if !dropped.insert(*name) {
                emit_duplicate_drop_field(name);
            }
        }
        let kept: Vec<&str> = self
            .fields()
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(|n| !dropped.contains(n))
            .collect();
        self.select(&kept, no_fields())
    }

    /// Nested struct fields lifted to the top level under dot-joined names
    ///
    /// `struct{a: int32, b: struct{c: str}}` flattens to
    /// `struct{a: int32, b.c: str}`.
    pub fn flatten(&self) -> ExprResult<StructExpr> {
        let mut flat = Vec::new();
        collect_leaves(&self.0, "", &mut flat)?;
        self.select(&[], flat)
    }
}

fn no_fields() -> std::iter::Empty<(String, Expression)> {
    std::iter::empty()
}

fn collect_leaves(
    e: &Expression,
    prefix: &str,
    out: &mut Vec<(String, Expression)>,
) -> ExprResult<()> {
    let fields = e.dtype().fields().unwrap_or(&[]).to_vec();
    for (name, typ) in fields {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        let field = project_field(e, &name)?;
        if matches!(typ, ExprType::Struct(_)) {
            collect_leaves(&field, &path, out)?;
        } else {
            out.push((path, field));
        }
    }
    Ok(())
}
