//! `InsertFields` construction with source hoisting.
//!
//! Annotating a struct with many fields read out of the same computed
//! struct (`s.annotate(a = t.a, b = t.b, ...)` where `t` is not a plain
//! reference) would evaluate `t` once per field. Sources read at least
//! `threshold` times are bound once with `Let` and read through a `Ref`.

use super::Ir;
use crate::diagnostics::emit_fields_deduplicated;
use crate::error::ExprResult;
use crate::names::NameGenerator;

/// Source of a top-level field read that is worth hoisting
fn hoistable_source(ir: &Ir) -> Option<&Ir> {
    match ir {
        Ir::GetField { o, .. } if !o.is_ref() => Some(o),
        _ => None,
    }
}

impl Ir {
    /// Build `InsertFields`, binding repeated non-reference sources once
    pub fn insert_fields_dedup(
        old: Ir,
        fields: Vec<(String, Ir)>,
        field_order: Option<Vec<String>>,
        threshold: usize,
        names: &NameGenerator,
    ) -> ExprResult<Ir> {
        let mut counts: Vec<(&Ir, usize)> = Vec::new();
        for (_, value) in &fields {
            if let Some(src) = hoistable_source(value) {
                match counts.iter_mut().find(|(s, _)| *s == src) {
                    Some(entry) => entry.1 += 1,
                    None => counts.push((src, 1)),
                }
            }
        }

        let mut lets: Vec<(String, Ir)> = Vec::new();
        for (src, count) in counts {
            if count >= threshold {
                lets.push((names.fresh(), src.clone()));
            }
        }

        if lets.is_empty() {
            return Ok(Ir::InsertFields {
                old: Box::new(old),
                fields,
                field_order,
            });
        }

        let mut rewritten = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let bound = hoistable_source(&value)
                .and_then(|src| lets.iter().find(|(_, v)| v == src));
            let value = match (bound, value) {
                (Some((uid, src)), Ir::GetField { name: field, .. }) => {
                    Ir::get_field(Ir::reference(uid.clone(), src.infer_type()?), field)
                }
                (_, value) => value,
            };
            rewritten.push((name, value));
        }

        tracing::trace!(hoisted = lets.len(), "deduplicated InsertFields sources");
        emit_fields_deduplicated(lets.len());

        let mut ir = Ir::InsertFields {
            old: Box::new(old),
            fields: rewritten,
            field_order,
        };
        for (uid, value) in lets.into_iter().rev() {
            ir = Ir::let_(uid, value, ir);
        }
        Ok(ir)
    }
}
