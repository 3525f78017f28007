//! Named functions reached through `Apply`.
//!
//! The first argument selects the implementation: `index` on a string is a
//! character lookup, on a dict a key lookup, on a call an allele lookup.
//! Functions are strict in their receiver. Item arguments of the
//! collection functions may be missing; everywhere else a missing argument
//! makes the result missing.

// SAFETY: usize→i32 casts are on lengths of in-memory collections.
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::collections::{BTreeMap, BTreeSet};

use lazy_expr_runtime::intrinsics;
use lazy_expr_runtime::{RuntimeError, RuntimeResult, Value};

use super::arrays::{into_set, slice_positions};
use super::{expected, index_value, Scope};
use crate::ir::Ir;

/// Locus queries that need reference-genome tables
const GENOME_FUNCTIONS: &[&str] = &[
    "locusToGlobalPos",
    "contigLength",
    "inXNonPar",
    "inXPar",
    "inYNonPar",
    "inYPar",
    "isAutosomal",
    "isAutosomalOrPseudoAutosomal",
    "isMitochondrial",
];

/// Functions whose non-receiver arguments may be missing
fn accepts_missing_items(function: &str, receiver: &Value) -> bool {
    match function {
        "contains" | "append" | "add" | "remove" | "get" => {
            !matches!(receiver, Value::Str(_) | Value::Interval { .. })
        }
        "index" => matches!(receiver, Value::Dict(_)),
        _ => false,
    }
}

impl Scope<'_> {
    pub(super) fn apply(&mut self, function: &str, args: &[Ir]) -> RuntimeResult<Value> {
        match function {
            "&&" | "||" => {
                let l = self.eval(arg(args, 0)?)?;
                let r = self.eval(arg(args, 1)?)?;
                logical(function == "&&", &l, &r)
            }
            f if GENOME_FUNCTIONS.contains(&f) => Err(RuntimeError::unsupported(format!(
                "'{}' needs reference genome tables",
                f
            ))),
            _ => {
                let values = self.eval_all(args)?;
                let Some(receiver) = values.first() else {
                    return Err(RuntimeError::type_error(format!(
                        "'{}' applied to no arguments",
                        function
                    )));
                };
                if receiver.is_missing()
                    || (!accepts_missing_items(function, receiver)
                        && values.iter().any(Value::is_missing))
                {
                    return Ok(Value::Missing);
                }
                call(function, values)
            }
        }
    }
}

fn arg(args: &[Ir], i: usize) -> RuntimeResult<&Ir> {
    args.get(i)
        .ok_or_else(|| RuntimeError::type_error(format!("missing argument {}", i)))
}

/// Three-valued conjunction and disjunction
fn logical(and: bool, l: &Value, r: &Value) -> RuntimeResult<Value> {
    let as_bool = |v: &Value| match v {
        Value::Missing => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(expected("bool", other)),
    };
    // `and` is decided by a false operand, `or` by a true one
    let decisive = !and;
    Ok(match (as_bool(l)?, as_bool(r)?) {
        (Some(a), _) if a == decisive => Value::Bool(decisive),
        (_, Some(b)) if b == decisive => Value::Bool(decisive),
        (Some(_), Some(_)) => Value::Bool(!decisive),
        _ => Value::Missing,
    })
}

fn call(function: &str, mut values: Vec<Value>) -> RuntimeResult<Value> {
    let receiver = values.remove(0);
    if function == "Interval" {
        let [end, incl_s, incl_e] = values.as_slice() else {
            return Err(RuntimeError::type_error("Interval takes four arguments"));
        };
        return Ok(Value::Interval {
            start: Box::new(receiver),
            end: Box::new(end.clone()),
            includes_start: incl_s.as_bool().unwrap_or(true),
            includes_end: incl_e.as_bool().unwrap_or(false),
        });
    }
    match receiver {
        Value::Str(s) if function == "~" => {
            let target = str_at(&values, 0)?;
            Ok(Value::Bool(intrinsics::matches(&s, target)?))
        }
        Value::Str(s) => string_function(function, &s, &values),
        Value::Array(items) => match function {
            "Call" => {
                let phased = values.first().and_then(Value::as_bool).unwrap_or(false);
                let alleles = items
                    .iter()
                    .map(|a| index_value(a, "int32 allele").map(|a| a as i32))
                    .collect::<RuntimeResult<Vec<i32>>>()?;
                Ok(Value::Call { alleles, phased })
            }
            _ => array_function(function, items, values),
        },
        Value::Set(items) => set_function(function, items, values),
        Value::Dict(entries) => dict_function(function, entries, values),
        Value::Call { alleles, phased } => call_function(function, &alleles, phased, &values),
        Value::Locus { contig, position } => match function {
            "contig" => Ok(Value::Str(contig)),
            "position" => Ok(Value::I32(position)),
            _ => Err(no_function(function, "locus")),
        },
        Value::Interval {
            start,
            end,
            includes_start,
            includes_end,
        } => {
            let iv = Interval {
                start: *start,
                end: *end,
                includes_start,
                includes_end,
            };
            interval_function(function, iv, values)
        }
        other => Err(no_function(function, other.type_name())),
    }
}

fn no_function(function: &str, kind: &str) -> RuntimeError {
    RuntimeError::unsupported(format!("no function '{}' for {}", function, kind))
}

fn str_at(values: &[Value], i: usize) -> RuntimeResult<&str> {
    match values.get(i) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(expected("str argument", other)),
        None => Err(RuntimeError::type_error(format!("missing argument {}", i + 1))),
    }
}

fn int_at(values: &[Value], i: usize) -> RuntimeResult<i64> {
    match values.get(i) {
        Some(v) => index_value(v, "integer argument"),
        None => Err(RuntimeError::type_error(format!("missing argument {}", i + 1))),
    }
}

/// Characters of `s` selected by a unit-step slice
fn substring(s: &str, start: i64, stop: Option<i64>) -> RuntimeResult<Value> {
    let chars: Vec<char> = s.chars().collect();
    let positions = slice_positions(chars.len(), start, stop, 1)?;
    Ok(Value::Str(positions.into_iter().map(|i| chars[i]).collect()))
}

fn string_function(function: &str, s: &str, values: &[Value]) -> RuntimeResult<Value> {
    let out = match function {
        "Locus" => Value::Locus {
            contig: s.to_string(),
            position: int_at(values, 0)? as i32,
        },
        "index" => Value::Str(intrinsics::char_at(s, int_at(values, 0)? as i32)?),
        "sliceRight" => substring(s, int_at(values, 0)?, None)?,
        "sliceLeft" => substring(s, 0, Some(int_at(values, 0)?))?,
        "slice" => substring(s, int_at(values, 0)?, Some(int_at(values, 1)?))?,
        "length" => Value::I32(intrinsics::length(s)),
        "replace" => Value::Str(intrinsics::replace(s, str_at(values, 0)?, str_at(values, 1)?)?),
        "split" => {
            let n = match values.get(1) {
                Some(n) => Some(index_value(n, "int32 piece count")? as i32),
                None => None,
            };
            Value::from(intrinsics::split(s, str_at(values, 0)?, n)?)
        }
        "lower" => Value::Str(intrinsics::lower(s)),
        "upper" => Value::Str(intrinsics::upper(s)),
        "strip" => Value::Str(intrinsics::strip(s)),
        "reverse" => Value::Str(intrinsics::reverse(s)),
        "contains" => Value::Bool(intrinsics::contains(s, str_at(values, 0)?)),
        "startswith" => Value::Bool(intrinsics::starts_with(s, str_at(values, 0)?)),
        "endswith" => Value::Bool(intrinsics::ends_with(s, str_at(values, 0)?)),
        "firstMatchIn" => match intrinsics::first_match_in(s, str_at(values, 0)?)? {
            Some(groups) => Value::from(groups),
            None => Value::Missing,
        },
        "translate" => {
            let mapping = match values.first() {
                Some(Value::Dict(entries)) => entries
                    .iter()
                    .map(|(k, v)| match (k, v) {
                        (Value::Str(k), Value::Str(v)) => Ok((k.clone(), v.clone())),
                        _ => Err(RuntimeError::type_error(
                            "translate mapping must be dict<str, str>",
                        )),
                    })
                    .collect::<RuntimeResult<BTreeMap<String, String>>>()?,
                _ => return Err(RuntimeError::type_error("translate takes a dict")),
            };
            Value::Str(intrinsics::translate(s, &mapping)?)
        }
        _ => return Err(no_function(function, "str")),
    };
    Ok(out)
}

fn array_function(
    function: &str,
    mut items: Vec<Value>,
    values: Vec<Value>,
) -> RuntimeResult<Value> {
    let mut values = values.into_iter();
    match (function, values.next()) {
        ("contains", Some(x)) => Ok(Value::Bool(items.contains(&x))),
        ("append", Some(x)) => {
            items.push(x);
            Ok(Value::Array(items))
        }
        ("extend", Some(Value::Array(more))) => {
            items.extend(more);
            Ok(Value::Array(items))
        }
        _ => Err(no_function(function, "array")),
    }
}

fn set_function(
    function: &str,
    mut items: BTreeSet<Value>,
    values: Vec<Value>,
) -> RuntimeResult<Value> {
    let mut values = values.into_iter();
    let out = match (function, values.next()) {
        ("contains", Some(x)) => Value::Bool(items.contains(&x)),
        ("add", Some(x)) => {
            items.insert(x);
            Value::Set(items)
        }
        ("remove", Some(x)) => {
            items.remove(&x);
            Value::Set(items)
        }
        ("difference", Some(other)) => {
            let other = into_set(other)?;
            Value::Set(items.difference(&other).cloned().collect())
        }
        ("intersection", Some(other)) => {
            let other = into_set(other)?;
            Value::Set(items.intersection(&other).cloned().collect())
        }
        ("union", Some(other)) => {
            items.extend(into_set(other)?);
            Value::Set(items)
        }
        ("isSubset", Some(other)) => Value::Bool(items.is_subset(&into_set(other)?)),
        _ => return Err(no_function(function, "set")),
    };
    Ok(out)
}

fn dict_function(
    function: &str,
    mut entries: BTreeMap<Value, Value>,
    values: Vec<Value>,
) -> RuntimeResult<Value> {
    let mut values = values.into_iter();
    let out = match (function, values.next()) {
        ("index", Some(key)) => entries
            .remove(&key)
            .ok_or_else(|| RuntimeError::key_error(key.to_string()))?,
        ("get", Some(key)) => entries
            .remove(&key)
            .or_else(|| values.next())
            .unwrap_or(Value::Missing),
        ("contains", Some(key)) => Value::Bool(entries.contains_key(&key)),
        ("keySet", None) => Value::Set(entries.into_keys().collect()),
        ("keys", None) => Value::Array(entries.into_keys().collect()),
        ("values", None) => Value::Array(entries.into_values().collect()),
        _ => return Err(no_function(function, "dict")),
    };
    Ok(out)
}

fn call_function(
    function: &str,
    alleles: &[i32],
    phased: bool,
    values: &[Value],
) -> RuntimeResult<Value> {
    let ploidy = alleles.len();
    let het = ploidy == 2 && alleles[0] != alleles[1];
    let out = match function {
        "index" => {
            let i = int_at(values, 0)?;
            let at = usize::try_from(i)
                .ok()
                .filter(|&i| i < ploidy)
                .ok_or_else(|| RuntimeError::bounds_error(i, ploidy))?;
            Value::I32(alleles[at])
        }
        "ploidy" => Value::I32(ploidy as i32),
        "isPhased" => Value::Bool(phased),
        "isNonRef" => Value::Bool(alleles.iter().any(|&a| a > 0)),
        "isHet" => Value::Bool(het),
        "isHetNonRef" => Value::Bool(het && alleles.iter().all(|&a| a > 0)),
        "isHetRef" => Value::Bool(het && alleles.contains(&0)),
        "isHomRef" => Value::Bool(ploidy > 0 && alleles.iter().all(|&a| a == 0)),
        "isHomVar" => Value::Bool(
            ploidy > 0 && alleles[0] > 0 && alleles.iter().all(|&a| a == alleles[0]),
        ),
        "nNonRefAlleles" => Value::I32(alleles.iter().filter(|&&a| a > 0).count() as i32),
        "oneHotAlleles" => {
            let n = usize::try_from(int_at(values, 0)?)
                .map_err(|_| RuntimeError::type_error("allele count must be non-negative"))?;
            let mut counts = vec![0i32; n];
            for &a in alleles {
                let slot = usize::try_from(a)
                    .ok()
                    .and_then(|a| counts.get_mut(a))
                    .ok_or_else(|| RuntimeError::bounds_error(i64::from(a), n))?;
                *slot += 1;
            }
            Value::from(counts)
        }
        "unphasedDiploidGtIndex" => {
            if ploidy != 2 {
                return Err(RuntimeError::type_error(format!(
                    "unphased diploid index of a call with ploidy {}",
                    ploidy
                )));
            }
            let (j, k) = (alleles[0].min(alleles[1]), alleles[0].max(alleles[1]));
            Value::I32(k * (k + 1) / 2 + j)
        }
        _ => return Err(no_function(function, "call")),
    };
    Ok(out)
}

struct Interval {
    start: Value,
    end: Value,
    includes_start: bool,
    includes_end: bool,
}

impl Interval {
    fn contains(&self, p: &Value) -> bool {
        let above = self.start < *p || (self.includes_start && self.start == *p);
        let below = *p < self.end || (self.includes_end && *p == self.end);
        above && below
    }

    /// True if this interval starts no later than `other` ends
    fn starts_before_end_of(&self, other: &Interval) -> bool {
        self.start < other.end
            || (self.start == other.end && self.includes_start && other.includes_end)
    }

    fn overlaps(&self, other: &Interval) -> bool {
        self.starts_before_end_of(other) && other.starts_before_end_of(self)
    }
}

fn interval_function(function: &str, iv: Interval, values: Vec<Value>) -> RuntimeResult<Value> {
    let mut values = values.into_iter();
    let out = match (function, values.next()) {
        ("start", None) => iv.start,
        ("end", None) => iv.end,
        ("includesStart", None) => Value::Bool(iv.includes_start),
        ("includesEnd", None) => Value::Bool(iv.includes_end),
        ("contains", Some(p)) => Value::Bool(iv.contains(&p)),
        (
            "overlaps",
            Some(Value::Interval {
                start,
                end,
                includes_start,
                includes_end,
            }),
        ) => {
            let other = Interval {
                start: *start,
                end: *end,
                includes_start,
                includes_end,
            };
            Value::Bool(iv.overlaps(&other))
        }
        _ => return Err(no_function(function, "interval")),
    };
    Ok(out)
}
