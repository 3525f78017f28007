//! S-expression rendering of IR trees.
//!
//! ```text
//! (ArrayMap __uid_1 (Ref __uid_0) (ApplyBinaryPrimOp + (Ref __uid_1) (I32 1)))
//! ```

use std::fmt;

use super::Ir;
use crate::types::escape_field_name;

fn write_all(f: &mut fmt::Formatter<'_>, irs: &[Ir]) -> fmt::Result {
    for ir in irs {
        write!(f, " {}", ir)?;
    }
    Ok(())
}

fn write_names(f: &mut fmt::Formatter<'_>, names: &[String]) -> fmt::Result {
    let parts: Vec<String> = names.iter().map(|n| escape_field_name(n).into_owned()).collect();
    write!(f, "({})", parts.join(" "))
}

fn write_bindings(f: &mut fmt::Formatter<'_>, fields: &[(String, Ir)]) -> fmt::Result {
    for (name, ir) in fields {
        write!(f, " ({} {})", escape_field_name(name), ir)?;
    }
    Ok(())
}

fn write_axes(f: &mut fmt::Formatter<'_>, axes: &[usize]) -> fmt::Result {
    let parts: Vec<String> = axes.iter().map(|a| a.to_string()).collect();
    write!(f, "({})", parts.join(" "))
}

impl fmt::Display for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.node_name())?;
        match self {
            Ir::True | Ir::False => {}
            Ir::I32(v) => write!(f, " {}", v)?,
            Ir::I64(v) => write!(f, " {}", v)?,
            Ir::F32(v) => write!(f, " {:?}", v)?,
            Ir::F64(v) => write!(f, " {:?}", v)?,
            Ir::Str(s) => write!(f, " {:?}", s)?,
            Ir::NA(t) => write!(f, " {}", t)?,
            Ir::Ref { name, .. } | Ir::TopLevelReference { name, .. } => write!(f, " {}", name)?,
            Ir::Let { name, value, body } => write!(f, " {} {} {}", name, value, body)?,
            Ir::If {
                cond,
                then,
                otherwise,
            } => write!(f, " {} {} {}", cond, then, otherwise)?,
            Ir::IsNA(x)
            | Ir::ArrayLen(x)
            | Ir::ToSet(x)
            | Ir::ToArray(x)
            | Ir::ToDict(x)
            | Ir::GroupByKey(x)
            | Ir::NDArrayShape(x) => write!(f, " {}", x)?,
            Ir::Die { message, typ } => write!(f, " {} {:?}", typ, message)?,
            Ir::Cast { value, typ } => write!(f, " {} {}", typ, value)?,
            Ir::ApplyBinaryPrimOp { op, left, right } => {
                write!(f, " {} {} {}", op.as_str(), left, right)?
            }
            Ir::ApplyUnaryPrimOp { op, value } => write!(f, " {} {}", op.as_str(), value)?,
            Ir::ApplyComparisonOp { op, left, right } => {
                write!(f, " {} {} {}", op.as_str(), left, right)?
            }
            Ir::Apply {
                function,
                ret_type,
                args,
            } => {
                write!(f, " {} {}", function, ret_type)?;
                write_all(f, args)?;
            }
            Ir::ApplyAggOp { op, ret_type, args } => {
                write!(f, " {} {}", op, ret_type)?;
                write_all(f, args)?;
            }
            Ir::MakeArray {
                elements,
                elem_type,
            } => {
                write!(f, " {}", elem_type)?;
                write_all(f, elements)?;
            }
            Ir::ArrayRef { array, index } => write!(f, " {} {}", array, index)?,
            Ir::ArraySlice {
                array,
                start,
                stop,
                step,
            } => match stop {
                Some(stop) => write!(f, " {} {} {} {}", array, start, stop, step)?,
                None => write!(f, " {} {} None {}", array, start, step)?,
            },
            Ir::ArrayRange { start, stop, step } => write!(f, " {} {} {}", start, stop, step)?,
            Ir::ArrayZip {
                left,
                right,
                left_name,
                right_name,
                body,
            }
            | Ir::NDArrayMap2 {
                left,
                right,
                left_name,
                right_name,
                body,
            } => write!(f, " {} {} {} {} {}", left_name, right_name, left, right, body)?,
            Ir::ArrayMap { array, name, body } | Ir::ArrayFlatMap { array, name, body } => {
                write!(f, " {} {} {}", name, array, body)?
            }
            Ir::ArrayFilter { array, name, cond } => write!(f, " {} {} {}", name, array, cond)?,
            Ir::ArrayFold {
                array,
                zero,
                accum_name,
                value_name,
                body,
            }
            | Ir::ArrayScan {
                array,
                zero,
                accum_name,
                value_name,
                body,
            } => write!(
                f,
                " {} {} {} {} {}",
                accum_name, value_name, array, zero, body
            )?,
            Ir::MakeStruct(fields) => write_bindings(f, fields)?,
            Ir::SelectFields { old, fields } => {
                write!(f, " ")?;
                write_names(f, fields)?;
                write!(f, " {}", old)?;
            }
            Ir::InsertFields {
                old,
                fields,
                field_order,
            } => {
                write!(f, " {}", old)?;
                match field_order {
                    Some(order) => {
                        write!(f, " ")?;
                        write_names(f, order)?;
                    }
                    None => write!(f, " None")?,
                }
                write_bindings(f, fields)?;
            }
            Ir::GetField { o, name } => write!(f, " {} {}", escape_field_name(name), o)?,
            Ir::MakeTuple(elements) => write_all(f, elements)?,
            Ir::GetTupleElement { o, idx } => write!(f, " {} {}", idx, o)?,
            Ir::MakeNDArray { data, shape } => write!(f, " {} {}", data, shape)?,
            Ir::NDArrayReshape { nd, shape } => write!(f, " {} {}", nd, shape)?,
            Ir::NDArrayRef { nd, indices } => {
                write!(f, " {}", nd)?;
                write_all(f, indices)?;
            }
            Ir::NDArraySlice { nd, slices } => write!(f, " {} {}", nd, slices)?,
            Ir::NDArrayReindex { nd, idx_expr } => {
                write!(f, " ")?;
                write_axes(f, idx_expr)?;
                write!(f, " {}", nd)?;
            }
            Ir::NDArrayMap { nd, name, body } => write!(f, " {} {} {}", name, nd, body)?,
            Ir::NDArrayMatMul { left, right } => write!(f, " {} {}", left, right)?,
            Ir::NDArrayAgg { nd, axes } => {
                write!(f, " ")?;
                write_axes(f, axes)?;
                write!(f, " {}", nd)?;
            }
            Ir::NDArrayWrite { nd, path } => write!(f, " {} {}", nd, path)?,
        }
        write!(f, ")")
    }
}
