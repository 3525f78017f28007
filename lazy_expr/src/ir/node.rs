//! IR node definitions.

use lazy_expr_runtime::{BinOp, CompOp, UnaryOp};
use serde::{Deserialize, Serialize};

use crate::types::ExprType;

/// Immutable IR tree node
///
/// Each variant owns its children; trees are never shared or cyclic. Names
/// bound by `Let` and the lambda-style nodes are referenced from their body
/// through `Ref`, which carries the bound type so that every node can be
/// typed without an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ir {
    // ===== Literals =====
    True,
    False,
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    /// Missing value of a type
    NA(ExprType),

    // ===== Bindings and control =====
    /// Free variable or lambda-bound name
    Ref { name: String, typ: ExprType },
    /// Named value supplied by the backend
    TopLevelReference { name: String, typ: ExprType },
    Let {
        name: String,
        value: Box<Ir>,
        body: Box<Ir>,
    },
    If {
        cond: Box<Ir>,
        then: Box<Ir>,
        otherwise: Box<Ir>,
    },
    IsNA(Box<Ir>),
    /// Raise an error with a message when evaluated
    Die { message: String, typ: ExprType },

    // ===== Primitive operations =====
    Cast { value: Box<Ir>, typ: ExprType },
    ApplyBinaryPrimOp {
        op: BinOp,
        left: Box<Ir>,
        right: Box<Ir>,
    },
    ApplyUnaryPrimOp { op: UnaryOp, value: Box<Ir> },
    ApplyComparisonOp {
        op: CompOp,
        left: Box<Ir>,
        right: Box<Ir>,
    },
    /// Named function application
    Apply {
        function: String,
        ret_type: ExprType,
        args: Vec<Ir>,
    },
    /// Aggregator application, evaluated by the engine over an axis
    ApplyAggOp {
        op: String,
        ret_type: ExprType,
        args: Vec<Ir>,
    },

    // ===== Collections =====
    MakeArray { elements: Vec<Ir>, elem_type: ExprType },
    ArrayRef { array: Box<Ir>, index: Box<Ir> },
    ArrayLen(Box<Ir>),
    /// `start:stop:step` slice; `stop` of `None` means the end
    ArraySlice {
        array: Box<Ir>,
        start: Box<Ir>,
        stop: Option<Box<Ir>>,
        step: Box<Ir>,
    },
    ArrayRange {
        start: Box<Ir>,
        stop: Box<Ir>,
        step: Box<Ir>,
    },
    /// Positional combination of two equal-length arrays
    ArrayZip {
        left: Box<Ir>,
        right: Box<Ir>,
        left_name: String,
        right_name: String,
        body: Box<Ir>,
    },
    ToSet(Box<Ir>),
    ToArray(Box<Ir>),
    /// Array of (key, value) tuples to dict
    ToDict(Box<Ir>),
    ArrayMap {
        array: Box<Ir>,
        name: String,
        body: Box<Ir>,
    },
    ArrayFilter {
        array: Box<Ir>,
        name: String,
        cond: Box<Ir>,
    },
    ArrayFlatMap {
        array: Box<Ir>,
        name: String,
        body: Box<Ir>,
    },
    ArrayFold {
        array: Box<Ir>,
        zero: Box<Ir>,
        accum_name: String,
        value_name: String,
        body: Box<Ir>,
    },
    ArrayScan {
        array: Box<Ir>,
        zero: Box<Ir>,
        accum_name: String,
        value_name: String,
        body: Box<Ir>,
    },
    /// Array of (key, value) tuples to dict of key to array of values
    GroupByKey(Box<Ir>),

    // ===== Structs and tuples =====
    MakeStruct(Vec<(String, Ir)>),
    SelectFields { old: Box<Ir>, fields: Vec<String> },
    InsertFields {
        old: Box<Ir>,
        fields: Vec<(String, Ir)>,
        field_order: Option<Vec<String>>,
    },
    GetField { o: Box<Ir>, name: String },
    MakeTuple(Vec<Ir>),
    GetTupleElement { o: Box<Ir>, idx: usize },

    // ===== NDArrays =====
    /// Row-major data array and int64 shape tuple
    MakeNDArray { data: Box<Ir>, shape: Box<Ir> },
    NDArrayShape(Box<Ir>),
    NDArrayReshape { nd: Box<Ir>, shape: Box<Ir> },
    /// Element at one int64 index per axis
    NDArrayRef { nd: Box<Ir>, indices: Vec<Ir> },
    /// Tuple with one entry per axis: an int64 index, or a
    /// `(start, stop, step)` tuple
    NDArraySlice { nd: Box<Ir>, slices: Box<Ir> },
    /// Output axis `i` reads input axis `idx_expr[i]`; entries at or beyond
    /// the input rank introduce new axes of extent 1
    NDArrayReindex { nd: Box<Ir>, idx_expr: Vec<usize> },
    NDArrayMap {
        nd: Box<Ir>,
        name: String,
        body: Box<Ir>,
    },
    NDArrayMap2 {
        left: Box<Ir>,
        right: Box<Ir>,
        left_name: String,
        right_name: String,
        body: Box<Ir>,
    },
    NDArrayMatMul { left: Box<Ir>, right: Box<Ir> },
    /// Sum over the listed axes
    NDArrayAgg { nd: Box<Ir>, axes: Vec<usize> },
    /// Persist an ndarray to the path given by a string child
    NDArrayWrite { nd: Box<Ir>, path: Box<Ir> },
}

impl Ir {
    pub fn bool(value: bool) -> Ir {
        if value {
            Ir::True
        } else {
            Ir::False
        }
    }

    pub fn str(value: impl Into<String>) -> Ir {
        Ir::Str(value.into())
    }

    pub fn reference(name: impl Into<String>, typ: ExprType) -> Ir {
        Ir::Ref {
            name: name.into(),
            typ,
        }
    }

    pub fn get_field(o: Ir, name: impl Into<String>) -> Ir {
        Ir::GetField {
            o: Box::new(o),
            name: name.into(),
        }
    }

    pub fn get_tuple_element(o: Ir, idx: usize) -> Ir {
        Ir::GetTupleElement { o: Box::new(o), idx }
    }

    pub fn let_(name: impl Into<String>, value: Ir, body: Ir) -> Ir {
        Ir::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn if_(cond: Ir, then: Ir, otherwise: Ir) -> Ir {
        Ir::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn apply(function: impl Into<String>, ret_type: ExprType, args: Vec<Ir>) -> Ir {
        Ir::Apply {
            function: function.into(),
            ret_type,
            args,
        }
    }

    pub fn cast(value: Ir, typ: ExprType) -> Ir {
        Ir::Cast {
            value: Box::new(value),
            typ,
        }
    }

    pub fn array_map(array: Ir, name: impl Into<String>, body: Ir) -> Ir {
        Ir::ArrayMap {
            array: Box::new(array),
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn binary(op: BinOp, left: Ir, right: Ir) -> Ir {
        Ir::ApplyBinaryPrimOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn compare(op: CompOp, left: Ir, right: Ir) -> Ir {
        Ir::ApplyComparisonOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Ir::Ref { .. })
    }

    /// Variant name, as rendered at the head of the s-expression form
    pub fn node_name(&self) -> &'static str {
        match self {
            Ir::True => "True",
            Ir::False => "False",
            Ir::I32(_) => "I32",
            Ir::I64(_) => "I64",
            Ir::F32(_) => "F32",
            Ir::F64(_) => "F64",
            Ir::Str(_) => "Str",
            Ir::NA(_) => "NA",
            Ir::Ref { .. } => "Ref",
            Ir::TopLevelReference { .. } => "TopLevelReference",
            Ir::Let { .. } => "Let",
            Ir::If { .. } => "If",
            Ir::IsNA(_) => "IsNA",
            Ir::Die { .. } => "Die",
            Ir::Cast { .. } => "Cast",
            Ir::ApplyBinaryPrimOp { .. } => "ApplyBinaryPrimOp",
            Ir::ApplyUnaryPrimOp { .. } => "ApplyUnaryPrimOp",
            Ir::ApplyComparisonOp { .. } => "ApplyComparisonOp",
            Ir::Apply { .. } => "Apply",
            Ir::ApplyAggOp { .. } => "ApplyAggOp",
            Ir::MakeArray { .. } => "MakeArray",
            Ir::ArrayRef { .. } => "ArrayRef",
            Ir::ArrayLen(_) => "ArrayLen",
            Ir::ArraySlice { .. } => "ArraySlice",
            Ir::ArrayRange { .. } => "ArrayRange",
            Ir::ArrayZip { .. } => "ArrayZip",
            Ir::ToSet(_) => "ToSet",
            Ir::ToArray(_) => "ToArray",
            Ir::ToDict(_) => "ToDict",
            Ir::ArrayMap { .. } => "ArrayMap",
            Ir::ArrayFilter { .. } => "ArrayFilter",
            Ir::ArrayFlatMap { .. } => "ArrayFlatMap",
            Ir::ArrayFold { .. } => "ArrayFold",
            Ir::ArrayScan { .. } => "ArrayScan",
            Ir::GroupByKey(_) => "GroupByKey",
            Ir::MakeStruct(_) => "MakeStruct",
            Ir::SelectFields { .. } => "SelectFields",
            Ir::InsertFields { .. } => "InsertFields",
            Ir::GetField { .. } => "GetField",
            Ir::MakeTuple(_) => "MakeTuple",
            Ir::GetTupleElement { .. } => "GetTupleElement",
            Ir::MakeNDArray { .. } => "MakeNDArray",
            Ir::NDArrayShape(_) => "NDArrayShape",
            Ir::NDArrayReshape { .. } => "NDArrayReshape",
            Ir::NDArrayRef { .. } => "NDArrayRef",
            Ir::NDArraySlice { .. } => "NDArraySlice",
            Ir::NDArrayReindex { .. } => "NDArrayReindex",
            Ir::NDArrayMap { .. } => "NDArrayMap",
            Ir::NDArrayMap2 { .. } => "NDArrayMap2",
            Ir::NDArrayMatMul { .. } => "NDArrayMatMul",
            Ir::NDArrayAgg { .. } => "NDArrayAgg",
            Ir::NDArrayWrite { .. } => "NDArrayWrite",
        }
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> Vec<&Ir> {
        match self {
            Ir::True
            | Ir::False
            | Ir::I32(_)
            | Ir::I64(_)
            | Ir::F32(_)
            | Ir::F64(_)
            | Ir::Str(_)
            | Ir::NA(_)
            | Ir::Ref { .. }
            | Ir::TopLevelReference { .. }
            | Ir::Die { .. } => Vec::new(),
            Ir::Let { value, body, .. } => vec![value, body],
            Ir::If {
                cond,
                then,
                otherwise,
            } => vec![cond, then, otherwise],
            Ir::IsNA(x)
            | Ir::ArrayLen(x)
            | Ir::ToSet(x)
            | Ir::ToArray(x)
            | Ir::ToDict(x)
            | Ir::GroupByKey(x)
            | Ir::NDArrayShape(x) => vec![x],
            Ir::Cast { value, .. } | Ir::ApplyUnaryPrimOp { value, .. } => vec![value],
            Ir::ApplyBinaryPrimOp { left, right, .. }
            | Ir::ApplyComparisonOp { left, right, .. }
            | Ir::NDArrayMatMul { left, right } => vec![left, right],
            Ir::Apply { args, .. } | Ir::ApplyAggOp { args, .. } => args.iter().collect(),
            Ir::MakeArray { elements, .. } | Ir::MakeTuple(elements) => elements.iter().collect(),
            Ir::ArrayRef { array, index } => vec![array, index],
            Ir::ArraySlice {
                array,
                start,
                stop,
                step,
            } => {
                let mut out: Vec<&Ir> = vec![array, start];
                if let Some(stop) = stop {
                    out.push(stop);
                }
                out.push(step);
                out
            }
            Ir::ArrayRange { start, stop, step } => vec![start, stop, step],
            Ir::ArrayZip {
                left, right, body, ..
            }
            | Ir::NDArrayMap2 {
                left, right, body, ..
            } => vec![left, right, body],
            Ir::ArrayMap { array, body, .. } | Ir::ArrayFlatMap { array, body, .. } => {
                vec![array, body]
            }
            Ir::ArrayFilter { array, cond, .. } => vec![array, cond],
            Ir::ArrayFold {
                array, zero, body, ..
            }
            | Ir::ArrayScan {
                array, zero, body, ..
            } => vec![array, zero, body],
            Ir::MakeStruct(fields) => fields.iter().map(|(_, ir)| ir).collect(),
            Ir::SelectFields { old, .. } => vec![old],
            Ir::InsertFields { old, fields, .. } => {
                let mut out: Vec<&Ir> = vec![old];
                out.extend(fields.iter().map(|(_, ir)| ir));
                out
            }
            Ir::GetField { o, .. } | Ir::GetTupleElement { o, .. } => vec![o],
            Ir::MakeNDArray { data, shape } => vec![data, shape],
            Ir::NDArrayReshape { nd, shape } => vec![nd, shape],
            Ir::NDArrayRef { nd, indices } => {
                let mut out: Vec<&Ir> = vec![nd];
                out.extend(indices.iter());
                out
            }
            Ir::NDArraySlice { nd, slices } => vec![nd, slices],
            Ir::NDArrayReindex { nd, .. } | Ir::NDArrayAgg { nd, .. } => vec![nd],
            Ir::NDArrayMap { nd, body, .. } => vec![nd, body],
            Ir::NDArrayWrite { nd, path } => vec![nd, path],
        }
    }

    /// Number of nodes in this tree
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Count nodes satisfying a predicate
    pub fn count_where(&self, pred: &dyn Fn(&Ir) -> bool) -> usize {
        usize::from(pred(self))
            + self
                .children()
                .iter()
                .map(|c| c.count_where(pred))
                .sum::<usize>()
    }
}
