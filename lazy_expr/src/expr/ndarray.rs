//! NDArray façade and shape algebra.
//!
//! Shapes are only known at evaluation, so every shape-dependent value
//! (negative slice bounds, default stops) is emitted as IR over
//! `NDArrayShape` of the operand, bound once with `Let`. Ranks are static
//! and checked here.
//!
//! Broadcasting follows numpy: the lower-rank operand gains leading axes of
//! extent 1 through `NDArrayReindex`.

use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use lazy_expr_runtime::{BinOp, CompOp, NDArrayValue, RuntimeError};

use super::index::{Bound, NDIndex, Slice};
use super::{construct, make_tuple, ExprLike, Expression, ToExpr, TupleExpr, TypedExpr};
use crate::coercion::unify_types;
use crate::error::{ExprError, ExprResult};
use crate::eval::Backend;
use crate::ir::{matmul_ndim, Ir};
use crate::types::ExprType;

facade! {
    /// Expression of type `ndarray<T, N>` with a numeric or boolean element
    NDArrayExpr
}

/// `e` with leading axes of extent 1 up to rank `ndim`
pub(crate) fn broadcast_to(e: &Expression, ndim: usize) -> Expression {
    let (elem, n) = match e.dtype() {
        ExprType::NDArray(elem, n) if *n < ndim => ((**elem).clone(), *n),
        _ => return e.clone(),
    };
    let idx_expr: Vec<usize> = (n..ndim).rev().chain(0..n).collect();
    e.derive(
        Ir::NDArrayReindex {
            nd: Box::new(e.ir().clone()),
            idx_expr,
        },
        ExprType::ndarray(elem, ndim),
    )
}

/// Check an axis list: in range and without repeats
fn check_axes(axes: &[usize], ndim: usize, what: &str) -> ExprResult<()> {
    let mut seen = HashSet::new();
    for &axis in axes {
        if axis >= ndim {
            return Err(ExprError::shape(format!(
                "{}: axis {} out of range for ndarray of rank {}",
                what, axis, ndim
            )));
        }
        if !seen.insert(axis) {
            return Err(ExprError::shape(format!(
                "{}: axis {} repeated in {:?}",
                what, axis, axes
            )));
        }
    }
    Ok(())
}

impl NDArrayExpr {
    pub fn ndim(&self) -> usize {
        self.0.dtype().ndim().unwrap_or(0)
    }

    pub fn element_type(&self) -> &ExprType {
        self.0.dtype().element_type().unwrap_or(self.0.dtype())
    }

    fn require_numeric(&self, what: &str) -> ExprResult<()> {
        if self.element_type().is_numeric() {
            Ok(())
        } else {
            Err(ExprError::expected(
                &format!("numeric ndarray for {}", what),
                self.0.dtype(),
            ))
        }
    }

    /// Extent of every axis, as a tuple of int64
    pub fn shape(&self) -> TupleExpr {
        TupleExpr::wrap(self.0.derive(
            Ir::NDArrayShape(Box::new(self.0.ir().clone())),
            ExprType::Tuple(vec![ExprType::Int64; self.ndim()]),
        ))
    }

    /// Permute axes; output axis `i` is input axis `axes[i]`
    ///
    /// Without `axes` the order is reversed. Arrays of rank below 2 are
    /// returned unchanged.
    pub fn transpose(&self, axes: Option<&[usize]>) -> ExprResult<TypedExpr> {
        let n = self.ndim();
        let axes: Vec<usize> = match axes {
            Some(axes) => {
                if axes.len() != n {
                    return Err(ExprError::shape(format!(
                        "transpose of an ndarray of rank {} needs {} axes, got {:?}",
                        n, n, axes
                    )));
                }
                check_axes(axes, n, "transpose")?;
                axes.to_vec()
            }
            None => (0..n).rev().collect(),
        };
        if n < 2 {
            return construct(self.0.clone());
        }
        construct(self.0.derive(
            Ir::NDArrayReindex {
                nd: Box::new(self.0.ir().clone()),
                idx_expr: axes,
            },
            self.0.dtype().clone(),
        ))
    }

    /// Reversed-axes transpose
    pub fn t(&self) -> ExprResult<TypedExpr> {
        self.transpose(None)
    }

    /// Index with one entry per axis
    ///
    /// Integer entries drop their axis; slices keep it. With no slices the
    /// result is a single element.
    pub fn index<I>(&self, entries: I) -> ExprResult<TypedExpr>
    where
        I: IntoIterator,
        I::Item: Into<NDIndex>,
    {
        let entries: Vec<NDIndex> = entries.into_iter().map(Into::into).collect();
        let n = self.ndim();
        if entries.len() != n {
            return Err(ExprError::shape(format!(
                "ndarray of rank {} indexed with {} entries",
                n,
                entries.len()
            )));
        }
        let ctx = self.0.context();

        if entries.iter().all(|e| matches!(e, NDIndex::At(_))) {
            let mut indices = Vec::with_capacity(n);
            for entry in entries {
                if let NDIndex::At(b) = entry {
                    indices.push(b.to_index_expr(ctx, &ExprType::Int64)?);
                }
            }
            let ir = Ir::NDArrayRef {
                nd: Box::new(self.0.ir().clone()),
                indices: indices.iter().map(|e| e.ir().clone()).collect(),
            };
            let mut parts: Vec<&Expression> = vec![&self.0];
            parts.extend(indices.iter());
            return construct(Expression::combine(
                ctx,
                ir,
                self.element_type().clone(),
                &parts,
            )?);
        }

        let uid = ctx.fresh();
        let bound = self.0.variable(&uid, self.0.dtype().clone());
        let shape = Ir::NDArrayShape(Box::new(bound.ir().clone()));
        let mut kept = 0;
        let mut items = Vec::with_capacity(n);
        for (axis, entry) in entries.into_iter().enumerate() {
            match entry {
                NDIndex::At(b) => items.push(b.to_index_expr(ctx, &ExprType::Int64)?),
                NDIndex::Slice(s) => {
                    kept += 1;
                    let extent = Ir::get_tuple_element(shape.clone(), axis);
                    items.push(self.normalize_slice(&bound, s, extent)?);
                }
            }
        }
        let slices = make_tuple(ctx, items)?;
        let ir = Ir::let_(
            uid,
            self.0.ir().clone(),
            Ir::NDArraySlice {
                nd: Box::new(bound.into_ir()),
                slices: Box::new(slices.ir().clone()),
            },
        );
        construct(Expression::combine(
            ctx,
            ir,
            ExprType::ndarray(self.element_type().clone(), kept),
            &[&self.0, &slices],
        )?)
    }

    /// `(start, stop, step)` with negative bounds resolved against `extent`
    fn normalize_slice(&self, like: &Expression, s: Slice, extent: Ir) -> ExprResult<Expression> {
        let ctx = self.0.context();
        let step = match s.step {
            Some(b) => b.to_index_expr(ctx, &ExprType::Int64)?,
            None => 1i64.to_expr(ctx),
        };
        let forward = Ir::compare(CompOp::Ge, step.ir().clone(), Ir::I64(0));
        let resolve = |b: Bound| -> ExprResult<Expression> {
            match b {
                Bound::Literal(v) if v >= 0 => Ok(v.to_expr(ctx)),
                Bound::Literal(v) => Ok(like.derive(
                    Ir::binary(BinOp::Add, extent.clone(), Ir::I64(v)),
                    ExprType::Int64,
                )),
                b => {
                    let e = b.to_index_expr(ctx, &ExprType::Int64)?;
                    let ir = Ir::if_(
                        Ir::compare(CompOp::Ge, e.ir().clone(), Ir::I64(0)),
                        e.ir().clone(),
                        Ir::binary(BinOp::Add, extent.clone(), e.ir().clone()),
                    );
                    Ok(Expression::combine(ctx, ir, ExprType::Int64, &[like, &e])?)
                }
            }
        };
        let start = match s.start {
            Some(b) => resolve(b)?,
            None => like.derive(
                Ir::if_(
                    forward.clone(),
                    Ir::I64(0),
                    Ir::binary(BinOp::Sub, extent.clone(), Ir::I64(1)),
                ),
                ExprType::Int64,
            ),
        };
        let stop = match s.stop {
            Some(b) => resolve(b)?,
            None => like.derive(
                Ir::if_(forward, extent.clone(), Ir::I64(-1)),
                ExprType::Int64,
            ),
        };
        make_tuple(ctx, vec![start, stop, step])
    }

    /// Same elements under a new shape given by literal extents
    pub fn reshape(&self, shape: &[i64]) -> ExprResult<TypedExpr> {
        let dims: Vec<Expression> = shape.iter().map(|&d| d.to_expr(self.0.context())).collect();
        let tuple = make_tuple(self.0.context(), dims)?;
        self.reshape_expr(tuple)
    }

    /// Same elements under a new shape given by a tuple of integers
    pub fn reshape_expr(&self, shape: impl ToExpr) -> ExprResult<TypedExpr> {
        let shape = shape.to_expr(self.0.context());
        let dims = match shape.dtype() {
            ExprType::Tuple(dims) if dims.iter().all(ExprType::is_integral) => dims.len(),
            other => return Err(ExprError::expected("tuple of integers as shape", other)),
        };
        let shape = shape.coerce_to(&ExprType::Tuple(vec![ExprType::Int64; dims]))?;
        let ir = Ir::NDArrayReshape {
            nd: Box::new(self.0.ir().clone()),
            shape: Box::new(shape.ir().clone()),
        };
        construct(Expression::combine(
            self.0.context(),
            ir,
            ExprType::ndarray(self.element_type().clone(), dims),
            &[&self.0, &shape],
        )?)
    }

    /// Apply `f` to every element
    pub fn map<F, R>(&self, f: F) -> ExprResult<TypedExpr>
    where
        F: FnOnce(TypedExpr) -> ExprResult<R>,
        R: ToExpr,
    {
        let uid = self.0.context().fresh();
        let x = self.0.variable(&uid, self.element_type().clone());
        let body = f(x.typed()?)?.to_expr(self.0.context());
        let typ = ExprType::ndarray(body.dtype().clone(), self.ndim());
        let ir = Ir::NDArrayMap {
            nd: Box::new(self.0.ir().clone()),
            name: uid,
            body: Box::new(body.ir().clone()),
        };
        construct(Expression::combine(
            self.0.context(),
            ir,
            typ,
            &[&self.0, &body],
        )?)
    }

    /// Sum over `axes`, or over every axis
    ///
    /// Summing every axis gives a numeric scalar.
    pub fn sum(&self, axes: Option<&[usize]>) -> ExprResult<TypedExpr> {
        self.require_numeric("sum")?;
        let n = self.ndim();
        let axes: Vec<usize> = match axes {
            Some(axes) => {
                check_axes(axes, n, "sum")?;
                axes.to_vec()
            }
            None => (0..n).collect(),
        };
        let rank = n - axes.len();
        let summed = self.0.derive(
            Ir::NDArrayAgg {
                nd: Box::new(self.0.ir().clone()),
                axes,
            },
            ExprType::ndarray(self.element_type().clone(), rank),
        );
        construct(if rank == 0 {
            scalar_of(summed, self.element_type().clone())
        } else {
            summed
        })
    }

    /// Matrix product with numpy stacking rules
    ///
    /// Rank-1 operands act as vectors; operands of rank above 2 are stacks
    /// of matrices and broadcast against each other.
    pub fn matmul(&self, other: impl ToExpr) -> ExprResult<TypedExpr> {
        let other = other.to_expr(self.0.context());
        let (other_elem, m) = match other.dtype() {
            ExprType::NDArray(e, m) if e.is_numeric() => ((**e).clone(), *m),
            t => return Err(ExprError::expected("numeric ndarray for matmul", t)),
        };
        self.require_numeric("matmul")?;
        let n = self.ndim();
        if n == 0 || m == 0 {
            return Err(ExprError::shape(
                "matmul operands must have rank at least 1",
            ));
        }

        let (left, right) = if n > 1 && m > 1 {
            let ndim = n.max(m);
            (broadcast_to(&self.0, ndim), broadcast_to(&other, ndim))
        } else {
            (self.0.clone(), other)
        };
        let (ln, rn) = (left.dtype().ndim().unwrap_or(n), right.dtype().ndim().unwrap_or(m));

        let elem = unify_types(self.element_type(), &other_elem).ok_or_else(|| {
            ExprError::type_mismatch(format!(
                "cannot multiply '{}' by '{}'",
                self.element_type(),
                other_elem
            ))
        })?;
        let left = left.coerce_to(&ExprType::ndarray(elem.clone(), ln))?;
        let right = right.coerce_to(&ExprType::ndarray(elem.clone(), rn))?;

        let rank = matmul_ndim(ln, rn);
        let product = Expression::combine(
            self.0.context(),
            Ir::NDArrayMatMul {
                left: Box::new(left.ir().clone()),
                right: Box::new(right.ir().clone()),
            },
            ExprType::ndarray(elem.clone(), rank),
            &[&left, &right],
        )?;
        construct(if rank == 0 {
            scalar_of(product, elem)
        } else {
            product
        })
    }

    /// Write as a `.npy` file; returns the path written
    ///
    /// `.npy` is appended to `uri` unless already present.
    pub fn save(&self, backend: &dyn Backend, uri: &str) -> ExprResult<String> {
        let path = if uri.ends_with(".npy") {
            uri.to_string()
        } else {
            format!("{}.npy", uri)
        };
        let write = self.0.derive(
            Ir::NDArrayWrite {
                nd: Box::new(self.0.ir().clone()),
                path: Box::new(Ir::str(path.clone())),
            },
            ExprType::Str,
        );
        write.eval(backend)?;
        tracing::debug!(path = %path, "saved ndarray");
        Ok(path)
    }

    /// Evaluate into a local ndarray by a round trip through a `.npy` file
    pub fn to_ndarray(&self, backend: &dyn Backend) -> ExprResult<NDArrayValue> {
        let file = std::env::temp_dir().join(format!(
            "lazy_expr_{}_{}.npy",
            std::process::id(),
            SCRATCH_FILES.fetch_add(1, Ordering::Relaxed)
        ));
        let path = self.save(backend, &file.to_string_lossy())?;
        let bytes = fs::read(&path).map_err(RuntimeError::from)?;
        let removed = fs::remove_file(&path);
        if let Err(err) = removed {
            tracing::warn!(path = %path, error = %err, "could not remove temporary file");
        }
        let (value, _) = NDArrayValue::from_npy_bytes(&bytes)?;
        Ok(value)
    }
}

/// Counter for `to_ndarray` scratch file names
static SCRATCH_FILES: AtomicU64 = AtomicU64::new(0);

/// The single element of a rank-0 ndarray
fn scalar_of(nd: Expression, elem: ExprType) -> Expression {
    nd.derive(
        Ir::NDArrayRef {
            nd: Box::new(nd.ir().clone()),
            indices: Vec::new(),
        },
        elem,
    )
}
