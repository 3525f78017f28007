//! Genotype call, locus and interval façades.
//!
//! These are thin: every query is one named `Apply`. Reference-genome
//! lookups (PAR regions, contig lengths) are left to the engine.

use lazy_expr_runtime::{BinOp, CompOp};

use super::index::Bound;
use super::scalar::typed_arg;
use super::{
    construct, ArrayExpr, BooleanExpr, ExprLike, Expression, NumericExpr, StringExpr, ToExpr,
    TypedExpr,
};
use crate::error::{ExprError, ExprResult};
use crate::ir::Ir;
use crate::types::ExprType;

facade! {
    /// Expression of type `call`
    CallExpr
}

facade! {
    /// Expression of type `locus<genome>`
    LocusExpr
}

facade! {
    /// Expression of type `interval<point>`
    IntervalExpr
}

impl CallExpr {
    fn flag(&self, name: &str) -> ExprResult<BooleanExpr> {
        Ok(BooleanExpr::wrap(self.0.method(name, ExprType::Bool, vec![])?))
    }

    fn count(&self, name: &str) -> ExprResult<NumericExpr> {
        Ok(NumericExpr::wrap(self.0.method(name, ExprType::Int32, vec![])?))
    }

    /// Allele index at position `i` of the call
    pub fn allele(&self, i: impl Into<Bound>) -> ExprResult<NumericExpr> {
        let i = i.into().to_index_expr(self.0.context(), &ExprType::Int32)?;
        Ok(NumericExpr::wrap(self.0.method("index", ExprType::Int32, vec![i])?))
    }

    /// Number of alleles in the call
    pub fn ploidy(&self) -> ExprResult<NumericExpr> {
        self.count("ploidy")
    }

    pub fn phased(&self) -> ExprResult<BooleanExpr> {
        self.flag("isPhased")
    }

    fn ploidy_is(&self, n: i32) -> ExprResult<BooleanExpr> {
        let ploidy = self.ploidy()?;
        let ir = Ir::compare(CompOp::Eq, ploidy.ir().clone(), Ir::I32(n));
        Ok(BooleanExpr::wrap(ploidy.expr().derive(ir, ExprType::Bool)))
    }

    pub fn is_haploid(&self) -> ExprResult<BooleanExpr> {
        self.ploidy_is(1)
    }

    pub fn is_diploid(&self) -> ExprResult<BooleanExpr> {
        self.ploidy_is(2)
    }

    /// At least one non-reference allele
    pub fn is_non_ref(&self) -> ExprResult<BooleanExpr> {
        self.flag("isNonRef")
    }

    pub fn is_het(&self) -> ExprResult<BooleanExpr> {
        self.flag("isHet")
    }

    /// Heterozygous with two distinct non-reference alleles
    pub fn is_het_non_ref(&self) -> ExprResult<BooleanExpr> {
        self.flag("isHetNonRef")
    }

    /// Heterozygous with one reference allele
    pub fn is_het_ref(&self) -> ExprResult<BooleanExpr> {
        self.flag("isHetRef")
    }

    pub fn is_hom_ref(&self) -> ExprResult<BooleanExpr> {
        self.flag("isHomRef")
    }

    pub fn is_hom_var(&self) -> ExprResult<BooleanExpr> {
        self.flag("isHomVar")
    }

    pub fn n_alt_alleles(&self) -> ExprResult<NumericExpr> {
        self.count("nNonRefAlleles")
    }

    /// Per-allele counts over the variant's `alleles`
    pub fn one_hot_alleles(&self, alleles: impl ToExpr) -> ExprResult<ArrayExpr> {
        let alleles = typed_arg(
            self.0.context(),
            alleles,
            &ExprType::array(ExprType::Str),
            "alleles",
        )?;
        let n = alleles.derive(
            Ir::ArrayLen(Box::new(alleles.ir().clone())),
            ExprType::Int32,
        );
        let out = self
            .0
            .method("oneHotAlleles", ExprType::array(ExprType::Int32), vec![n])?;
        Ok(super::CollectionExpr::wrap(out))
    }

    /// Index of an unphased diploid genotype in triangular order
    pub fn unphased_diploid_gt_index(&self) -> ExprResult<NumericExpr> {
        self.count("unphasedDiploidGtIndex")
    }
}

impl LocusExpr {
    /// Reference genome named by the type
    pub fn genome(&self) -> &str {
        match self.0.dtype() {
            ExprType::Locus(g) => g,
            _ => "",
        }
    }

    fn flag(&self, name: &str) -> ExprResult<BooleanExpr> {
        Ok(BooleanExpr::wrap(self.0.method(name, ExprType::Bool, vec![])?))
    }

    pub fn contig(&self) -> ExprResult<StringExpr> {
        Ok(StringExpr::wrap(self.0.method("contig", ExprType::Str, vec![])?))
    }

    /// 1-based position on the contig
    pub fn position(&self) -> ExprResult<NumericExpr> {
        Ok(NumericExpr::wrap(self.0.method("position", ExprType::Int32, vec![])?))
    }

    /// Position across all contigs, in genome order
    pub fn global_position(&self) -> ExprResult<NumericExpr> {
        Ok(NumericExpr::wrap(self.0.method(
            "locusToGlobalPos",
            ExprType::Int64,
            vec![],
        )?))
    }

    pub fn in_x_nonpar(&self) -> ExprResult<BooleanExpr> {
        self.flag("inXNonPar")
    }

    pub fn in_x_par(&self) -> ExprResult<BooleanExpr> {
        self.flag("inXPar")
    }

    pub fn in_y_nonpar(&self) -> ExprResult<BooleanExpr> {
        self.flag("inYNonPar")
    }

    pub fn in_y_par(&self) -> ExprResult<BooleanExpr> {
        self.flag("inYPar")
    }

    pub fn in_autosome(&self) -> ExprResult<BooleanExpr> {
        self.flag("isAutosomal")
    }

    pub fn in_autosome_or_par(&self) -> ExprResult<BooleanExpr> {
        self.flag("isAutosomalOrPseudoAutosomal")
    }

    pub fn in_mito(&self) -> ExprResult<BooleanExpr> {
        self.flag("isMitochondrial")
    }

    /// Closed interval from `before` bases upstream to `after` downstream,
    /// clipped to the contig
    pub fn window(&self, before: impl ToExpr, after: impl ToExpr) -> ExprResult<IntervalExpr> {
        let ctx = self.0.context();
        let before = typed_arg(ctx, before, &ExprType::Int32, "window size")?;
        let after = typed_arg(ctx, after, &ExprType::Int32, "window size")?;
        let contig = self.contig()?.into_expression();
        let pos = self.position()?.into_expression();
        let locus_type = self.0.dtype().clone();

        let lo = Ir::binary(BinOp::Sub, pos.ir().clone(), before.ir().clone());
        let lo = Ir::if_(
            Ir::compare(CompOp::Ge, lo.clone(), Ir::I32(1)),
            lo,
            Ir::I32(1),
        );
        let hi = Ir::binary(BinOp::Add, pos.ir().clone(), after.ir().clone());
        let length = Ir::apply("contigLength", ExprType::Int32, vec![contig.ir().clone()]);
        let hi = Ir::if_(
            Ir::compare(CompOp::Le, hi.clone(), length.clone()),
            hi,
            length,
        );
        let start = Ir::apply(
            "Locus",
            locus_type.clone(),
            vec![contig.ir().clone(), lo],
        );
        let end = Ir::apply("Locus", locus_type.clone(), vec![contig.ir().clone(), hi]);
        let typ = ExprType::interval(locus_type);
        let ir = Ir::apply(
            "Interval",
            typ.clone(),
            vec![start, end, Ir::True, Ir::True],
        );
        Ok(IntervalExpr(Expression::combine(
            ctx,
            ir,
            typ,
            &[&self.0, &before, &after],
        )?))
    }
}

impl IntervalExpr {
    pub fn point_type(&self) -> &ExprType {
        match self.0.dtype() {
            ExprType::Interval(p) => p,
            other => other,
        }
    }

    fn point(&self, name: &str) -> ExprResult<TypedExpr> {
        construct(self.0.method(name, self.point_type().clone(), vec![])?)
    }

    fn flag(&self, name: &str) -> ExprResult<BooleanExpr> {
        Ok(BooleanExpr::wrap(self.0.method(name, ExprType::Bool, vec![])?))
    }

    pub fn start(&self) -> ExprResult<TypedExpr> {
        self.point("start")
    }

    pub fn end(&self) -> ExprResult<TypedExpr> {
        self.point("end")
    }

    pub fn includes_start(&self) -> ExprResult<BooleanExpr> {
        self.flag("includesStart")
    }

    pub fn includes_end(&self) -> ExprResult<BooleanExpr> {
        self.flag("includesEnd")
    }

    /// True if `value` lies in the interval; `value` must have the point type
    pub fn contains(&self, value: impl ToExpr) -> ExprResult<BooleanExpr> {
        let value = value.to_expr(self.0.context());
        if value.dtype() != self.point_type() {
            return Err(ExprError::type_mismatch(format!(
                "interval over '{}' cannot contain '{}'",
                self.point_type(),
                value.dtype()
            )));
        }
        Ok(BooleanExpr::wrap(self.0.method(
            "contains",
            ExprType::Bool,
            vec![value],
        )?))
    }

    /// True if the intervals share a point; both must have the same point type
    pub fn overlaps(&self, other: impl ToExpr) -> ExprResult<BooleanExpr> {
        let other = other.to_expr(self.0.context());
        if other.dtype() != self.0.dtype() {
            return Err(ExprError::type_mismatch(format!(
                "cannot test '{}' for overlap with '{}'",
                self.0.dtype(),
                other.dtype()
            )));
        }
        Ok(BooleanExpr::wrap(self.0.method(
            "overlaps",
            ExprType::Bool,
            vec![other],
        )?))
    }
}
