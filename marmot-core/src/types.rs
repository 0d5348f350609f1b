//! The type model consumed by the borrow analysis, together with the
//! variance queries it relies on.
//!
//! Types arrive fully resolved from the front-end; the analysis never infers
//! anything here. What it does need is the *region structure* of a type: how
//! many region positions it has, which type-level region sits at each one,
//! and with what variance each position propagates outlives constraints.
//! Those queries live at the bottom of this module as side-effect-free
//! methods on `TyId`.

use crate::{
    context::Context,
    interner_type, store_type,
    regions::{static_region, FreeRegions, RegionId},
    util::FmtWith,
};
use std::fmt;

interner_type! { TypeInterner : TyId -> Type }
store_type! { AdtStore : AdtId -> AdtDef }

/// How a position propagates subset relations between inner and outer
/// regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variance {
    Covariant,
    Contravariant,
    Invariant,
}

impl Variance {
    /// Compose the variance of an inner position with the variance of the
    /// constructor parameter it sits under.
    pub fn xform(self, nested: Variance) -> Variance {
        use Variance::*;
        match (self, nested) {
            (Invariant, _) | (_, Invariant) => Invariant,
            (Covariant, v) => v,
            (Contravariant, Covariant) => Contravariant,
            (Contravariant, Contravariant) => Covariant,
        }
    }
}

/// A type-level region, as written in a type. The dense `RegionId`s used by
/// the analysis are assigned per-place; these are the symbolic positions that
/// get bound to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// `'static`.
    Static,
    /// A lifetime parameter of the enclosing item, by index.
    EarlyBound(usize),
    /// An elided or `'_` lifetime.
    Anonymous,
    /// A named lifetime that did not resolve to a parameter. Reaching one of
    /// these during region binding is reported as unimplemented.
    Named(crate::context::SymbolId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    Not,
    Mut,
}

impl Mutability {
    pub fn is_mut(&self) -> bool {
        matches!(self, Mutability::Mut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntTy {
    I8,
    I16,
    I32,
    I64,
    Isize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UintTy {
    U8,
    U16,
    U32,
    U64,
    Usize,
}

/// A function signature, shared by fn items and fn pointers. The signature's
/// own lifetime parameters are referenced from the parameter and return types
/// as `Region::EarlyBound` indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnSig {
    /// Number of lifetime parameters of the signature.
    pub num_regions: usize,
    pub inputs: Vec<TyId>,
    pub output: TyId,
}

/// The generic arguments of an ADT instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Substs {
    /// One region per lifetime parameter of the definition.
    pub regions: Vec<Region>,
    /// One type per type parameter of the definition.
    pub types: Vec<TyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Char,
    Int(IntTy),
    Uint(UintTy),
    Str,
    Never,
    Tuple(Vec<TyId>),
    Array(TyId),
    Slice(TyId),
    RawPtr(Mutability, TyId),
    Ref(Region, Mutability, TyId),
    FnDef(FnSig),
    FnPtr(FnSig),
    Adt(AdtId, Substs),
    Dynamic,
    Closure,
    /// An unsubstituted type parameter. Must not reach constraint
    /// sanitization.
    Param(usize),
    Infer,
    Placeholder,
    Error,
}

impl Type {
    /// Create an instance of the unit type
    pub const fn unit() -> Self {
        Self::Tuple(vec![])
    }
}

/// A struct or enum definition, together with the results of the variance
/// analysis and the outlives constraints of its where-clauses. Both are
/// computed by the front-end; the borrow analysis only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdtDef {
    pub def_name: crate::context::SymbolId,
    pub variants: Vec<VariantDef>,
    /// Variance of each lifetime parameter.
    pub lifetime_variances: Vec<Variance>,
    /// Variance of each type parameter.
    pub type_variances: Vec<Variance>,
    /// `('a, 'b)` pairs meaning the `a`-th lifetime parameter outlives the
    /// `b`-th.
    pub region_outlives: Vec<(usize, usize)>,
    /// `(T, 'r)` pairs meaning the `T`-th type parameter outlives the `r`-th
    /// lifetime parameter.
    pub type_outlives: Vec<(usize, usize)>,
}

impl AdtDef {
    pub fn num_lifetime_params(&self) -> usize {
        self.lifetime_variances.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDef {
    pub def_name: crate::context::SymbolId,
    pub fields: Vec<FieldDef>,
}

/// A field, typed in terms of the definition's own parameters
/// (`Region::EarlyBound` / `Type::Param`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub def_name: crate::context::SymbolId,
    pub ty: TyId,
}

// ====== The variance-analysis query surface ======

impl TyId {
    /// The number of region positions in the type.
    pub fn region_count(&self, ctx: &Context) -> usize {
        self.regions(ctx).len()
    }

    /// The type-level regions of the type, one per region position, in the
    /// same left-to-right order as a place's region vector.
    pub fn regions(&self, ctx: &Context) -> Vec<Region> {
        let mut out = Vec::new();
        self.push_regions(&mut out, ctx);
        out
    }

    fn push_regions(&self, out: &mut Vec<Region>, ctx: &Context) {
        match &ctx.types[*self] {
            Type::Ref(region, _, inner) => {
                out.push(*region);
                inner.push_regions(out, ctx);
            }
            Type::RawPtr(_, inner) | Type::Array(inner) | Type::Slice(inner) => {
                inner.push_regions(out, ctx)
            }
            Type::Tuple(tys) => {
                for ty in tys {
                    ty.push_regions(out, ctx);
                }
            }
            Type::Adt(_, substs) => {
                out.extend(substs.regions.iter().copied());
                for arg in &substs.types {
                    arg.push_regions(out, ctx);
                }
            }
            Type::FnDef(sig) | Type::FnPtr(sig) => {
                // The signature's own binder positions come first.
                out.extend(std::iter::repeat(Region::Anonymous).take(sig.num_regions));
                for input in &sig.inputs {
                    input.push_regions(out, ctx);
                }
                sig.output.push_regions(out, ctx);
            }
            Type::Bool
            | Type::Char
            | Type::Int(_)
            | Type::Uint(_)
            | Type::Str
            | Type::Never
            | Type::Dynamic
            | Type::Closure
            | Type::Param(_)
            | Type::Infer
            | Type::Placeholder
            | Type::Error => {}
        }
    }

    /// The variance of each region position of the type, aligned with
    /// `regions`.
    pub fn variances(&self, ctx: &Context) -> Vec<Variance> {
        let mut out = Vec::new();
        self.push_variances(Variance::Covariant, &mut out, ctx);
        out
    }

    fn push_variances(&self, current: Variance, out: &mut Vec<Variance>, ctx: &Context) {
        use Variance::*;
        match &ctx.types[*self] {
            Type::Ref(_, mutbl, inner) => {
                // A reference is covariant in its own lifetime; a unique
                // reference is invariant in its referent.
                out.push(current);
                let nested = if mutbl.is_mut() { Invariant } else { Covariant };
                inner.push_variances(current.xform(nested), out, ctx);
            }
            Type::RawPtr(mutbl, inner) => {
                let nested = if mutbl.is_mut() { Invariant } else { Covariant };
                inner.push_variances(current.xform(nested), out, ctx);
            }
            Type::Array(inner) | Type::Slice(inner) => {
                inner.push_variances(current, out, ctx);
            }
            Type::Tuple(tys) => {
                for ty in tys {
                    ty.push_variances(current, out, ctx);
                }
            }
            Type::Adt(adt, substs) => {
                let def = &ctx.adts[*adt];
                for &v in &def.lifetime_variances {
                    out.push(current.xform(v));
                }
                for (n, arg) in substs.types.iter().enumerate() {
                    arg.push_variances(current.xform(def.type_variances[n]), out, ctx);
                }
            }
            Type::FnDef(sig) | Type::FnPtr(sig) => {
                // Binder positions are kept invariant; inputs flip.
                out.extend(std::iter::repeat(Invariant).take(sig.num_regions));
                for input in &sig.inputs {
                    input.push_variances(current.xform(Contravariant), out, ctx);
                }
                sig.output.push_variances(current, out, ctx);
            }
            Type::Bool
            | Type::Char
            | Type::Int(_)
            | Type::Uint(_)
            | Type::Str
            | Type::Never
            | Type::Dynamic
            | Type::Closure
            | Type::Param(_)
            | Type::Infer
            | Type::Placeholder
            | Type::Error => {}
        }
    }

    /// The function signature of a callable type.
    pub fn fn_sig<'t>(&self, ctx: &'t Context) -> Option<&'t FnSig> {
        match &ctx.types[*self] {
            Type::FnDef(sig) | Type::FnPtr(sig) => Some(sig),
            _ => None,
        }
    }

    /// Remap an ADT instance's flattened regions to the region positions of
    /// one of its fields.
    ///
    /// `base` is the region vector of the instance (the parent place's
    /// regions). Field positions referencing a lifetime parameter map to the
    /// corresponding leading entry of `base`; positions inside a type
    /// parameter map into that argument's flattened range. Positions that
    /// cannot be mapped (late-bound or anonymous ones) come back as `None`
    /// and simply contribute no constraint.
    pub fn field_regions(
        &self,
        variant: usize,
        field: usize,
        base: &FreeRegions,
        ctx: &Context,
    ) -> Vec<Option<RegionId>> {
        let (adt, substs) = match &ctx.types[*self] {
            Type::Adt(adt, substs) => (adt, substs),
            _ => unreachable!("field projection on a non-ADT type"),
        };
        let def = &ctx.adts[*adt];

        // The flattened range of each type argument within `base`.
        let mut ranges = Vec::with_capacity(substs.types.len());
        let mut cursor = def.num_lifetime_params();
        for arg in &substs.types {
            let next = cursor + arg.region_count(ctx);
            ranges.push(cursor..next);
            cursor = next;
        }

        let field_ty = def.variants[variant].fields[field].ty;
        let mut out = Vec::new();
        field_ty.remap_regions(&ranges, base, &mut out, ctx);
        out
    }

    fn remap_regions(
        &self,
        ranges: &[std::ops::Range<usize>],
        base: &FreeRegions,
        out: &mut Vec<Option<RegionId>>,
        ctx: &Context,
    ) {
        let lookup = |region: &Region| -> Option<RegionId> {
            match region {
                Region::Static => Some(static_region()),
                Region::EarlyBound(n) => Some(base[*n]),
                Region::Anonymous | Region::Named(_) => None,
            }
        };

        match &ctx.types[*self] {
            Type::Ref(region, _, inner) => {
                out.push(lookup(region));
                inner.remap_regions(ranges, base, out, ctx);
            }
            Type::RawPtr(_, inner) | Type::Array(inner) | Type::Slice(inner) => {
                inner.remap_regions(ranges, base, out, ctx);
            }
            Type::Tuple(tys) => {
                for ty in tys {
                    ty.remap_regions(ranges, base, out, ctx);
                }
            }
            Type::Adt(_, inner_substs) => {
                for region in &inner_substs.regions {
                    out.push(lookup(region));
                }
                for arg in &inner_substs.types {
                    arg.remap_regions(ranges, base, out, ctx);
                }
            }
            Type::Param(n) => {
                // Splice in the whole flattened range of the argument.
                for k in ranges[*n].clone() {
                    out.push(Some(base[k]));
                }
            }
            Type::FnDef(_) | Type::FnPtr(_) => {
                // Early-bound indices inside a signature refer to the
                // signature's own binder, so none of these positions can be
                // mapped from the parent.
                let count = self.region_count(ctx);
                out.extend(std::iter::repeat(None).take(count));
            }
            Type::Bool
            | Type::Char
            | Type::Int(_)
            | Type::Uint(_)
            | Type::Str
            | Type::Never
            | Type::Dynamic
            | Type::Closure
            | Type::Infer
            | Type::Placeholder
            | Type::Error => {}
        }
    }
}

// ====== Display and formatting ======

impl<'c> FmtWith<Context<'c>> for TyId {
    fn fmt(&self, ctx: &Context, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &ctx.types[*self] {
            Type::Bool => f.write_str("bool"),
            Type::Char => f.write_str("char"),
            Type::Int(int) => write!(f, "{:?}", int),
            Type::Uint(uint) => write!(f, "{:?}", uint),
            Type::Str => f.write_str("str"),
            Type::Never => f.write_str("!"),
            Type::Tuple(tys) => {
                f.write_str("(")?;
                for (n, ty) in tys.iter().enumerate() {
                    if n > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", ty.fmt_with(ctx))?;
                }
                f.write_str(")")
            }
            Type::Array(ty) => write!(f, "[{}; _]", ty.fmt_with(ctx)),
            Type::Slice(ty) => write!(f, "[{}]", ty.fmt_with(ctx)),
            Type::RawPtr(mutbl, ty) => {
                let prefix = if mutbl.is_mut() { "*mut " } else { "*const " };
                write!(f, "{}{}", prefix, ty.fmt_with(ctx))
            }
            Type::Ref(_, mutbl, ty) => {
                let prefix = if mutbl.is_mut() { "&mut " } else { "&" };
                write!(f, "{}{}", prefix, ty.fmt_with(ctx))
            }
            Type::FnDef(sig) | Type::FnPtr(sig) => {
                f.write_str("fn(")?;
                for (n, ty) in sig.inputs.iter().enumerate() {
                    if n > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", ty.fmt_with(ctx))?;
                }
                write!(f, ") -> {}", sig.output.fmt_with(ctx))
            }
            Type::Adt(adt, _) => write!(f, "{}", ctx.adts[*adt].def_name.fmt_with(ctx)),
            Type::Dynamic => f.write_str("dyn _"),
            Type::Closure => f.write_str("{closure}"),
            Type::Param(n) => write!(f, "T{}", n),
            Type::Infer => f.write_str("_"),
            Type::Placeholder => f.write_str("{placeholder}"),
            Type::Error => f.write_str("{error}"),
        }
    }
}
