//! This module is home to the `Context` data structure carried through the
//! analysis.

use crate::interner_type;
use crate::session::Config;
use crate::source::SrcStore;
use crate::types::{AdtStore, Type, TypeInterner, TyId, IntTy, UintTy};
use crate::util::FmtWith;
use std::fmt;

interner_type! { SymbolInterner : SymbolId -> String }

macro_rules! common_types {
    ($($ty:ident),*) => {
        pub struct CommonTypes {
            $(pub $ty: TyId),*
        }
    };
}

common_types! {
    error, unit, bool, i32, u32, usize, str_, never
}

/// The big data structure that carries around all the data shared between
/// phases: interners, definitions, and the notionally immutable session
/// configuration.
pub struct Context<'ctx> {
    /// The 'immutable' state associated with the session
    pub conf: &'ctx Config,
    /// The source code under analysis
    pub srcs: SrcStore,
    /// Interned symbols
    pub symbols: SymbolInterner,
    /// Interned types
    pub types: TypeInterner,
    /// Struct and enum definitions, with their variance and outlives data
    pub adts: AdtStore,
    /// Common types, made more conveniently accessible
    pub common: CommonTypes,
}

impl<'ctx> Context<'ctx> {
    pub fn new(conf: &'ctx Config) -> Self {
        let mut types = TypeInterner::new();
        let common = CommonTypes {
            // Interned first: the default `TyId` is the error type, which is
            // what the reserved invalid place carries.
            error: types.intern(Type::Error),
            unit: types.intern(Type::unit()),
            bool: types.intern(Type::Bool),
            i32: types.intern(Type::Int(IntTy::I32)),
            u32: types.intern(Type::Uint(UintTy::U32)),
            usize: types.intern(Type::Uint(UintTy::Usize)),
            str_: types.intern(Type::Str),
            never: types.intern(Type::Never),
        };
        Self {
            conf,
            types,
            common,
            adts: AdtStore::new(),
            srcs: SrcStore::new(),
            symbols: SymbolInterner::new(),
        }
    }

    pub fn intern_symb(&mut self, symb: impl Into<String>) -> SymbolId {
        self.symbols.intern(symb.into())
    }

    pub fn intern_ty(&mut self, ty: Type) -> TyId {
        self.types.intern(ty)
    }
}

/// ====== Display and formatting ======

impl<'c> FmtWith<Context<'c>> for SymbolId {
    fn fmt(&self, ctx: &Context, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ctx.symbols[*self])
    }
}
