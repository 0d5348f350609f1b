//! The control-flow-graph representation of a single function, as consumed
//! by the borrow analysis. This is analogous to rustc's MIR: a fully-typed
//! program with all names resolved, flattened into basic blocks of simple
//! statements over the place database. Working backwards from the goal of
//! implementing a Polonius-style borrow checker, it's sensible to operate
//! over essentially the same domain rather than add the incidental
//! complexity of translating from another one.
//!
//! The front-end that lowers into this form lives elsewhere; everything here
//! is read-only input to the analysis.

use smallvec::SmallVec;
use std::fmt;

use crate::{
    context::{Context, SymbolId},
    index_type, store_type,
    place::{PlaceDb, PlaceId},
    regions::RegionId,
    source::Span,
    types::TyId,
    util::FmtWith,
};

store_type! { BlockStore : BlockId -> BasicBlock }
index_type! { LoanId }

/// A function lowered to CFG form, bundled with everything the analysis
/// needs to know about it.
#[derive(Debug)]
pub struct Function {
    pub def_name: SymbolId,
    pub span: Span,
    /// The place tree.
    pub place_db: PlaceDb,
    /// The basic blocks, in index order.
    pub basic_blocks: BlockStore,
    /// The function's lifetime parameters, plus `'static`.
    pub universal_regions: Vec<RegionId>,
    /// Outlives pairs known to hold among the universal regions.
    pub universal_region_bounds: Vec<(RegionId, RegionId)>,
    /// Closures are not supported by the analysis yet; they are reported
    /// and skipped.
    pub is_closure: bool,
}

impl Function {
    /// The seed for the analysis' fresh-region counter.
    pub fn peek_next_free_region(&self) -> RegionId {
        self.place_db.peek_next_free_region()
    }
}

#[derive(Debug)]
pub struct BasicBlock {
    /// The branch-free sequence of statements within the block, the last of
    /// which may be a terminator (switch, goto, return, or a call
    /// assignment).
    pub statements: Vec<Statement>,
    /// The blocks this one can jump to.
    pub successors: SmallVec<[BlockId; 2]>,
}

impl BasicBlock {
    pub fn new(statements: Vec<Statement>, successors: Vec<BlockId>) -> Self {
        Self {
            statements,
            successors: SmallVec::from_vec(successors),
        }
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }
}

#[derive(Debug)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug)]
pub enum StatementKind {
    /// Assign an rvalue to a place.
    Assign(PlaceId, Rvalue),
    /// An n-way conditional jump on the discriminant place.
    Switch(PlaceId),
    /// An unconditional jump, carrying the place of the evaluated expression
    /// that fed it (possibly the invalid place).
    Goto(PlaceId),
    Return,
    StorageLive(PlaceId),
    StorageDead(PlaceId),
    /// A user-written type ascription of a place.
    AscribeUserType(PlaceId, TyId),
}

#[derive(Debug)]
pub enum Rvalue {
    /// An aggregate initializer listing its operand places.
    Initializer(Vec<PlaceId>),
    Unary(PlaceId),
    Binary(PlaceId, PlaceId),
    /// `&place` or `&mut place`, with the origin of the new reference and
    /// the loan it issues.
    Borrow(RegionId, LoanId, PlaceId),
    /// A copy or move of another place.
    Use(PlaceId),
    /// A call terminator: the callable place and its arguments.
    Call(PlaceId, Vec<PlaceId>),
}

// ====== Display and formatting ======

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", u32::from(*self))
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", u32::from(*self))
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Assign(lhs, rhs) => write!(f, "{} = {};", lhs, rhs),
            StatementKind::Switch(place) => write!(f, "switch({});", place),
            StatementKind::Goto(place) => write!(f, "goto({});", place),
            StatementKind::Return => f.write_str("return;"),
            StatementKind::StorageLive(place) => write!(f, "StorageLive({});", place),
            StatementKind::StorageDead(place) => write!(f, "StorageDead({});", place),
            StatementKind::AscribeUserType(place, _) => {
                write!(f, "AscribeUserType({});", place)
            }
        }
    }
}

impl fmt::Display for Rvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = |f: &mut fmt::Formatter<'_>, places: &[PlaceId]| {
            places.iter().enumerate().try_for_each(|(n, place)| {
                if n > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", place)
            })
        };
        match self {
            Rvalue::Initializer(values) => {
                f.write_str("{")?;
                places(f, values)?;
                f.write_str("}")
            }
            Rvalue::Unary(op) => write!(f, "op {}", op),
            Rvalue::Binary(lop, rop) => write!(f, "{} op {}", lop, rop),
            Rvalue::Borrow(origin, loan, place) => {
                write!(f, "&'{:?} {} ({})", origin, place, loan)
            }
            Rvalue::Use(place) => write!(f, "{}", place),
            Rvalue::Call(callable, args) => {
                write!(f, "call {}(", callable)?;
                places(f, args)?;
                f.write_str(")")
            }
        }
    }
}

/// Context data is needed to resolve the function's name and types.
impl<'c> FmtWith<Context<'c>> for Function {
    fn fmt(&self, ctx: &Context, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fn {} {{", self.def_name.fmt_with(ctx))?;
        for (id, place) in self.place_db.idx_enumerate() {
            writeln!(f, "\t{}: {}", id, place.ty.fmt_with(ctx))?;
        }
        for (id, block) in self.basic_blocks.idx_enumerate() {
            writeln!(f, "\t{} {{", id)?;
            for stmt in &block.statements {
                writeln!(f, "\t\t{}", stmt.kind)?;
            }
            write!(f, "\t}} -> [")?;
            for (n, succ) in block.successors().iter().enumerate() {
                if n > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", succ)?;
            }
            f.write_str("]\n")?;
        }
        f.write_str("}\n")
    }
}
