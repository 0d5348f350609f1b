//! The relational output of the fact collector, and the point encoding its
//! rows are addressed by.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::bir::{BlockId, LoanId};
use crate::place::PlaceId;
use crate::regions::RegionId;

/// A region as the Datalog engine sees it.
pub type Origin = RegionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PointPosition {
    /// Before the statement's observable effect.
    Start,
    /// Where the statement's effects take place.
    Mid,
}

/// A half-statement location in the CFG, packed into a single dense integer:
/// `(block << 16) | (statement << 1) | position`.
///
/// The statement field holds 15 bits; if blocks ever exceed 32k statements
/// the layout has to widen, with the low bit staying reserved for the
/// position.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point(u32);

const STMT_BITS: u32 = 15;

impl Point {
    pub fn new(block: BlockId, stmt: u32, pos: PointPosition) -> Self {
        let block = u32::from(block);
        assert!(block < 1 << 16, "block id out of range");
        assert!(stmt < 1 << STMT_BITS, "statement index out of range");
        Self(block << 16 | stmt << 1 | pos as u32)
    }

    pub fn block(self) -> BlockId {
        BlockId::from(self.0 >> 16)
    }

    pub fn stmt(self) -> u32 {
        (self.0 >> 1) & ((1 << STMT_BITS) - 1)
    }

    pub fn pos(self) -> PointPosition {
        if self.0 & 1 == 0 {
            PointPosition::Start
        } else {
            PointPosition::Mid
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = match self.pos() {
            PointPosition::Start => "Start",
            PointPosition::Mid => "Mid",
        };
        write!(f, "{}({}[{}])", pos, self.block(), self.stmt())
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A value that can appear as a column of a fact row.
pub trait FactCell {
    fn write_cell(&self, w: &mut dyn Write) -> io::Result<()>;
}

impl FactCell for Point {
    fn write_cell(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{}", self)
    }
}

impl FactCell for PlaceId {
    fn write_cell(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{}", self)
    }
}

impl FactCell for RegionId {
    fn write_cell(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "'{}", u32::from(*self))
    }
}

impl FactCell for LoanId {
    fn write_cell(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{}", self)
    }
}

/// A full row of a relation.
pub trait FactRow {
    fn write_row(&self, w: &mut dyn Write) -> io::Result<()>;
}

impl<A: FactCell> FactRow for A {
    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        self.write_cell(w)
    }
}

impl<A: FactCell, B: FactCell> FactRow for (A, B) {
    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        self.0.write_cell(w)?;
        w.write_all(b"\t")?;
        self.1.write_cell(w)
    }
}

impl<A: FactCell, B: FactCell, C: FactCell> FactRow for (A, B, C) {
    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        self.0.write_cell(w)?;
        w.write_all(b"\t")?;
        self.1.write_cell(w)?;
        w.write_all(b"\t")?;
        self.2.write_cell(w)
    }
}

/// Serialize one relation, one tab-separated row per line, in emission
/// order.
pub fn dump_relation<R: FactRow>(rows: &[R], w: &mut dyn Write) -> io::Result<()> {
    for row in rows {
        row.write_row(w)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

macro_rules! fact_relations {
    ($($name:ident : $Row:ty),* $(,)?) => {
        /// The input relations of the Datalog engine. All rows are produced
        /// in a single pass and handed off by move; the collector producing
        /// them is single-use.
        #[derive(Debug, Default)]
        pub struct Facts {
            $(pub $name: Vec<$Row>,)*
        }

        impl Facts {
            /// Write every relation into `dir`, one `<relation>.facts` file
            /// each.
            pub fn dump_all(&self, dir: &Path) -> io::Result<()> {
                fs::create_dir_all(dir)?;
                $(
                    let path = dir.join(concat!(stringify!($name), ".facts"));
                    let mut file = io::BufWriter::new(fs::File::create(path)?);
                    dump_relation(&self.$name, &mut file)?;
                    file.flush()?;
                )*
                Ok(())
            }
        }
    };
}

fact_relations! {
    cfg_edge: (Point, Point),
    path_is_var: (PlaceId, PlaceId),
    child_path: (PlaceId, PlaceId),
    path_accessed_at_base: (PlaceId, Point),
    path_moved_at_base: (PlaceId, Point),
    path_assigned_at_base: (PlaceId, Point),
    var_used_at: (PlaceId, Point),
    var_defined_at: (PlaceId, Point),
    var_dropped_at: (PlaceId, Point),
    loan_issued_at: (Origin, LoanId, Point),
    loan_killed_at: (LoanId, Point),
    loan_invalidated_at: (Point, LoanId),
    use_of_var_derefs_origin: (PlaceId, Origin),
    drop_of_var_derefs_origin: (PlaceId, Origin),
    subset_base: (Origin, Origin, Point),
    universal_region: Origin,
    known_placeholder_subset: (Origin, Origin),
}
