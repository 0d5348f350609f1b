//! Region (origin) identifiers and the ordered region vectors hung off every
//! place.
//!
//! Regions here are the dense analysis-level identifiers handed to the
//! Datalog engine, not the type-level `types::Region` representation. Region
//! 0 is always `'static`.

use std::fmt;
use std::iter::FromIterator;

use smallvec::SmallVec;

use crate::index_type;
use crate::store::Counter;

index_type! { RegionId }

/// The region of `'static`.
pub fn static_region() -> RegionId {
    RegionId::from(0)
}

/// An ordered vector of regions. There is one entry per region position of a
/// type, in a fixed left-to-right order; most types have at most two.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FreeRegions {
    regions: SmallVec<[RegionId; 2]>,
}

impl FreeRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_regions(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn push(&mut self, region: RegionId) {
        self.regions.push(region);
    }

    pub fn iter(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.iter().copied()
    }

    /// A new vector with `region` in front and the rest shifted right.
    pub fn prepend(&self, region: RegionId) -> FreeRegions {
        std::iter::once(region).chain(self.iter()).collect()
    }
}

impl std::ops::Index<usize> for FreeRegions {
    type Output = RegionId;

    fn index(&self, index: usize) -> &Self::Output {
        &self.regions[index]
    }
}

impl FromIterator<RegionId> for FreeRegions {
    fn from_iter<T: IntoIterator<Item = RegionId>>(iter: T) -> Self {
        Self {
            regions: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<RegionId>> for FreeRegions {
    fn from(regions: Vec<RegionId>) -> Self {
        regions.into_iter().collect()
    }
}

impl fmt::Display for FreeRegions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut regions = self.iter();
        if let Some(head) = regions.next() {
            write!(f, "'{:?}", head)?;
            for region in regions {
                write!(f, ", '{:?}", region)?;
            }
        }
        Ok(())
    }
}

/// The mint for fresh regions at call sites and other anonymous positions.
/// It is seeded from the place database's next free region, so the database
/// itself stays immutable during collection.
#[derive(Debug)]
pub struct RegionMint {
    next: Counter<RegionId>,
}

impl RegionMint {
    pub fn new(seed: RegionId) -> Self {
        Self {
            next: Counter::starting_at(seed),
        }
    }

    pub fn fresh(&mut self) -> RegionId {
        self.next.next().unwrap()
    }

    /// Mint `n` fresh regions at once, e.g. one per lifetime parameter of a
    /// callee.
    pub fn fresh_regions(&mut self, n: usize) -> FreeRegions {
        (0..n).map(|_| self.fresh()).collect()
    }
}
