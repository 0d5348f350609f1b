//! Data structures for holding source code and addressing regions of it.
//!
//! The front-end that produces our input IR is elsewhere; this module only
//! keeps enough source machinery to report diagnostics at real locations.

use crate::store_type;

store_type! { SrcStore : SrcId -> SrcObject }

/// A region of a source object, as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub src_id: SrcId,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(src_id: SrcId, start: usize, end: usize) -> Self {
        Self { src_id, start, end }
    }
}

/// A single unit of source code together with its provenance.
#[derive(Debug)]
pub struct SrcObject {
    pub code: String,
    pub origin: String,
    /// Byte offsets of newline characters, filled in on insertion.
    newlines: Vec<usize>,
}

impl SrcObject {
    /// The 1-indexed line and column of a byte offset.
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let line = match self.newlines.binary_search(&pos) {
            Ok(n) | Err(n) => n,
        };
        let line_start = if line == 0 {
            0
        } else {
            self.newlines[line - 1] + 1
        };
        (line + 1, pos - line_start + 1)
    }
}

impl SrcStore {
    pub fn insert_input(&mut self, input: &str) -> SrcId {
        let newlines = input
            .char_indices()
            .filter_map(|(n, c)| if c == '\n' { Some(n) } else { None })
            .collect();
        let src = SrcObject {
            code: input.to_owned(),
            origin: "<input>".to_owned(),
            newlines,
        };
        self.insert(src)
    }
}

impl std::fmt::Display for SrcObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.origin)
    }
}
