//! Buffer-line to cell-line mapping.

use std::collections::BTreeMap;
use std::fmt;

/// A position inside the notebook: cell index and line within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLine {
    /// 1-based index among code cells (0 is the synthetic document anchor).
    pub cell: usize,
    /// Line within the projected cell span; the separator is line 0.
    pub line: usize,
}

impl fmt::Display for CellLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell_{}:{}", self.cell, self.line)
    }
}

/// Total mapping from buffer line numbers to cell positions.
///
/// Line 0 always maps to `cell_0:0` so tools that report whole-file
/// diagnostics at line 0 still resolve.
#[derive(Debug, Clone)]
pub struct PositionMap {
    entries: BTreeMap<usize, CellLine>,
}

impl PositionMap {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(0, CellLine { cell: 0, line: 0 });
        Self { entries }
    }

    pub fn insert(&mut self, buffer_line: usize, cell: usize, line: usize) {
        self.entries.insert(buffer_line, CellLine { cell, line });
    }

    pub fn resolve(&self, buffer_line: usize) -> Option<CellLine> {
        self.entries.get(&buffer_line).copied()
    }

    pub fn max_buffer_line(&self) -> usize {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PositionMap {
    fn default() -> Self {
        Self::new()
    }
}
