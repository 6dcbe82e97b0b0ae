//! Byte-offset source spans.
//!
//! The renamed AST carries a `Span` on every node so diagnostics can point
//! back into the original source. Trees built programmatically (tests and
//! embedders have no source text) carry [`Span::dummy`] instead;
//! diagnostics recognise the placeholder and fall back to whole-source
//! reporting rather than pointing at byte zero. Line/column pairs are not
//! stored per node -- [`LineIndex`] recovers them on demand from the
//! recorded newline positions.

use serde::Serialize;

/// A half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "malformed span: {start}..{end}");
        Self { start, end }
    }

    /// The placeholder span of programmatically built trees.
    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Whether this is the placeholder span. Diagnostics use this to decide
    /// between a labeled position and whole-source reporting.
    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Newline positions of one source text.
///
/// Storing the offset of every `\n` (rather than of every line start) keeps
/// the index exactly as large as the number of newlines and makes the
/// line of an offset a single `partition_point` over them.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of every `\n` in the source, ascending.
    newlines: Vec<u32>,
}

impl LineIndex {
    /// Record every newline in `source`.
    pub fn new(source: &str) -> Self {
        let newlines = source
            .bytes()
            .enumerate()
            .filter(|(_, byte)| *byte == b'\n')
            .map(|(offset, _)| offset as u32)
            .collect();
        Self { newlines }
    }

    /// Convert a byte offset to a 1-based (line, column) pair.
    ///
    /// The line of an offset is the number of newlines strictly before it,
    /// so an offset pointing at a `\n` still belongs to the line that the
    /// newline ends.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self.newlines.partition_point(|&nl| nl < offset);
        let line_start = match line {
            0 => 0,
            n => self.newlines[n - 1] + 1,
        };
        ((line as u32) + 1, offset - line_start + 1)
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.newlines.len() + 1
    }
}
