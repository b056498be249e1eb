//! Offset to line/column conversion.
//!
//! The AST and diagnostics use byte offsets; editors and human-readable
//! output want line/column positions. A `LineIndex` is built once per file
//! and answers conversions in `O(log lines)`.

use crate::span::Span;
use memchr::memchr_iter;

/// A position in a source file (0-indexed line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column in bytes from the line start
    pub character: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A range in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Byte offsets of every line start in a source file.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    /// Offset of the first byte of each line. Always begins with 0.
    line_starts: Vec<u32>,
    /// Total length of the file in bytes.
    len: u32,
}

impl LineIndex {
    /// Build an index from source text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = Vec::with_capacity(64);
        line_starts.push(0);
        for nl in memchr_iter(b'\n', text.as_bytes()) {
            line_starts.push(u32::try_from(nl + 1).unwrap_or(u32::MAX));
        }
        Self {
            line_starts,
            len: u32::try_from(text.len()).unwrap_or(u32::MAX),
        }
    }

    /// Number of lines in the file (a trailing newline counts as starting a line).
    #[must_use]
    pub fn line_count(&self) -> u32 {
        u32::try_from(self.line_starts.len()).unwrap_or(u32::MAX)
    }

    /// Convert a byte offset to a position. Offsets past the end clamp to
    /// the last line.
    #[must_use]
    pub fn position(&self, offset: u32) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            character: offset - self.line_starts[line],
        }
    }

    /// Convert a span to a range.
    #[must_use]
    pub fn range(&self, span: Span) -> Range {
        Range {
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_positions() {
        let index = LineIndex::new("x = 1\nif cond:\n    x = 2\n");
        assert_eq!(index.position(0), Position::new(0, 0));
        assert_eq!(index.position(4), Position::new(0, 4));
        assert_eq!(index.position(6), Position::new(1, 0));
        assert_eq!(index.position(19), Position::new(2, 4));
    }

    #[test]
    fn line_index_clamps_past_end() {
        let index = LineIndex::new("pass");
        assert_eq!(index.position(400), Position::new(0, 4));
    }

    #[test]
    fn empty_file() {
        let index = LineIndex::new("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.position(0), Position::new(0, 0));
    }
}
