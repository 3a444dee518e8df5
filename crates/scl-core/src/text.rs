//! Line and column bookkeeping for document text.
//!
//! Every column handed out by this crate is measured in UTF-16 code units,
//! the default position encoding of the Language Server Protocol. Byte
//! offsets are only used internally while scanning.

/// A zero-based span on a single line, `[start, end)` in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub line: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(line: u32, start: u32, end: u32) -> Self {
        Self { line, start, end }
    }

    /// Returns true if `(line, character)` falls inside this span.
    ///
    /// The end column is exclusive, so a cursor sitting on the boundary
    /// between two adjacent spans belongs to the second one.
    pub const fn contains(&self, line: u32, character: u32) -> bool {
        self.line == line && self.start <= character && character < self.end
    }
}

/// Maps byte offsets of a text to `(line, column)` pairs.
///
/// Line starts are collected in a single pass over the text; lookups are a
/// binary search followed by a UTF-16 count of the line prefix.
#[derive(Debug)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, byte)| byte == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self { text, line_starts }
    }

    /// Number of lines, counting the (possibly empty) line after a trailing `\n`.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset on a char boundary into `(line, column)`.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        (line as u32, utf16_len(&self.text[line_start..offset]))
    }

    /// Converts the byte range `start..end` into a [`Span`].
    ///
    /// The range must not cross a line break.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.line_col(start);
        Span::new(line, column, column + utf16_len(&self.text[start..end]))
    }
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|ch| ch.len_utf16() as u32).sum()
}

/// Byte offset in `line` of the UTF-16 column `character`.
///
/// Columns past the end of the line clamp to `line.len()`; a column that
/// lands inside a surrogate pair rounds up to the next char boundary.
pub fn byte_offset(line: &str, character: u32) -> usize {
    let mut units = 0;
    for (offset, ch) in line.char_indices() {
        if units >= character {
            return offset;
        }
        units += ch.len_utf16() as u32;
    }
    line.len()
}
