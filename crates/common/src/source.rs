//! Source location types for reporting positions in parsed text.
//!
//! Parsing works on byte offsets; diagnostics want lines and columns.
//! [`LineMap`] converts between the two after the fact, so the hot path
//! never tracks line numbers.

/// A position in source code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLoc {
    /// Byte offset in the source text.
    pub offset: u32,
    /// Line number (1-based).
    pub line: u32,
    /// Column number (1-based, counted in characters).
    pub col: u32,
}

impl SourceLoc {
    /// Create a new source location.
    pub fn new(offset: u32, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Line start table for a piece of text.
#[derive(Debug, Clone)]
pub struct LineMap<'a> {
    text: &'a str,
    /// Byte offset of the first character of each line.
    starts: Vec<usize>,
}

impl<'a> LineMap<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, starts }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Location of a byte offset. Offsets past the end clamp to the end,
    /// offsets inside a multi-byte character round down to its start.
    pub fn loc(&self, offset: usize) -> SourceLoc {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.starts.partition_point(|&start| start <= offset) - 1;
        let col = self.text[self.starts[line]..offset].chars().count();
        SourceLoc::new(offset as u32, line as u32 + 1, col as u32 + 1)
    }

    /// Text of a line (1-based), without its terminator.
    pub fn line_text(&self, line: u32) -> &'a str {
        let index = (line as usize).saturating_sub(1);
        let Some(&start) = self.starts.get(index) else {
            return "";
        };
        let end = self.starts.get(index + 1).map_or(self.text.len(), |&next| next - 1);
        self.text[start..end].trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_loc_new() {
        let loc = SourceLoc::new(10, 2, 5);
        assert_eq!(loc.offset, 10);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.col, 5);
    }

    #[test]
    fn test_source_loc_default() {
        let loc = SourceLoc::default();
        assert_eq!((loc.offset, loc.line, loc.col), (0, 0, 0));
    }

    #[test]
    fn test_single_line() {
        let map = LineMap::new("hello");
        assert_eq!(map.line_count(), 1);
        assert_eq!(map.loc(0), SourceLoc::new(0, 1, 1));
        assert_eq!(map.loc(4), SourceLoc::new(4, 1, 5));
        assert_eq!(map.loc(5), SourceLoc::new(5, 1, 6));
        assert_eq!(map.line_text(1), "hello");
    }

    #[test]
    fn test_multiple_lines() {
        let map = LineMap::new("ab\ncd\n\nef");
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.loc(2), SourceLoc::new(2, 1, 3));
        assert_eq!(map.loc(3), SourceLoc::new(3, 2, 1));
        assert_eq!(map.loc(6), SourceLoc::new(6, 3, 1));
        assert_eq!(map.loc(8), SourceLoc::new(8, 4, 2));
        assert_eq!(map.line_text(2), "cd");
        assert_eq!(map.line_text(3), "");
        assert_eq!(map.line_text(4), "ef");
    }

    #[test]
    fn test_out_of_range() {
        let map = LineMap::new("ab\ncd");
        assert_eq!(map.loc(100), SourceLoc::new(5, 2, 3));
        assert_eq!(map.line_text(0), "ab");
        assert_eq!(map.line_text(9), "");
    }

    #[test]
    fn test_columns_count_characters() {
        let map = LineMap::new("é=x");
        // 'é' is two bytes but one column.
        assert_eq!(map.loc(2), SourceLoc::new(2, 1, 2));
        assert_eq!(map.loc(1), SourceLoc::new(0, 1, 1));
    }

    #[test]
    fn test_crlf_line_text() {
        let map = LineMap::new("one\r\ntwo");
        assert_eq!(map.line_text(1), "one");
        assert_eq!(map.loc(5), SourceLoc::new(5, 2, 1));
    }
}
