//! Line and column lookup for spans.

/// Pre-computed line offset table.
///
/// Stores the byte offset of every line start so lookups are a binary
/// search instead of a scan from the top of the source.
///
/// ```
/// use vesh_diagnostic::span_utils::LineOffsetTable;
///
/// let source = "put a\nput b";
/// let table = LineOffsetTable::build(source);
/// assert_eq!(table.offset_to_line_col(source, 6), (2, 1));
/// ```
#[derive(Clone, Debug, Default)]
pub struct LineOffsetTable {
    /// `offsets[i]` is the byte offset where line `i + 1` starts.
    offsets: Vec<u32>,
}

impl LineOffsetTable {
    pub fn build(source: &str) -> Self {
        let mut offsets = vec![0u32];
        offsets.extend(
            newline_positions(source)
                .map(|i| u32::try_from(i + 1).unwrap_or(u32::MAX)),
        );
        LineOffsetTable { offsets }
    }

    /// 1-based line containing `offset`.
    #[inline]
    pub fn line_from_offset(&self, offset: u32) -> u32 {
        let line_idx = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        u32::try_from(line_idx).unwrap_or(u32::MAX - 1) + 1
    }

    /// 1-based (line, column). Columns count characters, not bytes.
    pub fn offset_to_line_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let line = self.line_from_offset(offset);
        let line_start = self.line_start_offset(line).unwrap_or(0) as usize;
        let offset = (offset as usize).min(source.len());
        let col_text = source.get(line_start..offset).unwrap_or("");
        let col = u32::try_from(col_text.chars().count()).unwrap_or(u32::MAX - 1) + 1;
        (line, col)
    }

    /// Byte offset where the 1-based `line` starts.
    pub fn line_start_offset(&self, line: u32) -> Option<u32> {
        if line == 0 {
            return None;
        }
        self.offsets.get((line - 1) as usize).copied()
    }

    /// Text of the 1-based `line`, without its newline.
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> &'a str {
        let Some(start) = self.line_start_offset(line) else {
            return "";
        };
        let end = self
            .line_start_offset(line + 1)
            .map_or(source.len(), |next| (next as usize).saturating_sub(1));
        source.get(start as usize..end).unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }
}

fn newline_positions(source: &str) -> impl Iterator<Item = usize> + '_ {
    source
        .bytes()
        .enumerate()
        .filter_map(|(i, b)| (b == b'\n').then_some(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_from_offset_multiple_lines() {
        let table = LineOffsetTable::build("line1\nline2\nline3");
        assert_eq!(table.line_from_offset(0), 1);
        assert_eq!(table.line_from_offset(5), 1);
        assert_eq!(table.line_from_offset(6), 2);
        assert_eq!(table.line_from_offset(12), 3);
    }

    #[test]
    fn test_offset_to_line_col_counts_chars() {
        let source = "put é\nput $x";
        let table = LineOffsetTable::build(source);
        assert_eq!(table.offset_to_line_col(source, 4), (1, 5));
        // "é" is two bytes; offset 6 is the newline right after it.
        assert_eq!(table.offset_to_line_col(source, 6), (1, 6));
        assert_eq!(table.offset_to_line_col(source, 11), (2, 5));
    }

    #[test]
    fn test_line_text() {
        let source = "a\nbcd\n";
        let table = LineOffsetTable::build(source);
        assert_eq!(table.line_count(), 3);
        assert_eq!(table.line_text(source, 1), "a");
        assert_eq!(table.line_text(source, 2), "bcd");
        assert_eq!(table.line_text(source, 3), "");
        assert_eq!(table.line_text(source, 9), "");
    }
}
