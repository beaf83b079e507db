//! Byte cursor over the source text.
//!
//! Shell syntax is context-sensitive (whether `=`, `,` or `{` mean anything
//! depends on where they appear), so the parser reads bytes directly instead
//! of consuming a token stream. The cursor is [`Copy`] so a snapshot is just
//! a copy, which the parser uses to backtrack out of a failed assignment.

/// Read position in the source. Reads past the end yield `0x00`.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Cursor { src, pos: 0 }
    }

    #[inline]
    pub fn current(&self) -> u8 {
        self.byte_at(self.pos)
    }

    #[inline]
    pub fn peek(&self) -> u8 {
        self.byte_at(self.pos + 1)
    }

    #[inline]
    fn byte_at(&self, pos: u32) -> u8 {
        self.src.as_bytes().get(pos as usize).copied().unwrap_or(0)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos as usize >= self.src.len()
    }

    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    #[inline]
    pub fn advance(&mut self) {
        self.pos += 1;
    }

    /// The character at the current position, if any.
    pub fn current_char(&self) -> Option<char> {
        self.src.get(self.pos as usize..)?.chars().next()
    }

    /// Advance past one full character.
    pub fn advance_char(&mut self) {
        let width = self.current_char().map_or(1, char::len_utf8);
        self.pos += u32::try_from(width).unwrap_or(1);
    }

    pub fn slice(&self, start: u32, end: u32) -> &'a str {
        self.src.get(start as usize..end as usize).unwrap_or("")
    }

    pub fn slice_from(&self, start: u32) -> &'a str {
        self.slice(start, self.pos)
    }

    /// Advance while `pred` holds for the current byte. `pred(0)` must be
    /// false.
    #[inline]
    pub fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while !self.is_eof() && pred(self.current()) {
            self.pos += 1;
        }
    }

    /// Skip spaces and tabs. Newlines are significant and left alone.
    pub fn eat_inline_whitespace(&mut self) {
        self.eat_while(|b| b == b' ' || b == b'\t' || b == b'\r');
    }

    /// Move to the next `\n` (not past it), or to the end.
    pub fn eat_until_newline_or_eof(&mut self) {
        let rest = self.remaining();
        match memchr::memchr(b'\n', rest) {
            Some(offset) => self.pos += u32::try_from(offset).unwrap_or(0),
            None => self.pos = self.end(),
        }
    }

    /// Find `byte` at or after the current position, returning its absolute
    /// offset without moving.
    pub fn find(&self, byte: u8) -> Option<u32> {
        memchr::memchr(byte, self.remaining())
            .and_then(|offset| u32::try_from(offset).ok())
            .map(|offset| self.pos + offset)
    }

    /// Find the first of two bytes at or after the current position.
    pub fn find2(&self, a: u8, b: u8) -> Option<u32> {
        memchr::memchr2(a, b, self.remaining())
            .and_then(|offset| u32::try_from(offset).ok())
            .map(|offset| self.pos + offset)
    }

    pub fn set_pos(&mut self, pos: u32) {
        self.pos = pos.min(self.end());
    }

    fn remaining(&self) -> &'a [u8] {
        self.src.as_bytes().get(self.pos as usize..).unwrap_or(&[])
    }

    fn end(&self) -> u32 {
        u32::try_from(self.src.len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_past_end_are_zero() {
        let mut cursor = Cursor::new("a");
        assert_eq!(cursor.current(), b'a');
        assert_eq!(cursor.peek(), 0);
        cursor.advance();
        assert!(cursor.is_eof());
        assert_eq!(cursor.current(), 0);
    }

    #[test]
    fn test_eat_until_newline() {
        let mut cursor = Cursor::new("# comment\nput x");
        cursor.eat_until_newline_or_eof();
        assert_eq!(cursor.pos(), 9);
        assert_eq!(cursor.current(), b'\n');

        let mut cursor = Cursor::new("# trailing");
        cursor.eat_until_newline_or_eof();
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_find2() {
        let cursor = Cursor::new(r#"ab\"c""#);
        assert_eq!(cursor.find2(b'"', b'\\'), Some(2));
    }

    #[test]
    fn test_advance_char_multibyte() {
        let mut cursor = Cursor::new("éx");
        cursor.advance_char();
        assert_eq!(cursor.current(), b'x');
        assert_eq!(cursor.slice_from(0), "é");
    }
}
