//! Positional, backtrackable character cursor over a command line.
//!
//! The stream never copies text. A [`Mark`] is the byte offset of a replay point; restoring
//! a mark simply moves the cursor back (or forward to a point previously reached).

/// A replay point captured by [`SourceCharStream::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mark(usize);

impl Mark {
    /// Byte offset this mark points at.
    pub fn position(self) -> usize {
        self.0
    }
}

/// Character cursor used by the literal grammar and the command-line token reader.
#[derive(Debug, Clone)]
pub struct SourceCharStream<'a> {
    text: &'a str,
    position: usize,
    // Highest offset ever reached; restore never jumps past it.
    high_water: usize,
}

impl<'a> SourceCharStream<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::at(text, 0)
    }

    /// Creates a stream whose cursor starts at `offset` (clamped to a char boundary).
    pub fn at(text: &'a str, offset: usize) -> Self {
        let mut position = offset.min(text.len());
        while !text.is_char_boundary(position) {
            position -= 1;
        }
        Self {
            text,
            position,
            high_water: position,
        }
    }

    /// The whole source text, including already consumed characters.
    pub fn source(&self) -> &'a str {
        self.text
    }

    /// Byte offset of the next character to be returned by [`next`](Self::next).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn peek(&self) -> Option<char> {
        self.text[self.position..].chars().next()
    }

    /// Looks one character past [`peek`](Self::peek).
    pub fn peek_second(&self) -> Option<char> {
        let mut chars = self.text[self.position..].chars();
        chars.next()?;
        chars.next()
    }

    pub fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        if self.position > self.high_water {
            self.high_water = self.position;
        }
        Some(ch)
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.text.len()
    }

    pub fn mark(&self) -> Mark {
        Mark(self.position)
    }

    pub fn restore(&mut self, mark: Mark) {
        debug_assert!(mark.0 <= self.high_water, "mark past anything read");
        self.position = mark.0.min(self.high_water);
    }

    /// Consumes whitespace; returns true when anything was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.next();
        }
        self.position != start
    }

    /// Consumes `expected` if it is the next character.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Text between `start` and the cursor.
    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.text[start.min(self.position)..self.position]
    }

    /// Unconsumed text.
    pub fn remaining(&self) -> &'a str {
        &self.text[self.position..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_next() {
        let mut stream = SourceCharStream::new("ab");
        assert_eq!(stream.peek(), Some('a'));
        assert_eq!(stream.next(), Some('a'));
        assert_eq!(stream.next(), Some('b'));
        assert_eq!(stream.next(), None);
        assert!(stream.is_at_end());
    }

    #[test]
    fn test_restore_replays_exactly() {
        let mut stream = SourceCharStream::new("héllo");
        stream.next();
        let mark = stream.mark();
        assert_eq!(stream.next(), Some('é'));
        assert_eq!(stream.next(), Some('l'));
        stream.restore(mark);
        assert_eq!(stream.position(), 1);
        assert_eq!(stream.next(), Some('é'));
    }

    #[test]
    fn test_at_clamps_to_char_boundary() {
        let stream = SourceCharStream::at("é", 1);
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_skip_whitespace() {
        let mut stream = SourceCharStream::new("  \tx");
        assert!(stream.skip_whitespace());
        assert_eq!(stream.peek(), Some('x'));
        assert!(!stream.skip_whitespace());
    }
}
