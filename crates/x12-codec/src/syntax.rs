//! Byte-level reading primitives
//!
//! X12 has no release (escape) character, so segment frames can be sliced
//! directly out of the input without copying.

use x12_tree::Separators;

/// A borrowed segment frame: the bytes between two segment terminators
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Frame content, terminator excluded
    pub bytes: &'a [u8],
    /// Byte offset of the frame start in the stream
    pub offset: usize,
    /// Whether the frame ended with a segment terminator
    pub terminated: bool,
}

/// A buffer for reading X12 data
pub struct SyntaxBuffer<'a> {
    data: &'a [u8],
    pos: usize,
    separators: Separators,
}

impl<'a> SyntaxBuffer<'a> {
    /// Create a buffer over raw input with known separators.
    pub fn new(data: &'a [u8], separators: Separators) -> Self {
        Self {
            data,
            pos: 0,
            separators,
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the read position (used after the fixed-width ISA prefix).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Check if we've reached the end.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek at the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Skip whitespace and newlines between segments.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\n' || b == b'\r' || b == b'\t' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Read up to the next segment terminator.
    ///
    /// Returns `None` at end of input. An unterminated trailing frame is
    /// returned with `terminated` false.
    pub fn read_frame(&mut self) -> Option<Frame<'a>> {
        self.skip_whitespace();
        if self.is_empty() {
            return None;
        }

        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == self.separators.segment {
                let frame = Frame {
                    bytes: &self.data[start..self.pos],
                    offset: start,
                    terminated: true,
                };
                self.pos += 1;
                return Some(frame);
            }
            self.pos += 1;
        }

        Some(Frame {
            bytes: &self.data[start..],
            offset: start,
            terminated: false,
        })
    }
}

/// Split a byte slice on a delimiter, keeping empty entries.
pub fn split_all(bytes: &[u8], delimiter: u8) -> Vec<&[u8]> {
    bytes.split(move |b| *b == delimiter).collect()
}
