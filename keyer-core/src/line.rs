//! Serial text line assembly
//!
//! Bytes arrive one at a time from a UART; CR or LF ends a line. Lines are
//! UTF-8 so the accented table entries can be sent. A line that overflows the
//! buffer is dropped as a whole at its terminator rather than truncated.

use heapless::{String, Vec};

use crate::translator::{SetTextError, MAX_TEXT_LEN};

/// One complete text line
pub type TextLine = String<MAX_TEXT_LEN>;

/// Byte-wise line buffer
pub struct LineAssembler<const N: usize = MAX_TEXT_LEN> {
    buf: Vec<u8, N>,
    overflow: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflow: false,
        }
    }

    /// Feed one received byte.
    ///
    /// Returns `Some` only at a line terminator: the finished line, or why
    /// it was dropped. Empty lines produce nothing.
    pub fn push(&mut self, byte: u8) -> Option<Result<String<N>, SetTextError>> {
        match byte {
            b'\r' | b'\n' => self.finish(),
            // Backspace / DEL
            0x08 | 0x7F => {
                if !self.overflow {
                    self.backspace();
                }
                None
            }
            _ if byte.is_ascii_control() => None,
            _ => {
                if self.buf.push(byte).is_err() {
                    self.overflow = true;
                }
                None
            }
        }
    }

    /// Bytes held for the current line
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn backspace(&mut self) {
        // Drop a whole UTF-8 sequence, continuation bytes first
        while let Some(byte) = self.buf.pop() {
            if byte & 0xC0 != 0x80 {
                break;
            }
        }
    }

    fn finish(&mut self) -> Option<Result<String<N>, SetTextError>> {
        let overflow = core::mem::take(&mut self.overflow);
        if overflow {
            self.buf.clear();
            return Some(Err(SetTextError::TooLong));
        }
        if self.buf.is_empty() {
            return None;
        }

        let mut line = String::new();
        let result = match core::str::from_utf8(&self.buf) {
            Ok(text) => line.push_str(text).map(|_| line).map_err(|_| SetTextError::TooLong),
            Err(_) => Err(SetTextError::InvalidText),
        };
        self.buf.clear();
        Some(result)
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}
