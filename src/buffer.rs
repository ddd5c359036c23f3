// Response accumulation buffer.
//
// Every network call gets its own `ResponseBuffer`; the transport appends
// chunks to it as they arrive. The stored bytes are always followed by a
// single zero byte so the contents can be handed on as C-style text.

use crate::error::Result;
use std::borrow::Cow;

/// Growable byte buffer filled incrementally by one network exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    // Content followed by the zero terminator; never empty.
    bytes: Vec<u8>,
}

impl ResponseBuffer {
    /// Empty buffer holding only its terminator.
    pub fn new() -> Self {
        let mut bytes = Vec::with_capacity(1);
        bytes.push(0);
        ResponseBuffer { bytes }
    }

    /// Append a chunk, keeping the buffer zero-terminated.
    ///
    /// Growth is fallible: if the allocation cannot be satisfied the buffer
    /// is left unchanged and `Error::OutOfMemory` is returned, which the
    /// transport treats as an abort of the whole call.
    pub fn append(&mut self, chunk: &[u8]) -> Result<()> {
        // The terminator slot is reused, so the vector grows by exactly
        // `chunk.len()`.
        self.bytes.try_reserve(chunk.len())?;
        self.bytes.pop();
        self.bytes.extend_from_slice(chunk);
        self.bytes.push(0);
        Ok(())
    }

    /// Number of content bytes, not counting the terminator.
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Content including the trailing zero byte.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    /// Content as text; invalid UTF-8 is replaced rather than rejected.
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_and_terminated() {
        let buf = ResponseBuffer::new();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn sequential_appends_concatenate() {
        let mut buf = ResponseBuffer::new();
        buf.append(b"ab").unwrap();
        buf.append(b"cd").unwrap();
        assert_eq!(buf.as_bytes(), b"abcd");
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.as_bytes_with_nul(), b"abcd\0");
        assert_eq!(buf.to_text(), "abcd");
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut buf = ResponseBuffer::new();
        buf.append(b"x").unwrap();
        buf.append(b"").unwrap();
        assert_eq!(buf.as_bytes_with_nul(), b"x\0");
    }

    #[test]
    fn embedded_zero_bytes_are_kept() {
        let mut buf = ResponseBuffer::new();
        buf.append(&[1, 0, 2]).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.as_bytes(), &[1, 0, 2]);
    }
}
