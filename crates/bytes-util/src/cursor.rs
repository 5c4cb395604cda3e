use std::io;

use bytes::Bytes;

/// Zero-copy extraction helpers for `io::Cursor<Bytes>`.
pub trait BytesCursorExt {
    /// Returns the next `size` bytes as a slice of the underlying buffer and
    /// advances the cursor past them.
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes>;

    /// Returns everything after the cursor position and moves the cursor to the end.
    fn extract_remaining(&mut self) -> Bytes;
}

impl BytesCursorExt for io::Cursor<Bytes> {
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes> {
        let position = self.position() as usize;
        let available = self.get_ref().len().saturating_sub(position);
        if size > available {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "not enough bytes remaining in cursor",
            ));
        }

        let slice = self.get_ref().slice(position..position + size);
        self.set_position((position + size) as u64);
        Ok(slice)
    }

    fn extract_remaining(&mut self) -> Bytes {
        let position = (self.position() as usize).min(self.get_ref().len());
        let slice = self.get_ref().slice(position..);
        self.set_position(self.get_ref().len() as u64);
        slice
    }
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bytes() {
        let mut cursor = io::Cursor::new(Bytes::from_static(b"hello world"));
        assert_eq!(cursor.extract_bytes(5).unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(cursor.position(), 5);

        let err = cursor.extract_bytes(7).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(cursor.position(), 5);

        assert_eq!(cursor.extract_remaining(), Bytes::from_static(b" world"));
        assert_eq!(cursor.extract_remaining(), Bytes::new());
    }
}
