use std::io;

/// Reads MSB-first bit fields from an underlying reader.
///
/// Bytes are pulled from the inner reader one at a time, only when the
/// current byte has been fully consumed, so the inner reader's position is
/// always the position of the next unread byte.
#[derive(Debug)]
pub struct BitReader<T> {
    data: T,
    current_byte: u8,
    bit_pos: u8,
}

impl<T: io::Read> BitReader<T> {
    /// Creates a new bit reader over `data`.
    pub const fn new(data: T) -> Self {
        Self {
            data,
            current_byte: 0,
            bit_pos: 0,
        }
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.bit_pos == 0 {
            let mut byte = [0u8; 1];
            self.data.read_exact(&mut byte)?;
            self.current_byte = byte[0];
        }

        let bit = (self.current_byte >> (7 - self.bit_pos)) & 1 == 1;
        self.bit_pos = (self.bit_pos + 1) % 8;
        Ok(bit)
    }

    /// Reads `count` bits (at most 64) as a big-endian unsigned integer.
    pub fn read_bits(&mut self, count: u8) -> io::Result<u64> {
        if count > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot read more than 64 bits at once",
            ));
        }

        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Skips `count` bits forward.
    pub fn seek_bits(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            self.read_bit()?;
        }
        Ok(())
    }

    /// Discards the remaining bits of the current byte.
    pub fn align(&mut self) {
        self.bit_pos = 0;
    }
}

impl<T> BitReader<T> {
    /// Returns `true` if the reader sits on a byte boundary.
    pub const fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Returns a reference to the inner reader.
    pub const fn get_ref(&self) -> &T {
        &self.data
    }

    /// Consumes the bit reader and returns the inner reader.
    ///
    /// Unread bits of a partially consumed byte are dropped.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: io::Read> io::Read for BitReader<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_aligned() {
            return self.data.read(buf);
        }

        for (read, byte) in buf.iter_mut().enumerate() {
            match self.read_bits(8) {
                Ok(value) => *byte = value as u8,
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(read),
                Err(err) => return Err(err),
            }
        }

        Ok(buf.len())
    }
}
