use std::io;

/// Writes MSB-first bit fields into an underlying writer.
///
/// A partially filled byte is held back until it is complete or until
/// [`BitWriter::finish`] pads it with zero bits.
#[derive(Debug)]
pub struct BitWriter<W> {
    writer: W,
    current_byte: u8,
    bit_pos: u8,
}

impl<W: io::Write> BitWriter<W> {
    /// Creates a new bit writer over `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            current_byte: 0,
            bit_pos: 0,
        }
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.current_byte |= 1 << (7 - self.bit_pos);
        }

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.writer.write_all(&[self.current_byte])?;
            self.current_byte = 0;
            self.bit_pos = 0;
        }

        Ok(())
    }

    /// Writes the low `count` bits (at most 64) of `bits`, most significant first.
    pub fn write_bits(&mut self, bits: u64, count: u8) -> io::Result<()> {
        if count > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot write more than 64 bits at once",
            ));
        }

        for i in (0..count).rev() {
            self.write_bit((bits >> i) & 1 == 1)?;
        }
        Ok(())
    }

    /// Pads the current byte with zero bits and flushes it.
    pub fn align(&mut self) -> io::Result<()> {
        if self.bit_pos != 0 {
            self.writer.write_all(&[self.current_byte])?;
            self.current_byte = 0;
            self.bit_pos = 0;
        }
        Ok(())
    }

    /// Aligns to a byte boundary and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.align()?;
        Ok(self.writer)
    }
}

impl<W> BitWriter<W> {
    /// Returns `true` if the writer sits on a byte boundary.
    pub const fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Returns a reference to the inner writer.
    pub const fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: io::Write> io::Write for BitWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_aligned() {
            return self.writer.write(buf);
        }

        for byte in buf {
            self.write_bits(u64::from(*byte), 8)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::BitReader;

    #[test]
    fn test_write_bits() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bit(true).unwrap();
        writer.write_bits(0b011, 3).unwrap();
        writer.write_bits(0b0011_1000, 8).unwrap();
        assert!(!writer.is_aligned());
        writer.write_bits(0b1111, 4).unwrap();
        assert!(writer.is_aligned());

        assert_eq!(writer.finish().unwrap(), [0b1011_0011, 0b1000_1111]);
    }

    #[test]
    fn test_finish_pads_with_zeros() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3).unwrap();
        assert_eq!(writer.get_ref().len(), 0);
        assert_eq!(writer.finish().unwrap(), [0b1010_0000]);
    }

    #[test]
    fn test_unaligned_byte_write() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bit(true).unwrap();
        writer.write_all(&[0x00, 0x02]).unwrap();
        assert_eq!(writer.finish().unwrap(), [0b1000_0000, 0x01, 0x00]);
    }

    #[test]
    fn test_round_trip_with_reader() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(3839, 12).unwrap();
        writer.write_bits(2159, 12).unwrap();
        writer.write_bit(true).unwrap();
        let data = writer.finish().unwrap();
        assert_eq!(data.len(), 4);

        let mut reader = BitReader::new(io::Cursor::new(data));
        assert_eq!(reader.read_bits(12).unwrap(), 3839);
        assert_eq!(reader.read_bits(12).unwrap(), 2159);
        assert!(reader.read_bit().unwrap());
    }
}
