//! Box serialization.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::boxes::{FileBox, FourCC, IsoBox, MediaDataBox};
use crate::error::{AvifError, Result};

/// Serializes boxes into a growable buffer.
///
/// Each box is preceded by a header carrying the size it reports through
/// [`IsoBox::size`]; if the body then writes a different number of bytes,
/// [`BoxWriter::write_box`] fails with [`AvifError::Layout`].
#[derive(Debug, Default)]
pub struct BoxWriter {
    buf: BytesMut,
}

impl BoxWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Consumes the writer and returns the written bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Writes `b`, header included.
    pub fn write_box<B: IsoBox + ?Sized>(&mut self, b: &B) -> Result<()> {
        let start = self.position();
        let declared = b.size();
        let fourcc = b.fourcc();

        if declared > u64::from(u32::MAX) {
            self.put_u32(1);
            self.put_fourcc(fourcc);
            self.put_u64(declared);
        } else {
            self.put_u32(declared as u32);
            self.put_fourcc(fourcc);
        }

        if let Some(full) = b.full_box_header() {
            self.put_u8(full.version);
            self.buf.put_uint(u64::from(full.flags & 0x00ff_ffff), 3);
        }

        b.write_body(self)?;

        let written = self.position() - start;
        if written != declared {
            return Err(AvifError::Layout {
                fourcc,
                declared,
                written,
            });
        }

        trace!(%fourcc, start, size = declared, "wrote box");
        Ok(())
    }

    /// Writes a media data box with a placeholder payload and records where
    /// the payload starts in `mdat.offset`.
    ///
    /// Returns the recorded offset.
    pub fn write_media_data(&mut self, mdat: &mut MediaDataBox) -> Result<u64> {
        let offset = self.position() + mdat.header_size();
        self.write_box(&*mdat)?;
        mdat.offset = Some(offset);
        Ok(offset)
    }

    pub(crate) fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub(crate) fn put_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub(crate) fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub(crate) fn put_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    pub(crate) fn put_fourcc(&mut self, fourcc: FourCC) {
        self.buf.put_slice(fourcc.as_bytes());
    }

    /// Writes `value` followed by a NUL byte.
    pub(crate) fn put_cstr(&mut self, value: &str) {
        self.buf.put_slice(value.as_bytes());
        self.buf.put_u8(0);
    }

    pub(crate) fn put_zeros(&mut self, count: usize) {
        self.buf.put_bytes(0, count);
    }
}

impl io::Write for BoxWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serializes `file` and records each media data payload offset.
///
/// Media data payloads are left zero-filled. The offsets are stored on
/// `file.media_data[i].offset`; `iloc` is written with whatever base offsets
/// it currently holds.
pub fn write(file: &mut FileBox) -> Result<Bytes> {
    let mut writer = BoxWriter::with_capacity(file.size() as usize);

    writer.write_box(&file.ftyp)?;
    writer.write_box(&file.meta)?;
    for (index, mdat) in file.media_data.iter_mut().enumerate() {
        let offset = writer.write_media_data(mdat)?;
        debug!(index, offset, length = mdat.data.len(), "placed media data");
    }

    Ok(writer.into_bytes())
}
