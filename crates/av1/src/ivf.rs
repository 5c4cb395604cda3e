//! IVF input.
//!
//! Encoders such as `aomenc` and `rav1e` write their output wrapped in IVF:
//! a 32-byte file header followed by frames, each with a 12-byte header.
//! A still image is a single temporal unit, so only the first frame is of
//! interest here.
//!
//! All multi-byte integers are little-endian.

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use bytes_util::BytesCursorExt;

use crate::error::{Av1Error, Result};

/// IVF file signature: `"DKIF"`.
pub const IVF_SIGNATURE: [u8; 4] = *b"DKIF";

/// AV1 codec FourCC: `"av01"`.
const AV1_FOURCC: [u8; 4] = *b"av01";

/// Returns `true` if `data` starts with the IVF signature.
pub fn is_ivf(data: &[u8]) -> bool {
    data.starts_with(&IVF_SIGNATURE)
}

/// IVF file header.
///
/// ```text
/// Offset  Size  Field
/// 0       4     signature: "DKIF"
/// 4       2     version: 0
/// 6       2     header_size: 32
/// 8       4     codec_fourcc: "av01"
/// 12      2     width
/// 14      2     height
/// 16      4     timebase_denominator (rate)
/// 20      4     timebase_numerator (scale)
/// 24      4     frame_count
/// 28      4     reserved
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvfHeader {
    /// IVF version (must be 0).
    pub version: u16,
    /// Length of the file header as declared in the file.
    pub header_size: u16,
    /// Frame width in pixels.
    pub width: u16,
    /// Frame height in pixels.
    pub height: u16,
    /// Timebase numerator, stored after the denominator.
    pub timebase_numerator: u32,
    /// Timebase denominator.
    pub timebase_denominator: u32,
    /// Total number of frames (may be 0 if unknown).
    pub frame_count: u32,
}

impl IvfHeader {
    /// Size of the IVF file header in bytes.
    pub const SIZE: usize = 32;

    /// Demuxes an IVF file header from the given reader.
    ///
    /// Header bytes beyond the 32 known ones are skipped.
    pub fn demux<R: io::Read>(reader: &mut R) -> Result<Self> {
        let mut signature = [0u8; 4];
        reader.read_exact(&mut signature)?;
        if signature != IVF_SIGNATURE {
            return Err(Av1Error::InvalidIvfSignature(signature));
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != 0 {
            return Err(Av1Error::UnsupportedIvfVersion(version));
        }

        let header_size = reader.read_u16::<LittleEndian>()?;

        let mut codec = [0u8; 4];
        reader.read_exact(&mut codec)?;
        if !codec.eq_ignore_ascii_case(&AV1_FOURCC) {
            return Err(Av1Error::InvalidIvfCodec(codec));
        }

        let width = reader.read_u16::<LittleEndian>()?;
        let height = reader.read_u16::<LittleEndian>()?;
        let timebase_denominator = reader.read_u32::<LittleEndian>()?;
        let timebase_numerator = reader.read_u32::<LittleEndian>()?;

        if timebase_numerator == 0 || timebase_denominator == 0 {
            return Err(Av1Error::InvalidIvfTimebase {
                numerator: timebase_numerator,
                denominator: timebase_denominator,
            });
        }

        let frame_count = reader.read_u32::<LittleEndian>()?;
        let _reserved = reader.read_u32::<LittleEndian>()?;

        let extra = (header_size as usize).saturating_sub(Self::SIZE);
        if extra > 0 {
            io::copy(&mut io::Read::take(&mut *reader, extra as u64), &mut io::sink())?;
        }

        Ok(IvfHeader {
            version,
            header_size,
            width,
            height,
            timebase_numerator,
            timebase_denominator,
            frame_count,
        })
    }

    /// Muxes this IVF file header to the given writer.
    ///
    /// Always writes a 32 byte header.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&IVF_SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u16::<LittleEndian>(Self::SIZE as u16)?;
        writer.write_all(&AV1_FOURCC)?;
        writer.write_u16::<LittleEndian>(self.width)?;
        writer.write_u16::<LittleEndian>(self.height)?;
        writer.write_u32::<LittleEndian>(self.timebase_denominator)?;
        writer.write_u32::<LittleEndian>(self.timebase_numerator)?;
        writer.write_u32::<LittleEndian>(self.frame_count)?;
        writer.write_u32::<LittleEndian>(0)?; // reserved
        Ok(())
    }
}

/// IVF frame header.
///
/// ```text
/// Offset  Size  Field
/// 0       4     frame_size (bytes of payload following)
/// 4       8     pts (presentation timestamp in timebase units)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct IvfFrameHeader {
    /// Size of the frame data in bytes.
    pub frame_size: u32,
    /// Presentation timestamp in timebase units.
    pub pts: u64,
}

impl IvfFrameHeader {
    /// Size of each IVF frame header in bytes.
    pub const SIZE: usize = 12;

    /// Demuxes an IVF frame header from the given reader.
    pub fn demux<R: io::Read>(reader: &mut R) -> Result<Self> {
        let frame_size = reader.read_u32::<LittleEndian>()?;
        let pts = reader.read_u64::<LittleEndian>()?;
        Ok(IvfFrameHeader { frame_size, pts })
    }

    /// Muxes this IVF frame header to the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.frame_size)?;
        writer.write_u64::<LittleEndian>(self.pts)?;
        Ok(())
    }
}

/// A parsed IVF frame with zero-copy data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvfFrame {
    /// Frame header.
    pub header: IvfFrameHeader,
    /// The temporal unit carried by the frame.
    pub data: Bytes,
}

impl IvfFrame {
    /// Demuxes a full IVF frame (header + data) from a `Cursor<Bytes>`.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self> {
        let header = IvfFrameHeader::demux(reader)?;
        let data = reader
            .extract_bytes(header.frame_size as usize)
            .map_err(|_| Av1Error::UnexpectedEof {
                expected: header.frame_size as usize,
                actual: (reader.get_ref().len() as u64 - reader.position()) as usize,
            })?;
        Ok(IvfFrame { header, data })
    }
}

/// Splits an IVF file into its header and the data of its first frame.
///
/// Frames after the first are ignored. A file that ends right after the
/// header fails with [`Av1Error::NoIvfFrames`].
pub fn first_frame(data: Bytes) -> Result<(IvfHeader, Bytes)> {
    let mut cursor = io::Cursor::new(data);
    let header = IvfHeader::demux(&mut cursor)?;

    if cursor.position() as usize >= cursor.get_ref().len() {
        return Err(Av1Error::NoIvfFrames);
    }

    let frame = IvfFrame::demux(&mut cursor)?;
    Ok((header, frame.data))
}
