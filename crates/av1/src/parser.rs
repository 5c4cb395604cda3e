//! Low-overhead OBU bitstream parsing.
//!
//! [`parse_obus`] walks a buffer holding one encoded temporal unit and
//! returns every OBU it contains, together with the byte range each one
//! occupies. The ranges tile the buffer exactly: a buffer that does not end
//! on an OBU boundary is rejected rather than silently truncated.
//!
//! The last OBU may omit `obu_has_size_field`, in which case it extends to
//! the end of the buffer, as is allowed for container samples.

use std::io;
use std::ops::Range;

use bytes::Bytes;
use bytes_util::BytesCursorExt;

use crate::error::{Av1Error, Result};
use crate::obu::seq::SequenceHeaderObu;
use crate::obu::{EXTENSION_FLAG_MASK, FORBIDDEN_BIT_MASK, ObuExtensionHeader, ObuHeader, ObuType};

/// Decoded payload of an OBU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObuContent {
    /// The payload was not decoded; its bytes are carried as-is.
    Opaque,
    /// A decoded sequence header.
    SequenceHeader(Box<SequenceHeaderObu>),
}

/// A single OBU located inside a parsed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObuRecord {
    /// Parsed OBU header.
    pub header: ObuHeader,
    /// Offset of the first header byte.
    pub begin: usize,
    /// Offset one past the last payload byte.
    pub end: usize,
    /// Decoded payload, if the OBU type is one that gets decoded.
    pub content: ObuContent,
}

impl ObuRecord {
    /// Returns the OBU type.
    pub const fn obu_type(&self) -> ObuType {
        self.header.obu_type
    }

    /// Returns the half-open byte range of the whole OBU, header included.
    pub const fn range(&self) -> Range<usize> {
        self.begin..self.end
    }

    /// Returns the encoded length of the whole OBU.
    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Returns `true` if the OBU occupies no bytes, which never happens for parsed records.
    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Returns the decoded sequence header, if this record carries one.
    pub fn sequence_header(&self) -> Option<&SequenceHeaderObu> {
        match &self.content {
            ObuContent::SequenceHeader(seq) => Some(seq),
            ObuContent::Opaque => None,
        }
    }
}

/// The result of [`parse_obus`]: the source buffer and the records found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObuStream {
    buffer: Bytes,
    records: Vec<ObuRecord>,
}

impl ObuStream {
    /// Returns the records in stream order.
    pub fn records(&self) -> &[ObuRecord] {
        &self.records
    }

    /// Returns the buffer the records point into.
    pub const fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Returns the encoded bytes of `record` as a zero-copy slice.
    pub fn bytes_of(&self, record: &ObuRecord) -> Bytes {
        self.buffer.slice(record.range())
    }

    /// Returns the first decoded sequence header in the stream.
    pub fn sequence_header(&self) -> Option<&SequenceHeaderObu> {
        self.records.iter().find_map(ObuRecord::sequence_header)
    }
}

/// Parses every OBU in `buffer`.
///
/// Either the whole buffer parses or an error is returned; partial results
/// are never handed out.
pub fn parse_obus(buffer: Bytes) -> Result<ObuStream> {
    let mut records = Vec::new();
    let mut cursor = io::Cursor::new(buffer);

    while (cursor.position() as usize) < cursor.get_ref().len() {
        records.push(parse_record(&mut cursor)?);
    }

    Ok(ObuStream {
        buffer: cursor.into_inner(),
        records,
    })
}

fn parse_record(cursor: &mut io::Cursor<Bytes>) -> Result<ObuRecord> {
    let begin = cursor.position() as usize;
    let buffer_len = cursor.get_ref().len();

    let first = cursor.get_ref()[begin];
    if first & FORBIDDEN_BIT_MASK != 0 {
        return Err(Av1Error::InvalidObu(format!(
            "obu_forbidden_bit set at offset {begin}"
        )));
    }
    if first & EXTENSION_FLAG_MASK != 0 && buffer_len - begin < 2 {
        return Err(Av1Error::TruncatedHeader { offset: begin });
    }

    // Past the checks above, the only way to run out of input is inside obu_size.
    let header = ObuHeader::parse(cursor).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => Av1Error::TruncatedSize { offset: begin },
        io::ErrorKind::InvalidData => Av1Error::Leb128Overflow,
        _ => Av1Error::Io(err),
    })?;

    let payload_start = cursor.position() as usize;
    let available = buffer_len - payload_start;
    let payload_len = match header.size {
        Some(declared) if declared > available as u64 => {
            return Err(Av1Error::ObuOverrun {
                offset: begin,
                declared,
                available,
            });
        }
        Some(declared) => declared as usize,
        None => available,
    };

    let payload = cursor.extract_bytes(payload_len)?;

    let content = match header.obu_type {
        ObuType::SequenceHeader => {
            let seq = SequenceHeaderObu::parse(header, &mut io::Cursor::new(payload)).map_err(
                |err| Av1Error::InvalidSequenceHeader {
                    offset: begin,
                    reason: err.to_string(),
                },
            )?;
            ObuContent::SequenceHeader(Box::new(seq))
        }
        _ => ObuContent::Opaque,
    };

    Ok(ObuRecord {
        header,
        begin,
        end: payload_start + payload_len,
        content,
    })
}

/// Writes a single OBU with `obu_has_size_field = 1`.
///
/// Returns the total number of bytes written (header + payload).
pub fn write_obu<W: io::Write>(
    writer: &mut W,
    obu_type: ObuType,
    extension_header: Option<ObuExtensionHeader>,
    payload: &[u8],
) -> io::Result<usize> {
    let header = ObuHeader {
        obu_type,
        size: Some(payload.len() as u64),
        extension_header,
    };

    let header_bytes = header.mux(writer)?;
    writer.write_all(payload)?;

    Ok(header_bytes + payload.len())
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use bytes_util::BitWriter;
    use proptest::prelude::*;

    use super::*;

    const SEQ_HEADER_OBU: &[u8] = b"\n\x0f\0\0\0j\xef\xbf\xe1\xbc\x02\x19\x90\x10\x10\x10@";

    /// A reduced still picture header for a 64x64 8-bit 4:2:0 image, padded to 10 bytes.
    fn still_picture_payload() -> Vec<u8> {
        let mut bits = BitWriter::new(Vec::new());
        bits.write_bits(0, 3).unwrap(); // seq_profile
        bits.write_bit(true).unwrap(); // still_picture
        bits.write_bit(true).unwrap(); // reduced_still_picture_header
        bits.write_bits(8, 5).unwrap(); // seq_level_idx[0]
        bits.write_bits(5, 4).unwrap(); // frame_width_bits_minus_1
        bits.write_bits(5, 4).unwrap(); // frame_height_bits_minus_1
        bits.write_bits(63, 6).unwrap(); // max_frame_width_minus_1
        bits.write_bits(63, 6).unwrap(); // max_frame_height_minus_1
        bits.write_bits(0, 6).unwrap(); // superblock, filter intra, edge, superres, cdef, lr
        bits.write_bit(false).unwrap(); // high_bitdepth
        bits.write_bit(false).unwrap(); // mono_chrome
        bits.write_bit(false).unwrap(); // color_description_present_flag
        bits.write_bit(false).unwrap(); // color_range
        bits.write_bits(0, 2).unwrap(); // chroma_sample_position
        bits.write_bit(false).unwrap(); // separate_uv_delta_q
        bits.write_bit(false).unwrap(); // film_grain_params_present
        bits.write_bit(true).unwrap(); // trailing_one_bit

        let mut payload = bits.finish().unwrap();
        payload.resize(10, 0);
        payload
    }

    fn scenario_a() -> Vec<u8> {
        let mut buf = Vec::new();
        write_obu(&mut buf, ObuType::TemporalDelimiter, None, &[]).unwrap();
        write_obu(&mut buf, ObuType::SequenceHeader, None, &still_picture_payload()).unwrap();
        // 497 payload bytes need a 2 byte leb128 size, making the OBU 500 bytes.
        write_obu(&mut buf, ObuType::Frame, None, &[0x5a; 497]).unwrap();
        buf
    }

    #[test]
    fn test_parse_temporal_unit() {
        let stream = parse_obus(Bytes::from(scenario_a())).unwrap();

        let summary: Vec<_> = stream
            .records()
            .iter()
            .map(|record| (record.obu_type(), record.range()))
            .collect();
        insta::assert_debug_snapshot!(summary, @r"
        [
            (
                TemporalDelimiter,
                0..2,
            ),
            (
                SequenceHeader,
                2..14,
            ),
            (
                Frame,
                14..514,
            ),
        ]
        ");

        let seq = stream.sequence_header().unwrap();
        assert_eq!(seq.seq_profile, 0);
        assert!(seq.reduced_still_picture_header);
        assert_eq!((seq.max_frame_width, seq.max_frame_height), (64, 64));
        assert_eq!(seq.seq_level_idx_0(), 8);
        assert!(stream.records()[0].sequence_header().is_none());
        assert_eq!(stream.bytes_of(&stream.records()[2]).len(), 500);
    }

    #[test]
    fn test_parse_real_sequence_header() {
        let stream = parse_obus(Bytes::from_static(SEQ_HEADER_OBU)).unwrap();
        assert_eq!(stream.records().len(), 1);

        let record = &stream.records()[0];
        assert_eq!(record.range(), 0..SEQ_HEADER_OBU.len());
        let seq = record.sequence_header().unwrap();
        assert_eq!(seq.header().size, Some(15));
        assert_eq!((seq.max_frame_width, seq.max_frame_height), (3840, 2160));
    }

    #[test]
    fn test_last_obu_without_size_field() {
        let mut buf = Vec::new();
        write_obu(&mut buf, ObuType::TemporalDelimiter, None, &[]).unwrap();
        buf.extend_from_slice(&[0x30, 0xde, 0xad, 0xbe, 0xef]);

        let stream = parse_obus(Bytes::from(buf)).unwrap();
        let frame = &stream.records()[1];
        assert_eq!(frame.obu_type(), ObuType::Frame);
        assert_eq!(frame.header.size, None);
        assert_eq!(frame.range(), 2..7);
    }

    #[test]
    fn test_empty_buffer() {
        let stream = parse_obus(Bytes::new()).unwrap();
        assert!(stream.records().is_empty());
        assert!(stream.sequence_header().is_none());
    }

    #[test]
    fn test_truncated_size_field() {
        let mut buf = Vec::new();
        write_obu(&mut buf, ObuType::TemporalDelimiter, None, &[]).unwrap();
        // frame with obu_has_size_field and a continuation bit on the last byte
        buf.extend_from_slice(&[0x32, 0x80]);

        let err = parse_obus(Bytes::from(buf)).unwrap_err();
        assert!(matches!(err, Av1Error::TruncatedSize { offset: 2 }), "{err:?}");
    }

    #[test]
    fn test_size_field_continues_past_eight_bytes() {
        let mut buf = vec![0x32];
        buf.extend_from_slice(&[0x80; 8]);
        let err = parse_obus(Bytes::from(buf.clone())).unwrap_err();
        assert!(matches!(err, Av1Error::TruncatedSize { offset: 0 }), "{err:?}");

        buf.push(0x00);
        let err = parse_obus(Bytes::from(buf)).unwrap_err();
        assert!(matches!(err, Av1Error::Leb128Overflow), "{err:?}");
    }

    #[test]
    fn test_truncated_extension_header() {
        let err = parse_obus(Bytes::from_static(&[0x12, 0x00, 0x36])).unwrap_err();
        assert!(matches!(err, Av1Error::TruncatedHeader { offset: 2 }), "{err:?}");
    }

    #[test]
    fn test_size_overruns_buffer() {
        let err = parse_obus(Bytes::from_static(&[0x32, 0x05, 0x00, 0x00])).unwrap_err();
        insta::assert_snapshot!(err, @"OBU at offset 0 declares 5 payload bytes, only 2 available");
    }

    #[test]
    fn test_forbidden_bit() {
        let err = parse_obus(Bytes::from_static(&[0x12, 0x00, 0x92, 0x00])).unwrap_err();
        insta::assert_snapshot!(err, @"invalid OBU: obu_forbidden_bit set at offset 2");
    }

    #[test]
    fn test_leb128_overflow() {
        let err =
            parse_obus(Bytes::from_static(&[0x32, 0x80, 0x80, 0x80, 0x80, 0x10])).unwrap_err();
        assert!(matches!(err, Av1Error::Leb128Overflow), "{err:?}");
    }

    #[test]
    fn test_invalid_sequence_header() {
        let mut buf = Vec::new();
        write_obu(&mut buf, ObuType::TemporalDelimiter, None, &[]).unwrap();
        write_obu(&mut buf, ObuType::SequenceHeader, None, &SEQ_HEADER_OBU[2..8]).unwrap();

        let err = parse_obus(Bytes::from(buf)).unwrap_err();
        match err {
            Av1Error::InvalidSequenceHeader { offset, .. } => assert_eq!(offset, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn obu_strategy() -> impl Strategy<Value = (u8, bool, Vec<u8>)> {
        (
            // sequence headers need a valid payload, so they are left out here
            (0u8..16).prop_filter("not a sequence header", |t| *t != 1),
            any::<bool>(),
            prop::collection::vec(any::<u8>(), 0..300),
        )
    }

    proptest! {
        #[test]
        fn ranges_reconstruct_buffer(
            obus in prop::collection::vec(obu_strategy(), 1..8),
            last_unsized in any::<bool>(),
        ) {
            let mut buf = Vec::new();
            let count = obus.len();
            for (i, (obu_type, extended, payload)) in obus.into_iter().enumerate() {
                let header = ObuHeader {
                    obu_type: ObuType::from(obu_type),
                    size: (!(last_unsized && i + 1 == count)).then_some(payload.len() as u64),
                    extension_header: extended.then_some(ObuExtensionHeader {
                        temporal_id: 1,
                        spatial_id: 0,
                    }),
                };
                header.mux(&mut buf).unwrap();
                buf.extend_from_slice(&payload);
            }

            let stream = parse_obus(Bytes::from(buf.clone())).unwrap();
            prop_assert_eq!(stream.records().len(), count);

            let mut rebuilt = Vec::with_capacity(buf.len());
            let mut expected_begin = 0;
            for record in stream.records() {
                prop_assert_eq!(record.begin, expected_begin);
                prop_assert!(!record.is_empty());
                rebuilt.extend_from_slice(&stream.bytes_of(record));
                expected_begin = record.end;
            }
            prop_assert_eq!(rebuilt, buf);
        }
    }
}
