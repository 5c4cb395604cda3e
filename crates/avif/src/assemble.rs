//! Two-pass output assembly.
//!
//! The `iloc` box precedes the media data it points at, so the payload
//! offset is not known when `iloc` is written. [`assemble`] writes the tree
//! once to discover the offset, patches `iloc`, writes it again and finally
//! copies the payload over the zero-filled placeholder.
//!
//! No box length depends on an `iloc` offset value, so both passes produce
//! buffers of the same length that differ only in the patched fields.

use av1::parse_obus;
use av1::seq::SequenceHeaderObu;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::boxes::FileBox;
use crate::builder::{AvifBuilder, BuildOptions, Frame};
use crate::error::{AvifError, Result};
use crate::writer::write;

/// Serializes `file` into a complete AVIF file.
///
/// On return every `iloc` entry of `file` is resolved and every media data
/// box carries its payload offset.
pub fn assemble(file: &mut FileBox) -> Result<Bytes> {
    let discovery = write(file)?;
    file.resolve_item_locations()?;
    let final_pass = write(file)?;

    if discovery.len() != final_pass.len() {
        return Err(AvifError::PassLengthMismatch {
            discovery: discovery.len(),
            final_pass: final_pass.len(),
        });
    }
    debug!(len = final_pass.len(), "layout stable across passes");

    let mut out = BytesMut::from(final_pass);
    for (index, mdat) in file.media_data.iter().enumerate() {
        let offset = mdat.offset.ok_or(AvifError::UnresolvedOffset { index })? as usize;
        out[offset..offset + mdat.data.len()].copy_from_slice(&mdat.data);
    }

    Ok(out.freeze())
}

/// An encoded AVIF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvifImage {
    /// The file bytes.
    pub data: Bytes,
    /// Image width written to `ispe`.
    pub width: u32,
    /// Image height written to `ispe`.
    pub height: u32,
    /// The sequence header of the stored frame.
    pub sequence_header: SequenceHeaderObu,
}

/// Wraps one AV1 temporal unit in an AVIF file.
///
/// A `width` or `height` of `None` falls back to the maximum frame size
/// signaled in the sequence header.
pub fn encode_avif(
    width: Option<u32>,
    height: Option<u32>,
    temporal_unit: Bytes,
    options: &BuildOptions,
) -> Result<AvifImage> {
    let stream = parse_obus(temporal_unit)?;
    debug!(obus = stream.records().len(), "parsed temporal unit");

    let frame = Frame::from_obus(&stream)?;
    let sequence_header = frame.sequence_header.clone();

    let width = width.unwrap_or(sequence_header.max_frame_width);
    let height = height.unwrap_or(sequence_header.max_frame_height);
    if width == 0 || height == 0 {
        return Err(AvifError::InvalidDimensions { width, height });
    }

    let mut builder = AvifBuilder::new(width, height).with_options(options.clone());
    builder.set_primary_frame(frame);
    let mut file = builder.build()?;

    let data = assemble(&mut file)?;
    Ok(AvifImage {
        data,
        width,
        height,
        sequence_header,
    })
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use std::io;

    use av1::{AV1CodecConfigurationRecord, ObuType};

    use super::*;
    use crate::boxes::BaseOffset;
    use crate::dump::{find_box, list_boxes};
    use crate::test_support::{
        SEQ_HEADER_OBU, sample_file_box, still_picture_sequence_header, temporal_unit,
    };

    #[test]
    fn test_two_pass_offset_stability() {
        let payload = Bytes::from_static(&[0x42; 64]);
        let mut file = sample_file_box(payload);

        let discovery = write(&mut file).unwrap();
        file.resolve_item_locations().unwrap();
        let final_pass = write(&mut file).unwrap();
        assert_eq!(discovery.len(), final_pass.len());

        let iloc = find_box(&list_boxes(&final_pass), b"iloc").unwrap();
        let patched = iloc.offset + 20..iloc.offset + 24;
        for (i, (a, b)) in discovery.iter().zip(final_pass.iter()).enumerate() {
            if !patched.contains(&i) {
                assert_eq!(a, b, "byte {i} changed between passes");
            }
        }
        assert_eq!(&discovery[patched.clone()], &[0; 4]);
        assert_eq!(
            u32::from_be_bytes(final_pass[patched].try_into().unwrap()) as u64,
            file.media_data[0].offset.unwrap()
        );
    }

    #[test]
    fn test_offset_correctness() {
        let payload = Bytes::from_static(b"configuration obus then frame obus");
        let mut file = sample_file_box(payload.clone());
        let out = assemble(&mut file).unwrap();

        let offset = file.media_data[0].offset.unwrap();
        assert_eq!(file.meta.iloc.items[0].base_offset, BaseOffset::Resolved(offset));

        let offset = offset as usize;
        assert_eq!(offset + payload.len(), out.len());
        assert_eq!(&out[offset..], payload.as_ref());

        let mdat = find_box(&list_boxes(&out), b"mdat").unwrap();
        assert_eq!(mdat.body_start(), offset);
        assert_eq!(mdat.size - mdat.header_size, payload.len());
    }

    #[test]
    fn test_placeholder_before_copy() {
        let payload = Bytes::from_static(&[0xee; 16]);
        let mut file = sample_file_box(payload.clone());
        write(&mut file).unwrap();
        file.resolve_item_locations().unwrap();
        let final_pass = write(&mut file).unwrap();

        let offset = file.media_data[0].offset.unwrap() as usize;
        let placeholder = &final_pass[offset..];
        assert_eq!(placeholder.len(), payload.len());
        assert!(placeholder.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_avif() {
        let mut seq = still_picture_sequence_header(64, 64);
        seq.resize(10, 0);
        let data = temporal_unit(&[
            (ObuType::TemporalDelimiter, &[]),
            (ObuType::SequenceHeader, &seq),
            (ObuType::Frame, &[0x5a; 497]),
        ]);

        let image = encode_avif(None, None, data.clone(), &BuildOptions::default()).unwrap();
        assert_eq!(image.sequence_header.max_frame_width, 64);
        assert_eq!((image.width, image.height), (64, 64));

        let boxes = list_boxes(&image.data);
        let tree: Vec<String> = boxes.iter().map(ToString::to_string).collect();
        insta::assert_snapshot!(tree.join("\n"), @r"
        ftyp @0 size=32
        meta @32 size=251
          hdlr @44 size=33
          pitm @77 size=14
          iinf @91 size=40
            infe @105 size=26
          iloc @131 size=34
          iprp @165 size=118
            ipco @173 size=87
              ispe @181 size=20
              pixi @201 size=16
              av1C @217 size=24
              colr @241 size=19
            ipma @260 size=23
        mdat @283 size=520
        ");

        let mdat = find_box(&boxes, b"mdat").unwrap();
        assert_eq!(&image.data[mdat.body_start()..], &data[2..]);

        let av1c = find_box(&boxes, b"av1C").unwrap();
        assert_eq!(&image.data[av1c.body_start() + 4..av1c.end()], &data[2..14]);
    }

    #[test]
    fn test_encode_avif_errors() {
        let options = BuildOptions::default();
        let truncated = Bytes::from_static(&[0x12, 0x80]);
        let err = encode_avif(Some(1), Some(1), truncated, &options).unwrap_err();
        assert!(matches!(err, AvifError::Parse(_)), "{err:?}");

        let no_seq = temporal_unit(&[(ObuType::Frame, &[1, 2, 3])]);
        let err = encode_avif(Some(1), Some(1), no_seq, &options).unwrap_err();
        assert!(matches!(err, AvifError::MissingSequenceHeader));

        let seq = Bytes::from_static(SEQ_HEADER_OBU);
        let err = encode_avif(Some(0), None, seq, &options).unwrap_err();
        insta::assert_snapshot!(err, @"invalid image size 0x2160");
    }

    #[test]
    fn test_encode_avif_size_override() {
        let data = temporal_unit(&[
            (ObuType::SequenceHeader, &still_picture_sequence_header(100, 50)),
            (ObuType::Frame, &[0x33; 40]),
        ]);

        let image = encode_avif(Some(32), None, data, &BuildOptions::default()).unwrap();
        assert_eq!((image.width, image.height), (32, 50));

        let ispe = find_box(&list_boxes(&image.data), b"ispe").unwrap();
        let body = &image.data[ispe.body_start() + 4..ispe.end()];
        assert_eq!(body, &[0, 0, 0, 32, 0, 0, 0, 50]);
    }

    #[test]
    fn test_real_sequence_header_round_trip() {
        let image = encode_avif(
            None,
            None,
            Bytes::from_static(SEQ_HEADER_OBU),
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!((image.width, image.height), (3840, 2160));

        let boxes = list_boxes(&image.data);
        let av1c = find_box(&boxes, b"av1C").unwrap();
        let mut body = io::Cursor::new(image.data.slice(av1c.body_start()..av1c.end()));
        let config = AV1CodecConfigurationRecord::demux(&mut body).unwrap();
        assert_eq!(
            config,
            AV1CodecConfigurationRecord::from_sequence_header(
                &image.sequence_header,
                Bytes::from_static(SEQ_HEADER_OBU),
            )
        );
        assert_eq!(config.seq_profile, 0);
        assert_eq!(config.seq_level_idx_0, 13);
        assert_eq!(config.config_obu.as_ref(), SEQ_HEADER_OBU);

        let ispe = find_box(&boxes, b"ispe").unwrap();
        let body = &image.data[ispe.body_start()..ispe.end()];
        assert_eq!(&body[4..], &[0, 0, 0x0f, 0, 0, 0, 0x08, 0x70]);
    }
}
