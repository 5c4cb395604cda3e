//! Shared AVIF test builders.
//!
//! This module is available for local avif tests and optionally for downstream
//! crate tests when the `test-utils` feature is enabled.

use av1::{AV1CodecConfigurationRecord, ObuType, write_obu};
use bytes::Bytes;
use bytes_util::BitWriter;

use crate::boxes::{
    AssociationEntry, BaseOffset, FileBox, FileTypeBox, FourCC, HandlerBox,
    ImageSpatialExtentsProperty, ItemInfoBox, ItemInfoEntry, ItemLocation, ItemLocationBox,
    ItemPropertiesBox, ItemProperty, ItemPropertyAssociation, ItemPropertyContainer,
    MediaDataBox, MetaBox, PixelInformationProperty, PrimaryItemBox, PropertyAssociation,
};

/// A 3840x2160 profile 0, level 5.1, 8-bit 4:2:0 sequence header OBU as written by libaom.
pub const SEQ_HEADER_OBU: &[u8] = b"\n\x0f\0\0\0j\xef\xbf\xe1\xbc\x02\x19\x90\x10\x10\x10@";

pub fn make_box(fourcc: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let size = (8 + body.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(fourcc);
    out.extend_from_slice(body);
    out
}

pub fn make_full_box(fourcc: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + payload.len());
    body.push(version);
    body.push(((flags >> 16) & 0xFF) as u8);
    body.push(((flags >> 8) & 0xFF) as u8);
    body.push((flags & 0xFF) as u8);
    body.extend_from_slice(payload);
    make_box(fourcc, &body)
}

/// Payload of a reduced still picture sequence header for an 8-bit 4:2:0
/// image, at `seq_level_idx[0] = 8`.
///
/// `width` and `height` must be in `1..=65536`.
pub fn still_picture_sequence_header(width: u32, height: u32) -> Vec<u8> {
    fn bits_for(value: u32) -> u8 {
        (u32::BITS - value.leading_zeros()).max(1) as u8
    }

    let width_bits = bits_for(width - 1);
    let height_bits = bits_for(height - 1);

    let mut bits = BitWriter::new(Vec::new());
    bits.write_bits(0, 3).unwrap(); // seq_profile
    bits.write_bit(true).unwrap(); // still_picture
    bits.write_bit(true).unwrap(); // reduced_still_picture_header
    bits.write_bits(8, 5).unwrap(); // seq_level_idx[0]
    bits.write_bits(u64::from(width_bits - 1), 4).unwrap();
    bits.write_bits(u64::from(height_bits - 1), 4).unwrap();
    bits.write_bits(u64::from(width - 1), width_bits).unwrap();
    bits.write_bits(u64::from(height - 1), height_bits).unwrap();
    bits.write_bits(0, 6).unwrap(); // superblock, filter intra, edge, superres, cdef, lr
    bits.write_bit(false).unwrap(); // high_bitdepth
    bits.write_bit(false).unwrap(); // mono_chrome
    bits.write_bit(false).unwrap(); // color_description_present_flag
    bits.write_bit(false).unwrap(); // color_range
    bits.write_bits(0, 2).unwrap(); // chroma_sample_position
    bits.write_bit(false).unwrap(); // separate_uv_delta_q
    bits.write_bit(false).unwrap(); // film_grain_params_present
    bits.write_bit(true).unwrap(); // trailing_one_bit
    bits.finish().unwrap()
}

/// Writes one OBU per `(type, payload)` pair, all with size fields.
pub fn temporal_unit(obus: &[(ObuType, &[u8])]) -> Bytes {
    let mut buf = Vec::new();
    for (obu_type, payload) in obus {
        write_obu(&mut buf, *obu_type, None, payload).unwrap();
    }
    Bytes::from(buf)
}

/// The `av1C` record of [`SEQ_HEADER_OBU`].
pub fn sample_av1_config() -> AV1CodecConfigurationRecord {
    AV1CodecConfigurationRecord {
        seq_profile: 0,
        seq_level_idx_0: 13,
        seq_tier_0: false,
        high_bitdepth: false,
        twelve_bit: false,
        monochrome: false,
        chroma_subsampling_x: true,
        chroma_subsampling_y: true,
        chroma_sample_position: 0,
        initial_presentation_delay_minus_one: None,
        config_obu: Bytes::from_static(SEQ_HEADER_OBU),
    }
}

/// A minimal single image file with one media data box holding `payload`.
///
/// The item location is still pending.
pub fn sample_file_box(payload: Bytes) -> FileBox {
    let mut container = ItemPropertyContainer::default();
    let ispe = container.push(ItemProperty::ImageSpatialExtents(
        ImageSpatialExtentsProperty {
            width: 64,
            height: 64,
        },
    ));
    let pixi = container.push(ItemProperty::PixelInformation(PixelInformationProperty {
        bits_per_channel: vec![8, 8, 8],
    }));
    let av1c = container.push(ItemProperty::Av1Config(sample_av1_config()));

    let associations = [(ispe, false), (pixi, false), (av1c, true)]
        .into_iter()
        .map(|(index, essential)| PropertyAssociation { index, essential })
        .collect();

    FileBox {
        ftyp: FileTypeBox {
            major_brand: FourCC(*b"avif"),
            minor_version: 0,
            compatible_brands: vec![
                FourCC(*b"avif"),
                FourCC(*b"mif1"),
                FourCC(*b"miaf"),
                FourCC(*b"MA1B"),
            ],
        },
        meta: MetaBox {
            hdlr: HandlerBox {
                handler_type: FourCC(*b"pict"),
                name: String::new(),
            },
            pitm: PrimaryItemBox { item_id: 1 },
            iinf: ItemInfoBox {
                entries: vec![ItemInfoEntry {
                    item_id: 1,
                    item_type: FourCC(*b"av01"),
                    name: "Color".into(),
                }],
            },
            iloc: ItemLocationBox {
                items: vec![ItemLocation {
                    item_id: 1,
                    base_offset: BaseOffset::Pending,
                    extent_length: payload.len() as u64,
                }],
            },
            iprp: ItemPropertiesBox {
                container,
                associations: ItemPropertyAssociation {
                    entries: vec![AssociationEntry {
                        item_id: 1,
                        associations,
                    }],
                },
            },
        },
        media_data: vec![MediaDataBox::new(payload)],
    }
}
