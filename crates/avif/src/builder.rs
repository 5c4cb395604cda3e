//! Turning a parsed temporal unit into an AVIF box tree.
//!
//! [`Frame::from_obus`] sorts the OBUs of one encoded temporal unit into the
//! bytes that configure the decoder and the bytes that go into the media
//! data box. [`AvifBuilder`] then wraps a frame in the boxes of a single
//! image AVIF file.

use av1::seq::SequenceHeaderObu;
use av1::{AV1CodecConfigurationRecord, ObuStream, ObuType};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::boxes::{
    AssociationEntry, BaseOffset, ColourInformationBox, FileBox, FileTypeBox, FourCC, HandlerBox,
    ImageSpatialExtentsProperty, ItemInfoBox, ItemInfoEntry, ItemLocation, ItemLocationBox,
    ItemPropertiesBox, ItemProperty, ItemPropertyAssociation, ItemPropertyContainer,
    MediaDataBox, MetaBox, PixelAspectRatioBox, PixelInformationProperty, PrimaryItemBox,
    PropertyAssociation,
};
use crate::error::{AvifError, Result};

/// Item id of the one image item.
const PRIMARY_ITEM_ID: u16 = 1;

/// `colour_primaries`, `transfer_characteristics` and `matrix_coefficients`
/// value meaning "unspecified".
const UNSPECIFIED: u16 = 2;

/// Where the bytes of an OBU end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObuDestination {
    /// Not stored anywhere.
    Drop,
    /// Stored in the `av1C` property and in the media data.
    ConfigAndMedia,
    /// Stored in the media data only.
    Media,
}

/// Decides where an OBU of type `obu_type` goes.
pub const fn classify(obu_type: ObuType) -> ObuDestination {
    match obu_type {
        ObuType::TemporalDelimiter | ObuType::Padding | ObuType::Reserved(_) => {
            ObuDestination::Drop
        }
        ObuType::SequenceHeader => ObuDestination::ConfigAndMedia,
        ObuType::FrameHeader
        | ObuType::TileGroup
        | ObuType::Metadata
        | ObuType::Frame
        | ObuType::RedundantFrameHeader
        | ObuType::TileList => ObuDestination::Media,
    }
}

/// One encoded frame, split into configuration and media bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The decoded sequence header.
    pub sequence_header: SequenceHeaderObu,
    /// The sequence header OBU, as stored in `av1C`.
    pub config_obus: Bytes,
    /// Every OBU kept for the media data box, in stream order.
    pub mdat: Bytes,
}

impl Frame {
    /// Classifies the OBUs of `stream`.
    ///
    /// Only the first sequence header is used for configuration; any later
    /// one is kept in the media data like a frame OBU.
    pub fn from_obus(stream: &ObuStream) -> Result<Self> {
        let mut sequence_header = None;
        let mut config_obus = Bytes::new();
        let mut mdat = BytesMut::with_capacity(stream.buffer().len());

        for record in stream.records() {
            let obu_type = record.obu_type();
            let destination = classify(obu_type);
            trace!(?obu_type, begin = record.begin, len = record.len(), ?destination, "classified OBU");

            match destination {
                ObuDestination::Drop => continue,
                ObuDestination::ConfigAndMedia => match record.sequence_header() {
                    Some(seq) if sequence_header.is_none() => {
                        sequence_header = Some(seq.clone());
                        config_obus = stream.bytes_of(record);
                    }
                    _ => warn!(begin = record.begin, "ignoring extra sequence header"),
                },
                ObuDestination::Media => {}
            }

            mdat.extend_from_slice(&stream.buffer()[record.range()]);
        }

        let sequence_header = sequence_header.ok_or(AvifError::MissingSequenceHeader)?;
        Ok(Self {
            sequence_header,
            config_obus,
            mdat: mdat.freeze(),
        })
    }
}

/// Options that change which item properties get written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Write a `colr` property from the sequence header's color config.
    pub include_color_info: bool,
    /// Write a `pasp` property with this `(h_spacing, v_spacing)`.
    pub pixel_aspect_ratio: Option<(u32, u32)>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            include_color_info: true,
            pixel_aspect_ratio: None,
        }
    }
}

/// Builds the box tree of a single image AVIF file.
#[derive(Debug, Clone)]
pub struct AvifBuilder {
    width: u32,
    height: u32,
    options: BuildOptions,
    primary: Option<Frame>,
}

impl AvifBuilder {
    /// Creates a builder for an image of `width` by `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            options: BuildOptions::default(),
            primary: None,
        }
    }

    /// Replaces the build options.
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the frame stored as the primary item.
    pub fn set_primary_frame(&mut self, frame: Frame) -> &mut Self {
        self.primary = Some(frame);
        self
    }

    /// Builds the box tree. The item location stays pending until the file
    /// is assembled.
    pub fn build(&self) -> Result<FileBox> {
        let frame = self.primary.as_ref().ok_or(AvifError::MissingPrimaryFrame)?;
        let seq = &frame.sequence_header;
        let color = &seq.color_config;

        let mut container = ItemPropertyContainer::default();
        let mut associations = Vec::new();
        let mut associate = |property: ItemProperty, essential: bool| {
            let index = container.push(property);
            associations.push(PropertyAssociation { index, essential });
        };

        associate(
            ItemProperty::ImageSpatialExtents(ImageSpatialExtentsProperty {
                width: self.width,
                height: self.height,
            }),
            false,
        );
        associate(
            ItemProperty::PixelInformation(PixelInformationProperty {
                bits_per_channel: vec![color.bit_depth(); color.num_planes() as usize],
            }),
            false,
        );
        associate(
            ItemProperty::Av1Config(AV1CodecConfigurationRecord::from_sequence_header(
                seq,
                frame.config_obus.clone(),
            )),
            true,
        );
        if self.options.include_color_info {
            let (primaries, transfer, matrix) = color
                .color_description()
                .map(|(cp, tc, mc)| (u16::from(cp), u16::from(tc), u16::from(mc)))
                .unwrap_or((UNSPECIFIED, UNSPECIFIED, UNSPECIFIED));
            associate(
                ItemProperty::Colour(ColourInformationBox {
                    colour_primaries: primaries,
                    transfer_characteristics: transfer,
                    matrix_coefficients: matrix,
                    full_range: color.full_color_range,
                }),
                false,
            );
        }
        if let Some((h_spacing, v_spacing)) = self.options.pixel_aspect_ratio {
            associate(
                ItemProperty::PixelAspectRatio(PixelAspectRatioBox {
                    h_spacing,
                    v_spacing,
                }),
                false,
            );
        }

        let ftyp = FileTypeBox {
            major_brand: FourCC(*b"avif"),
            minor_version: 0,
            compatible_brands: compatible_brands(seq),
        };
        debug!(
            width = self.width,
            height = self.height,
            properties = container.properties.len(),
            mdat = frame.mdat.len(),
            "built AVIF box tree"
        );

        Ok(FileBox {
            ftyp,
            meta: MetaBox {
                hdlr: HandlerBox {
                    handler_type: FourCC(*b"pict"),
                    name: String::new(),
                },
                pitm: PrimaryItemBox {
                    item_id: PRIMARY_ITEM_ID,
                },
                iinf: ItemInfoBox {
                    entries: vec![ItemInfoEntry {
                        item_id: PRIMARY_ITEM_ID,
                        item_type: FourCC(*b"av01"),
                        name: "Color".into(),
                    }],
                },
                iloc: ItemLocationBox {
                    items: vec![ItemLocation {
                        item_id: PRIMARY_ITEM_ID,
                        base_offset: BaseOffset::Pending,
                        extent_length: frame.mdat.len() as u64,
                    }],
                },
                iprp: ItemPropertiesBox {
                    container,
                    associations: ItemPropertyAssociation {
                        entries: vec![AssociationEntry {
                            item_id: PRIMARY_ITEM_ID,
                            associations,
                        }],
                    },
                },
            },
            media_data: vec![MediaDataBox::new(frame.mdat.clone())],
        })
    }
}

/// `avif`, `mif1`, `miaf` and, when the stream fits one, an AV1 image profile brand.
fn compatible_brands(seq: &SequenceHeaderObu) -> Vec<FourCC> {
    let mut brands = vec![FourCC(*b"avif"), FourCC(*b"mif1"), FourCC(*b"miaf")];

    let level = seq.seq_level_idx_0();
    if seq.seq_profile == 0 && level <= 13 {
        // Baseline: level 5.1
        brands.push(FourCC(*b"MA1B"));
    } else if seq.seq_profile <= 1 && level <= 16 {
        // Advanced: level 6.0
        brands.push(FourCC(*b"MA1A"));
    }
    brands
}
