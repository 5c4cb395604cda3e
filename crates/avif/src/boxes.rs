//! In-memory model of the ISOBMFF boxes that make up a single-image AVIF file.
//!
//! Every box knows its own encoded size, computed bottom-up from its
//! children, and how to write its body. Headers are written by
//! [`BoxWriter::write_box`], which also checks that the body matched the size
//! that was announced for it.
//!
//! None of the sizes depend on the value of an `iloc` base offset, which is
//! what lets [`assemble`](crate::assemble) patch offsets between two passes.

use std::fmt;

use av1::AV1CodecConfigurationRecord;
use bytes::Bytes;

use crate::error::{AvifError, Result};
use crate::writer::BoxWriter;

/// Size of a box header with a 32-bit size field.
pub const BASIC_HEADER_SIZE: u64 = 8;
/// Size of a box header with a 64-bit `largesize` field.
pub const LARGE_HEADER_SIZE: u64 = 16;
/// Size of the version and flags that open a full box body.
const FULL_BOX_EXTRA: u64 = 4;

/// A four character code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Version and flags of a full box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullBoxHeader {
    /// `version`
    pub version: u8,
    /// `flags`, 24 bits
    pub flags: u32,
}

/// Returns the header length needed for a box whose body is `content_size` bytes.
pub const fn header_size_for(content_size: u64) -> u64 {
    if content_size + BASIC_HEADER_SIZE > u32::MAX as u64 {
        LARGE_HEADER_SIZE
    } else {
        BASIC_HEADER_SIZE
    }
}

/// A serializable ISOBMFF box.
pub trait IsoBox {
    /// The box type.
    fn fourcc(&self) -> FourCC;

    /// Version and flags, for full boxes.
    fn full_box_header(&self) -> Option<FullBoxHeader> {
        None
    }

    /// Size of the body, excluding the header and full box fields.
    fn body_size(&self) -> u64;

    /// Writes the body, excluding the header and full box fields.
    fn write_body(&self, writer: &mut BoxWriter) -> Result<()>;

    /// Total encoded size of the box.
    fn size(&self) -> u64 {
        let content = self.full_box_header().map_or(0, |_| FULL_BOX_EXTRA) + self.body_size();
        header_size_for(content) + content
    }
}

/// `ftyp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeBox {
    /// `major_brand`
    pub major_brand: FourCC,
    /// `minor_version`
    pub minor_version: u32,
    /// `compatible_brands`
    pub compatible_brands: Vec<FourCC>,
}

impl IsoBox for FileTypeBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"ftyp")
    }

    fn body_size(&self) -> u64 {
        4 + 4 + 4 * self.compatible_brands.len() as u64
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_fourcc(self.major_brand);
        writer.put_u32(self.minor_version);
        for brand in &self.compatible_brands {
            writer.put_fourcc(*brand);
        }
        Ok(())
    }
}

/// `meta`
///
/// Children are written in the order `hdlr`, `pitm`, `iinf`, `iloc`, `iprp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaBox {
    /// `hdlr`
    pub hdlr: HandlerBox,
    /// `pitm`
    pub pitm: PrimaryItemBox,
    /// `iinf`
    pub iinf: ItemInfoBox,
    /// `iloc`
    pub iloc: ItemLocationBox,
    /// `iprp`
    pub iprp: ItemPropertiesBox,
}

impl IsoBox for MetaBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"meta")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        self.hdlr.size() + self.pitm.size() + self.iinf.size() + self.iloc.size() + self.iprp.size()
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.write_box(&self.hdlr)?;
        writer.write_box(&self.pitm)?;
        writer.write_box(&self.iinf)?;
        writer.write_box(&self.iloc)?;
        writer.write_box(&self.iprp)
    }
}

/// `hdlr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerBox {
    /// `handler_type`, `pict` for image items
    pub handler_type: FourCC,
    /// `name`, written null-terminated
    pub name: String,
}

impl IsoBox for HandlerBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"hdlr")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        4 // pre_defined
        + 4 // handler_type
        + 12 // reserved
        + self.name.len() as u64 + 1
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u32(0); // pre_defined
        writer.put_fourcc(self.handler_type);
        writer.put_zeros(12); // reserved
        writer.put_cstr(&self.name);
        Ok(())
    }
}

/// `pitm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryItemBox {
    /// `item_ID`
    pub item_id: u16,
}

impl IsoBox for PrimaryItemBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"pitm")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        2
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u16(self.item_id);
        Ok(())
    }
}

/// `iinf`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfoBox {
    /// One `infe` per item.
    pub entries: Vec<ItemInfoEntry>,
}

impl IsoBox for ItemInfoBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"iinf")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        2 + self.entries.iter().map(IsoBox::size).sum::<u64>()
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u16(self.entries.len() as u16);
        for entry in &self.entries {
            writer.write_box(entry)?;
        }
        Ok(())
    }
}

/// `infe`, version 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfoEntry {
    /// `item_ID`
    pub item_id: u16,
    /// `item_type`
    pub item_type: FourCC,
    /// `item_name`, written null-terminated
    pub name: String,
}

impl IsoBox for ItemInfoEntry {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"infe")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader {
            version: 2,
            flags: 0,
        })
    }

    fn body_size(&self) -> u64 {
        2 // item_ID
        + 2 // item_protection_index
        + 4 // item_type
        + self.name.len() as u64 + 1
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u16(self.item_id);
        writer.put_u16(0); // item_protection_index
        writer.put_fourcc(self.item_type);
        writer.put_cstr(&self.name);
        Ok(())
    }
}

/// Where an item's data starts in the file.
///
/// The offset is only known once the boxes in front of the media data have
/// been laid out, so items start out [`Pending`](BaseOffset::Pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseOffset {
    /// Not resolved yet; serialized as zero.
    #[default]
    Pending,
    /// Absolute file offset of the item data.
    Resolved(u64),
}

impl BaseOffset {
    /// Returns the value to serialize.
    pub const fn value(&self) -> u64 {
        match self {
            BaseOffset::Pending => 0,
            BaseOffset::Resolved(offset) => *offset,
        }
    }

    /// Returns `true` once the offset has been resolved.
    pub const fn is_resolved(&self) -> bool {
        matches!(self, BaseOffset::Resolved(_))
    }
}

/// One `iloc` entry with a single extent covering the whole item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation {
    /// `item_ID`
    pub item_id: u16,
    /// `base_offset`
    pub base_offset: BaseOffset,
    /// `extent_length`; the extent offset is always 0.
    pub extent_length: u64,
}

/// `iloc`, version 0
///
/// `offset_size`, `length_size` and `base_offset_size` are all 4, so the box
/// has the same length whatever offsets it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLocationBox {
    /// Item entries, paired by index with the file's media data boxes.
    pub items: Vec<ItemLocation>,
}

impl ItemLocationBox {
    const FIELD_SIZE: u8 = 4;
}

impl IsoBox for ItemLocationBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"iloc")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        1 // offset_size, length_size
        + 1 // base_offset_size, reserved
        + 2 // item_count
        + self.items.len() as u64 * (
            2 // item_ID
            + 2 // data_reference_index
            + Self::FIELD_SIZE as u64 // base_offset
            + 2 // extent_count
            + 2 * Self::FIELD_SIZE as u64 // extent_offset, extent_length
        )
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u8(Self::FIELD_SIZE << 4 | Self::FIELD_SIZE);
        writer.put_u8(Self::FIELD_SIZE << 4);
        writer.put_u16(self.items.len() as u16);

        for item in &self.items {
            let offset = item.base_offset.value();
            let base_offset =
                u32::try_from(offset).map_err(|_| AvifError::OffsetOverflow { offset })?;
            let length = item.extent_length;
            let extent_length =
                u32::try_from(length).map_err(|_| AvifError::LengthOverflow { length })?;

            writer.put_u16(item.item_id);
            writer.put_u16(0); // data_reference_index, this file
            writer.put_u32(base_offset);
            writer.put_u16(1); // extent_count
            writer.put_u32(0); // extent_offset
            writer.put_u32(extent_length);
        }
        Ok(())
    }
}

/// `iprp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPropertiesBox {
    /// `ipco`
    pub container: ItemPropertyContainer,
    /// `ipma`
    pub associations: ItemPropertyAssociation,
}

impl IsoBox for ItemPropertiesBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"iprp")
    }

    fn body_size(&self) -> u64 {
        self.container.size() + self.associations.size()
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.write_box(&self.container)?;
        writer.write_box(&self.associations)
    }
}

/// `ipco`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemPropertyContainer {
    /// Properties, referenced from `ipma` by 1-based index.
    pub properties: Vec<ItemProperty>,
}

impl ItemPropertyContainer {
    /// Appends a property and returns its 1-based index.
    pub fn push(&mut self, property: ItemProperty) -> u8 {
        self.properties.push(property);
        self.properties.len() as u8
    }
}

impl IsoBox for ItemPropertyContainer {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"ipco")
    }

    fn body_size(&self) -> u64 {
        self.properties.iter().map(IsoBox::size).sum()
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        for property in &self.properties {
            writer.write_box(property)?;
        }
        Ok(())
    }
}

/// An item property stored in `ipco`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemProperty {
    /// `ispe`
    ImageSpatialExtents(ImageSpatialExtentsProperty),
    /// `pixi`
    PixelInformation(PixelInformationProperty),
    /// `av1C`
    Av1Config(AV1CodecConfigurationRecord),
    /// `colr` with `nclx` colour type
    Colour(ColourInformationBox),
    /// `pasp`
    PixelAspectRatio(PixelAspectRatioBox),
}

impl IsoBox for ItemProperty {
    fn fourcc(&self) -> FourCC {
        match self {
            ItemProperty::ImageSpatialExtents(p) => p.fourcc(),
            ItemProperty::PixelInformation(p) => p.fourcc(),
            ItemProperty::Av1Config(_) => FourCC(*b"av1C"),
            ItemProperty::Colour(p) => p.fourcc(),
            ItemProperty::PixelAspectRatio(p) => p.fourcc(),
        }
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        match self {
            ItemProperty::ImageSpatialExtents(p) => p.full_box_header(),
            ItemProperty::PixelInformation(p) => p.full_box_header(),
            ItemProperty::Av1Config(_) => None,
            ItemProperty::Colour(p) => p.full_box_header(),
            ItemProperty::PixelAspectRatio(p) => p.full_box_header(),
        }
    }

    fn body_size(&self) -> u64 {
        match self {
            ItemProperty::ImageSpatialExtents(p) => p.body_size(),
            ItemProperty::PixelInformation(p) => p.body_size(),
            ItemProperty::Av1Config(record) => record.size(),
            ItemProperty::Colour(p) => p.body_size(),
            ItemProperty::PixelAspectRatio(p) => p.body_size(),
        }
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        match self {
            ItemProperty::ImageSpatialExtents(p) => p.write_body(writer),
            ItemProperty::PixelInformation(p) => p.write_body(writer),
            ItemProperty::Av1Config(record) => Ok(record.mux(writer)?),
            ItemProperty::Colour(p) => p.write_body(writer),
            ItemProperty::PixelAspectRatio(p) => p.write_body(writer),
        }
    }
}

/// `ispe`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpatialExtentsProperty {
    /// `image_width`
    pub width: u32,
    /// `image_height`
    pub height: u32,
}

impl IsoBox for ImageSpatialExtentsProperty {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"ispe")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        8
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u32(self.width);
        writer.put_u32(self.height);
        Ok(())
    }
}

/// `pixi`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelInformationProperty {
    /// `bits_per_channel` for each channel
    pub bits_per_channel: Vec<u8>,
}

impl IsoBox for PixelInformationProperty {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"pixi")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        1 + self.bits_per_channel.len() as u64
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u8(self.bits_per_channel.len() as u8);
        for &bits in &self.bits_per_channel {
            writer.put_u8(bits);
        }
        Ok(())
    }
}

/// `colr` carrying an `nclx` colour description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColourInformationBox {
    /// `colour_primaries`
    pub colour_primaries: u16,
    /// `transfer_characteristics`
    pub transfer_characteristics: u16,
    /// `matrix_coefficients`
    pub matrix_coefficients: u16,
    /// `full_range_flag`
    pub full_range: bool,
}

impl IsoBox for ColourInformationBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"colr")
    }

    fn body_size(&self) -> u64 {
        4 + 2 + 2 + 2 + 1
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_fourcc(FourCC(*b"nclx"));
        writer.put_u16(self.colour_primaries);
        writer.put_u16(self.transfer_characteristics);
        writer.put_u16(self.matrix_coefficients);
        writer.put_u8(if self.full_range { 0x80 } else { 0 });
        Ok(())
    }
}

/// `pasp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelAspectRatioBox {
    /// `hSpacing`
    pub h_spacing: u32,
    /// `vSpacing`
    pub v_spacing: u32,
}

impl IsoBox for PixelAspectRatioBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"pasp")
    }

    fn body_size(&self) -> u64 {
        8
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u32(self.h_spacing);
        writer.put_u32(self.v_spacing);
        Ok(())
    }
}

/// One property reference inside an `ipma` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyAssociation {
    /// 1-based index into `ipco`, 7 bits
    pub index: u8,
    /// `essential`
    pub essential: bool,
}

/// The properties associated with one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationEntry {
    /// `item_ID`
    pub item_id: u16,
    /// Property references in `ipco` order.
    pub associations: Vec<PropertyAssociation>,
}

/// `ipma`, version 0 with 7-bit property indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemPropertyAssociation {
    /// One entry per item.
    pub entries: Vec<AssociationEntry>,
}

impl IsoBox for ItemPropertyAssociation {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"ipma")
    }

    fn full_box_header(&self) -> Option<FullBoxHeader> {
        Some(FullBoxHeader::default())
    }

    fn body_size(&self) -> u64 {
        4 + self
            .entries
            .iter()
            .map(|entry| 2 + 1 + entry.associations.len() as u64)
            .sum::<u64>()
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_u32(self.entries.len() as u32);
        for entry in &self.entries {
            writer.put_u16(entry.item_id);
            writer.put_u8(entry.associations.len() as u8);
            for association in &entry.associations {
                let essential = if association.essential { 0x80 } else { 0 };
                writer.put_u8(essential | (association.index & 0x7f));
            }
        }
        Ok(())
    }
}

/// `mdat`
///
/// The serializer writes a zero-filled placeholder of `data.len()` bytes and
/// records in `offset` where it starts; the payload itself is copied in by
/// [`assemble`](crate::assemble).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDataBox {
    /// Payload: configuration OBUs followed by frame OBUs.
    pub data: Bytes,
    /// File offset of the payload, set while the box is written.
    pub offset: Option<u64>,
}

impl MediaDataBox {
    /// Creates a box whose offset is not known yet.
    pub const fn new(data: Bytes) -> Self {
        Self { data, offset: None }
    }

    /// Returns the size of the box header.
    pub fn header_size(&self) -> u64 {
        self.size() - self.body_size()
    }
}

impl IsoBox for MediaDataBox {
    fn fourcc(&self) -> FourCC {
        FourCC(*b"mdat")
    }

    fn body_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn write_body(&self, writer: &mut BoxWriter) -> Result<()> {
        writer.put_zeros(self.data.len());
        Ok(())
    }
}

/// A whole AVIF file: `ftyp`, `meta` and the media data boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBox {
    /// `ftyp`
    pub ftyp: FileTypeBox,
    /// `meta`
    pub meta: MetaBox,
    /// `mdat` boxes, paired by index with `meta.iloc.items`.
    pub media_data: Vec<MediaDataBox>,
}

impl FileBox {
    /// Total encoded size of the file.
    pub fn size(&self) -> u64 {
        self.ftyp.size()
            + self.meta.size()
            + self.media_data.iter().map(IsoBox::size).sum::<u64>()
    }

    /// Copies each media data box's recorded offset into its `iloc` entry.
    ///
    /// Fails without touching `iloc` if the boxes are not paired one to one or
    /// a media data box has not been written yet.
    pub fn resolve_item_locations(&mut self) -> Result<()> {
        let items = &mut self.meta.iloc.items;
        if items.len() != self.media_data.len() {
            return Err(AvifError::ItemCountMismatch {
                items: items.len(),
                media: self.media_data.len(),
            });
        }

        let offsets = self
            .media_data
            .iter()
            .enumerate()
            .map(|(index, mdat)| mdat.offset.ok_or(AvifError::UnresolvedOffset { index }))
            .collect::<Result<Vec<_>>>()?;

        for (item, offset) in items.iter_mut().zip(offsets) {
            item.base_offset = BaseOffset::Resolved(offset);
        }
        Ok(())
    }
}
