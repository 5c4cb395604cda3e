//! Error types for AVIF container assembly.

use av1::Av1Error;
use thiserror::Error;

use crate::boxes::FourCC;

/// Errors that can occur while building and serializing an AVIF file.
#[derive(Error, Debug)]
pub enum AvifError {
    /// The AV1 input could not be parsed.
    #[error("AV1 parse error: {0}")]
    Parse(#[from] Av1Error),

    /// The temporal unit holds no sequence header OBU.
    #[error("no sequence header OBU in the AV1 input")]
    MissingSequenceHeader,

    /// The image has a zero width or height.
    #[error("invalid image size {width}x{height}")]
    InvalidDimensions {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// [`AvifBuilder::build`](crate::AvifBuilder::build) was called without a primary frame.
    #[error("no primary frame was set on the builder")]
    MissingPrimaryFrame,

    /// A box wrote a different number of bytes than its size field declares.
    #[error("box '{fourcc}' declared {declared} bytes but wrote {written}")]
    Layout {
        /// Type of the offending box.
        fourcc: FourCC,
        /// Size computed before writing.
        declared: u64,
        /// Bytes actually written.
        written: u64,
    },

    /// The discovery and final passes produced buffers of different lengths.
    #[error("final pass wrote {final_pass} bytes, discovery pass wrote {discovery}")]
    PassLengthMismatch {
        /// Length of the discovery pass output.
        discovery: usize,
        /// Length of the final pass output.
        final_pass: usize,
    },

    /// A media data box has not been written yet, so its offset is unknown.
    #[error("media data box {index} has no recorded offset")]
    UnresolvedOffset {
        /// Index of the media data box.
        index: usize,
    },

    /// The item location box and the media data boxes are not paired one to one.
    #[error("{items} item locations for {media} media data boxes")]
    ItemCountMismatch {
        /// Number of `iloc` entries.
        items: usize,
        /// Number of `mdat` boxes.
        media: usize,
    },

    /// A file offset does not fit in the 32-bit `iloc` base offset.
    #[error("offset {offset} does not fit in a 32-bit iloc field")]
    OffsetOverflow {
        /// The offending offset.
        offset: u64,
    },

    /// An extent length does not fit in the 32-bit `iloc` length field.
    #[error("extent length {length} does not fit in a 32-bit iloc field")]
    LengthOverflow {
        /// The offending length.
        length: u64,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AVIF operations.
pub type Result<T> = std::result::Result<T, AvifError>;
