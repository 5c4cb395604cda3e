//! Error types for AV1 bitstream and container parsing.

use thiserror::Error;

/// Errors that can occur while parsing AV1 bitstreams and IVF files.
#[derive(Error, Debug)]
pub enum Av1Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The buffer ended inside an OBU header.
    #[error("truncated OBU header at offset {offset}")]
    TruncatedHeader {
        /// Offset of the OBU whose header is incomplete.
        offset: usize,
    },

    /// The buffer ended inside an OBU's leb128 size field.
    #[error("truncated OBU size field at offset {offset}")]
    TruncatedSize {
        /// Offset of the OBU whose size field is incomplete.
        offset: usize,
    },

    /// The declared OBU size runs past the end of the buffer.
    #[error("OBU at offset {offset} declares {declared} payload bytes, only {available} available")]
    ObuOverrun {
        /// Offset of the offending OBU.
        offset: usize,
        /// Payload size declared by `obu_size`.
        declared: u64,
        /// Bytes remaining after the OBU header.
        available: usize,
    },

    /// Invalid OBU data.
    #[error("invalid OBU: {0}")]
    InvalidObu(String),

    /// The sequence header payload does not follow the AV1 bit layout.
    #[error("invalid sequence header at offset {offset}: {reason}")]
    InvalidSequenceHeader {
        /// Offset of the sequence header OBU.
        offset: usize,
        /// Human-readable cause.
        reason: String,
    },

    /// LEB128 value overflow.
    #[error("LEB128 overflow: value exceeds maximum")]
    Leb128Overflow,

    /// Unexpected end of data.
    #[error("unexpected end of data: expected {expected} bytes, got {actual}")]
    UnexpectedEof {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes available.
        actual: usize,
    },

    /// Invalid IVF file signature (expected `"DKIF"`).
    #[error("invalid IVF signature: expected \"DKIF\", got {0:?}")]
    InvalidIvfSignature([u8; 4]),

    /// Invalid IVF codec FourCC (expected `"AV01"` or `"av01"`).
    #[error("invalid IVF codec: expected \"AV01\" or \"av01\", got {0:?}")]
    InvalidIvfCodec([u8; 4]),

    /// Unsupported IVF version.
    #[error("unsupported IVF version: {0}")]
    UnsupportedIvfVersion(u16),

    /// Invalid IVF timebase (zero numerator or denominator).
    #[error("invalid IVF timebase: {numerator}/{denominator}")]
    InvalidIvfTimebase {
        /// Timebase numerator.
        numerator: u32,
        /// Timebase denominator.
        denominator: u32,
    },

    /// The IVF file has a valid header but no frames.
    #[error("IVF file contains no frames")]
    NoIvfFrames,
}

/// Result type alias for AV1 parsing operations.
pub type Result<T> = std::result::Result<T, Av1Error>;
