//! Bit-level and zero-copy byte helpers shared by the codec crates.
//!
//! - [`BitReader`] reads MSB-first bit fields from any [`std::io::Read`].
//! - [`BitWriter`] writes MSB-first bit fields into any [`std::io::Write`].
//! - [`BytesCursorExt`] slices [`bytes::Bytes`] out of an `io::Cursor<Bytes>` without copying.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

mod bit_read;
mod bit_write;
mod cursor;

pub use bit_read::BitReader;
pub use bit_write::BitWriter;
pub use cursor::BytesCursorExt;
