//! AVIF still image container assembly.
//!
//! Takes the output of an AV1 encoder, one temporal unit of OBUs, and wraps
//! it in the ISOBMFF boxes of a single image AVIF file:
//!
//! - [`Frame::from_obus`] splits the OBUs into configuration and media bytes
//! - [`AvifBuilder`] builds the [`FileBox`] tree
//! - [`assemble`] serializes it in two passes, resolving the `iloc` offsets
//! - [`dump::list_boxes`] lists the boxes of a serialized file
//!
//! [`encode_avif`] runs all of the above in one call.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod assemble;
pub mod boxes;
mod builder;
pub mod dump;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
#[allow(missing_docs)]
pub mod test_support;
mod writer;

pub use assemble::{AvifImage, assemble, encode_avif};
pub use boxes::{BaseOffset, FileBox, FourCC, IsoBox, MediaDataBox};
pub use builder::{AvifBuilder, BuildOptions, Frame, ObuDestination, classify};
pub use error::{AvifError, Result};
pub use writer::{BoxWriter, write};
