//! AV1 bitstream parsing for still image encoding.
//!
//! Supports:
//! - OBU (Open Bitstream Unit) header parsing and writing
//! - Walking a low-overhead OBU stream into byte-exact records
//! - Sequence header OBU decoding
//! - AV1 Codec Configuration Record (`av1C`)
//! - Reading the first temporal unit of an IVF file
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

mod config;
pub mod error;
pub mod ivf;
mod obu;
pub mod parser;

pub use config::AV1CodecConfigurationRecord;
pub use error::{Av1Error, Result};
pub use obu::utils::{leb128_size, write_leb128};
pub use obu::{ObuExtensionHeader, ObuHeader, ObuType, seq};
pub use parser::{ObuContent, ObuRecord, ObuStream, parse_obus, write_obu};
