//! Library target for the `cavif` package.
//!
//! The primary deliverable of this package is the `cavif` CLI binary
//! (`src/main.rs`). The conversion itself lives here so it can be tested
//! without spawning the binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod report;

use std::time::Instant;

use avif::{AvifImage, encode_avif};
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::input::Input;

/// Wraps an already loaded temporal unit.
///
/// Explicit sizes win over the container's, which win over the sequence
/// header's maximum frame size.
pub fn convert(config: &Config, input: &Input) -> Result<AvifImage> {
    let (container_width, container_height) = input.dimensions.unzip();
    let image = encode_avif(
        config.width.or(container_width),
        config.height.or(container_height),
        input.temporal_unit.clone(),
        &config.options,
    )?;
    Ok(image)
}

/// Reads the input, converts it and writes the output file.
pub fn run(config: &Config) -> Result<AvifImage> {
    let start = Instant::now();
    info!(
        "Encoding: {} -> {}",
        config.input.display(),
        config.output.display()
    );

    let input = Input::load(&config.input)?;
    let image = convert(config, &input)?;

    std::fs::write(&config.output, &image.data).map_err(|source| AppError::WriteOutput {
        path: config.output.clone(),
        source,
    })?;

    info!(
        "Encoded: {} -> {} ({}x{}, {} bytes) in {:.2} [sec]",
        config.input.display(),
        config.output.display(),
        image.width,
        image.height,
        image.data.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(image)
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use std::path::PathBuf;

    use av1::ObuType;
    use avif::BuildOptions;
    use avif::dump::{find_box, list_boxes};
    use avif::test_support::{still_picture_sequence_header, temporal_unit};
    use bytes::Bytes;

    use super::*;

    fn config(input: PathBuf, output: PathBuf) -> Config {
        Config {
            input,
            output,
            width: None,
            height: None,
            options: BuildOptions::default(),
            show_result: false,
            dump_boxes: false,
        }
    }

    fn still_frame(width: u32, height: u32) -> Bytes {
        temporal_unit(&[
            (ObuType::TemporalDelimiter, &[]),
            (ObuType::SequenceHeader, &still_picture_sequence_header(width, height)),
            (ObuType::Frame, &[0x33; 40]),
        ])
    }

    fn ispe_of(data: &[u8]) -> (u32, u32) {
        let ispe = find_box(&list_boxes(data), b"ispe").unwrap();
        let body = &data[ispe.body_start() + 4..ispe.end()];
        (
            u32::from_be_bytes(body[..4].try_into().unwrap()),
            u32::from_be_bytes(body[4..].try_into().unwrap()),
        )
    }

    #[test]
    fn test_run_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.obu");
        let output = dir.path().join("frame.avif");
        std::fs::write(&input, still_frame(100, 50)).unwrap();

        let image = run(&config(input, output.clone())).unwrap();
        let written = std::fs::read(&output).unwrap();
        assert_eq!(written, image.data.as_ref());
        assert_eq!((image.width, image.height), (100, 50));
        assert_eq!(ispe_of(&written), (100, 50));
        assert_eq!(&written[4..8], b"ftyp");
    }

    #[test]
    fn test_dimension_overrides() {
        let input = Input {
            temporal_unit: still_frame(100, 50),
            dimensions: Some((90, 45)),
        };
        let mut config = config(PathBuf::from("in.ivf"), PathBuf::from("out.avif"));

        let image = convert(&config, &input).unwrap();
        assert_eq!((image.width, image.height), (90, 45));

        config.width = Some(32);
        let image = convert(&config, &input).unwrap();
        assert_eq!((image.width, image.height), (32, 45));
        assert_eq!(ispe_of(&image.data), (32, 45));
    }

    #[test]
    fn test_missing_sequence_header() {
        let input = Input {
            temporal_unit: temporal_unit(&[(ObuType::Frame, &[1; 8])]),
            dimensions: None,
        };
        let config = config(PathBuf::from("in.obu"), PathBuf::from("out.avif"));
        let err = convert(&config, &input).unwrap_err();
        assert!(
            matches!(err, AppError::Avif(avif::AvifError::MissingSequenceHeader)),
            "{err:?}"
        );
    }

    #[test]
    fn test_zero_container_size() {
        let input = Input {
            temporal_unit: still_frame(100, 50),
            dimensions: Some((0, 50)),
        };
        let config = config(PathBuf::from("in.ivf"), PathBuf::from("out.avif"));
        let err = convert(&config, &input).unwrap_err();
        assert!(
            matches!(
                err,
                AppError::Avif(avif::AvifError::InvalidDimensions { width: 0, height: 50 })
            ),
            "{err:?}"
        );
    }

    #[test]
    fn test_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.obu");
        std::fs::write(&input, still_frame(8, 8)).unwrap();

        let output = dir.path().join("missing").join("frame.avif");
        let err = run(&config(input, output)).unwrap_err();
        assert!(matches!(err, AppError::WriteOutput { .. }), "{err:?}");
    }
}
