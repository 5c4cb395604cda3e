use std::path::{Path, PathBuf};

use avif::BuildOptions;
use tracing::debug;

use crate::cli::Args;
use crate::error::{AppError, Result};

/// Resolved settings for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub options: BuildOptions,
    pub show_result: bool,
    pub dump_boxes: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let pixel_aspect_ratio = args
            .pixel_aspect_ratio
            .as_deref()
            .map(parse_pixel_aspect_ratio)
            .transpose()?;

        let config = Self {
            input: args.input.clone(),
            output: args
                .output
                .clone()
                .unwrap_or_else(|| default_output(&args.input)),
            width: args.width,
            height: args.height,
            options: BuildOptions {
                include_color_info: !args.no_color_info,
                pixel_aspect_ratio,
            },
            show_result: args.show_result,
            dump_boxes: args.dump_boxes,
        };

        if config.output == config.input {
            return Err(AppError::InvalidInput(format!(
                "output would overwrite the input: {}",
                config.input.display()
            )));
        }

        debug!(?config, "resolved configuration");
        Ok(config)
    }
}

/// `frame.obu` -> `frame.avif`
fn default_output(input: &Path) -> PathBuf {
    input.with_extension("avif")
}

/// Parses `H:V` into `(h_spacing, v_spacing)`.
pub fn parse_pixel_aspect_ratio(value: &str) -> Result<(u32, u32)> {
    let invalid = || AppError::InvalidInput(format!("Invalid pixel aspect ratio: {value}"));

    let (h, v) = value.split_once(':').ok_or_else(invalid)?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    let v: u32 = v.trim().parse().map_err(|_| invalid())?;
    if h == 0 || v == 0 {
        return Err(invalid());
    }
    Ok((h, v))
}
