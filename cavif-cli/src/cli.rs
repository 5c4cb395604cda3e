use std::path::PathBuf;

use clap::Parser;

/// Wrap an AV1 still image bitstream in an AVIF container.
///
/// The input is the raw output of an AV1 encoder: either a low-overhead OBU
/// stream holding one temporal unit, or an IVF file whose first frame is used.
#[derive(Parser, Debug, Clone)]
#[command(name = "cavif", version, about, long_about)]
pub struct Args {
    /// AV1 input: an `.obu` temporal unit or an IVF file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file [default: the input path with an `.avif` extension]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Image width in pixels [default: from the IVF header, else the sequence header]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Image height in pixels [default: from the IVF header, else the sequence header]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Do not write a `colr` property
    #[arg(long)]
    pub no_color_info: bool,

    /// Write a `pasp` property, given as `H:V`
    #[arg(long, value_name = "H:V")]
    pub pixel_aspect_ratio: Option<String>,

    /// Print the decoded sequence header after writing
    #[arg(long)]
    pub show_result: bool,

    /// Print the box tree of the written file
    #[arg(long)]
    pub dump_boxes: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log filter directives, `RUST_LOG` syntax
    #[arg(long, env = "CAVIF_LOG", hide_env_values = true)]
    pub log: Option<String>,
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "cavif",
            "frame.ivf",
            "-o",
            "out.avif",
            "--width",
            "64",
            "--no-color-info",
            "--pixel-aspect-ratio",
            "4:3",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("frame.ivf"));
        assert_eq!(args.output, Some(PathBuf::from("out.avif")));
        assert_eq!(args.width, Some(64));
        assert_eq!(args.height, None);
        assert!(args.no_color_info);
        assert_eq!(args.pixel_aspect_ratio.as_deref(), Some("4:3"));
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(Args::try_parse_from(["cavif", "frame.obu", "--width", "0"]).is_err());
        assert!(Args::try_parse_from(["cavif", "frame.obu", "-v", "-q"]).is_err());
    }
}
