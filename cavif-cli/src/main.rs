use std::io;
use std::process;

use cavif::cli::Args;
use cavif::config::Config;
use cavif::error::Result;
use cavif::report::{box_tree, sequence_header_report};
use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::fmt::{self, MakeWriter, format::DefaultFields, format::Format};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(e) = run(&args) {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::from_args(args)?;
    let image = cavif::run(&config)?;

    if config.show_result {
        print!("{}", sequence_header_report(&image.sequence_header));
    }
    if config.dump_boxes {
        print!("{}", box_tree(&image.data));
    }
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = if args.quiet {
        EnvFilter::new("error")
    } else if args.verbose {
        EnvFilter::new("debug")
    } else if let Some(directives) = &args.log {
        EnvFilter::new(directives)
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(io::stderr))
        .init();
}

fn console_layer<S, W>(writer: W) -> fmt::Layer<S, DefaultFields, Format, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer().with_target(false).with_writer(writer)
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_layer_shows_levels() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::registry()
            .with(console_layer(move || writer.clone()).with_ansi(false));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("second sequence header kept in media data");
            tracing::info!("Encoding");
        });

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("WARN second sequence header kept in media data"), "{out}");
        assert!(out.contains("INFO Encoding"), "{out}");
    }
}
