use color_eyre::eyre::{eyre, Result};
use tracing_error::ErrorLayer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, Registry};

use crate::args::Args;

/// Log to stderr; stdout belongs to the interactive course selection.
pub(crate) fn init(args: &Args) -> Result<()> {
    let level = args.verbosity.tracing_level_filter();
    let verbose = level >= LevelFilter::DEBUG;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_line_number(verbose);
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if verbose {
        fmt_layer.pretty().boxed()
    } else {
        fmt_layer.compact().boxed()
    };

    tracing_subscriber::registry()
        .with(
            fmt_layer.with_filter(
                // Use `-q` to only see errors, `-v` (debug) or `-vv` (trace) for more,
                // or use `RUST_LOG=target[span{field=value}]=level` for fine-grained verbosity control.
                // See https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(level.into())
                    .from_env_lossy(),
            ),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|_| eyre!("Tracing initialization failed"))?;

    Ok(())
}
