//! Logging setup for the command-line tool.

use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr subscriber.
///
/// `verbosity` maps 0=error, 1=warn, 2=info, 3=debug, 4+=trace. `RUST_LOG`
/// overrides it when set.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "treesum={level},treesum_core={level},treesum_scan={level},treesum_analyze={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3)
                .with_thread_names(verbosity >= 4)
                .with_file(verbosity >= 4)
                .with_line_number(verbosity >= 4),
        )
        .try_init()
        .map_err(|e| eyre!("unable to install logger: {e}"))
}
