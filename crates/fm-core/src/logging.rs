//! Tracing subscriber setup for the CLI.
//!
//! Logs always go to stderr so stdout stays clean for tables and JSON
//! reports. `RUST_LOG` overrides the level chosen from `-v`/`-q`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fm_common::OutputFormat;

/// Default filter directive for a verbosity count.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. JSON output mode gets JSON log lines.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(verbose: u8, quiet: bool, format: OutputFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet)));
    let registry = tracing_subscriber::registry().with(filter);
    let _ = match format {
        OutputFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        OutputFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
}
