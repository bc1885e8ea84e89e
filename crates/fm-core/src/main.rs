//! fm-core binary entry point.

use clap::Parser;

use fm_core::cli::{self, Cli};
use fm_core::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet, cli.global.format);
    cli::run(cli).into()
}
