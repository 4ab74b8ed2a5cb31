use std::process::ExitCode;

use ak_migrate::args::Args;
use clap::Parser;
use tracing::{Level, error};

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.quiet { Level::ERROR } else { args.log_level };
    tracing_subscriber::fmt().with_max_level(level).init();
    if let Err(err) = ak_migrate::run(args) {
        error!("{err:#}");
        return ExitCode::FAILURE;
    }
    return ExitCode::SUCCESS;
}
