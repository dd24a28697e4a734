use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use mkproj::{licenses, logging, Opts, ProjectConfig};

fn main() -> Result<ExitCode> {
    let opts = Opts::parse();
    let level = opts.effective_log_level();
    let progress = mkproj::progress_bar(level)?;
    logging::init(level, &progress);
    debug!(?opts, "command line");

    if opts.list_licenses {
        for (id, info) in licenses::catalog() {
            println!("{id:<20} {}", info.title);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = match ProjectConfig::build(&opts) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let summary = mkproj::bootstrap(&config, level, progress)?;
    summary.print(level);
    Ok(summary.exit_code())
}
