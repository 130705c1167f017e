//! `matadd` - time element-wise matrix addition on the host and on an
//! accelerator, then verify both results agree.

mod cli;
mod config;
mod harness;

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, Level};

use cli::Cli;
use config::RunConfig;

/// Exit status when the run completed but host and device results disagree.
const EXIT_MISMATCH: u8 = 3;

fn main() -> ExitCode {
    // Usage errors exit here with status 2, before anything is allocated.
    let cli = Cli::parse();
    init_tracing(&cli);

    match try_main(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_MISMATCH),
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether verification passed.
fn try_main(cli: &Cli) -> Result<bool> {
    let config = RunConfig::from_cli(cli)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let t0 = Instant::now();
    let device = harness::open_device(&config)?;
    writeln!(
        out,
        "Device setup ({}) took {:.6} seconds.",
        device.name(),
        t0.elapsed().as_secs_f64()
    )?;

    let summary = harness::run(&config, device.as_ref(), &mut out)?;
    out.flush()?;
    debug!(
        init = ?summary.timings.init,
        host_add = ?summary.timings.host_add,
        device_add = ?summary.timings.device_add,
        "phase timings"
    );
    Ok(summary.report.passed())
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .try_init();
}
