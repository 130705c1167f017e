use clap::Parser;

use crate::config::{DeviceKind, DEFAULT_FILL_A, DEFAULT_FILL_B};
use ma_core::DEFAULT_TOLERANCE;

/// Add two constant-filled matrices on the host and on an accelerator, then
/// check that both results agree.
#[derive(Parser, Debug)]
#[command(name = "matadd", version)]
#[command(override_usage = "matadd [OPTIONS] [DIM_X DIM_Y]")]
pub struct Cli {
    /// Matrix width (columns); must be given together with DIM_Y
    #[arg(
        value_name = "DIM_X",
        requires = "dim_y",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub dim_x: Option<u32>,

    /// Matrix height (rows)
    #[arg(value_name = "DIM_Y", value_parser = clap::value_parser!(u32).range(1..))]
    pub dim_y: Option<u32>,

    /// Value for every cell of A
    #[arg(long, default_value_t = DEFAULT_FILL_A, allow_negative_numbers = true)]
    pub fill_a: f32,

    /// Value for every cell of B
    #[arg(long, default_value_t = DEFAULT_FILL_B, allow_negative_numbers = true)]
    pub fill_b: f32,

    /// Maximum absolute difference between host and device cells
    #[arg(long, default_value_t = DEFAULT_TOLERANCE, value_parser = parse_tolerance)]
    pub tolerance: f32,

    /// Where to run the accelerator phase
    #[arg(long, value_enum, default_value_t = DeviceKind::Wgpu)]
    pub device: DeviceKind,

    /// Use wgpu's software fallback adapter
    #[arg(long)]
    pub fallback_adapter: bool,

    /// Log debug detail (adapter, buffer sizes, dispatch grid) to stderr
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_tolerance(s: &str) -> Result<f32, String> {
    let tol: f32 = s.parse().map_err(|e| format!("{}", e))?;
    if !tol.is_finite() || tol < 0.0 {
        return Err(format!("tolerance must be finite and non-negative, got {}", s));
    }
    Ok(tol)
}
