use clap::ValueEnum;
use ma_core::{Dims, Result, DEFAULT_TOLERANCE};

use crate::cli::Cli;

/// Value written to every cell of matrix `A` unless overridden.
pub const DEFAULT_FILL_A: f32 = 3.0;
/// Value written to every cell of matrix `B` unless overridden.
pub const DEFAULT_FILL_B: f32 = 2.0;
/// Result grids are printed only when both extents are at most this.
pub const PRINT_LIMIT: usize = 6;

/// Execution target for the accelerator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceKind {
    /// wgpu compute on the best available adapter.
    Wgpu,
    /// The host backend, for machines without an accelerator.
    Cpu,
}

/// Fully resolved settings for one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub dims: Dims,
    pub fill_a: f32,
    pub fill_b: f32,
    /// Maximum absolute difference for host and device cells to agree.
    pub tolerance: f32,
    pub print_limit: usize,
    pub device: DeviceKind,
    /// Ask wgpu for its software adapter.
    pub fallback_adapter: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            dims: Dims::default(),
            fill_a: DEFAULT_FILL_A,
            fill_b: DEFAULT_FILL_B,
            tolerance: DEFAULT_TOLERANCE,
            print_limit: PRINT_LIMIT,
            device: DeviceKind::Wgpu,
            fallback_adapter: false,
        }
    }
}

impl RunConfig {
    /// Resolve a configuration from parsed arguments.
    ///
    /// Uses the default square dimensions unless both positional extents
    /// were given.
    pub fn from_cli(cli: &Cli) -> Result<RunConfig> {
        let dims = match (cli.dim_x, cli.dim_y) {
            (Some(dx), Some(dy)) => Dims::new(dx as usize, dy as usize)?,
            _ => Dims::default(),
        };
        Ok(RunConfig {
            dims,
            fill_a: cli.fill_a,
            fill_b: cli.fill_b,
            tolerance: cli.tolerance,
            print_limit: PRINT_LIMIT,
            device: cli.device,
            fallback_adapter: cli.fallback_adapter,
        })
    }

    /// True if the result grids should be dumped to the report.
    pub fn prints_grids(&self) -> bool {
        self.dims.fits_within(self.print_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(args: &[&str]) -> RunConfig {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        RunConfig::from_cli(&cli).unwrap()
    }

    #[test]
    fn test_defaults() {
        let c = config(&["matadd"]);
        assert_eq!(c, RunConfig::default());
        assert_eq!(c.dims, Dims::square(1024).unwrap());
        assert!(!c.prints_grids());
    }

    #[test]
    fn test_positional_dims() {
        let c = config(&["matadd", "4", "3"]);
        assert_eq!(c.dims.dx(), 4);
        assert_eq!(c.dims.dy(), 3);
        assert!(c.prints_grids());
    }

    #[test]
    fn test_print_threshold() {
        assert!(config(&["matadd", "6", "6"]).prints_grids());
        assert!(!config(&["matadd", "7", "6"]).prints_grids());
        assert!(!config(&["matadd", "6", "7"]).prints_grids());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            "matadd",
            "--fill-a",
            "-1.5",
            "--fill-b=4",
            "--tolerance",
            "0.01",
            "--device",
            "cpu",
            "--fallback-adapter",
        ]);
        assert_eq!(c.fill_a, -1.5);
        assert_eq!(c.fill_b, 4.0);
        assert_eq!(c.tolerance, 0.01);
        assert_eq!(c.device, DeviceKind::Cpu);
        assert!(c.fallback_adapter);
    }
}
