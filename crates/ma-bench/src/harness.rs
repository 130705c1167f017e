use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ma_core::{verify, AddBackend, CpuBackend, Matrix, VerifyReport, WgpuBackend, WgpuOptions};
use tracing::info;

use crate::config::{DeviceKind, RunConfig};

/// Wall-clock time spent in each phase of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub init: Duration,
    pub host_add: Duration,
    pub device_add: Duration,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: VerifyReport,
    pub timings: PhaseTimings,
}

/// Open the backend used for the accelerator phase.
pub fn open_device(config: &RunConfig) -> Result<Box<dyn AddBackend>> {
    match config.device {
        DeviceKind::Wgpu => {
            let options = WgpuOptions {
                force_fallback_adapter: config.fallback_adapter,
            };
            let backend = WgpuBackend::new(&options).context("failed to open accelerator")?;
            info!(adapter = backend.adapter_name(), "using wgpu accelerator");
            Ok(Box::new(backend))
        }
        DeviceKind::Cpu => Ok(Box::new(CpuBackend::new())),
    }
}

/// Run one benchmark: initialize A and B, add them on the host and on
/// `device`, print small results, and verify the two sums agree.
///
/// A verification mismatch is reported in the returned summary, not as an
/// error. Errors are reserved for failures that stop the run.
pub fn run(config: &RunConfig, device: &dyn AddBackend, out: &mut impl Write) -> Result<RunSummary> {
    let dims = config.dims;
    let mut timings = PhaseTimings::default();

    writeln!(
        out,
        "Adding {} matrices ({} cells) on host and {}.",
        dims,
        dims.len(),
        device.name()
    )?;

    let t0 = Instant::now();
    let a = Matrix::filled(dims, config.fill_a).context("failed to allocate A")?;
    let b = Matrix::filled(dims, config.fill_b).context("failed to allocate B")?;
    let mut check = Matrix::zeros(dims).context("failed to allocate host result")?;
    let mut c = Matrix::zeros(dims).context("failed to allocate device result")?;
    timings.init = t0.elapsed();
    writeln!(out, "Init took {:.6} seconds.", timings.init.as_secs_f64())?;

    let t0 = Instant::now();
    a.add_into(&b, &mut check, &CpuBackend::new())
        .context("host addition failed")?;
    timings.host_add = t0.elapsed();
    writeln!(
        out,
        "Host addition took {:.6} seconds.",
        timings.host_add.as_secs_f64()
    )?;

    let t0 = Instant::now();
    a.add_into(&b, &mut c, device)
        .with_context(|| format!("{} addition failed", device.name()))?;
    timings.device_add = t0.elapsed();
    writeln!(
        out,
        "Device addition ({}) took {:.6} seconds.",
        device.name(),
        timings.device_add.as_secs_f64()
    )?;

    if config.prints_grids() {
        writeln!(out, "\nHost result:")?;
        write!(out, "{}", check)?;
        writeln!(out, "\nDevice result:")?;
        write!(out, "{}", c)?;
    }

    let report = verify(&check, &c, config.tolerance).context("verification failed to run")?;
    writeln!(out, "\nVerification {}", report)?;

    Ok(RunSummary { report, timings })
}
