//! `ma-core` - Matrix addition on interchangeable host and accelerator backends.
//!
//! This crate provides:
//! - A row-major `Matrix` type with validated `Dims`
//! - An `AddBackend` trait shared by every execution target
//! - A reference `CpuBackend` implementation
//! - A `WgpuBackend` accelerator implementation (feature `wgpu`)
//! - Tolerance-based result verification

pub mod backend;
pub mod cpu;
pub mod dims;
pub mod error;
#[cfg(feature = "wgpu")]
pub mod gpu;
pub mod matrix;
pub mod verify;

// Re-export primary types at the crate root for convenience.
pub use backend::AddBackend;
pub use cpu::CpuBackend;
pub use dims::{Dims, DEFAULT_DIM};
pub use error::{MatAddError, Result};
#[cfg(feature = "wgpu")]
pub use gpu::{WgpuBackend, WgpuOptions};
pub use matrix::Matrix;
pub use verify::{verify, Mismatch, VerifyReport, DEFAULT_TOLERANCE};
