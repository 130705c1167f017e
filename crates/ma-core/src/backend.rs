use std::fmt::Debug;

use crate::dims::Dims;
use crate::error::{MatAddError, Result};

/// Trait for pluggable addition backends (host CPU, wgpu accelerator, etc.).
///
/// Every backend shares the same contract: `a`, `b` and `out` hold
/// `dims.len()` row-major `f32` values, and on success
/// `out[i] = a[i] + b[i]` for every cell. The call is synchronous; when it
/// returns, `out` is fully written and any backend-side resources used for
/// the call have been released.
pub trait AddBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu", "wgpu").
    fn name(&self) -> &str;

    /// Element-wise addition: `out[i] = a[i] + b[i]`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if any slice length differs from `dims.len()`,
    /// or a backend-specific error if the computation could not be run.
    fn add(&self, a: &[f32], b: &[f32], out: &mut [f32], dims: Dims) -> Result<()>;
}

/// Check that every operand holds exactly `dims.len()` elements.
pub(crate) fn check_operands(a: &[f32], b: &[f32], out: &[f32], dims: Dims) -> Result<()> {
    let n = dims.len();
    for (name, len) in [("a", a.len()), ("b", b.len()), ("out", out.len())] {
        if len != n {
            return Err(MatAddError::ShapeMismatch {
                expected: format!("{} elements ({})", n, dims),
                got: format!("{} elements in `{}`", len, name),
            });
        }
    }
    Ok(())
}
