use std::fmt;

use crate::dims::Dims;
use crate::error::Result;
use crate::matrix::{ensure_same_dims, Matrix};

/// Tolerance used when none is configured.
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// A single cell where the two matrices disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub expected: f32,
    pub actual: f32,
}

/// Outcome of comparing two matrices cell by cell.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub dims: Dims,
    pub tolerance: f32,
    /// Number of cells whose absolute difference exceeds the tolerance.
    pub mismatches: usize,
    /// First disagreeing cell in row-major order.
    pub first_mismatch: Option<Mismatch>,
    /// Largest finite absolute difference observed.
    pub max_abs_diff: f32,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(
                f,
                "PASSED: all {} cells agree within {:e} (max |diff| {:e})",
                self.dims.len(),
                self.tolerance,
                self.max_abs_diff
            );
        }
        write!(
            f,
            "FAILED: {} of {} cells differ by more than {:e} (max |diff| {:e})",
            self.mismatches,
            self.dims.len(),
            self.tolerance,
            self.max_abs_diff
        )?;
        if let Some(m) = self.first_mismatch {
            write!(
                f,
                "; first at ({}, {}): expected {}, got {}",
                m.row, m.col, m.expected, m.actual
            )?;
        }
        Ok(())
    }
}

/// Compare `expected` against `actual` cell by cell.
///
/// Two cells match when they are equal or `|expected - actual| <= tolerance`.
/// NaN never matches anything.
///
/// # Errors
/// Returns `ShapeMismatch` if the matrices have different dimensions.
pub fn verify(expected: &Matrix, actual: &Matrix, tolerance: f32) -> Result<VerifyReport> {
    ensure_same_dims(expected.dims(), actual.dims())?;
    let dims = expected.dims();

    let mut mismatches = 0usize;
    let mut first_mismatch = None;
    let mut max_abs_diff = 0.0f32;

    for (i, (&e, &a)) in expected
        .as_slice()
        .iter()
        .zip(actual.as_slice())
        .enumerate()
    {
        // Equal infinities agree even though their difference is NaN.
        if e == a {
            continue;
        }
        let diff = (e - a).abs();
        if diff.is_finite() {
            max_abs_diff = max_abs_diff.max(diff);
        }
        // Negated so NaN differences count as mismatches.
        if !(diff <= tolerance) {
            mismatches += 1;
            if first_mismatch.is_none() {
                let (row, col) = dims.position(i);
                first_mismatch = Some(Mismatch {
                    row,
                    col,
                    expected: e,
                    actual: a,
                });
            }
        }
    }

    Ok(VerifyReport {
        dims,
        tolerance,
        mismatches,
        first_mismatch,
        max_abs_diff,
    })
}
