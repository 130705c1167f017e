use std::fmt;

use crate::backend::AddBackend;
use crate::dims::Dims;
use crate::error::{MatAddError, Result};

/// A dense `f32` matrix in row-major order.
///
/// Owns exactly `dims.len()` values. The buffer is released when the matrix
/// is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f32>,
    dims: Dims,
}

impl Matrix {
    /// Allocate a zero-filled matrix.
    ///
    /// # Errors
    /// Returns `HostAlloc` if the allocator cannot provide the buffer.
    pub fn zeros(dims: Dims) -> Result<Self> {
        Self::filled(dims, 0.0)
    }

    /// Allocate a matrix with every cell set to `value`.
    ///
    /// # Errors
    /// Returns `HostAlloc` if the allocator cannot provide the buffer.
    pub fn filled(dims: Dims, value: f32) -> Result<Self> {
        let n = dims.len();
        let mut data = Vec::new();
        data.try_reserve_exact(n)
            .map_err(|_| MatAddError::HostAlloc { elements: n })?;
        data.resize(n, value);
        Ok(Matrix { data, dims })
    }

    /// Wrap existing row-major data.
    pub fn from_vec(data: Vec<f32>, dims: Dims) -> Result<Self> {
        if data.len() != dims.len() {
            return Err(MatAddError::ShapeMismatch {
                expected: format!("{} elements ({})", dims.len(), dims),
                got: format!("{} elements", data.len()),
            });
        }
        Ok(Matrix { data, dims })
    }

    /// Overwrite every cell with `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the cell is outside the matrix.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[self.dims.index(row, col)]
    }

    /// Iterate over rows as slices of length `dx`.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dims.dx())
    }

    /// Element-wise sum `self + other` written into `out` using `backend`.
    ///
    /// All three matrices must share the same dimensions.
    pub fn add_into(
        &self,
        other: &Matrix,
        out: &mut Matrix,
        backend: &dyn AddBackend,
    ) -> Result<()> {
        ensure_same_dims(self.dims, other.dims)?;
        ensure_same_dims(self.dims, out.dims)?;
        backend.add(&self.data, &other.data, &mut out.data, self.dims)
    }
}

pub(crate) fn ensure_same_dims(expected: Dims, got: Dims) -> Result<()> {
    if expected != got {
        return Err(MatAddError::ShapeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for (i, v) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>10.4}", v)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
