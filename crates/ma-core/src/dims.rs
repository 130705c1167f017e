use crate::error::{MatAddError, Result};
use std::fmt;

/// Default extent for both axes when no dimensions are given.
pub const DEFAULT_DIM: usize = 1024;

/// Validated dimensions of a row-major matrix.
///
/// `dx` is the x extent (number of columns), `dy` the y extent (number of
/// rows). Cell `(row, col)` lives at flat index `row * dx + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    dx: usize,
    dy: usize,
}

impl Dims {
    /// Create dimensions, rejecting zero extents and element counts that
    /// overflow `usize`.
    pub fn new(dx: usize, dy: usize) -> Result<Self> {
        if dx == 0 || dy == 0 {
            return Err(MatAddError::InvalidDims { dx, dy });
        }
        if dx.checked_mul(dy).is_none() {
            return Err(MatAddError::SizeOverflow { dx, dy });
        }
        Ok(Dims { dx, dy })
    }

    /// Square dimensions `n x n`.
    pub fn square(n: usize) -> Result<Self> {
        Self::new(n, n)
    }

    /// Number of columns.
    pub fn dx(&self) -> usize {
        self.dx
    }

    /// Number of rows.
    pub fn dy(&self) -> usize {
        self.dy
    }

    /// Total number of cells (`dx * dy`).
    pub fn len(&self) -> usize {
        self.dx * self.dy
    }

    /// Always false; zero extents are rejected at construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Flat row-major index of `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= dy` or `col >= dx`.
    pub fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.dy && col < self.dx,
            "cell ({}, {}) out of bounds for {}",
            row,
            col,
            self
        );
        row * self.dx + col
    }

    /// Inverse of [`Dims::index`]: `(row, col)` of a flat index.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.dx, index % self.dx)
    }

    /// True if both extents are at most `limit`.
    pub fn fits_within(&self, limit: usize) -> bool {
        self.dx <= limit && self.dy <= limit
    }
}

impl Default for Dims {
    fn default() -> Self {
        Dims {
            dx: DEFAULT_DIM,
            dy: DEFAULT_DIM,
        }
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.dx, self.dy)
    }
}
