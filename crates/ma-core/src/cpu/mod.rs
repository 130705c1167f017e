use crate::backend::{check_operands, AddBackend};
use crate::dims::Dims;
use crate::error::Result;

/// Pure-Rust host backend.
///
/// A single sequential pass over the operands. Serves as the reference
/// result that accelerator backends are verified against.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AddBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn add(&self, a: &[f32], b: &[f32], out: &mut [f32], dims: Dims) -> Result<()> {
        check_operands(a, b, out, dims)?;
        for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
            *o = x + y;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn backend() -> CpuBackend {
        CpuBackend::new()
    }

    #[test]
    fn test_add() {
        let b = backend();
        let dims = Dims::new(2, 1).unwrap();
        let mut out = [0.0; 2];
        b.add(&[1.0, 2.0], &[3.0, 4.0], &mut out, dims).unwrap();
        assert_eq!(out, [4.0, 6.0]);
    }

    #[test]
    fn test_add_constant_fills() {
        let b = backend();
        for (dx, dy) in [(1, 1), (4, 4), (17, 5), (1, 33)] {
            for (fa, fb) in [(3.0f32, 2.0f32), (-1.25, 0.5), (0.0, 0.0), (1e6, -1e6)] {
                let dims = Dims::new(dx, dy).unwrap();
                let ma = Matrix::filled(dims, fa).unwrap();
                let mb = Matrix::filled(dims, fb).unwrap();
                let mut out = Matrix::zeros(dims).unwrap();
                ma.add_into(&mb, &mut out, &b).unwrap();
                assert!(out.as_slice().iter().all(|&v| v == fa + fb));
            }
        }
    }

    #[test]
    fn test_add_commutative() {
        let b = backend();
        let dims = Dims::new(3, 3).unwrap();
        let x: Vec<f32> = (0..9).map(|i| i as f32 * 0.37 - 1.0).collect();
        let y: Vec<f32> = (0..9).map(|i| (i as f32).sqrt() * 2.5).collect();
        let mut xy = vec![0.0; 9];
        let mut yx = vec![0.0; 9];
        b.add(&x, &y, &mut xy, dims).unwrap();
        b.add(&y, &x, &mut yx, dims).unwrap();
        assert_eq!(xy, yx);
    }

    #[test]
    fn test_add_length_mismatch() {
        let b = backend();
        let dims = Dims::new(2, 1).unwrap();
        let mut out = [0.0; 2];
        assert!(b.add(&[1.0], &[1.0, 2.0], &mut out, dims).is_err());
        let mut short = [0.0; 1];
        assert!(b.add(&[1.0, 2.0], &[1.0, 2.0], &mut short, dims).is_err());
    }
}
