use glam::{DVec3, IVec3};

use super::cell::Cell;
use super::coords::GridCoord;
use crate::error::XtalError;

/// Number of grid points along each unit cell edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSampling {
    dim: IVec3,
}

impl GridSampling {
    /// Explicit sampling `(nu, nv, nw)`.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if any dimension is not positive.
    pub fn new(nu: i32, nv: i32, nw: i32) -> Result<Self, XtalError> {
        let dim = IVec3::new(nu, nv, nw);
        if dim.min_element() <= 0 {
            return Err(XtalError::Configuration(format!(
                "grid sampling must be positive, got {dim}"
            )));
        }
        Ok(Self { dim })
    }

    /// Sampling fine enough for `resolution` Å data at the given Shannon
    /// oversampling `rate`, rounded up to FFT-friendly sizes.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if `resolution` or `rate` is not
    /// positive.
    pub fn from_resolution(
        cell: &Cell,
        resolution: f64,
        rate: f64,
    ) -> Result<Self, XtalError> {
        if !(resolution.is_finite() && resolution > 0.0 && rate > 0.0) {
            return Err(XtalError::Configuration(format!(
                "resolution {resolution} and rate {rate} must be positive"
            )));
        }
        let n = (cell.dim() * (2.0 * rate / resolution)).ceil().as_ivec3();
        Self::new(
            next_fft_size(n.x),
            next_fft_size(n.y),
            next_fft_size(n.z),
        )
    }

    /// Grid points per cell edge.
    #[must_use]
    pub fn dim(&self) -> IVec3 {
        self.dim
    }

    /// Voxel edge lengths in Å for `cell`.
    #[must_use]
    pub fn voxel_size(&self, cell: &Cell) -> DVec3 {
        cell.dim() / self.dim.as_dvec3()
    }

    /// Voxel edge lengths in fractional units.
    #[must_use]
    pub fn voxel_size_frac(&self) -> DVec3 {
        DVec3::ONE / self.dim.as_dvec3()
    }

    /// Total number of grid points in one unit cell.
    #[must_use]
    pub fn size(&self) -> usize {
        (self.dim.x as usize) * (self.dim.y as usize) * (self.dim.z as usize)
    }

    /// Lowest grid point of the unit cell.
    #[must_use]
    pub fn unit_cell_min(&self) -> GridCoord {
        GridCoord(IVec3::ZERO)
    }

    /// Highest grid point of the unit cell.
    #[must_use]
    pub fn unit_cell_max(&self) -> GridCoord {
        GridCoord(self.dim - IVec3::ONE)
    }

    /// Wrap a grid point into the unit cell and return its linear index
    /// (u fastest).
    #[must_use]
    pub fn wrapped_index(&self, g: GridCoord) -> usize {
        let w = g.0.rem_euclid(self.dim);
        (w.x as usize)
            + (self.dim.x as usize)
                * ((w.y as usize) + (self.dim.y as usize) * (w.z as usize))
    }
}

/// Smallest integer `>= n` with no prime factors other than 2, 3 and 5.
fn next_fft_size(n: i32) -> i32 {
    let mut m = n.max(1);
    loop {
        let mut r = m;
        for p in [2, 3, 5] {
            while r % p == 0 {
                r /= p;
            }
        }
        if r == 1 {
            return m;
        }
        m += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_sizes() {
        assert_eq!(next_fft_size(1), 1);
        assert_eq!(next_fft_size(7), 8);
        assert_eq!(next_fft_size(49), 50);
        assert_eq!(next_fft_size(61), 64);
        assert_eq!(next_fft_size(97), 100);
    }

    #[test]
    fn from_resolution_uses_oversampling() {
        let cell = Cell::new([50.0, 61.0, 70.0], [90.0, 90.0, 90.0]).unwrap();
        let grid = GridSampling::from_resolution(&cell, 2.0, 1.5).unwrap();
        // 2 * 1.5 / 2.0 = 1.5 points per Å.
        assert_eq!(grid.dim(), IVec3::new(75, 96, 108));
        let voxel = grid.voxel_size(&cell);
        assert!(voxel.max_element() <= 2.0 / (2.0 * 1.5) + 1e-12);
    }

    #[test]
    fn wrapped_index_is_periodic() {
        let grid = GridSampling::new(4, 5, 6).unwrap();
        let a = grid.wrapped_index(GridCoord::new(1, 2, 3));
        let b = grid.wrapped_index(GridCoord::new(1 - 4, 2 + 10, 3 - 12));
        assert_eq!(a, b);
        assert_eq!(a, 1 + 4 * (2 + 5 * 3));
        assert_eq!(grid.wrapped_index(grid.unit_cell_max()), grid.size() - 1);
    }

    #[test]
    fn rejects_empty_sampling() {
        assert!(GridSampling::new(0, 10, 10).is_err());
        let cell = Cell::new([10.0, 10.0, 10.0], [90.0, 90.0, 90.0]).unwrap();
        assert!(GridSampling::from_resolution(&cell, 0.0, 1.5).is_err());
    }
}
