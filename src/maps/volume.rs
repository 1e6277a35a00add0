use glam::{DVec3, IVec3};

use crate::crystal::OrthCoord;

/// Dense block of density samples placed in space.
///
/// Storage is row-major over the reversed grid axes: the array shape is
/// `[nw, nv, nu]`, so `u` (the first crystallographic axis) varies fastest.
/// This is the layout volume displays expect.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBuffer {
    data: Vec<f64>,
    dims: IVec3,
    origin: OrthCoord,
    step: DVec3,
    cell_angles_deg: DVec3,
}

impl VolumeBuffer {
    /// Zero-filled buffer of `dims` grid points `(nu, nv, nw)`. Negative
    /// dimensions are clamped to zero.
    #[must_use]
    pub fn zeros(
        dims: IVec3,
        origin: OrthCoord,
        step: DVec3,
        cell_angles_deg: DVec3,
    ) -> Self {
        let dims = dims.max(IVec3::ZERO);
        let len = dims
            .to_array()
            .iter()
            .map(|&d| usize::try_from(d).unwrap_or(0))
            .product();
        Self {
            data: vec![0.0; len],
            dims,
            origin,
            step,
            cell_angles_deg,
        }
    }

    /// Grid points along `(u, v, w)`.
    #[must_use]
    pub fn dims(&self) -> IVec3 {
        self.dims
    }

    /// Array shape `[nw, nv, nu]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        let d = |i: i32| usize::try_from(i).unwrap_or(0);
        [d(self.dims.z), d(self.dims.y), d(self.dims.x)]
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear index of grid offset `(u, v, w)` from the buffer corner.
    #[must_use]
    pub fn index(&self, u: usize, v: usize, w: usize) -> usize {
        let [_, nv, nu] = self.shape();
        u + nu * (v + nv * w)
    }

    /// Sample at grid offset `(u, v, w)`, or `None` outside the buffer.
    #[must_use]
    pub fn get(&self, u: usize, v: usize, w: usize) -> Option<f64> {
        let [nw, nv, nu] = self.shape();
        if u >= nu || v >= nv || w >= nw {
            return None;
        }
        self.data.get(self.index(u, v, w)).copied()
    }

    /// Samples in storage order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable samples in storage order.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Cartesian position of the buffer corner.
    #[must_use]
    pub fn origin(&self) -> OrthCoord {
        self.origin
    }

    /// Move the buffer corner.
    pub fn set_origin(&mut self, origin: OrthCoord) {
        self.origin = origin;
    }

    /// Voxel edge lengths in Å.
    #[must_use]
    pub fn step(&self) -> DVec3 {
        self.step
    }

    /// Cell angles in degrees, for skewed display.
    #[must_use]
    pub fn cell_angles_deg(&self) -> DVec3 {
        self.cell_angles_deg
    }
}
