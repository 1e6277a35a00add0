use glam::DVec3;

use super::source::DensitySource;
use super::volume::VolumeBuffer;
use crate::boxes::GridBox;
use crate::crystal::{Cell, GridSampling};
use crate::error::XtalError;

/// Fills [`VolumeBuffer`]s from a [`DensitySource`] for a given box.
///
/// Owns only placement metadata; the density itself comes from the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBoxResampler {
    step: DVec3,
    cell_angles_deg: DVec3,
}

impl MapBoxResampler {
    /// Resampler for maps on `grid` in `cell`.
    #[must_use]
    pub fn new(cell: &Cell, grid: &GridSampling) -> Self {
        Self {
            step: grid.voxel_size(cell),
            cell_angles_deg: cell.angles_deg(),
        }
    }

    /// New buffer shaped exactly like `region`, filled from `source`.
    ///
    /// # Errors
    ///
    /// Whatever `source` reports.
    pub fn allocate(
        &self,
        region: &GridBox,
        source: &dyn DensitySource,
    ) -> Result<VolumeBuffer, XtalError> {
        let mut buffer = VolumeBuffer::zeros(
            region.dims,
            region.corner_xyz,
            self.step,
            self.cell_angles_deg,
        );
        self.fill(&mut buffer, region, source)?;
        Ok(buffer)
    }

    /// Refill `buffer` in place with the section at `region` and move its
    /// origin there.
    ///
    /// # Errors
    ///
    /// [`XtalError::DimensionMismatch`] if the buffer was shaped for a
    /// different box; otherwise whatever `source` reports.
    pub fn fill(
        &self,
        buffer: &mut VolumeBuffer,
        region: &GridBox,
        source: &dyn DensitySource,
    ) -> Result<(), XtalError> {
        if buffer.dims() != region.dims {
            return Err(XtalError::DimensionMismatch {
                expected: region.dims.to_array(),
                actual: buffer.dims().to_array(),
            });
        }
        buffer.set_origin(region.corner_xyz);
        source.export_section(region.corner, region.dims, buffer.as_mut_slice())
    }

    /// Voxel edge lengths in Å.
    #[must_use]
    pub fn step(&self) -> DVec3 {
        self.step
    }
}
