//! Density sources: anything that can export a grid section.

use glam::IVec3;

use crate::crystal::{GridCoord, GridSampling};
use crate::error::XtalError;

/// Summary statistics of a map over one unit cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapStats {
    /// Mean density.
    pub mean: f64,
    /// Standard deviation.
    pub sigma: f64,
    /// Minimum density.
    pub min: f64,
    /// Maximum density.
    pub max: f64,
}

impl MapStats {
    /// Statistics of `values`. All zero for an empty slice.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                sigma: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self {
            mean,
            sigma: var.sqrt(),
            min,
            max,
        }
    }
}

/// A periodic crystallographic map that can export rectangular sections.
pub trait DensitySource {
    /// Display name.
    fn name(&self) -> &str;

    /// Unit-cell statistics, used to scale σ contours.
    fn stats(&self) -> MapStats;

    /// Write the `dims` section starting at `origin` into `out`, `u`
    /// fastest then `v` then `w`.
    ///
    /// # Errors
    ///
    /// [`XtalError::External`] if the section cannot be produced.
    fn export_section(
        &self,
        origin: GridCoord,
        dims: IVec3,
        out: &mut [f64],
    ) -> Result<(), XtalError>;
}

/// In-memory map over one unit cell, sampled periodically.
#[derive(Debug, Clone)]
pub struct PeriodicMap {
    name: String,
    grid: GridSampling,
    data: Vec<f64>,
    stats: MapStats,
}

impl PeriodicMap {
    /// Map from unit-cell samples in `u`-fastest order.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if `data` does not hold exactly one
    /// sample per grid point.
    pub fn new(
        name: &str,
        grid: GridSampling,
        data: Vec<f64>,
    ) -> Result<Self, XtalError> {
        if data.len() != grid.size() {
            return Err(XtalError::Configuration(format!(
                "map '{name}' has {} samples, grid {} needs {}",
                data.len(),
                grid.dim(),
                grid.size()
            )));
        }
        let stats = MapStats::from_values(&data);
        Ok(Self {
            name: name.to_owned(),
            grid,
            data,
            stats,
        })
    }

    /// Map sampled from a function of the grid point.
    pub fn from_fn(
        name: &str,
        grid: GridSampling,
        f: impl Fn(GridCoord) -> f64,
    ) -> Self {
        let dim = grid.dim();
        let mut data = Vec::with_capacity(grid.size());
        for w in 0..dim.z {
            for v in 0..dim.y {
                for u in 0..dim.x {
                    data.push(f(GridCoord::new(u, v, w)));
                }
            }
        }
        let stats = MapStats::from_values(&data);
        Self {
            name: name.to_owned(),
            grid,
            data,
            stats,
        }
    }

    /// Density at any grid point, wrapped into the unit cell.
    #[must_use]
    pub fn value(&self, g: GridCoord) -> f64 {
        self.data
            .get(self.grid.wrapped_index(g))
            .copied()
            .unwrap_or(0.0)
    }

    /// Grid the map is sampled on.
    #[must_use]
    pub fn grid(&self) -> &GridSampling {
        &self.grid
    }
}

impl DensitySource for PeriodicMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> MapStats {
        self.stats
    }

    fn export_section(
        &self,
        origin: GridCoord,
        dims: IVec3,
        out: &mut [f64],
    ) -> Result<(), XtalError> {
        let mut i = 0;
        for w in 0..dims.z {
            for v in 0..dims.y {
                for u in 0..dims.x {
                    let Some(slot) = out.get_mut(i) else {
                        return Err(XtalError::External(format!(
                            "section {dims} does not fit {} samples",
                            out.len()
                        )));
                    };
                    *slot = self.value(origin + IVec3::new(u, v, w));
                    i += 1;
                }
            }
        }
        Ok(())
    }
}
