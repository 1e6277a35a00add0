//! The coordinate spaces a crystallographic map lives in.
//!
//! - [`OrthCoord`]: Cartesian Å, the space atoms and the camera live in.
//! - [`FracCoord`]: unit-cell-relative, one unit per cell edge.
//! - [`MapCoord`]: real-valued grid coordinates (fractional × sampling).
//! - [`GridCoord`]: integer grid points of a [`GridSampling`].
//!
//! Conversions are pure and parameterized only by [`Cell`] and
//! [`GridSampling`].

use std::ops::{Add, Sub};

use glam::{DVec3, IVec3};

use super::cell::Cell;
use super::grid::GridSampling;

/// Round to the nearest integer, halves rounding up.
fn nearest(v: DVec3) -> IVec3 {
    (v + DVec3::splat(0.5)).floor().as_ivec3()
}

/// Orthogonal (Cartesian) coordinate in Å.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrthCoord(pub DVec3);

/// Fractional coordinate relative to the unit cell edges.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FracCoord(pub DVec3);

/// Real-valued grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapCoord(pub DVec3);

/// Integer grid coordinate `(u, v, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridCoord(pub IVec3);

impl OrthCoord {
    /// Coordinate from Cartesian components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self(DVec3::new(x, y, z))
    }

    /// Cartesian components.
    #[must_use]
    pub fn xyz(self) -> DVec3 {
        self.0
    }

    /// Convert to fractional coordinates.
    #[must_use]
    pub fn to_frac(self, cell: &Cell) -> FracCoord {
        FracCoord(cell.frac_matrix() * self.0)
    }

    /// Nearest grid point to this coordinate.
    #[must_use]
    pub fn to_grid(self, cell: &Cell, grid: &GridSampling) -> GridCoord {
        self.to_frac(cell).to_grid(grid)
    }
}

impl FracCoord {
    /// Coordinate from fractional components.
    #[must_use]
    pub const fn new(u: f64, v: f64, w: f64) -> Self {
        Self(DVec3::new(u, v, w))
    }

    /// Convert to orthogonal coordinates.
    #[must_use]
    pub fn to_orth(self, cell: &Cell) -> OrthCoord {
        OrthCoord(cell.orth_matrix() * self.0)
    }

    /// Real-valued grid coordinate.
    #[must_use]
    pub fn to_map(self, grid: &GridSampling) -> MapCoord {
        MapCoord(self.0 * grid.dim().as_dvec3())
    }

    /// Nearest grid point.
    #[must_use]
    pub fn to_grid(self, grid: &GridSampling) -> GridCoord {
        GridCoord(nearest(self.to_map(grid).0))
    }
}

impl MapCoord {
    /// Grid point at or below this coordinate on every axis.
    #[must_use]
    pub fn floor(self) -> GridCoord {
        GridCoord(self.0.floor().as_ivec3())
    }

    /// Grid point at or above this coordinate on every axis.
    #[must_use]
    pub fn ceil(self) -> GridCoord {
        GridCoord(self.0.ceil().as_ivec3())
    }

    /// Convert back to fractional coordinates.
    #[must_use]
    pub fn to_frac(self, grid: &GridSampling) -> FracCoord {
        FracCoord(self.0 / grid.dim().as_dvec3())
    }
}

impl GridCoord {
    /// Grid point from components.
    #[must_use]
    pub const fn new(u: i32, v: i32, w: i32) -> Self {
        Self(IVec3::new(u, v, w))
    }

    /// Integer components.
    #[must_use]
    pub fn uvw(self) -> IVec3 {
        self.0
    }

    /// Fractional coordinate of this grid point.
    #[must_use]
    pub fn to_frac(self, grid: &GridSampling) -> FracCoord {
        FracCoord(self.0.as_dvec3() / grid.dim().as_dvec3())
    }

    /// Orthogonal coordinate of this grid point.
    #[must_use]
    pub fn to_orth(self, cell: &Cell, grid: &GridSampling) -> OrthCoord {
        self.to_frac(grid).to_orth(cell)
    }
}

impl Add<IVec3> for GridCoord {
    type Output = Self;

    fn add(self, rhs: IVec3) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub<IVec3> for GridCoord {
    type Output = Self;

    fn sub(self, rhs: IVec3) -> Self {
        Self(self.0 - rhs)
    }
}

impl Sub for GridCoord {
    type Output = IVec3;

    fn sub(self, rhs: Self) -> IVec3 {
        self.0 - rhs.0
    }
}
