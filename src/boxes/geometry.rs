//! Grid-aligned boxes around spheres and coordinate sets.
//!
//! All functions here are pure. Dimensions are derived by pushing the
//! corners of a Cartesian cube through the cell metric, so skewed cells get
//! boxes wide enough on every crystallographic axis.

use glam::{DVec3, IVec3};

use crate::crystal::{
    Cell, FracCoord, GridCoord, GridSampling, MapCoord, OrthCoord,
};

/// Slack for sphere edges that land exactly on a grid plane.
const EDGE_EPS: f64 = 1e-6;

/// A grid-aligned box: integer corner, its Cartesian position and the
/// number of grid points per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBox {
    /// Lowest grid point.
    pub corner: GridCoord,
    /// Orthogonal coordinate of `corner`.
    pub corner_xyz: OrthCoord,
    /// Grid points along `(u, v, w)`.
    pub dims: IVec3,
}

impl GridBox {
    /// Box spanning `min` up to (not including) `max`.
    #[must_use]
    pub fn from_limits(
        min: GridCoord,
        max: GridCoord,
        cell: &Cell,
        grid: &GridSampling,
    ) -> Self {
        Self {
            corner: min,
            corner_xyz: min.to_orth(cell, grid),
            dims: (max - min).max(IVec3::ZERO),
        }
    }

    /// Highest grid point inside the box.
    #[must_use]
    pub fn max(&self) -> GridCoord {
        self.corner + (self.dims - IVec3::ONE)
    }

    /// Whether `g` lies inside the box.
    #[must_use]
    pub fn contains(&self, g: GridCoord) -> bool {
        let d = g - self.corner;
        d.cmpge(IVec3::ZERO).all() && d.cmplt(self.dims).all()
    }

    /// Total number of grid points.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.dims
            .to_array()
            .iter()
            .map(|&d| usize::try_from(d).unwrap_or(0))
            .product()
    }
}

/// Map coordinates of the eight corners of the Cartesian cube
/// `[-radius, radius]^3`.
fn cube_corners_in_map(radius: f64, cell: &Cell, grid: &GridSampling) -> [DVec3; 8] {
    let mut out = [DVec3::ZERO; 8];
    for (i, slot) in out.iter_mut().enumerate() {
        let sign = |bit: usize| if i & bit == 0 { -1.0 } else { 1.0 };
        let c = DVec3::new(sign(1), sign(2), sign(4)) * radius;
        *slot = OrthCoord(c).to_frac(cell).to_map(grid).0;
    }
    out
}

/// Grid steps needed on each axis to span `2 * radius` Å in x, y and z.
///
/// A negative radius is treated as zero.
#[must_use]
pub fn grid_padding(radius: f64, cell: &Cell, grid: &GridSampling) -> IVec3 {
    let corners = cube_corners_in_map(radius.max(0.0), cell, grid);
    let mut lo = DVec3::splat(f64::INFINITY);
    let mut hi = DVec3::splat(f64::NEG_INFINITY);
    for c in corners {
        lo = lo.min(c);
        hi = hi.max(c);
    }
    MapCoord(hi - EDGE_EPS).ceil() - MapCoord(lo + EDGE_EPS).floor()
}

/// Smallest grid box holding a sphere of `radius` Å around `center`, padded
/// by `pad` grid points on every side.
#[must_use]
pub fn box_for_sphere(
    center: OrthCoord,
    radius: f64,
    pad: i32,
    cell: &Cell,
    grid: &GridSampling,
) -> GridBox {
    let radius = radius.max(0.0);
    let pad = pad.max(0);
    let radius_frac = DVec3::splat(radius) / cell.dim();
    let lower = center.to_frac(cell).0 - radius_frac;
    let corner = FracCoord(lower).to_grid(grid) - IVec3::splat(pad);
    GridBox {
        corner,
        corner_xyz: corner.to_orth(cell, grid),
        dims: grid_padding(radius, cell, grid) + IVec3::splat(2 * pad),
    }
}

/// Grid box enclosing every coordinate in `coords` plus `padding` Å, or
/// `None` when `coords` is empty.
#[must_use]
pub fn bounding_box(
    coords: &[DVec3],
    padding: f64,
    cell: &Cell,
    grid: &GridSampling,
) -> Option<GridBox> {
    let mut iter = coords
        .iter()
        .map(|&p| OrthCoord(p).to_frac(cell).to_map(grid).0);
    let first = iter.next()?;
    let (lo, hi) = iter.fold((first, first), |(lo, hi), m| (lo.min(m), hi.max(m)));
    let half_pad = (grid_padding(padding, cell, grid) + IVec3::ONE) / 2;
    let min = MapCoord(lo).floor() - half_pad;
    let max = MapCoord(hi).ceil() + half_pad;
    Some(GridBox::from_limits(min, max, cell, grid))
}
