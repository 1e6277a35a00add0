//! Batched "which points are near any target" queries.
//!
//! Targets are bucketed once into a sparse cubic cell grid with an edge of
//! `radius` (never below [`MIN_CELL_SIZE`]); every search set is then tested
//! against the 27 cells around each of its points. Distances are strict
//! (`d < radius`).

use glam::{DVec3, IVec3};
use rustc_hash::FxHashMap;

/// Smallest cell edge in Å. Keeps cell keys well inside `i32` for tiny
/// radii.
pub const MIN_CELL_SIZE: f64 = 1e-3;

/// Sparse uniform cell grid over a point set.
#[derive(Debug)]
pub struct SpatialHash {
    cell_size: f64,
    cells: FxHashMap<IVec3, Vec<usize>>,
    points: Vec<DVec3>,
}

impl SpatialHash {
    /// Bucket `points` into cells of edge `cell_size` Å, raised to
    /// [`MIN_CELL_SIZE`] if smaller.
    ///
    /// A non-positive or non-finite `cell_size` yields an empty hash.
    #[must_use]
    pub fn new(points: &[DVec3], cell_size: f64) -> Self {
        let mut cells: FxHashMap<IVec3, Vec<usize>> = FxHashMap::default();
        let valid = cell_size.is_finite() && cell_size > 0.0;
        let cell_size = cell_size.max(MIN_CELL_SIZE);
        if valid {
            for (i, &p) in points.iter().enumerate() {
                cells.entry(Self::key(p, cell_size)).or_default().push(i);
            }
        }
        Self {
            cell_size,
            cells,
            points: if valid { points.to_vec() } else { Vec::new() },
        }
    }

    fn key(p: DVec3, cell_size: f64) -> IVec3 {
        (p / cell_size).floor().as_ivec3()
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Whether any stored point lies strictly within `radius` of `p`.
    ///
    /// `radius` must not exceed the cell size given to [`Self::new`].
    #[must_use]
    pub fn any_within(&self, p: DVec3, radius: f64) -> bool {
        if self.cells.is_empty() || radius <= 0.0 {
            return false;
        }
        let r2 = radius * radius;
        let center = Self::key(p, self.cell_size);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let key = center.saturating_add(IVec3::new(dx, dy, dz));
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    if bucket
                        .iter()
                        .any(|&i| self.points[i].distance_squared(p) < r2)
                    {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// For each set in `search`, the indices of its points lying strictly within
/// `radius` of any point in `targets`.
///
/// One hash is built over `targets` and shared by every set, so the cost is
/// linear in the total number of search points.
#[must_use]
pub fn find_close_points_sets(
    search: &[&[DVec3]],
    targets: &[DVec3],
    radius: f64,
) -> Vec<Vec<usize>> {
    if targets.is_empty() || radius <= 0.0 || !radius.is_finite() {
        return vec![Vec::new(); search.len()];
    }
    let hash = SpatialHash::new(targets, radius);
    search
        .iter()
        .map(|set| {
            set.iter()
                .enumerate()
                .filter(|&(_, &p)| hash.any_within(p, radius))
                .map(|(i, _)| i)
                .collect()
        })
        .collect()
}
