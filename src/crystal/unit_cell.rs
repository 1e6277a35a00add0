//! Enumeration of the symmetry operators whose copies of a reference model
//! fall inside a box.
//!
//! [`UnitCell`] canonicalises each spacegroup operator so the copy it
//! produces has its centroid in the same unit cell as the reference model's
//! centroid, and records the fractional bounding box of every such copy.
//! A box query then samples grid points in the box and, for each point,
//! solves for the whole-cell lattice shifts that place a copy's bounding box
//! over it. Coarser sampling is cheaper but can miss copies that only clip
//! the box between two sample points.

use std::collections::BTreeSet;

use glam::{DVec3, IVec3};

use super::cell::Cell;
use super::coords::{FracCoord, GridCoord, OrthCoord};
use super::grid::GridSampling;
use super::spacegroup::Spacegroup;
use super::symop::SymmetryOperator;
use crate::error::XtalError;

/// Source of the symmetry operators intersecting a grid box.
pub trait SymmetryProvider {
    /// Operators whose copies of the reference model intersect the box with
    /// orthogonal corner `corner` and `dims` grid points per axis.
    ///
    /// The identity comes first when present. It is present when its copy
    /// (the reference model itself) intersects the box, or unconditionally
    /// when `include_identity` is set. The remaining operators follow in a
    /// stable order. `sample_frequency` is the number of samples per
    /// reference-model extent; larger is more exact and slower.
    ///
    /// # Errors
    ///
    /// [`XtalError::External`] if the provider cannot answer.
    fn all_symops_in_box(
        &self,
        corner: OrthCoord,
        dims: IVec3,
        include_identity: bool,
        sample_frequency: u32,
    ) -> Result<Vec<SymmetryOperator>, XtalError>;

    /// The reference model's atoms moved to `reference`. Providers that
    /// precompute per-copy data refresh it here.
    ///
    /// # Errors
    ///
    /// Provider-specific; the default does nothing.
    fn reference_moved(&mut self, reference: &[DVec3]) -> Result<(), XtalError> {
        let _ = reference;
        Ok(())
    }
}

/// Fractional bounding box of one canonical copy.
#[derive(Debug, Clone, Copy)]
struct CopyBounds {
    lo: DVec3,
    hi: DVec3,
}

/// Unit cell plus the reference model it expands.
#[derive(Debug, Clone)]
pub struct UnitCell {
    cell: Cell,
    grid: GridSampling,
    spacegroup: Spacegroup,
    ops: Vec<SymmetryOperator>,
    bounds: Vec<CopyBounds>,
    ref_extent: IVec3,
    /// Per-axis extent of the thinnest copy, in grid points.
    sample_extent: IVec3,
    ref_cell: IVec3,
}

impl UnitCell {
    /// Build for a reference model with orthogonal coordinates `reference`.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if `reference` is empty.
    pub fn new(
        spacegroup: Spacegroup,
        cell: Cell,
        grid: GridSampling,
        reference: &[DVec3],
    ) -> Result<Self, XtalError> {
        let mut uc = Self {
            cell,
            grid,
            spacegroup,
            ops: Vec::new(),
            bounds: Vec::new(),
            ref_extent: IVec3::ONE,
            sample_extent: IVec3::ONE,
            ref_cell: IVec3::ZERO,
        };
        uc.set_reference(reference)?;
        Ok(uc)
    }

    /// Recompute canonical operators and copy bounds after the reference
    /// model moved.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if `reference` is empty.
    pub fn set_reference(&mut self, reference: &[DVec3]) -> Result<(), XtalError> {
        if reference.is_empty() {
            return Err(XtalError::Configuration(
                "symmetry expansion needs at least one reference atom".to_owned(),
            ));
        }
        let frac: Vec<DVec3> = reference
            .iter()
            .map(|&p| OrthCoord(p).to_frac(&self.cell).0)
            .collect();
        let centroid = frac.iter().copied().sum::<DVec3>() / frac.len() as f64;
        let ref_cell = centroid.floor().as_ivec3();

        let mut ops = Vec::with_capacity(self.spacegroup.len());
        let mut bounds = Vec::with_capacity(self.spacegroup.len());
        for op in self.spacegroup.ops() {
            let moved = op.apply(FracCoord(centroid)).0.floor().as_ivec3();
            let canonical = op.with_lattice_shift(ref_cell - moved);
            let mut lo = DVec3::splat(f64::INFINITY);
            let mut hi = DVec3::splat(f64::NEG_INFINITY);
            for &f in &frac {
                let p = canonical.apply(FracCoord(f)).0;
                lo = lo.min(p);
                hi = hi.max(p);
            }
            ops.push(canonical);
            bounds.push(CopyBounds { lo, hi });
        }

        let dim = self.grid.dim().as_dvec3();
        let extent = |b: &CopyBounds| ((b.hi - b.lo) * dim).ceil().as_ivec3().max(IVec3::ONE);
        self.ref_extent = extent(&bounds[0]);
        // Operators that permute axes move the reference's thin axis.
        self.sample_extent = bounds.iter().map(extent).fold(self.ref_extent, IVec3::min);
        self.ref_cell = ref_cell;
        self.ops = ops;
        self.bounds = bounds;
        Ok(())
    }

    /// The crystallographic cell.
    #[must_use]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    /// Grid sampling used for box queries.
    #[must_use]
    pub fn grid(&self) -> &GridSampling {
        &self.grid
    }

    /// The spacegroup being expanded.
    #[must_use]
    pub fn spacegroup(&self) -> &Spacegroup {
        &self.spacegroup
    }

    /// Canonical operators (identity first), one per spacegroup operator.
    #[must_use]
    pub fn canonical_ops(&self) -> &[SymmetryOperator] {
        &self.ops
    }

    /// Extent of the reference model in grid points.
    #[must_use]
    pub fn reference_extent(&self) -> IVec3 {
        self.ref_extent
    }

    /// Lowest grid point of the unit cell holding the reference centroid.
    #[must_use]
    pub fn min(&self) -> GridCoord {
        GridCoord(self.ref_cell * self.grid.dim())
    }

    /// Highest grid point of the unit cell holding the reference centroid.
    #[must_use]
    pub fn max(&self) -> GridCoord {
        GridCoord((self.ref_cell + IVec3::ONE) * self.grid.dim() - IVec3::ONE)
    }

    /// Insert every (operator, lattice shift) whose copy bounding box
    /// contains `p`.
    fn copies_covering(&self, p: FracCoord, found: &mut BTreeSet<SymmetryOperator>) {
        for (op, b) in self.ops.iter().zip(&self.bounds) {
            let t_min = (p.0 - b.hi).ceil().as_ivec3();
            let t_max = (p.0 - b.lo).floor().as_ivec3();
            for tz in t_min.z..=t_max.z {
                for ty in t_min.y..=t_max.y {
                    for tx in t_min.x..=t_max.x {
                        let _ = found.insert(op.with_lattice_shift(IVec3::new(tx, ty, tz)));
                    }
                }
            }
        }
    }

    /// Sample offsets along one axis: every `stride` points from 0, always
    /// including the far edge.
    fn axis_samples(len: i32, stride: i32) -> Vec<i32> {
        let last = len.max(1) - 1;
        let mut out: Vec<i32> = (0..=last).step_by(stride.max(1) as usize).collect();
        if out.last() != Some(&last) {
            out.push(last);
        }
        out
    }
}

impl SymmetryProvider for UnitCell {
    fn all_symops_in_box(
        &self,
        corner: OrthCoord,
        dims: IVec3,
        include_identity: bool,
        sample_frequency: u32,
    ) -> Result<Vec<SymmetryOperator>, XtalError> {
        let freq = i32::try_from(sample_frequency.max(1)).unwrap_or(i32::MAX);
        let stride = (self.sample_extent.min(dims.max(IVec3::ONE)) / freq).max(IVec3::ONE);
        let origin = corner.to_grid(&self.cell, &self.grid);

        let us = Self::axis_samples(dims.x, stride.x);
        let vs = Self::axis_samples(dims.y, stride.y);
        let ws = Self::axis_samples(dims.z, stride.z);

        let mut found: BTreeSet<SymmetryOperator> = BTreeSet::new();
        for &w in &ws {
            for &v in &vs {
                for &u in &us {
                    let p = (origin + IVec3::new(u, v, w)).to_frac(&self.grid);
                    self.copies_covering(p, &mut found);
                }
            }
        }

        let had_identity = found.remove(&SymmetryOperator::IDENTITY);
        let mut out = Vec::with_capacity(found.len() + 1);
        if had_identity || include_identity {
            out.push(SymmetryOperator::IDENTITY);
        }
        out.extend(found);
        Ok(out)
    }

    fn reference_moved(&mut self, reference: &[DVec3]) -> Result<(), XtalError> {
        self.set_reference(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p21_unit_cell() -> UnitCell {
        let cell = Cell::new([40.0, 40.0, 40.0], [90.0, 90.0, 90.0]).unwrap();
        let grid = GridSampling::new(40, 40, 40).unwrap();
        let sg = Spacegroup::from_name("P 1 21 1").unwrap();
        // A small blob around (10, 10, 10) Å.
        let reference = vec![
            DVec3::new(8.0, 9.0, 10.0),
            DVec3::new(12.0, 11.0, 10.0),
            DVec3::new(10.0, 10.0, 12.0),
        ];
        UnitCell::new(sg, cell, grid, &reference).unwrap()
    }

    #[test]
    fn canonical_copies_share_the_reference_cell() {
        let uc = p21_unit_cell();
        assert!(uc.canonical_ops()[0].is_identity());
        let centroid = FracCoord::new(0.25, 0.25, 0.266_666);
        for op in uc.canonical_ops() {
            let c = op.apply(centroid).0.floor().as_ivec3();
            assert_eq!(c, IVec3::ZERO, "{op}");
        }
        assert_eq!(uc.min(), GridCoord::new(0, 0, 0));
        assert_eq!(uc.max(), GridCoord::new(39, 39, 39));
    }

    #[test]
    fn box_around_reference_contains_only_identity() {
        let uc = p21_unit_cell();
        let corner = OrthCoord::new(9.0, 9.0, 9.0);
        let ops = uc
            .all_symops_in_box(corner, IVec3::splat(3), false, 2)
            .unwrap();
        assert_eq!(ops, vec![SymmetryOperator::IDENTITY]);
    }

    #[test]
    fn identity_forced_even_when_box_is_elsewhere() {
        let uc = p21_unit_cell();
        // Copies occupy u in [0.2, 0.3] and [0.7, 0.8] modulo 1; u = 0.5
        // is empty.
        let corner = OrthCoord::new(20.0, 0.0, 20.0);
        let dims = IVec3::splat(4);
        let without = uc.all_symops_in_box(corner, dims, false, 2).unwrap();
        assert!(without.is_empty());
        let with = uc.all_symops_in_box(corner, dims, true, 2).unwrap();
        assert_eq!(with, vec![SymmetryOperator::IDENTITY]);
    }

    #[test]
    fn large_box_finds_screw_copies_in_stable_order() {
        let uc = p21_unit_cell();
        let corner = OrthCoord::new(-20.0, -20.0, -20.0);
        let dims = IVec3::splat(80);
        let a = uc.all_symops_in_box(corner, dims, true, 2).unwrap();
        let b = uc.all_symops_in_box(corner, dims, true, 2).unwrap();
        assert_eq!(a, b);
        assert!(a[0].is_identity());
        assert!(a.len() > 2);
        let unique: BTreeSet<_> = a.iter().collect();
        assert_eq!(unique.len(), a.len());
        assert!(a.contains(&uc.canonical_ops()[1]));
    }

    #[test]
    fn rotated_thin_copy_is_sampled_on_its_thin_axis() {
        let cell = Cell::new([40.0, 40.0, 40.0], [90.0, 90.0, 90.0]).unwrap();
        let grid = GridSampling::new(40, 40, 40).unwrap();
        let sg = Spacegroup::from_xyz("P 4", &["-y,x,z", "-x,-y,z", "y,-x,z"]).unwrap();
        // A rod along y, two Å thick in x and z.
        let reference = vec![
            DVec3::new(9.5, 2.0, 9.5),
            DVec3::new(11.5, 18.0, 11.5),
            DVec3::new(9.5, 18.0, 11.5),
            DVec3::new(11.5, 2.0, 9.5),
        ];
        let uc = UnitCell::new(sg, cell, grid, &reference).unwrap();
        assert!(uc.reference_extent().y >= 16);
        // The 4-fold copy lies along x at y in [9.5, 11.5] Å; a stride
        // taken from the rod's length would step over it.
        let ops = uc
            .all_symops_in_box(OrthCoord::new(20.0, 0.0, 10.0), IVec3::new(20, 21, 2), false, 2)
            .unwrap();
        assert_eq!(ops, vec![uc.canonical_ops()[1]]);
    }

    #[test]
    fn empty_reference_is_rejected() {
        let cell = Cell::new([40.0, 40.0, 40.0], [90.0, 90.0, 90.0]).unwrap();
        let grid = GridSampling::new(40, 40, 40).unwrap();
        assert!(UnitCell::new(Spacegroup::p1(), cell, grid, &[]).is_err());
    }

    #[test]
    fn axis_samples_include_far_edge() {
        assert_eq!(UnitCell::axis_samples(10, 4), vec![0, 4, 8, 9]);
        assert_eq!(UnitCell::axis_samples(9, 4), vec![0, 4, 8]);
        assert_eq!(UnitCell::axis_samples(0, 4), vec![0]);
    }
}
