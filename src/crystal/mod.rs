//! Crystallographic primitives: unit cell, grid sampling, coordinate
//! spaces, symmetry operators and their expansion inside a box.

/// Unit cell metric and orthogonalisation.
pub mod cell;
/// Orthogonal, fractional, map and grid coordinates.
pub mod coords;
/// Grid sampling of a unit cell.
pub mod grid;
/// Named operator tables.
pub mod spacegroup;
/// Integer-rotation symmetry operators and xyz-triplet notation.
pub mod symop;
/// Box queries for symmetry copies of a reference model.
pub mod unit_cell;

pub use cell::Cell;
pub use coords::{FracCoord, GridCoord, MapCoord, OrthCoord};
pub use grid::GridSampling;
pub use spacegroup::Spacegroup;
pub use symop::SymmetryOperator;
pub use unit_cell::{SymmetryProvider, UnitCell};
