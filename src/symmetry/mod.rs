//! Symmetry copies of an atomic model around the viewpoint.

/// Lazily built, operator-keyed copies.
pub mod cache;
/// Live symmetry display.
pub mod engine;
/// Atomic models and the model tree.
pub mod model;
/// Batched neighbour search.
pub mod proximity;

pub use cache::SymmetryCopyCache;
pub use engine::{SymmetryExpansionEngine, SymmetrySelection, SymmetryUpdate};
pub use model::{Atom, AtomicModel, ModelId, ModelKind, ModelStore, Residue};
pub use proximity::{find_close_points_sets, SpatialHash, MIN_CELL_SIZE};
