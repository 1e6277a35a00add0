//! Host-side atomic models and the tree that owns them.
//!
//! [`ModelStore`] stands in for the host application's model hierarchy: a
//! flat id-keyed table of nodes with parent/child links. Children never own
//! their parent; removing a node removes its whole subtree, and any id that
//! pointed into it resolves to [`XtalError::StaleReference`] from then on.

use std::ops::Range;

use glam::{DAffine3, DVec3};
use rustc_hash::FxHashMap;

use crate::error::XtalError;

// ---------------------------------------------------------------------------
// Atoms and residues
// ---------------------------------------------------------------------------

/// A single atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Atom name, e.g. `CA`.
    pub name: String,
    /// Element symbol.
    pub element: String,
    /// Orthogonal position in Å.
    pub position: DVec3,
    /// Display color, linear RGBA.
    pub color: [f32; 4],
}

impl Atom {
    /// Atom with a neutral grey color.
    #[must_use]
    pub fn new(name: &str, element: &str, position: DVec3) -> Self {
        Self {
            name: name.to_owned(),
            element: element.to_owned(),
            position,
            color: [0.7, 0.7, 0.7, 1.0],
        }
    }
}

/// A residue: a contiguous run of atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    /// Three-letter residue name.
    pub name: String,
    /// Chain identifier.
    pub chain: String,
    /// Residue sequence number.
    pub number: i32,
    /// Indices into the model's atom list.
    pub atoms: Range<usize>,
}

// ---------------------------------------------------------------------------
// AtomicModel
// ---------------------------------------------------------------------------

/// An atomic structure with per-atom display flags.
#[derive(Debug, Clone)]
pub struct AtomicModel {
    atoms: Vec<Atom>,
    residues: Vec<Residue>,
    /// Residue index of every atom.
    atom_residue: Vec<usize>,
    displays: Vec<bool>,
    shown: bool,
    /// Instance placements; a single identity by default.
    positions: Vec<DAffine3>,
    /// Bumped whenever atom coordinates change.
    revision: u64,
}

impl Default for AtomicModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicModel {
    /// Empty, shown model with the identity placement.
    #[must_use]
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            residues: Vec::new(),
            atom_residue: Vec::new(),
            displays: Vec::new(),
            shown: true,
            positions: vec![DAffine3::IDENTITY],
            revision: 0,
        }
    }

    /// Append a residue holding `atoms`. Returns the residue index.
    pub fn add_residue(
        &mut self,
        name: &str,
        chain: &str,
        number: i32,
        atoms: Vec<Atom>,
    ) -> usize {
        let index = self.residues.len();
        let start = self.atoms.len();
        let count = atoms.len();
        self.atoms.extend(atoms);
        self.atom_residue.extend(std::iter::repeat_n(index, count));
        self.displays.extend(std::iter::repeat_n(true, count));
        self.residues.push(Residue {
            name: name.to_owned(),
            chain: chain.to_owned(),
            number,
            atoms: start..start + count,
        });
        self.revision += 1;
        index
    }

    /// All atoms.
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// All residues.
    #[must_use]
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    /// Number of atoms.
    #[must_use]
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Residue index of atom `i`.
    #[must_use]
    pub fn residue_of(&self, i: usize) -> Option<usize> {
        self.atom_residue.get(i).copied()
    }

    /// Atom positions in Å.
    #[must_use]
    pub fn coords(&self) -> Vec<DVec3> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Replace every atom position.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if `coords` has the wrong length.
    pub fn set_coords(&mut self, coords: &[DVec3]) -> Result<(), XtalError> {
        if coords.len() != self.atoms.len() {
            return Err(XtalError::Configuration(format!(
                "expected {} coordinates, got {}",
                self.atoms.len(),
                coords.len()
            )));
        }
        for (atom, &p) in self.atoms.iter_mut().zip(coords) {
            atom.position = p;
        }
        self.revision += 1;
        Ok(())
    }

    /// Coordinate revision; changes whenever positions change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bake `xform` into the stored coordinates.
    pub fn transform(&mut self, xform: &DAffine3) {
        for atom in &mut self.atoms {
            atom.position = xform.transform_point3(atom.position);
        }
        self.revision += 1;
    }

    /// Scale every atom's RGB by `factor`, leaving alpha alone.
    pub fn dim_colors(&mut self, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        for atom in &mut self.atoms {
            for c in &mut atom.color[..3] {
                *c *= factor;
            }
        }
    }

    /// Per-atom display flags.
    #[must_use]
    pub fn atom_displays(&self) -> &[bool] {
        &self.displays
    }

    /// Replace the per-atom display flags.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if `mask` has the wrong length.
    pub fn set_atom_displays(&mut self, mask: Vec<bool>) -> Result<(), XtalError> {
        if mask.len() != self.atoms.len() {
            return Err(XtalError::Configuration(format!(
                "display mask has {} entries for {} atoms",
                mask.len(),
                self.atoms.len()
            )));
        }
        self.displays = mask;
        Ok(())
    }

    /// Expand atom indices to a mask covering each touched residue whole.
    /// Out-of-range indices are ignored.
    #[must_use]
    pub fn whole_residue_mask(&self, indices: &[usize]) -> Vec<bool> {
        let mut mask = vec![false; self.atoms.len()];
        let mut done = vec![false; self.residues.len()];
        for &i in indices {
            let Some(r) = self.residue_of(i) else {
                continue;
            };
            if done[r] {
                continue;
            }
            done[r] = true;
            for flag in &mut mask[self.residues[r].atoms.clone()] {
                *flag = true;
            }
        }
        mask
    }

    /// Whether the model as a whole is drawn.
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Show or hide the whole model.
    pub fn set_shown(&mut self, shown: bool) {
        self.shown = shown;
    }

    /// Instance placements the host draws the model at.
    #[must_use]
    pub fn positions(&self) -> &[DAffine3] {
        &self.positions
    }

    /// Replace the instance placements. An empty list resets to identity.
    pub fn set_positions(&mut self, positions: Vec<DAffine3>) {
        self.positions = if positions.is_empty() {
            vec![DAffine3::IDENTITY]
        } else {
            positions
        };
    }

    /// Mean atom position, or `None` for an empty model.
    #[must_use]
    pub fn centroid(&self) -> Option<DVec3> {
        if self.atoms.is_empty() {
            return None;
        }
        let sum: DVec3 = self.atoms.iter().map(|a| a.position).sum();
        Some(sum / self.atoms.len() as f64)
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for an empty model.
    #[must_use]
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let first = self.atoms.first()?.position;
        Some(self.atoms.iter().fold((first, first), |(lo, hi), a| {
            (lo.min(a.position), hi.max(a.position))
        }))
    }

    /// Independent duplicate with every atom displayed and the model
    /// hidden.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            atoms: self.atoms.clone(),
            residues: self.residues.clone(),
            atom_residue: self.atom_residue.clone(),
            displays: vec![true; self.atoms.len()],
            shown: false,
            positions: vec![DAffine3::IDENTITY],
            revision: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelStore
// ---------------------------------------------------------------------------

/// Identifier of a node in a [`ModelStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u32);

/// What a node holds.
#[derive(Debug, Clone)]
pub enum ModelKind {
    /// An atomic structure.
    Atomic(AtomicModel),
    /// A grouping node with no content of its own.
    Group,
}

#[derive(Debug, Clone)]
struct ModelNode {
    name: String,
    parent: Option<ModelId>,
    children: Vec<ModelId>,
    kind: ModelKind,
}

/// Id-keyed model tree.
#[derive(Debug, Default)]
pub struct ModelStore {
    nodes: FxHashMap<ModelId, ModelNode>,
    next_id: u32,
}

impl ModelStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: &str, parent: Option<ModelId>, kind: ModelKind) -> ModelId {
        let id = ModelId(self.next_id);
        self.next_id += 1;
        let _ = self.nodes.insert(
            id,
            ModelNode {
                name: name.to_owned(),
                parent,
                children: Vec::new(),
                kind,
            },
        );
        id
    }

    /// Add a top-level node.
    pub fn add(&mut self, name: &str, kind: ModelKind) -> ModelId {
        self.insert(name, None, kind)
    }

    /// Add a node under `parent`.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if `parent` no longer exists.
    pub fn add_child(
        &mut self,
        parent: ModelId,
        name: &str,
        kind: ModelKind,
    ) -> Result<ModelId, XtalError> {
        if !self.nodes.contains_key(&parent) {
            return Err(XtalError::StaleReference(format!(
                "parent model {parent:?} was deleted"
            )));
        }
        let id = self.insert(name, Some(parent), kind);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Whether `id` is still alive.
    #[must_use]
    pub fn contains(&self, id: ModelId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node name.
    #[must_use]
    pub fn name(&self, id: ModelId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    /// Parent of `id`, if any.
    #[must_use]
    pub fn parent(&self, id: ModelId) -> Option<ModelId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Children of `id` in insertion order.
    #[must_use]
    pub fn children(&self, id: ModelId) -> &[ModelId] {
        self.nodes.get(&id).map_or(&[], |n| n.children.as_slice())
    }

    /// Node content.
    #[must_use]
    pub fn get(&self, id: ModelId) -> Option<&ModelKind> {
        self.nodes.get(&id).map(|n| &n.kind)
    }

    /// Atomic model at `id`.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the node is gone or is not atomic.
    pub fn atomic(&self, id: ModelId) -> Result<&AtomicModel, XtalError> {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(ModelKind::Atomic(m)) => Ok(m),
            _ => Err(XtalError::StaleReference(format!(
                "atomic model {id:?} no longer exists"
            ))),
        }
    }

    /// Mutable atomic model at `id`.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the node is gone or is not atomic.
    pub fn atomic_mut(&mut self, id: ModelId) -> Result<&mut AtomicModel, XtalError> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(ModelKind::Atomic(m)) => Ok(m),
            _ => Err(XtalError::StaleReference(format!(
                "atomic model {id:?} no longer exists"
            ))),
        }
    }

    /// Remove `id` and its whole subtree. Returns `false` if it was
    /// already gone.
    pub fn remove(&mut self, id: ModelId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|&c| c != id);
        }
        let mut stack = node.children;
        while let Some(child) = stack.pop() {
            if let Some(n) = self.nodes.remove(&child) {
                stack.extend(n.children);
            }
        }
        true
    }
}
