//! Lazily created symmetry copies of a reference model.
//!
//! Every copy lives in the [`ModelStore`] under a "symmetry equivalents"
//! group parented to the reference model, so deleting the reference takes
//! the copies with it. The cache only remembers ids; whenever one of them
//! has gone stale it is dropped and rebuilt on the next lookup.

use std::collections::BTreeMap;

use super::model::{ModelId, ModelKind, ModelStore};
use crate::crystal::{Cell, SymmetryOperator};
use crate::error::XtalError;

/// Name of the group node holding all copies.
pub const CONTAINER_NAME: &str = "symmetry equivalents";

/// Symmetry copies of one reference model, keyed by operator.
#[derive(Debug)]
pub struct SymmetryCopyCache {
    cell: Cell,
    reference: ModelId,
    container: Option<ModelId>,
    copies: BTreeMap<SymmetryOperator, ModelId>,
    /// Reference revision the baked copies were made from.
    revision: Option<u64>,
    dim_factor: f32,
    created: usize,
}

impl SymmetryCopyCache {
    /// Empty cache for copies of `reference`, with copy colors scaled by
    /// `dim_factor`.
    #[must_use]
    pub fn new(cell: Cell, reference: ModelId, dim_factor: f32) -> Self {
        Self {
            cell,
            reference,
            container: None,
            copies: BTreeMap::new(),
            revision: None,
            dim_factor,
            created: 0,
        }
    }

    /// The reference model.
    #[must_use]
    pub fn reference(&self) -> ModelId {
        self.reference
    }

    /// The group node holding the copies, if it exists.
    #[must_use]
    pub fn container(&self) -> Option<ModelId> {
        self.container
    }

    /// Number of cached copies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    /// Whether no copies are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    /// Total copies built over the cache's lifetime.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Whether a copy for `op` is cached.
    #[must_use]
    pub fn contains(&self, op: &SymmetryOperator) -> bool {
        self.copies.contains_key(op)
    }

    /// Cached `(operator, copy)` pairs in operator order.
    pub fn items(&self) -> impl Iterator<Item = (&SymmetryOperator, ModelId)> + '_ {
        self.copies.iter().map(|(op, &id)| (op, id))
    }

    /// The model showing `op`'s copy of the reference, built on first use.
    ///
    /// The identity resolves to the reference itself and is never cached.
    /// A change in the reference's coordinates drops every baked copy
    /// first.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the reference model was deleted; the
    /// cache is emptied in that case.
    pub fn get(
        &mut self,
        store: &mut ModelStore,
        op: &SymmetryOperator,
    ) -> Result<ModelId, XtalError> {
        let revision = match store.atomic(self.reference) {
            Ok(m) => m.revision(),
            Err(e) => {
                if !self.copies.is_empty() {
                    log::warn!(
                        "reference model deleted; dropping {} symmetry copies",
                        self.copies.len()
                    );
                }
                self.clear(store);
                return Err(e);
            }
        };
        if self.revision != Some(revision) {
            if self.revision.is_some() && !self.copies.is_empty() {
                log::debug!("reference model changed; rebuilding symmetry copies");
                self.clear(store);
            }
            self.revision = Some(revision);
        }
        if op.is_identity() {
            return Ok(self.reference);
        }

        let container = self.ensure_container(store)?;
        if let Some(&id) = self.copies.get(op) {
            if store.contains(id) {
                return Ok(id);
            }
            log::warn!("symmetry copy {op} was deleted; recreating");
            let _ = self.copies.remove(op);
        }

        let mut copy = store.atomic(self.reference)?.duplicate();
        copy.transform(&op.to_orth(&self.cell));
        copy.dim_colors(self.dim_factor);
        let id = store.add_child(container, &op.to_string(), ModelKind::Atomic(copy))?;
        let _ = self.copies.insert(*op, id);
        self.created += 1;
        log::debug!("created symmetry copy {op}");
        Ok(id)
    }

    /// The container node, recreated (with an empty cache) if it is
    /// missing.
    fn ensure_container(&mut self, store: &mut ModelStore) -> Result<ModelId, XtalError> {
        if let Some(id) = self.container.filter(|&id| store.contains(id)) {
            return Ok(id);
        }
        self.copies.clear();
        let id = store.add_child(self.reference, CONTAINER_NAME, ModelKind::Group)?;
        self.container = Some(id);
        Ok(id)
    }

    /// Remove every copy and the container from `store`. Safe on an empty
    /// cache.
    pub fn clear(&mut self, store: &mut ModelStore) {
        if let Some(id) = self.container.take() {
            let _ = store.remove(id);
        }
        for (_, id) in std::mem::take(&mut self.copies) {
            let _ = store.remove(id);
        }
    }
}
