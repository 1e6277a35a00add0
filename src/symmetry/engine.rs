//! Live display of symmetry copies around the viewpoint.
//!
//! Each accepted tick boxes a sphere around the center of rotation, asks the
//! [`SymmetryProvider`] which operators place a copy of the reference model
//! in that box, resolves each operator to a model through the
//! [`SymmetryCopyCache`] and runs a single batched proximity query over all
//! of them. Copies with atoms inside the sphere are shown with whole
//! residues unmasked; the rest are hidden but stay cached.
//!
//! The operator search samples the box on a stride derived from the
//! reference model's extent, so a copy that only grazes the box between
//! two samples can be missed. Large boxes sample more coarsely still.

use std::collections::BTreeSet;

use glam::{DAffine3, DVec3};

use super::cache::SymmetryCopyCache;
use super::model::{AtomicModel, ModelId, ModelStore};
use super::proximity::find_close_points_sets;
use crate::boxes::{bounding_box, box_for_sphere, GridBox};
use crate::crystal::{Cell, GridCoord, GridSampling, OrthCoord, SymmetryOperator, SymmetryProvider};
use crate::error::XtalError;
use crate::events::{EventBus, EventChannel, SubscriptionHandle};
use crate::options::SymmetryOptions;

/// Outcome of one symmetry update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymmetryUpdate {
    /// Operators intersecting the box, in provider order.
    pub operators: Vec<SymmetryOperator>,
    /// Models shown after the update, in operator order.
    pub displayed: Vec<ModelId>,
    /// Models hidden by the update.
    pub hidden: Vec<ModelId>,
}

/// Atoms of one symmetry copy found by [`SymmetryExpansionEngine::sym_select_within`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetrySelection {
    /// Operator placing the copy.
    pub operator: SymmetryOperator,
    /// Model holding the copy (the reference for the identity).
    pub model: ModelId,
    /// Indices of the selected atoms.
    pub atoms: Vec<usize>,
}

/// Maintains the visible symmetry copies of one reference model.
pub struct SymmetryExpansionEngine<P> {
    provider: P,
    cell: Cell,
    grid: GridSampling,
    cache: SymmetryCopyCache,
    options: SymmetryOptions,
    radius: Option<f64>,
    initialized: bool,
    deleted: bool,
    subscription: Option<SubscriptionHandle>,
    last_center: Option<GridCoord>,
    /// Forces the next tick regardless of movement.
    dirty: bool,
    large_scale: bool,
}

impl<P: SymmetryProvider> SymmetryExpansionEngine<P> {
    /// Engine for copies of `reference`, a model in the session's store.
    #[must_use]
    pub fn new(
        provider: P,
        cell: Cell,
        grid: GridSampling,
        reference: ModelId,
        options: SymmetryOptions,
    ) -> Self {
        let cache = SymmetryCopyCache::new(cell, reference, options.dim_colors_to);
        Self {
            provider,
            cell,
            grid,
            cache,
            options,
            radius: None,
            initialized: false,
            deleted: false,
            subscription: None,
            last_center: None,
            dirty: false,
            large_scale: false,
        }
    }

    fn ensure_alive(&self) -> Result<(), XtalError> {
        if self.deleted {
            return Err(XtalError::Configuration(
                "symmetry display has been deleted".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_radius(radius: f64) -> Result<(), XtalError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(XtalError::Configuration(format!(
                "symmetry radius must be positive, got {radius}"
            )));
        }
        Ok(())
    }

    // -- Lifecycle --

    /// Start showing copies within `radius` Å of the viewpoint and apply
    /// the first update at `center`.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if already initialized, for a
    /// non-positive radius or after deletion. Errors from the first update
    /// are returned and leave the engine uninitialized.
    pub fn initialize_symmetry_display(
        &mut self,
        bus: &mut EventBus,
        store: &mut ModelStore,
        center: OrthCoord,
        radius: f64,
    ) -> Result<SymmetryUpdate, XtalError> {
        self.ensure_alive()?;
        if self.initialized {
            return Err(XtalError::Configuration(
                "symmetry display is already initialized; stop it first".to_owned(),
            ));
        }
        Self::validate_radius(radius)?;
        let previous_radius = self.radius.replace(radius);
        let update = match self.update(store, center, radius, self.options.always_show_reference) {
            Ok(u) => u,
            Err(e) => {
                self.radius = previous_radius;
                return Err(e);
            }
        };
        self.last_center = Some(center.to_grid(&self.cell, &self.grid));
        self.dirty = false;
        self.subscription = Some(bus.subscribe(EventChannel::NewFrame));
        self.initialized = true;
        log::info!(
            "symmetry display started: radius {radius} Å, {} operators",
            update.operators.len()
        );
        Ok(update)
    }

    /// Stop following the viewpoint and hide every copy. Copies stay
    /// cached.
    pub fn stop_symmetry_display(&mut self, bus: &mut EventBus, store: &mut ModelStore) {
        let was_live = self.initialized;
        self.detach(bus);
        let ids: Vec<ModelId> = self.cache.items().map(|(_, id)| id).collect();
        for id in ids {
            if let Ok(m) = store.atomic_mut(id) {
                m.set_shown(false);
            }
        }
        if was_live {
            log::info!("symmetry display stopped");
        }
    }

    /// Tear down: unsubscribe and destroy every copy. Terminal.
    pub fn delete(&mut self, bus: &mut EventBus, store: &mut ModelStore) {
        if let Some(handle) = self.subscription.take() {
            let _ = bus.unsubscribe(handle);
        }
        self.cache.clear(store);
        self.initialized = false;
        self.deleted = true;
        log::info!("symmetry display deleted");
    }

    /// Current search radius, if one was ever set.
    #[must_use]
    pub fn sym_box_radius(&self) -> Option<f64> {
        self.radius
    }

    /// Change the search radius. Takes effect on the next tick.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] for a non-positive radius or after
    /// deletion.
    pub fn set_sym_box_radius(&mut self, radius: f64) -> Result<(), XtalError> {
        self.ensure_alive()?;
        Self::validate_radius(radius)?;
        self.radius = Some(radius);
        self.dirty = true;
        Ok(())
    }

    /// Force the next tick to update even if the viewpoint is still.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The reference model's coordinates changed: refresh the provider and
    /// force the next tick. Baked copies are rebuilt lazily by the cache.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the reference was deleted, or the
    /// provider's error.
    pub fn reference_changed(&mut self, store: &ModelStore) -> Result<(), XtalError> {
        let coords = store.atomic(self.cache.reference())?.coords();
        self.provider.reference_moved(&coords)?;
        self.dirty = true;
        Ok(())
    }

    // -- Updates --

    /// Process one frame with the viewpoint at `center`.
    ///
    /// Returns `None` when not live, or when the viewpoint is on the same
    /// grid point as last time and nothing forces an update.
    ///
    /// # Errors
    ///
    /// As [`Self::update`]. Nothing is committed on error, so the next tick
    /// retries. A [`XtalError::StaleReference`] also takes the display
    /// offline: it is returned once and later ticks return `None`.
    pub fn tick(
        &mut self,
        bus: &mut EventBus,
        store: &mut ModelStore,
        center: OrthCoord,
        force: bool,
    ) -> Result<Option<SymmetryUpdate>, XtalError> {
        let Some(radius) = self.radius.filter(|_| self.subscription.is_some()) else {
            return Ok(None);
        };
        let center_grid = center.to_grid(&self.cell, &self.grid);
        if !force && !self.dirty && self.last_center == Some(center_grid) {
            return Ok(None);
        }
        let update = match self.update(store, center, radius, self.options.always_show_reference) {
            Ok(update) => update,
            Err(e) if e.is_stale() => {
                self.detach(bus);
                log::warn!("symmetry display stopped: {e}");
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.last_center = Some(center_grid);
        self.dirty = false;
        Ok(Some(update))
    }

    /// Leave live mode without touching the store.
    fn detach(&mut self, bus: &mut EventBus) {
        if let Some(handle) = self.subscription.take() {
            let _ = bus.unsubscribe(handle);
        }
        self.initialized = false;
        self.last_center = None;
    }

    /// Recompute which copies are visible within `radius` Å of `center`.
    ///
    /// With `always_show_reference` the reference model stays shown even
    /// when none of its atoms are in range.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the reference model was deleted,
    /// or the provider's error.
    pub fn update(
        &mut self,
        store: &mut ModelStore,
        center: OrthCoord,
        radius: f64,
        always_show_reference: bool,
    ) -> Result<SymmetryUpdate, XtalError> {
        let region = box_for_sphere(center, radius, 0, &self.cell, &self.grid);
        let operators = self.operators_in(&region, always_show_reference)?;

        let mut models = Vec::with_capacity(operators.len());
        for op in &operators {
            models.push(self.cache.get(store, op)?);
        }
        let coords = models
            .iter()
            .map(|&id| store.atomic(id).map(AtomicModel::coords))
            .collect::<Result<Vec<_>, _>>()?;
        let sets: Vec<&[DVec3]> = coords.iter().map(Vec::as_slice).collect();
        let hits = find_close_points_sets(&sets, &[center.xyz()], radius);

        let reference = self.cache.reference();
        let mut update = SymmetryUpdate {
            operators,
            ..SymmetryUpdate::default()
        };
        for (&id, indices) in models.iter().zip(&hits) {
            let model = store.atomic_mut(id)?;
            if !indices.is_empty() {
                let mask = model.whole_residue_mask(indices);
                model.set_atom_displays(mask)?;
                model.set_shown(true);
                update.displayed.push(id);
            } else if id == reference {
                if always_show_reference {
                    let all = vec![true; model.num_atoms()];
                    model.set_atom_displays(all)?;
                    model.set_shown(true);
                    update.displayed.push(id);
                }
            } else {
                model.set_shown(false);
                update.hidden.push(id);
            }
        }

        let current: BTreeSet<&SymmetryOperator> = update.operators.iter().collect();
        let stale: Vec<ModelId> = self
            .cache
            .items()
            .filter(|(op, _)| !current.contains(op))
            .map(|(_, id)| id)
            .collect();
        for id in stale {
            let model = store.atomic_mut(id)?;
            if model.is_shown() {
                model.set_shown(false);
                update.hidden.push(id);
            }
        }

        log::debug!(
            "symmetry update: {} operators, {} shown, {} hidden",
            update.operators.len(),
            update.displayed.len(),
            update.hidden.len()
        );
        Ok(update)
    }

    fn operators_in(
        &self,
        region: &GridBox,
        include_identity: bool,
    ) -> Result<Vec<SymmetryOperator>, XtalError> {
        let frequency = self.options.sample_frequency_for(region.dims.max_element());
        self.provider
            .all_symops_in_box(region.corner_xyz, region.dims, include_identity, frequency)
    }

    // -- One-shot queries --

    /// Per symmetry copy (the reference included), the atoms within
    /// `radius` Å of any point in `coords`. Copies with no such atoms are
    /// left out.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the reference model was deleted,
    /// or the provider's error.
    pub fn sym_select_within(
        &mut self,
        store: &mut ModelStore,
        coords: &[DVec3],
        radius: f64,
    ) -> Result<Vec<SymmetrySelection>, XtalError> {
        self.ensure_alive()?;
        let Some(region) = bounding_box(coords, radius.max(0.0), &self.cell, &self.grid) else {
            return Ok(Vec::new());
        };
        let operators = self.operators_in(&region, false)?;
        let mut models = Vec::with_capacity(operators.len());
        for op in &operators {
            models.push(self.cache.get(store, op)?);
        }
        let copy_coords = models
            .iter()
            .map(|&id| store.atomic(id).map(AtomicModel::coords))
            .collect::<Result<Vec<_>, _>>()?;
        let sets: Vec<&[DVec3]> = copy_coords.iter().map(Vec::as_slice).collect();
        let hits = find_close_points_sets(&sets, coords, radius);
        Ok(operators
            .into_iter()
            .zip(models)
            .zip(hits)
            .filter(|(_, atoms)| !atoms.is_empty())
            .map(|((operator, model), atoms)| SymmetrySelection {
                operator,
                model,
                atoms,
            })
            .collect())
    }

    /// Tile the reference model over a cube of edge `box_width` Å centred
    /// on it by giving it one instance placement per intersecting operator.
    /// Returns the number of placements.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] for a non-positive width or after
    /// deletion, [`XtalError::StaleReference`] if the reference was
    /// deleted, or the provider's error.
    pub fn show_large_scale_symmetry(
        &mut self,
        store: &mut ModelStore,
        box_width: f64,
    ) -> Result<usize, XtalError> {
        self.ensure_alive()?;
        Self::validate_radius(box_width)?;
        let reference = self.cache.reference();
        let (lo, hi) = store.atomic(reference)?.bounds().ok_or_else(|| {
            XtalError::Configuration("reference model has no atoms".to_owned())
        })?;
        let center = OrthCoord((lo + hi) * 0.5);
        let region = box_for_sphere(center, box_width / 2.0, 0, &self.cell, &self.grid);
        let operators = self.provider.all_symops_in_box(
            region.corner_xyz,
            region.dims,
            true,
            self.options.sample_frequency_for(region.dims.max_element()),
        )?;
        let placements: Vec<DAffine3> =
            operators.iter().map(|op| op.to_orth(&self.cell)).collect();
        let count = placements.len();
        store.atomic_mut(reference)?.set_positions(placements);
        self.large_scale = true;
        log::info!("large-scale symmetry: {count} placements over {box_width} Å");
        Ok(count)
    }

    /// Return the reference model to its single identity placement.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the reference was deleted.
    pub fn hide_large_scale_symmetry(&mut self, store: &mut ModelStore) -> Result<(), XtalError> {
        store.atomic_mut(self.cache.reference())?.set_positions(Vec::new());
        self.large_scale = false;
        Ok(())
    }

    // -- Accessors --

    /// Whether the display is following the viewpoint.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether the large-scale tiling is applied.
    #[must_use]
    pub fn is_showing_large_scale(&self) -> bool {
        self.large_scale
    }

    /// Per-frame subscription, while live.
    #[must_use]
    pub fn subscription(&self) -> Option<SubscriptionHandle> {
        self.subscription
    }

    /// Grid point of the viewpoint at the last committed update.
    #[must_use]
    pub fn last_center(&self) -> Option<GridCoord> {
        self.last_center
    }

    /// The copy cache.
    #[must_use]
    pub fn cache(&self) -> &SymmetryCopyCache {
        &self.cache
    }

    /// The reference model.
    #[must_use]
    pub fn reference(&self) -> ModelId {
        self.cache.reference()
    }

    /// The operator source.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Symmetry settings in use.
    #[must_use]
    pub fn options(&self) -> &SymmetryOptions {
        &self.options
    }

    /// Whether the reference stays shown outside the search sphere.
    pub fn set_always_show_reference(&mut self, on: bool) {
        self.options.always_show_reference = on;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use std::rc::Rc;

    use super::*;
    use crate::crystal::{Spacegroup, UnitCell};
    use crate::symmetry::model::{Atom, ModelKind};

    type Engine = SymmetryExpansionEngine<UnitCell>;

    /// Two residues around (10, 10, 12) Å in a 40 Å cubic P 1 21 1 cell.
    /// The screw copy lands at `(40 - x, y + 20, 40 - z)`.
    fn setup() -> (Engine, ModelStore, EventBus) {
        setup_with(|uc| uc)
    }

    fn setup_with<P: SymmetryProvider>(
        wrap: impl FnOnce(UnitCell) -> P,
    ) -> (SymmetryExpansionEngine<P>, ModelStore, EventBus) {
        let mut m = AtomicModel::new();
        let _ = m.add_residue(
            "LYS",
            "A",
            1,
            vec![
                Atom::new("N", "N", DVec3::new(8.0, 9.0, 10.0)),
                Atom::new("CA", "C", DVec3::new(12.0, 11.0, 10.0)),
            ],
        );
        let _ = m.add_residue(
            "GLU",
            "A",
            2,
            vec![
                Atom::new("N", "N", DVec3::new(10.0, 10.0, 12.0)),
                Atom::new("CD", "C", DVec3::new(10.0, 10.0, 16.0)),
            ],
        );
        let coords = m.coords();
        let mut store = ModelStore::new();
        let reference = store.add("reference", ModelKind::Atomic(m));
        let cell = Cell::new([40.0, 40.0, 40.0], [90.0, 90.0, 90.0]).unwrap();
        let grid = GridSampling::new(40, 40, 40).unwrap();
        let sg = Spacegroup::from_name("P 1 21 1").unwrap();
        let uc = UnitCell::new(sg, cell, grid, &coords).unwrap();
        let engine = SymmetryExpansionEngine::new(
            wrap(uc),
            cell,
            grid,
            reference,
            SymmetryOptions::default(),
        );
        (engine, store, EventBus::new())
    }

    /// Unit-cell provider that reports an outage while `down` is set.
    struct Flaky {
        inner: UnitCell,
        down: Rc<std::cell::Cell<bool>>,
    }

    impl SymmetryProvider for Flaky {
        fn all_symops_in_box(
            &self,
            corner: OrthCoord,
            dims: glam::IVec3,
            include_identity: bool,
            sample_frequency: u32,
        ) -> Result<Vec<SymmetryOperator>, XtalError> {
            if self.down.get() {
                return Err(XtalError::External("symmetry service offline".to_owned()));
            }
            self.inner
                .all_symops_in_box(corner, dims, include_identity, sample_frequency)
        }
    }

    fn screw(engine: &Engine) -> SymmetryOperator {
        engine.provider().canonical_ops()[1]
    }

    fn assert_whole_residues(store: &ModelStore, ids: &[ModelId]) {
        for &id in ids {
            let m = store.atomic(id).unwrap();
            for res in m.residues() {
                let flags = &m.atom_displays()[res.atoms.clone()];
                assert!(
                    flags.iter().all(|&f| f) || flags.iter().all(|&f| !f),
                    "partial residue {} in {id:?}",
                    res.number
                );
            }
        }
    }

    #[test]
    fn only_reference_in_box_shows_reference_and_caches_nothing() {
        let (mut engine, mut store, _) = setup();
        let reference = engine.reference();
        let update = engine
            .update(&mut store, OrthCoord::new(10.0, 10.0, 12.0), 3.0, true)
            .unwrap();
        assert_eq!(update.operators, vec![SymmetryOperator::IDENTITY]);
        assert_eq!(update.displayed, vec![reference]);
        assert!(engine.cache().is_empty());
        assert!(store.atomic(reference).unwrap().is_shown());
    }

    #[test]
    fn reference_stays_shown_when_forced_in_an_empty_box() {
        let (mut engine, mut store, _) = setup();
        let reference = engine.reference();
        let update = engine
            .update(&mut store, OrthCoord::new(20.0, 0.0, 20.0), 1.5, true)
            .unwrap();
        assert_eq!(update.operators, vec![SymmetryOperator::IDENTITY]);
        assert_eq!(update.displayed, vec![reference]);
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn partial_residues_are_shown_whole() {
        let (mut engine, mut store, _) = setup();
        let reference = engine.reference();
        let _ = engine
            .update(&mut store, OrthCoord::new(10.0, 10.0, 11.0), 1.5, true)
            .unwrap();
        assert_eq!(
            store.atomic(reference).unwrap().atom_displays(),
            &[false, false, true, true]
        );
    }

    #[test]
    fn copies_in_range_are_shown_and_others_hidden() {
        let (mut engine, mut store, _) = setup();
        let reference = engine.reference();
        let update = engine
            .update(&mut store, OrthCoord::new(20.0, 20.0, 20.0), 16.0, true)
            .unwrap();
        assert!(update.operators.contains(&screw(&engine)));
        let copy = engine
            .cache()
            .items()
            .find(|(op, _)| **op == screw(&engine))
            .map(|(_, id)| id)
            .unwrap();
        assert!(update.displayed.contains(&reference));
        assert!(update.displayed.contains(&copy));
        // Atoms 1 and 3 of the reference are in range, one per residue.
        assert_eq!(store.atomic(reference).unwrap().atom_displays(), &[true; 4]);
        assert_eq!(store.atomic(copy).unwrap().atom_displays(), &[false, false, true, true]);
        assert_whole_residues(&store, &update.displayed);
        for id in &update.hidden {
            assert!(!store.atomic(*id).unwrap().is_shown());
        }

        // Moving away hides the copy but keeps it cached.
        let cached = engine.cache().len();
        let update = engine
            .update(&mut store, OrthCoord::new(10.0, 10.0, 11.0), 1.5, true)
            .unwrap();
        assert!(!update.displayed.contains(&copy));
        assert!(!store.atomic(copy).unwrap().is_shown());
        assert_eq!(engine.cache().len(), cached);
    }

    #[test]
    fn zero_radius_shows_at_most_the_reference() {
        let (mut engine, mut store, _) = setup();
        let update = engine
            .update(&mut store, OrthCoord::new(20.0, 20.0, 20.0), 0.0, false)
            .unwrap();
        assert!(update.displayed.is_empty());
        let update = engine
            .update(&mut store, OrthCoord::new(20.0, 20.0, 20.0), 0.0, true)
            .unwrap();
        assert_eq!(update.displayed, vec![engine.reference()]);
    }

    #[test]
    fn displayed_masks_never_split_residues() {
        let (mut engine, mut store, _) = setup();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..40 {
            let center = OrthCoord::new(
                rng.random_range(-10.0..50.0),
                rng.random_range(-10.0..50.0),
                rng.random_range(-10.0..50.0),
            );
            let radius = rng.random_range(1.0..14.0);
            let update = engine.update(&mut store, center, radius, true).unwrap();
            assert_whole_residues(&store, &update.displayed);
            let again = engine.update(&mut store, center, radius, true).unwrap();
            assert_eq!(update.operators, again.operators);
            assert_eq!(update.displayed, again.displayed);
        }
    }

    #[test]
    fn initialization_validates_and_subscribes() {
        let (mut engine, mut store, mut bus) = setup();
        let center = OrthCoord::new(10.0, 10.0, 12.0);
        assert!(engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 0.0)
            .is_err());
        assert!(!engine.is_live());
        let _ = engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 5.0)
            .unwrap();
        assert!(engine.is_live());
        assert_eq!(engine.sym_box_radius(), Some(5.0));
        assert!(matches!(
            engine.initialize_symmetry_display(&mut bus, &mut store, center, 5.0),
            Err(XtalError::Configuration(_))
        ));
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 1);
    }

    #[test]
    fn ticks_skip_a_still_viewpoint_unless_forced_or_dirty() {
        let (mut engine, mut store, mut bus) = setup();
        let center = OrthCoord::new(10.0, 10.0, 12.0);
        let _ = engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 5.0)
            .unwrap();
        assert!(engine.tick(&mut bus, &mut store, center, false).unwrap().is_none());
        assert!(engine
            .tick(&mut bus, &mut store, OrthCoord::new(10.2, 10.1, 12.0), false)
            .unwrap()
            .is_none());
        assert!(engine.tick(&mut bus, &mut store, center, true).unwrap().is_some());

        engine.set_sym_box_radius(8.0).unwrap();
        assert!(engine.set_sym_box_radius(-1.0).is_err());
        assert!(engine.tick(&mut bus, &mut store, center, false).unwrap().is_some());
        assert!(engine.tick(&mut bus, &mut store, center, false).unwrap().is_none());

        assert!(engine
            .tick(&mut bus, &mut store, OrthCoord::new(11.5, 10.0, 12.0), false)
            .unwrap()
            .is_some());
    }

    #[test]
    fn stop_hides_copies_and_allows_reinitialization() {
        let (mut engine, mut store, mut bus) = setup();
        let center = OrthCoord::new(20.0, 20.0, 20.0);
        let _ = engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 16.0)
            .unwrap();
        assert!(!engine.cache().is_empty());
        engine.stop_symmetry_display(&mut bus, &mut store);
        assert!(!engine.is_live());
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 0);
        for (_, id) in engine.cache().items() {
            assert!(!store.atomic(id).unwrap().is_shown());
        }
        assert!(engine.tick(&mut bus, &mut store, center, true).unwrap().is_none());
        assert!(engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 16.0)
            .is_ok());
    }

    #[test]
    fn delete_destroys_copies_and_is_terminal() {
        let (mut engine, mut store, mut bus) = setup();
        let center = OrthCoord::new(20.0, 20.0, 20.0);
        let _ = engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 16.0)
            .unwrap();
        engine.delete(&mut bus, &mut store);
        assert!(engine.cache().is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 0);
        assert!(engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 16.0)
            .is_err());
    }

    #[test]
    fn deleted_reference_surfaces_as_stale() {
        let (mut engine, mut store, _) = setup();
        let _ = engine
            .update(&mut store, OrthCoord::new(20.0, 20.0, 20.0), 16.0, true)
            .unwrap();
        assert!(store.remove(engine.reference()));
        let err = engine
            .update(&mut store, OrthCoord::new(20.0, 20.0, 20.0), 16.0, true)
            .unwrap_err();
        assert!(err.is_stale());
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn selection_reports_atoms_per_copy() {
        let (mut engine, mut store, _) = setup();
        let found = engine
            .sym_select_within(&mut store, &[DVec3::new(30.0, 30.0, 24.5)], 1.0)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].operator, screw(&engine));
        assert_eq!(found[0].atoms, vec![3]);
        assert!(engine.sym_select_within(&mut store, &[], 5.0).unwrap().is_empty());
    }

    #[test]
    fn large_scale_tiling_sets_and_resets_placements() {
        let (mut engine, mut store, _) = setup();
        let reference = engine.reference();
        let n = engine.show_large_scale_symmetry(&mut store, 100.0).unwrap();
        assert!(n > 2);
        let positions = store.atomic(reference).unwrap().positions();
        assert_eq!(positions.len(), n);
        assert!(positions[0].abs_diff_eq(DAffine3::IDENTITY, 1e-12));
        assert!(engine.is_showing_large_scale());
        assert!(engine.show_large_scale_symmetry(&mut store, 0.0).is_err());

        engine.hide_large_scale_symmetry(&mut store).unwrap();
        assert_eq!(store.atomic(reference).unwrap().positions(), &[DAffine3::IDENTITY]);
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn moved_reference_rebuilds_copies() {
        let (mut engine, mut store, _) = setup();
        let center = OrthCoord::new(20.0, 20.0, 20.0);
        let _ = engine.update(&mut store, center, 16.0, true).unwrap();
        let created = engine.cache().created_count();
        let moved: Vec<DVec3> = store
            .atomic(engine.reference())
            .unwrap()
            .coords()
            .iter()
            .map(|p| *p + DVec3::new(0.5, 0.0, 0.0))
            .collect();
        store
            .atomic_mut(engine.reference())
            .unwrap()
            .set_coords(&moved)
            .unwrap();
        engine.reference_changed(&store).unwrap();
        let _ = engine.update(&mut store, center, 16.0, true).unwrap();
        assert!(engine.cache().created_count() > created);
    }

    #[test]
    fn forced_reference_is_shown_whole_after_leaving_range() {
        let (mut engine, mut store, _) = setup();
        let reference = engine.reference();
        let _ = engine
            .update(&mut store, OrthCoord::new(10.0, 10.0, 11.0), 1.5, true)
            .unwrap();
        assert_eq!(
            store.atomic(reference).unwrap().atom_displays(),
            &[false, false, true, true]
        );
        let update = engine
            .update(&mut store, OrthCoord::new(20.0, 0.0, 20.0), 1.5, true)
            .unwrap();
        assert_eq!(update.displayed, vec![reference]);
        assert_eq!(store.atomic(reference).unwrap().atom_displays(), &[true; 4]);
    }

    #[test]
    fn deleted_reference_takes_the_display_offline_once() {
        let (mut engine, mut store, mut bus) = setup();
        let center = OrthCoord::new(20.0, 20.0, 20.0);
        let _ = engine
            .initialize_symmetry_display(&mut bus, &mut store, center, 16.0)
            .unwrap();
        assert!(store.remove(engine.reference()));

        let err = engine
            .tick(&mut bus, &mut store, OrthCoord::new(22.0, 20.0, 20.0), false)
            .unwrap_err();
        assert!(err.is_stale());
        assert!(!engine.is_live());
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 0);
        for x in [23.0, 25.0, 27.0] {
            assert!(engine
                .tick(&mut bus, &mut store, OrthCoord::new(x, 20.0, 20.0), true)
                .unwrap()
                .is_none());
        }
    }

    #[test]
    fn provider_failure_leaves_center_uncommitted_and_retries() {
        let down = Rc::new(std::cell::Cell::new(false));
        let flag = Rc::clone(&down);
        let (mut engine, mut store, mut bus) = setup_with(move |inner| Flaky { inner, down: flag });
        let start = OrthCoord::new(10.0, 10.0, 12.0);
        let _ = engine
            .initialize_symmetry_display(&mut bus, &mut store, start, 5.0)
            .unwrap();
        let committed = engine.last_center();
        assert_eq!(committed, Some(GridCoord::new(10, 10, 12)));

        down.set(true);
        let moved = OrthCoord::new(14.0, 10.0, 12.0);
        let err = engine.tick(&mut bus, &mut store, moved, false).unwrap_err();
        assert!(matches!(err, XtalError::External(_)));
        assert_eq!(engine.last_center(), committed);
        assert!(engine.is_live());

        down.set(false);
        assert!(engine.tick(&mut bus, &mut store, moved, false).unwrap().is_some());
        assert_eq!(engine.last_center(), Some(GridCoord::new(14, 10, 12)));
    }
}
