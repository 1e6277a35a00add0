//! The session context: event bus, model tree and crystals.
//!
//! Everything the components share lives here and is passed in
//! explicitly. Each [`Crystal`] pairs one reference model with a
//! map-box controller and a symmetry engine; [`Session::new_frame`] routes
//! the per-frame event to whichever of them is subscribed.

use glam::{DVec3, IVec3};
use web_time::Duration;

use crate::boxes::{BoxChange, BoxListener, ChannelId, GridBox, LiveScrollController};
use crate::crystal::{Cell, GridCoord, GridSampling, OrthCoord, Spacegroup, UnitCell};
use crate::error::XtalError;
use crate::events::{EventBus, EventChannel, SubscriptionHandle};
use crate::maps::{DensitySource, MapBoxResampler, MapHandler, MapSpec, VolumeDisplay};
use crate::options::Options;
use crate::symmetry::{
    AtomicModel, ModelId, ModelKind, ModelStore, SymmetryExpansionEngine,
    SymmetrySelection, SymmetryUpdate,
};
use crate::util::TickTimer;

/// Per-tick cost above which a frame is counted as slow.
const TICK_BUDGET_MS: f64 = 8.0;

/// Identifier of a crystal within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrystalId(u32);

/// A reference model with its symmetry, maps and symmetry display.
pub struct Crystal {
    id: CrystalId,
    name: String,
    cell: Cell,
    grid: GridSampling,
    maps: LiveScrollController<MapHandler>,
    symmetry: SymmetryExpansionEngine<UnitCell>,
    model_subscription: SubscriptionHandle,
}

impl Crystal {
    /// Session-unique id.
    #[must_use]
    pub fn id(&self) -> CrystalId {
        self.id
    }

    /// Display name, e.g. `Crystal (1abc)`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit cell.
    #[must_use]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    /// Map grid sampling.
    #[must_use]
    pub fn grid(&self) -> &GridSampling {
        &self.grid
    }

    /// The reference model.
    #[must_use]
    pub fn reference(&self) -> ModelId {
        self.symmetry.reference()
    }

    /// The map-box controller.
    #[must_use]
    pub fn maps(&self) -> &LiveScrollController<MapHandler> {
        &self.maps
    }

    /// Mutable map-box controller.
    pub fn maps_mut(&mut self) -> &mut LiveScrollController<MapHandler> {
        &mut self.maps
    }

    /// The symmetry engine.
    #[must_use]
    pub fn symmetry(&self) -> &SymmetryExpansionEngine<UnitCell> {
        &self.symmetry
    }

    /// Route one frame to whichever component owns `handle`.
    fn on_frame(
        &mut self,
        handle: SubscriptionHandle,
        bus: &mut EventBus,
        models: &mut ModelStore,
        center: OrthCoord,
        report: &mut FrameReport,
    ) -> Result<(), XtalError> {
        if self.maps.subscription() == Some(handle) {
            let change = self.maps.tick(center, false)?;
            if change.is_some() {
                report.map_changes.push((self.id, change));
            }
        } else if self.symmetry.subscription() == Some(handle) {
            if let Some(update) = self.symmetry.tick(bus, models, center, false)? {
                report.symmetry_updates.push((self.id, update));
            }
        }
        Ok(())
    }
}

fn find_crystal(crystals: &mut [Crystal], id: CrystalId) -> Result<&mut Crystal, XtalError> {
    crystals
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| XtalError::StaleReference(format!("crystal {id:?} was removed")))
}

/// What one frame changed.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Frame counter, starting at 1.
    pub frame: u64,
    /// Accepted map-box updates.
    pub map_changes: Vec<(CrystalId, BoxChange)>,
    /// Symmetry updates that ran.
    pub symmetry_updates: Vec<(CrystalId, SymmetryUpdate)>,
    /// Failed ticks. Other subscribers still ran, and a failed one retries
    /// on the next frame unless its host object is gone.
    pub errors: Vec<(CrystalId, XtalError)>,
    /// Time spent on the frame's work.
    pub cost: Duration,
}

/// Session-scoped state shared by every crystal.
pub struct Session {
    options: Options,
    bus: EventBus,
    models: ModelStore,
    crystals: Vec<Crystal>,
    next_crystal: u32,
    center: OrthCoord,
    frame: u64,
    timer: TickTimer,
}

impl Session {
    /// Empty session.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            options,
            bus: EventBus::new(),
            models: ModelStore::new(),
            crystals: Vec::new(),
            next_crystal: 0,
            center: OrthCoord::default(),
            frame: 0,
            timer: TickTimer::new(TICK_BUDGET_MS),
        }
    }

    // -- Accessors --

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The model tree.
    #[must_use]
    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    /// Mutable model tree, for host-side edits and deletions.
    pub fn models_mut(&mut self) -> &mut ModelStore {
        &mut self.models
    }

    /// Current center of rotation.
    #[must_use]
    pub fn center(&self) -> OrthCoord {
        self.center
    }

    /// Move the center of rotation. Takes effect on the next frame.
    pub fn set_center(&mut self, center: OrthCoord) {
        self.center = center;
    }

    /// Per-frame cost tracker.
    #[must_use]
    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    /// Crystals in creation order.
    #[must_use]
    pub fn crystals(&self) -> &[Crystal] {
        &self.crystals
    }

    /// Look up a crystal.
    #[must_use]
    pub fn crystal(&self, id: CrystalId) -> Option<&Crystal> {
        self.crystals.iter().find(|c| c.id == id)
    }

    // -- Setup --

    /// Add a top-level atomic model.
    pub fn add_model(&mut self, name: &str, model: AtomicModel) -> ModelId {
        self.models.add(name, ModelKind::Atomic(model))
    }

    /// Map grid for `cell` at `resolution` Å using the configured
    /// oversampling.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] for a non-positive resolution.
    pub fn grid_for(&self, cell: &Cell, resolution: f64) -> Result<GridSampling, XtalError> {
        GridSampling::from_resolution(cell, resolution, self.options.crystal.map_oversampling)
    }

    /// Set up symmetry and map handling for the model `reference`.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if `reference` is not a live atomic
    /// model; [`XtalError::Configuration`] if it has no atoms.
    pub fn add_crystal(
        &mut self,
        reference: ModelId,
        spacegroup: Spacegroup,
        cell: Cell,
        grid: GridSampling,
    ) -> Result<CrystalId, XtalError> {
        let coords = self.models.atomic(reference)?.coords();
        let unit_cell = UnitCell::new(spacegroup, cell, grid, &coords)?;
        let name = format!(
            "Crystal ({})",
            self.models.name(reference).unwrap_or("unnamed")
        );
        let id = CrystalId(self.next_crystal);
        self.next_crystal += 1;
        let symmetry = SymmetryExpansionEngine::new(
            unit_cell,
            cell,
            grid,
            reference,
            self.options.symmetry.clone(),
        );
        self.crystals.push(Crystal {
            id,
            name,
            cell,
            grid,
            maps: LiveScrollController::new(cell, grid),
            symmetry,
            model_subscription: self.bus.subscribe(EventChannel::ModelChanged),
        });
        log::info!(
            "added crystal {id:?}: {} atoms, grid {}",
            coords.len(),
            grid.dim()
        );
        Ok(id)
    }

    /// Attach a density map to a crystal's live box. If a box is already
    /// established the new map is filled right away.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] for an unknown crystal or a closed
    /// volume; [`XtalError::Configuration`] for inconsistent display
    /// settings.
    pub fn add_map(
        &mut self,
        crystal: CrystalId,
        name: &str,
        is_difference_map: bool,
        source: Box<dyn DensitySource>,
        volume: Box<dyn VolumeDisplay>,
    ) -> Result<ChannelId, XtalError> {
        let spec = MapSpec::from_options(name, is_difference_map, &self.options.maps);
        let crystal = find_crystal(&mut self.crystals, crystal)?;
        let resampler = MapBoxResampler::new(&crystal.cell, &crystal.grid);
        let mut handler = MapHandler::new(spec, source, resampler, volume)?;
        if let Some(current) = crystal.maps.current_notification() {
            handler.box_changed(&current)?;
        }
        Ok(crystal.maps.add_channel(handler))
    }

    /// Remove a crystal: unsubscribe everything and destroy its symmetry
    /// copies. The reference model stays.
    pub fn remove_crystal(&mut self, id: CrystalId) -> bool {
        let Some(pos) = self.crystals.iter().position(|c| c.id == id) else {
            return false;
        };
        let mut crystal = self.crystals.remove(pos);
        crystal.maps.delete(&mut self.bus);
        crystal.symmetry.delete(&mut self.bus, &mut self.models);
        let _ = self.bus.unsubscribe(crystal.model_subscription);
        log::info!("removed crystal {id:?}");
        true
    }

    // -- Live scrolling --

    /// Start the crystal's map box following the center of rotation with
    /// the configured radius and padding.
    ///
    /// # Errors
    ///
    /// As [`LiveScrollController::initialize_live_scrolling`].
    pub fn initialize_live_scrolling(&mut self, id: CrystalId) -> Result<(), XtalError> {
        let radius = self.options.scrolling.display_radius;
        let pad = self.options.scrolling.grid_pad;
        let center = self.center;
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal
            .maps
            .initialize_live_scrolling(&mut self.bus, center, radius, pad)
    }

    /// Stop the crystal's map box from following the viewpoint.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] for an unknown crystal.
    pub fn stop_live_scrolling(&mut self, id: CrystalId) -> Result<(), XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal.maps.stop_live_scrolling(&mut self.bus);
        Ok(())
    }

    /// Change the map display radius.
    ///
    /// # Errors
    ///
    /// As [`LiveScrollController::set_radius`].
    pub fn set_display_radius(&mut self, id: CrystalId, radius: f64) -> Result<BoxChange, XtalError> {
        let center = self.center;
        find_crystal(&mut self.crystals, id)?.maps.set_radius(center, radius)
    }

    /// Fix the crystal's map box to the grid range `min..max`.
    ///
    /// # Errors
    ///
    /// As [`LiveScrollController::set_box_limits`].
    pub fn set_box_limits(
        &mut self,
        id: CrystalId,
        min: GridCoord,
        max: GridCoord,
    ) -> Result<GridBox, XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal.maps.set_box_limits(&mut self.bus, min, max)
    }

    /// Fix the crystal's map box around `coords` plus `padding` Å.
    ///
    /// # Errors
    ///
    /// As [`LiveScrollController::cover_region`].
    pub fn cover_region(
        &mut self,
        id: CrystalId,
        coords: &[DVec3],
        padding: f64,
    ) -> Result<GridBox, XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal.maps.cover_region(&mut self.bus, coords, padding)
    }

    /// Fix the crystal's map box to one unit cell and return the origins of
    /// an `nuvw` tiling starting `offset` cells away.
    ///
    /// # Errors
    ///
    /// As [`LiveScrollController::cover_unit_cells`].
    pub fn cover_unit_cells(
        &mut self,
        id: CrystalId,
        nuvw: IVec3,
        offset: IVec3,
    ) -> Result<Vec<OrthCoord>, XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal.maps.cover_unit_cells(&mut self.bus, nuvw, offset)
    }

    // -- Symmetry --

    /// Start showing symmetry copies around the center of rotation.
    ///
    /// # Errors
    ///
    /// As [`SymmetryExpansionEngine::initialize_symmetry_display`].
    pub fn initialize_symmetry_display(
        &mut self,
        id: CrystalId,
        radius: Option<f64>,
    ) -> Result<SymmetryUpdate, XtalError> {
        let radius = radius.unwrap_or(self.options.symmetry.radius);
        let center = self.center;
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal
            .symmetry
            .initialize_symmetry_display(&mut self.bus, &mut self.models, center, radius)
    }

    /// Stop the symmetry display and hide every copy.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] for an unknown crystal.
    pub fn stop_symmetry_display(&mut self, id: CrystalId) -> Result<(), XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal
            .symmetry
            .stop_symmetry_display(&mut self.bus, &mut self.models);
        Ok(())
    }

    /// Change the symmetry search radius.
    ///
    /// # Errors
    ///
    /// As [`SymmetryExpansionEngine::set_sym_box_radius`].
    pub fn set_sym_box_radius(&mut self, id: CrystalId, radius: f64) -> Result<(), XtalError> {
        find_crystal(&mut self.crystals, id)?.symmetry.set_sym_box_radius(radius)
    }

    /// Atoms of every symmetry copy within `radius` Å of `coords`.
    ///
    /// # Errors
    ///
    /// As [`SymmetryExpansionEngine::sym_select_within`].
    pub fn sym_select_within(
        &mut self,
        id: CrystalId,
        coords: &[DVec3],
        radius: f64,
    ) -> Result<Vec<SymmetrySelection>, XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal
            .symmetry
            .sym_select_within(&mut self.models, coords, radius)
    }

    /// Tile the reference model over a `box_width` Å cube.
    ///
    /// # Errors
    ///
    /// As [`SymmetryExpansionEngine::show_large_scale_symmetry`].
    pub fn show_large_scale_symmetry(
        &mut self,
        id: CrystalId,
        box_width: f64,
    ) -> Result<usize, XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal
            .symmetry
            .show_large_scale_symmetry(&mut self.models, box_width)
    }

    /// Undo [`Self::show_large_scale_symmetry`].
    ///
    /// # Errors
    ///
    /// As [`SymmetryExpansionEngine::hide_large_scale_symmetry`].
    pub fn hide_large_scale_symmetry(&mut self, id: CrystalId) -> Result<(), XtalError> {
        let crystal = find_crystal(&mut self.crystals, id)?;
        crystal.symmetry.hide_large_scale_symmetry(&mut self.models)
    }

    // -- Events --

    /// Tell subscribers that `model`'s coordinates changed.
    ///
    /// # Errors
    ///
    /// The first error raised by a subscriber; every subscriber is still
    /// notified.
    pub fn notify_model_changed(&mut self, model: ModelId) -> Result<(), XtalError> {
        let handles = self.bus.fire(EventChannel::ModelChanged);
        let mut first_error = None;
        for crystal in &mut self.crystals {
            if !handles.contains(&crystal.model_subscription) || crystal.reference() != model {
                continue;
            }
            if let Err(e) = crystal.symmetry.reference_changed(&self.models) {
                log::warn!("{}: {e}", crystal.name);
                let _ = first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Run one frame at the current center of rotation. Every subscriber
    /// gets its tick; failures are collected in [`FrameReport::errors`].
    pub fn new_frame(&mut self) -> FrameReport {
        self.timer.begin();
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };
        for handle in self.bus.fire(EventChannel::NewFrame) {
            for crystal in &mut self.crystals {
                let result =
                    crystal.on_frame(handle, &mut self.bus, &mut self.models, self.center, &mut report);
                if let Err(e) = result {
                    log::debug!("{} frame {}: {e}", crystal.name, self.frame);
                    report.errors.push((crystal.id, e));
                }
            }
        }
        report.cost = self.timer.end();
        if !report.map_changes.is_empty() || !report.symmetry_updates.is_empty() {
            log::debug!(
                "frame {}: {} map updates, {} symmetry updates in {:?}",
                report.frame,
                report.map_changes.len(),
                report.symmetry_updates.len(),
                report.cost
            );
        }
        report
    }
}
