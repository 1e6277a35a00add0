//! Live scrolling of a map box around the viewpoint.
//!
//! [`LiveScrollController`] owns the [`BoxState`] for a family of map
//! channels. While live it is subscribed to [`EventChannel::NewFrame`]; each
//! tick recomputes the candidate box, classifies it and notifies every
//! attached channel with either [`BoxNotification::ShapeChanged`] (replace
//! the buffer) or [`BoxNotification::Moved`] (refill in place). A
//! stationary viewpoint produces no notifications at all.
//!
//! Channel failures are isolated: a channel reporting
//! [`XtalError::StaleReference`] or [`XtalError::DimensionMismatch`] is
//! detached and never notified again,
//! while other errors are returned after every channel has been visited and
//! leave the state uncommitted so the next tick retries.

use glam::{DVec3, IVec3};

use super::detector::{classify, BoxChange};
use super::geometry::{bounding_box, box_for_sphere, GridBox};
use super::state::BoxState;
use crate::crystal::{Cell, GridCoord, GridSampling, OrthCoord};
use crate::error::XtalError;
use crate::events::{EventBus, EventChannel, SubscriptionHandle};

/// Extra grid points added past the unit cell when covering whole cells, so
/// tiled copies overlap slightly.
const UNIT_CELL_OVERLAP: i32 = 2;

/// Notification sent to map channels after an accepted box update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxNotification {
    /// The box has new dimensions: replace the buffer.
    ShapeChanged(GridBox),
    /// Same dimensions, new position: refill in place.
    Moved(GridBox),
}

impl BoxNotification {
    /// The box this notification describes.
    #[must_use]
    pub fn region(&self) -> &GridBox {
        match self {
            Self::ShapeChanged(b) | Self::Moved(b) => b,
        }
    }
}

/// Receiver of box notifications.
pub trait BoxListener {
    /// Apply a box update.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the listener's host object is gone
    /// and [`XtalError::DimensionMismatch`] if its buffer is out of step
    /// (the controller then detaches it); anything else is treated as a
    /// retryable failure of this tick.
    fn box_changed(
        &mut self,
        notification: &BoxNotification,
    ) -> Result<(), XtalError>;
}

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollMode {
    /// No box established yet.
    Uninitialized,
    /// Following the viewpoint every frame.
    Live,
    /// Box fixed; not subscribed to frames.
    Static,
    /// Torn down. Terminal.
    Deleted,
}

/// Identifier of a registered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

struct Channel<L> {
    id: ChannelId,
    listener: L,
    detached: bool,
}

/// Drives one family of map channels off the viewpoint.
pub struct LiveScrollController<L> {
    cell: Cell,
    grid: GridSampling,
    radius: f64,
    pad: i32,
    mode: ScrollMode,
    state: BoxState,
    subscription: Option<SubscriptionHandle>,
    channels: Vec<Channel<L>>,
    next_channel: u64,
}

impl<L: BoxListener> LiveScrollController<L> {
    /// Controller for maps sampled on `grid` in `cell`. Nothing is
    /// displayed until live scrolling starts or a static box is set.
    #[must_use]
    pub fn new(cell: Cell, grid: GridSampling) -> Self {
        Self {
            cell,
            grid,
            radius: 0.0,
            pad: 0,
            mode: ScrollMode::Uninitialized,
            state: BoxState::default(),
            subscription: None,
            channels: Vec::new(),
            next_channel: 0,
        }
    }

    // -- Channels --

    /// Register a channel. It receives notifications from the next accepted
    /// update on; call [`Self::current_notification`] to bring it up to date
    /// immediately.
    pub fn add_channel(&mut self, listener: L) -> ChannelId {
        let id = ChannelId(self.next_channel);
        self.next_channel += 1;
        self.channels.push(Channel {
            id,
            listener,
            detached: false,
        });
        id
    }

    /// Unregister and return a channel.
    pub fn remove_channel(&mut self, id: ChannelId) -> Option<L> {
        let pos = self.channels.iter().position(|c| c.id == id)?;
        Some(self.channels.remove(pos).listener)
    }

    /// Borrow a channel's listener.
    #[must_use]
    pub fn channel(&self, id: ChannelId) -> Option<&L> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .map(|c| &c.listener)
    }

    /// Mutably borrow a channel's listener.
    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut L> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .map(|c| &mut c.listener)
    }

    /// Registered channel ids in registration order.
    #[must_use]
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|c| c.id).collect()
    }

    /// Whether a channel was detached after its host object went away.
    #[must_use]
    pub fn is_detached(&self, id: ChannelId) -> bool {
        self.channels.iter().any(|c| c.id == id && c.detached)
    }

    /// A shape notification for the current box, if one is established.
    #[must_use]
    pub fn current_notification(&self) -> Option<BoxNotification> {
        self.state.region.map(BoxNotification::ShapeChanged)
    }

    // -- Lifecycle --

    fn ensure_alive(&self) -> Result<(), XtalError> {
        if self.mode == ScrollMode::Deleted {
            return Err(XtalError::Configuration(
                "map box controller has been deleted".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_radius(radius: f64) -> Result<(), XtalError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(XtalError::Configuration(format!(
                "display radius must be positive, got {radius}"
            )));
        }
        Ok(())
    }

    /// Start following the viewpoint with a sphere of `radius` Å padded by
    /// `pad` grid points, and apply the first box at `center`.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if already live, if `radius` is not
    /// positive, if no channel is registered or after deletion. Errors from
    /// the first update are returned and leave the controller unsubscribed.
    pub fn initialize_live_scrolling(
        &mut self,
        bus: &mut EventBus,
        center: OrthCoord,
        radius: f64,
        pad: i32,
    ) -> Result<(), XtalError> {
        self.ensure_alive()?;
        if self.subscription.is_some() {
            return Err(XtalError::Configuration(
                "live scrolling is already initialized".to_owned(),
            ));
        }
        Self::validate_radius(radius)?;
        if self.channels.is_empty() {
            return Err(XtalError::Configuration(
                "no map channels registered".to_owned(),
            ));
        }
        self.radius = radius;
        self.pad = pad.max(0);
        let handle = bus.subscribe(EventChannel::NewFrame);
        self.subscription = Some(handle);
        let previous = self.mode;
        self.mode = ScrollMode::Live;
        if let Err(e) = self.tick(center, true) {
            let _ = bus.unsubscribe(handle);
            self.subscription = None;
            self.mode = previous;
            return Err(e);
        }
        log::info!("live scrolling started: radius {radius} Å, pad {pad}");
        Ok(())
    }

    /// Resume following the viewpoint with the stored radius. A no-op
    /// returning [`BoxChange::None`] if already live.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if live scrolling was never initialized
    /// or the controller was deleted; otherwise as [`Self::tick`].
    pub fn start_live_scrolling(
        &mut self,
        bus: &mut EventBus,
        center: OrthCoord,
    ) -> Result<BoxChange, XtalError> {
        self.ensure_alive()?;
        if self.subscription.is_some() {
            return Ok(BoxChange::None);
        }
        Self::validate_radius(self.radius)?;
        self.subscription = Some(bus.subscribe(EventChannel::NewFrame));
        self.mode = ScrollMode::Live;
        log::info!("live scrolling resumed");
        self.tick(center, true)
    }

    /// Stop following the viewpoint. The current box stays in place.
    pub fn stop_live_scrolling(&mut self, bus: &mut EventBus) {
        if let Some(handle) = self.subscription.take() {
            let _ = bus.unsubscribe(handle);
        }
        if self.mode == ScrollMode::Live {
            self.mode = if self.state.is_established() {
                ScrollMode::Static
            } else {
                ScrollMode::Uninitialized
            };
            log::info!("live scrolling stopped");
        }
    }

    /// Tear down: unsubscribe and drop every channel. Terminal.
    pub fn delete(&mut self, bus: &mut EventBus) {
        if let Some(handle) = self.subscription.take() {
            let _ = bus.unsubscribe(handle);
        }
        self.channels.clear();
        self.mode = ScrollMode::Deleted;
        log::info!("map box controller deleted");
    }

    // -- Updates --

    /// Process one frame with the viewpoint at `center`.
    ///
    /// Does nothing unless live. `force` turns a stationary viewpoint into a
    /// reposition.
    ///
    /// # Errors
    ///
    /// The first non-stale channel error, after all channels were
    /// notified. The state is not committed in that case.
    pub fn tick(
        &mut self,
        center: OrthCoord,
        force: bool,
    ) -> Result<BoxChange, XtalError> {
        if self.mode != ScrollMode::Live {
            return Ok(BoxChange::None);
        }
        let candidate =
            box_for_sphere(center, self.radius, self.pad, &self.cell, &self.grid);
        let center_grid = center.to_grid(&self.cell, &self.grid);
        let change = classify(
            center_grid,
            self.state.last_center,
            candidate.dims,
            self.state.dims(),
            force,
        );
        let notification = match change {
            BoxChange::None => return Ok(change),
            BoxChange::Reposition => BoxNotification::Moved(candidate),
            BoxChange::Reshape => BoxNotification::ShapeChanged(candidate),
        };
        self.dispatch(&notification)?;
        self.state.region = Some(candidate);
        self.state.last_center = Some(center_grid);
        log::debug!(
            "map box {change:?}: corner {} dims {}",
            candidate.corner.uvw(),
            candidate.dims
        );
        Ok(change)
    }

    /// Change the display radius. When live the new box is applied at
    /// `center` immediately; otherwise it takes effect on the next start.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] for a non-positive radius or after
    /// deletion; otherwise as [`Self::tick`].
    pub fn set_radius(
        &mut self,
        center: OrthCoord,
        radius: f64,
    ) -> Result<BoxChange, XtalError> {
        self.ensure_alive()?;
        Self::validate_radius(radius)?;
        self.radius = radius;
        self.tick(center, true)
    }

    /// Fix the box to span `min` up to `max` and leave live mode.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] after deletion; channel errors as in
    /// [`Self::tick`].
    pub fn set_box_limits(
        &mut self,
        bus: &mut EventBus,
        min: GridCoord,
        max: GridCoord,
    ) -> Result<GridBox, XtalError> {
        self.ensure_alive()?;
        self.stop_live_scrolling(bus);
        let region = GridBox::from_limits(min, max, &self.cell, &self.grid);
        self.dispatch(&BoxNotification::ShapeChanged(region))?;
        self.state.region = Some(region);
        self.state.last_center = None;
        self.mode = ScrollMode::Static;
        log::info!(
            "static map box: corner {} dims {}",
            region.corner.uvw(),
            region.dims
        );
        Ok(region)
    }

    /// Fix the box around `coords` plus `padding` Å and leave live mode.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if `coords` is empty; otherwise as
    /// [`Self::set_box_limits`].
    pub fn cover_region(
        &mut self,
        bus: &mut EventBus,
        coords: &[DVec3],
        padding: f64,
    ) -> Result<GridBox, XtalError> {
        let region = bounding_box(coords, padding, &self.cell, &self.grid)
            .ok_or_else(|| {
                XtalError::Configuration("no coordinates to cover".to_owned())
            })?;
        self.set_box_limits(bus, region.corner, region.corner + region.dims)
    }

    /// Fix the box to one unit cell (plus a small overlap) and return the
    /// Cartesian origins at which the graphics layer should tile it to show
    /// `nuvw` cells starting `offset` cells from the origin.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if any count in `nuvw` is not
    /// positive; otherwise as [`Self::set_box_limits`].
    pub fn cover_unit_cells(
        &mut self,
        bus: &mut EventBus,
        nuvw: IVec3,
        offset: IVec3,
    ) -> Result<Vec<OrthCoord>, XtalError> {
        if nuvw.min_element() <= 0 {
            return Err(XtalError::Configuration(format!(
                "unit cell counts must be positive, got {nuvw}"
            )));
        }
        let min = self.grid.unit_cell_min();
        let max = self.grid.unit_cell_max() + IVec3::splat(UNIT_CELL_OVERLAP);
        let _ = self.set_box_limits(bus, min, max)?;

        let dim = self.grid.dim();
        let mut origins = Vec::new();
        for i in offset.x..offset.x + nuvw.x {
            for j in offset.y..offset.y + nuvw.y {
                for k in offset.z..offset.z + nuvw.z {
                    let g = GridCoord(IVec3::new(i, j, k) * dim);
                    origins.push(g.to_orth(&self.cell, &self.grid));
                }
            }
        }
        Ok(origins)
    }

    fn dispatch(
        &mut self,
        notification: &BoxNotification,
    ) -> Result<(), XtalError> {
        let mut first_err = None;
        for channel in self.channels.iter_mut().filter(|c| !c.detached) {
            match channel.listener.box_changed(notification) {
                Ok(()) => {}
                Err(e) if e.detaches_channel() => {
                    log::warn!("detaching map channel {:?}: {e}", channel.id);
                    channel.detached = true;
                }
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    // -- Accessors --

    /// Lifecycle state.
    #[must_use]
    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    /// Applied box state.
    #[must_use]
    pub fn state(&self) -> &BoxState {
        &self.state
    }

    /// Display radius in Å.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Padding in grid points.
    #[must_use]
    pub fn pad(&self) -> i32 {
        self.pad
    }

    /// Frame subscription, present while live.
    #[must_use]
    pub fn subscription(&self) -> Option<SubscriptionHandle> {
        self.subscription
    }

    /// The crystallographic cell.
    #[must_use]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    /// The grid sampling.
    #[must_use]
    pub fn grid(&self) -> &GridSampling {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        log: Rc<RefCell<Vec<BoxNotification>>>,
        fail_with: Option<fn() -> XtalError>,
    }

    impl BoxListener for Recorder {
        fn box_changed(
            &mut self,
            notification: &BoxNotification,
        ) -> Result<(), XtalError> {
            if let Some(make) = self.fail_with {
                return Err(make());
            }
            self.log.borrow_mut().push(*notification);
            Ok(())
        }
    }

    fn setup() -> (
        LiveScrollController<Recorder>,
        EventBus,
        Rc<RefCell<Vec<BoxNotification>>>,
    ) {
        let cell = Cell::new([50.0, 50.0, 50.0], [90.0, 90.0, 90.0]).unwrap();
        let grid = GridSampling::new(50, 50, 50).unwrap();
        let mut ctl = LiveScrollController::new(cell, grid);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _ = ctl.add_channel(Recorder {
            log: Rc::clone(&log),
            fail_with: None,
        });
        (ctl, EventBus::new(), log)
    }

    const START: OrthCoord = OrthCoord::new(25.0, 25.0, 25.0);

    #[test]
    fn initialization_requires_radius_and_channels() {
        let cell = Cell::new([50.0, 50.0, 50.0], [90.0, 90.0, 90.0]).unwrap();
        let grid = GridSampling::new(50, 50, 50).unwrap();
        let mut bus = EventBus::new();
        let mut empty: LiveScrollController<Recorder> =
            LiveScrollController::new(cell, grid);
        assert!(matches!(
            empty.initialize_live_scrolling(&mut bus, START, 10.0, 2),
            Err(XtalError::Configuration(_))
        ));

        let (mut ctl, mut bus, _) = setup();
        assert!(ctl.initialize_live_scrolling(&mut bus, START, 0.0, 2).is_err());
        assert!(ctl.initialize_live_scrolling(&mut bus, START, -1.0, 2).is_err());
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 0);
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        assert!(ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).is_err());
    }

    #[test]
    fn first_update_is_a_reshape() {
        let (mut ctl, mut bus, log) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        assert_eq!(ctl.mode(), ScrollMode::Live);
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 1);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert!(matches!(log[0], BoxNotification::ShapeChanged(b) if b.dims == IVec3::splat(24)));
    }

    #[test]
    fn stationary_ticks_are_silent_and_leave_state_untouched() {
        let (mut ctl, mut bus, log) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        let before = *ctl.state();
        // Less than one voxel away still rounds to the same grid point.
        let nudged = OrthCoord::new(25.3, 24.8, 25.1);
        assert_eq!(ctl.tick(nudged, false).unwrap(), BoxChange::None);
        assert_eq!(ctl.tick(START, false).unwrap(), BoxChange::None);
        assert_eq!(*ctl.state(), before);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn moving_one_and_a_half_voxels_repositions() {
        let (mut ctl, mut bus, log) = setup();
        let start = OrthCoord::new(25.2, 25.0, 25.0);
        ctl.initialize_live_scrolling(&mut bus, start, 10.0, 2).unwrap();
        let dims = ctl.state().dims();
        let moved = OrthCoord::new(26.7, 25.0, 25.0);
        assert_eq!(ctl.tick(moved, false).unwrap(), BoxChange::Reposition);
        assert_eq!(ctl.state().dims(), dims);
        assert_eq!(ctl.state().last_center, Some(GridCoord::new(27, 25, 25)));
        let log = log.borrow();
        assert!(matches!(log[1], BoxNotification::Moved(_)));
        assert_eq!(log[1].region().corner, log[0].region().corner + IVec3::X * 2);
    }

    #[test]
    fn set_radius_reshapes_without_movement() {
        let (mut ctl, mut bus, log) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        assert_eq!(ctl.set_radius(START, 20.0).unwrap(), BoxChange::Reshape);
        assert_eq!(ctl.state().dims(), Some(IVec3::splat(44)));
        assert!(matches!(log.borrow()[1], BoxNotification::ShapeChanged(_)));
        assert!(ctl.set_radius(START, 0.0).is_err());
        assert!((ctl.radius() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_and_start_keep_the_box() {
        let (mut ctl, mut bus, log) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        ctl.stop_live_scrolling(&mut bus);
        assert_eq!(ctl.mode(), ScrollMode::Static);
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 0);
        let far = OrthCoord::new(40.0, 40.0, 40.0);
        assert_eq!(ctl.tick(far, false).unwrap(), BoxChange::None);
        assert!(ctl.state().is_established());

        assert_eq!(
            ctl.start_live_scrolling(&mut bus, far).unwrap(),
            BoxChange::Reposition
        );
        assert_eq!(ctl.mode(), ScrollMode::Live);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn static_boxes_leave_live_mode() {
        let (mut ctl, mut bus, log) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        let region = ctl
            .set_box_limits(&mut bus, GridCoord::new(0, 0, 0), GridCoord::new(10, 20, 30))
            .unwrap();
        assert_eq!(region.dims, IVec3::new(10, 20, 30));
        assert_eq!(ctl.mode(), ScrollMode::Static);
        assert!(ctl.subscription().is_none());
        assert!(matches!(log.borrow().last(), Some(BoxNotification::ShapeChanged(_))));

        let covered = ctl
            .cover_region(&mut bus, &[DVec3::new(10.5, 10.5, 10.5)], 2.0)
            .unwrap();
        assert!(covered.contains(GridCoord::new(10, 10, 10)));
        assert!(ctl.cover_region(&mut bus, &[], 2.0).is_err());
    }

    #[test]
    fn cover_unit_cells_returns_tiling_origins() {
        let (mut ctl, mut bus, _) = setup();
        let origins = ctl
            .cover_unit_cells(&mut bus, IVec3::new(2, 1, 1), IVec3::new(-1, 0, 0))
            .unwrap();
        assert_eq!(origins.len(), 2);
        assert!((origins[0].0 - DVec3::new(-50.0, 0.0, 0.0)).length() < 1e-9);
        assert!(origins[1].0.length() < 1e-9);
        assert_eq!(ctl.state().dims(), Some(IVec3::splat(51)));
        assert!(ctl
            .cover_unit_cells(&mut bus, IVec3::new(0, 1, 1), IVec3::ZERO)
            .is_err());
    }

    #[test]
    fn stale_channel_is_detached_and_others_keep_updating() {
        let (mut ctl, mut bus, log) = setup();
        let stale = ctl.add_channel(Recorder {
            log: Rc::new(RefCell::new(Vec::new())),
            fail_with: Some(|| XtalError::StaleReference("closed".to_owned())),
        });
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        assert!(ctl.is_detached(stale));
        let moved = OrthCoord::new(30.0, 25.0, 25.0);
        assert_eq!(ctl.tick(moved, false).unwrap(), BoxChange::Reposition);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn other_channel_errors_leave_state_uncommitted() {
        let (mut ctl, mut bus, log) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        let failing = ctl.add_channel(Recorder {
            log: Rc::new(RefCell::new(Vec::new())),
            fail_with: Some(|| XtalError::External("fft".to_owned())),
        });
        let before = *ctl.state();
        let moved = OrthCoord::new(30.0, 25.0, 25.0);
        assert!(ctl.tick(moved, false).is_err());
        assert_eq!(*ctl.state(), before);
        // The healthy channel was still notified.
        assert_eq!(log.borrow().len(), 2);
        let _ = ctl.remove_channel(failing);
        assert_eq!(ctl.tick(moved, false).unwrap(), BoxChange::Reposition);
    }

    #[test]
    fn delete_unsubscribes_and_is_terminal() {
        let (mut ctl, mut bus, _) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 10.0, 2).unwrap();
        ctl.delete(&mut bus);
        assert_eq!(ctl.mode(), ScrollMode::Deleted);
        assert_eq!(bus.subscriber_count(EventChannel::NewFrame), 0);
        assert!(ctl.channel_ids().is_empty());
        assert!(ctl.start_live_scrolling(&mut bus, START).is_err());
    }

    #[test]
    fn repeated_identical_ticks_are_idempotent() {
        let mut rng = StdRng::seed_from_u64(3);
        let (mut ctl, mut bus, _) = setup();
        ctl.initialize_live_scrolling(&mut bus, START, 8.0, 1).unwrap();
        for _ in 0..100 {
            let c = OrthCoord::new(
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
            );
            let _ = ctl.tick(c, false).unwrap();
            let after_first = *ctl.state();
            assert_eq!(ctl.tick(c, false).unwrap(), BoxChange::None);
            assert_eq!(*ctl.state(), after_first);
        }
    }
}
