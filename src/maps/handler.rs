//! Per-map display handler: keeps one host volume in step with the box.
//!
//! A [`MapHandler`] is a [`BoxListener`]. On a shape change it allocates a
//! new buffer and hands it to the volume; on a move it refills the existing
//! buffer in place. While the volume is hidden, updates are recorded and
//! applied on the next [`MapHandler::show`].

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use super::resampler::MapBoxResampler;
use super::source::DensitySource;
use super::volume::VolumeBuffer;
use crate::boxes::{BoxListener, BoxNotification, GridBox};
use crate::error::XtalError;
use crate::options::{MapOptions, MapStyle};

/// How a map should be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSpec {
    /// Display name.
    pub name: String,
    /// Drawn with a negative and a positive contour.
    pub is_difference_map: bool,
    /// Mesh or surface.
    pub style: MapStyle,
    /// One RGBA per contour.
    pub colors: Vec<[f32; 4]>,
    /// Contour levels in σ, ascending.
    pub contours: Vec<f64>,
}

impl MapSpec {
    /// Spec using the default colors and contours from `options`.
    #[must_use]
    pub fn from_options(
        name: &str,
        is_difference_map: bool,
        options: &MapOptions,
    ) -> Self {
        let style = options.default_style;
        let (colors, contours) = if is_difference_map {
            (
                options.difference_colors.to_vec(),
                options.difference_contours.to_vec(),
            )
        } else {
            let color = match style {
                MapStyle::Mesh => options.mesh_color,
                MapStyle::Surface => options.surface_color,
            };
            (vec![color], vec![options.standard_contour])
        };
        Self {
            name: name.to_owned(),
            is_difference_map,
            style,
            colors,
            contours,
        }
    }

    /// Check colors and contours agree with the map kind.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if a difference map does not have
    /// exactly two colors and two contours, if a standard map has none, or
    /// if the counts differ.
    pub fn validate(&self) -> Result<(), XtalError> {
        if self.is_difference_map
            && (self.colors.len() != 2 || self.contours.len() != 2)
        {
            return Err(XtalError::Configuration(format!(
                "difference map '{}' needs a negative and a positive color \
                 and contour",
                self.name
            )));
        }
        if self.contours.is_empty() || self.colors.len() != self.contours.len()
        {
            return Err(XtalError::Configuration(format!(
                "map '{}' has {} colors for {} contours",
                self.name,
                self.colors.len(),
                self.contours.len()
            )));
        }
        Ok(())
    }
}

/// Host-side volume display primitive.
pub trait VolumeDisplay {
    /// Swap in a buffer of (possibly) new shape and redefine the displayed
    /// region to all of it.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the volume was closed.
    fn replace_data(&mut self, buffer: VolumeBuffer) -> Result<(), XtalError>;

    /// Modify the current buffer in place, then mark its values changed.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the volume was closed; otherwise
    /// whatever `f` returns.
    fn update_data(
        &mut self,
        f: &mut dyn FnMut(&mut VolumeBuffer) -> Result<(), XtalError>,
    ) -> Result<(), XtalError>;

    /// Set contour levels (absolute density), colors and style.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the volume was closed.
    fn set_levels(
        &mut self,
        levels: &[f64],
        colors: &[[f32; 4]],
        style: MapStyle,
    ) -> Result<(), XtalError>;

    /// Whether the volume is shown.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the volume was closed.
    fn display(&self) -> Result<bool, XtalError>;

    /// Show or hide the volume.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the volume was closed.
    fn set_display(&mut self, on: bool) -> Result<(), XtalError>;
}

#[derive(Debug, Default)]
struct VolumeState {
    name: String,
    data: Option<VolumeBuffer>,
    display: bool,
    closed: bool,
    levels: Vec<f64>,
    colors: Vec<[f32; 4]>,
    style: MapStyle,
    data_version: u64,
    replacements: u64,
}

/// Shared handle to an in-process volume. Clones refer to the same volume,
/// so the host can close it while a handler still holds it.
#[derive(Debug, Clone, Default)]
pub struct VolumeModel {
    inner: Rc<RefCell<VolumeState>>,
}

impl VolumeModel {
    /// A shown, empty volume.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VolumeState {
                name: name.to_owned(),
                display: true,
                ..VolumeState::default()
            })),
        }
    }

    /// Close the volume. Every later call through [`VolumeDisplay`] fails
    /// with [`XtalError::StaleReference`].
    pub fn close(&self) {
        let mut state = self.inner.borrow_mut();
        state.closed = true;
        state.data = None;
    }

    /// Whether the volume was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Volume name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Run `f` on the current buffer, if any.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&VolumeBuffer) -> R) -> Option<R> {
        self.inner.borrow().data.as_ref().map(f)
    }

    /// Current contour levels.
    #[must_use]
    pub fn levels(&self) -> Vec<f64> {
        self.inner.borrow().levels.clone()
    }

    /// Current contour colors.
    #[must_use]
    pub fn colors(&self) -> Vec<[f32; 4]> {
        self.inner.borrow().colors.clone()
    }

    /// Current style.
    #[must_use]
    pub fn style(&self) -> MapStyle {
        self.inner.borrow().style
    }

    /// Whether shown, regardless of closure.
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.inner.borrow().display
    }

    /// Bumped on every buffer write.
    #[must_use]
    pub fn data_version(&self) -> u64 {
        self.inner.borrow().data_version
    }

    /// Number of times the buffer was replaced.
    #[must_use]
    pub fn replacements(&self) -> u64 {
        self.inner.borrow().replacements
    }

    fn open(&self) -> Result<RefMut<'_, VolumeState>, XtalError> {
        let state = self.inner.borrow_mut();
        if state.closed {
            return Err(XtalError::StaleReference(format!(
                "volume '{}' was closed",
                state.name
            )));
        }
        Ok(state)
    }
}

impl VolumeDisplay for VolumeModel {
    fn replace_data(&mut self, buffer: VolumeBuffer) -> Result<(), XtalError> {
        let mut state = self.open()?;
        state.data = Some(buffer);
        state.data_version += 1;
        state.replacements += 1;
        Ok(())
    }

    fn update_data(
        &mut self,
        f: &mut dyn FnMut(&mut VolumeBuffer) -> Result<(), XtalError>,
    ) -> Result<(), XtalError> {
        let mut state = self.open()?;
        let name = state.name.clone();
        let buffer = state.data.as_mut().ok_or_else(|| {
            XtalError::Configuration(format!("volume '{name}' has no data"))
        })?;
        f(buffer)?;
        state.data_version += 1;
        Ok(())
    }

    fn set_levels(
        &mut self,
        levels: &[f64],
        colors: &[[f32; 4]],
        style: MapStyle,
    ) -> Result<(), XtalError> {
        let mut state = self.open()?;
        state.levels = levels.to_vec();
        state.colors = colors.to_vec();
        state.style = style;
        Ok(())
    }

    fn display(&self) -> Result<bool, XtalError> {
        Ok(self.open()?.display)
    }

    fn set_display(&mut self, on: bool) -> Result<(), XtalError> {
        self.open()?.display = on;
        Ok(())
    }
}

/// Keeps one volume filled with one map's density inside the current box.
pub struct MapHandler {
    spec: MapSpec,
    source: Box<dyn DensitySource>,
    resampler: MapBoxResampler,
    volume: Box<dyn VolumeDisplay>,
    region: Option<GridBox>,
    needs_update: bool,
    has_data: bool,
}

impl MapHandler {
    /// Handler drawing `source` into `volume` as described by `spec`.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] for an inconsistent spec;
    /// [`XtalError::StaleReference`] if the volume is already closed.
    pub fn new(
        spec: MapSpec,
        source: Box<dyn DensitySource>,
        resampler: MapBoxResampler,
        volume: Box<dyn VolumeDisplay>,
    ) -> Result<Self, XtalError> {
        spec.validate()?;
        let mut handler = Self {
            spec,
            source,
            resampler,
            volume,
            region: None,
            needs_update: true,
            has_data: false,
        };
        handler.apply_levels()?;
        Ok(handler)
    }

    /// Map name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Display parameters.
    #[must_use]
    pub fn spec(&self) -> &MapSpec {
        &self.spec
    }

    /// Last box received.
    #[must_use]
    pub fn region(&self) -> Option<&GridBox> {
        self.region.as_ref()
    }

    /// Whether a shape change arrived while hidden and is still pending.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Contour levels in absolute density units (σ levels times the map's
    /// standard deviation).
    #[must_use]
    pub fn contour_levels(&self) -> Vec<f64> {
        let sigma = self.source.stats().sigma;
        self.spec.contours.iter().map(|c| c * sigma).collect()
    }

    /// Change the σ contour levels.
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if the count does not match the colors;
    /// [`XtalError::StaleReference`] if the volume was closed.
    pub fn set_contours(&mut self, contours: Vec<f64>) -> Result<(), XtalError> {
        let previous = std::mem::replace(&mut self.spec.contours, contours);
        if let Err(e) = self.spec.validate() {
            self.spec.contours = previous;
            return Err(e);
        }
        self.apply_levels()
    }

    /// Switch between mesh and surface.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the volume was closed.
    pub fn set_style(&mut self, style: MapStyle) -> Result<(), XtalError> {
        self.spec.style = style;
        self.apply_levels()
    }

    /// Show the volume, first applying any update deferred while hidden.
    ///
    /// # Errors
    ///
    /// As for box updates.
    pub fn show(&mut self) -> Result<(), XtalError> {
        if let Some(region) = self.region {
            if self.needs_update || !self.has_data {
                self.swap(&region)?;
            } else {
                self.refill(&region)?;
            }
        }
        self.volume.set_display(true)
    }

    /// Hide the volume. Box updates are recorded but not applied.
    ///
    /// # Errors
    ///
    /// [`XtalError::StaleReference`] if the volume was closed.
    pub fn hide(&mut self) -> Result<(), XtalError> {
        self.volume.set_display(false)
    }

    fn apply_levels(&mut self) -> Result<(), XtalError> {
        let levels = self.contour_levels();
        self.volume
            .set_levels(&levels, &self.spec.colors, self.spec.style)
    }

    fn swap(&mut self, region: &GridBox) -> Result<(), XtalError> {
        let buffer = self.resampler.allocate(region, self.source.as_ref())?;
        self.volume.replace_data(buffer)?;
        self.needs_update = false;
        self.has_data = true;
        Ok(())
    }

    fn refill(&mut self, region: &GridBox) -> Result<(), XtalError> {
        let resampler = self.resampler;
        let source = self.source.as_ref();
        let result = self
            .volume
            .update_data(&mut |buf: &mut VolumeBuffer| {
                resampler.fill(buf, region, source)
            });
        if let Err(e @ XtalError::DimensionMismatch { .. }) = &result {
            log::error!("map '{}': {e}", self.spec.name);
        }
        result
    }
}

impl BoxListener for MapHandler {
    fn box_changed(
        &mut self,
        notification: &BoxNotification,
    ) -> Result<(), XtalError> {
        let shown = self.volume.display()?;
        let region = *notification.region();
        self.region = Some(region);
        match notification {
            BoxNotification::ShapeChanged(_) => {
                if shown {
                    self.swap(&region)
                } else {
                    self.needs_update = true;
                    Ok(())
                }
            }
            BoxNotification::Moved(_) => {
                if !shown {
                    Ok(())
                } else if self.needs_update || !self.has_data {
                    self.swap(&region)
                } else {
                    self.refill(&region)
                }
            }
        }
    }
}
