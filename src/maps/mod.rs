//! Density maps displayed in a box that follows the viewpoint.
//!
//! A [`MapHandler`] listens to box notifications, uses the
//! [`MapBoxResampler`] to pull the box out of its [`DensitySource`] and
//! pushes the result into a host volume through [`VolumeDisplay`].

/// Per-map box listener and host volume.
pub mod handler;
/// Box-shaped buffer allocation and filling.
pub mod resampler;
/// Density sources.
pub mod source;
/// Dense volume buffers.
pub mod volume;

pub use handler::{MapHandler, MapSpec, VolumeDisplay, VolumeModel};
pub use resampler::MapBoxResampler;
pub use source::{DensitySource, MapStats, PeriodicMap};
pub use volume::VolumeBuffer;
