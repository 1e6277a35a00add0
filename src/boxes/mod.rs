//! Grid boxes that follow the viewpoint.
//!
//! [`geometry`] computes boxes, [`detector`] classifies candidate updates
//! and [`controller`] drives both off the frame loop.

/// Live-scroll state machine and channel notifications.
pub mod controller;
/// Change classification.
pub mod detector;
/// Pure box geometry.
pub mod geometry;
/// Applied box state.
pub mod state;

pub use controller::{
    BoxListener, BoxNotification, ChannelId, LiveScrollController, ScrollMode,
};
pub use detector::{classify, BoxChange};
pub use geometry::{bounding_box, box_for_sphere, grid_padding, GridBox};
pub use state::BoxState;
