use glam::IVec3;

use super::geometry::GridBox;
use crate::crystal::GridCoord;

/// The applied box and the viewpoint grid point it was applied for.
///
/// Only accepted updates touch this; a stationary tick leaves it exactly as
/// it was.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxState {
    /// Currently applied box, if any.
    pub region: Option<GridBox>,
    /// Viewpoint grid point of the last accepted update.
    pub last_center: Option<GridCoord>,
}

impl BoxState {
    /// Dimensions of the applied box.
    #[must_use]
    pub fn dims(&self) -> Option<IVec3> {
        self.region.map(|r| r.dims)
    }

    /// Whether a box has been established.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.region.is_some()
    }
}
