use glam::IVec3;

use crate::crystal::GridCoord;

/// What a candidate box update requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxChange {
    /// Viewpoint still on the same grid point and box shape unchanged.
    None,
    /// Same shape, new position: refill in place.
    Reposition,
    /// New shape: reallocate and refill.
    Reshape,
}

impl BoxChange {
    /// Whether any work is needed.
    #[must_use]
    pub fn is_some(self) -> bool {
        self != Self::None
    }
}

/// Classify a candidate update.
///
/// `new_center` is the grid point nearest the new viewpoint. With no
/// previous shape (`last_dims == None`) the result is always
/// [`BoxChange::Reshape`]. `force` skips the stationary short-circuit.
#[must_use]
pub fn classify(
    new_center: GridCoord,
    last_center: Option<GridCoord>,
    new_dims: IVec3,
    last_dims: Option<IVec3>,
    force: bool,
) -> BoxChange {
    if last_dims != Some(new_dims) {
        return BoxChange::Reshape;
    }
    if !force && last_center == Some(new_center) {
        return BoxChange::None;
    }
    BoxChange::Reposition
}
