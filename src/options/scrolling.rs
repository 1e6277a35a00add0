use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Live Scrolling", inline)]
#[serde(default)]
/// Live map box around the viewpoint.
pub struct ScrollingOptions {
    /// Radius in Å of the sphere of density kept around the viewpoint.
    #[schemars(title = "Display Radius", range(min = 2.0, max = 50.0), extend("step" = 0.5))]
    pub display_radius: f64,
    /// Extra grid points added on every side of the box.
    #[schemars(title = "Grid Padding", range(min = 0, max = 8))]
    pub grid_pad: i32,
}

impl Default for ScrollingOptions {
    fn default() -> Self {
        Self {
            display_radius: 10.0,
            grid_pad: 1,
        }
    }
}
