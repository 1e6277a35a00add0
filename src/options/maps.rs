use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a map is contoured.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MapStyle {
    /// Wire mesh.
    #[default]
    Mesh,
    /// Solid transparent surface.
    Surface,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Maps", inline)]
#[serde(default)]
/// Default contouring and colors for new maps.
pub struct MapOptions {
    /// Contour of a standard map, in σ.
    #[schemars(title = "Standard Contour", range(min = 0.0, max = 10.0), extend("step" = 0.1))]
    pub standard_contour: f64,
    /// Negative and positive contours of a difference map, in σ.
    #[schemars(skip)]
    pub difference_contours: [f64; 2],
    /// RGBA of a standard map drawn as mesh.
    #[schemars(skip)]
    pub mesh_color: [f32; 4],
    /// RGBA of a standard map drawn as surface.
    #[schemars(skip)]
    pub surface_color: [f32; 4],
    /// RGBA of the negative and positive difference contours.
    #[schemars(skip)]
    pub difference_colors: [[f32; 4]; 2],
    /// Style for new maps.
    #[schemars(title = "Default Style")]
    pub default_style: MapStyle,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            standard_contour: 1.5,
            difference_contours: [-3.0, 3.0],
            mesh_color: [0.0, 0.5, 1.0, 0.6],
            surface_color: [0.6, 0.7, 0.85, 0.4],
            difference_colors: [[1.0, 0.0, 0.0, 0.6], [0.0, 1.0, 0.0, 0.6]],
            default_style: MapStyle::Mesh,
        }
    }
}
