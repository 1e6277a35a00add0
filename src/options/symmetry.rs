use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Symmetry", inline)]
#[serde(default)]
/// Display of symmetry copies around the viewpoint.
pub struct SymmetryOptions {
    /// Radius in Å within which symmetry atoms are shown.
    #[schemars(title = "Radius", range(min = 2.0, max = 100.0), extend("step" = 1.0))]
    pub radius: f64,
    /// Samples per reference-model extent when searching for operators.
    #[schemars(title = "Search Frequency", range(min = 1, max = 8))]
    pub sample_frequency: u32,
    /// Box size (grid points on the longest axis) above which the search
    /// falls back to one sample per reference extent.
    #[schemars(skip)]
    pub large_box_threshold: i32,
    /// Keep the reference model visible even when it is outside the box.
    #[schemars(title = "Always Show Reference")]
    pub always_show_reference: bool,
    /// Color multiplier applied to symmetry copies.
    #[schemars(skip)]
    pub dim_colors_to: f32,
}

impl Default for SymmetryOptions {
    fn default() -> Self {
        Self {
            radius: 20.0,
            sample_frequency: 2,
            large_box_threshold: 256,
            always_show_reference: true,
            dim_colors_to: 0.6,
        }
    }
}

impl SymmetryOptions {
    /// Sampling frequency to use for a search box with `max_dim` grid points
    /// on its longest axis.
    #[must_use]
    pub fn sample_frequency_for(&self, max_dim: i32) -> u32 {
        if max_dim > self.large_box_threshold {
            1
        } else {
            self.sample_frequency.max(1)
        }
    }
}
