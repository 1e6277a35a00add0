use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Crystal", inline)]
#[serde(default)]
/// Map sampling.
pub struct CrystalOptions {
    /// Shannon oversampling rate used to pick the grid from the
    /// resolution.
    #[schemars(title = "Oversampling", range(min = 1.0, max = 4.0), extend("step" = 0.25))]
    pub map_oversampling: f64,
}

impl Default for CrystalOptions {
    fn default() -> Self {
        Self {
            map_oversampling: 1.5,
        }
    }
}
