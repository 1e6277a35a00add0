//! Runtime configuration with TOML preset support.
//!
//! Live-scrolling, symmetry, map-display and sampling settings are
//! consolidated here. Options serialize to/from TOML so sessions can be
//! started from stored presets.

mod crystal;
mod maps;
mod scrolling;
mod symmetry;

use std::path::Path;

pub use crystal::CrystalOptions;
pub use maps::{MapOptions, MapStyle};
use schemars::JsonSchema;
pub use scrolling::ScrollingOptions;
use serde::{Deserialize, Serialize};
pub use symmetry::SymmetryOptions;

use crate::error::XtalError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[symmetry]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Live map box.
    pub scrolling: ScrollingOptions,
    /// Symmetry copies.
    pub symmetry: SymmetryOptions,
    /// Map contouring and colors.
    #[schemars(skip)]
    pub maps: MapOptions,
    /// Map sampling.
    pub crystal: CrystalOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`XtalError::Io`] if the file cannot be read,
    /// [`XtalError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, XtalError> {
        let content = std::fs::read_to_string(path).map_err(XtalError::Io)?;
        toml::from_str(&content)
            .map_err(|e| XtalError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed), creating the parent
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// [`XtalError::Io`] on write failure.
    pub fn save(&self, path: &Path) -> Result<(), XtalError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| XtalError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(XtalError::Io)?;
        }
        std::fs::write(path, content).map_err(XtalError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[symmetry]
radius = 12.5

[maps]
default_style = "surface"
"#;
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.symmetry.radius, 12.5);
        // Everything else should be default
        assert_eq!(opts.symmetry.sample_frequency, 2);
        assert_eq!(opts.scrolling.display_radius, 10.0);
        assert_eq!(opts.maps.default_style, MapStyle::Surface);
        assert_eq!(opts.maps.difference_contours, [-3.0, 3.0]);
    }

    #[test]
    fn large_boxes_sample_coarsely() {
        let sym = SymmetryOptions::default();
        assert_eq!(sym.sample_frequency_for(100), 2);
        assert_eq!(sym.sample_frequency_for(256), 2);
        assert_eq!(sym.sample_frequency_for(257), 1);
    }

    #[test]
    fn save_load_and_list_presets() {
        let dir = std::env::temp_dir()
            .join(format!("viso-xtal-presets-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut opts = Options::default();
        opts.scrolling.display_radius = 14.0;
        opts.save(&dir.join("wide.toml")).unwrap();
        Options::default().save(&dir.join("default.toml")).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let loaded = Options::load(&dir.join("wide.toml")).unwrap();
        assert_eq!(loaded, opts);
        assert_eq!(Options::list_presets(&dir), vec!["default", "wide"]);
        assert!(matches!(
            Options::load(&dir.join("missing.toml")),
            Err(XtalError::Io(_))
        ));
        std::fs::write(dir.join("bad.toml"), "[symmetry]\nradius = \"far\"").unwrap();
        assert!(matches!(
            Options::load(&dir.join("bad.toml")),
            Err(XtalError::OptionsParse(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("scrolling"));
        assert!(props.contains_key("symmetry"));
        assert!(props.contains_key("crystal"));
        // Skipped sections should be absent
        assert!(!props.contains_key("maps"));

        let symmetry = &props["symmetry"]["properties"];
        assert!(symmetry.get("radius").is_some());
        assert!(symmetry.get("sample_frequency").is_some());
        assert!(symmetry.get("dim_colors_to").is_none());
        assert!(symmetry.get("large_box_threshold").is_none());
    }
}
