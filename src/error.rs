//! Crate-level error types.

use std::fmt;

/// Errors produced by the viso-xtal crate.
#[derive(Debug)]
pub enum XtalError {
    /// Invalid or missing configuration: double initialization, a
    /// non-positive radius, absent cell/symmetry information, or no map
    /// channels registered.
    Configuration(String),
    /// A host-side object (volume, atomic model, container) was deleted
    /// out-of-band and can no longer be used.
    StaleReference(String),
    /// A volume buffer does not match the dimensions of the box it is
    /// being filled for. Indicates a desynchronized shape/fill pair.
    DimensionMismatch {
        /// Box dimensions `(u, v, w)` the fill was computed for.
        expected: [i32; 3],
        /// Dimensions `(u, v, w)` of the buffer actually supplied.
        actual: [i32; 3],
    },
    /// Failure reported by an external numeric service (density export,
    /// symmetry enumeration).
    External(String),
    /// Malformed symmetry operator in xyz-triplet notation.
    SymopParse(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for XtalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => {
                write!(f, "configuration error: {msg}")
            }
            Self::StaleReference(msg) => {
                write!(f, "stale reference: {msg}")
            }
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "volume buffer dimensions {actual:?} do not match box \
                 dimensions {expected:?}"
            ),
            Self::External(msg) => write!(f, "external service error: {msg}"),
            Self::SymopParse(msg) => {
                write!(f, "symmetry operator parse error: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for XtalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for XtalError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl XtalError {
    /// Whether this error means a host object went away, as opposed to a
    /// failure worth retrying or surfacing.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference(_))
    }

    /// Whether a map channel reporting this error should stop receiving
    /// box updates: its host object is gone, or its buffer no longer
    /// matches the box it is being filled for.
    #[must_use]
    pub fn detaches_channel(&self) -> bool {
        matches!(
            self,
            Self::StaleReference(_) | Self::DimensionMismatch { .. }
        )
    }
}
