// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Live map-box scrolling and symmetry expansion for crystallographic
//! density display.
//!
//! As the viewer's center of rotation moves, viso-xtal keeps a grid-aligned
//! box of density around it and shows the symmetry-equivalent copies of the
//! model that fall within a radius of it. Box updates are classified so a
//! still viewpoint costs nothing, a move refills buffers in place and only a
//! change of size reallocates them.
//!
//! # Key entry points
//!
//! - [`session::Session`] - owns the model tree, event bus and crystals and
//!   drives them one frame at a time
//! - [`boxes::LiveScrollController`] - the map box state machine
//! - [`symmetry::SymmetryExpansionEngine`] - live symmetry copies
//! - [`crystal`] - cells, grids, coordinate spaces and symmetry operators
//! - [`options::Options`] - runtime configuration (scrolling, symmetry,
//!   maps, sampling)
//!
//! # Architecture
//!
//! Everything runs on the host's frame callback. Components subscribe to
//! [`events::EventChannel::NewFrame`] and the session routes each fired
//! handle to its owner. Map channels receive
//! [`boxes::BoxNotification`]s and pull density through
//! [`maps::MapBoxResampler`]; symmetry copies are built lazily by
//! [`symmetry::SymmetryCopyCache`] and masked by one batched proximity
//! query per update. A channel whose host volume was closed is detached
//! without disturbing the others.

pub mod boxes;
pub mod crystal;
pub mod error;
pub mod events;
pub mod maps;
pub mod options;
pub mod session;
pub mod symmetry;
pub mod util;

pub use error::XtalError;
