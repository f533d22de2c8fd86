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

//! Streaming mesh decoder and wgpu renderer core for the C. elegans
//! anatomy browser.
//!
//! Models arrive as a catalog of mesh entries spread over network chunks.
//! Each chunk is decoded ([`codec`]) into dequantized vertex attributes,
//! 16-bit indices and per-part bounding boxes, uploaded as a
//! [`mesh::GpuMesh`], and registered in a [`renderer::PartTable`]. Every
//! frame is planned from the current [`layers::OpacityInfo`]: opaque parts
//! first, then translucent layers inner to outer and back to front.
//!
//! # Key entry points
//!
//! - [`catalog::AssetCatalog`] - the models, their materials and layers
//! - [`codec::Chunk`] - chunk decoding into [`codec::DecodedMesh`]
//! - [`render_interface::RenderInterface`] - load/refresh/identify front door
//! - [`renderer::Renderer`] - the wgpu implementation of
//!   [`renderer::SceneRenderer`]
//! - [`layers::LayerOpacityManager`] - layer opacity broadcast to views
//! - [`options::Options`] - runtime configuration and TOML presets

pub mod camera;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod gpu;
pub mod layers;
pub mod mesh;
pub mod options;
pub mod render_interface;
pub mod renderer;

pub use error::ViewerError;
