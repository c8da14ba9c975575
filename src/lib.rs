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
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! GPU image-based-lighting probe baker built on wgpu.
//!
//! Lumena captures an HDR environment cubemap per light probe, convolves
//! it into specular (per-mip roughness) and diffuse irradiance cubemaps
//! with GPU importance sampling, and re-encodes the results into a
//! compressed medium-dynamic-range representation for storage. The
//! expensive Monte-Carlo convolution is spread across frames: each
//! scheduler tick consumes a slice of a probe's sample budget, so an
//! interactive application stays responsive while probes converge.
//!
//! # Key entry points
//!
//! - [`baker::ProbeBaker`] - the per-frame bake scheduler and its stages
//! - [`scene::Scene`] - meshes, probes, camera, and the active BRDF
//! - [`probe::ProbeState`] - one probe's configuration and progress
//! - [`options::BakeOptions`] - persisted probe configuration (TOML)
//!
//! # Architecture
//!
//! Everything runs on the caller's frame loop; there are no background
//! threads. Each tick the baker checks the BRDF kernel hashes (editing a
//! convolution kernel invalidates every probe), then walks the probe
//! arena: a fresh probe gets capture → specular → diffuse → color
//! conversion, a partially-converged probe gets convolution refinement
//! and conversion only, and a cached probe is skipped outright. The
//! active camera is saved before probe rendering and restored afterward.

pub mod baker;
pub mod brdf;
pub mod camera;
pub mod error;
pub mod gpu;
pub mod options;
pub mod probe;
pub mod scene;
pub mod util;
