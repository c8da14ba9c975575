//! GPU resource management utilities.
//!
//! Provides wgpu device/queue initialization, cubemap render targets,
//! pipeline boilerplate helpers, and shader composition.

/// Cube render targets with per-(face, mip) attachment views.
pub mod cubemap;
/// Shared wgpu boilerplate helpers for bake-pass pipelines.
pub mod pipeline_helpers;
/// wgpu device and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
