//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the lumena crate.
#[derive(Debug)]
pub enum LumenaError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Probe baking failure.
    Bake(BakeError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for LumenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Bake(e) => write!(f, "bake error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for LumenaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Bake(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::OptionsParse(_) => None,
        }
    }
}

impl From<RenderContextError> for LumenaError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<BakeError> for LumenaError {
    fn from(e: BakeError) -> Self {
        Self::Bake(e)
    }
}

impl From<std::io::Error> for LumenaError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors raised while scheduling or executing probe bake work.
///
/// `MissingBrdf` is pipeline-level: no probe can be processed that frame.
/// The other variants are probe-level and never abort the remaining
/// probes in a tick.
#[derive(Debug)]
pub enum BakeError {
    /// The scene has no active BRDF, so no convolution kernel exists.
    MissingBrdf,
    /// A probe's cubemap does not match its declared configuration.
    ConfigMismatch {
        /// Resolution/mip-count the probe configuration declares.
        expected: (u32, u32),
        /// Resolution/mip-count the allocated texture actually has.
        actual: (u32, u32),
    },
    /// A user-supplied convolution kernel failed to compose.
    ShaderCompose(String),
}

impl fmt::Display for BakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBrdf => {
                write!(f, "scene has no active BRDF; cannot convolve probes")
            }
            Self::ConfigMismatch { expected, actual } => write!(
                f,
                "probe target mismatch: configured {}px/{} mips, allocated {}px/{} mips",
                expected.0, expected.1, actual.0, actual.1
            ),
            Self::ShaderCompose(msg) => {
                write!(f, "convolution kernel failed to compose: {msg}")
            }
        }
    }
}

impl std::error::Error for BakeError {}
