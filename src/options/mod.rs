//! Persisted probe/bake configuration with TOML preset support.
//!
//! The baker itself treats these values as opaque input: they are
//! loaded and saved by the surrounding application and turned into
//! probe records via [`crate::probe::ProbeState::from_options`]. All
//! structs use `#[serde(default)]` so partial TOML files (e.g. only
//! overriding `[probe]`) work correctly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LumenaError;
use crate::probe::HdrPixelFormat;

/// Per-probe bake configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeOptions {
    /// Total sample accumulation budget.
    pub sample_count: u32,
    /// Samples consumed per scheduler tick. Equal to `sample_count` for
    /// single-frame bakes, smaller to spread refinement across frames.
    pub samples_per_frame: u32,
    /// Coarsest specular mips to skip.
    pub mip_drop: u32,
    /// Environment capture face resolution.
    pub source_resolution: u32,
    /// Specular cubemap face resolution.
    pub specular_resolution: u32,
    /// Diffuse irradiance face resolution.
    pub diffuse_resolution: u32,
    /// HDR storage precision.
    pub hdr_format: HdrPixelFormat,
    /// Scale applied to captured environment radiance.
    pub environment_scale: f32,
    /// Contrast adjustment for the converted maps.
    pub ibl_contrast: f32,
    /// Saturation adjustment for the converted maps.
    pub ibl_saturation: f32,
    /// Hue rotation (radians) for the converted maps.
    pub ibl_hue: f32,
    /// Gamma used by the MDR encoding.
    pub gamma: f32,
    /// Exposure applied before encoding.
    pub ldr_exposure: f32,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            sample_count: 128,
            samples_per_frame: 128,
            mip_drop: 2,
            source_resolution: 256,
            specular_resolution: 128,
            diffuse_resolution: 32,
            hdr_format: HdrPixelFormat::Rgba16Float,
            environment_scale: 1.0,
            ibl_contrast: 1.0,
            ibl_saturation: 1.0,
            ibl_hue: 0.0,
            gamma: 2.2,
            ldr_exposure: 1.0,
        }
    }
}

/// Top-level options container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BakeOptions {
    /// Defaults applied to newly placed probes.
    pub probe: ProbeOptions,
}

impl BakeOptions {
    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LumenaError::Io`] on read failure or
    /// [`LumenaError::OptionsParse`] on malformed TOML.
    pub fn load(path: &Path) -> Result<Self, LumenaError> {
        let content = std::fs::read_to_string(path).map_err(LumenaError::Io)?;
        toml::from_str(&content)
            .map_err(|e| LumenaError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`LumenaError::OptionsParse`] on serialization failure or
    /// [`LumenaError::Io`] on write failure.
    pub fn save(&self, path: &Path) -> Result<(), LumenaError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LumenaError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(LumenaError::Io)?;
        }
        std::fs::write(path, content).map_err(LumenaError::Io)
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
        let opts = BakeOptions::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: BakeOptions = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let parsed: BakeOptions =
            toml::from_str("[probe]\nsample_count = 256\n").unwrap();
        assert_eq!(parsed.probe.sample_count, 256);
        assert_eq!(parsed.probe.samples_per_frame, 128);
        assert_eq!(parsed.probe.hdr_format, HdrPixelFormat::Rgba16Float);
    }

    #[test]
    fn single_frame_default_budget() {
        let opts = ProbeOptions::default();
        assert_eq!(opts.sample_count, opts.samples_per_frame);
    }
}
