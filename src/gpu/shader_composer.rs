//! WGSL shader composition with `#import` support via naga-oil.

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};
use std::borrow::Cow;

use crate::error::BakeError;

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Bake shaders
/// use `#import lumena::cube` (face addressing, fullscreen triangle) and
/// `#import lumena::sampling` (Hammersley sequence, GGX / cosine
/// importance sampling). The composer produces `naga::Module` IR
/// directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

impl Default for ShaderComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderComposer {
    /// Create a composer with the shared lumena modules registered.
    ///
    /// # Panics
    ///
    /// Panics if a built-in module fails to register — those sources are
    /// embedded in the crate, so this is unreachable outside development.
    #[must_use]
    pub fn new() -> Self {
        let mut composer = Composer::default();

        // Register shared modules in dependency order.
        let modules: &[ModuleDef] = &[
            ModuleDef {
                source: include_str!(
                    "../../assets/shaders/modules/cube.wgsl"
                ),
                file_path: "modules/cube.wgsl",
            },
            ModuleDef {
                source: include_str!(
                    "../../assets/shaders/modules/sampling.wgsl"
                ),
                file_path: "modules/sampling.wgsl",
            },
        ];

        for m in modules {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .unwrap_or_else(|e| {
                    panic!(
                        "Failed to register shader module '{}': {:?}",
                        m.file_path, e
                    )
                });
        }

        Self { composer }
    }

    /// Compose a built-in shader source into a `wgpu::ShaderModule`.
    ///
    /// # Panics
    ///
    /// Panics on composition failure; only used for sources embedded in
    /// the crate.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
    ) -> wgpu::ShaderModule {
        let naga_module = self
            .composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .unwrap_or_else(|e| {
                panic!("Failed to compose shader '{}': {}", file_path, e)
            });

        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        })
    }

    /// Compose a caller-supplied convolution kernel, reporting failure
    /// instead of panicking — a live-edited kernel with a syntax error is
    /// an expected condition.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ShaderCompose`] when the source fails to
    /// parse or validate.
    pub fn try_compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
    ) -> Result<wgpu::ShaderModule, BakeError> {
        let naga_module = self
            .composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| BakeError::ShaderCompose(e.to_string()))?;

        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a
    /// wgpu shader module. Useful for testing shader composition without
    /// a GPU device.
    ///
    /// # Errors
    ///
    /// Returns the boxed composer error on parse/validation failure.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, Box<naga_oil::compose::ComposerError>> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shader source definitions for all composable shaders in the crate.
    /// Each entry is (source, file_path).
    fn all_shader_sources() -> Vec<(&'static str, &'static str)> {
        vec![
            (
                include_str!("../../assets/shaders/bake/env_mesh.wgsl"),
                "env_mesh.wgsl",
            ),
            (
                include_str!("../../assets/shaders/bake/downsample.wgsl"),
                "downsample.wgsl",
            ),
            (
                include_str!(
                    "../../assets/shaders/bake/specular_prefilter.wgsl"
                ),
                "specular_prefilter.wgsl",
            ),
            (
                include_str!(
                    "../../assets/shaders/bake/diffuse_irradiance.wgsl"
                ),
                "diffuse_irradiance.wgsl",
            ),
            (
                include_str!("../../assets/shaders/bake/mdr_convert.wgsl"),
                "mdr_convert.wgsl",
            ),
        ]
    }

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new();
        for (source, file_path) in all_shader_sources() {
            let _ = composer
                .compose_naga(source, file_path)
                .unwrap_or_else(|e| {
                    panic!("Shader '{}' failed to compose: {}", file_path, e)
                });
        }
    }
}
