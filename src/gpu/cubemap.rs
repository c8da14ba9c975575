//! Cube render targets with per-(face, mip) attachment views.

use crate::error::BakeError;

/// Number of faces in a cubemap.
pub const FACE_COUNT: u32 = 6;

/// Number of mip levels for a cube face resolution.
///
/// The chain stops at 2×2: the 1×1 tail mip is never convolved
/// (roughness saturates well before it) and skipping it keeps the
/// specular mip ↔ roughness mapping dense.
#[must_use]
pub fn mip_count_for(resolution: u32) -> u32 {
    if resolution < 2 {
        1
    } else {
        resolution.ilog2()
    }
}

/// Resolution of `mip` for a given base resolution (halved per level,
/// clamped to 1).
#[must_use]
pub fn mip_resolution(base: u32, mip: u32) -> u32 {
    (base >> mip).max(1)
}

/// A cubemap render target: a 6-layer 2D texture with a mip chain, a
/// cube-sampled view, and one render-attachment view per (face, mip).
///
/// Created with `RENDER_ATTACHMENT | TEXTURE_BINDING | COPY_SRC |
/// COPY_DST` usage so it can be drawn into, sampled by later stages,
/// and copied into a temporal-accumulation partner texture.
pub struct CubeMapTarget {
    /// The underlying GPU texture (6 array layers).
    pub texture: wgpu::Texture,
    cube_view: wgpu::TextureView,
    /// Indexed `face * mip_count + mip`.
    face_views: Vec<wgpu::TextureView>,
    resolution: u32,
    mip_count: u32,
    format: wgpu::TextureFormat,
}

impl CubeMapTarget {
    /// Create a cubemap target with the given face resolution, mip count,
    /// and texel format.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        resolution: u32,
        mip_count: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: FACE_COUNT,
            },
            mip_level_count: mip_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label} Cube View")),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let mut face_views =
            Vec::with_capacity((FACE_COUNT * mip_count) as usize);
        for face in 0..FACE_COUNT {
            for mip in 0..mip_count {
                face_views.push(texture.create_view(
                    &wgpu::TextureViewDescriptor {
                        label: Some(&format!("{label} Face {face} Mip {mip}")),
                        dimension: Some(wgpu::TextureViewDimension::D2),
                        base_mip_level: mip,
                        mip_level_count: Some(1),
                        base_array_layer: face,
                        array_layer_count: Some(1),
                        ..Default::default()
                    },
                ));
            }
        }

        Self {
            texture,
            cube_view,
            face_views,
            resolution,
            mip_count,
            format,
        }
    }

    /// The cube-sampled view covering all faces and mips.
    #[must_use]
    pub fn cube_view(&self) -> &wgpu::TextureView {
        &self.cube_view
    }

    /// The single-face, single-mip view used as a render attachment or
    /// as a `texture_2d` binding.
    #[must_use]
    pub fn face_view(&self, face: u32, mip: u32) -> &wgpu::TextureView {
        &self.face_views[(face * self.mip_count + mip) as usize]
    }

    /// Face resolution at mip 0.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Number of mip levels.
    #[must_use]
    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    /// Texel format.
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Check this target against a declared (resolution, mip count)
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ConfigMismatch`] when the allocated texture
    /// does not match — a programmer error surfaced rather than rendered
    /// into the wrong chain.
    pub fn validate_against(
        &self,
        resolution: u32,
        mip_count: u32,
    ) -> Result<(), BakeError> {
        if self.resolution == resolution && self.mip_count == mip_count {
            Ok(())
        } else {
            Err(BakeError::ConfigMismatch {
                expected: (resolution, mip_count),
                actual: (self.resolution, self.mip_count),
            })
        }
    }

    /// Copy every mip of every face into `dest` (the temporal
    /// accumulation partner). Both targets must share resolution, mip
    /// count, and format.
    pub fn copy_all_to(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        dest: &Self,
    ) {
        for mip in 0..self.mip_count {
            let size = mip_resolution(self.resolution, mip);
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &self.texture,
                    mip_level: mip,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &dest.texture,
                    mip_level: mip,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: FACE_COUNT,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_stops_at_two_by_two() {
        assert_eq!(mip_count_for(128), 7);
        assert_eq!(mip_count_for(256), 8);
        assert_eq!(mip_count_for(32), 5);
        assert_eq!(mip_count_for(2), 1);
        assert_eq!(mip_count_for(1), 1);
    }

    #[test]
    fn mip_resolution_halves_and_clamps() {
        assert_eq!(mip_resolution(128, 0), 128);
        assert_eq!(mip_resolution(128, 1), 64);
        assert_eq!(mip_resolution(128, 6), 2);
        assert_eq!(mip_resolution(128, 9), 1);
    }
}
