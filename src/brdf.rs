//! The active BRDF: importance-sampling convolution kernels and the
//! split-sum lookup texture.
//!
//! The BRDF owns the WGSL sources of the specular and diffuse
//! convolution kernels. Both are content-hashed; the bake scheduler
//! compares those hashes every pass, so replacing a kernel at runtime
//! (live shader editing) invalidates every probe and triggers one full
//! re-bake cycle without restarting the application.

use std::borrow::Cow;

use crate::util::hash::content_hash;

/// Default specular importance-sampling kernel (GGX prefilter).
const DEFAULT_SPECULAR_KERNEL: &str =
    include_str!("../assets/shaders/bake/specular_prefilter.wgsl");

/// Default diffuse importance-sampling kernel (cosine-weighted
/// hemisphere integration).
const DEFAULT_DIFFUSE_KERNEL: &str =
    include_str!("../assets/shaders/bake/diffuse_irradiance.wgsl");

/// Resolution of the BRDF integration lookup texture.
const LUT_SIZE: u32 = 256;

/// Samples per texel for the CPU LUT integration.
const LUT_SAMPLES: u32 = 256;

/// The object owning the GPU convolution kernels and their content
/// hashes.
pub struct Brdf {
    specular_source: Cow<'static, str>,
    diffuse_source: Cow<'static, str>,
    specular_hash: u64,
    diffuse_hash: u64,
}

impl Default for Brdf {
    fn default() -> Self {
        Self::new()
    }
}

impl Brdf {
    /// Create a BRDF with the built-in GGX / cosine kernels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            specular_source: Cow::Borrowed(DEFAULT_SPECULAR_KERNEL),
            diffuse_source: Cow::Borrowed(DEFAULT_DIFFUSE_KERNEL),
            specular_hash: content_hash(DEFAULT_SPECULAR_KERNEL),
            diffuse_hash: content_hash(DEFAULT_DIFFUSE_KERNEL),
        }
    }

    /// WGSL source of the specular importance-sampling kernel.
    #[must_use]
    pub fn specular_kernel(&self) -> &str {
        &self.specular_source
    }

    /// WGSL source of the diffuse importance-sampling kernel.
    #[must_use]
    pub fn diffuse_kernel(&self) -> &str {
        &self.diffuse_source
    }

    /// Content hash of the specular kernel.
    #[must_use]
    pub fn specular_hash(&self) -> u64 {
        self.specular_hash
    }

    /// Content hash of the diffuse kernel.
    #[must_use]
    pub fn diffuse_hash(&self) -> u64 {
        self.diffuse_hash
    }

    /// Replace the specular kernel (live edit). The changed hash makes
    /// the scheduler uncache every probe on its next pass.
    pub fn set_specular_kernel(&mut self, source: String) {
        self.specular_hash = content_hash(&source);
        self.specular_source = Cow::Owned(source);
    }

    /// Replace the diffuse kernel (live edit).
    pub fn set_diffuse_kernel(&mut self, source: String) {
        self.diffuse_hash = content_hash(&source);
        self.diffuse_source = Cow::Owned(source);
    }

    /// Build the split-sum BRDF integration lookup texture
    /// (`Rg16Float`, X = NdotV, Y = roughness; R = Fresnel scale,
    /// G = Fresnel bias).
    ///
    /// Integrated once on the CPU — the LUT is environment-independent
    /// and shared by every probe; it is exported alongside the cubemaps.
    #[must_use]
    pub fn create_lut_texture(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let size = LUT_SIZE;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("BRDF LUT"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rg16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let mut data = vec![0u8; (size * size * 4) as usize]; // 2x f16 per texel

        for y in 0..size {
            for x in 0..size {
                let ndot_v = ((x as f32 + 0.5) / size as f32).max(0.001);
                let roughness = ((y as f32 + 0.5) / size as f32).max(0.01);

                let (scale, bias) =
                    integrate_brdf(ndot_v, roughness, LUT_SAMPLES);

                let offset = ((y * size + x) * 4) as usize;
                let scale_f16 = half::f16::from_f32(scale);
                let bias_f16 = half::f16::from_f32(bias);
                data[offset..offset + 2]
                    .copy_from_slice(&scale_f16.to_le_bytes());
                data[offset + 2..offset + 4]
                    .copy_from_slice(&bias_f16.to_le_bytes());
            }
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * 4),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&Default::default());
        (texture, view)
    }
}

/// Integrate the BRDF for given NdotV and roughness using importance
/// sampling. Returns (scale, bias) for the split-sum approximation.
fn integrate_brdf(ndot_v: f32, roughness: f32, sample_count: u32) -> (f32, f32) {
    use std::f32::consts::PI;

    let v = [
        (1.0 - ndot_v * ndot_v).sqrt(), // sin
        0.0,
        ndot_v, // cos
    ];

    let mut a = 0.0f32;
    let mut b = 0.0f32;

    let alpha = roughness * roughness;

    for i in 0..sample_count {
        // Hammersley sequence for quasi-random sampling
        let xi = hammersley(i, sample_count);

        // Importance sample the GGX distribution
        let phi = 2.0 * PI * xi[0];
        let cos_theta =
            ((1.0 - xi[1]) / (1.0 + (alpha * alpha - 1.0) * xi[1])).sqrt();
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt().max(0.0);

        // Halfway vector in tangent space
        let h = [sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta];

        // Light vector = reflect view around halfway
        let v_dot_h = v[0] * h[0] + v[1] * h[1] + v[2] * h[2];
        let l = [
            2.0 * v_dot_h * h[0] - v[0],
            2.0 * v_dot_h * h[1] - v[1],
            2.0 * v_dot_h * h[2] - v[2],
        ];

        let n_dot_l = l[2].max(0.0);
        let n_dot_h = cos_theta.max(0.0);
        let v_dot_h = v_dot_h.clamp(0.0, 1.0);

        if n_dot_l > 0.0 {
            let g = geometry_smith_ibl(ndot_v, n_dot_l, roughness);
            let g_vis = (g * v_dot_h) / (n_dot_h * ndot_v).max(0.0001);
            let fc = (1.0 - v_dot_h).powi(5);

            a += (1.0 - fc) * g_vis;
            b += fc * g_vis;
        }
    }

    (a / sample_count as f32, b / sample_count as f32)
}

/// Smith's geometry function for IBL (uses k = alpha^2 / 2)
fn geometry_smith_ibl(ndot_v: f32, ndot_l: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let k = a / 2.0;
    let ggx_v = ndot_v / (ndot_v * (1.0 - k) + k);
    let ggx_l = ndot_l / (ndot_l * (1.0 - k) + k);
    ggx_v * ggx_l
}

/// Hammersley quasi-random sequence (2D)
fn hammersley(i: u32, n: u32) -> [f32; 2] {
    [i as f32 / n as f32, radical_inverse_vdc(i)]
}

/// Van der Corput radical inverse (base 2)
fn radical_inverse_vdc(mut bits: u32) -> f32 {
    bits = bits.rotate_right(16);
    bits = ((bits & 0x5555_5555) << 1) | ((bits & 0xAAAA_AAAA) >> 1);
    bits = ((bits & 0x3333_3333) << 2) | ((bits & 0xCCCC_CCCC) >> 2);
    bits = ((bits & 0x0F0F_0F0F) << 4) | ((bits & 0xF0F0_F0F0) >> 4);
    bits = ((bits & 0x00FF_00FF) << 8) | ((bits & 0xFF00_FF00) >> 8);
    bits as f32 * 2.328_306_4e-10 // 1.0 / 0x100000000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hashes_are_stable() {
        let a = Brdf::new();
        let b = Brdf::new();
        assert_eq!(a.specular_hash(), b.specular_hash());
        assert_eq!(a.diffuse_hash(), b.diffuse_hash());
        assert_ne!(a.specular_hash(), a.diffuse_hash());
    }

    #[test]
    fn replacing_a_kernel_changes_only_its_hash() {
        let mut brdf = Brdf::new();
        let spec_before = brdf.specular_hash();
        let diff_before = brdf.diffuse_hash();

        brdf.set_specular_kernel("// edited kernel".to_owned());
        assert_ne!(brdf.specular_hash(), spec_before);
        assert_eq!(brdf.diffuse_hash(), diff_before);
    }

    #[test]
    fn restoring_a_kernel_restores_its_hash() {
        let mut brdf = Brdf::new();
        let before = brdf.diffuse_hash();
        let original = brdf.diffuse_kernel().to_owned();

        brdf.set_diffuse_kernel("// something else".to_owned());
        assert_ne!(brdf.diffuse_hash(), before);

        brdf.set_diffuse_kernel(original);
        assert_eq!(brdf.diffuse_hash(), before);
    }

    #[test]
    fn brdf_integration_stays_in_unit_range() {
        for &(ndot_v, roughness) in
            &[(0.05, 0.05), (0.5, 0.5), (0.95, 0.95), (1.0, 0.01)]
        {
            let (scale, bias) = integrate_brdf(ndot_v, roughness, 64);
            assert!(scale.is_finite() && bias.is_finite());
            assert!(scale >= 0.0, "scale {scale} at {ndot_v}/{roughness}");
            assert!(bias >= 0.0, "bias {bias} at {ndot_v}/{roughness}");
            assert!(
                scale + bias <= 1.5,
                "energy {} at {ndot_v}/{roughness}",
                scale + bias
            );
        }
    }

    #[test]
    fn radical_inverse_is_in_unit_interval() {
        for i in [0u32, 1, 2, 255, 4096, u32::MAX] {
            let r = radical_inverse_vdc(i);
            assert!((0.0..1.0).contains(&r));
        }
    }
}
