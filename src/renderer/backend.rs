//! Render Backend Seam
//!
//! [`RenderBackend`] is the renderer object the controllers drive. It owns
//! every GPU resource; controllers only hold the typed ids handed back to
//! them and are responsible for returning those ids through
//! [`dispose_texture`](RenderBackend::dispose_texture) /
//! [`dispose_indicator`](RenderBackend::dispose_indicator).
//!
//! [`WgpuBackend`](super::gpu::WgpuBackend) is the production implementation.
//!
//! # Resource Ownership
//!
//! ```text
//! PassChain            ── composition target
//! ExposureController   ── 8×8 luminance sample target
//! EnvironmentController── cached sources, rotated source, convolved map
//! LightingRig          ── debug indicators
//! ```

use glam::{Quat, Vec3};
use slotmap::new_key_type;

use crate::errors::Result;
use crate::renderer::chain::PassChain;
use crate::resources::Image;
use crate::scene::StudioScene;

new_key_type! {
    /// A sampled texture or render target owned by the backend.
    pub struct TextureId;
    /// A debug indicator (geometry + material pair) owned by the backend.
    pub struct IndicatorId;
}

/// Describes an off-screen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub label: &'static str,
}

impl TargetDesc {
    #[must_use]
    pub const fn new(
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            width,
            height,
            format,
            label,
        }
    }
}

/// Optional features a backend may lack. Missing features degrade silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Synchronous pixel readback (unavailable on WebGPU main thread).
    pub pixel_readback: bool,
    /// Floating-point color targets.
    pub float_targets: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            pixel_readback: true,
            float_targets: true,
        }
    }
}

/// Placement of one debug light indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorDesc {
    pub position: Vec3,
    /// Rotates the marker's local -Z axis onto the direction it points at.
    pub rotation: Quat,
    pub scale: f32,
    pub color: Vec3,
}

/// The renderer object consumed by the studio controllers.
pub trait RenderBackend {
    fn capabilities(&self) -> BackendCapabilities;

    /// Device pixels per logical pixel.
    fn pixel_ratio(&self) -> f32;

    /// Color used when the scene has no background texture.
    fn set_clear_color(&mut self, color: Vec3);

    /// Uploads decoded pixels into a new sampled texture.
    fn upload_texture(&mut self, image: &Image) -> Result<TextureId>;

    /// Allocates a render target that can also be sampled.
    fn create_render_target(&mut self, desc: &TargetDesc) -> Result<TextureId>;

    /// Size of a live texture; `None` if unknown or already disposed.
    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)>;

    fn texture_format(&self, texture: TextureId) -> Option<wgpu::TextureFormat>;

    /// Releases a texture. Unknown ids are ignored.
    fn dispose_texture(&mut self, texture: TextureId);

    /// Renders the geometry pass of `scene` into `target`.
    fn render_scene(&mut self, scene: &StudioScene, target: TextureId) -> Result<()>;

    /// Reads back every texel of `target` as linear RGBA.
    fn read_pixels(&mut self, target: TextureId) -> Result<Vec<[f32; 4]>>;

    /// Remaps the equirectangular `source` into `target`, shifting longitude by `radians`.
    fn rotate_equirect(&mut self, source: TextureId, target: TextureId, radians: f32)
    -> Result<()>;

    /// Produces a roughness-prefiltered lighting map from an equirectangular source.
    fn convolve_environment(&mut self, source: TextureId) -> Result<TextureId>;

    fn create_indicator(&mut self, desc: &IndicatorDesc) -> Result<IndicatorId>;

    /// Releases an indicator's geometry and material. Unknown ids are ignored.
    fn dispose_indicator(&mut self, indicator: IndicatorId);

    /// Renders the scene and runs every enabled pass of `chain`, ending on screen.
    fn execute_chain(&mut self, chain: &PassChain, scene: &StudioScene) -> Result<()>;
}
