//! The geometry pass.
//!
//! The studio core does not own meshes or cameras. Hosts plug their renderer in
//! through [`SceneDrawer`]; the backend only calls it with the published
//! [`StudioScene`] and a color target. [`BackgroundDrawer`] is the built-in
//! drawer: it renders just the background, which is enough for environment
//! previews and for luminance sampling without a model.

use glam::{Mat4, Vec3};

use crate::renderer::gpu::ColorTarget;
use crate::renderer::gpu::fullscreen::{EQUIRECT_HELPERS, FullscreenProgram};
use crate::renderer::gpu::texture::TextureRegistry;
use crate::resources::uniforms::BackgroundUniforms;
use crate::scene::{Background, StudioScene};

/// Resources available to a drawer while recording.
pub struct DrawContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Resolves `scene.environment` / background texture ids.
    pub textures: &'a TextureRegistry,
    pub clear_color: Vec3,
}

pub trait SceneDrawer {
    /// Camera matrix used for the background and light indicators.
    fn view_projection(&self, aspect: f32) -> Mat4;

    /// Records the geometry pass into `target`, clearing it first.
    fn draw(
        &mut self,
        ctx: &DrawContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        scene: &StudioScene,
        target: &ColorTarget<'_>,
    );
}

/// Fixed product-shot camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.2, 5.0),
            target: Vec3::ZERO,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl OrbitCamera {
    #[must_use]
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
            * Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }
}

/// Draws the scene background (equirect texture or flat color).
#[derive(Debug)]
pub struct BackgroundDrawer {
    program: FullscreenProgram,
    placeholder: wgpu::TextureView,
    pub camera: OrbitCamera,
}

impl BackgroundDrawer {
    pub fn new(device: &wgpu::Device) -> Self {
        let fragment = format!("{EQUIRECT_HELPERS}\n{}", include_str!("../shaders/background.wgsl"));
        let program = FullscreenProgram::new(
            device,
            "Background",
            &fragment,
            std::mem::size_of::<BackgroundUniforms>() as u64,
            wgpu::AddressMode::Repeat,
        );

        // Bound when the background is a flat color; never sampled.
        let placeholder = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Background Placeholder"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            program,
            placeholder,
            camera: OrbitCamera::default(),
        }
    }
}

impl SceneDrawer for BackgroundDrawer {
    fn view_projection(&self, aspect: f32) -> Mat4 {
        self.camera.view_projection(aspect)
    }

    fn draw(
        &mut self,
        ctx: &DrawContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        scene: &StudioScene,
        target: &ColorTarget<'_>,
    ) {
        let aspect = target.width as f32 / target.height.max(1) as f32;
        let world_from_clip = self.view_projection(aspect).inverse();

        let (texture, color) = match scene.background {
            Background::Texture(id) => match ctx.textures.get(id) {
                Some(texture) => (Some(texture), Vec3::ZERO),
                None => {
                    log::debug!("Background texture {id:?} is gone, using clear color");
                    (None, ctx.clear_color)
                }
            },
            Background::Color(color) => (None, color),
        };

        let mip = texture.map_or(0.0, |t| {
            scene.background_blurriness.clamp(0.0, 1.0) * (t.mip_level_count.saturating_sub(1)) as f32
        });
        let uniforms = BackgroundUniforms {
            world_from_clip: world_from_clip.to_cols_array_2d(),
            color: color.extend(scene.background_intensity).to_array(),
            params: [mip, if texture.is_some() { 1.0 } else { 0.0 }, 0.0, 0.0],
        };
        self.program
            .write_uniforms(ctx.queue, bytemuck::bytes_of(&uniforms));

        let input = texture.map_or(&self.placeholder, |t| &t.view);
        self.program
            .draw(ctx.device, encoder, input, target.view, target.format);
    }
}
