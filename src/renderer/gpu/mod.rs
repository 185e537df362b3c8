//! wgpu Render Backend
//!
//! [`WgpuBackend`] implements [`RenderBackend`] on a host-provided device and
//! queue. It owns every GPU object the controllers refer to by id.
//!
//! # Frame Flow
//!
//! ```text
//! begin_frame(surface texture)
//!        │
//!        ▼
//! SceneDrawer ──► composition target ──► indicators overlay
//!        │
//!        ▼  enabled passes, ping-pong between composition and scratch target
//! PostEffect (Bloom, Tint, Grain, ...)
//!        │
//!        ▼
//! ToneMap effect ──► surface
//! ```
//!
//! Passes without a registered effect are skipped. A missing tone-map effect
//! falls back to a plain blit so the frame still reaches the screen.

mod drawer;
mod effects;
mod fullscreen;
mod indicators;
mod prefilter;
mod readback;
mod texture;

pub use drawer::{BackgroundDrawer, DrawContext, OrbitCamera, SceneDrawer};
pub use effects::{EffectContext, FullscreenEffect, PostEffect, builtin_effect};
pub use fullscreen::FullscreenProgram;
pub use prefilter::{PREFILTER_HEIGHT, PREFILTER_MIP_COUNT, PREFILTER_WIDTH};
pub use texture::{GpuTexture, TextureRegistry};

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::errors::{Result, StudioError};
use crate::renderer::backend::{
    BackendCapabilities, IndicatorDesc, IndicatorId, RenderBackend, TargetDesc, TextureId,
};
use crate::renderer::chain::{PassChain, PassKind};
use crate::resources::Image;
use crate::resources::uniforms::EquirectRotationUniforms;
use crate::scene::StudioScene;

use self::indicators::IndicatorRenderer;
use self::prefilter::EnvironmentPrefilter;

/// A color attachment plus what programs need to know about it.
pub struct ColorTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

struct FrameOutput {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    capabilities: BackendCapabilities,
    pixel_ratio: f32,
    clear_color: Vec3,

    textures: TextureRegistry,
    drawer: Box<dyn SceneDrawer>,
    effects: FxHashMap<PassKind, Box<dyn PostEffect>>,

    rotation: FullscreenProgram,
    blit: FullscreenProgram,
    prefilter: EnvironmentPrefilter,
    indicators: IndicatorRenderer,

    /// Scratch target the chain ping-pongs with; matches the composition target.
    scratch: Option<GpuTexture>,
    frame_output: Option<FrameOutput>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("capabilities", &self.capabilities)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("textures", &self.textures.len())
            .field("indicators", &self.indicators.len())
            .field("effects", &self.effects.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl WgpuBackend {
    /// Creates a backend with the built-in background drawer and post effects.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let effects = PassKind::ALL
            .into_iter()
            .filter_map(|kind| builtin_effect(&device, kind).map(|e| (kind, e)))
            .collect();

        let rotation = FullscreenProgram::new(
            &device,
            "Equirect Rotation",
            include_str!("../shaders/equirect_rotate.wgsl"),
            std::mem::size_of::<EquirectRotationUniforms>() as u64,
            wgpu::AddressMode::Repeat,
        );
        let blit = FullscreenProgram::new(
            &device,
            "Blit",
            include_str!("../shaders/blit.wgsl"),
            16,
            wgpu::AddressMode::ClampToEdge,
        );

        Self {
            capabilities: BackendCapabilities {
                // Blocking on map_async would stall the browser event loop.
                pixel_readback: !cfg!(target_arch = "wasm32"),
                float_targets: true,
            },
            pixel_ratio: 1.0,
            clear_color: Vec3::ZERO,
            textures: TextureRegistry::default(),
            drawer: Box::new(BackgroundDrawer::new(&device)),
            effects,
            rotation,
            blit,
            prefilter: EnvironmentPrefilter::new(&device),
            indicators: IndicatorRenderer::new(&device),
            scratch: None,
            frame_output: None,
            device,
            queue,
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[must_use]
    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    #[must_use]
    pub fn live_indicators(&self) -> usize {
        self.indicators.len()
    }

    /// Replaces the geometry pass.
    pub fn set_drawer(&mut self, drawer: Box<dyn SceneDrawer>) {
        self.drawer = drawer;
    }

    /// Registers (or replaces) the program behind a pass.
    pub fn set_effect(&mut self, kind: PassKind, effect: Box<dyn PostEffect>) {
        if kind == PassKind::Render {
            log::warn!("The Render pass is driven by the SceneDrawer, not a PostEffect");
            return;
        }
        self.effects.insert(kind, effect);
    }

    pub fn remove_effect(&mut self, kind: PassKind) -> Option<Box<dyn PostEffect>> {
        self.effects.remove(&kind)
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            self.pixel_ratio = pixel_ratio;
        }
    }

    /// Sets the texture the next [`execute_chain`](RenderBackend::execute_chain)
    /// presents to (usually the current surface texture).
    pub fn begin_frame(&mut self, output: &wgpu::Texture) {
        self.frame_output = Some(FrameOutput {
            view: output.create_view(&wgpu::TextureViewDescriptor::default()),
            format: output.format(),
            width: output.width(),
            height: output.height(),
        });
    }

    /// Destroys every texture and indicator still alive.
    pub fn clear(&mut self) {
        let leaked = self.textures.len() + self.indicators.len();
        if leaked > 0 {
            log::debug!("Releasing {leaked} GPU resources still owned by the backend");
        }
        self.textures.clear();
        self.indicators.clear();
        if let Some(scratch) = self.scratch.take() {
            scratch.texture.destroy();
        }
    }

    fn ensure_scratch(&mut self, width: u32, height: u32, format: wgpu::TextureFormat) -> Result<()> {
        let matches = self
            .scratch
            .as_ref()
            .is_some_and(|s| s.width == width && s.height == height && s.format == format);
        if matches {
            return Ok(());
        }
        if let Some(old) = self.scratch.take() {
            old.texture.destroy();
        }
        self.scratch = Some(GpuTexture::render_target(
            &self.device,
            &TargetDesc::new("Post Scratch Target", width, height, format),
        )?);
        Ok(())
    }

    fn draw_scene(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &StudioScene,
        target: &ColorTarget<'_>,
    ) {
        let ctx = DrawContext {
            device: &self.device,
            queue: &self.queue,
            textures: &self.textures,
            clear_color: self.clear_color,
        };
        self.drawer.draw(&ctx, encoder, scene, target);

        if !scene.indicators.is_empty() {
            let aspect = target.width as f32 / target.height.max(1) as f32;
            self.indicators.draw(
                &self.device,
                &self.queue,
                encoder,
                &scene.indicators,
                self.drawer.view_projection(aspect),
                target.view,
                target.format,
            );
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = color;
    }

    fn upload_texture(&mut self, image: &Image) -> Result<TextureId> {
        let texture = GpuTexture::upload(&self.device, &self.queue, image)?;
        Ok(self.textures.insert(texture))
    }

    fn create_render_target(&mut self, desc: &TargetDesc) -> Result<TextureId> {
        let texture = GpuTexture::render_target(&self.device, desc)?;
        Ok(self.textures.insert(texture))
    }

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(texture).map(|t| (t.width, t.height))
    }

    fn texture_format(&self, texture: TextureId) -> Option<wgpu::TextureFormat> {
        self.textures.get(texture).map(|t| t.format)
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        if !self.textures.remove(texture) {
            log::trace!("dispose_texture: {texture:?} already released");
        }
    }

    fn render_scene(&mut self, scene: &StudioScene, target: TextureId) -> Result<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        // The registry cannot stay borrowed across `draw_scene(&mut self)`.
        let view = self.textures.try_get(target)?.view.clone();
        let (width, height, format) = {
            let t = self.textures.try_get(target)?;
            (t.width, t.height, t.format)
        };
        self.draw_scene(
            &mut encoder,
            scene,
            &ColorTarget {
                view: &view,
                format,
                width,
                height,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixels(&mut self, target: TextureId) -> Result<Vec<[f32; 4]>> {
        if !self.capabilities.pixel_readback {
            return Err(StudioError::ReadbackUnsupported);
        }
        let texture = self.textures.try_get(target)?;
        readback::read_texels(&self.device, &self.queue, texture)
    }

    fn rotate_equirect(&mut self, source: TextureId, target: TextureId, radians: f32) -> Result<()> {
        if source == target {
            return Err(StudioError::Backend(
                "Equirect rotation cannot run in place".into(),
            ));
        }
        let src = self.textures.try_get(source)?;
        let dst = self.textures.try_get(target)?;

        let uniforms = EquirectRotationUniforms {
            rotation: radians,
            ..Default::default()
        };
        self.rotation
            .write_uniforms(&self.queue, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Equirect Rotation Encoder"),
            });
        self.rotation
            .draw(&self.device, &mut encoder, &src.view, &dst.view, dst.format);
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn convolve_environment(&mut self, source: TextureId) -> Result<TextureId> {
        let src = self.textures.try_get(source)?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Environment Prefilter Encoder"),
            });
        let output = self.prefilter.run(&self.device, &mut encoder, &src.view);
        self.queue.submit(std::iter::once(encoder.finish()));

        log::info!(
            "Environment convolved ({PREFILTER_WIDTH}x{PREFILTER_HEIGHT}, {PREFILTER_MIP_COUNT} roughness levels)"
        );
        Ok(self.textures.insert(GpuTexture::wrap(output)))
    }

    fn create_indicator(&mut self, desc: &IndicatorDesc) -> Result<IndicatorId> {
        Ok(self.indicators.create(&self.device, desc))
    }

    fn dispose_indicator(&mut self, indicator: IndicatorId) {
        if !self.indicators.dispose(indicator) {
            log::trace!("dispose_indicator: {indicator:?} already released");
        }
    }

    fn execute_chain(&mut self, chain: &PassChain, scene: &StudioScene) -> Result<()> {
        let output = self.frame_output.take().ok_or_else(|| {
            StudioError::Backend("No frame output, call begin_frame first".into())
        })?;
        let screen = ColorTarget {
            view: &output.view,
            format: output.format,
            width: output.width,
            height: output.height,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pass Chain Encoder"),
            });

        let composition = chain
            .composition_target()
            .and_then(|id| self.textures.get(id))
            .map(|t| (t.view.clone(), t.width, t.height, t.format));

        let Some((comp_view, width, height, format)) = composition else {
            // Degraded path: no off-screen target, draw straight to the screen.
            log::debug!("No composition target, post passes skipped");
            self.draw_scene(&mut encoder, scene, &screen);
            self.queue.submit(std::iter::once(encoder.finish()));
            return Ok(());
        };

        self.ensure_scratch(width, height, format)?;
        self.draw_scene(
            &mut encoder,
            scene,
            &ColorTarget {
                view: &comp_view,
                format,
                width,
                height,
            },
        );

        let scratch_view = match &self.scratch {
            Some(scratch) => scratch.view.clone(),
            None => return Err(StudioError::Backend("Scratch target missing".into())),
        };

        let ctx = EffectContext {
            device: &self.device,
            queue: &self.queue,
        };

        // `front` holds the latest result.
        let (mut front, mut back) = (&comp_view, &scratch_view);
        for pass in chain.enabled_passes() {
            if pass.kind() == PassKind::Render || pass.renders_to_screen() {
                continue;
            }
            let Some(effect) = self.effects.get_mut(&pass.kind()) else {
                log::trace!("No program for pass {}, skipped", pass.kind().name());
                continue;
            };
            effect.apply(
                &ctx,
                &mut encoder,
                pass,
                front,
                &ColorTarget {
                    view: back,
                    format,
                    width,
                    height,
                },
            );
            std::mem::swap(&mut front, &mut back);
        }

        let terminal = chain.terminal();
        match self.effects.get_mut(&terminal.kind()) {
            Some(effect) => effect.apply(&ctx, &mut encoder, terminal, front, &screen),
            None => self
                .blit
                .draw(&self.device, &mut encoder, front, screen.view, screen.format),
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
