//! Post-Processing Pass Chain
//!
//! The chain is a fixed-topology list of passes. Its order is decided once by
//! [`PassChainBuilder`] and never changes afterwards; passes are only toggled
//! or have their uniforms rewritten.
//!
//! # Pass Order
//!
//! | #  | Pass                  | Uniform contract            | Default  |
//! |----|-----------------------|-----------------------------|----------|
//! | 0  | `Render`              | -                           | on       |
//! | 1  | `DepthOfField`        | focus / aperture / max blur | on       |
//! | 2  | `Bloom`               | threshold / strength / radius | on     |
//! | 3  | `LensDirt`            | intensity                   | **off**  |
//! | 4  | `Tint`                | `tintColor` + amount        | on       |
//! | 5  | `Grain`               | time / amount / size        | on       |
//! | 6  | `ChromaticAberration` | amount                      | on       |
//! | 7  | `AntiAlias`           | inverse resolution          | **off**  |
//! | 8  | `Exposure`            | exposure                    | on       |
//! | 9  | `ColorGrade`          | contrast / saturation / brightness | on |
//! | 10 | `ToneMap`             | mode, renders to screen    | on       |

mod builder;

pub use builder::{PassChainBuilder, PostSettings};

use crate::renderer::backend::{RenderBackend, TargetDesc, TextureId};
use crate::resources::ToneMappingMode;
use crate::resources::uniforms::{
    AberrationUniforms, AntiAliasUniforms, BloomUniforms, ColorGradeUniforms,
    DepthOfFieldUniforms, ExposureUniforms, GrainUniforms, LensDirtUniforms, TintUniforms,
    ToneMapUniforms,
};
use crate::resources::version_tracker::UniformCell;

/// Identifies one pass of the chain. Discriminants equal chain positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PassKind {
    Render = 0,
    DepthOfField = 1,
    Bloom = 2,
    LensDirt = 3,
    Tint = 4,
    Grain = 5,
    ChromaticAberration = 6,
    AntiAlias = 7,
    Exposure = 8,
    ColorGrade = 9,
    ToneMap = 10,
}

impl PassKind {
    /// Every pass, in execution order.
    pub const ALL: [PassKind; 11] = [
        Self::Render,
        Self::DepthOfField,
        Self::Bloom,
        Self::LensDirt,
        Self::Tint,
        Self::Grain,
        Self::ChromaticAberration,
        Self::AntiAlias,
        Self::Exposure,
        Self::ColorGrade,
        Self::ToneMap,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Pass name (for debugging and labels).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Render => "Render",
            Self::DepthOfField => "DepthOfField",
            Self::Bloom => "Bloom",
            Self::LensDirt => "LensDirt",
            Self::Tint => "Tint",
            Self::Grain => "Grain",
            Self::ChromaticAberration => "ChromaticAberration",
            Self::AntiAlias => "AntiAlias",
            Self::Exposure => "Exposure",
            Self::ColorGrade => "ColorGrade",
            Self::ToneMap => "ToneMap",
        }
    }
}

/// Uniform storage of a pass, tagged by the program it feeds.
#[derive(Debug, Clone)]
pub enum PassUniforms {
    Render,
    DepthOfField(UniformCell<DepthOfFieldUniforms>),
    Bloom(UniformCell<BloomUniforms>),
    LensDirt(UniformCell<LensDirtUniforms>),
    Tint(UniformCell<TintUniforms>),
    Grain(UniformCell<GrainUniforms>),
    ChromaticAberration(UniformCell<AberrationUniforms>),
    AntiAlias(UniformCell<AntiAliasUniforms>),
    Exposure(UniformCell<ExposureUniforms>),
    ColorGrade(UniformCell<ColorGradeUniforms>),
    ToneMap(UniformCell<ToneMapUniforms>),
}

impl PassUniforms {
    /// Bytes to upload; empty for the geometry pass.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Render => &[],
            Self::DepthOfField(u) => u.as_bytes(),
            Self::Bloom(u) => u.as_bytes(),
            Self::LensDirt(u) => u.as_bytes(),
            Self::Tint(u) => u.as_bytes(),
            Self::Grain(u) => u.as_bytes(),
            Self::ChromaticAberration(u) => u.as_bytes(),
            Self::AntiAlias(u) => u.as_bytes(),
            Self::Exposure(u) => u.as_bytes(),
            Self::ColorGrade(u) => u.as_bytes(),
            Self::ToneMap(u) => u.as_bytes(),
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        match self {
            Self::Render => 0,
            Self::DepthOfField(u) => u.version(),
            Self::Bloom(u) => u.version(),
            Self::LensDirt(u) => u.version(),
            Self::Tint(u) => u.version(),
            Self::Grain(u) => u.version(),
            Self::ChromaticAberration(u) => u.version(),
            Self::AntiAlias(u) => u.version(),
            Self::Exposure(u) => u.version(),
            Self::ColorGrade(u) => u.version(),
            Self::ToneMap(u) => u.version(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pass {
    kind: PassKind,
    enabled: bool,
    renders_to_screen: bool,
    uniforms: PassUniforms,
}

impl Pass {
    pub(crate) fn new(kind: PassKind, enabled: bool, uniforms: PassUniforms) -> Self {
        Self {
            kind,
            enabled,
            renders_to_screen: kind == PassKind::ToneMap,
            uniforms,
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn renders_to_screen(&self) -> bool {
        self.renders_to_screen
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &PassUniforms {
        &self.uniforms
    }
}

/// Logical viewport plus device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
                pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Size in device pixels, never zero.
    #[must_use]
    pub fn physical_size(&self) -> (u32, u32) {
        let w = (self.width as f32 * self.pixel_ratio).round() as u32;
        let h = (self.height as f32 * self.pixel_ratio).round() as u32;
        (w.max(1), h.max(1))
    }
}

/// Main HDR color format used for the composition target.
pub const HDR_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// The ordered post-processing chain.
#[derive(Debug)]
pub struct PassChain {
    passes: Vec<Pass>,
    composition: Option<TextureId>,
    viewport: Viewport,
}

macro_rules! with_uniforms {
    ($chain:expr, $variant:ident, |$u:ident| $body:expr) => {
        if let PassUniforms::$variant($u) = &mut $chain.passes[PassKind::$variant.index()].uniforms
        {
            $body
        }
    };
}

impl PassChain {
    pub(crate) fn new(passes: Vec<Pass>, composition: Option<TextureId>, viewport: Viewport) -> Self {
        debug_assert!(
            passes.iter().enumerate().all(|(i, p)| p.kind.index() == i),
            "pass order must follow PassKind::ALL"
        );
        debug_assert_eq!(passes.iter().filter(|p| p.renders_to_screen).count(), 1);
        Self {
            passes,
            composition,
            viewport,
        }
    }

    #[must_use]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Enabled passes in execution order.
    pub fn enabled_passes(&self) -> impl Iterator<Item = &Pass> {
        self.passes.iter().filter(|p| p.enabled)
    }

    #[must_use]
    pub fn pass(&self, kind: PassKind) -> &Pass {
        &self.passes[kind.index()]
    }

    /// The single pass that renders to screen.
    #[must_use]
    pub fn terminal(&self) -> &Pass {
        self.pass(PassKind::ToneMap)
    }

    #[must_use]
    pub fn is_enabled(&self, kind: PassKind) -> bool {
        self.pass(kind).enabled
    }

    /// Toggles a pass. The geometry and tone-map passes cannot be disabled.
    pub fn set_enabled(&mut self, kind: PassKind, enabled: bool) {
        if matches!(kind, PassKind::Render | PassKind::ToneMap) && !enabled {
            log::warn!("Pass {} cannot be disabled", kind.name());
            return;
        }
        self.passes[kind.index()].enabled = enabled;
    }

    #[must_use]
    pub fn composition_target(&self) -> Option<TextureId> {
        self.composition
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // === Uniform contracts ===

    pub fn set_exposure(&mut self, exposure: f32) {
        with_uniforms!(self, Exposure, |u| {
            if (u.get().exposure - exposure).abs() > f32::EPSILON {
                u.write().exposure = exposure;
            }
        });
    }

    #[must_use]
    pub fn exposure(&self) -> f32 {
        match &self.pass(PassKind::Exposure).uniforms {
            PassUniforms::Exposure(u) => u.get().exposure,
            _ => 1.0,
        }
    }

    pub fn set_depth_of_field(&mut self, focus: f32, aperture: f32, max_blur: f32) {
        with_uniforms!(self, DepthOfField, |u| {
            let mut data = u.write();
            data.focus = focus.max(0.0);
            data.aperture = aperture.max(0.0);
            data.max_blur = max_blur.max(0.0);
        });
    }

    pub fn set_bloom(&mut self, threshold: f32, strength: f32, radius: f32) {
        with_uniforms!(self, Bloom, |u| {
            let mut data = u.write();
            data.threshold = threshold.max(0.0);
            data.strength = strength.max(0.0);
            data.radius = radius.clamp(0.0, 1.0);
        });
    }

    pub fn set_lens_dirt_intensity(&mut self, intensity: f32) {
        with_uniforms!(self, LensDirt, |u| u.write().intensity = intensity.max(0.0));
    }

    pub fn set_tint(&mut self, color: glam::Vec3, amount: f32) {
        with_uniforms!(self, Tint, |u| {
            let mut data = u.write();
            data.color = color.to_array();
            data.amount = amount.clamp(0.0, 1.0);
        });
    }

    pub fn set_grain(&mut self, amount: f32, pattern_size: f32) {
        with_uniforms!(self, Grain, |u| {
            let mut data = u.write();
            data.amount = amount.clamp(0.0, 1.0);
            data.pattern_size = pattern_size.max(0.01);
        });
    }

    pub fn set_chromatic_aberration(&mut self, amount: f32) {
        with_uniforms!(self, ChromaticAberration, |u| u.write().amount = amount.max(0.0));
    }

    pub fn set_color_grade(&mut self, contrast: f32, saturation: f32, brightness: f32) {
        with_uniforms!(self, ColorGrade, |u| {
            let mut data = u.write();
            data.contrast = contrast.max(0.0);
            data.saturation = saturation.max(0.0);
            data.brightness = brightness;
        });
    }

    pub fn set_tone_mapping(&mut self, mode: ToneMappingMode) {
        with_uniforms!(self, ToneMap, |u| {
            if u.get().mode != mode.index() {
                u.write().mode = mode.index();
            }
        });
    }

    /// Advances the grain time uniform. Skipped while grain is disabled.
    pub fn advance_time(&mut self, dt: f32) {
        if !self.is_enabled(PassKind::Grain) || !dt.is_finite() {
            return;
        }
        with_uniforms!(self, Grain, |u| {
            let mut data = u.write();
            // wrap to keep float precision in the noise hash
            data.time = (data.time + dt.max(0.0)) % 1000.0;
        });
    }

    /// Inverse resolution currently fed to the anti-aliasing program.
    #[must_use]
    pub fn anti_alias_resolution(&self) -> [f32; 2] {
        match &self.pass(PassKind::AntiAlias).uniforms {
            PassUniforms::AntiAlias(u) => u.get().resolution,
            _ => [1.0, 1.0],
        }
    }

    /// Reallocates size-dependent state after a viewport change.
    ///
    /// The composition target is disposed before its replacement is created.
    pub fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
        pixel_ratio: f32,
    ) {
        let viewport = Viewport::new(width, height, pixel_ratio);
        let (pw, ph) = viewport.physical_size();
        self.viewport = viewport;

        with_uniforms!(self, AntiAlias, |u| {
            u.write().resolution = [1.0 / pw as f32, 1.0 / ph as f32];
        });

        if let Some(old) = self.composition.take() {
            backend.dispose_texture(old);
        }
        self.composition = allocate_composition(backend, viewport);
    }

    /// Releases the composition target. The chain stays usable as a descriptor.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(target) = self.composition.take() {
            backend.dispose_texture(target);
        }
    }
}

pub(crate) fn allocate_composition(
    backend: &mut dyn RenderBackend,
    viewport: Viewport,
) -> Option<TextureId> {
    let (w, h) = viewport.physical_size();
    let format = if backend.capabilities().float_targets {
        HDR_TEXTURE_FORMAT
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    match backend.create_render_target(&TargetDesc::new("Composition Target", w, h, format)) {
        Ok(id) => Some(id),
        Err(e) => {
            log::warn!("Composition target unavailable, post passes will be skipped: {e}");
            None
        }
    }
}
