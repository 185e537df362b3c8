use serde::{Deserialize, Serialize};

use super::{Pass, PassChain, PassKind, PassUniforms, Viewport, allocate_composition};
use crate::renderer::backend::RenderBackend;
use crate::resources::ToneMappingMode;
use crate::resources::uniforms::{
    AberrationUniforms, AntiAliasUniforms, BloomUniforms, ColorGradeUniforms,
    DepthOfFieldUniforms, ExposureUniforms, GrainUniforms, LensDirtUniforms, TintUniforms,
    ToneMapUniforms,
};
use crate::resources::version_tracker::UniformCell;

/// Initial post-processing parameters.
///
/// Every field has a documented default, so a partial JSON object is enough
/// to override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub depth_of_field_enabled: bool,
    pub dof_focus: f32,
    pub dof_aperture: f32,
    pub dof_max_blur: f32,

    pub bloom_enabled: bool,
    pub bloom_threshold: f32,
    pub bloom_strength: f32,
    pub bloom_radius: f32,

    /// Lens-dirt overlay; off until explicitly turned on.
    pub lens_dirt_enabled: bool,
    pub lens_dirt_intensity: f32,

    pub tint_color: [f32; 3],
    pub tint_amount: f32,

    pub grain_enabled: bool,
    pub grain_amount: f32,
    pub grain_pattern_size: f32,

    pub chromatic_aberration_enabled: bool,
    pub chromatic_aberration: f32,

    /// Screen-space anti-aliasing; off until explicitly turned on.
    pub anti_alias_enabled: bool,

    pub contrast: f32,
    pub saturation: f32,
    pub brightness: f32,

    pub tone_mapping: ToneMappingMode,
}

impl Default for PostSettings {
    fn default() -> Self {
        let dof = DepthOfFieldUniforms::default();
        let bloom = BloomUniforms::default();
        let grain = GrainUniforms::default();
        let grade = ColorGradeUniforms::default();
        Self {
            depth_of_field_enabled: true,
            dof_focus: dof.focus,
            dof_aperture: dof.aperture,
            dof_max_blur: dof.max_blur,
            bloom_enabled: true,
            bloom_threshold: bloom.threshold,
            bloom_strength: bloom.strength,
            bloom_radius: bloom.radius,
            lens_dirt_enabled: false,
            lens_dirt_intensity: LensDirtUniforms::default().intensity,
            tint_color: TintUniforms::default().color,
            tint_amount: TintUniforms::default().amount,
            grain_enabled: true,
            grain_amount: grain.amount,
            grain_pattern_size: grain.pattern_size,
            chromatic_aberration_enabled: true,
            chromatic_aberration: AberrationUniforms::default().amount,
            anti_alias_enabled: false,
            contrast: grade.contrast,
            saturation: grade.saturation,
            brightness: grade.brightness,
            tone_mapping: ToneMappingMode::default(),
        }
    }
}

/// Builds the fixed-order [`PassChain`].
#[derive(Debug, Clone, Default)]
pub struct PassChainBuilder {
    settings: PostSettings,
}

impl PassChainBuilder {
    #[must_use]
    pub fn new(settings: PostSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &PostSettings {
        &self.settings
    }

    /// Constructs every pass and allocates the composition target.
    ///
    /// Never fails: a missing composition target is logged and leaves the
    /// post passes without visible effect.
    pub fn build(&self, backend: &mut dyn RenderBackend, viewport: Viewport) -> PassChain {
        let s = &self.settings;
        let (pw, ph) = viewport.physical_size();

        let passes = PassKind::ALL
            .iter()
            .map(|&kind| match kind {
                PassKind::Render => Pass::new(kind, true, PassUniforms::Render),
                PassKind::DepthOfField => Pass::new(
                    kind,
                    s.depth_of_field_enabled,
                    PassUniforms::DepthOfField(UniformCell::new(DepthOfFieldUniforms {
                        focus: s.dof_focus,
                        aperture: s.dof_aperture,
                        max_blur: s.dof_max_blur,
                        ..Default::default()
                    })),
                ),
                PassKind::Bloom => Pass::new(
                    kind,
                    s.bloom_enabled,
                    PassUniforms::Bloom(UniformCell::new(BloomUniforms {
                        threshold: s.bloom_threshold,
                        strength: s.bloom_strength,
                        radius: s.bloom_radius,
                        ..Default::default()
                    })),
                ),
                PassKind::LensDirt => Pass::new(
                    kind,
                    s.lens_dirt_enabled,
                    PassUniforms::LensDirt(UniformCell::new(LensDirtUniforms {
                        intensity: s.lens_dirt_intensity,
                        ..Default::default()
                    })),
                ),
                PassKind::Tint => Pass::new(
                    kind,
                    true,
                    PassUniforms::Tint(UniformCell::new(TintUniforms {
                        color: s.tint_color,
                        amount: s.tint_amount,
                    })),
                ),
                PassKind::Grain => Pass::new(
                    kind,
                    s.grain_enabled,
                    PassUniforms::Grain(UniformCell::new(GrainUniforms {
                        amount: s.grain_amount,
                        pattern_size: s.grain_pattern_size,
                        ..Default::default()
                    })),
                ),
                PassKind::ChromaticAberration => Pass::new(
                    kind,
                    s.chromatic_aberration_enabled,
                    PassUniforms::ChromaticAberration(UniformCell::new(AberrationUniforms {
                        amount: s.chromatic_aberration,
                        ..Default::default()
                    })),
                ),
                PassKind::AntiAlias => Pass::new(
                    kind,
                    s.anti_alias_enabled,
                    PassUniforms::AntiAlias(UniformCell::new(AntiAliasUniforms {
                        resolution: [1.0 / pw as f32, 1.0 / ph as f32],
                        ..Default::default()
                    })),
                ),
                PassKind::Exposure => Pass::new(
                    kind,
                    true,
                    PassUniforms::Exposure(UniformCell::new(ExposureUniforms::default())),
                ),
                PassKind::ColorGrade => Pass::new(
                    kind,
                    true,
                    PassUniforms::ColorGrade(UniformCell::new(ColorGradeUniforms {
                        contrast: s.contrast,
                        saturation: s.saturation,
                        brightness: s.brightness,
                        ..Default::default()
                    })),
                ),
                PassKind::ToneMap => Pass::new(
                    kind,
                    true,
                    PassUniforms::ToneMap(UniformCell::new(ToneMapUniforms {
                        mode: s.tone_mapping.index(),
                        ..Default::default()
                    })),
                ),
            })
            .collect();

        let composition = allocate_composition(backend, viewport);
        log::debug!("Pass chain built for {pw}x{ph}");

        PassChain::new(passes, composition, viewport)
    }
}
