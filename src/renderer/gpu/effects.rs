//! Post-processing programs.
//!
//! A [`PostEffect`] is the GPU program behind one [`PassKind`]. The backend
//! owns at most one effect per kind; the chain only decides order, toggles and
//! uniform values.
//!
//! Built-in fullscreen effects cover every kind except
//! [`PassKind::DepthOfField`], which needs the host's depth buffer and must be
//! registered by the host (see [`WgpuBackend::set_effect`]).
//!
//! [`WgpuBackend::set_effect`]: super::WgpuBackend::set_effect

use crate::renderer::chain::{Pass, PassKind};
use crate::renderer::gpu::ColorTarget;
use crate::renderer::gpu::fullscreen::FullscreenProgram;
use crate::resources::uniforms::{
    AberrationUniforms, AntiAliasUniforms, BloomUniforms, ColorGradeUniforms, ExposureUniforms,
    GrainUniforms, LensDirtUniforms, TintUniforms, ToneMapUniforms,
};

/// Device handles available to effects while recording.
pub struct EffectContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

pub trait PostEffect {
    fn name(&self) -> &str;

    /// Records the effect reading `input` and writing `output`.
    ///
    /// `pass` carries the current uniform values and their version.
    fn apply(
        &mut self,
        ctx: &EffectContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        pass: &Pass,
        input: &wgpu::TextureView,
        output: &ColorTarget<'_>,
    );
}

/// A fullscreen effect fed directly from the pass's uniform block.
#[derive(Debug)]
pub struct FullscreenEffect {
    program: FullscreenProgram,
    /// Uniform version last uploaded; `None` forces the first upload.
    uploaded_version: Option<u64>,
}

impl FullscreenEffect {
    #[must_use]
    pub fn new(program: FullscreenProgram) -> Self {
        Self {
            program,
            uploaded_version: None,
        }
    }
}

impl PostEffect for FullscreenEffect {
    fn name(&self) -> &str {
        self.program.label()
    }

    fn apply(
        &mut self,
        ctx: &EffectContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        pass: &Pass,
        input: &wgpu::TextureView,
        output: &ColorTarget<'_>,
    ) {
        let version = pass.uniforms().version();
        if self.uploaded_version != Some(version) {
            self.program.write_uniforms(ctx.queue, pass.uniforms().as_bytes());
            self.uploaded_version = Some(version);
        }
        self.program
            .draw(ctx.device, encoder, input, output.view, output.format);
    }
}

/// Creates the built-in program for `kind`, if there is one.
#[must_use]
pub fn builtin_effect(device: &wgpu::Device, kind: PassKind) -> Option<Box<dyn PostEffect>> {
    macro_rules! effect {
        ($label:literal, $file:literal, $uniforms:ty) => {
            FullscreenProgram::new(
                device,
                $label,
                include_str!(concat!("../shaders/post/", $file)),
                std::mem::size_of::<$uniforms>() as u64,
                wgpu::AddressMode::ClampToEdge,
            )
        };
    }

    let program = match kind {
        PassKind::Render | PassKind::DepthOfField => return None,
        PassKind::Bloom => effect!("Bloom", "bloom.wgsl", BloomUniforms),
        PassKind::LensDirt => effect!("Lens Dirt", "lens_dirt.wgsl", LensDirtUniforms),
        PassKind::Tint => effect!("Tint", "tint.wgsl", TintUniforms),
        PassKind::Grain => effect!("Film Grain", "grain.wgsl", GrainUniforms),
        PassKind::ChromaticAberration => effect!(
            "Chromatic Aberration",
            "chromatic_aberration.wgsl",
            AberrationUniforms
        ),
        PassKind::AntiAlias => effect!("Anti Alias", "anti_alias.wgsl", AntiAliasUniforms),
        PassKind::Exposure => effect!("Exposure", "exposure.wgsl", ExposureUniforms),
        PassKind::ColorGrade => effect!("Color Grade", "color_grade.wgsl", ColorGradeUniforms),
        PassKind::ToneMap => effect!("Tone Mapping", "tone_mapping.wgsl", ToneMapUniforms),
    };
    Some(Box::new(FullscreenEffect::new(program)))
}
