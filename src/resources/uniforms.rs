//! GPU uniform contracts.
//!
//! Every post-processing program and every internal GPU program consumes one
//! of these blocks. Layouts are 16-byte aligned so they can be bound directly
//! as WGSL `uniform` structs.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DepthOfFieldUniforms {
    pub focus: f32,
    pub aperture: f32,
    pub max_blur: f32,
    pub _pad: f32,
}

impl Default for DepthOfFieldUniforms {
    fn default() -> Self {
        Self {
            focus: 5.0,
            aperture: 0.025,
            max_blur: 0.01,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BloomUniforms {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
    pub _pad: f32,
}

impl Default for BloomUniforms {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            strength: 0.4,
            radius: 0.4,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LensDirtUniforms {
    pub intensity: f32,
    pub _pad: [f32; 3],
}

impl Default for LensDirtUniforms {
    fn default() -> Self {
        Self {
            intensity: 0.6,
            _pad: [0.0; 3],
        }
    }
}

/// `tintColor` contract.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TintUniforms {
    pub color: [f32; 3],
    pub amount: f32,
}

impl Default for TintUniforms {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            amount: 0.0,
        }
    }
}

/// Film grain: `time` advances every frame so the pattern animates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GrainUniforms {
    pub time: f32,
    pub amount: f32,
    pub pattern_size: f32,
    pub _pad: f32,
}

impl Default for GrainUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            amount: 0.05,
            pattern_size: 1.6,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AberrationUniforms {
    pub amount: f32,
    pub _pad: [f32; 3],
}

impl Default for AberrationUniforms {
    fn default() -> Self {
        Self {
            amount: 0.0015,
            _pad: [0.0; 3],
        }
    }
}

/// Inverse render resolution for the anti-aliasing program.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AntiAliasUniforms {
    pub resolution: [f32; 2],
    pub _pad: [f32; 2],
}

impl Default for AntiAliasUniforms {
    fn default() -> Self {
        Self {
            resolution: [1.0, 1.0],
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ExposureUniforms {
    pub exposure: f32,
    pub _pad: [f32; 3],
}

impl Default for ExposureUniforms {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            _pad: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorGradeUniforms {
    pub contrast: f32,
    pub saturation: f32,
    pub brightness: f32,
    pub _pad: f32,
}

impl Default for ColorGradeUniforms {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            saturation: 1.0,
            brightness: 0.0,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ToneMapUniforms {
    /// Index from [`ToneMappingMode::index`](super::tone_mapping::ToneMappingMode::index).
    pub mode: u32,
    pub _pad: [u32; 3],
}

impl Default for ToneMapUniforms {
    fn default() -> Self {
        Self {
            mode: super::tone_mapping::ToneMappingMode::default().index(),
            _pad: [0; 3],
        }
    }
}

/// Longitude offset for the equirectangular remap program, in radians.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct EquirectRotationUniforms {
    pub rotation: f32,
    pub _pad: [f32; 3],
}

/// Per-mip parameters for the environment prefilter.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct PrefilterUniforms {
    pub roughness: f32,
    pub mip_width: f32,
    pub mip_height: f32,
    pub sample_count: u32,
}

/// Debug indicator "material": transform plus flat color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct IndicatorUniforms {
    pub clip_from_local: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// Background program of the built-in scene drawer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BackgroundUniforms {
    pub world_from_clip: [[f32; 4]; 4],
    /// rgb = flat color, a = intensity.
    pub color: [f32; 4],
    /// x = mip level to sample, y = 1 when a texture is bound.
    pub params: [f32; 4],
}
