//! # Myth Studio
//!
//! Scene illumination and exposure control for product viewers on wgpu.
//!
//! The crate drives one scene through four cooperating parts:
//!
//! - [`PassChain`]: the fixed-order post-processing chain (DoF, bloom, tint,
//!   grain, exposure, tone mapping, ...)
//! - [`ExposureController`]: closed-loop auto exposure from a tiny luminance
//!   readback
//! - [`EnvironmentController`]: preset loading, caching, rotation and
//!   convolution of image-based lighting
//! - [`LightingRig`]: key / fill / rim / ambient lights with optional
//!   debug indicators
//!
//! All GPU work goes through the [`RenderBackend`] trait; [`WgpuBackend`] is
//! the wgpu implementation. [`Studio`] ties everything together.

pub mod config;
pub mod environment;
pub mod errors;
pub mod exposure;
pub mod lighting;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod studio;

pub use config::{ExposureConfig, StudioConfig};
pub use environment::{
    EnvironmentController, EnvironmentLoader, EnvironmentPreset, EnvironmentSettings,
    EnvironmentSource, MemoryEnvironmentLoader, PresetCatalog, PresetMood,
};
#[cfg(not(target_arch = "wasm32"))]
pub use environment::FileEnvironmentLoader;
#[cfg(feature = "http")]
pub use environment::HttpEnvironmentLoader;
pub use errors::{Result, StudioError};
pub use exposure::{ExposureController, ExposureMode, ExposureSettings};
pub use lighting::{LightId, LightProperty, LightSettings, LightingRig, LightingSettings, ModelBounds};
pub use renderer::{PassChain, PassKind, PostSettings, RenderBackend, WgpuBackend};
pub use resources::{Image, ToneMappingMode};
pub use scene::{Background, SceneLight, StudioScene};
pub use studio::Studio;
