//! Rendering Layer
//!
//! - [`backend`]: the [`RenderBackend`] seam and the id types it hands out
//! - [`chain`]: the fixed-order post-processing [`PassChain`]
//! - [`gpu`]: [`WgpuBackend`], the wgpu implementation of the seam

pub mod backend;
pub mod chain;
pub mod gpu;

pub use backend::{
    BackendCapabilities, IndicatorDesc, IndicatorId, RenderBackend, TargetDesc, TextureId,
};
pub use chain::{HDR_TEXTURE_FORMAT, Pass, PassChain, PassChainBuilder, PassKind, PostSettings, Viewport};
pub use gpu::WgpuBackend;
