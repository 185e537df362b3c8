//! Environment lighting: preset loading, caching, rotation and convolution.
//!
//! Source textures are uploaded once per preset and cached for the lifetime of
//! the controller. Everything derived from a source (the rotated copy and the
//! convolved lighting map) is transient and re-created whenever the inputs
//! change.

pub mod cache;
mod controller;
pub mod loader;
pub mod preset;
mod slot;

pub use cache::{CachedEnvironment, EnvironmentCache};
pub use controller::{
    EnvironmentController, EnvironmentSettings, MAX_STRENGTH, PendingPreset, PresetRequest,
    normalize_degrees,
};
#[cfg(not(target_arch = "wasm32"))]
pub use loader::FileEnvironmentLoader;
#[cfg(feature = "http")]
pub use loader::HttpEnvironmentLoader;
pub use loader::{EnvironmentLoader, MemoryEnvironmentLoader};
pub use preset::{EnvironmentPreset, EnvironmentSource, PresetCatalog, PresetMood, SourceKind};
pub use slot::TransientSlot;
