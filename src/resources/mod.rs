//! Pure data shared by the controllers and the GPU backend.

pub mod image;
pub mod tone_mapping;
pub mod uniforms;
pub mod version_tracker;

pub use image::{Image, is_hdr_format};
pub use tone_mapping::ToneMappingMode;
pub use version_tracker::{ChangeTracker, UniformCell};
