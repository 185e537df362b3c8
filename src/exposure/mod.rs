//! Auto Exposure
//!
//! Luminance feedback loop driving the exposure pass of the chain.
//!
//! ```text
//! render 8×8 ─► readback ─► Σ luma / n ─► lerp 0.35 ─► curve ─► lerp 0.12 ─► exposure uniform
//! ```

mod controller;
pub mod curve;

pub use controller::{ExposureController, ExposureMode, ExposureState};
pub use curve::{ExposureSettings, average_luminance, relative_luminance};
