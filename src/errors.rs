//! Error Types
//!
//! This module defines the error types used throughout the studio core.
//!
//! # Overview
//!
//! The main error type [`StudioError`] covers the failure modes of the GPU
//! backend and of environment loading:
//! - Render target allocation and pixel readback failures
//! - Environment image I/O and decoding errors
//! - Configuration parsing errors
//!
//! Controllers never let these escape into the frame loop: they log the
//! failure and fall back to the last valid state. The errors surface only on
//! backend and loader APIs, where the caller decides what to do.
//!
//! ```rust,ignore
//! use myth_studio::errors::{StudioError, Result};
//!
//! fn load_config(text: &str) -> Result<StudioConfig> {
//!     Ok(serde_json::from_str(text)?)
//! }
//! ```

use thiserror::Error;

/// The main error type for the studio core.
#[derive(Error, Debug)]
pub enum StudioError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// A texture or render target id does not name a live GPU resource.
    #[error("Texture not found: {0}")]
    TextureNotFound(String),

    /// Render target allocation failed.
    #[error("Render target allocation failed: {0}")]
    TargetAllocation(String),

    /// Pixel readback is not available on this backend.
    #[error("Pixel readback is not supported by this backend")]
    ReadbackUnsupported,

    /// Pixel readback was attempted but failed.
    #[error("Pixel readback failed: {0}")]
    ReadbackFailed(String),

    /// Generic backend failure (convolution, rotation, upload).
    #[error("Backend error: {0}")]
    Backend(String),

    // ========================================================================
    // Environment Loading Errors
    // ========================================================================
    /// The requested preset id is not part of the catalog.
    #[error("Unknown environment preset: {0}")]
    UnknownPreset(String),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Remote fetch failure (bad URL, transport error, non-success status).
    #[error("Network error: {0}")]
    Network(String),

    /// Task join error (when the blocking decode task fails to complete).
    #[error("Task join error: {0}")]
    TaskJoinError(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for StudioError {
    fn from(err: image::ImageError) -> Self {
        StudioError::ImageDecodeError(err.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<tokio::task::JoinError> for StudioError {
    fn from(err: tokio::task::JoinError) -> Self {
        StudioError::TaskJoinError(err.to_string())
    }
}

/// Alias for `Result<T, StudioError>`.
pub type Result<T> = std::result::Result<T, StudioError>;
