//! Scene state published by the controllers.
//!
//! [`StudioScene`] is the explicit replacement for a shared, implicitly mutated
//! scene graph. Controllers only *write* the fields they own:
//!
//! | Field(s)                                         | Writer                  |
//! |--------------------------------------------------|-------------------------|
//! | `environment`, `environment_intensity`           | `EnvironmentController` |
//! | `background`, `background_blurriness/intensity`  | `EnvironmentController` |
//! | `lights`, `indicators`                           | `LightingRig`           |
//!
//! No controller reads back what another one wrote; the backend's geometry pass
//! is the only consumer.

use glam::Vec3;

use crate::lighting::LightId;
use crate::renderer::backend::{IndicatorId, TextureId};

/// What is drawn behind the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Flat clear color (linear RGB).
    Color(Vec3),
    /// Equirectangular texture.
    Texture(TextureId),
}

impl Default for Background {
    fn default() -> Self {
        Self::Color(Vec3::ZERO)
    }
}

/// A light as consumed by the geometry pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLight {
    pub id: LightId,
    /// World position for directional lights (pointing at the origin); `None` for ambient.
    pub position: Option<Vec3>,
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioScene {
    /// Prefiltered lighting map (equirectangular, mip chain by roughness).
    pub environment: Option<TextureId>,
    pub environment_intensity: f32,
    pub background: Background,
    pub background_blurriness: f32,
    pub background_intensity: f32,
    pub lights: Vec<SceneLight>,
    pub indicators: Vec<IndicatorId>,
}

impl Default for StudioScene {
    fn default() -> Self {
        Self {
            environment: None,
            environment_intensity: 0.0,
            background: Background::default(),
            background_blurriness: 0.0,
            background_intensity: 1.0,
            lights: Vec::new(),
            indicators: Vec::new(),
        }
    }
}

impl StudioScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether image-based lighting contributes to the frame.
    #[inline]
    #[must_use]
    pub fn has_environment(&self) -> bool {
        self.environment.is_some() && self.environment_intensity > 0.0
    }
}
