//! Three-point studio lighting.
//!
//! A fixed set of key / fill / rim directional lights plus one ambient light,
//! rotated and dimmed as a unit by [`LightingRig`].

mod rig;

pub use rig::{INDICATOR_DISTANCE, LightingRig};

use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightId {
    Key,
    Fill,
    Rim,
    Ambient,
}

impl LightId {
    pub const ALL: [Self; 4] = [Self::Key, Self::Fill, Self::Rim, Self::Ambient];

    #[inline]
    #[must_use]
    pub fn is_directional(self) -> bool {
        !matches!(self, Self::Ambient)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Key => "Key",
            Self::Fill => "Fill",
            Self::Rim => "Rim",
            Self::Ambient => "Ambient",
        }
    }
}

/// Construction-time description of one rig light. Never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDescriptor {
    pub id: LightId,
    /// Position at rig rotation 0; `None` for ambient.
    pub base_position: Option<Vec3>,
    pub color: Vec3,
    pub base_intensity: f32,
}

impl LightDescriptor {
    #[must_use]
    pub const fn directional(id: LightId, position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            id,
            base_position: Some(position),
            color,
            base_intensity: intensity,
        }
    }

    #[must_use]
    pub const fn ambient(color: Vec3, intensity: f32) -> Self {
        Self {
            id: LightId::Ambient,
            base_position: None,
            color,
            base_intensity: intensity,
        }
    }

    /// Classic product-shot layout: warm key front-right, cool fill
    /// front-left, rim behind.
    #[must_use]
    pub fn studio_defaults() -> [Self; 4] {
        [
            Self::directional(
                LightId::Key,
                Vec3::new(5.0, 6.0, 5.0),
                Vec3::new(1.0, 0.96, 0.9),
                1.0,
            ),
            Self::directional(
                LightId::Fill,
                Vec3::new(-6.0, 3.0, 4.0),
                Vec3::new(0.85, 0.9, 1.0),
                0.45,
            ),
            Self::directional(
                LightId::Rim,
                Vec3::new(0.0, 5.0, -7.0),
                Vec3::ONE,
                0.7,
            ),
            Self::ambient(Vec3::ONE, 0.25),
        ]
    }
}

/// User-configured color and intensity of one light (before multipliers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl LightSettings {
    #[must_use]
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self {
            color: color.to_array(),
            intensity,
        }
    }
}

impl From<&LightDescriptor> for LightSettings {
    fn from(desc: &LightDescriptor) -> Self {
        Self::new(desc.color, desc.base_intensity)
    }
}

/// A single editable property, for slider-style updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightProperty {
    Color(Vec3),
    Intensity(f32),
}

/// Bounding sphere of the displayed model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelBounds {
    pub center: Vec3,
    pub radius: f32,
}

impl ModelBounds {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Rig-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub enabled: bool,
    /// Master dimmer in `[0, 2]`.
    pub master: f32,
    /// Rig rotation about +Y in degrees.
    pub rotation: f32,
    pub show_indicators: bool,
    pub directional_multiplier: f32,
    /// Ambient light reads much dimmer than directional light at the same
    /// intensity, so it gets a larger multiplier.
    pub ambient_multiplier: f32,
    /// Per-light overrides; missing lights keep their descriptor values.
    pub lights: FxHashMap<LightId, LightSettings>,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            master: 1.0,
            rotation: 0.0,
            show_indicators: false,
            directional_multiplier: 2.0,
            ambient_multiplier: 3.0,
            lights: FxHashMap::default(),
        }
    }
}

impl LightingSettings {
    #[must_use]
    pub fn multiplier(&self, id: LightId) -> f32 {
        if id.is_directional() {
            self.directional_multiplier
        } else {
            self.ambient_multiplier
        }
    }
}
