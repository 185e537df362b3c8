use glam::{Quat, Vec3};

use crate::environment::normalize_degrees;
use crate::lighting::{
    LightDescriptor, LightId, LightProperty, LightSettings, LightingSettings, ModelBounds,
};
use crate::renderer::backend::{IndicatorDesc, IndicatorId, RenderBackend};
use crate::scene::{SceneLight, StudioScene};

/// Indicator distance from the model center, in model radii.
pub const INDICATOR_DISTANCE: f32 = 1.6;

/// Indicator size at full normalized intensity, in model radii.
const INDICATOR_SIZE: f32 = 0.08;

/// Share of the indicator size kept at zero intensity.
const INDICATOR_MIN_SCALE: f32 = 0.35;

const MAX_MASTER: f32 = 2.0;

#[derive(Debug, Clone, Copy)]
struct RigLight {
    descriptor: LightDescriptor,
    configured: LightSettings,
    position: Option<Vec3>,
    intensity: f32,
}

impl RigLight {
    fn to_scene(self) -> SceneLight {
        SceneLight {
            id: self.descriptor.id,
            position: self.position,
            color: Vec3::from(self.configured.color),
            intensity: self.intensity,
        }
    }
}

/// Key / fill / rim / ambient rig.
///
/// Every derived value is recomputed from the immutable descriptors, so any
/// sequence of rotations or dimmer changes is free of accumulated drift.
#[derive(Debug)]
pub struct LightingRig {
    lights: Vec<RigLight>,
    settings: LightingSettings,
    bounds: Option<ModelBounds>,
    indicators: Vec<IndicatorId>,
}

impl LightingRig {
    #[must_use]
    pub fn new(
        descriptors: impl IntoIterator<Item = LightDescriptor>,
        settings: LightingSettings,
    ) -> Self {
        let mut settings = settings;
        settings.master = clamp_master(settings.master);
        settings.rotation = normalize_degrees(settings.rotation);

        let lights = descriptors
            .into_iter()
            .map(|descriptor| RigLight {
                descriptor,
                configured: settings
                    .lights
                    .get(&descriptor.id)
                    .copied()
                    .unwrap_or_else(|| LightSettings::from(&descriptor)),
                position: descriptor.base_position,
                intensity: 0.0,
            })
            .collect();

        let mut rig = Self {
            lights,
            settings,
            bounds: None,
            indicators: Vec::new(),
        };
        rig.recompute();
        rig
    }

    /// Rig with [`LightDescriptor::studio_defaults`].
    #[must_use]
    pub fn studio(settings: LightingSettings) -> Self {
        Self::new(LightDescriptor::studio_defaults(), settings)
    }

    // === Accessors ===

    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.settings.rotation
    }

    #[must_use]
    pub fn master(&self) -> f32 {
        self.settings.master
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    #[must_use]
    pub fn indicators_visible(&self) -> bool {
        self.settings.show_indicators
    }

    #[must_use]
    pub fn model_bounds(&self) -> Option<ModelBounds> {
        self.bounds
    }

    #[must_use]
    pub fn indicators(&self) -> &[IndicatorId] {
        &self.indicators
    }

    /// Effective state of one light.
    #[must_use]
    pub fn light(&self, id: LightId) -> Option<SceneLight> {
        self.lights
            .iter()
            .find(|l| l.descriptor.id == id)
            .map(|l| l.to_scene())
    }

    /// The user configuration of one light, before multipliers.
    #[must_use]
    pub fn configured(&self, id: LightId) -> Option<LightSettings> {
        self.lights
            .iter()
            .find(|l| l.descriptor.id == id)
            .map(|l| l.configured)
    }

    pub fn lights(&self) -> impl Iterator<Item = SceneLight> + '_ {
        self.lights.iter().map(|l| l.to_scene())
    }

    // === Mutators ===

    /// Rotates every directional light about +Y from its base position.
    pub fn set_rotation(&mut self, backend: &mut dyn RenderBackend, degrees: f32) {
        self.settings.rotation = normalize_degrees(degrees);
        self.refresh(backend);
    }

    /// Sets the master dimmer, clamped to `[0, 2]`.
    pub fn set_master(&mut self, backend: &mut dyn RenderBackend, master: f32) {
        self.settings.master = clamp_master(master);
        self.refresh(backend);
    }

    /// Disabling zeroes every intensity; configured values are kept.
    pub fn set_enabled(&mut self, backend: &mut dyn RenderBackend, enabled: bool) {
        self.settings.enabled = enabled;
        self.refresh(backend);
    }

    /// Replaces the configuration of the listed lights.
    ///
    /// Ids missing from the rig are ignored.
    pub fn apply_settings(
        &mut self,
        backend: &mut dyn RenderBackend,
        settings: impl IntoIterator<Item = (LightId, LightSettings)>,
    ) {
        for (id, config) in settings {
            match self.lights.iter_mut().find(|l| l.descriptor.id == id) {
                Some(light) => light.configured = sanitize(config, light.configured),
                None => log::debug!("Light {} is not part of the rig", id.name()),
            }
        }
        self.refresh(backend);
    }

    pub fn update_light_property(
        &mut self,
        backend: &mut dyn RenderBackend,
        id: LightId,
        property: LightProperty,
    ) {
        let Some(light) = self.lights.iter_mut().find(|l| l.descriptor.id == id) else {
            log::debug!("Light {} is not part of the rig", id.name());
            return;
        };
        let mut config = light.configured;
        match property {
            LightProperty::Color(color) => config.color = color.to_array(),
            LightProperty::Intensity(intensity) => config.intensity = intensity,
        }
        light.configured = sanitize(config, light.configured);
        self.refresh(backend);
    }

    /// Stores the model bounds indicators are placed around.
    pub fn set_model_bounds(&mut self, backend: &mut dyn RenderBackend, bounds: ModelBounds) {
        if !bounds.center.is_finite() || !bounds.radius.is_finite() || bounds.radius <= 0.0 {
            log::warn!("Ignoring invalid model bounds {bounds:?}");
            return;
        }
        self.bounds = Some(bounds);
        self.rebuild_indicators(backend);
    }

    pub fn set_indicators_visible(&mut self, backend: &mut dyn RenderBackend, visible: bool) {
        self.settings.show_indicators = visible;
        self.rebuild_indicators(backend);
    }

    /// Writes the effective lights and live indicators into the scene.
    pub fn publish(&self, scene: &mut StudioScene) {
        scene.lights.clear();
        scene.lights.extend(self.lights());
        scene.indicators.clone_from(&self.indicators);
    }

    /// Releases all indicators.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        self.release_indicators(backend);
    }

    // === Internals ===

    fn refresh(&mut self, backend: &mut dyn RenderBackend) {
        self.recompute();
        if self.settings.show_indicators {
            self.rebuild_indicators(backend);
        }
    }

    fn recompute(&mut self) {
        let rotation = Quat::from_rotation_y(self.settings.rotation.to_radians());
        for light in &mut self.lights {
            light.position = light.descriptor.base_position.map(|base| rotation * base);
            light.intensity = if self.settings.enabled {
                self.settings.multiplier(light.descriptor.id)
                    * light.configured.intensity
                    * self.settings.master
            } else {
                0.0
            };
        }
    }

    fn release_indicators(&mut self, backend: &mut dyn RenderBackend) {
        for indicator in self.indicators.drain(..) {
            backend.dispose_indicator(indicator);
        }
    }

    fn rebuild_indicators(&mut self, backend: &mut dyn RenderBackend) {
        self.release_indicators(backend);

        if !self.settings.show_indicators {
            return;
        }
        let Some(bounds) = self.bounds else {
            log::debug!("Light indicators need model bounds");
            return;
        };

        let peak = self
            .lights
            .iter()
            .filter(|l| l.position.is_some())
            .map(|l| l.intensity)
            .fold(0.0f32, f32::max);

        for light in &self.lights {
            let Some(position) = light.position else {
                continue;
            };
            // Markers sit on the ray from the model center toward the light.
            let Some(direction) = (position - bounds.center).try_normalize() else {
                continue;
            };

            let normalized = if peak > 0.0 { light.intensity / peak } else { 0.0 };
            let scale = bounds.radius
                * INDICATOR_SIZE
                * (INDICATOR_MIN_SCALE + (1.0 - INDICATOR_MIN_SCALE) * normalized);

            let desc = IndicatorDesc {
                position: bounds.center + direction * bounds.radius * INDICATOR_DISTANCE,
                rotation: Quat::from_rotation_arc(Vec3::NEG_Z, -direction),
                scale,
                color: Vec3::from(light.configured.color),
            };

            match backend.create_indicator(&desc) {
                Ok(id) => self.indicators.push(id),
                Err(e) => log::warn!("Failed to create {} light indicator: {e}", light.descriptor.id.name()),
            }
        }
    }
}

fn clamp_master(master: f32) -> f32 {
    if master.is_finite() {
        master.clamp(0.0, MAX_MASTER)
    } else {
        1.0
    }
}

/// Keeps the previous value for any non-finite component.
fn sanitize(config: LightSettings, previous: LightSettings) -> LightSettings {
    let color = if config.color.iter().all(|c| c.is_finite()) {
        config.color.map(|c| c.max(0.0))
    } else {
        previous.color
    };
    let intensity = if config.intensity.is_finite() {
        config.intensity.max(0.0)
    } else {
        previous.intensity
    };
    LightSettings { color, intensity }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_is_clamped() {
        assert_eq!(clamp_master(5.0), MAX_MASTER);
        assert_eq!(clamp_master(-1.0), 0.0);
        assert_eq!(clamp_master(f32::NAN), 1.0);
    }

    #[test]
    fn sanitize_keeps_previous_on_nan() {
        let prev = LightSettings::new(Vec3::ONE, 1.0);
        let next = sanitize(
            LightSettings {
                color: [f32::NAN, 0.0, 0.0],
                intensity: f32::INFINITY,
            },
            prev,
        );
        assert_eq!(next, prev);
    }

    #[test]
    fn rotation_leaves_ambient_without_position() {
        let rig = LightingRig::studio(LightingSettings {
            rotation: 90.0,
            ..Default::default()
        });
        assert_eq!(rig.light(LightId::Ambient).unwrap().position, None);
        let key = rig.light(LightId::Key).unwrap().position.unwrap();
        // (5, 6, 5) rotated +90° about Y
        assert!((key - Vec3::new(5.0, 6.0, -5.0)).length() < 1e-4);
    }
}
