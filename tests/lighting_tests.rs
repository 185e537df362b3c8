//! Lighting Rig Tests
//!
//! Tests for:
//! - Effective intensity (kind multiplier × configured × master)
//! - Rig rotation about +Y without drift
//! - Per-light updates and invalid input handling
//! - Indicator placement, rebuilds and release

mod common;

use glam::{Quat, Vec3};

use common::{RecordingBackend, approx};
use myth_studio::lighting::{
    INDICATOR_DISTANCE, LightDescriptor, LightId, LightProperty, LightSettings, LightingRig,
    LightingSettings, ModelBounds,
};
use myth_studio::scene::StudioScene;

fn rig() -> LightingRig {
    LightingRig::studio(LightingSettings::default())
}

fn base_position(id: LightId) -> Option<Vec3> {
    LightDescriptor::studio_defaults()
        .into_iter()
        .find(|d| d.id == id)
        .and_then(|d| d.base_position)
}

// ============================================================================
// Intensity
// ============================================================================

#[test]
fn effective_intensity_applies_multipliers() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();

    assert!(approx(rig.light(LightId::Key).unwrap().intensity, 2.0));
    assert!(approx(rig.light(LightId::Fill).unwrap().intensity, 0.9));
    assert!(approx(rig.light(LightId::Ambient).unwrap().intensity, 0.75));

    rig.set_master(&mut backend, 0.5);
    assert!(approx(rig.light(LightId::Key).unwrap().intensity, 1.0));
    assert!(approx(rig.light(LightId::Ambient).unwrap().intensity, 0.375));
}

#[test]
fn master_is_clamped_to_two() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();

    rig.set_master(&mut backend, 10.0);
    assert!(approx(rig.master(), 2.0));
    rig.set_master(&mut backend, -1.0);
    assert_eq!(rig.master(), 0.0);
    assert!(rig.lights().all(|l| l.intensity == 0.0));
}

#[test]
fn disabling_zeroes_but_keeps_configuration() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();

    rig.set_enabled(&mut backend, false);
    assert!(rig.lights().all(|l| l.intensity == 0.0));
    assert!(approx(rig.configured(LightId::Key).unwrap().intensity, 1.0));

    rig.set_enabled(&mut backend, true);
    assert!(approx(rig.light(LightId::Key).unwrap().intensity, 2.0));
}

#[test]
fn configured_overrides_come_from_settings() {
    let mut settings = LightingSettings::default();
    settings
        .lights
        .insert(LightId::Rim, LightSettings::new(Vec3::new(1.0, 0.0, 0.0), 0.2));
    let rig = LightingRig::studio(settings);

    let rim = rig.light(LightId::Rim).unwrap();
    assert_eq!(rim.color, Vec3::new(1.0, 0.0, 0.0));
    assert!(approx(rim.intensity, 0.4));
}

// ============================================================================
// Rotation
// ============================================================================

#[test]
fn full_turn_returns_to_base_positions() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();

    for step in 1..=36 {
        rig.set_rotation(&mut backend, step as f32 * 10.0);
    }

    assert_eq!(rig.rotation(), 0.0);
    for id in [LightId::Key, LightId::Fill, LightId::Rim] {
        let position = rig.light(id).unwrap().position.unwrap();
        let base = base_position(id).unwrap();
        assert!((position - base).length() < 1e-4, "{id:?} drifted to {position}");
    }
}

#[test]
fn rotation_preserves_height_and_distance() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();
    rig.set_rotation(&mut backend, 137.0);

    let key = rig.light(LightId::Key).unwrap().position.unwrap();
    let base = base_position(LightId::Key).unwrap();
    assert!(approx(key.y, base.y));
    assert!(approx(key.length(), base.length()));

    let expected = Quat::from_rotation_y(137f32.to_radians()) * base;
    assert!((key - expected).length() < 1e-4);
}

#[test]
fn negative_rotation_is_normalized() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();
    rig.set_rotation(&mut backend, -90.0);
    assert!(approx(rig.rotation(), 270.0));
}

// ============================================================================
// Per-light Updates
// ============================================================================

#[test]
fn update_light_property_changes_one_light() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();

    rig.update_light_property(&mut backend, LightId::Fill, LightProperty::Intensity(1.0));
    rig.update_light_property(
        &mut backend,
        LightId::Fill,
        LightProperty::Color(Vec3::new(0.2, 0.4, 0.6)),
    );

    let fill = rig.light(LightId::Fill).unwrap();
    assert!(approx(fill.intensity, 2.0));
    assert_eq!(fill.color, Vec3::new(0.2, 0.4, 0.6));
    assert!(approx(rig.light(LightId::Key).unwrap().intensity, 2.0));
}

#[test]
fn non_finite_input_is_ignored() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();

    rig.update_light_property(&mut backend, LightId::Key, LightProperty::Intensity(f32::NAN));
    assert!(approx(rig.configured(LightId::Key).unwrap().intensity, 1.0));

    rig.apply_settings(
        &mut backend,
        [(LightId::Key, LightSettings::new(Vec3::ONE, -4.0))],
    );
    assert_eq!(rig.configured(LightId::Key).unwrap().intensity, 0.0);
}

#[test]
fn publish_writes_all_lights() {
    let rig = rig();
    let mut scene = StudioScene::new();

    rig.publish(&mut scene);

    assert_eq!(scene.lights.len(), 4);
    let ambient = scene.lights.iter().find(|l| l.id == LightId::Ambient).unwrap();
    assert_eq!(ambient.position, None);
}

// ============================================================================
// Indicators
// ============================================================================

#[test]
fn indicators_need_bounds() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();

    rig.set_indicators_visible(&mut backend, true);
    assert_eq!(backend.live_indicators(), 0);

    rig.set_model_bounds(&mut backend, ModelBounds::new(Vec3::ZERO, 2.0));
    assert_eq!(backend.live_indicators(), 3, "one per directional light");
}

#[test]
fn invalid_bounds_are_ignored() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();
    rig.set_indicators_visible(&mut backend, true);

    rig.set_model_bounds(&mut backend, ModelBounds::new(Vec3::ZERO, 0.0));
    rig.set_model_bounds(&mut backend, ModelBounds::new(Vec3::NAN, 1.0));

    assert_eq!(rig.model_bounds(), None);
    assert_eq!(backend.live_indicators(), 0);
}

#[test]
fn indicators_sit_on_light_directions() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();
    // Model sits level with the key light, well away from the origin.
    let bounds = ModelBounds::new(Vec3::new(0.0, 6.0, 0.0), 1.0);
    rig.set_model_bounds(&mut backend, bounds);
    rig.set_indicators_visible(&mut backend, true);

    for id in [LightId::Key, LightId::Fill, LightId::Rim] {
        let light = rig.light(id).unwrap().position.unwrap();
        let toward_light = (light - bounds.center).normalize();
        let expected = bounds.center + toward_light * bounds.radius * INDICATOR_DISTANCE;
        let found = rig
            .indicators()
            .iter()
            .filter_map(|&id| backend.indicator(id))
            .any(|desc| (desc.position - expected).length() < 1e-4);
        assert!(found, "no {id:?} indicator at {expected}");
    }

    // Key light is at the model's height, so its marker stays level too.
    let key = rig.light(LightId::Key).unwrap().position.unwrap();
    assert!(approx(key.y, bounds.center.y));
    assert!(
        rig.indicators()
            .iter()
            .filter_map(|&id| backend.indicator(id))
            .any(|desc| approx(desc.position.y, bounds.center.y))
    );

    for &id in rig.indicators() {
        let desc = backend.indicator(id).unwrap();
        // The marker's -Z axis points back at the model.
        let facing = desc.rotation * Vec3::NEG_Z;
        let toward_center = (bounds.center - desc.position).normalize();
        assert!(facing.dot(toward_center) > 0.999);
    }
}

#[test]
fn brighter_lights_get_larger_indicators() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();
    rig.set_model_bounds(&mut backend, ModelBounds::new(Vec3::ZERO, 1.0));
    rig.set_indicators_visible(&mut backend, true);

    let scales: Vec<f32> = rig
        .indicators()
        .iter()
        .map(|&id| backend.indicator(id).unwrap().scale)
        .collect();
    let max = scales.iter().copied().fold(0.0, f32::max);
    let min = scales.iter().copied().fold(f32::INFINITY, f32::min);
    assert!(max > min);
}

#[test]
fn rebuild_releases_previous_indicators() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();
    rig.set_model_bounds(&mut backend, ModelBounds::new(Vec3::ZERO, 1.0));
    rig.set_indicators_visible(&mut backend, true);

    for degrees in [15.0, 30.0, 45.0, 60.0] {
        rig.set_rotation(&mut backend, degrees);
        assert_eq!(backend.live_indicators(), 3);
    }
    rig.set_master(&mut backend, 1.5);
    assert_eq!(backend.live_indicators(), 3);
    assert_eq!(backend.calls.disposed_indicators, 15);

    rig.set_indicators_visible(&mut backend, false);
    assert_eq!(backend.live_indicators(), 0);
    assert!(rig.indicators().is_empty());
}

#[test]
fn dispose_releases_indicators() {
    let mut backend = RecordingBackend::new();
    let mut rig = rig();
    rig.set_model_bounds(&mut backend, ModelBounds::new(Vec3::ZERO, 1.0));
    rig.set_indicators_visible(&mut backend, true);

    rig.dispose(&mut backend);

    assert_eq!(backend.live_indicators(), 0);
    assert!(rig.indicators().is_empty());
}
