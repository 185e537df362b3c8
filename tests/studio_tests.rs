//! Studio Facade Tests
//!
//! Tests for:
//! - Construction from configuration
//! - Preset switching re-seeding auto exposure
//! - Lighting mutators publishing into the scene
//! - Frame rendering, resize and full disposal

mod common;

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;

use common::{CountingLoader, RecordingBackend, approx, synthetic_image, test_catalog};
use myth_studio::config::StudioConfig;
use myth_studio::environment::PresetRequest;
use myth_studio::exposure::ExposureMode;
use myth_studio::lighting::{LightId, LightProperty, ModelBounds};
use myth_studio::renderer::chain::PassKind;
use myth_studio::scene::Background;
use myth_studio::studio::Studio;

type TestStudio = Studio<RecordingBackend, CountingLoader>;

fn studio_with(config: StudioConfig) -> TestStudio {
    Studio::new(RecordingBackend::new(), CountingLoader::new(), config, 640, 480)
}

fn studio() -> TestStudio {
    studio_with(StudioConfig {
        presets: test_catalog(),
        ..Default::default()
    })
}

#[test]
fn new_publishes_fallback_and_lights() {
    let studio = studio();
    let scene = studio.scene();

    assert_eq!(scene.environment, None);
    assert!(matches!(scene.background, Background::Color(_)));
    assert_eq!(scene.lights.len(), 4);
    assert!(studio.chain().composition_target().is_some());
    assert_eq!(studio.exposure_mode(), ExposureMode::Auto);
}

#[test]
fn config_from_json_drives_initial_state() -> anyhow::Result<()> {
    let config = StudioConfig::from_json_str(
        r#"{
            "exposure": { "initial": 1.4, "auto": false },
            "post": { "bloom_enabled": false },
            "environment": { "strength": 1.2, "rotation": 45 },
            "lighting": { "master": 0.5 },
            "presets": [
                { "id": "studio", "source": { "uri": "studio.hdr", "kind": "hdr" } }
            ],
            "initial_preset": "studio"
        }"#,
    )?;
    let mut studio = studio_with(config);

    assert_eq!(studio.exposure_mode(), ExposureMode::Manual);
    assert!(approx(studio.exposure(), 1.4));
    assert!(approx(studio.chain().exposure(), 1.4));
    assert!(!studio.chain().is_enabled(PassKind::Bloom));
    assert!(approx(studio.lighting().master(), 0.5));

    let mood = pollster::block_on(studio.load_initial_preset());
    assert!(mood.is_some());
    assert!(approx(studio.scene().environment_intensity, 1.2));
    assert!(studio.environment().rotated_texture().is_some());
    Ok(())
}

#[test]
fn preset_switch_resets_luminance() {
    let mut studio = studio();
    studio.backend_mut().set_luminance(0.05);
    for _ in 0..60 {
        studio.render_frame(0.016, false).unwrap();
    }
    assert!(studio.average_luminance() < 0.2);
    let exposure = studio.exposure();

    assert!(pollster::block_on(studio.set_preset("studio")).is_some());

    let target = studio.exposure_controller().settings().target_luminance;
    assert!(approx(studio.average_luminance(), target));
    assert!(approx(studio.exposure(), exposure));
}

#[test]
fn failed_preset_keeps_luminance() {
    let mut studio = studio();
    studio.backend_mut().set_luminance(0.05);
    for _ in 0..30 {
        studio.render_frame(0.016, false).unwrap();
    }
    let luminance = studio.average_luminance();

    assert!(pollster::block_on(studio.set_preset("broken")).is_none());
    assert!(approx(studio.average_luminance(), luminance));
}

#[test]
fn preload_warms_every_preset() {
    let mut studio = studio();

    let added = pollster::block_on(studio.preload_presets());

    assert_eq!(added, 2);
    assert_eq!(studio.environment().cache().len(), 2);
    assert_eq!(studio.scene().environment, None);
}

#[test]
fn split_preset_flow() {
    let mut studio = studio();

    let PresetRequest::Pending(pending) = studio.begin_preset("sunset") else {
        panic!("sunset is not cached yet");
    };
    let image = synthetic_image(pending.source());
    assert!(studio.finish_preset(pending, Ok(image)).is_some());
    assert_eq!(studio.environment().active_preset(), Some("sunset"));

    assert!(matches!(studio.begin_preset("sunset"), PresetRequest::Ready(Some(_))));
}

#[test]
fn environment_setters_publish() {
    let mut studio = studio();
    pollster::block_on(studio.set_preset("studio"));

    studio.set_environment_strength(2.5);
    assert!(approx(studio.scene().environment_intensity, 2.5));

    studio.set_background_blurriness(0.3);
    assert_eq!(
        studio.scene().background,
        Background::Texture(studio.environment().convolved_texture().unwrap())
    );

    studio.set_environment_rotation(-45.0);
    assert!(approx(studio.environment().settings().rotation, 315.0));

    studio.set_background_enabled(false);
    assert!(matches!(studio.scene().background, Background::Color(_)));

    studio.set_environment_enabled(false);
    assert_eq!(studio.scene().environment, None);
}

#[test]
fn environment_observer_is_notified() {
    let mut studio = studio();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    studio.set_environment_observer(move |_, _| counter.set(counter.get() + 1));

    pollster::block_on(studio.set_preset("studio"));
    studio.set_environment_strength(0.7);

    assert_eq!(calls.get(), 2);
}

#[test]
fn exposure_controls() {
    let mut studio = studio();
    studio.set_auto_exposure(false);
    studio.set_manual_exposure(2.2);
    assert!(approx(studio.exposure(), 2.2));

    let seen = Rc::new(Cell::new(0.0f32));
    let sink = seen.clone();
    studio.set_exposure_observer(move |v| sink.set(v));

    studio.set_auto_exposure(true);
    studio.render_frame(0.016, false).unwrap();
    assert!(approx(seen.get(), studio.exposure()));

    studio.set_auto_exposure(false);
    assert!(approx(studio.exposure(), 2.2));
}

#[test]
fn lighting_mutators_publish() {
    let mut studio = studio();

    studio.set_master(0.5);
    let key = |s: &TestStudio| *s.scene().lights.iter().find(|l| l.id == LightId::Key).unwrap();
    assert!(approx(key(&studio).intensity, 1.0));

    studio.set_light_rotation(90.0);
    assert!((key(&studio).position.unwrap() - Vec3::new(5.0, 6.0, -5.0)).length() < 1e-4);

    studio.update_light_property(LightId::Key, LightProperty::Intensity(2.0));
    assert!(approx(key(&studio).intensity, 2.0));

    studio.apply_light_settings([(
        LightId::Key,
        myth_studio::lighting::LightSettings::new(Vec3::ONE, 1.0),
    )]);
    assert!(approx(key(&studio).intensity, 1.0));

    studio.set_lights_enabled(false);
    assert!(studio.scene().lights.iter().all(|l| l.intensity == 0.0));
}

#[test]
fn indicators_are_published_and_released() {
    let mut studio = studio();

    studio.set_model_bounds(ModelBounds::new(Vec3::ZERO, 1.0));
    studio.set_indicators_visible(true);
    assert_eq!(studio.scene().indicators.len(), 3);
    assert_eq!(studio.backend().live_indicators(), 3);

    studio.set_indicators_visible(false);
    assert!(studio.scene().indicators.is_empty());
    assert_eq!(studio.backend().live_indicators(), 0);
}

#[test]
fn render_frame_runs_chain() {
    let mut studio = studio();
    studio.set_pass_enabled(PassKind::Grain, false);

    studio.render_frame(0.016, false).unwrap();
    studio.render_frame(0.016, true).unwrap();

    let backend = studio.backend();
    assert_eq!(backend.calls.chain_runs, 2);
    assert_eq!(backend.calls.readbacks, 1, "unlit frames skip sampling");
    assert!(!backend.last_chain.contains(&PassKind::Grain));
    assert_eq!(backend.last_chain.last(), Some(&PassKind::ToneMap));
}

#[test]
fn degraded_frames_log_without_failing() {
    common::init_logging();
    let mut studio = studio();
    common::init_logging();
    studio.backend_mut().readback_color = None;

    for _ in 0..3 {
        assert!(studio.render_frame(0.016, false).is_ok());
    }
    assert!(studio.exposure_controller().is_degraded());
}

#[test]
fn render_frame_survives_readback_failure() {
    let mut studio = studio();
    studio.backend_mut().readback_color = None;

    assert!(studio.render_frame(0.016, false).is_ok());
}

#[test]
fn resize_follows_pixel_ratio() {
    let mut studio = studio();
    studio.backend_mut().pixel_ratio = 2.0;

    studio.resize(300, 200);

    let target = studio.chain().composition_target().unwrap();
    let texture = studio.backend().texture(target).unwrap();
    assert_eq!((texture.width, texture.height), (600, 400));
}

#[test]
fn dispose_releases_every_resource() {
    let mut studio = studio();
    pollster::block_on(studio.set_preset("studio"));
    pollster::block_on(studio.set_preset("sunset"));
    studio.set_environment_rotation(30.0);
    studio.set_model_bounds(ModelBounds::new(Vec3::ZERO, 1.0));
    studio.set_indicators_visible(true);
    studio.render_frame(0.016, false).unwrap();

    studio.dispose();

    assert_eq!(studio.backend().live_textures(), 0);
    assert_eq!(studio.backend().live_indicators(), 0);
    assert_eq!(studio.scene().environment, None);
    assert!(studio.scene().indicators.is_empty());
}
