//! Auto Exposure Tests
//!
//! Tests for:
//! - Manual / auto mode switching and manual value restoration
//! - Convergence of the two-stage low-pass loop without oscillation
//! - The bright-side power curve and luminance ceiling
//! - Reset continuity after environment swaps
//! - Degradation when readback is missing or failing

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{RecordingBackend, approx};
use myth_studio::exposure::{ExposureController, ExposureMode, ExposureSettings};
use myth_studio::renderer::chain::{PassChain, PassChainBuilder, PostSettings, Viewport};
use myth_studio::scene::StudioScene;

fn chain(backend: &mut RecordingBackend) -> PassChain {
    PassChainBuilder::new(PostSettings::default()).build(backend, Viewport::new(800, 600, 1.0))
}

fn run(
    exposure: &mut ExposureController,
    backend: &mut RecordingBackend,
    chain: &mut PassChain,
    frames: usize,
) -> Vec<f32> {
    let scene = StudioScene::new();
    let mut values = Vec::with_capacity(frames);
    for _ in 0..frames {
        values.push(exposure.update(backend, &scene, chain, false));
    }
    values
}

// ============================================================================
// Modes
// ============================================================================

#[test]
fn manual_mode_writes_manual_value() {
    let mut backend = RecordingBackend::new();
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, false);

    exposure.set_manual_exposure(1.7, &mut chain);

    assert_eq!(exposure.mode(), ExposureMode::Manual);
    assert!(approx(exposure.exposure(), 1.7));
    assert!(approx(chain.exposure(), 1.7));
}

#[test]
fn manual_mode_never_samples() {
    let mut backend = RecordingBackend::new();
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, false);

    let values = run(&mut exposure, &mut backend, &mut chain, 10);

    assert!(values.iter().all(|&v| approx(v, 1.0)));
    assert_eq!(backend.calls.readbacks, 0);
}

#[test]
fn leaving_auto_restores_manual_value() {
    let mut backend = RecordingBackend::with_luminance(0.1);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, false);
    exposure.set_manual_exposure(1.3, &mut chain);

    exposure.set_enabled(true, &mut chain);
    run(&mut exposure, &mut backend, &mut chain, 50);
    assert!(!approx(exposure.exposure(), 1.3));

    // Manual edits during auto are remembered but not applied.
    exposure.set_manual_exposure(0.8, &mut chain);
    assert!(!approx(exposure.exposure(), 0.8));

    exposure.set_enabled(false, &mut chain);
    assert!(approx(exposure.exposure(), 0.8));
    assert!(approx(chain.exposure(), 0.8));
}

#[test]
fn entering_auto_does_not_jump() {
    let mut backend = RecordingBackend::with_luminance(0.5);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.4, false);

    exposure.set_enabled(true, &mut chain);
    assert!(approx(exposure.exposure(), 1.4));

    let first = run(&mut exposure, &mut backend, &mut chain, 1)[0];
    assert!((first - 1.4).abs() < 0.1, "first auto step jumped to {first}");
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn converges_monotonically_to_target() {
    let settings = ExposureSettings::default();
    let mut backend = RecordingBackend::with_luminance(0.25);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(settings, 1.0, true);

    let values = run(&mut exposure, &mut backend, &mut chain, 400);
    let expected = settings.target_exposure(0.25);

    assert!(approx(expected, 2.0));
    assert!((values.last().unwrap() - expected).abs() < 1e-3);
    for pair in values.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-6, "oscillation: {} -> {}", pair[0], pair[1]);
        assert!(pair[1] <= expected + 1e-4, "overshoot: {}", pair[1]);
    }
    assert!((exposure.average_luminance() - 0.25).abs() < 1e-3);
}

#[test]
fn exposure_stays_within_bounds() {
    let settings = ExposureSettings::default();
    for luminance in [0.0, 1e-3, 0.05, 0.4, 0.9, 3.0, 100.0] {
        let mut backend = RecordingBackend::with_luminance(luminance);
        let mut chain = chain(&mut backend);
        let mut exposure = ExposureController::new(settings, 1.0, true);

        for value in run(&mut exposure, &mut backend, &mut chain, 200) {
            assert!(
                (settings.min_exposure..=settings.max_exposure).contains(&value)
                    || approx(value, 1.0),
                "luminance {luminance} produced exposure {value}"
            );
        }
    }
}

#[test]
fn bright_jump_uses_power_curve() {
    let settings = ExposureSettings::default();

    // Continuous at the threshold, reaching min exposure at max luminance.
    let tau = settings.bright_threshold;
    assert!((settings.target_exposure(tau) - settings.target_exposure(tau + 1e-4)).abs() < 1e-2);
    assert!(approx(settings.target_exposure(settings.max_luminance), settings.min_exposure));

    // Above the threshold the curve no longer follows target / L.
    let l = 1.0;
    let at_tau = settings.target_luminance / tau;
    let t = ((l - tau) / (settings.max_luminance - tau)).powf(settings.bright_exponent);
    let expected = at_tau + (settings.min_exposure - at_tau) * t;
    assert!(approx(settings.target_exposure(l), expected));
}

#[test]
fn moderate_bright_jump_follows_power_curve() {
    let settings = ExposureSettings::default();
    let mut backend = RecordingBackend::with_luminance(0.4);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(settings, 1.0, true);
    run(&mut exposure, &mut backend, &mut chain, 300);
    let before = exposure.exposure();
    assert!(approx(before, settings.target_luminance / 0.4));

    backend.set_luminance(0.9);
    let values = run(&mut exposure, &mut backend, &mut chain, 400);

    assert!(values[0] < before);
    assert!(
        values.windows(2).all(|w| w[1] <= w[0] + 1e-6),
        "exposure must fall monotonically after the jump"
    );

    let power = settings.target_exposure(0.9);
    let inverse = settings.target_luminance / 0.9;
    let settled = *values.last().unwrap();
    assert!((settled - power).abs() < 1e-3, "settled at {settled}, expected {power}");
    assert!((settled - inverse).abs() > 0.05, "settled on the plain inverse curve");
}

#[test]
fn bright_jump_settles_at_min_exposure() {
    let settings = ExposureSettings::default();
    let mut backend = RecordingBackend::with_luminance(0.5);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(settings, 1.0, true);
    run(&mut exposure, &mut backend, &mut chain, 100);

    backend.set_luminance(50.0);
    let values = run(&mut exposure, &mut backend, &mut chain, 400);

    assert!(values.iter().all(|&v| v >= settings.min_exposure - 1e-6));
    assert!((values.last().unwrap() - settings.min_exposure).abs() < 1e-3);
    // The measured luminance is clamped to the ceiling.
    assert!(exposure.average_luminance() <= settings.luminance_ceiling() + 1e-6);
}

#[test]
fn reset_keeps_exposure_continuous() {
    let settings = ExposureSettings::default();
    let mut backend = RecordingBackend::with_luminance(0.2);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(settings, 1.0, true);
    run(&mut exposure, &mut backend, &mut chain, 300);
    let before = exposure.exposure();

    exposure.reset_luminance();

    assert!(approx(exposure.exposure(), before));
    assert!(approx(exposure.average_luminance(), settings.target_luminance));

    // One step moves at most a smoothing fraction of the exposure range.
    let next = run(&mut exposure, &mut backend, &mut chain, 1)[0];
    let max_step = settings.exposure_smoothing * (settings.max_exposure - settings.min_exposure);
    assert!((next - before).abs() <= max_step + 1e-4, "reset caused a jump: {before} -> {next}");
}

// ============================================================================
// Degradation
// ============================================================================

#[test]
fn readback_failure_keeps_previous_luminance() {
    let mut backend = RecordingBackend::with_luminance(0.3);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, true);
    run(&mut exposure, &mut backend, &mut chain, 20);
    let luminance = exposure.average_luminance();

    backend.readback_color = None;
    run(&mut exposure, &mut backend, &mut chain, 20);

    assert!(approx(exposure.average_luminance(), luminance));
}

#[test]
fn readback_outage_is_tracked_until_recovery() {
    let mut backend = RecordingBackend::with_luminance(0.3);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, true);
    run(&mut exposure, &mut backend, &mut chain, 5);
    assert!(!exposure.is_degraded());

    backend.readback_color = None;
    run(&mut exposure, &mut backend, &mut chain, 10);
    assert!(exposure.is_degraded());
    assert_eq!(backend.calls.readbacks, 15, "sampling keeps retrying");

    backend.set_luminance(0.3);
    run(&mut exposure, &mut backend, &mut chain, 1);
    assert!(!exposure.is_degraded());
}

#[test]
fn missing_readback_capability_skips_sampling() {
    let mut backend = RecordingBackend::new();
    backend.capabilities.pixel_readback = false;
    let mut chain = chain(&mut backend);
    let targets = backend.calls.targets;
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, true);

    run(&mut exposure, &mut backend, &mut chain, 10);

    assert_eq!(backend.calls.targets, targets);
    assert_eq!(backend.calls.readbacks, 0);
}

#[test]
fn unlit_frames_skip_sampling() {
    let mut backend = RecordingBackend::new();
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, true);
    let scene = StudioScene::new();

    for _ in 0..5 {
        exposure.update(&mut backend, &scene, &mut chain, true);
    }

    assert_eq!(backend.calls.readbacks, 0);
    assert_eq!(backend.calls.renders, 0);
}

#[test]
fn sample_target_allocated_once_and_disposed() {
    let mut backend = RecordingBackend::new();
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, true);

    run(&mut exposure, &mut backend, &mut chain, 30);
    assert_eq!(backend.count_labelled("Luminance Sample"), 1);
    assert_eq!(backend.calls.readbacks, 30);

    exposure.dispose(&mut backend);
    assert_eq!(backend.count_labelled("Luminance Sample"), 0);
}

#[test]
fn observer_receives_auto_values() {
    let mut backend = RecordingBackend::with_luminance(0.25);
    let mut chain = chain(&mut backend);
    let mut exposure = ExposureController::new(ExposureSettings::default(), 1.0, true);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    exposure.set_observer(move |v| sink.borrow_mut().push(v));

    let values = run(&mut exposure, &mut backend, &mut chain, 5);

    assert_eq!(*seen.borrow(), values);
}
