use crate::exposure::curve::{ExposureSettings, average_luminance};
use crate::renderer::backend::{RenderBackend, TargetDesc, TextureId};
use crate::renderer::chain::PassChain;
use crate::scene::StudioScene;

/// Whether exposure follows user input or the luminance feedback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    Manual,
    Auto,
}

/// Snapshot of the exposure loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureState {
    pub enabled: bool,
    /// Last user-chosen exposure, kept while auto mode runs.
    pub manual_value: f32,
    /// The value written to the exposure uniform.
    pub current_value: f32,
    pub auto_value: f32,
    pub average_luminance: f32,
}

type ExposureObserver = Box<dyn FnMut(f32)>;

/// Closed-loop auto exposure.
///
/// Each frame in [`ExposureMode::Auto`] the scene is rendered into a tiny
/// target, read back and reduced to one luminance value. Two exponential
/// low-pass stages (luminance, then exposure) keep highlights from pumping the
/// image.
pub struct ExposureController {
    settings: ExposureSettings,
    state: ExposureState,
    sample_target: Option<TextureId>,
    /// Set once the sample target could not be allocated; sampling stops.
    sampling_unavailable: bool,
    /// Set while readbacks keep failing; the outage is warned about once.
    readback_failing: bool,
    observer: Option<ExposureObserver>,
}

impl std::fmt::Debug for ExposureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureController")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("sample_target", &self.sample_target)
            .finish_non_exhaustive()
    }
}

impl ExposureController {
    #[must_use]
    pub fn new(settings: ExposureSettings, initial_exposure: f32, auto_exposure: bool) -> Self {
        let exposure = sanitize_exposure(initial_exposure).unwrap_or(1.0);
        Self {
            settings,
            state: ExposureState {
                enabled: auto_exposure,
                manual_value: exposure,
                current_value: exposure,
                auto_value: exposure,
                average_luminance: settings.target_luminance,
            },
            sample_target: None,
            sampling_unavailable: false,
            readback_failing: false,
            observer: None,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ExposureSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> ExposureState {
        self.state
    }

    #[must_use]
    pub fn mode(&self) -> ExposureMode {
        if self.state.enabled {
            ExposureMode::Auto
        } else {
            ExposureMode::Manual
        }
    }

    #[inline]
    #[must_use]
    pub fn exposure(&self) -> f32 {
        self.state.current_value
    }

    #[inline]
    #[must_use]
    pub fn average_luminance(&self) -> f32 {
        self.state.average_luminance
    }

    /// True while the loop runs on its last measurement because the backend
    /// cannot sample luminance.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.sampling_unavailable || self.readback_failing
    }

    /// Registers the display sink notified with every auto-exposure value.
    ///
    /// Replaces any previous sink.
    pub fn set_observer(&mut self, observer: impl FnMut(f32) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Writes the current exposure into the chain's exposure pass.
    pub fn apply(&self, chain: &mut PassChain) {
        chain.set_exposure(self.state.current_value);
    }

    /// Switches between auto and manual exposure.
    ///
    /// Entering auto seeds the loop with the current value so nothing jumps;
    /// leaving it restores the last manual value immediately.
    pub fn set_enabled(&mut self, enabled: bool, chain: &mut PassChain) {
        if enabled == self.state.enabled {
            return;
        }
        self.state.enabled = enabled;
        if enabled {
            self.state.auto_value = self.state.current_value;
        } else {
            self.state.current_value = self.state.manual_value;
        }
        self.apply(chain);
    }

    /// Records a user exposure. Applied right away unless auto mode runs.
    pub fn set_manual_exposure(&mut self, value: f32, chain: &mut PassChain) {
        let Some(value) = sanitize_exposure(value) else {
            log::debug!("Ignoring non-finite manual exposure");
            return;
        };
        self.state.manual_value = value;
        if !self.state.enabled {
            self.state.current_value = value;
            self.apply(chain);
        }
    }

    /// Re-seeds the loop after a drastic scene change (e.g. environment swap).
    pub fn reset_luminance(&mut self) {
        self.state.average_luminance = self.settings.target_luminance;
        self.state.auto_value = self.state.current_value;
    }

    /// Runs one step of the feedback loop and returns the exposure in effect.
    ///
    /// Never fails: readback problems keep the previous average luminance.
    /// `unlit` skips sampling entirely.
    pub fn update(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &StudioScene,
        chain: &mut PassChain,
        unlit: bool,
    ) -> f32 {
        if !self.state.enabled || unlit {
            return self.state.current_value;
        }

        if let Some(raw) = self.sample_luminance(backend, scene) {
            let raw = raw.clamp(0.0, self.settings.luminance_ceiling());
            let avg = &mut self.state.average_luminance;
            *avg += (raw - *avg) * self.settings.luminance_smoothing;
        }

        let target = self.settings.target_exposure(self.state.average_luminance);
        self.state.auto_value += (target - self.state.auto_value) * self.settings.exposure_smoothing;
        self.state.current_value = self.state.auto_value;

        self.apply(chain);
        if let Some(observer) = self.observer.as_mut() {
            observer(self.state.current_value);
        }
        self.state.current_value
    }

    fn sample_luminance(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &StudioScene,
    ) -> Option<f32> {
        if self.sampling_unavailable || !backend.capabilities().pixel_readback {
            return None;
        }

        let target = match self.sample_target {
            Some(target) => target,
            None => {
                let size = self.settings.sample_size.max(1);
                let format = if backend.capabilities().float_targets {
                    wgpu::TextureFormat::Rgba16Float
                } else {
                    wgpu::TextureFormat::Rgba8Unorm
                };
                match backend.create_render_target(&TargetDesc::new(
                    "Luminance Sample",
                    size,
                    size,
                    format,
                )) {
                    Ok(target) => *self.sample_target.insert(target),
                    Err(e) => {
                        log::warn!("Auto exposure disabled, sample target unavailable: {e}");
                        self.sampling_unavailable = true;
                        return None;
                    }
                }
            }
        };

        let pixels = backend
            .render_scene(scene, target)
            .and_then(|()| backend.read_pixels(target));

        match pixels {
            Ok(pixels) => {
                if std::mem::take(&mut self.readback_failing) {
                    log::info!("Luminance readback recovered");
                }
                average_luminance(&pixels)
            }
            Err(e) => {
                if self.readback_failing {
                    log::debug!("Luminance readback skipped: {e}");
                } else {
                    log::warn!("Luminance readback failed, holding last measurement: {e}");
                    self.readback_failing = true;
                }
                None
            }
        }
    }

    /// Releases the sample target.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(target) = self.sample_target.take() {
            backend.dispose_texture(target);
        }
    }
}

fn sanitize_exposure(value: f32) -> Option<f32> {
    value.is_finite().then(|| value.max(0.0))
}
