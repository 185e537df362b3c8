//! Luminance measurement and the luminance → exposure curve.

use serde::{Deserialize, Serialize};

/// Rec. 709 luma weights.
pub const LUMINANCE_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Perceptual luminance of one linear RGBA sample.
#[inline]
#[must_use]
pub fn relative_luminance(rgba: [f32; 4]) -> f32 {
    LUMINANCE_WEIGHTS[0] * rgba[0] + LUMINANCE_WEIGHTS[1] * rgba[1] + LUMINANCE_WEIGHTS[2] * rgba[2]
}

/// Mean luminance of the samples, ignoring non-finite texels.
///
/// Returns `None` when no usable sample exists.
#[must_use]
pub fn average_luminance(pixels: &[[f32; 4]]) -> Option<f32> {
    let (sum, count) = pixels
        .iter()
        .map(|&p| relative_luminance(p))
        .filter(|l| l.is_finite())
        .fold((0.0f32, 0u32), |(sum, n), l| (sum + l.max(0.0), n + 1));

    (count > 0).then(|| sum / count as f32)
}

/// Tunable constants of the auto-exposure loop.
///
/// The bright-side constants (`bright_threshold`, `bright_exponent`,
/// `max_luminance`) are empirical and kept configurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureSettings {
    /// Luminance the loop tries to reach; also the re-seed value on reset.
    pub target_luminance: f32,
    pub min_exposure: f32,
    pub max_exposure: f32,
    /// τ: above this the inverse curve is replaced by the power curve.
    pub bright_threshold: f32,
    pub bright_exponent: f32,
    /// Luminance at which the power curve reaches `min_exposure`.
    pub max_luminance: f32,
    /// Blend factor of the first low-pass stage (raw → average luminance).
    pub luminance_smoothing: f32,
    /// Blend factor of the second low-pass stage (auto value → target).
    pub exposure_smoothing: f32,
    /// Edge length of the square luminance sample target.
    pub sample_size: u32,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            target_luminance: 0.5,
            min_exposure: 0.25,
            max_exposure: 3.0,
            bright_threshold: 0.65,
            bright_exponent: 1.8,
            max_luminance: 1.2,
            luminance_smoothing: 0.35,
            exposure_smoothing: 0.12,
            sample_size: 8,
        }
    }
}

impl ExposureSettings {
    /// Maps a smoothed luminance to the exposure that would bring it to target.
    ///
    /// Below τ the relation is inverse. Above τ the curve bends from the value
    /// at τ down to `min_exposure`, reached at `max_luminance`, so staring at a
    /// light source never drives exposure toward zero.
    #[must_use]
    pub fn target_exposure(&self, luminance: f32) -> f32 {
        let l = luminance.max(1e-4);
        let tau = self.bright_threshold.max(1e-4);

        let raw = if l <= tau {
            self.target_luminance / l
        } else {
            let at_tau = self.target_luminance / tau;
            let span = (self.max_luminance - tau).max(1e-4);
            let t = ((l - tau) / span).clamp(0.0, 1.0).powf(self.bright_exponent);
            at_tau + (self.min_exposure - at_tau) * t
        };

        raw.clamp(self.min_exposure, self.max_exposure)
    }

    /// Upper bound applied to measured luminance before smoothing.
    #[inline]
    #[must_use]
    pub fn luminance_ceiling(&self) -> f32 {
        self.max_luminance.max(1.0)
    }
}
