use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::environment::cache::{CachedEnvironment, EnvironmentCache};
use crate::environment::loader::EnvironmentLoader;
use crate::environment::preset::{EnvironmentSource, PresetCatalog, PresetMood};
use crate::environment::slot::TransientSlot;
use crate::errors::Result;
use crate::renderer::backend::{RenderBackend, TargetDesc, TextureId};
use crate::resources::Image;
use crate::scene::{Background, StudioScene};

/// Upper bound for the environment strength slider.
pub const MAX_STRENGTH: f32 = 10.0;

/// User-facing environment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    pub enabled: bool,
    pub background_enabled: bool,
    pub strength: f32,
    /// 0 shows the sharp source behind the model; anything above shows the
    /// convolved lighting map instead.
    pub blurriness: f32,
    /// Degrees about +Y, in `[0, 360)`.
    pub rotation: f32,
    /// Linear RGB shown when no environment is active.
    pub fallback_color: [f32; 3],
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            background_enabled: true,
            strength: 1.0,
            blurriness: 0.0,
            rotation: 0.0,
            fallback_color: [0.12, 0.12, 0.13],
        }
    }
}

/// Wraps any angle into `[0, 360)`. Non-finite input maps to 0.
#[must_use]
pub fn normalize_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Outcome of [`EnvironmentController::begin_preset`].
#[derive(Debug)]
pub enum PresetRequest {
    /// The preset was cached (or unknown) and has been handled synchronously.
    Ready(Option<PresetMood>),
    /// The source must be loaded, then handed to
    /// [`EnvironmentController::finish_preset`].
    Pending(PendingPreset),
}

/// An in-flight preset load, stamped with the request generation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPreset {
    id: String,
    generation: u64,
    source: EnvironmentSource,
}

impl PendingPreset {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn source(&self) -> &EnvironmentSource {
        &self.source
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

type EnvironmentObserver = Box<dyn FnMut(Option<TextureId>, f32)>;

/// Owns environment sources and the textures derived from them.
///
/// # Derivation
///
/// ```text
///             rotation ≠ 0                 convolve
/// source ───────────────► rotated ─────────────────► convolved ──► scene.environment
///    │                       │                           │
///    └── rotation = 0 ───────┴──► background (blur = 0)  └──► background (blur > 0)
/// ```
///
/// The rotated and convolved textures each live in a [`TransientSlot`]: at
/// most one of each exists, and the previous one is disposed before a
/// replacement is allocated.
pub struct EnvironmentController<L> {
    loader: L,
    catalog: PresetCatalog,
    cache: EnvironmentCache,
    active: Option<String>,
    /// Bumped by every preset request; loads from older requests are dropped.
    generation: u64,
    settings: EnvironmentSettings,
    rotated: TransientSlot,
    convolved: TransientSlot,
    /// Source texture and rotation bits the current slots were derived from.
    derived_from: Option<(TextureId, u32)>,
    applied_rotation: f32,
    observer: Option<EnvironmentObserver>,
}

impl<L> std::fmt::Debug for EnvironmentController<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentController")
            .field("active", &self.active)
            .field("generation", &self.generation)
            .field("settings", &self.settings)
            .field("rotated", &self.rotated)
            .field("convolved", &self.convolved)
            .finish_non_exhaustive()
    }
}

impl<L: EnvironmentLoader> EnvironmentController<L> {
    /// Loads (or reuses) a preset and activates it.
    ///
    /// Returns the preset's mood, or `None` when the id is unknown, the load
    /// failed, or a newer request superseded this one. Failures are logged.
    pub async fn set_preset(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        id: &str,
    ) -> Option<PresetMood> {
        match self.begin_preset(backend, scene, id) {
            PresetRequest::Ready(mood) => mood,
            PresetRequest::Pending(pending) => {
                let result = self.loader.load(pending.source()).await;
                self.finish_preset(backend, scene, pending, result)
            }
        }
    }

    /// Loads every listed preset that is not cached yet, concurrently, without
    /// activating any of them. Returns how many were added to the cache.
    pub async fn preload<'a>(
        &mut self,
        backend: &mut dyn RenderBackend,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let mut wanted: Vec<(String, EnvironmentSource)> = Vec::new();
        for id in ids {
            if self.cache.contains(id) || wanted.iter().any(|(w, _)| w == id) {
                continue;
            }
            match self.catalog.get(id) {
                Some(preset) => wanted.push((preset.id.clone(), preset.source.clone())),
                None => log::warn!("Unknown environment preset '{id}'"),
            }
        }
        if wanted.is_empty() {
            return 0;
        }

        let loader = &self.loader;
        let results =
            futures::future::join_all(wanted.iter().map(|(_, source)| loader.load(source))).await;

        let mut added = 0;
        for ((id, _), result) in wanted.iter().zip(results) {
            match result {
                Ok(image) => {
                    if self.cache_image(backend, id, &image).is_some() {
                        added += 1;
                    }
                }
                Err(e) => log::warn!("Failed to preload environment preset '{id}': {e}"),
            }
        }
        log::info!("Preloaded {added} environment preset(s)");
        added
    }

    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }
}

impl<L> EnvironmentController<L> {
    #[must_use]
    pub fn new(loader: L, catalog: PresetCatalog, settings: EnvironmentSettings) -> Self {
        let mut settings = settings;
        settings.strength = clamp_strength(settings.strength);
        settings.blurriness = clamp_blurriness(settings.blurriness);
        settings.rotation = normalize_degrees(settings.rotation);
        Self {
            loader,
            catalog,
            cache: EnvironmentCache::new(),
            active: None,
            generation: 0,
            settings,
            rotated: TransientSlot::new("Rotated Environment"),
            convolved: TransientSlot::new("Convolved Environment"),
            derived_from: None,
            applied_rotation: 0.0,
            observer: None,
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    #[must_use]
    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn active_preset(&self) -> Option<&str> {
        self.active.as_deref()
    }

    #[must_use]
    pub fn cache(&self) -> &EnvironmentCache {
        &self.cache
    }

    #[must_use]
    pub fn rotated_texture(&self) -> Option<TextureId> {
        self.rotated.get()
    }

    #[must_use]
    pub fn convolved_texture(&self) -> Option<TextureId> {
        self.convolved.get()
    }

    /// Rotation actually baked into the displayed source (0 when skipped).
    #[must_use]
    pub fn active_rotation(&self) -> f32 {
        self.applied_rotation
    }

    /// Registers the sink notified with `(lighting texture, intensity)` after
    /// every derivation.
    pub fn set_observer(&mut self, observer: impl FnMut(Option<TextureId>, f32) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    // === Presets ===

    /// First half of a preset switch.
    ///
    /// Cached presets are activated immediately. Otherwise a [`PendingPreset`]
    /// is returned; the previous environment stays on screen until
    /// [`finish_preset`](Self::finish_preset) runs.
    pub fn begin_preset(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        id: &str,
    ) -> PresetRequest {
        let Some(preset) = self.catalog.get(id) else {
            log::warn!("Unknown environment preset '{id}'");
            return PresetRequest::Ready(None);
        };
        let mood = preset.mood.clone();
        let source = preset.source.clone();

        self.generation = self.generation.wrapping_add(1);

        if self.cache.contains(id) {
            self.active = Some(id.to_owned());
            self.apply_environment(backend, scene);
            return PresetRequest::Ready(Some(mood));
        }

        PresetRequest::Pending(PendingPreset {
            id: id.to_owned(),
            generation: self.generation,
            source,
        })
    }

    /// Second half of a preset switch: caches and activates the loaded image.
    ///
    /// Results of superseded requests are discarded without touching the scene.
    pub fn finish_preset(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        pending: PendingPreset,
        result: Result<Image>,
    ) -> Option<PresetMood> {
        if pending.generation != self.generation {
            log::debug!(
                "Discarding stale environment load '{}' (generation {} < {})",
                pending.id,
                pending.generation,
                self.generation
            );
            return None;
        }

        let image = match result {
            Ok(image) => image,
            Err(e) => {
                log::error!("Failed to load environment preset '{}': {e}", pending.id);
                return None;
            }
        };

        let entry = self.cache_image(backend, &pending.id, &image)?;

        self.active = Some(pending.id.clone());
        self.apply_environment(backend, scene);
        log::info!(
            "Environment preset '{}' active ({}x{}, {})",
            pending.id,
            image.width,
            image.height,
            if entry.hdr { "HDR" } else { "LDR" }
        );

        self.catalog.get(&pending.id).map(|p| p.mood.clone())
    }

    /// Uploads a decoded source and stores it under `id`.
    fn cache_image(
        &mut self,
        backend: &mut dyn RenderBackend,
        id: &str,
        image: &Image,
    ) -> Option<CachedEnvironment> {
        let texture = match backend.upload_texture(image) {
            Ok(texture) => texture,
            Err(e) => {
                log::error!("Failed to upload environment preset '{id}': {e}");
                return None;
            }
        };

        let size = if image.width > 0 && image.height > 0 {
            Some((image.width, image.height))
        } else {
            backend.texture_size(texture)
        };

        let entry = CachedEnvironment {
            texture,
            size,
            hdr: image.is_hdr(),
        };
        if let Some(duplicate) = self.cache.insert(id, entry) {
            backend.dispose_texture(duplicate);
        }
        Some(entry)
    }

    // === Parameters ===

    pub fn set_enabled(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        enabled: bool,
    ) {
        self.settings.enabled = enabled;
        self.apply_environment(backend, scene);
    }

    pub fn set_background_enabled(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        enabled: bool,
    ) {
        self.settings.background_enabled = enabled;
        self.apply_environment(backend, scene);
    }

    pub fn set_strength(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        strength: f32,
    ) {
        self.settings.strength = clamp_strength(strength);
        self.apply_environment(backend, scene);
    }

    pub fn set_blurriness(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        blurriness: f32,
    ) {
        self.settings.blurriness = clamp_blurriness(blurriness);
        self.apply_environment(backend, scene);
    }

    /// Rotates the environment about +Y. Input is wrapped into `[0, 360)`.
    pub fn set_rotation(
        &mut self,
        backend: &mut dyn RenderBackend,
        scene: &mut StudioScene,
        degrees: f32,
    ) {
        self.settings.rotation = normalize_degrees(degrees);
        self.apply_environment(backend, scene);
    }

    // === Derivation ===

    /// Re-derives everything the scene shows from the current state.
    pub fn apply_environment(&mut self, backend: &mut dyn RenderBackend, scene: &mut StudioScene) {
        let entry = self
            .active
            .as_deref()
            .and_then(|id| self.cache.get(id))
            .copied();

        let Some(entry) = entry.filter(|_| self.settings.enabled) else {
            self.apply_fallback(backend, scene);
            return;
        };

        let key = (entry.texture, self.settings.rotation.to_bits());
        let reusable = self.derived_from == Some(key) && self.convolved.get().is_some();

        let (display, lighting) = if reusable {
            (self.rotated.get().unwrap_or(entry.texture), self.convolved.get().unwrap_or(entry.texture))
        } else {
            self.convolved.release(backend);
            let display = self.derive_rotated(backend, entry);
            let lighting = match backend.convolve_environment(display) {
                Ok(convolved) => {
                    self.convolved.replace(backend, convolved);
                    convolved
                }
                Err(e) => {
                    log::warn!("Environment convolution failed, lighting from raw source: {e}");
                    display
                }
            };
            self.derived_from = Some(key);
            (display, lighting)
        };

        let strength = self.settings.strength;
        scene.environment = Some(lighting);
        scene.environment_intensity = strength;

        if self.settings.background_enabled {
            if self.settings.blurriness > 0.0 {
                scene.background = Background::Texture(lighting);
                scene.background_blurriness = self.settings.blurriness;
            } else {
                scene.background = Background::Texture(display);
                scene.background_blurriness = 0.0;
            }
            scene.background_intensity = strength;
        } else {
            let fallback = Vec3::from(self.settings.fallback_color);
            scene.background = Background::Color(fallback);
            scene.background_blurriness = 0.0;
            scene.background_intensity = 1.0;
            backend.set_clear_color(fallback);
        }

        self.notify(Some(lighting), strength);
    }

    /// Flat-color state used when disabled or before any preset loads.
    fn apply_fallback(&mut self, backend: &mut dyn RenderBackend, scene: &mut StudioScene) {
        self.rotated.release(backend);
        self.convolved.release(backend);
        self.derived_from = None;
        self.applied_rotation = 0.0;

        let fallback = Vec3::from(self.settings.fallback_color);
        scene.environment = None;
        scene.environment_intensity = 0.0;
        scene.background = Background::Color(fallback);
        scene.background_blurriness = 0.0;
        scene.background_intensity = 1.0;
        backend.set_clear_color(fallback);

        self.notify(None, 0.0);
    }

    /// Returns the texture to display: a rotated copy, or the source itself
    /// when no rotation is requested or it cannot be performed.
    fn derive_rotated(
        &mut self,
        backend: &mut dyn RenderBackend,
        entry: CachedEnvironment,
    ) -> TextureId {
        let rotation = self.settings.rotation;
        self.rotated.release(backend);
        self.applied_rotation = 0.0;

        if rotation == 0.0 {
            return entry.texture;
        }

        let Some((width, height)) = entry.size.or_else(|| backend.texture_size(entry.texture))
        else {
            log::warn!("Environment size unknown, rotation skipped");
            return entry.texture;
        };

        // Keep the source encoding so rotation never clips HDR values.
        let format = if entry.hdr {
            wgpu::TextureFormat::Rgba16Float
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };

        let target = match backend.create_render_target(&TargetDesc::new(
            "Rotated Environment",
            width,
            height,
            format,
        )) {
            Ok(target) => target,
            Err(e) => {
                log::warn!("Rotation target unavailable, using unrotated source: {e}");
                return entry.texture;
            }
        };

        match backend.rotate_equirect(entry.texture, target, rotation.to_radians()) {
            Ok(()) => {
                self.rotated.replace(backend, target);
                self.applied_rotation = rotation;
                target
            }
            Err(e) => {
                log::warn!("Environment rotation failed, using unrotated source: {e}");
                backend.dispose_texture(target);
                entry.texture
            }
        }
    }

    fn notify(&mut self, lighting: Option<TextureId>, intensity: f32) {
        if let Some(observer) = self.observer.as_mut() {
            observer(lighting, intensity);
        }
    }

    /// Releases every texture this controller owns. Pending loads are invalidated.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        self.rotated.release(backend);
        self.convolved.release(backend);
        self.cache.dispose(backend);
        self.derived_from = None;
        self.active = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

fn clamp_strength(strength: f32) -> f32 {
    if strength.is_finite() {
        strength.clamp(0.0, MAX_STRENGTH)
    } else {
        1.0
    }
}

fn clamp_blurriness(blurriness: f32) -> f32 {
    if blurriness.is_finite() {
        blurriness.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_wrap_into_range() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(405.0), 45.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(f32::NAN), 0.0);
        assert!(normalize_degrees(-1e-9) < 360.0);
    }

    #[test]
    fn numeric_inputs_are_clamped() {
        assert_eq!(clamp_strength(-1.0), 0.0);
        assert_eq!(clamp_strength(100.0), MAX_STRENGTH);
        assert_eq!(clamp_blurriness(2.0), 1.0);
        assert_eq!(clamp_blurriness(f32::INFINITY), 0.0);
    }
}
