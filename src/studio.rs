//! The Studio Facade
//!
//! [`Studio`] wires the controllers to one backend and one scene, so viewers
//! deal with a single object:
//!
//! ```rust,ignore
//! let mut studio = Studio::new(backend, FileEnvironmentLoader::new("assets/env"), config, 1280, 720);
//! pollster::block_on(studio.set_preset("studio"));
//!
//! loop {
//!     studio.backend_mut().begin_frame(&surface_texture.texture);
//!     studio.render_frame(dt, false)?;
//! }
//! ```
//!
//! Every mutator re-publishes whatever it changed into the [`StudioScene`]
//! before returning, so the next frame always sees a consistent scene.

use crate::config::StudioConfig;
use crate::environment::{
    EnvironmentController, EnvironmentLoader, PendingPreset, PresetMood, PresetRequest,
};
use crate::errors::Result;
use crate::exposure::{ExposureController, ExposureMode};
use crate::lighting::{LightId, LightProperty, LightSettings, LightingRig, ModelBounds};
use crate::renderer::backend::{RenderBackend, TextureId};
use crate::renderer::chain::{PassChain, PassChainBuilder, PassKind, Viewport};
use crate::resources::Image;
use crate::scene::StudioScene;

pub struct Studio<B, L> {
    backend: B,
    scene: StudioScene,
    chain: PassChain,
    exposure: ExposureController,
    environment: EnvironmentController<L>,
    lighting: LightingRig,
    initial_preset: Option<String>,
}

impl<B: std::fmt::Debug, L> std::fmt::Debug for Studio<B, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("backend", &self.backend)
            .field("scene", &self.scene)
            .field("exposure", &self.exposure)
            .field("environment", &self.environment)
            .field("lighting", &self.lighting)
            .finish_non_exhaustive()
    }
}

impl<B: RenderBackend, L: EnvironmentLoader> Studio<B, L> {
    /// Activates a preset, loading it on first use.
    ///
    /// A successful switch re-seeds the exposure loop so the new lighting is
    /// measured from scratch.
    pub async fn set_preset(&mut self, id: &str) -> Option<PresetMood> {
        let mood = self
            .environment
            .set_preset(&mut self.backend, &mut self.scene, id)
            .await;
        if mood.is_some() {
            self.exposure.reset_luminance();
        }
        mood
    }

    /// Warms the cache for every catalog preset without switching.
    pub async fn preload_presets(&mut self) -> usize {
        let ids: Vec<String> = self
            .environment
            .catalog()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        self.environment
            .preload(&mut self.backend, ids.iter().map(String::as_str))
            .await
    }

    /// Activates the configured initial preset, if any.
    pub async fn load_initial_preset(&mut self) -> Option<PresetMood> {
        let id = self.initial_preset.clone()?;
        self.set_preset(&id).await
    }
}

impl<B: RenderBackend, L> Studio<B, L> {
    /// Builds every controller from `config` and publishes the initial scene.
    pub fn new(mut backend: B, loader: L, config: StudioConfig, width: u32, height: u32) -> Self {
        let viewport = Viewport::new(width, height, backend.pixel_ratio());
        let mut chain = PassChainBuilder::new(config.post).build(&mut backend, viewport);

        let exposure = ExposureController::new(
            config.exposure.curve,
            config.exposure.initial,
            config.exposure.auto,
        );
        exposure.apply(&mut chain);

        let mut scene = StudioScene::new();
        let mut environment =
            EnvironmentController::new(loader, config.presets, config.environment);
        environment.apply_environment(&mut backend, &mut scene);

        let lighting = LightingRig::studio(config.lighting);
        lighting.publish(&mut scene);

        Self {
            backend,
            scene,
            chain,
            exposure,
            environment,
            lighting,
            initial_preset: config.initial_preset,
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub fn scene(&self) -> &StudioScene {
        &self.scene
    }

    #[must_use]
    pub fn chain(&self) -> &PassChain {
        &self.chain
    }

    /// Direct access to post parameters (bloom, tint, tone mapping, ...).
    pub fn chain_mut(&mut self) -> &mut PassChain {
        &mut self.chain
    }

    #[must_use]
    pub fn exposure_controller(&self) -> &ExposureController {
        &self.exposure
    }

    #[must_use]
    pub fn environment(&self) -> &EnvironmentController<L> {
        &self.environment
    }

    #[must_use]
    pub fn lighting(&self) -> &LightingRig {
        &self.lighting
    }

    // === Environment ===

    /// Split form of [`set_preset`](Self::set_preset) for hosts that drive
    /// the load themselves.
    pub fn begin_preset(&mut self, id: &str) -> PresetRequest {
        let request = self
            .environment
            .begin_preset(&mut self.backend, &mut self.scene, id);
        if matches!(request, PresetRequest::Ready(Some(_))) {
            self.exposure.reset_luminance();
        }
        request
    }

    pub fn finish_preset(
        &mut self,
        pending: PendingPreset,
        result: Result<Image>,
    ) -> Option<PresetMood> {
        let mood = self
            .environment
            .finish_preset(&mut self.backend, &mut self.scene, pending, result);
        if mood.is_some() {
            self.exposure.reset_luminance();
        }
        mood
    }

    pub fn set_environment_enabled(&mut self, enabled: bool) {
        self.environment
            .set_enabled(&mut self.backend, &mut self.scene, enabled);
    }

    pub fn set_background_enabled(&mut self, enabled: bool) {
        self.environment
            .set_background_enabled(&mut self.backend, &mut self.scene, enabled);
    }

    pub fn set_environment_strength(&mut self, strength: f32) {
        self.environment
            .set_strength(&mut self.backend, &mut self.scene, strength);
    }

    pub fn set_background_blurriness(&mut self, blurriness: f32) {
        self.environment
            .set_blurriness(&mut self.backend, &mut self.scene, blurriness);
    }

    /// Rotates the environment about +Y, in degrees.
    pub fn set_environment_rotation(&mut self, degrees: f32) {
        self.environment
            .set_rotation(&mut self.backend, &mut self.scene, degrees);
    }

    /// Sink notified with `(lighting texture, intensity)` after every environment change.
    pub fn set_environment_observer(
        &mut self,
        observer: impl FnMut(Option<TextureId>, f32) + 'static,
    ) {
        self.environment.set_observer(observer);
    }

    // === Exposure ===

    pub fn set_auto_exposure(&mut self, enabled: bool) {
        self.exposure.set_enabled(enabled, &mut self.chain);
    }

    pub fn set_manual_exposure(&mut self, value: f32) {
        self.exposure.set_manual_exposure(value, &mut self.chain);
    }

    pub fn reset_luminance(&mut self) {
        self.exposure.reset_luminance();
    }

    #[must_use]
    pub fn exposure(&self) -> f32 {
        self.exposure.exposure()
    }

    #[must_use]
    pub fn average_luminance(&self) -> f32 {
        self.exposure.average_luminance()
    }

    #[must_use]
    pub fn exposure_mode(&self) -> ExposureMode {
        self.exposure.mode()
    }

    /// Sink notified with every auto-exposure value.
    pub fn set_exposure_observer(&mut self, observer: impl FnMut(f32) + 'static) {
        self.exposure.set_observer(observer);
    }

    // === Lighting ===

    pub fn set_lights_enabled(&mut self, enabled: bool) {
        self.lighting.set_enabled(&mut self.backend, enabled);
        self.lighting.publish(&mut self.scene);
    }

    pub fn set_master(&mut self, master: f32) {
        self.lighting.set_master(&mut self.backend, master);
        self.lighting.publish(&mut self.scene);
    }

    /// Rotates the light rig about +Y, in degrees.
    pub fn set_light_rotation(&mut self, degrees: f32) {
        self.lighting.set_rotation(&mut self.backend, degrees);
        self.lighting.publish(&mut self.scene);
    }

    pub fn apply_light_settings(
        &mut self,
        settings: impl IntoIterator<Item = (LightId, LightSettings)>,
    ) {
        self.lighting.apply_settings(&mut self.backend, settings);
        self.lighting.publish(&mut self.scene);
    }

    pub fn update_light_property(&mut self, id: LightId, property: LightProperty) {
        self.lighting
            .update_light_property(&mut self.backend, id, property);
        self.lighting.publish(&mut self.scene);
    }

    pub fn set_indicators_visible(&mut self, visible: bool) {
        self.lighting.set_indicators_visible(&mut self.backend, visible);
        self.lighting.publish(&mut self.scene);
    }

    pub fn set_model_bounds(&mut self, bounds: ModelBounds) {
        self.lighting.set_model_bounds(&mut self.backend, bounds);
        self.lighting.publish(&mut self.scene);
    }

    // === Frame ===

    /// Logical size change; the pixel ratio is re-read from the backend.
    pub fn resize(&mut self, width: u32, height: u32) {
        let pixel_ratio = self.backend.pixel_ratio();
        self.chain
            .resize(&mut self.backend, width, height, pixel_ratio);
    }

    /// Toggles a pass. `Render` and `ToneMap` cannot be turned off.
    pub fn set_pass_enabled(&mut self, kind: PassKind, enabled: bool) {
        self.chain.set_enabled(kind, enabled);
    }

    /// Runs auto exposure, advances animated passes and executes the chain.
    ///
    /// `unlit` skips luminance sampling (e.g. while an unlit debug view is shown).
    /// Only chain execution can fail; exposure problems are absorbed.
    pub fn render_frame(&mut self, dt: f32, unlit: bool) -> Result<()> {
        self.exposure
            .update(&mut self.backend, &self.scene, &mut self.chain, unlit);
        self.chain.advance_time(dt);
        self.backend.execute_chain(&self.chain, &self.scene)
    }

    /// Releases every GPU resource the controllers own and clears the scene.
    pub fn dispose(&mut self) {
        self.exposure.dispose(&mut self.backend);
        self.environment.dispose(&mut self.backend);
        self.lighting.dispose(&mut self.backend);
        self.chain.dispose(&mut self.backend);
        self.scene = StudioScene::new();
        log::debug!("Studio disposed");
    }
}
