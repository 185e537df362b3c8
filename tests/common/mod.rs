//! Shared test doubles: a recording backend and a counting loader.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use slotmap::SlotMap;

use myth_studio::environment::{
    EnvironmentLoader, EnvironmentPreset, EnvironmentSource, PresetCatalog, PresetMood,
};
use myth_studio::errors::{Result, StudioError};
use myth_studio::renderer::backend::{
    BackendCapabilities, IndicatorDesc, IndicatorId, RenderBackend, TargetDesc, TextureId,
};
use myth_studio::renderer::chain::{PassChain, PassKind};
use myth_studio::resources::Image;
use myth_studio::scene::StudioScene;

pub const EPSILON: f32 = 1e-4;

/// Routes `log` output through the test harness; `RUST_LOG=debug` shows it.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub uploads: usize,
    pub targets: usize,
    pub renders: usize,
    pub readbacks: usize,
    pub rotations: usize,
    pub convolutions: usize,
    pub chain_runs: usize,
    pub disposed_textures: usize,
    pub disposed_indicators: usize,
}

/// In-memory [`RenderBackend`] that tracks every live resource.
#[derive(Debug)]
pub struct RecordingBackend {
    pub capabilities: BackendCapabilities,
    pub pixel_ratio: f32,
    pub clear_color: Vec3,
    /// Color every readback returns; `None` makes readback fail.
    pub readback_color: Option<[f32; 4]>,
    pub fail_targets: bool,
    pub fail_convolution: bool,
    pub calls: CallCounts,
    pub last_rotation: Option<f32>,
    /// Enabled pass kinds seen by the last chain execution.
    pub last_chain: Vec<PassKind>,
    textures: SlotMap<TextureId, FakeTexture>,
    indicators: SlotMap<IndicatorId, IndicatorDesc>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            capabilities: BackendCapabilities::default(),
            pixel_ratio: 1.0,
            clear_color: Vec3::ZERO,
            readback_color: Some([0.5, 0.5, 0.5, 1.0]),
            fail_targets: false,
            fail_convolution: false,
            calls: CallCounts::default(),
            last_rotation: None,
            last_chain: Vec::new(),
            textures: SlotMap::with_key(),
            indicators: SlotMap::with_key(),
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        init_logging();
        Self::default()
    }

    /// Backend whose readback reports a uniform grey of the given luminance.
    pub fn with_luminance(luminance: f32) -> Self {
        init_logging();
        Self {
            readback_color: Some([luminance, luminance, luminance, 1.0]),
            ..Self::default()
        }
    }

    pub fn set_luminance(&mut self, luminance: f32) {
        self.readback_color = Some([luminance, luminance, luminance, 1.0]);
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_indicators(&self) -> usize {
        self.indicators.len()
    }

    pub fn texture(&self, id: TextureId) -> Option<&FakeTexture> {
        self.textures.get(id)
    }

    pub fn is_live(&self, id: TextureId) -> bool {
        self.textures.contains_key(id)
    }

    pub fn indicator(&self, id: IndicatorId) -> Option<&IndicatorDesc> {
        self.indicators.get(id)
    }

    pub fn count_labelled(&self, label: &str) -> usize {
        self.textures.values().filter(|t| t.label == label).count()
    }
}

impl RenderBackend for RecordingBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = color;
    }

    fn upload_texture(&mut self, image: &Image) -> Result<TextureId> {
        self.calls.uploads += 1;
        Ok(self.textures.insert(FakeTexture {
            label: image.label.clone(),
            width: image.width,
            height: image.height,
            format: image.format,
        }))
    }

    fn create_render_target(&mut self, desc: &TargetDesc) -> Result<TextureId> {
        if self.fail_targets {
            return Err(StudioError::TargetAllocation(desc.label.to_owned()));
        }
        self.calls.targets += 1;
        Ok(self.textures.insert(FakeTexture {
            label: desc.label.to_owned(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
        }))
    }

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(texture).map(|t| (t.width, t.height))
    }

    fn texture_format(&self, texture: TextureId) -> Option<wgpu::TextureFormat> {
        self.textures.get(texture).map(|t| t.format)
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_some() {
            self.calls.disposed_textures += 1;
        }
    }

    fn render_scene(&mut self, _scene: &StudioScene, target: TextureId) -> Result<()> {
        if !self.textures.contains_key(target) {
            return Err(StudioError::TextureNotFound(format!("{target:?}")));
        }
        self.calls.renders += 1;
        Ok(())
    }

    fn read_pixels(&mut self, target: TextureId) -> Result<Vec<[f32; 4]>> {
        self.calls.readbacks += 1;
        let texture = self
            .textures
            .get(target)
            .ok_or_else(|| StudioError::TextureNotFound(format!("{target:?}")))?;
        let color = self
            .readback_color
            .ok_or_else(|| StudioError::ReadbackFailed("device lost".into()))?;
        Ok(vec![color; (texture.width * texture.height) as usize])
    }

    fn rotate_equirect(&mut self, source: TextureId, target: TextureId, radians: f32) -> Result<()> {
        if !self.textures.contains_key(source) || !self.textures.contains_key(target) {
            return Err(StudioError::TextureNotFound("rotation input".into()));
        }
        self.calls.rotations += 1;
        self.last_rotation = Some(radians);
        Ok(())
    }

    fn convolve_environment(&mut self, source: TextureId) -> Result<TextureId> {
        if self.fail_convolution {
            return Err(StudioError::Backend("convolution unavailable".into()));
        }
        if !self.textures.contains_key(source) {
            return Err(StudioError::TextureNotFound(format!("{source:?}")));
        }
        self.calls.convolutions += 1;
        Ok(self.textures.insert(FakeTexture {
            label: "Prefiltered Environment".into(),
            width: 512,
            height: 256,
            format: wgpu::TextureFormat::Rgba16Float,
        }))
    }

    fn create_indicator(&mut self, desc: &IndicatorDesc) -> Result<IndicatorId> {
        Ok(self.indicators.insert(*desc))
    }

    fn dispose_indicator(&mut self, indicator: IndicatorId) {
        if self.indicators.remove(indicator).is_some() {
            self.calls.disposed_indicators += 1;
        }
    }

    fn execute_chain(&mut self, chain: &PassChain, _scene: &StudioScene) -> Result<()> {
        self.calls.chain_runs += 1;
        self.last_chain = chain.enabled_passes().map(|p| p.kind()).collect();
        Ok(())
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Returns a small synthetic image per source and counts every load.
///
/// Sources whose uri starts with `missing` fail.
#[derive(Debug, Clone, Default)]
pub struct CountingLoader {
    pub loads: Rc<Cell<usize>>,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.loads.get()
    }
}

pub fn synthetic_image(source: &EnvironmentSource) -> Image {
    let (format, bpp) = if source.uri.ends_with(".hdr") {
        (wgpu::TextureFormat::Rgba16Float, 8)
    } else {
        (wgpu::TextureFormat::Rgba8UnormSrgb, 4)
    };
    Image::new(source.uri.clone(), 64, 32, format, vec![0; 64 * 32 * bpp])
}

impl EnvironmentLoader for CountingLoader {
    async fn load(&self, source: &EnvironmentSource) -> Result<Image> {
        self.loads.set(self.loads.get() + 1);
        if source.uri.starts_with("missing") {
            return Err(StudioError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                source.uri.clone(),
            )));
        }
        Ok(synthetic_image(source))
    }
}

pub fn mood(label: &str) -> PresetMood {
    PresetMood {
        label: label.into(),
        ..Default::default()
    }
}

/// "studio" (HDR), "sunset" (LDR) and "broken" (fails to load).
pub fn test_catalog() -> PresetCatalog {
    PresetCatalog::new(vec![
        EnvironmentPreset::new("studio", EnvironmentSource::hdr("studio.hdr"), mood("Studio")),
        EnvironmentPreset::new("sunset", EnvironmentSource::ldr("sunset.jpg"), mood("Sunset")),
        EnvironmentPreset::new("broken", EnvironmentSource::hdr("missing.hdr"), mood("Broken")),
    ])
}
