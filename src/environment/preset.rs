//! Environment preset catalog.

use serde::{Deserialize, Serialize};

/// Which decode path a preset source needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Radiance `.hdr` / OpenEXR, decoded to `Rgba16Float`.
    Hdr,
    /// PNG / JPEG / WebP, decoded to `Rgba8UnormSrgb`.
    Ldr,
}

impl SourceKind {
    /// Guesses the kind from a file extension; unknown extensions are LDR.
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        let ext = uri
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "hdr" | "exr" => Self::Hdr,
            _ => Self::Ldr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentSource {
    pub uri: String,
    pub kind: SourceKind,
}

impl EnvironmentSource {
    #[must_use]
    pub fn new(uri: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            uri: uri.into(),
            kind,
        }
    }

    #[must_use]
    pub fn hdr(uri: impl Into<String>) -> Self {
        Self::new(uri, SourceKind::Hdr)
    }

    #[must_use]
    pub fn ldr(uri: impl Into<String>) -> Self {
        Self::new(uri, SourceKind::Ldr)
    }
}

/// Descriptive payload returned when a preset becomes active.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetMood {
    pub label: String,
    pub description: String,
    /// Exposure the preset was authored for, if any.
    pub suggested_exposure: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentPreset {
    pub id: String,
    pub source: EnvironmentSource,
    #[serde(default)]
    pub mood: PresetMood,
}

impl EnvironmentPreset {
    #[must_use]
    pub fn new(id: impl Into<String>, source: EnvironmentSource, mood: PresetMood) -> Self {
        Self {
            id: id.into(),
            source,
            mood,
        }
    }
}

/// The bounded set of presets a viewer offers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    presets: Vec<EnvironmentPreset>,
}

impl PresetCatalog {
    #[must_use]
    pub fn new(presets: Vec<EnvironmentPreset>) -> Self {
        Self { presets }
    }

    /// Adds or replaces a preset by id.
    pub fn insert(&mut self, preset: EnvironmentPreset) {
        match self.presets.iter_mut().find(|p| p.id == preset.id) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&EnvironmentPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentPreset> {
        self.presets.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(SourceKind::from_uri("studio.HDR"), SourceKind::Hdr);
        assert_eq!(SourceKind::from_uri("dir/night.exr"), SourceKind::Hdr);
        assert_eq!(SourceKind::from_uri("sunset.jpg"), SourceKind::Ldr);
        assert_eq!(SourceKind::from_uri("noext"), SourceKind::Ldr);
    }

    #[test]
    fn insert_replaces_same_id() {
        let mut catalog = PresetCatalog::default();
        catalog.insert(EnvironmentPreset::new(
            "studio",
            EnvironmentSource::hdr("a.hdr"),
            PresetMood::default(),
        ));
        catalog.insert(EnvironmentPreset::new(
            "studio",
            EnvironmentSource::hdr("b.hdr"),
            PresetMood::default(),
        ));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("studio").unwrap().source.uri, "b.hdr");
    }
}
