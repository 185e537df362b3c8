//! Session cache of uploaded environment sources.
//!
//! Presets form a small known set, so the cache only grows; entries are
//! released together when the controller is disposed.

use rustc_hash::FxHashMap;

use crate::renderer::backend::{RenderBackend, TextureId};

/// One uploaded preset source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedEnvironment {
    pub texture: TextureId,
    /// Source size; `None` when the size could not be determined.
    pub size: Option<(u32, u32)>,
    pub hdr: bool,
}

#[derive(Debug, Default)]
pub struct EnvironmentCache {
    entries: FxHashMap<String, CachedEnvironment>,
}

impl EnvironmentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CachedEnvironment> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Adds an entry. An existing entry for the same id is kept and the new
    /// texture is handed back so the caller can release it.
    pub fn insert(&mut self, id: &str, entry: CachedEnvironment) -> Option<TextureId> {
        if self.entries.contains_key(id) {
            return Some(entry.texture);
        }
        self.entries.insert(id.to_owned(), entry);
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        for (_, entry) in self.entries.drain() {
            backend.dispose_texture(entry.texture);
        }
    }
}
