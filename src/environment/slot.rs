//! Single-occupancy GPU resource slot.
//!
//! A slot holds at most one backend texture for one logical purpose (the
//! rotated source, the convolved map, ...). Replacing the occupant always
//! disposes the previous texture first, so transient results never leak.

use crate::renderer::backend::{RenderBackend, TextureId};

#[derive(Debug)]
pub struct TransientSlot {
    label: &'static str,
    current: Option<TextureId>,
}

impl TransientSlot {
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            current: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<TextureId> {
        self.current
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Disposes the occupant, if any. Call before allocating its replacement.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(old) = self.current.take() {
            log::trace!("Releasing {} texture {old:?}", self.label);
            backend.dispose_texture(old);
        }
    }

    /// Stores a freshly created texture, disposing any previous occupant.
    pub fn replace(&mut self, backend: &mut dyn RenderBackend, texture: TextureId) {
        if self.current == Some(texture) {
            return;
        }
        self.release(backend);
        self.current = Some(texture);
    }
}
