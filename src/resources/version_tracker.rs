//! Versioned uniform storage.
//!
//! Pass uniforms live on the CPU and are uploaded by the backend only when
//! their version moved since the last upload.

use bytemuck::Pod;

/// Version tracker - used to mark uniform changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Marks as modified, increments version by 1
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Gets the current version number
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// A uniform block plus its change tracker.
///
/// Reads are free; every [`write`](Self::write) bumps the version when the
/// returned guard drops.
#[derive(Debug, Clone)]
pub struct UniformCell<T: Pod> {
    data: T,
    tracker: ChangeTracker,
}

impl<T: Pod> UniformCell<T> {
    #[must_use]
    pub fn new(data: T) -> Self {
        Self {
            data,
            tracker: ChangeTracker::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.data
    }

    pub fn write(&mut self) -> MutGuard<'_, T> {
        MutGuard::new(&mut self.data, &mut self.tracker)
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Raw bytes as laid out for the GPU.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.data)
    }
}

/// Mutable guard - automatically updates version when scope ends
pub struct MutGuard<'a, T> {
    data: &'a mut T,
    tracker: &'a mut ChangeTracker,
}

impl<'a, T> MutGuard<'a, T> {
    pub fn new(data: &'a mut T, tracker: &'a mut ChangeTracker) -> Self {
        Self { data, tracker }
    }
}

impl<T> std::ops::Deref for MutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T> std::ops::DerefMut for MutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

// Key: when Guard is dropped, automatically increment version number
impl<T> Drop for MutGuard<'_, T> {
    fn drop(&mut self) {
        self.tracker.changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_guard_bumps_version_once() {
        let mut cell = UniformCell::new([1.0f32; 4]);
        assert_eq!(cell.version(), 0);
        {
            let mut data = cell.write();
            data[0] = 2.0;
            data[1] = 3.0;
        }
        assert_eq!(cell.version(), 1);
        assert_eq!(cell.get()[1], 3.0);
        assert_eq!(cell.as_bytes().len(), 16);
    }
}
