use slotmap::SlotMap;

use crate::errors::{Result, StudioError};
use crate::renderer::backend::{TargetDesc, TextureId};
use crate::resources::Image;

/// A backend-owned texture with its default view.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub mip_level_count: u32,
}

impl GpuTexture {
    fn from_texture(texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            width: texture.width(),
            height: texture.height(),
            format: texture.format(),
            mip_level_count: texture.mip_level_count(),
            texture,
            view,
        }
    }

    /// Uploads decoded pixels into a sampled texture.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, image: &Image) -> Result<Self> {
        let bytes_per_pixel = image.bytes_per_pixel();
        let expected = image.width as usize * image.height as usize * bytes_per_pixel as usize;
        if image.width == 0 || image.height == 0 || image.data.len() != expected {
            return Err(StudioError::Backend(format!(
                "Image '{}' has {} bytes, expected {expected} for {}x{}",
                image.label,
                image.data.len(),
                image.width,
                image.height
            )));
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&image.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: image.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * bytes_per_pixel),
                rows_per_image: Some(image.height),
            },
            size,
        );

        Ok(Self::from_texture(texture))
    }

    /// Allocates a color target that can also be sampled and read back.
    pub fn render_target(device: &wgpu::Device, desc: &TargetDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(StudioError::TargetAllocation(format!(
                "{} has zero size ({}x{})",
                desc.label, desc.width, desc.height
            )));
        }
        let limit = device.limits().max_texture_dimension_2d;
        if desc.width > limit || desc.height > limit {
            return Err(StudioError::TargetAllocation(format!(
                "{} exceeds the device limit ({}x{} > {limit})",
                desc.label, desc.width, desc.height
            )));
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Ok(Self::from_texture(texture))
    }

    /// Wraps a texture created elsewhere (e.g. a compute output).
    pub fn wrap(texture: wgpu::Texture) -> Self {
        Self::from_texture(texture)
    }
}

/// Live textures, keyed by the ids handed to controllers.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: SlotMap<TextureId, GpuTexture>,
}

impl TextureRegistry {
    pub fn insert(&mut self, texture: GpuTexture) -> TextureId {
        self.textures.insert(texture)
    }

    #[must_use]
    pub fn get(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(id)
    }

    pub fn try_get(&self, id: TextureId) -> Result<&GpuTexture> {
        self.textures
            .get(id)
            .ok_or_else(|| StudioError::TextureNotFound(format!("{id:?}")))
    }

    /// Removes and destroys a texture. Returns false for unknown ids.
    pub fn remove(&mut self, id: TextureId) -> bool {
        match self.textures.remove(id) {
            Some(texture) => {
                texture.texture.destroy();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn clear(&mut self) {
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
    }
}
