//! Decoded environment images.
//!
//! An [`Image`] is CPU pixel data ready for upload: HDR sources are stored as
//! `Rgba16Float`, LDR sources as `Rgba8UnormSrgb`.

/// CPU-side pixel data with its GPU format.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub data: Vec<u8>,
}

impl Image {
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            format,
            data,
        }
    }

    /// Whether the pixel data keeps high dynamic range.
    #[inline]
    #[must_use]
    pub fn is_hdr(&self) -> bool {
        is_hdr_format(self.format)
    }

    #[must_use]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.block_copy_size(None).unwrap_or(4)
    }
}

/// Float formats carry dynamic range; everything else is treated as display-referred.
#[inline]
#[must_use]
pub fn is_hdr_format(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Rgba16Float | wgpu::TextureFormat::Rgba32Float
    )
}
