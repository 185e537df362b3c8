//! Synchronous texture readback.
//!
//! Copies mip 0 into a staging buffer with 256-byte aligned rows, blocks on the
//! map callback and converts the tightly packed texels to linear RGBA floats.

use crate::errors::{Result, StudioError};
use crate::renderer::gpu::texture::GpuTexture;

/// Align to WebGPU's copy row alignment (256 bytes).
fn align_bytes_per_row(value: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    value.div_ceil(align) * align
}

pub fn read_texels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &GpuTexture,
) -> Result<Vec<[f32; 4]>> {
    let bytes_per_pixel = match source.format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => 4,
        wgpu::TextureFormat::Rgba16Float => 8,
        wgpu::TextureFormat::Rgba32Float => 16,
        other => {
            return Err(StudioError::ReadbackFailed(format!(
                "Unsupported readback format {other:?}"
            )));
        }
    };

    let (width, height) = (source.width, source.height);
    let tight_bpr = width * bytes_per_pixel;
    let padded_bpr = align_bytes_per_row(tight_bpr);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size: u64::from(padded_bpr) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &source.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = flume::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| StudioError::ReadbackFailed(e.to_string()))?;
    rx.recv()
        .map_err(|_| StudioError::ReadbackFailed("map callback dropped".into()))?
        .map_err(|e| StudioError::ReadbackFailed(e.to_string()))?;

    let data = slice.get_mapped_range();
    let mut texels = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height as usize {
        let start = row * padded_bpr as usize;
        let row_bytes = &data[start..start + tight_bpr as usize];
        texels.extend(
            row_bytes
                .chunks_exact(bytes_per_pixel as usize)
                .map(|texel| decode_texel(source.format, texel)),
        );
    }
    drop(data);
    staging.unmap();

    Ok(texels)
}

fn decode_texel(format: wgpu::TextureFormat, bytes: &[u8]) -> [f32; 4] {
    let mut out = [0.0; 4];
    match format {
        wgpu::TextureFormat::Rgba16Float => {
            for (c, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
                *c = half::f16::from_le_bytes([pair[0], pair[1]]).to_f32();
            }
        }
        wgpu::TextureFormat::Rgba32Float => {
            for (c, quad) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                *c = f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
            }
        }
        wgpu::TextureFormat::Rgba8UnormSrgb => {
            for (i, (c, &b)) in out.iter_mut().zip(bytes).enumerate() {
                let v = f32::from(b) / 255.0;
                *c = if i < 3 { srgb_to_linear(v) } else { v };
            }
        }
        _ => {
            for (c, &b) in out.iter_mut().zip(bytes) {
                *c = f32::from(b) / 255.0;
            }
        }
    }
    out
}

#[inline]
fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
