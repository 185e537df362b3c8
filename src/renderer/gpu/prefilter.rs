//! Environment prefiltering.
//!
//! Convolves an equirectangular source with the GGX lobe into a fixed-size
//! `Rgba16Float` equirectangular mip chain, one roughness level per mip
//! (mip 0 = mirror, last mip = roughness 1). Materials pick the mip by
//! roughness; the blurred background samples a high mip.

use std::borrow::Cow;

use crate::renderer::gpu::fullscreen::EQUIRECT_HELPERS;
use crate::resources::uniforms::PrefilterUniforms;

pub const PREFILTER_WIDTH: u32 = 512;
pub const PREFILTER_HEIGHT: u32 = 256;
pub const PREFILTER_MIP_COUNT: u32 = 6;
const SAMPLE_COUNT: u32 = 256;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

pub struct EnvironmentPrefilter {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl std::fmt::Debug for EnvironmentPrefilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentPrefilter").finish_non_exhaustive()
    }
}

impl EnvironmentPrefilter {
    pub fn new(device: &wgpu::Device) -> Self {
        let source = format!("{EQUIRECT_HELPERS}\n{}", include_str!("../shaders/prefilter.wgsl"));
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Environment Prefilter Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Environment Prefilter Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Environment Prefilter Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Environment Prefilter Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Prefilter Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            layout,
            sampler,
        }
    }

    /// Records the convolution of `source` and returns the output texture.
    pub fn run(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
    ) -> wgpu::Texture {
        let output = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Prefiltered Environment"),
            size: wgpu::Extent3d {
                width: PREFILTER_WIDTH,
                height: PREFILTER_HEIGHT,
                depth_or_array_layers: 1,
            },
            mip_level_count: PREFILTER_MIP_COUNT,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        for mip in 0..PREFILTER_MIP_COUNT {
            let width = (PREFILTER_WIDTH >> mip).max(1);
            let height = (PREFILTER_HEIGHT >> mip).max(1);
            let params = PrefilterUniforms {
                roughness: mip as f32 / (PREFILTER_MIP_COUNT - 1) as f32,
                mip_width: width as f32,
                mip_height: height as f32,
                sample_count: SAMPLE_COUNT,
            };

            let param_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Prefilter Params"),
                size: std::mem::size_of::<PrefilterUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM,
                mapped_at_creation: true,
            });
            param_buffer
                .slice(..)
                .get_mapped_range_mut()
                .copy_from_slice(bytemuck::bytes_of(&params));
            param_buffer.unmap();

            let dest_view = output.create_view(&wgpu::TextureViewDescriptor {
                label: Some("Prefilter Mip"),
                format: Some(FORMAT),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_mip_level: mip,
                mip_level_count: Some(1),
                usage: Some(wgpu::TextureUsages::STORAGE_BINDING),
                ..Default::default()
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Prefilter BindGroup"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: param_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&dest_view),
                    },
                ],
            });

            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Environment Prefilter"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&self.pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(width.div_ceil(8), height.div_ceil(8), 1);
        }

        output
    }
}
