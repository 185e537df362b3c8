//! Debug light indicators: small cones drawn on top of the scene.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::renderer::backend::{IndicatorDesc, IndicatorId};
use crate::resources::uniforms::IndicatorUniforms;

const CONE_SEGMENTS: u32 = 12;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ConeVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

/// Unit cone with its apex on local -Z.
fn cone_vertices() -> Vec<ConeVertex> {
    let apex = Vec3::new(0.0, 0.0, -1.0);
    let radius = 0.4;
    let mut vertices = Vec::with_capacity(CONE_SEGMENTS as usize * 6);
    for i in 0..CONE_SEGMENTS {
        let a0 = i as f32 / CONE_SEGMENTS as f32 * std::f32::consts::TAU;
        let a1 = (i + 1) as f32 / CONE_SEGMENTS as f32 * std::f32::consts::TAU;
        let p0 = Vec3::new(a0.cos() * radius, a0.sin() * radius, 0.0);
        let p1 = Vec3::new(a1.cos() * radius, a1.sin() * radius, 0.0);

        let side = (p1 - p0).cross(apex - p0).normalize_or_zero();
        for p in [p0, p1, apex] {
            vertices.push(ConeVertex {
                position: p.to_array(),
                normal: side.to_array(),
            });
        }
        for p in [Vec3::ZERO, p1, p0] {
            vertices.push(ConeVertex {
                position: p.to_array(),
                normal: Vec3::Z.to_array(),
            });
        }
    }
    vertices
}

#[derive(Debug)]
struct GpuIndicator {
    desc: IndicatorDesc,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct IndicatorRenderer {
    module: wgpu::ShaderModule,
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    indicators: SlotMap<IndicatorId, GpuIndicator>,
}

impl std::fmt::Debug for IndicatorRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorRenderer")
            .field("live", &self.indicators.len())
            .finish_non_exhaustive()
    }
}

impl IndicatorRenderer {
    pub fn new(device: &wgpu::Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Light Indicator Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "../shaders/indicator.wgsl"
            ))),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Indicator Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Light Indicator Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let vertices = cone_vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Indicator Cone"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            module,
            layout,
            pipeline_layout,
            pipelines: FxHashMap::default(),
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            indicators: SlotMap::with_key(),
        }
    }

    /// Allocates the per-indicator uniform buffer ("material").
    pub fn create(&mut self, device: &wgpu::Device, desc: &IndicatorDesc) -> IndicatorId {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Indicator Uniforms"),
            size: std::mem::size_of::<IndicatorUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Light Indicator BindGroup"),
            layout: &self.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.indicators.insert(GpuIndicator {
            desc: *desc,
            buffer,
            bind_group,
        })
    }

    pub fn dispose(&mut self, id: IndicatorId) -> bool {
        match self.indicators.remove(id) {
            Some(indicator) => {
                indicator.buffer.destroy();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn clear(&mut self) {
        for (_, indicator) in self.indicators.drain() {
            indicator.buffer.destroy();
        }
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipelines.contains_key(&format) {
            return;
        }
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Light Indicator Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ConeVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        self.pipelines.insert(format, pipeline);
    }

    /// Draws the listed indicators over whatever `target` already holds.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        ids: &[IndicatorId],
        view_projection: Mat4,
        target: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) {
        let live: Vec<&GpuIndicator> = ids.iter().filter_map(|id| self.indicators.get(*id)).collect();
        if live.is_empty() {
            return;
        }

        for indicator in &live {
            let d = indicator.desc;
            let model = Mat4::from_scale_rotation_translation(Vec3::splat(d.scale), d.rotation, d.position);
            let uniforms = IndicatorUniforms {
                clip_from_local: (view_projection * model).to_cols_array_2d(),
                color: d.color.extend(1.0).to_array(),
            };
            queue.write_buffer(&indicator.buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        self.ensure_pipeline(device, format);
        let Some(pipeline) = self.pipelines.get(&format) else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Light Indicators"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        for id in ids {
            if let Some(indicator) = self.indicators.get(*id) {
                pass.set_bind_group(0, &indicator.bind_group, &[]);
                pass.draw(0..self.vertex_count, 0..1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cone_apex_points_down_negative_z() {
        let vertices = cone_vertices();
        assert_eq!(vertices.len(), CONE_SEGMENTS as usize * 6);
        let min_z = vertices
            .iter()
            .map(|v| v.position[2])
            .fold(f32::INFINITY, f32::min);
        assert_eq!(min_z, -1.0);
    }
}
