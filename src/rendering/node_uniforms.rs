use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::scene_graph::draw_list::DrawRequest;

/// Per-draw data, one slot per draw request.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct NodeUniform {
    pub model: Mat4,
    pub point_size: f32,
    _padding: [f32; 3],
}

impl NodeUniform {
    pub fn new(model: Mat4, point_size: f32) -> Self {
        Self {
            model,
            point_size,
            _padding: [0.0; 3],
        }
    }
}

/// Uniform buffer holding every draw of a frame, bound with dynamic offsets.
pub struct NodeUniforms {
    buffer: wgpu::Buffer,
    stride: u64,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl NodeUniforms {
    pub const MAX_DRAWS: usize = 256;

    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_size = std::mem::size_of::<NodeUniform>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = wgpu::util::align_to(uniform_size, alignment);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Node uniform buffer"),
            size: stride * Self::MAX_DRAWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Node uniform bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(uniform_size),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Node uniform bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(uniform_size),
                }),
            }],
        });

        Self {
            buffer,
            stride,
            bind_group,
            bind_group_layout,
        }
    }

    /// Writes one slot per request and returns how many fit.
    pub fn write(&self, queue: &wgpu::Queue, requests: &[DrawRequest]) -> usize {
        if requests.len() > Self::MAX_DRAWS {
            log::warn!(
                "{} draw requests, only the first {} are drawn",
                requests.len(),
                Self::MAX_DRAWS
            );
        }

        let count = requests.len().min(Self::MAX_DRAWS);
        if count == 0 {
            return 0;
        }

        let stride = self.stride as usize;
        let mut bytes = vec![0u8; stride * count];

        for (slot, request) in bytes.chunks_exact_mut(stride).zip(requests) {
            let uniform = NodeUniform::new(request.transform, request.point_size);
            let uniform_bytes = bytemuck::bytes_of(&uniform);
            slot[..uniform_bytes.len()].copy_from_slice(uniform_bytes);
        }

        queue.write_buffer(&self.buffer, 0, &bytes);

        count
    }

    pub fn offset(&self, index: usize) -> wgpu::DynamicOffset {
        (index as u64 * self.stride) as wgpu::DynamicOffset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_wgsl_layout() {
        // mat4x4<f32> + f32, rounded up to the struct alignment of 16.
        assert_eq!(std::mem::size_of::<NodeUniform>(), 80);
    }
}
