use std::mem::offset_of;

use wgpu::util::DeviceExt;

use crate::scene_graph::primitive_store::{PointInstance, PrimitiveStore};

/// Handle of a primitive's GPU copy inside [`RenderPrimitives`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPrimitiveId(usize);

impl RenderPrimitiveId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

pub struct RenderPrimitive {
    pub instance_buffer: wgpu::Buffer,
    pub num_points: u32,
}

impl RenderPrimitive {
    fn from_primitive(device: &wgpu::Device, primitive: &PrimitiveStore) -> Self {
        let instances = primitive.instances();
        let buffer_name = format!("Point buffer ({})", primitive.name);

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&buffer_name),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            instance_buffer,
            num_points: instances.len() as u32,
        }
    }
}

/// GPU copies of every uploaded primitive. Entries live as long as the renderer.
#[derive(Default)]
pub struct RenderPrimitives {
    primitives: Vec<RenderPrimitive>,
}

impl RenderPrimitives {
    /// Uploads `primitive` unless it already has a GPU copy.
    pub fn upload(&mut self, device: &wgpu::Device, primitive: &mut PrimitiveStore) -> RenderPrimitiveId {
        if let Some(id) = primitive.render_primitive {
            return id;
        }

        let id = RenderPrimitiveId(self.primitives.len());
        self.primitives
            .push(RenderPrimitive::from_primitive(device, primitive));
        primitive.render_primitive = Some(id);

        log::info!(
            "Uploaded primitive {} with {} points",
            primitive.name,
            primitive.vertex_count()
        );

        id
    }

    pub fn get(&self, id: RenderPrimitiveId) -> Option<&RenderPrimitive> {
        self.primitives.get(id.0)
    }
}

/// One quad corner per vertex, one point per instance.
pub const POINT_INSTANCE_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<PointInstance>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(PointInstance, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(PointInstance, scale) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(PointInstance, normal) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(PointInstance, shade) as wgpu::BufferAddress,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32,
        },
    ],
};

pub const SPLAT_PRIMITIVE_STATE: wgpu::PrimitiveState = wgpu::PrimitiveState {
    topology: wgpu::PrimitiveTopology::TriangleStrip,
    strip_index_format: None,
    front_face: wgpu::FrontFace::Ccw,
    cull_mode: None,
    polygon_mode: wgpu::PolygonMode::Fill,
    unclipped_depth: false,
    conservative: false,
};

/// Vertices per splat quad.
pub const SPLAT_QUAD_VERTICES: u32 = 4;
