use glam::Mat4;

use crate::rendering::render_primitive::RenderPrimitiveId;

/// Shader programs a node can be drawn with. The renderer maps each one to a
/// compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplatShader {
    /// Round splats in a single flat colour.
    Flat,
    /// Round splats lit with Phong shading.
    Phong,
    /// Round splats in each point's own grey shade.
    Shaded,
}

#[derive(Debug, Clone, Copy)]
pub struct DrawRequest {
    pub render_primitive: RenderPrimitiveId,
    pub transform: Mat4,
    pub shader: SplatShader,
    pub point_size: f32,
}

/// Draw requests recorded during a frame, in submission order.
#[derive(Debug, Default)]
pub struct DrawList {
    requests: Vec<DrawRequest>,
}

impl DrawList {
    pub fn push(&mut self, request: DrawRequest) {
        self.requests.push(request);
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn requests(&self) -> &[DrawRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
