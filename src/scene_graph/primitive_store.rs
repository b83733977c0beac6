use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use id_arena::Id;
use itertools::izip;
use thiserror::Error;

use crate::rendering::render_primitive::RenderPrimitiveId;
use crate::scene_graph::draw_list::{DrawList, DrawRequest, SplatShader};

pub type PrimitiveId = Id<PrimitiveStore>;

/// Per-point data as laid out in the GPU instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PointInstance {
    pub position: Vec3,
    pub scale: f32,
    pub normal: Vec3,
    pub shade: f32,
}

#[derive(Debug, Error, PartialEq)]
pub enum PrimitiveError {
    #[error("{name}: flat vertex data has {len} floats, which is not a multiple of 3")]
    RaggedVertexData { name: String, len: usize },
    #[error("{name}: {attribute} has {actual} entries but there are {expected} vertices")]
    AttributeLength {
        name: String,
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Immutable point data plus the handle of its GPU copy once uploaded.
pub struct PrimitiveStore {
    pub name: String,
    vertices: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    splat_scales: Option<Vec<f32>>,
    shades: Option<Vec<f32>>,
    pub render_primitive: Option<RenderPrimitiveId>,
}

impl PrimitiveStore {
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            vertices,
            normals: None,
            splat_scales: None,
            shades: None,
            render_primitive: None,
        }
    }

    /// Builds a store from `x y z x y z ...` data.
    pub fn from_flat(name: impl Into<String>, data: &[f32]) -> Result<Self, PrimitiveError> {
        let name = name.into();

        if data.len() % 3 != 0 {
            return Err(PrimitiveError::RaggedVertexData {
                name,
                len: data.len(),
            });
        }

        let vertices = data
            .chunks_exact(3)
            .map(|xyz| Vec3::new(xyz[0], xyz[1], xyz[2]))
            .collect();

        Ok(Self::new(name, vertices))
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Result<Self, PrimitiveError> {
        self.check_attribute_len("normals", normals.len())?;
        self.normals = Some(normals);
        Ok(self)
    }

    pub fn with_splat_scales(mut self, scales: Vec<f32>) -> Result<Self, PrimitiveError> {
        self.check_attribute_len("splat scales", scales.len())?;
        self.splat_scales = Some(scales);
        Ok(self)
    }

    /// Grey levels in `[0, 1]`, read by [`SplatShader::Shaded`].
    pub fn with_shades(mut self, shades: Vec<f32>) -> Result<Self, PrimitiveError> {
        self.check_attribute_len("shades", shades.len())?;
        self.shades = Some(shades);
        Ok(self)
    }

    fn check_attribute_len(&self, attribute: &'static str, actual: usize) -> Result<(), PrimitiveError> {
        if actual != self.vertices.len() {
            return Err(PrimitiveError::AttributeLength {
                name: self.name.clone(),
                attribute,
                expected: self.vertices.len(),
                actual,
            });
        }

        Ok(())
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Interleaves the attributes into GPU instances. Missing normals are
    /// zero, which the shaders read as "shade as a sphere". Missing shades
    /// are white.
    pub fn instances(&self) -> Vec<PointInstance> {
        let count = self.vertices.len();
        let normals = self
            .normals
            .clone()
            .unwrap_or_else(|| vec![Vec3::ZERO; count]);
        let scales = self
            .splat_scales
            .clone()
            .unwrap_or_else(|| vec![1.0; count]);
        let shades = self.shades.clone().unwrap_or_else(|| vec![1.0; count]);

        izip!(&self.vertices, normals, scales, shades)
            .map(|(position, normal, scale, shade)| PointInstance {
                position: *position,
                scale,
                normal,
                shade,
            })
            .collect()
    }

    /// Queues this primitive for drawing with the given world transform.
    /// Does nothing until the GPU copy exists.
    pub fn draw(
        &self,
        transform: Mat4,
        shader: SplatShader,
        point_size: f32,
        draw_list: &mut DrawList,
    ) {
        let Some(render_primitive) = self.render_primitive else {
            log::debug!("Skipping draw of {}: not uploaded yet", self.name);
            return;
        };

        draw_list.push(DrawRequest {
            render_primitive,
            transform,
            shader,
            point_size,
        });
    }
}
