use std::sync::Arc;

use crate::{
    rendering::{
        render_common::RenderCommon,
        render_primitive::RenderPrimitives,
        shader_loader::{PipelineCache, PipelineCacheBuilder},
    },
    scene_graph::DrawRequest,
};

/// Everything a pass may read while recording a frame.
pub(crate) struct PassContext<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub pipeline_cache: &'a PipelineCache,
    pub render_primitives: &'a RenderPrimitives,
    /// Requests whose node uniforms were written this frame.
    pub draw_requests: &'a [DrawRequest],
}

pub(crate) trait Pass {
    type TextureViews;

    fn create(
        device: &wgpu::Device,
        common: Arc<RenderCommon>,
        cache_builder: &mut PipelineCacheBuilder,
    ) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn render(&self, texture_views: &Self::TextureViews, context: &mut PassContext);
}
