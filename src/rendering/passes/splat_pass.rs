use std::sync::Arc;

use wgpu::{
    DepthBiasState, Device, MultisampleState, PipelineCompilationOptions, RenderPassDescriptor,
    ShaderSource, StencilState,
};

use crate::{
    rendering::{
        passes::pass::{Pass, PassContext},
        render_common::RenderCommon,
        render_primitive::{POINT_INSTANCE_VBL, SPLAT_PRIMITIVE_STATE, SPLAT_QUAD_VERTICES},
        shader_loader::{PipelineCacheBuilder, PipelineId, ShaderDefinition},
        texture::DepthTexture,
    },
    scene_graph::SplatShader,
};

const FLAT_SPLAT_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Flat splats",
    path: "splat_flat.wgsl",
};

const PHONG_SPLAT_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Phong splats",
    path: "splat_phong.wgsl",
};

const SHADED_SPLAT_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Shaded splats",
    path: "splat_shaded.wgsl",
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.3,
    b: 0.3,
    a: 1.0,
};

/// Draws every queued request as instanced screen-space quads.
pub struct SplatPass {
    flat_pipeline: PipelineId,
    phong_pipeline: PipelineId,
    shaded_pipeline: PipelineId,
    camera_bind_group: wgpu::BindGroup,
    common: Arc<RenderCommon>,
}

pub struct SplatPassTextureViews {
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
}

impl SplatPass {
    fn pipeline_id(&self, shader: SplatShader) -> PipelineId {
        match shader {
            SplatShader::Flat => self.flat_pipeline,
            SplatShader::Phong => self.phong_pipeline,
            SplatShader::Shaded => self.shaded_pipeline,
        }
    }
}

fn add_splat_shader(
    cache_builder: &mut PipelineCacheBuilder,
    shader_def: ShaderDefinition,
    layout: wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
) -> PipelineId {
    cache_builder.add_shader(
        shader_def,
        Box::new(
            move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(shader_def.name),
                    source: ShaderSource::Wgsl(source.into()),
                });

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(shader_def.name),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[POINT_INSTANCE_VBL],
                        compilation_options: PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: PipelineCompilationOptions::default(),
                    }),
                    primitive: SPLAT_PRIMITIVE_STATE,
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DepthTexture::DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: StencilState::default(),
                        bias: DepthBiasState::default(),
                    }),
                    multisample: MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                Ok(pipeline)
            },
        ),
    )
}

impl Pass for SplatPass {
    type TextureViews = SplatPassTextureViews;

    fn create(
        device: &Device,
        common: Arc<RenderCommon>,
        cache_builder: &mut PipelineCacheBuilder,
    ) -> anyhow::Result<Self> {
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("camera_bind_group_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: common.camera_uniform_buffer.as_entire_binding(),
            }],
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Splat pipeline layout"),
                bind_group_layouts: &[
                    &camera_bind_group_layout,
                    &common.global_uniform.bind_group_layout,
                    &common.node_uniforms.bind_group_layout,
                ],
                push_constant_ranges: &[],
            });

        let format = common.surface_format();

        let flat_pipeline = add_splat_shader(
            cache_builder,
            FLAT_SPLAT_SHADER,
            render_pipeline_layout.clone(),
            format,
        );
        let phong_pipeline = add_splat_shader(
            cache_builder,
            PHONG_SPLAT_SHADER,
            render_pipeline_layout.clone(),
            format,
        );
        let shaded_pipeline = add_splat_shader(
            cache_builder,
            SHADED_SPLAT_SHADER,
            render_pipeline_layout,
            format,
        );

        Ok(SplatPass {
            flat_pipeline,
            phong_pipeline,
            shaded_pipeline,
            camera_bind_group,
            common,
        })
    }

    fn render(&self, texture_views: &SplatPassTextureViews, context: &mut PassContext) {
        let mut render_pass = context.encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Splat Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &texture_views.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &texture_views.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.common.global_uniform.bind_group, &[]);

        for (index, request) in context.draw_requests.iter().enumerate() {
            let Some(pipeline) = context.pipeline_cache.get(self.pipeline_id(request.shader))
            else {
                continue;
            };

            let Some(primitive) = context.render_primitives.get(request.render_primitive) else {
                log::warn!("Draw request references a missing render primitive");
                continue;
            };

            if primitive.num_points == 0 {
                continue;
            }

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(
                2,
                &self.common.node_uniforms.bind_group,
                &[self.common.node_uniforms.offset(index)],
            );
            render_pass.set_vertex_buffer(0, primitive.instance_buffer.slice(..));
            render_pass.draw(0..SPLAT_QUAD_VERTICES, 0..primitive.num_points);
        }
    }
}
