use std::sync::Arc;

use anyhow::Context;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::CameraUniform,
    demo::DemoState,
    rendering::{
        global_uniform::GlobalUniformState,
        imgui_renderer::{create_imgui_renderer, ImguiRendererState},
        passes::{
            pass::{Pass, PassContext},
            splat_pass::{SplatPass, SplatPassTextureViews},
        },
        render_common::RenderCommon,
        render_primitive::RenderPrimitives,
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::DepthTexture,
    },
    scene_graph::Scene,
};

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: DepthTexture,
    render_primitives: RenderPrimitives,

    camera_uniform: CameraUniform,

    shader_loader: ShaderLoader,

    splat_pass: SplatPass,
    imgui_renderer: ImguiRendererState,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        demo_state: &DemoState,
        imgui_context: &mut imgui::Context,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(size, &demo_state.camera);
        let camera_uniform_buffer = camera_uniform.create_buffer(&device);

        let common = RenderCommon::new(&device, &adapter, &surface, size, camera_uniform_buffer)?;
        let common = Arc::new(common);

        let depth_texture = DepthTexture::new(&device, size, "Depth Texture");

        let mut cache_builder = PipelineCacheBuilder::new();

        let splat_pass = SplatPass::create(&device, common.clone(), &mut cache_builder)?;

        let shader_loader = ShaderLoader::new(device.clone(), cache_builder)?;

        let imgui_renderer =
            create_imgui_renderer(&device, &queue, common.surface_format(), imgui_context);

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            common,
            depth_texture,
            render_primitives: RenderPrimitives::default(),
            camera_uniform,
            shader_loader,
            splat_pass,
            imgui_renderer,
        })
    }

    /// Uploads every primitive of `scene` that has no GPU copy yet.
    pub fn load_primitives(&mut self, scene: &mut Scene) {
        for (_id, primitive) in scene.primitives.iter_mut() {
            self.render_primitives.upload(&self.device, primitive);
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let mut config = self
            .common
            .output_surface_config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.size = new_size;
        config.width = new_size.width;
        config.height = new_size.height;
        self.depth_texture.resize(&self.device, new_size);
        self.surface.configure(&self.device, &config);
    }

    pub fn render(
        &mut self,
        demo_state: &DemoState,
        draw_data: &imgui::DrawData,
    ) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.camera_uniform.update(self.size, &demo_state.camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.common.camera_uniform_buffer);
        self.common.global_uniform.update(
            &self.queue,
            GlobalUniformState::new(
                self.size,
                demo_state.start_time.elapsed().as_secs_f32(),
                demo_state.point_scale,
            ),
        );

        let requests = demo_state.scene.draw_list().requests();
        let draw_count = self.common.node_uniforms.write(&self.queue, requests);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.splat_pass.render(
            &SplatPassTextureViews {
                color: view.clone(),
                depth: self.depth_texture.view().clone(),
            },
            &mut PassContext {
                encoder: &mut encoder,
                pipeline_cache: &self.shader_loader.cache,
                render_primitives: &self.render_primitives,
                draw_requests: &requests[..draw_count],
            },
        );

        if let Err(e) =
            self.imgui_renderer
                .render(&view, draw_data, &self.device, &self.queue, &mut encoder)
        {
            log::error!("{:#}", e);
        }

        self.queue.submit([encoder.finish()]);

        self.window.pre_present_notify();
        output.present();

        Ok(())
    }
}
