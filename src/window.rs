use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    config::ViewerConfig, demo::DemoState, engine, input::InputState,
    rendering::renderer::Renderer,
};

/// Pixel scroll deltas (touchpads) per wheel notch.
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

struct App {
    config: ViewerConfig,
    renderer: Option<Renderer>,
    demo_state: DemoState,
    input: InputState,
    imgui: Option<ImguiState>,
    last_frame: Instant,
}

impl App {
    fn new(config: ViewerConfig, demo_state: DemoState) -> Self {
        Self {
            config,
            renderer: None,
            demo_state,
            input: InputState::default(),
            imgui: None,
            last_frame: Instant::now(),
        }
    }

    fn setup_imgui(window: &Window) -> ImguiState {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(
            context.io_mut(),
            window,
            imgui_winit_support::HiDpiMode::Default,
        );

        let font_size = 14.0;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        // Disable INI support because it's broken in the published version of imgui
        context.set_ini_filename(None);

        ImguiState { context, platform }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let mut imgui = Self::setup_imgui(&window);
        let mut renderer = pollster::block_on(Renderer::new(
            window,
            &self.demo_state,
            &mut imgui.context,
        ))
        .context("Failed to initialize renderer")?;

        renderer.load_primitives(&mut self.demo_state.scene);
        renderer.window.request_redraw();

        self.renderer = Some(renderer);
        self.imgui = Some(imgui);

        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            log::error!("{:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(renderer), Some(imgui)) = (self.renderer.as_mut(), self.imgui.as_mut()) else {
            return;
        };

        let want_capture_mouse = imgui.context.io().want_capture_mouse;
        let want_capture_keyboard = imgui.context.io().want_capture_keyboard;

        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                renderer.resize(*new_size);
            }
            WindowEvent::Focused(false) => {
                self.input.release_all();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if *code == KeyCode::Escape && *state == ElementState::Pressed {
                    event_loop.exit();
                } else if !want_capture_keyboard || *state == ElementState::Released {
                    self.input.on_key(*code, *state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if !want_capture_mouse || *state == ElementState::Released {
                    self.input.on_mouse_button(*button, *state);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let delta = self
                    .input
                    .on_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
                if !want_capture_mouse {
                    self.demo_state.camera.drag(delta, &self.input);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.input.on_cursor_left();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !want_capture_mouse {
                    let lines = match delta {
                        MouseScrollDelta::LineDelta(_, y) => *y,
                        MouseScrollDelta::PixelDelta(position) => {
                            position.y as f32 / PIXELS_PER_SCROLL_LINE
                        }
                    };
                    self.demo_state.camera.scroll(lines);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                imgui
                    .context
                    .io_mut()
                    .update_delta_time(now - self.last_frame);
                self.last_frame = now;

                if let Err(e) = imgui
                    .platform
                    .prepare_frame(imgui.context.io_mut(), &renderer.window)
                {
                    log::error!("Failed to prepare imgui frame: {}", e);
                    return;
                }

                let ui = imgui.context.new_frame();
                let update_result = engine::update(&mut self.demo_state, &self.input, ui);
                imgui.platform.prepare_render(ui, &renderer.window);
                let draw_data = imgui.context.render();

                if let Err(e) = update_result {
                    log::error!("Error during engine::update: {:#}", e);
                    event_loop.exit();
                    return;
                }

                match renderer.render(&self.demo_state, draw_data) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        renderer.resize(renderer.size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory");
                        event_loop.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        log::warn!("Timeout");
                    }
                    Err(other) => {
                        log::error!("Unexpected error: {:?}", other);
                    }
                }

                renderer.window.request_redraw();
            }
            _ => (),
        }

        imgui.platform.handle_event::<()>(
            imgui.context.io_mut(),
            &renderer.window,
            &Event::WindowEvent { window_id, event },
        );
    }
}

pub async fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let demo_state = DemoState::new(&config).context("Failed to create demo state")?;
    let mut app = App::new(config, demo_state);
    event_loop.run_app(&mut app)?;

    Ok(())
}
