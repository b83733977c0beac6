use glam::{Mat4, Vec2};
use wgpu::util::DeviceExt;
use winit::event::MouseButton;

use crate::input::InputState;
use crate::math::transforms;

const ZOOM_STEP: f32 = 0.1;
const MIN_ZOOM: f32 = 0.1;
const PAN_PER_PIXEL: f32 = 0.0025;
const ROTATION_PER_PIXEL: f32 = 0.01;

/// Pan/zoom/rotate camera over an orthographic view of the unit cube.
#[derive(Debug, Clone)]
pub struct Camera {
    pub zoom: f32,
    pub pan: Vec2,
    /// Rotation about the x and y axes, in radians.
    pub rotation: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            rotation: Vec2::ZERO,
        }
    }
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        transforms::translate(self.pan.x, self.pan.y, 0.0)
            * transforms::scale(self.zoom, self.zoom, self.zoom)
            * transforms::rotate(self.rotation.x, self.rotation.y, 0.0)
    }

    pub fn get_vp_matrix(&self, resolution: Vec2) -> Mat4 {
        let aspect = if resolution.y > 0.0 {
            resolution.x / resolution.y
        } else {
            1.0
        };

        let (half_width, half_height) = if aspect >= 1.0 {
            (aspect, 1.0)
        } else {
            (1.0, 1.0 / aspect)
        };

        let projection =
            Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, -10.0, 10.0);
        projection * self.view_matrix()
    }

    /// `lines` is the scroll amount in wheel notches, positive zooms in.
    pub fn scroll(&mut self, lines: f32) {
        self.zoom = (self.zoom + lines * ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Middle drag pans, right drag rotates. `delta` is in pixels with y down.
    pub fn drag(&mut self, delta: Vec2, input: &InputState) {
        if input.is_button_held(MouseButton::Middle) {
            self.pan.x += delta.x * PAN_PER_PIXEL;
            self.pan.y -= delta.y * PAN_PER_PIXEL;
        } else if input.is_button_held(MouseButton::Right) {
            self.rotation.x += delta.y * ROTATION_PER_PIXEL;
            self.rotation.y += delta.x * ROTATION_PER_PIXEL;
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct CameraUniform {
    view_proj: Mat4,
}

impl CameraUniform {
    pub fn update(&mut self, resolution: winit::dpi::PhysicalSize<u32>, camera: &Camera) {
        self.view_proj =
            camera.get_vp_matrix(Vec2::new(resolution.width as f32, resolution.height as f32));
    }

    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}
