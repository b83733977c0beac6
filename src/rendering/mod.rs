pub mod global_uniform;
pub mod imgui_renderer;
pub mod node_uniforms;
pub mod passes;
pub mod render_common;
pub mod render_primitive;
pub mod renderer;
pub mod shader_loader;
pub mod texture;
