pub mod draw_list;
pub mod name_registry;
pub mod primitive_store;
pub mod scene;
pub mod scene_node;
pub mod transform;

pub use draw_list::{DrawRequest, SplatShader};
pub use primitive_store::PrimitiveStore;
pub use scene::Scene;
pub use scene_node::NodeId;
