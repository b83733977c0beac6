use id_arena::Id;

use crate::scene_graph::primitive_store::PrimitiveId;
use crate::scene_graph::transform::Transform;

pub type NodeId = Id<SceneNode>;

pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub primitive_id: PrimitiveId,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, primitive_id: PrimitiveId, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            primitive_id,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
