use std::collections::HashMap;

use crate::scene_graph::scene::SceneError;
use crate::scene_graph::scene_node::NodeId;

/// Names of the live nodes of one scene. Owned by the scene, so independent
/// scenes never see each other's names.
#[derive(Debug, Default)]
pub struct NameRegistry {
    names: HashMap<String, NodeId>,
}

impl NameRegistry {
    pub fn ensure_available(&self, name: &str) -> Result<(), SceneError> {
        if self.names.contains_key(name) {
            return Err(SceneError::DuplicateName(name.to_string()));
        }

        Ok(())
    }

    pub fn register(&mut self, name: &str, id: NodeId) -> Result<(), SceneError> {
        self.ensure_available(name)?;
        self.names.insert(name.to_string(), id);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
