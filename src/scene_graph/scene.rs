use glam::Mat4;
use id_arena::Arena;
use thiserror::Error;

use crate::scene_graph::draw_list::{DrawList, SplatShader};
use crate::scene_graph::name_registry::NameRegistry;
use crate::scene_graph::primitive_store::{PrimitiveId, PrimitiveStore};
use crate::scene_graph::scene_node::{NodeId, SceneNode};
use crate::scene_graph::transform::Transform;

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("a scene node named {0:?} already exists")]
    DuplicateName(String),
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: String, child: String },
    #[error("unknown scene node")]
    UnknownNode,
}

/// Where a delta transform is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeltaTarget {
    Local,
    FrameOffset,
}

pub struct Scene {
    pub nodes: Arena<SceneNode>,
    pub primitives: Arena<PrimitiveStore>,
    names: NameRegistry,
    draw_list: DrawList,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            primitives: Arena::new(),
            names: NameRegistry::default(),
            draw_list: DrawList::default(),
        }
    }

    /// Creates a root node owning `primitive`, placed at `initial_transform`
    /// in world space. Fails if the name is taken.
    pub fn spawn_node(
        &mut self,
        name: impl Into<String>,
        primitive: PrimitiveStore,
        initial_transform: Mat4,
    ) -> Result<NodeId, SceneError> {
        let name = name.into();
        self.names.ensure_available(&name)?;

        let primitive_id = self.primitives.alloc(primitive);
        let node = SceneNode::new(
            name.clone(),
            primitive_id,
            Transform::from_matrix(initial_transform),
        );
        let node_id = self.nodes.alloc(node);
        self.names.register(&name, node_id)?;

        log::debug!("Spawned scene node {}", name);

        Ok(node_id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name)
    }

    pub fn get_primitive(&self, id: PrimitiveId) -> Option<&PrimitiveStore> {
        self.primitives.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn root_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent_id.is_none())
            .map(|(id, _)| id)
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    /// Appends `child` to `parent`'s children, detaching it from its previous
    /// parent. The child keeps its world transform; its local transform is
    /// rebased onto the new parent. Fails when `child` is `parent` itself or
    /// one of its ancestors.
    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), SceneError> {
        let parent = self.node(parent_id)?;
        let child = self.node(child_id)?;

        if self.is_ancestor_or_self(child_id, parent_id) {
            return Err(SceneError::Cycle {
                parent: parent.name.clone(),
                child: child.name.clone(),
            });
        }

        let old_parent_id = child.parent_id;
        let child_world = self.refresh_world_matrix(child_id);
        let parent_world = self.refresh_world_matrix(parent_id);

        if let Some(old_parent_id) = old_parent_id {
            if let Some(old_parent) = self.nodes.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        let child = &mut self.nodes[child_id];
        let frame = parent_world * child.transform.frame_offset();
        child.transform.set_local(frame.inverse() * child_world);
        child.parent_id = Some(parent_id);
        self.nodes[parent_id].child_ids.push(child_id);

        self.invalidate_node_hierarchy(child_id);

        Ok(())
    }

    /// True if `candidate` is `node` or lies on the path from `node` to its root.
    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);

        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.nodes.get(id).and_then(|node| node.parent_id);
        }

        false
    }

    /// Composes `delta` onto the node's world transform, `world = delta * world`.
    /// The whole subtree follows: every descendant's world transform picks up
    /// `delta` exactly once. The node's local transform is updated so that
    /// this holds under its parent; a parent with a singular world matrix
    /// yields a non-finite result.
    ///
    /// Descendants are visited before the node itself. Returns the number of
    /// nodes visited.
    pub fn transform(&mut self, node_id: NodeId, delta: Mat4) -> Result<usize, SceneError> {
        self.apply_delta(node_id, delta, DeltaTarget::Local)
    }

    /// Like [`Scene::transform`], but only for the current frame. The offset
    /// is dropped by the next [`Scene::early_update`].
    pub fn transform_for_frame(
        &mut self,
        node_id: NodeId,
        delta: Mat4,
    ) -> Result<usize, SceneError> {
        self.apply_delta(node_id, delta, DeltaTarget::FrameOffset)
    }

    fn apply_delta(
        &mut self,
        node_id: NodeId,
        delta: Mat4,
        target: DeltaTarget,
    ) -> Result<usize, SceneError> {
        let parent_world = self
            .node(node_id)?
            .parent_id
            .map(|parent_id| self.refresh_world_matrix(parent_id))
            .unwrap_or(Mat4::IDENTITY);

        let visited = self.invalidate_descendants(node_id);

        // Conjugate the world-space delta into the space it is stored in.
        let transform = &mut self.nodes[node_id].transform;
        match target {
            DeltaTarget::Local => {
                let frame = parent_world * transform.frame_offset();
                transform.apply(frame.inverse() * delta * frame);
            }
            DeltaTarget::FrameOffset => {
                transform.apply_frame_offset(parent_world.inverse() * delta * parent_world);
            }
        }

        Ok(visited + 1)
    }

    /// Post-order: every child's subtree is invalidated before the child.
    fn invalidate_descendants(&self, node_id: NodeId) -> usize {
        let Some(node) = self.nodes.get(node_id) else {
            return 0;
        };

        let mut visited = 0;
        for &child_id in &node.child_ids {
            visited += self.invalidate_descendants(child_id);
            if let Some(child) = self.nodes.get(child_id) {
                child.transform.invalidate_world();
                visited += 1;
            }
        }

        visited
    }

    /// Invalidates world transforms for a node and all its descendants
    pub fn invalidate_node_hierarchy(&self, node_id: NodeId) {
        if let Some(node) = self.nodes.get(node_id) {
            node.transform.invalidate_world();

            for &child_id in &node.child_ids {
                self.invalidate_node_hierarchy(child_id);
            }
        }
    }

    /// Current world transform of a node, recomputing stale ancestors on the way.
    pub fn world_matrix(&self, node_id: NodeId) -> Result<Mat4, SceneError> {
        self.node(node_id)?;
        Ok(self.refresh_world_matrix(node_id))
    }

    fn refresh_world_matrix(&self, node_id: NodeId) -> Mat4 {
        let node = &self.nodes[node_id];

        if node.transform.is_world_dirty() {
            let parent_world = node
                .parent_id
                .map(|parent_id| self.refresh_world_matrix(parent_id))
                .unwrap_or(Mat4::IDENTITY);

            node.transform
                .set_world_matrix(parent_world * node.transform.effective_local_matrix());
        }

        *node.transform.get_world_matrix()
    }

    /// Queues the node's primitive with its world transform. Children are not
    /// drawn; each node has to be drawn explicitly.
    pub fn draw(
        &mut self,
        node_id: NodeId,
        shader: SplatShader,
        point_size: f32,
    ) -> Result<(), SceneError> {
        let world = self.world_matrix(node_id)?;
        let primitive_id = self.nodes[node_id].primitive_id;

        if let Some(primitive) = self.primitives.get(primitive_id) {
            primitive.draw(world, shader, point_size, &mut self.draw_list);
        }

        Ok(())
    }

    /// Updates all node transforms in hierarchical order
    fn update_transforms(&self) {
        for root_id in self.root_ids() {
            self.update_node_transform_recursive(root_id, Mat4::IDENTITY);
        }
    }

    /// Recursively updates a node's world transform and its children
    fn update_node_transform_recursive(&self, node_id: NodeId, parent_world_matrix: Mat4) {
        if let Some(node) = self.nodes.get(node_id) {
            if node.transform.is_world_dirty() {
                let local_matrix = node.transform.effective_local_matrix();
                node.transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *node.transform.get_world_matrix();
            for &child_id in &node.child_ids {
                self.update_node_transform_recursive(child_id, world_matrix);
            }
        }
    }

    /// Starts a frame: drops last frame's draw requests and frame offsets.
    pub fn early_update(&mut self) {
        self.draw_list.clear();

        let mut offset_nodes = Vec::new();
        for (id, node) in self.nodes.iter_mut() {
            node.transform.reset_flags();
            if node.transform.reset_frame_offset() {
                offset_nodes.push(id);
            }
        }

        for id in offset_nodes {
            self.invalidate_node_hierarchy(id);
        }
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::transforms;
    use crate::rendering::render_primitive::RenderPrimitiveId;
    use glam::Vec3;

    const EPSILON: f32 = 1e-4;

    fn points() -> PrimitiveStore {
        PrimitiveStore::new("points", vec![Vec3::ZERO, Vec3::X])
    }

    fn chain(scene: &mut Scene) -> (NodeId, NodeId, NodeId) {
        let root = scene
            .spawn_node("root", points(), transforms::rotate(0.3, 0.0, 0.0))
            .unwrap();
        let a = scene
            .spawn_node("a", points(), transforms::translate(0.0, -0.4, 0.4))
            .unwrap();
        let b = scene
            .spawn_node("b", points(), transforms::scale(0.5, 0.5, 0.5))
            .unwrap();
        scene.add_child(root, a).unwrap();
        scene.add_child(a, b).unwrap();
        (root, a, b)
    }

    fn upload_all(scene: &mut Scene) {
        for (index, (_, primitive)) in scene.primitives.iter_mut().enumerate() {
            primitive.render_primitive = Some(RenderPrimitiveId::from_index(index));
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut scene = Scene::new();
        scene.spawn_node("s_obj1", points(), Mat4::IDENTITY).unwrap();

        let result = scene.spawn_node("s_obj1", points(), Mat4::IDENTITY);

        assert_eq!(result.err(), Some(SceneError::DuplicateName("s_obj1".into())));
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.primitives.len(), 1);
        assert!(scene.spawn_node("s_obj2", points(), Mat4::IDENTITY).is_ok());
    }

    #[test]
    fn scenes_have_independent_names() {
        let mut first = Scene::new();
        let mut second = Scene::new();

        assert!(first.spawn_node("shared", points(), Mat4::IDENTITY).is_ok());
        assert!(second.spawn_node("shared", points(), Mat4::IDENTITY).is_ok());
    }

    #[test]
    fn lookup_by_name() {
        let mut scene = Scene::new();
        let id = scene.spawn_node("figure", points(), Mat4::IDENTITY).unwrap();

        assert_eq!(scene.get_node_by_name("figure"), Some(id));
        assert_eq!(scene.get_node_by_name("missing"), None);
    }

    #[test]
    fn transform_then_inverse_restores_world() {
        let mut scene = Scene::new();
        let (root, _, b) = chain(&mut scene);
        let before = scene.world_matrix(b).unwrap();
        let delta = transforms::rotate(0.4, -0.2, 1.0) * transforms::translate(0.3, 0.0, -1.0);

        scene.transform(root, delta).unwrap();
        scene.transform(root, delta.inverse()).unwrap();

        assert!(scene.world_matrix(b).unwrap().abs_diff_eq(before, EPSILON));
    }

    #[test]
    fn translation_propagates_once_through_chain() {
        let mut scene = Scene::new();
        let (root, a, b) = chain(&mut scene);
        let before: Vec<Mat4> = [root, a, b]
            .iter()
            .map(|id| scene.world_matrix(*id).unwrap())
            .collect();
        let delta = transforms::translate(1.0, 0.0, 0.0);

        let visited = scene.transform(root, delta).unwrap();
        scene.late_update();

        assert_eq!(visited, 3);
        for (id, before) in [root, a, b].iter().zip(before) {
            let after = *scene.get_node(*id).unwrap().transform.get_world_matrix();
            assert!(after.abs_diff_eq(delta * before, EPSILON));
        }
    }

    #[test]
    fn transform_of_inner_node_acts_in_world_space() {
        let mut scene = Scene::new();
        let (root, a, b) = chain(&mut scene);
        let root_world = scene.world_matrix(root).unwrap();
        let a_before = scene.world_matrix(a).unwrap();
        let b_before = scene.world_matrix(b).unwrap();
        let delta = transforms::translate(0.0, 1.0, 0.0) * transforms::rotate(0.0, 0.5, 0.0);

        assert_eq!(scene.transform(a, delta).unwrap(), 2);

        assert_eq!(scene.world_matrix(root).unwrap(), root_world);
        assert!(scene.world_matrix(a).unwrap().abs_diff_eq(delta * a_before, EPSILON));
        assert!(scene.world_matrix(b).unwrap().abs_diff_eq(delta * b_before, EPSILON));
    }

    #[test]
    fn translation_under_rotated_parent_moves_along_world_axis() {
        let mut scene = Scene::new();
        let root = scene
            .spawn_node("root", points(), transforms::rotate_degrees(0.0, 0.0, 90.0))
            .unwrap();
        let child = scene
            .spawn_node("child", points(), transforms::translate(0.0, 1.0, 0.0))
            .unwrap();
        scene.add_child(root, child).unwrap();

        scene.transform(child, transforms::translate(5.0, 0.0, 0.0)).unwrap();

        let origin = transforms::transform_point(&scene.world_matrix(child).unwrap(), Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), EPSILON));
    }

    #[test]
    fn frame_transform_of_inner_node_acts_in_world_space() {
        let mut scene = Scene::new();
        let (_, a, b) = chain(&mut scene);
        let a_before = scene.world_matrix(a).unwrap();
        let b_before = scene.world_matrix(b).unwrap();
        let view = transforms::rotate_degrees(10.0, 20.0, 0.0);

        scene.early_update();
        scene.transform_for_frame(a, view).unwrap();

        assert!(scene.world_matrix(a).unwrap().abs_diff_eq(view * a_before, EPSILON));
        assert!(scene.world_matrix(b).unwrap().abs_diff_eq(view * b_before, EPSILON));
    }

    #[test]
    fn add_child_keeps_world_placement() {
        let mut scene = Scene::new();
        let parent = scene
            .spawn_node("parent", points(), transforms::translate(0.0, -0.4, 0.4))
            .unwrap();
        let child = scene
            .spawn_node("child", points(), transforms::translate(0.0, -0.8, 0.8))
            .unwrap();

        scene.add_child(parent, child).unwrap();

        let origin = transforms::transform_point(&scene.world_matrix(child).unwrap(), Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, -0.8, 0.8), EPSILON));
        assert!(scene
            .get_node(child)
            .unwrap()
            .transform
            .local_matrix()
            .abs_diff_eq(transforms::translate(0.0, -0.4, 0.4), EPSILON));

        // Moving the parent afterwards carries the child along.
        scene.transform(parent, transforms::translate(1.0, 0.0, 0.0)).unwrap();
        let moved = transforms::transform_point(&scene.world_matrix(child).unwrap(), Vec3::ZERO);
        assert!(moved.abs_diff_eq(Vec3::new(1.0, -0.8, 0.8), EPSILON));
    }

    #[test]
    fn add_child_rejects_cycles() {
        let mut scene = Scene::new();
        let (root, a, b) = chain(&mut scene);

        assert_eq!(
            scene.add_child(b, root),
            Err(SceneError::Cycle {
                parent: "b".into(),
                child: "root".into()
            })
        );
        assert!(matches!(scene.add_child(a, a), Err(SceneError::Cycle { .. })));
        assert_eq!(scene.get_node(root).unwrap().parent_id, None);
    }

    #[test]
    fn add_child_moves_node_between_parents() {
        let mut scene = Scene::new();
        let (root, a, b) = chain(&mut scene);

        scene.add_child(root, b).unwrap();

        assert!(scene.get_node(a).unwrap().child_ids.is_empty());
        assert_eq!(scene.get_node(root).unwrap().child_ids, vec![a, b]);
        assert_eq!(scene.get_node(b).unwrap().parent_id, Some(root));
    }

    #[test]
    fn frame_transform_is_cleared_next_frame() {
        let mut scene = Scene::new();
        let (_, a, b) = chain(&mut scene);
        let before = scene.world_matrix(b).unwrap();
        let view = transforms::rotate_degrees(10.0, 20.0, 0.0);

        scene.early_update();
        scene.transform_for_frame(a, view).unwrap();
        scene.late_update();
        let during = *scene.get_node(b).unwrap().transform.get_world_matrix();
        assert!(!during.abs_diff_eq(before, EPSILON));

        scene.early_update();
        scene.late_update();
        let after = *scene.get_node(b).unwrap().transform.get_world_matrix();
        assert!(after.abs_diff_eq(before, EPSILON));
    }

    #[test]
    fn draw_does_not_recurse() {
        let mut scene = Scene::new();
        let (root, _, b) = chain(&mut scene);
        upload_all(&mut scene);

        scene.draw(root, SplatShader::Flat, 5.0).unwrap();
        assert_eq!(scene.draw_list().len(), 1);

        scene.draw(b, SplatShader::Phong, 3.0).unwrap();
        let requests = scene.draw_list().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].shader, SplatShader::Phong);
        assert_eq!(requests[1].transform, scene.world_matrix(b).unwrap());

        scene.early_update();
        assert!(scene.draw_list().is_empty());
    }

    #[test]
    fn draw_uses_fresh_world_matrix() {
        let mut scene = Scene::new();
        let (root, _, b) = chain(&mut scene);
        upload_all(&mut scene);
        scene.late_update();
        let before = scene.world_matrix(b).unwrap();

        scene.transform(root, transforms::translate(0.0, 0.0, 2.0)).unwrap();
        scene.draw(b, SplatShader::Flat, 3.0).unwrap();

        let drawn = scene.draw_list().requests()[0].transform;
        assert!(drawn.abs_diff_eq(transforms::translate(0.0, 0.0, 2.0) * before, EPSILON));
    }
}
