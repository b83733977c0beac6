use glam::Vec3;
use imgui::{Condition, Ui};

use crate::{
    demo::DemoState,
    scene_graph::{NodeId, Scene},
};

const POINT_SCALE_RANGE: (f32, f32) = (0.1, 5.0);

pub fn draw_scene_window(ui: &Ui, state: &mut DemoState) {
    ui.window("Scene")
        .size([320.0, 260.0], Condition::FirstUseEver)
        .position([10.0, 10.0], Condition::FirstUseEver)
        .build(|| {
            ui.text(format!("{:.1} fps", ui.io().framerate));
            ui.text(format!(
                "rotation x {:.1}, y {:.1}",
                state.rotation.x, state.rotation.y
            ));
            ui.slider(
                "Point scale",
                POINT_SCALE_RANGE.0,
                POINT_SCALE_RANGE.1,
                &mut state.point_scale,
            );
            ui.text(format!(
                "{} nodes, {} draws queued",
                state.scene.node_count(),
                state.scene.draw_list().len()
            ));

            ui.separator();

            let roots: Vec<NodeId> = state.scene.root_ids().collect();
            for root_id in roots {
                draw_node_tree(ui, &state.scene, root_id);
            }
        });
}

fn draw_node_tree(ui: &Ui, scene: &Scene, node_id: NodeId) {
    let Some(node) = scene.get_node(node_id) else {
        return;
    };

    ui.tree_node_config(node_label(scene, node_id))
        .default_open(true)
        .build(|| {
            let translation = world_translation(scene, node_id);
            ui.text(format!(
                "world {:.2} {:.2} {:.2}",
                translation.x, translation.y, translation.z
            ));

            for &child_id in &node.child_ids {
                draw_node_tree(ui, scene, child_id);
            }
        });
}

/// Current world position of a node's origin, refreshed if an ancestor moved.
fn world_translation(scene: &Scene, node_id: NodeId) -> Vec3 {
    scene
        .world_matrix(node_id)
        .map(|world| world.w_axis.truncate())
        .unwrap_or_default()
}

/// Tree label of a node: name, point count and a `*` when it moved this frame.
fn node_label(scene: &Scene, node_id: NodeId) -> String {
    let Some(node) = scene.get_node(node_id) else {
        return String::new();
    };

    let points = scene
        .get_primitive(node.primitive_id)
        .map(|primitive| primitive.vertex_count())
        .unwrap_or(0);
    let marker = if node.transform.has_changed() { " *" } else { "" };

    format!("{} ({} points){}", node.name, points, marker)
}
