use crate::{demo::DemoState, input::InputState, ui::draw_scene_window};

/// Runs one frame of scene logic: drops last frame's offsets and draws,
/// lets the demo move and draw its nodes, then settles world transforms.
pub fn update(state: &mut DemoState, input: &InputState, ui: &imgui::Ui) -> anyhow::Result<()> {
    state.scene.early_update();
    state.update(input)?;
    draw_scene_window(ui, state);
    state.scene.late_update();

    Ok(())
}
