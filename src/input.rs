use std::collections::HashSet;

use glam::Vec2;
use winit::{event::ElementState, event::MouseButton, keyboard::KeyCode};

/// Keyboard and mouse state accumulated from window events, polled once per
/// frame.
#[derive(Debug, Default)]
pub struct InputState {
    held_keys: HashSet<KeyCode>,
    held_buttons: HashSet<MouseButton>,
    cursor: Option<Vec2>,
}

impl InputState {
    pub fn on_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => self.held_keys.insert(key),
            ElementState::Released => self.held_keys.remove(&key),
        };
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => self.held_buttons.insert(button),
            ElementState::Released => self.held_buttons.remove(&button),
        };
    }

    /// Records the new cursor position and returns how far it moved. The
    /// first event after the cursor enters the window moves nothing.
    pub fn on_cursor_moved(&mut self, position: Vec2) -> Vec2 {
        let delta = self
            .cursor
            .map(|last| position - last)
            .unwrap_or(Vec2::ZERO);
        self.cursor = Some(position);
        delta
    }

    pub fn on_cursor_left(&mut self) {
        self.cursor = None;
    }

    /// Drops held keys and buttons, e.g. when the window loses focus and
    /// release events would be missed.
    pub fn release_all(&mut self) {
        self.held_keys.clear();
        self.held_buttons.clear();
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.held_keys.contains(&key)
    }

    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.held_buttons.contains(&button)
    }

    /// `+1` while `positive` is held, `-1` while `negative` is held.
    pub fn axis(&self, positive: KeyCode, negative: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.is_key_held(positive) {
            value += 1.0;
        }
        if self.is_key_held(negative) {
            value -= 1.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_held_keys() {
        let mut input = InputState::default();

        input.on_key(KeyCode::ArrowUp, ElementState::Pressed);
        assert!(input.is_key_held(KeyCode::ArrowUp));
        assert_eq!(input.axis(KeyCode::ArrowUp, KeyCode::ArrowDown), 1.0);

        input.on_key(KeyCode::ArrowDown, ElementState::Pressed);
        assert_eq!(input.axis(KeyCode::ArrowUp, KeyCode::ArrowDown), 0.0);

        input.on_key(KeyCode::ArrowUp, ElementState::Released);
        assert_eq!(input.axis(KeyCode::ArrowUp, KeyCode::ArrowDown), -1.0);
    }

    #[test]
    fn cursor_delta_starts_at_zero() {
        let mut input = InputState::default();

        assert_eq!(input.on_cursor_moved(Vec2::new(10.0, 10.0)), Vec2::ZERO);
        assert_eq!(input.on_cursor_moved(Vec2::new(13.0, 6.0)), Vec2::new(3.0, -4.0));

        input.on_cursor_left();
        assert_eq!(input.on_cursor_moved(Vec2::new(50.0, 50.0)), Vec2::ZERO);
    }

    #[test]
    fn release_all_clears_buttons() {
        let mut input = InputState::default();
        input.on_mouse_button(MouseButton::Middle, ElementState::Pressed);
        input.on_key(KeyCode::ArrowLeft, ElementState::Pressed);

        input.release_all();

        assert!(!input.is_button_held(MouseButton::Middle));
        assert!(!input.is_key_held(KeyCode::ArrowLeft));
    }
}
