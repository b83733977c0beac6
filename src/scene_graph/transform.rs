use glam::Mat4;
use std::cell::{Cell, Ref, RefCell};

/// Transform state of a single scene node.
///
/// `local` is the authored transform relative to the parent and persists
/// between frames. `frame_offset` only lives for the current frame and is
/// cleared by [`Transform::reset_frame_offset`]. The world matrix is derived:
/// `world = parent_world * frame_offset * local`.
#[derive(Debug, Clone)]
pub struct Transform {
    local: Mat4,
    frame_offset: Mat4,

    world_matrix: RefCell<Mat4>,
    world_dirty: Cell<bool>,
    has_changed_since_last_update: Cell<bool>,
}

impl Transform {
    pub fn from_matrix(local: Mat4) -> Self {
        Self {
            local,
            frame_offset: Mat4::IDENTITY,
            world_matrix: RefCell::new(Mat4::IDENTITY),
            world_dirty: Cell::new(true),
            has_changed_since_last_update: Cell::new(true),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.local
    }

    pub fn frame_offset(&self) -> Mat4 {
        self.frame_offset
    }

    pub fn set_local(&mut self, local: Mat4) {
        self.local = local;
        self.invalidate_world();
    }

    /// The matrix this node contributes to its own and its descendants'
    /// world transforms this frame.
    pub fn effective_local_matrix(&self) -> Mat4 {
        self.frame_offset * self.local
    }

    pub fn get_world_matrix(&self) -> Ref<Mat4> {
        self.world_matrix.borrow()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.replace(world_matrix);
        self.world_dirty.set(false);
        self.has_changed_since_last_update.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    /// Composes `delta` on top of the authored transform: `local = delta * local`.
    pub fn apply(&mut self, delta: Mat4) {
        self.local = delta * self.local;
        self.invalidate_world();
    }

    /// Composes `delta` into this frame's offset only.
    pub fn apply_frame_offset(&mut self, delta: Mat4) {
        self.frame_offset = delta * self.frame_offset;
        self.invalidate_world();
    }

    /// Clears the frame offset. Returns true when there was one, in which
    /// case the caller must invalidate the node's descendants too.
    pub fn reset_frame_offset(&mut self) -> bool {
        if self.frame_offset == Mat4::IDENTITY {
            return false;
        }

        self.frame_offset = Mat4::IDENTITY;
        self.invalidate_world();
        true
    }

    pub fn reset_flags(&self) {
        self.has_changed_since_last_update.set(false);
    }

    pub fn has_changed(&self) -> bool {
        self.has_changed_since_last_update.get()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_matrix(Mat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::transforms;
    use glam::Vec3;

    #[test]
    fn apply_premultiplies_delta() {
        let mut transform = Transform::from_matrix(transforms::translate(1.0, 0.0, 0.0));
        transform.apply(transforms::scale(2.0, 2.0, 2.0));

        // Scaling after translating also scales the translation.
        assert_eq!(
            transform.local_matrix().w_axis.truncate(),
            Vec3::new(2.0, 0.0, 0.0)
        );
    }

    #[test]
    fn apply_then_inverse_restores_local() {
        let start = transforms::rotate(0.2, 0.4, 0.6) * transforms::translate(1.0, 2.0, 3.0);
        let delta = transforms::translate(0.0, -0.4, 0.4) * transforms::rotate_degrees(90.0, 0.0, 0.0);

        let mut transform = Transform::from_matrix(start);
        transform.apply(delta);
        transform.apply(delta.inverse());

        assert!(transform.local_matrix().abs_diff_eq(start, 1e-4));
    }

    #[test]
    fn frame_offset_is_transient() {
        let mut transform = Transform::default();
        transform.apply_frame_offset(transforms::rotate(0.5, 0.0, 0.0));

        assert_ne!(transform.effective_local_matrix(), Mat4::IDENTITY);
        assert_eq!(transform.local_matrix(), Mat4::IDENTITY);

        assert!(transform.reset_frame_offset());
        assert!(transform.is_world_dirty());
        assert_eq!(transform.effective_local_matrix(), Mat4::IDENTITY);
        assert!(!transform.reset_frame_offset());
    }

    #[test]
    fn set_world_matrix_clears_dirty_flag() {
        let transform = Transform::default();
        assert!(transform.is_world_dirty());

        transform.set_world_matrix(transforms::translate(0.0, 1.0, 0.0));

        assert!(!transform.is_world_dirty());
        assert_eq!(transform.get_world_matrix().w_axis.truncate(), Vec3::Y);
    }
}
