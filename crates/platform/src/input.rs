//! Keyboard input tracking.

use std::collections::HashSet;

use winit::keyboard::KeyCode;

/// Tracks the current state of keyboard input.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently pressed keys
    pressed_keys: HashSet<KeyCode>,
    /// Keys that were pressed this frame
    just_pressed_keys: HashSet<KeyCode>,
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the beginning of each frame to clear per-frame state.
    pub fn begin_frame(&mut self) {
        self.just_pressed_keys.clear();
    }

    /// Record a key press event.
    pub fn on_key_pressed(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed_keys.insert(key);
        }
    }

    /// Record a key release event.
    pub fn on_key_released(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    /// Whether the key is currently held down.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Whether the key went down this frame.
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::Escape);
        assert!(input.is_key_pressed(KeyCode::Escape));
        assert!(input.is_key_just_pressed(KeyCode::Escape));

        input.on_key_released(KeyCode::Escape);
        assert!(!input.is_key_pressed(KeyCode::Escape));
    }

    #[test]
    fn test_just_pressed_clears_on_begin_frame() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        input.begin_frame();
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));
    }

    #[test]
    fn test_held_key_does_not_repeat_just_pressed() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        input.begin_frame();
        // OS key-repeat delivers the same press again while held.
        input.on_key_pressed(KeyCode::KeyW);
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));
    }
}
