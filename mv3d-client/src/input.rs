use std::collections::HashSet;

use glam::Vec2;
use mv3d_core::camera::{Camera, CameraMovement};
use sdl2::keyboard::Keycode;

/// The current state of the keyboard.
#[derive(Default)]
pub struct KeyboardState {
    pub down: HashSet<Keycode>,
}

/// The current state of the mouse.
#[derive(Default)]
pub struct MouseState {
    /// Relative motion accumulated this frame.
    pub delta: Vec2,
    /// Whether the cursor is captured for looking around.
    pub grabbed: bool,
}

/// Key bindings of the fly camera.
const MOVEMENT_KEYS: [(Keycode, CameraMovement); 6] = [
    (Keycode::W, CameraMovement::Forward),
    (Keycode::S, CameraMovement::Backward),
    (Keycode::A, CameraMovement::Left),
    (Keycode::D, CameraMovement::Right),
    (Keycode::Space, CameraMovement::Up),
    (Keycode::LShift, CameraMovement::Down),
];

/// Applies one frame of keyboard and mouse input to the camera.
pub fn update_camera(
    camera: &mut Camera,
    keyboard: &KeyboardState,
    mouse: &MouseState,
    delta_time: f32,
) {
    if mouse.grabbed {
        // SDL's y axis points down
        camera.rotate(mouse.delta.x, -mouse.delta.y);
    }
    for (key, movement) in MOVEMENT_KEYS {
        if keyboard.down.contains(&key) {
            camera.translate(movement, delta_time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_only_rotates_when_grabbed() {
        let mut camera = Camera::default();
        let keyboard = KeyboardState::default();
        let mut mouse = MouseState {
            delta: Vec2::new(100.0, -50.0),
            grabbed: false,
        };
        update_camera(&mut camera, &keyboard, &mouse, 0.016);
        assert_eq!(camera.yaw, -90.0);

        mouse.grabbed = true;
        update_camera(&mut camera, &keyboard, &mouse, 0.016);
        assert!((camera.yaw - -80.0).abs() < 1e-4);
        assert!((camera.pitch - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_held_keys_move_the_camera() {
        let mut camera = Camera {
            position: glam::Vec3::ZERO,
            move_speed: 1.0,
            ..Default::default()
        };
        let mut keyboard = KeyboardState::default();
        keyboard.down.insert(Keycode::W);
        keyboard.down.insert(Keycode::Space);
        update_camera(&mut camera, &keyboard, &MouseState::default(), 1.0);
        assert!((camera.position - glam::Vec3::new(0.0, 1.0, -1.0)).length() < 1e-5);
    }
}
