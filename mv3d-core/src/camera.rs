//! A free-flying perspective camera.

use glam::{Mat4, Vec3};

use crate::model::Aabb;

/// Directions the camera can be moved in, relative to where it looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Degrees. `-90` looks down the negative Z axis.
    pub yaw: f32,
    /// Degrees, clamped to ±89.
    pub pitch: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per pixel of mouse motion.
    pub mouse_sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: -90.0,
            pitch: 0.0,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            move_speed: 2.5,
            mouse_sensitivity: 0.1,
        }
    }
}

impl Camera {
    pub fn front(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.front().cross(Vec3::Y).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front(), Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov_y_degrees.to_radians(),
            aspect_ratio,
            self.near,
            self.far,
        )
    }

    /// Turns the camera by a mouse delta in pixels. Positive `dy` looks up.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-89.0, 89.0);
    }

    pub fn translate(&mut self, movement: CameraMovement, delta_time: f32) {
        let step = self.move_speed * delta_time;
        let offset = match movement {
            CameraMovement::Forward => self.front(),
            CameraMovement::Backward => -self.front(),
            CameraMovement::Right => self.right(),
            CameraMovement::Left => -self.right(),
            CameraMovement::Up => Vec3::Y,
            CameraMovement::Down => Vec3::NEG_Y,
        };
        self.position += offset * step;
    }

    /// Moves the camera in front of `bounds` (on the +Z side) so the whole box
    /// fits the vertical field of view, and scales speed and clip planes to
    /// the box size.
    pub fn frame(&mut self, bounds: &Aabb) {
        let radius = bounds.radius().max(f32::EPSILON);
        let half_fov = (self.fov_y_degrees.to_radians() * 0.5).max(0.01);
        let distance = radius / half_fov.sin();

        self.position = bounds.center() + Vec3::Z * distance;
        self.yaw = -90.0;
        self.pitch = 0.0;
        self.near = (distance - radius).max(radius * 0.01).max(0.01) * 0.5;
        self.far = (distance + radius) * 4.0;
        self.move_speed = radius;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::default();
        assert!((camera.front() - Vec3::NEG_Z).length() < 1e-5);
        assert!((camera.right() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.rotate(0.0, 10_000.0);
        assert_eq!(camera.pitch, 89.0);
        camera.rotate(0.0, -100_000.0);
        assert_eq!(camera.pitch, -89.0);
    }

    #[test]
    fn test_translate_moves_along_view() {
        let mut camera = Camera {
            position: Vec3::ZERO,
            move_speed: 2.0,
            ..Default::default()
        };
        camera.translate(CameraMovement::Forward, 0.5);
        assert!((camera.position - Vec3::NEG_Z).length() < 1e-5);
        camera.translate(CameraMovement::Right, 1.0);
        assert!((camera.position - Vec3::new(2.0, 0.0, -1.0)).length() < 1e-5);
        camera.translate(CameraMovement::Up, 1.0);
        assert!((camera.position.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_view_matrix_maps_target_in_front() {
        let camera = Camera::default();
        let target = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!((target - Vec3::new(0.0, 0.0, -3.0)).length() < 1e-5);
    }

    #[test]
    fn test_frame_fits_bounds() {
        let bounds = Aabb {
            min: Vec3::new(-1.0, 0.0, -1.0),
            max: Vec3::new(1.0, 16.0, 1.0),
        };
        let mut camera = Camera::default();
        camera.frame(&bounds);

        assert_eq!(camera.position.x, 0.0);
        assert_eq!(camera.position.y, 8.0);
        let distance = camera.position.z;
        assert!(distance > bounds.radius());
        assert!(camera.near < distance - bounds.radius());
        assert!(camera.far > distance + bounds.radius());

        // Every corner projects inside the clip volume.
        let clip = camera.projection_matrix(1.0) * camera.view_matrix();
        for corner in [bounds.min, bounds.max] {
            let p = clip.project_point3(corner);
            assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0 && p.z.abs() <= 1.0, "{p:?}");
        }
    }
}
