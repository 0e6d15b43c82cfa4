// camera.rs
use glam::{Mat4, Vec3};
use winit::event::*;
use winit::keyboard::{KeyCode, PhysicalKey};
use crate::config;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }

    fn position(self) -> Vec3 {
        match self {
            Eye::Left => Vec3::from_array(config::LEFT_EYE),
            Eye::Right => Vec3::from_array(config::RIGHT_EYE),
        }
    }
}

/// Projection, view and model for one eye, plus their product from the last update.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
    pub mvp: Mat4,
}

impl Camera {
    pub fn new(eye: Eye) -> Self {
        let projection = Mat4::perspective_rh(
            config::FOV_Y.to_radians(),
            config::ASPECT_RATIO,
            config::Z_NEAR,
            config::Z_FAR,
        );
        let view = Mat4::look_at_rh(eye.position(), Vec3::from_array(config::LOOK_TARGET), Vec3::Y);
        let model = Mat4::IDENTITY;
        Self { projection, view, model, mvp: projection * view * model }
    }

    // Post-multiplied, so the turn happens in world space around the cube
    fn rotate_y(&mut self, angle: f32) {
        self.view *= Mat4::from_rotation_y(angle);
    }

    fn refresh_mvp(&mut self) {
        self.mvp = self.projection * self.view * self.model;
    }
}

/// Both eyes. They always turn together, so they only ever differ by their starting eye position.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoCamera {
    cameras: [Camera; 2],
}

impl StereoCamera {
    pub fn new() -> Self {
        Self { cameras: Eye::BOTH.map(Camera::new) }
    }

    pub fn eye(&self, eye: Eye) -> &Camera {
        &self.cameras[eye.index()]
    }

    /// Applies this frame's rotation (if any) to both views and recomputes both MVPs.
    pub fn update(&mut self, rotation: Option<f32>) {
        for camera in &mut self.cameras {
            if let Some(angle) = rotation {
                camera.rotate_y(angle);
            }
            camera.refresh_mvp();
        }
    }
}

impl Default for StereoCamera {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CameraController {
    pub turn_left: bool,
    pub turn_right: bool,
}

impl CameraController {
    pub fn new() -> Self {
        Self { turn_left: false, turn_right: false }
    }

    pub fn process_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(key), state, .. }, ..
            } => {
                let pressed = *state == ElementState::Pressed;
                match key {
                    KeyCode::ArrowLeft => { self.turn_left = pressed; true }
                    KeyCode::ArrowRight => { self.turn_right = pressed; true }
                    _ => false,
                }
            }
            // Released keys are never reported to an unfocused window
            WindowEvent::Focused(false) => {
                self.turn_left = false;
                self.turn_right = false;
                false
            }
            _ => false,
        }
    }

    /// Left wins when both arrows are held.
    pub fn rotation(&self) -> Option<f32> {
        if self.turn_left {
            Some(-config::ROTATION_STEP)
        } else if self.turn_right {
            Some(config::ROTATION_STEP)
        } else {
            None
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TOLERANCE: f32 = 1e-4;

    fn controller(turn_left: bool, turn_right: bool) -> CameraController {
        CameraController { turn_left, turn_right }
    }

    #[rstest]
    #[case(false, false, None)]
    #[case(true, false, Some(-config::ROTATION_STEP))]
    #[case(false, true, Some(config::ROTATION_STEP))]
    #[case(true, true, Some(-config::ROTATION_STEP))]
    fn held_keys_map_to_rotation(#[case] left: bool, #[case] right: bool, #[case] expected: Option<f32>) {
        assert_eq!(controller(left, right).rotation(), expected);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(-config::ROTATION_STEP))]
    #[case(Some(config::ROTATION_STEP))]
    fn update_is_deterministic(#[case] rotation: Option<f32>) {
        let mut a = StereoCamera::new();
        let mut b = StereoCamera::new();
        for _ in 0..10 {
            a.update(rotation);
            b.update(rotation);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn left_then_right_restores_the_view() {
        let mut cameras = StereoCamera::new();
        let before = cameras.clone();

        cameras.update(controller(true, false).rotation());
        cameras.update(controller(false, true).rotation());

        for eye in Eye::BOTH {
            assert!(cameras.eye(eye).view.abs_diff_eq(before.eye(eye).view, TOLERANCE));
        }
    }

    #[test]
    fn mvp_is_recomputed_from_its_parts_after_every_update() {
        let mut cameras = StereoCamera::new();
        for rotation in [None, Some(0.3), Some(-0.1), None] {
            cameras.update(rotation);
            for eye in Eye::BOTH {
                let camera = cameras.eye(eye);
                assert_eq!(camera.mvp, camera.projection * camera.view * camera.model);
            }
        }
    }

    #[test]
    fn idle_update_keeps_the_initial_cameras() {
        let mut cameras = StereoCamera::new();
        cameras.update(None);

        let target = Vec3::from_array(config::LOOK_TARGET);
        for (eye, x) in [(Eye::Left, -4.0), (Eye::Right, 4.0)] {
            let camera = cameras.eye(eye);
            let initial_view = Mat4::look_at_rh(Vec3::new(x, 0.0, 10.0), target, Vec3::Y);
            assert_eq!(camera.model, Mat4::IDENTITY);
            assert_eq!(camera.view, initial_view);
            assert_eq!(camera.mvp, camera.projection * initial_view * Mat4::IDENTITY);
        }

        let left = cameras.eye(Eye::Left);
        let right = cameras.eye(Eye::Right);
        assert_eq!(left.projection, right.projection);
        assert!((left.view.inverse().w_axis.x + 4.0).abs() < TOLERANCE);
        assert!((right.view.inverse().w_axis.x - 4.0).abs() < TOLERANCE);
    }

    #[test]
    fn held_left_accumulates_rotation() {
        let mut cameras = StereoCamera::new();
        let initial = cameras.clone();
        let turning = controller(true, false);

        for _ in 0..100 {
            cameras.update(turning.rotation());
        }

        let expected_angle = 100.0 * -config::ROTATION_STEP;
        for eye in Eye::BOTH {
            let expected = initial.eye(eye).view * Mat4::from_rotation_y(expected_angle);
            assert!(cameras.eye(eye).view.abs_diff_eq(expected, TOLERANCE));

            let turned = initial.eye(eye).view.inverse() * cameras.eye(eye).view;
            let angle = (-turned.x_axis.z).atan2(turned.x_axis.x);
            assert!((angle - expected_angle).abs() < TOLERANCE);
        }
    }

    #[test]
    fn both_eyes_turn_by_the_same_amount() {
        let mut cameras = StereoCamera::new();
        let initial = cameras.clone();
        for _ in 0..25 {
            cameras.update(Some(config::ROTATION_STEP));
        }

        let left_turn = initial.eye(Eye::Left).view.inverse() * cameras.eye(Eye::Left).view;
        let right_turn = initial.eye(Eye::Right).view.inverse() * cameras.eye(Eye::Right).view;
        assert!(left_turn.abs_diff_eq(right_turn, TOLERANCE));
    }
}
