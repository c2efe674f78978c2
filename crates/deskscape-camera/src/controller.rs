use glam::Vec3;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::Key;

use crate::{OrbitControls, PerspectiveCamera};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
}

impl MoveKey {
    /// W/A/S/D on the logical key, either case.
    pub fn from_key(key: &Key) -> Option<Self> {
        let Key::Character(text) = key else {
            return None;
        };
        match text.to_lowercase().as_str() {
            "w" => Some(MoveKey::Forward),
            "s" => Some(MoveKey::Back),
            "a" => Some(MoveKey::Left),
            "d" => Some(MoveKey::Right),
            _ => None,
        }
    }
}

/// Free-fly movement. Speed is in world units per frame, not per second.
pub struct CameraController {
    move_forward: bool,
    move_back: bool,
    move_left: bool,
    move_right: bool,
    speed: f32,
}

impl CameraController {
    pub fn new(speed: f32) -> Self {
        Self {
            move_forward: false,
            move_back: false,
            move_left: false,
            move_right: false,
            speed,
        }
    }

    pub fn set_key(&mut self, key: MoveKey, pressed: bool) {
        match key {
            MoveKey::Forward => self.move_forward = pressed,
            MoveKey::Back => self.move_back = pressed,
            MoveKey::Left => self.move_left = pressed,
            MoveKey::Right => self.move_right = pressed,
        }
    }

    pub fn is_pressed(&self, key: MoveKey) -> bool {
        match key {
            MoveKey::Forward => self.move_forward,
            MoveKey::Back => self.move_back,
            MoveKey::Left => self.move_left,
            MoveKey::Right => self.move_right,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.move_forward || self.move_back || self.move_left || self.move_right
    }

    pub fn release_all(&mut self) {
        self.move_forward = false;
        self.move_back = false;
        self.move_left = false;
        self.move_right = false;
    }

    /// Returns true when the event was a movement key.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    logical_key, state, ..
                },
            ..
        } = event
        {
            if let Some(key) = MoveKey::from_key(logical_key) {
                self.set_key(key, *state == ElementState::Pressed);
                return true;
            }
        }
        false
    }

    /// Moves the camera for one frame and re-aims the orbit controls one unit
    /// ahead of the camera. The controls are re-aimed even when nothing moved.
    pub fn update(&mut self, cam: &mut PerspectiveCamera, controls: &mut OrbitControls) -> Vec3 {
        let direction = cam.forward();
        let right = direction.cross(cam.up).normalize_or_zero();
        let start = cam.position;

        if self.move_forward {
            cam.position += direction * self.speed;
        }
        if self.move_back {
            cam.position -= direction * self.speed;
        }
        if self.move_left {
            cam.position -= right * self.speed;
        }
        if self.move_right {
            cam.position += right * self.speed;
        }

        controls.target = cam.position + direction;
        controls.update(cam);

        cam.position - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::{NamedKey, SmolStr};

    fn rig() -> (PerspectiveCamera, OrbitControls) {
        let mut cam = PerspectiveCamera::new(50.0, 1.0, 0.1, 2000.0);
        cam.position = Vec3::new(15.0, 5.0, 8.0);
        cam.look_at(Vec3::new(0.0, 0.0, -1.5));
        (cam, OrbitControls::new(Vec3::new(-2.0, 7.0, -1.5)))
    }

    #[test]
    fn keys_are_case_insensitive() {
        for (text, key) in [
            ("w", MoveKey::Forward),
            ("W", MoveKey::Forward),
            ("s", MoveKey::Back),
            ("A", MoveKey::Left),
            ("d", MoveKey::Right),
        ] {
            assert_eq!(MoveKey::from_key(&Key::Character(SmolStr::new(text))), Some(key));
        }
        assert_eq!(MoveKey::from_key(&Key::Character(SmolStr::new("q"))), None);
        assert_eq!(MoveKey::from_key(&Key::Named(NamedKey::ArrowUp)), None);
    }

    #[test]
    fn forward_moves_by_speed_along_forward() {
        let (mut cam, mut controls) = rig();
        let mut ctl = CameraController::new(0.1);
        let forward = cam.forward();
        let start = cam.position;
        ctl.set_key(MoveKey::Forward, true);
        let moved = ctl.update(&mut cam, &mut controls);
        assert!((moved - forward * 0.1).length() < 1e-5);
        assert!((cam.position - (start + forward * 0.1)).length() < 1e-5);

        ctl.set_key(MoveKey::Forward, false);
        let after = cam.position;
        ctl.update(&mut cam, &mut controls);
        assert!((cam.position - after).length() < 1e-5);
    }

    #[test]
    fn strafe_uses_forward_cross_up() {
        let (mut cam, mut controls) = rig();
        let mut ctl = CameraController::new(0.1);
        let right = cam.forward().cross(Vec3::Y).normalize();
        ctl.set_key(MoveKey::Right, true);
        let moved = ctl.update(&mut cam, &mut controls);
        assert!((moved - right * 0.1).length() < 1e-5);
        ctl.set_key(MoveKey::Right, false);
        ctl.set_key(MoveKey::Left, true);
        let moved = ctl.update(&mut cam, &mut controls);
        assert!((moved + right * 0.1).length() < 1e-5);
    }

    #[test]
    fn opposite_keys_cancel() {
        let (mut cam, mut controls) = rig();
        let mut ctl = CameraController::new(0.1);
        ctl.set_key(MoveKey::Forward, true);
        ctl.set_key(MoveKey::Back, true);
        assert!(ctl.is_moving());
        let moved = ctl.update(&mut cam, &mut controls);
        assert!(moved.length() < 1e-5);
    }

    #[test]
    fn orbit_target_tracks_one_unit_ahead() {
        let (mut cam, mut controls) = rig();
        let mut ctl = CameraController::new(0.1);
        ctl.update(&mut cam, &mut controls);
        assert!((controls.target - (cam.position + cam.forward())).length() < 1e-5);
    }

    #[test]
    fn release_all_clears_flags() {
        let mut ctl = CameraController::new(0.1);
        ctl.set_key(MoveKey::Left, true);
        assert!(ctl.is_pressed(MoveKey::Left));
        ctl.release_all();
        assert!(!ctl.is_moving());
    }
}
