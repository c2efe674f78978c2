use glam::Vec3;

use crate::{OrbitControls, PerspectiveCamera};

/// Quadratic ease-out: fast start, slow end. `t` is clamped to 0..1.
pub fn ease_out_quad(t: f32) -> f32 {
    let omt = 1.0 - t.clamp(0.0, 1.0);
    1.0 - omt * omt
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenStatus {
    Running,
    Completed,
}

/// Moves the camera from `from` to `to` while keeping it aimed at `focus`.
#[derive(Debug, Clone)]
pub struct CameraTween {
    from: Vec3,
    to: Vec3,
    focus: Vec3,
    duration: f32,
    elapsed: f32,
}

impl CameraTween {
    pub fn new(from: Vec3, to: Vec3, focus: Vec3, duration: f32) -> Self {
        Self {
            from,
            to,
            focus,
            duration,
            elapsed: 0.0,
        }
    }

    pub fn destination(&self) -> Vec3 {
        self.to
    }

    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    /// Advances by `dt` seconds, places the camera and aims it at the focus.
    pub fn update(&mut self, dt: f32, camera: &mut PerspectiveCamera) -> TweenStatus {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration.max(0.0));
        let t = self.progress();
        camera.position = self.from.lerp(self.to, ease_out_quad(t));
        camera.look_at(self.focus);
        if t >= 1.0 {
            TweenStatus::Completed
        } else {
            TweenStatus::Running
        }
    }

    /// Like `update`, but on the final step also re-centres the orbit
    /// controls on the focus point.
    pub fn tick(
        &mut self,
        dt: f32,
        camera: &mut PerspectiveCamera,
        controls: &mut OrbitControls,
    ) -> TweenStatus {
        let status = self.update(dt, camera);
        if status == TweenStatus::Completed {
            controls.target = self.focus;
            controls.update(camera);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_out_endpoints() {
        assert_eq!(ease_out_quad(0.0), 0.0);
        assert_eq!(ease_out_quad(1.0), 1.0);
        assert_eq!(ease_out_quad(0.5), 0.75);
        assert_eq!(ease_out_quad(2.0), 1.0);
    }

    #[test]
    fn tween_reaches_destination_and_retargets() {
        let mut cam = PerspectiveCamera::new(50.0, 1.0, 0.1, 2000.0);
        cam.position = Vec3::new(15.0, 5.0, 8.0);
        let mut controls = OrbitControls::new(Vec3::new(-2.0, 7.0, -1.5));
        let focus = Vec3::new(1.0, 2.0, 3.0);
        let to = focus + Vec3::new(-6.0, 2.0, -2.0);
        let mut tween = CameraTween::new(cam.position, to, focus, 1.0);

        let mut status = TweenStatus::Running;
        let mut frames = 0;
        while status == TweenStatus::Running {
            status = tween.tick(1.0 / 60.0, &mut cam, &mut controls);
            let aim = (focus - cam.position).normalize();
            assert!((cam.forward() - aim).length() < 1e-4);
            frames += 1;
            assert!(frames < 200);
        }
        assert!((cam.position - to).length() < 1e-4);
        assert_eq!(controls.target, focus);
    }

    #[test]
    fn eased_motion_front_loads_distance() {
        let mut cam = PerspectiveCamera::new(50.0, 1.0, 0.1, 2000.0);
        let mut tween = CameraTween::new(Vec3::ZERO, Vec3::X * 10.0, Vec3::Y * 5.0, 1.0);
        tween.update(0.5, &mut cam);
        assert!((cam.position.x - 7.5).abs() < 1e-5);
        assert_eq!(tween.update(0.5, &mut cam), TweenStatus::Completed);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut cam = PerspectiveCamera::new(50.0, 1.0, 0.1, 2000.0);
        let mut tween = CameraTween::new(Vec3::ZERO, Vec3::ONE, Vec3::Z * -4.0, 0.0);
        assert_eq!(tween.update(0.0, &mut cam), TweenStatus::Completed);
        assert_eq!(cam.position, Vec3::ONE);
    }
}
