use deskscape_3d::Ray;
use glam::{Mat4, Vec2, Vec3};
use wgpu::{Buffer, Queue};

pub mod controller;
pub mod orbit;
pub mod tween;

pub use controller::{CameraController, MoveKey};
pub use orbit::OrbitControls;
pub use tween::{CameraTween, TweenStatus, ease_out_quad};

const AIM_EPSILON: f32 = 1e-5;

pub struct PerspectiveCamera {
    pub position: Vec3,
    forward: Vec3,
    pub up: Vec3,
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y_deg,
            aspect,
            near,
            far,
        }
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Aims the camera at `target`. A target at the camera position is
    /// ignored, as is one already within `AIM_EPSILON` of the current aim.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = target - self.position;
        if dir.length_squared() <= f32::EPSILON * f32::EPSILON {
            return;
        }
        let dir = dir.normalize();
        if !dir.abs_diff_eq(self.forward, AIM_EPSILON) {
            self.forward = dir;
        }
    }

    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = (width.max(1) as f32) / (height.max(1) as f32);
    }

    pub fn view_matrix(&self) -> Mat4 {
        let up = if self.forward.cross(self.up).length_squared() < 1e-10 {
            Vec3::Z
        } else {
            self.up
        };
        Mat4::look_to_rh(self.position, self.forward, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect.max(f32::EPSILON),
            self.near,
            self.far,
        )
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through a point given in normalized device
    /// coordinates (x right, y up, both in -1..1).
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv = self.view_proj().inverse();
        let through = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        Ray::new(self.position, (through - self.position).normalize_or_zero())
    }
}

/// Pixel position inside a `width` x `height` viewport to normalized device
/// coordinates.
pub fn ndc_from_pixels(x: f32, y: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        (x / width.max(1.0)) * 2.0 - 1.0,
        -(y / height.max(1.0)) * 2.0 + 1.0,
    )
}

pub fn update_camera_buffer(queue: &Queue, camera_buf: &Buffer, camera: &PerspectiveCamera) {
    let vp = camera.view_proj().to_cols_array_2d();
    queue.write_buffer(camera_buf, 0, bytemuck::cast_slice(&[vp]));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut cam = PerspectiveCamera::new(50.0, 16.0 / 9.0, 0.1, 2000.0);
        cam.position = Vec3::new(15.0, 5.0, 8.0);
        cam.look_at(Vec3::new(0.0, 0.0, -1.5));
        cam
    }

    #[test]
    fn look_at_sets_unit_forward() {
        let cam = camera();
        let expected = (Vec3::new(0.0, 0.0, -1.5) - cam.position).normalize();
        assert!((cam.forward() - expected).length() < 1e-6);
        assert!((cam.forward().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn look_at_self_keeps_direction() {
        let mut cam = camera();
        let before = cam.forward();
        cam.look_at(cam.position);
        assert_eq!(cam.forward(), before);
    }

    #[test]
    fn center_ray_follows_forward() {
        let cam = camera();
        let ray = cam.ray_from_ndc(Vec2::ZERO);
        assert_eq!(ray.origin, cam.position);
        assert!((ray.direction - cam.forward()).length() < 1e-4);
    }

    #[test]
    fn corner_rays_diverge_to_the_correct_side() {
        let cam = camera();
        let right = cam.ray_from_ndc(Vec2::new(1.0, 0.0));
        let up = cam.ray_from_ndc(Vec2::new(0.0, 1.0));
        assert!(right.direction.dot(cam.right()) > 0.0);
        assert!(up.direction.dot(Vec3::Y) > cam.forward().dot(Vec3::Y));
    }

    #[test]
    fn pixels_map_to_ndc() {
        assert_eq!(ndc_from_pixels(0.0, 0.0, 800.0, 600.0), Vec2::new(-1.0, 1.0));
        assert_eq!(ndc_from_pixels(400.0, 300.0, 800.0, 600.0), Vec2::ZERO);
        assert_eq!(ndc_from_pixels(800.0, 600.0, 800.0, 600.0), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn straight_down_view_is_finite() {
        let mut cam = camera();
        cam.look_at(cam.position - Vec3::Y);
        assert!(cam.view_matrix().is_finite());
    }
}
