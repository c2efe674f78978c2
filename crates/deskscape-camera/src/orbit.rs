use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::PerspectiveCamera;

const POLE_EPSILON: f32 = 1e-6;
const SETTLE_EPSILON: f32 = 1e-6;

/// Orbits the camera around `target` on a sphere. Drag, pan and wheel input
/// is accumulated and applied on `update`, decaying over frames when damping
/// is on.
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// (theta, phi) still to be applied.
    spherical_delta: Vec2,
    /// World-space target shift still to be applied.
    pan_offset: Vec3,
    scale: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            enable_zoom: true,
            enable_rotate: true,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical_delta: Vec2::ZERO,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
        }
    }

    /// Pointer drag of `delta` pixels inside a viewport `height` pixels tall.
    pub fn rotate_by_pixels(&mut self, delta: Vec2, height: f32) {
        if !self.enable_rotate {
            return;
        }
        let h = height.max(1.0);
        self.spherical_delta.x -= TAU * delta.x / h * self.rotate_speed;
        self.spherical_delta.y -= TAU * delta.y / h * self.rotate_speed;
    }

    /// Pointer drag that slides the target and camera across the view plane.
    /// One viewport height of drag covers the visible height at the target.
    pub fn pan_by_pixels(&mut self, delta: Vec2, height: f32, camera: &PerspectiveCamera) {
        if !self.enable_pan {
            return;
        }
        let distance = camera.position.distance(self.target);
        let visible = distance * (camera.fov_y_deg.to_radians() * 0.5).tan();
        let per_pixel = 2.0 * visible / height.max(1.0) * self.pan_speed;
        let right = camera.right();
        let up = right.cross(camera.forward());
        self.pan_offset += -right * (delta.x * per_pixel) + up * (delta.y * per_pixel);
    }

    /// Wheel input in browser convention: positive moves away from the target.
    pub fn zoom_by_wheel(&mut self, delta_y: f32) {
        if !self.enable_zoom || delta_y == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed * (delta_y * 0.01).abs());
        if delta_y < 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    fn has_pending_input(&self) -> bool {
        self.spherical_delta.abs().max_element() > SETTLE_EPSILON
            || self.pan_offset.abs().max_element() > SETTLE_EPSILON
            || (self.scale - 1.0).abs() > SETTLE_EPSILON
    }

    /// Applies pending input and re-aims the camera at the target. Returns
    /// true when the camera position changed.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if !self.has_pending_input() {
            self.spherical_delta = Vec2::ZERO;
            self.pan_offset = Vec3::ZERO;
            self.scale = 1.0;
            camera.look_at(self.target);
            return false;
        }

        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= POLE_EPSILON {
            self.spherical_delta = Vec2::ZERO;
            self.pan_offset = Vec3::ZERO;
            self.scale = 1.0;
            return false;
        }

        let (step, pan) = if self.enable_damping {
            (
                self.spherical_delta * self.damping_factor,
                self.pan_offset * self.damping_factor,
            )
        } else {
            (self.spherical_delta, self.pan_offset)
        };
        let theta = offset.x.atan2(offset.z) + step.x;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + step.y)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let before = camera.position;
        self.target += pan;
        camera.position = self.target + new_offset;
        camera.look_at(self.target);

        if self.enable_damping {
            self.spherical_delta *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = Vec2::ZERO;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance_squared(before) > SETTLE_EPSILON * SETTLE_EPSILON
    }
}
