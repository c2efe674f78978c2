use glam::{Mat4, Vec3};

const DET_EPSILON: f32 = 1e-12;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.grow(p);
        }
        aabb
    }

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }
}

/// A half-line used for picking. `direction` is not required to be unit
/// length; distances returned by the intersection helpers are in units of
/// `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Maps the ray through an affine transform. The parameter along the ray
    /// is preserved, so a hit distance in the transformed space is also a hit
    /// distance in the original space.
    pub fn transformed(&self, m: &Mat4) -> Ray {
        Ray {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
        }
    }

    /// Slab test. Returns the entry parameter, or 0 when the origin is inside.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        if aabb.is_empty() {
            return None;
        }
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Möller-Trumbore. Counter-clockwise triangles face the viewer; with
    /// `cull_back` set, hits on the back side are rejected.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3, cull_back: bool) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);
        if cull_back {
            if det <= DET_EPSILON {
                return None;
            }
        } else if det.abs() <= DET_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = self.origin - a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = tvec.cross(edge1);
        let v = self.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(qvec) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Splits a `0xRRGGBB` value into normalized sRGB channels.
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    hex_to_rgb(hex).map(srgb_to_linear)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> (Vec3, Vec3, Vec3) {
        // CCW when seen from +Z
        (
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn ray_hits_front_face() {
        let (a, b, c) = tri();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let t = ray.intersect_triangle(a, b, c, true).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        assert!(ray.at(t).length() < 1e-5);
    }

    #[test]
    fn back_face_is_culled_only_when_asked() {
        let (a, b, c) = tri();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(ray.intersect_triangle(a, b, c, true).is_none());
        assert!(ray.intersect_triangle(a, b, c, false).is_some());
    }

    #[test]
    fn ray_misses_outside_triangle_and_behind_origin() {
        let (a, b, c) = tri();
        let aside = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(aside.intersect_triangle(a, b, c, false).is_none());
        let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(away.intersect_triangle(a, b, c, false).is_none());
    }

    #[test]
    fn transformed_ray_keeps_parameter() {
        let m = Mat4::from_scale(Vec3::splat(0.5));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let local = ray.transformed(&m.inverse());
        let (a, b, c) = tri();
        let t = local.intersect_triangle(a, b, c, true).unwrap();
        assert!((t - 10.0).abs() < 1e-4);
    }

    #[test]
    fn aabb_slab_test() {
        let aabb = Aabb::from_points([Vec3::splat(-1.0), Vec3::splat(1.0)]);
        let hit = Ray::new(Vec3::new(0.0, 0.0, -4.0), Vec3::Z);
        assert_eq!(hit.intersect_aabb(&aabb), Some(3.0));
        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(inside.intersect_aabb(&aabb), Some(0.0));
        let miss = Ray::new(Vec3::new(0.0, 3.0, -4.0), Vec3::Z);
        assert!(miss.intersect_aabb(&aabb).is_none());
        assert!(hit.intersect_aabb(&Aabb::EMPTY).is_none());
    }

    #[test]
    fn hex_colors() {
        assert_eq!(hex_to_rgb(0x00ff00), [0.0, 1.0, 0.0]);
        let grey = hex_to_linear(0xaaaaaa);
        assert!((grey[0] - 0.402).abs() < 1e-3);
    }
}
