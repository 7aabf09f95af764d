//! Signed distance primitives and blending operators.
//!
//! Distances are negative inside a shape. All positions are expected in
//! aspect-corrected UV space so that circles stay round on wide surfaces.

use crate::util::{clamp01, mix, smoothstep};
use lyon::math::Point;

#[inline]
pub fn sdf_circle(p: Point, center: Point, radius: f32) -> f32 {
    p.distance_to(center) - radius
}

/// Distance to a capsule spanning `a..b`, with radius interpolated from
/// `radius_a` at `a` to `radius_b` at `b` (a tapered tail).
pub fn sdf_capsule(p: Point, a: Point, b: Point, radius_a: f32, radius_b: f32) -> f32 {
    let pa = p - a;
    let ba = b - a;
    let length_sq = ba.square_length();
    let h = if length_sq > 1e-10 {
        clamp01(pa.dot(ba) / length_sq)
    } else {
        0.0
    };
    (pa - ba * h).length() - mix(radius_a, radius_b, h)
}

/// Polynomial smooth minimum. Blends two distances within a band of width `k`
/// so that nearby shapes fuse into one contour. Never larger than `min(a, b)`.
#[inline]
pub fn smooth_min(a: f32, b: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return a.min(b);
    }
    let h = clamp01(0.5 + 0.5 * (b - a) / k);
    mix(b, a, h) - k * h * (1.0 - h)
}

/// Converts a signed distance into a coverage value with an antialiased edge
/// of half-width `softness`.
#[inline]
pub fn mask_from_distance(distance: f32, softness: f32) -> f32 {
    1.0 - smoothstep(-softness, softness, distance)
}
