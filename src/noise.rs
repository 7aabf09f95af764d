//! Coherent 2D gradient noise.
//!
//! Every function here has a line-for-line twin in `compositor.wgsl`; keep the
//! constants in sync so that the software and GPU paths agree.

use crate::util::{fract, mix};
use lyon::math::{point, vector, Point, Vector};

/// Direction in which the noise field drifts over time. Shape boundaries are
/// advected along this vector instead of pulsing radially.
pub const FLOW_DIRECTION: Vector = Vector::new(0.6, -0.8);

/// Pseudo-random gradient in `[-1, 1]²` for an integer lattice point.
#[inline]
pub fn hash2(p: Point) -> Vector {
    let qx = p.x * 127.1 + p.y * 311.7;
    let qy = p.x * 269.5 + p.y * 183.3;
    vector(
        -1.0 + 2.0 * fract(qx.sin() * 43_758.547),
        -1.0 + 2.0 * fract(qy.sin() * 43_758.547),
    )
}

/// Gradient (Perlin-style) noise, roughly in `[-0.7, 0.7]`, zero on lattice points.
pub fn gradient_noise(p: Point) -> f32 {
    let i = point(p.x.floor(), p.y.floor());
    let f = vector(p.x - i.x, p.y - i.y);
    let u = vector(f.x * f.x * (3.0 - 2.0 * f.x), f.y * f.y * (3.0 - 2.0 * f.y));

    let corner = |ox: f32, oy: f32| -> f32 {
        let gradient = hash2(point(i.x + ox, i.y + oy));
        gradient.dot(vector(f.x - ox, f.y - oy))
    };

    mix(
        mix(corner(0.0, 0.0), corner(1.0, 0.0), u.x),
        mix(corner(0.0, 1.0), corner(1.0, 1.0), u.x),
        u.y,
    )
}

/// Gradient noise sampled in a frame that slides along [`FLOW_DIRECTION`].
#[inline]
pub fn flow_noise(p: Point, frequency: f32, time: f32) -> f32 {
    gradient_noise(point(p.x * frequency, p.y * frequency) + FLOW_DIRECTION * time)
}

/// Two decorrelated noise channels, used to jitter lobe and droplet centres.
pub fn noise_offset(seed: f32, time: f32) -> Vector {
    vector(
        gradient_noise(point(seed * 3.7, time)),
        gradient_noise(point(time + 11.3, seed * 5.1)),
    )
}
