use lyon::math::Point;

#[inline(always)]
pub fn to_logical(physical_size: (u32, u32), scale_factor: f64) -> (f32, f32) {
    let (physical_width, physical_height) = physical_size;
    let logical_width = physical_width as f64 / scale_factor;
    let logical_height = physical_height as f64 / scale_factor;
    (logical_width as f32, logical_height as f32)
}

/// Hermite interpolation between two edges, matching WGSL `smoothstep`.
///
/// Edges may be given in descending order, in which case the curve is mirrored.
#[inline(always)]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline(always)]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline(always)]
pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// `x - floor(x)`, same as WGSL `fract`.
#[inline(always)]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// One exponential smoothing step of `current` toward `target`.
///
/// `k` is the fraction of the remaining distance covered this step and is
/// clamped to `[0, 1]`, so the result always lies between `current` and
/// `target`.
#[inline(always)]
pub fn smooth(current: Point, target: Point, k: f32) -> Point {
    current.lerp(target, clamp01(k))
}

#[inline(always)]
pub fn smooth_scalar(current: f32, target: f32, k: f32) -> f32 {
    mix(current, target, clamp01(k))
}

/// Cubic ease-in-out over `[0, 1]`.
#[inline(always)]
pub fn ease_in_out(t: f32) -> f32 {
    let t = clamp01(t);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}
