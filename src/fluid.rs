//! Fluid reveal engine.
//!
//! Turns the lead point, its velocity and the trail history into a scalar
//! reveal mask. Every shape is a signed distance in aspect-corrected space,
//! blended with [`smooth_min`] and roughened by flow noise that drifts in a
//! constant direction. Contributions are combined with `max`, never summed.

use lyon::math::{point, vector, Point, Vector};
use std::f32::consts::TAU;

use crate::noise::{flow_noise, noise_offset};
use crate::params::{is_active_position, ShaderParams};
use crate::sdf::{mask_from_distance, sdf_capsule, sdf_circle, smooth_min};
use crate::util::smoothstep;

/// Half-width of the antialiased mask edge.
pub const EDGE_SOFTNESS: f32 = 0.012;
/// Blend radius of the smooth minimum.
pub const SMOOTH_K: f32 = 0.06;
pub const REVEAL_RADIUS: f32 = 0.12;

pub const LOBE_COUNT: usize = 3;
const LOBE_OFFSETS: [f32; LOBE_COUNT] = [0.55, 0.35, 0.7];
const LOBE_RADII: [f32; LOBE_COUNT] = [0.62, 0.5, 0.42];

pub const BOUNDARY_NOISE_FREQUENCY: f32 = 6.0;
pub const BOUNDARY_NOISE_AMPLITUDE: f32 = 0.018;

/// Below this speed the trailing capsule has zero length.
pub const TRAIL_SPEED_MIN: f32 = 0.02;
/// Speed at which the trailing capsule reaches full strength.
pub const TRAIL_SPEED_FULL: f32 = 0.10;
pub const TRAIL_MAX_LENGTH: f32 = 0.35;

pub const SPLASH_DROPLETS: usize = 4;
/// Hard gate: no droplets below this speed.
pub const SPLASH_SPEED_MIN: f32 = 0.05;
const SPLASH_ANGLES: [f32; SPLASH_DROPLETS] = [-0.9, -0.3, 0.3, 0.9];

const TRAIL_BLOB_SCALE: [f32; 4] = [0.85, 0.7, 0.55, 0.4];

pub const AMBIENT_BLOB_COUNT: usize = 3;
pub const AMBIENT_OPACITY_CAP: f32 = 0.35;
pub const AMBIENT_RADIUS: f32 = 0.07;
const AMBIENT_JITTER: f32 = 0.04;
/// Lissajous frequencies (x, y) and phase per ambient blob.
const AMBIENT_PATHS: [(f32, f32, f32); AMBIENT_BLOB_COUNT] =
    [(0.13, 0.17, 0.0), (0.11, 0.07, 2.1), (0.09, 0.14, 4.2)];

pub const BAND_GREY_WIDTH: f32 = 0.022;
pub const BAND_GOLD_WIDTH: f32 = 0.018;
/// How much speed stretches the bands along the direction of travel.
pub const BAND_STRETCH: f32 = 1.5;

/// Distance reported when there is no lead cluster.
const FAR: f32 = 1.0e3;

/// A slow blob that keeps the surface alive without any input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientBlob {
    /// Centre in UV space.
    pub center: Point,
    pub opacity: f32,
    pub radius: f32,
}

impl Default for AmbientBlob {
    fn default() -> Self {
        Self {
            center: point(0.5, 0.5),
            opacity: 0.0,
            radius: AMBIENT_RADIUS,
        }
    }
}

/// Ambient blob positions at `time` (noise time, in seconds).
pub fn ambient_blobs(time: f32) -> [AmbientBlob; AMBIENT_BLOB_COUNT] {
    let mut blobs = [AmbientBlob::default(); AMBIENT_BLOB_COUNT];
    for (i, (blob, (fx, fy, phase))) in blobs.iter_mut().zip(AMBIENT_PATHS).enumerate() {
        let jitter = noise_offset(i as f32 + 7.0, time * 0.2) * AMBIENT_JITTER;
        blob.center = point(
            0.5 + 0.34 * (time * fx * TAU + phase).sin(),
            0.5 + 0.3 * (time * fy * TAU + phase * 1.3).sin(),
        ) + jitter;
        blob.opacity = AMBIENT_OPACITY_CAP * (0.55 + 0.45 * (time * 0.3 + phase).sin());
        blob.radius = AMBIENT_RADIUS * (0.8 + 0.2 * (time * 0.5 + phase).sin());
    }
    blobs
}

/// Maps UV into the space where distances are isotropic on screen.
#[inline]
pub fn fluid_space(uv: Point, aspect: f32) -> Point {
    point(uv.x * aspect, uv.y)
}

/// A UV-space direction expressed as a unit vector in fluid space.
pub fn fluid_direction(direction: Vector, aspect: f32) -> Vector {
    let scaled = vector(direction.x * aspect, direction.y);
    let length = scaled.length();
    if length > 1e-6 {
        scaled / length
    } else {
        vector(0.0, 0.0)
    }
}

/// Moves a boundary with noise that flows in a fixed direction.
#[inline]
pub fn perturb(distance: f32, p: Point, time: f32) -> f32 {
    distance + flow_noise(p, BOUNDARY_NOISE_FREQUENCY, time) * BOUNDARY_NOISE_AMPLITUDE
}

/// Main circle plus noise-jittered lobes biased along the direction of travel.
pub fn water_lobes_distance(
    p: Point,
    lead: Point,
    direction: Vector,
    speed: f32,
    radius: f32,
    time: f32,
) -> f32 {
    let mut distance = sdf_circle(p, lead, radius);
    for i in 0..LOBE_COUNT {
        let seed = (i + 1) as f32 * 1.7;
        let jitter = noise_offset(seed, time * 0.6) * (radius * 0.5);
        let bias = direction * (radius * LOBE_OFFSETS[i] * (0.4 + speed));
        let center = lead + jitter + bias;
        distance = smooth_min(
            distance,
            sdf_circle(p, center, radius * LOBE_RADII[i]),
            SMOOTH_K,
        );
    }
    distance
}

/// Fade-in of the trailing capsule. Zero below [`TRAIL_SPEED_MIN`].
#[inline]
pub fn trail_strength(speed: f32) -> f32 {
    smoothstep(TRAIL_SPEED_MIN, TRAIL_SPEED_FULL, speed)
}

/// Length of the trailing capsule. Zero below [`TRAIL_SPEED_MIN`], continuous above.
#[inline]
pub fn trail_length(speed: f32) -> f32 {
    TRAIL_MAX_LENGTH * speed * trail_strength(speed)
}

pub fn trail_capsule_mask(
    p: Point,
    lead: Point,
    direction: Vector,
    speed: f32,
    radius: f32,
    time: f32,
) -> f32 {
    let strength = trail_strength(speed);
    if strength <= 0.0 {
        return 0.0;
    }
    let tail = lead - direction * trail_length(speed);
    let distance = sdf_capsule(p, lead, tail, radius * 0.8, radius * 0.25);
    mask_from_distance(perturb(distance, p, time), EDGE_SOFTNESS) * strength
}

#[inline]
pub fn splash_active(speed: f32) -> bool {
    speed >= SPLASH_SPEED_MIN
}

/// Droplets thrown around the direction of travel at speed.
pub fn splash_mask(
    p: Point,
    lead: Point,
    direction: Vector,
    speed: f32,
    radius: f32,
    time: f32,
) -> f32 {
    if !splash_active(speed) {
        return 0.0;
    }
    let heading = direction.y.atan2(direction.x);
    let strength = 0.4 + 0.6 * smoothstep(SPLASH_SPEED_MIN, 0.3, speed);
    let droplet_radius = radius * 0.16 * (0.7 + 0.6 * speed);

    let mut mask: f32 = 0.0;
    for (i, spread) in SPLASH_ANGLES.iter().enumerate() {
        let angle = heading + spread;
        let wobble = noise_offset(i as f32 * 2.3 + 19.0, time * 1.5) * (radius * 0.25);
        let reach = radius * (1.25 + 0.35 * speed);
        let center = lead + vector(angle.cos(), angle.sin()) * reach + wobble;
        let distance = sdf_circle(p, center, droplet_radius);
        mask = mask.max(mask_from_distance(distance, EDGE_SOFTNESS) * strength);
    }
    mask
}

/// Widening of the bands where the surface normal lines up with the motion.
pub fn band_stretch(p: Point, lead: Point, direction: Vector, speed: f32) -> f32 {
    let offset = p - lead;
    let length = offset.length();
    if length < 1e-6 {
        return 1.0;
    }
    1.0 + (offset / length).dot(direction).abs() * speed * BAND_STRETCH
}

/// Everything the compositor needs from the fluid engine at one coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealField {
    /// Combined reveal mask in `[0, 1]`.
    pub mask: f32,
    /// Signed distance to the lead cluster contour.
    pub lead_distance: f32,
    /// Lead opacity after phantom suppression.
    pub lead_opacity: f32,
    pub band_stretch: f32,
    /// Transparency of the revealed hole including its band ring.
    pub core_transparency: f32,
}

impl RevealField {
    pub fn lead_active(&self) -> bool {
        self.lead_opacity > 0.0
    }

    pub fn band_width(&self) -> f32 {
        (BAND_GREY_WIDTH + BAND_GOLD_WIDTH) * self.band_stretch
    }
}

/// Evaluates the fluid engine for one UV coordinate.
pub fn reveal_field(params: &ShaderParams, uv: Point) -> RevealField {
    let aspect = params.aspect();
    let time = params.noise_time;
    let radius = params.reveal_radius;
    let p = fluid_space(uv, aspect);

    let visuals_suppressed = params.phantom_mode && params.suppress_phantom_visuals;
    let mut mask: f32 = 0.0;
    let mut field = RevealField {
        mask: 0.0,
        lead_distance: FAR,
        lead_opacity: 0.0,
        band_stretch: 1.0,
        core_transparency: 0.0,
    };

    if let (Some(lead_uv), false) = (params.active_lead(), visuals_suppressed) {
        let lead = fluid_space(lead_uv, aspect);
        let direction = fluid_direction(params.direction, aspect);
        let opacity = params.lead_opacity;
        let speed = params.speed;

        let distance = perturb(
            water_lobes_distance(p, lead, direction, speed, radius, time),
            p,
            time,
        );
        mask = mask.max(mask_from_distance(distance, EDGE_SOFTNESS) * opacity);
        mask = mask.max(trail_capsule_mask(p, lead, direction, speed, radius, time) * opacity);
        mask = mask.max(splash_mask(p, lead, direction, speed, radius, time) * opacity);

        field.lead_distance = distance;
        field.lead_opacity = opacity;
        field.band_stretch = band_stretch(p, lead, direction, speed);
    }

    if !visuals_suppressed {
        for (slot, scale) in params.trail.iter().zip(TRAIL_BLOB_SCALE) {
            if slot.opacity <= 0.0 || !is_active_position(slot.position) {
                continue;
            }
            let center = fluid_space(slot.position, aspect);
            let distance = perturb(sdf_circle(p, center, radius * scale), p, time);
            mask = mask.max(mask_from_distance(distance, EDGE_SOFTNESS) * slot.opacity);
        }
    }

    for blob in &params.ambient {
        if blob.opacity <= 0.0 {
            continue;
        }
        let center = fluid_space(blob.center, aspect);
        let distance = perturb(sdf_circle(p, center, blob.radius), p, time);
        mask = mask.max(
            mask_from_distance(distance, EDGE_SOFTNESS) * blob.opacity.min(AMBIENT_OPACITY_CAP),
        );
    }

    field.mask = mask.clamp(0.0, 1.0);
    let ring = field.lead_opacity
        * mask_from_distance(field.lead_distance - field.band_width(), EDGE_SOFTNESS);
    field.core_transparency = field.mask.max(ring);
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_with_lead(lead: Point, speed: f32, direction: Vector) -> ShaderParams {
        let mut params = ShaderParams::new(400, 400);
        params.lead = lead;
        params.lead_opacity = 1.0;
        params.speed = speed;
        params.direction = direction;
        params
    }

    #[test]
    fn lead_centre_is_fully_revealed() {
        let params = params_with_lead(point(0.5, 0.5), 0.0, vector(0.0, 0.0));
        let field = reveal_field(&params, point(0.5, 0.5));
        assert!((field.mask - 1.0).abs() < 1e-4);
        assert!(field.core_transparency >= field.mask);
    }

    #[test]
    fn nothing_is_revealed_far_from_an_idle_surface() {
        let params = params_with_lead(point(0.2, 0.2), 0.0, vector(0.0, 0.0));
        let field = reveal_field(&params, point(0.9, 0.9));
        assert_eq!(field.mask, 0.0);
        assert_eq!(field.core_transparency, 0.0);
    }

    #[test]
    fn inactive_lead_contributes_nothing() {
        let params = ShaderParams::new(400, 400);
        let field = reveal_field(&params, point(0.5, 0.5));
        assert!(!field.lead_active());
        assert_eq!(field.mask, 0.0);
    }

    #[test]
    fn trail_is_zero_below_threshold_and_continuous_above() {
        assert_eq!(trail_length(0.0), 0.0);
        assert_eq!(trail_length(0.019), 0.0);
        assert_eq!(trail_length(TRAIL_SPEED_MIN), 0.0);
        assert!(trail_length(TRAIL_SPEED_MIN + 1e-4) < 1e-6);
        assert!(trail_length(0.5) > trail_length(0.2));

        let mut previous = trail_length(0.0);
        for step in 1..=1000 {
            let value = trail_length(step as f32 / 1000.0);
            assert!((value - previous).abs() < 1e-3);
            previous = value;
        }
    }

    #[test]
    fn splash_is_gated_by_speed() {
        let lead = point(0.5, 0.5);
        let direction = vector(1.0, 0.0);
        let radius = REVEAL_RADIUS;
        let probe = |speed: f32| -> f32 {
            let mut best: f32 = 0.0;
            for x in 0..60 {
                for y in 0..60 {
                    let p = point(x as f32 / 60.0, y as f32 / 60.0);
                    best = best.max(splash_mask(p, lead, direction, speed, radius, 0.0));
                }
            }
            best
        };
        assert_eq!(probe(0.049), 0.0);
        assert!(probe(0.8) > 0.0);
    }

    #[test]
    fn mask_never_exceeds_one() {
        let mut params = params_with_lead(point(0.5, 0.5), 0.9, vector(0.7, 0.7));
        for slot in &mut params.trail {
            slot.position = point(0.48, 0.49);
            slot.opacity = 1.0;
        }
        params.ambient = ambient_blobs(3.0);
        for x in 0..40 {
            for y in 0..40 {
                let field = reveal_field(&params, point(x as f32 / 40.0, y as f32 / 40.0));
                assert!((0.0..=1.0).contains(&field.mask));
                assert!((0.0..=1.0).contains(&field.core_transparency));
            }
        }
    }

    #[test]
    fn suppressed_phantom_hides_lead_and_trail() {
        let mut params = params_with_lead(point(0.5, 0.5), 0.0, vector(0.0, 0.0));
        params.trail[0].position = point(0.5, 0.5);
        params.trail[0].opacity = 1.0;
        params.phantom_mode = true;
        params.suppress_phantom_visuals = true;
        let field = reveal_field(&params, point(0.5, 0.5));
        assert_eq!(field.mask, 0.0);
        assert!(!field.lead_active());

        params.suppress_phantom_visuals = false;
        assert!(reveal_field(&params, point(0.5, 0.5)).mask > 0.9);
    }

    #[test]
    fn bands_stretch_along_direction_of_travel() {
        let lead = point(0.5, 0.5);
        let direction = vector(1.0, 1.0) / 2f32.sqrt();
        let along = band_stretch(point(0.6, 0.6), lead, direction, 1.0);
        let across = band_stretch(point(0.6, 0.4), lead, direction, 1.0);
        assert!(along > across + 1.0);
        assert!((across - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ambient_blobs_stay_capped() {
        for step in 0..2_000 {
            for blob in ambient_blobs(step as f32 * 0.37) {
                assert!(blob.opacity <= AMBIENT_OPACITY_CAP + 1e-6);
                assert!(blob.opacity > 0.0);
            }
        }
    }
}
