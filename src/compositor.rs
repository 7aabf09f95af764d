//! The per-pixel shading procedure.
//!
//! Each step is a pure function so it can be checked in isolation; [`shade`]
//! chains them in order. `compositor.wgsl` implements the same steps with the
//! same constants on the GPU.

use lyon::math::{point, Point};
use std::f32::consts::{PI, TAU};

use crate::fluid::{self, RevealField, BAND_GOLD_WIDTH, BAND_GREY_WIDTH, EDGE_SOFTNESS};
use crate::params::ShaderParams;
use crate::texture_set::{LayerSampler, TextureRole};
use crate::util::{clamp01, fract, mix, smoothstep};

pub const PARALLAX_STRENGTH_MIN: f32 = 0.13;
pub const PARALLAX_STRENGTH_MAX: f32 = 0.19;
/// Weight of the lighten and darken maps relative to the base depth.
pub const DEPTH_ADJUST: f32 = 0.35;
/// Bottom-right region where parallax fades out.
pub const PARALLAX_SUPPRESS_X: (f32, f32) = (0.68, 0.76);
pub const PARALLAX_SUPPRESS_Y: (f32, f32) = (0.74, 0.82);

pub const SHADOW_TINT_GAIN: f32 = 0.8;
pub const SHADOW_TINT_MIN: f32 = -0.15;
pub const SHADOW_TINT_MAX: f32 = 0.25;

pub const GLOSS_SPEED: f32 = 0.12;
pub const GLOSS_BAND_WIDTH: f32 = 0.18;
pub const GLOSS_INTENSITY: f32 = 0.55;
pub const GLOSS_SHIMMER: f32 = 0.15;
pub const GLOSS_FADE_PERIOD: f32 = 6.0;

pub const KIT_OPACITY_MIN: f32 = 0.55;
pub const KIT_OPACITY_MAX: f32 = 1.0;
pub const KIT_PULSE_PERIOD: f32 = 6.0;
pub const KIT_SHINE_PERIOD: f32 = 8.0;
pub const KIT_SHINE_VISIBLE: f32 = 2.0;
pub const KIT_SHINE_WIDTH: f32 = 0.12;
pub const KIT_SHINE_INTENSITY: f32 = 0.35;

pub const REVEAL_GLOW: f32 = 0.6;

/// Bands only render where the base alpha is below this.
pub const BAND_ALPHA_GATE: f32 = 0.1;
pub const DISCARD_EPSILON: f32 = 0.01;
/// Core transparency above which the outside of the subject shows the bands.
pub const CORE_THRESHOLD: f32 = 0.5;

pub const GREY: [f32; 3] = [0.62, 0.63, 0.66];
pub const GOLD: [f32; 3] = [0.83, 0.69, 0.32];
pub const GOLD_SHIMMER_SPEED: f32 = 2.5;
pub const GOLD_SHIMMER_AMOUNT: f32 = 0.15;

/// Result of shading one coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shaded {
    /// Fully transparent, nothing drawn.
    Discarded,
    /// Straight-alpha RGBA.
    Color([f32; 4]),
}

impl Shaded {
    pub fn alpha(&self) -> f32 {
        match self {
            Shaded::Discarded => 0.0,
            Shaded::Color(color) => color[3],
        }
    }

    pub fn to_rgba(self) -> [f32; 4] {
        match self {
            Shaded::Discarded => [0.0; 4],
            Shaded::Color(color) => color,
        }
    }
}

#[inline]
fn rgb(sample: [f32; 4]) -> [f32; 3] {
    [sample[0], sample[1], sample[2]]
}

#[inline]
fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [mix(a[0], b[0], t), mix(a[1], b[1], t), mix(a[2], b[2], t)]
}

#[inline]
fn luminance(color: [f32; 3]) -> f32 {
    color[0] * 0.299 + color[1] * 0.587 + color[2] * 0.114
}

/// Combines the grayscale depth maps into one scalar. No base depth means no parallax.
pub fn parallax_depth(depth: Option<f32>, lighten: Option<f32>, darken: Option<f32>) -> f32 {
    let Some(depth) = depth else {
        return 0.0;
    };
    let boost = lighten.unwrap_or(0.0) * DEPTH_ADJUST;
    let reduce = darken.unwrap_or(0.0) * DEPTH_ADJUST;
    clamp01(depth + boost - reduce)
}

/// 1 inside the bottom-right region that must not move, 0 elsewhere.
pub fn parallax_suppression(uv: Point) -> f32 {
    smoothstep(PARALLAX_SUPPRESS_X.0, PARALLAX_SUPPRESS_X.1, uv.x)
        * smoothstep(PARALLAX_SUPPRESS_Y.0, PARALLAX_SUPPRESS_Y.1, uv.y)
}

/// Sampling coordinate for base and overlay lookups.
pub fn parallax_uv(uv: Point, pointer: Point, depth: f32, strength: f32) -> Point {
    let strength = strength.clamp(PARALLAX_STRENGTH_MIN, PARALLAX_STRENGTH_MAX);
    let offset = (pointer - point(0.5, 0.5)) * (depth * strength);
    uv + offset * (1.0 - parallax_suppression(uv))
}

pub fn shadow_tint_factor(pointer_x: f32) -> f32 {
    ((pointer_x - 0.5) * SHADOW_TINT_GAIN).clamp(SHADOW_TINT_MIN, SHADOW_TINT_MAX)
}

pub fn shadow_tint(color: [f32; 3], factor: f32) -> [f32; 3] {
    color.map(|channel| clamp01(channel * (1.0 + factor)))
}

/// Opacity envelope of the gloss, fading in and out every [`GLOSS_FADE_PERIOD`].
pub fn gloss_envelope(time: f32) -> f32 {
    0.5 - 0.5 * (time * TAU / GLOSS_FADE_PERIOD).cos()
}

/// Diagonal light sweep plus shimmer, gated by the gloss layer's brightness.
pub fn gloss_overlay(color: [f32; 3], uv: Point, gloss: [f32; 4], phase: f32, time: f32) -> [f32; 3] {
    let brightness = luminance(rgb(gloss)) * gloss[3];
    let band_center = fract(phase * GLOSS_SPEED) * 2.0 - 0.5;
    let diagonal = (uv.x + uv.y) * 0.5;
    let band = 1.0 - smoothstep(0.0, GLOSS_BAND_WIDTH, (diagonal - band_center).abs());
    let shimmer = ((time * 3.0 + (uv.x - uv.y) * 20.0).sin() * 0.5 + 0.5)
        * smoothstep(0.5, 0.9, brightness)
        * GLOSS_SHIMMER;
    let amount = clamp01((band * brightness * GLOSS_INTENSITY + shimmer) * gloss_envelope(time));
    color.map(|channel| channel + (1.0 - channel) * amount)
}

pub fn kit_opacity(time: f32) -> f32 {
    mix(
        KIT_OPACITY_MIN,
        KIT_OPACITY_MAX,
        (time * TAU / KIT_PULSE_PERIOD).sin() * 0.5 + 0.5,
    )
}

/// Shine band intensity; visible for the first [`KIT_SHINE_VISIBLE`] seconds of each cycle.
pub fn kit_shine(uv: Point, time: f32, kit_depth: Option<f32>) -> f32 {
    let cycle = time.rem_euclid(KIT_SHINE_PERIOD);
    if cycle >= KIT_SHINE_VISIBLE {
        return 0.0;
    }
    let progress = cycle / KIT_SHINE_VISIBLE;
    let center = mix(-0.2, 1.2, progress);
    let band = 1.0 - smoothstep(0.0, KIT_SHINE_WIDTH, (uv.x * 0.7 + uv.y * 0.3 - center).abs());
    let modulation = kit_depth.map_or(1.0, |depth| mix(0.4, 1.0, depth));
    band * (PI * progress).sin() * modulation * KIT_SHINE_INTENSITY
}

pub fn kit_overlay(color: [f32; 3], kit: [f32; 4], opacity: f32, shine: f32) -> [f32; 3] {
    let blended = mix3(color, rgb(kit), kit[3] * opacity);
    blended.map(|channel| clamp01(channel + shine * kit[3]))
}

/// Inside the subject the reveal peels the kit back to the shaded base, with a
/// gold glow at the rim.
pub fn fluid_peel(with_kit: [f32; 3], without_kit: [f32; 3], mask: f32) -> [f32; 3] {
    let peeled = mix3(with_kit, without_kit, mask);
    let rim = 4.0 * mask * (1.0 - mask) * REVEAL_GLOW * 0.25;
    [
        clamp01(peeled[0] + GOLD[0] * rim),
        clamp01(peeled[1] + GOLD[1] * rim),
        clamp01(peeled[2] + GOLD[2] * rim),
    ]
}

fn band_window(distance: f32, from: f32, to: f32) -> f32 {
    let edge = EDGE_SOFTNESS * 0.5;
    smoothstep(from - edge, from + edge, distance) * (1.0 - smoothstep(to - edge, to + edge, distance))
}

/// Grey then gold rings just outside the lead contour. Straight-alpha RGBA.
pub fn background_bands(field: &RevealField, time: f32, marble: Option<[f32; 4]>) -> [f32; 4] {
    if !field.lead_active() {
        return [0.0; 4];
    }
    let grey_width = BAND_GREY_WIDTH * field.band_stretch;
    let gold_width = BAND_GOLD_WIDTH * field.band_stretch;
    let distance = field.lead_distance;

    let grey_coverage = band_window(distance, 0.0, grey_width);
    let gold_coverage = band_window(distance, grey_width, grey_width + gold_width);

    let grey = match marble {
        Some(marble) => GREY.map(|channel| clamp01(channel * mix(0.85, 1.15, luminance(rgb(marble))))),
        None => GREY,
    };
    let shimmer = 1.0 + GOLD_SHIMMER_AMOUNT * (time * GOLD_SHIMMER_SPEED + distance * 80.0).sin();
    let gold = GOLD.map(|channel| clamp01(channel * shimmer));

    let coverage = clamp01(grey_coverage + gold_coverage);
    if coverage <= 0.0 {
        return [0.0; 4];
    }
    let color = [
        (grey[0] * grey_coverage + gold[0] * gold_coverage) / coverage,
        (grey[1] * grey_coverage + gold[1] * gold_coverage) / coverage,
        (grey[2] * grey_coverage + gold[2] * gold_coverage) / coverage,
    ];
    [color[0], color[1], color[2], coverage * field.lead_opacity]
}

/// Near-zero base alpha and near-zero core transparency. Checked after the bands.
#[inline]
pub fn should_discard(base_alpha: f32, core_transparency: f32) -> bool {
    base_alpha < DISCARD_EPSILON && core_transparency < DISCARD_EPSILON
}

/// Spotlight revealing the x-ray layer over its own shadow.
#[allow(clippy::too_many_arguments)]
pub fn xray_spotlight(
    color: [f32; 3],
    uv: Point,
    center: Point,
    radius: f32,
    strength: f32,
    aspect: f32,
    xray: [f32; 4],
    shadow: Option<[f32; 4]>,
) -> [f32; 3] {
    let distance = fluid::fluid_space(uv, aspect).distance_to(fluid::fluid_space(center, aspect));
    let spot = (1.0 - smoothstep(radius * 0.7, radius, distance)) * strength;
    if spot <= 0.0 {
        return color;
    }
    let mut out = color;
    if let Some(shadow) = shadow {
        out = mix3(out, rgb(shadow), shadow[3] * spot);
    }
    mix3(out, rgb(xray), xray[3] * spot)
}

/// Inside the subject the shaded colour always shows at base alpha. Outside it
/// only the bands show, and only once the core is open.
pub fn final_compose(base_alpha: f32, color: [f32; 3], core_transparency: f32, bands: [f32; 4]) -> [f32; 4] {
    if base_alpha >= BAND_ALPHA_GATE {
        return [color[0], color[1], color[2], base_alpha];
    }
    let band_alpha = if core_transparency > CORE_THRESHOLD {
        bands[3]
    } else {
        0.0
    };
    let alpha = base_alpha + band_alpha * (1.0 - base_alpha);
    if alpha <= 0.0 {
        return [0.0; 4];
    }
    let under = band_alpha * (1.0 - base_alpha);
    [
        (color[0] * base_alpha + bands[0] * under) / alpha,
        (color[1] * base_alpha + bands[1] * under) / alpha,
        (color[2] * base_alpha + bands[2] * under) / alpha,
        alpha,
    ]
}

fn sample_if<L: LayerSampler>(layers: &L, present: bool, role: TextureRole, uv: Point) -> Option<[f32; 4]> {
    present.then(|| layers.sample(role, uv))
}

/// Shades one UV coordinate (origin top-left).
pub fn shade<L: LayerSampler>(layers: &L, params: &ShaderParams, uv: Point) -> Shaded {
    let presence = params.presence;
    let luma = |sample: Option<[f32; 4]>| sample.map(|s| s[0]);

    let depth = parallax_depth(
        luma(sample_if(layers, presence.depth, TextureRole::Depth, uv)),
        luma(sample_if(layers, presence.depth_lighten, TextureRole::DepthLighten, uv)),
        luma(sample_if(layers, presence.depth_darken, TextureRole::DepthDarken, uv)),
    );
    let shifted = parallax_uv(uv, params.pointer, depth, params.parallax_strength);
    let base = layers.sample(TextureRole::Base, shifted);

    let mut color = shadow_tint(rgb(base), shadow_tint_factor(params.pointer.x));

    if let Some(gloss) = sample_if(layers, presence.gloss, TextureRole::Gloss, shifted) {
        color = gloss_overlay(color, shifted, gloss, params.gloss_phase, params.time);
    }

    let without_kit = color;
    if presence.kit {
        let kit = layers.sample(TextureRole::Overlay, shifted);
        let kit_depth = luma(sample_if(layers, presence.kit_depth, TextureRole::KitDepth, shifted));
        let shine = kit_shine(shifted, params.time, kit_depth);
        color = kit_overlay(color, kit, kit_opacity(params.time), shine);
    }

    let field = fluid::reveal_field(params, uv);
    color = fluid_peel(color, without_kit, field.mask);

    let bands = if base[3] < BAND_ALPHA_GATE && field.lead_active() {
        let marble = sample_if(layers, presence.marble, TextureRole::Marble, uv);
        background_bands(&field, params.time, marble)
    } else {
        [0.0; 4]
    };

    if should_discard(base[3], field.core_transparency) {
        return Shaded::Discarded;
    }

    if base[3] > 0.0 {
        let xray = layers.sample(TextureRole::XRay, shifted);
        let shadow = sample_if(layers, presence.shadow, TextureRole::Shadow, shifted);
        color = xray_spotlight(
            color,
            uv,
            params.xray_center,
            params.xray_radius,
            params.xray_strength,
            params.aspect(),
            xray,
            shadow,
        );
    }

    Shaded::Color(final_compose(base[3], color, field.core_transparency, bands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluid::RevealField;

    fn open_field(distance: f32) -> RevealField {
        RevealField {
            mask: 1.0,
            lead_distance: distance,
            lead_opacity: 1.0,
            band_stretch: 1.0,
            core_transparency: 1.0,
        }
    }

    #[test]
    fn parallax_strength_is_clamped() {
        let uv = point(0.3, 0.3);
        let pointer = point(1.0, 0.5);
        let weak = parallax_uv(uv, pointer, 1.0, 0.0);
        let strong = parallax_uv(uv, pointer, 1.0, 5.0);
        assert!((weak.x - (0.3 + 0.5 * PARALLAX_STRENGTH_MIN)).abs() < 1e-6);
        assert!((strong.x - (0.3 + 0.5 * PARALLAX_STRENGTH_MAX)).abs() < 1e-6);
    }

    #[test]
    fn parallax_is_suppressed_bottom_right() {
        let uv = point(0.9, 0.9);
        assert_eq!(parallax_uv(uv, point(1.0, 1.0), 1.0, 0.16), uv);
        assert_ne!(parallax_uv(point(0.2, 0.2), point(1.0, 1.0), 1.0, 0.16), point(0.2, 0.2));
    }

    #[test]
    fn depth_without_base_map_is_flat() {
        assert_eq!(parallax_depth(None, Some(1.0), Some(0.0)), 0.0);
        assert!((parallax_depth(Some(0.5), Some(1.0), None) - 0.85).abs() < 1e-6);
        assert!((parallax_depth(Some(0.5), None, Some(1.0)) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn shadow_tint_is_clamped() {
        assert_eq!(shadow_tint_factor(0.0), SHADOW_TINT_MIN);
        assert_eq!(shadow_tint_factor(1.0), SHADOW_TINT_MAX);
        assert!((shadow_tint_factor(0.6) - 0.08).abs() < 1e-6);
    }

    #[test]
    fn kit_opacity_pulses_between_bounds() {
        for step in 0..600 {
            let opacity = kit_opacity(step as f32 * 0.01);
            assert!((KIT_OPACITY_MIN - 1e-6..=KIT_OPACITY_MAX + 1e-6).contains(&opacity));
        }
        assert!((kit_opacity(1.5) - 1.0).abs() < 1e-5);
        assert!((kit_opacity(4.5) - KIT_OPACITY_MIN).abs() < 1e-5);
    }

    #[test]
    fn kit_shine_is_hidden_outside_its_window() {
        assert_eq!(kit_shine(point(0.5, 0.5), 3.0, None), 0.0);
        assert_eq!(kit_shine(point(0.5, 0.5), 7.9, None), 0.0);
        assert!(kit_shine(point(0.5, 0.5), 1.0, None) > 0.0);
        assert!(kit_shine(point(0.5, 0.5), 9.0, None) > 0.0);
    }

    #[test]
    fn gloss_fades_with_envelope() {
        let gloss = [1.0, 1.0, 1.0, 1.0];
        let color = [0.2, 0.2, 0.2];
        assert_eq!(gloss_overlay(color, point(0.5, 0.5), gloss, 0.0, 0.0), color);
        let lit = gloss_overlay(color, point(0.25, 0.25), gloss, 0.0, 3.0);
        assert!(lit[0] > color[0]);
    }

    #[test]
    fn transparent_base_without_reveal_is_discarded() {
        assert!(should_discard(0.0, 0.0));
        assert!(!should_discard(0.0, CORE_THRESHOLD));
        assert!(!should_discard(0.5, 0.0));
    }

    #[test]
    fn open_core_outside_subject_shows_bands() {
        let field = open_field(0.005);
        let bands = background_bands(&field, 0.0, None);
        assert!(bands[3] > 0.0);
        let out = final_compose(0.0, [0.0; 3], CORE_THRESHOLD + 0.1, bands);
        assert!(out[3] > 0.0);

        let closed = final_compose(0.0, [0.0; 3], CORE_THRESHOLD - 0.1, bands);
        assert_eq!(closed[3], 0.0);
    }

    #[test]
    fn inside_subject_alpha_is_never_reduced() {
        let color = [0.3, 0.4, 0.5];
        let out = final_compose(0.8, color, 1.0, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(out, [0.3, 0.4, 0.5, 0.8]);
    }

    #[test]
    fn bands_are_grey_then_gold() {
        let grey = background_bands(&open_field(BAND_GREY_WIDTH * 0.5), 0.0, None);
        let gold = background_bands(&open_field(BAND_GREY_WIDTH + BAND_GOLD_WIDTH * 0.5), 0.0, None);
        assert!((grey[0] - GREY[0]).abs() < 1e-3);
        assert!(gold[0] > grey[0]);
        assert!(gold[2] < grey[2]);
        assert_eq!(background_bands(&open_field(0.2), 0.0, None)[3], 0.0);
    }

    #[test]
    fn spotlight_reveals_xray_only_near_centre() {
        let base = [0.0, 0.0, 0.0];
        let xray = [1.0, 0.0, 0.0, 1.0];
        let near = xray_spotlight(base, point(0.5, 0.5), point(0.5, 0.5), 0.16, 1.0, 1.0, xray, None);
        let far = xray_spotlight(base, point(0.9, 0.9), point(0.5, 0.5), 0.16, 1.0, 1.0, xray, None);
        assert_eq!(near[0], 1.0);
        assert_eq!(far, base);
    }
}
