use hero_reveal::{ShaderParams, TextureSet};
use lyon::math::point;

use crate::expectations::PixelExpectation;
use crate::fixtures::{subject_color, CANVAS_HEIGHT, CANVAS_WIDTH};

/// One frame's parameters and what the rendered frame must contain.
///
/// Shared between the software and GPU tests and the visual-confirmation demo.
pub struct Scene {
    pub name: &'static str,
    pub params: ShaderParams,
    pub expectations: Vec<PixelExpectation>,
}

fn base_params(textures: &TextureSet) -> ShaderParams {
    let mut params = ShaderParams::new(CANVAS_WIDTH, CANVAS_HEIGHT);
    params.presence = textures.presence();
    params
}

fn at_rest(textures: &TextureSet) -> Scene {
    Scene {
        name: "at_rest",
        params: base_params(textures),
        expectations: vec![
            PixelExpectation::rgba(8, 8, subject_color(), "subject shows its base colour"),
            PixelExpectation::transparent(56, 8, "empty area is transparent"),
            PixelExpectation::transparent(56, 56, "empty corner is transparent"),
        ],
    }
}

fn reveal_inside_subject(textures: &TextureSet) -> Scene {
    let mut params = base_params(textures);
    params.lead = point(0.25, 0.5);
    params.lead_opacity = 1.0;
    Scene {
        name: "reveal_inside_subject",
        params,
        expectations: vec![
            PixelExpectation::rgba(16, 32, subject_color(), "reveal keeps the subject opaque"),
            PixelExpectation::transparent(60, 4, "far empty area stays transparent"),
        ],
    }
}

fn reveal_outside_subject(textures: &TextureSet) -> Scene {
    let mut params = base_params(textures);
    params.lead = point(0.75, 0.5);
    params.lead_opacity = 1.0;
    Scene {
        name: "reveal_outside_subject",
        params,
        expectations: vec![
            PixelExpectation::rgba(8, 8, subject_color(), "distant subject is untouched"),
            PixelExpectation::transparent(60, 2, "far from the lead nothing is drawn"),
        ],
    }
}

fn xray_spotlight(textures: &TextureSet) -> Scene {
    let mut params = base_params(textures);
    params.xray_center = point(0.25, 0.5);
    params.xray_strength = 1.0;
    Scene {
        name: "xray_spotlight",
        params,
        expectations: vec![
            PixelExpectation::rgba(16, 32, [20, 220, 90, 255], "x-ray replaces the subject"),
            PixelExpectation::rgba(2, 2, subject_color(), "outside the spotlight"),
            PixelExpectation::transparent(56, 32, "spotlight never paints empty space"),
        ],
    }
}

/// Every scene, rendered against [`crate::hero_texture_set`].
pub fn build_scenes(textures: &TextureSet) -> Vec<Scene> {
    vec![
        at_rest(textures),
        reveal_inside_subject(textures),
        reveal_outside_subject(textures),
        xray_spotlight(textures),
    ]
}
