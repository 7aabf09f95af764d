/// Visual regression tests for the compositor.
///
/// Every scene renders through the software renderer and, when a GPU adapter
/// exists, through the headless GPU renderer; both must satisfy the same pixel
/// expectations.
///
/// Run with:   cargo test --test visual_regression
use futures::executor::block_on;
use hero_reveal::{Renderer, ShaderParams, SoftwareRenderer, TextureRole};
use hero_reveal_test_scenes::{
    build_scenes, check_pixels, hero_texture_set, pixel_rgba, CANVAS_HEIGHT, CANVAS_WIDTH,
};
use lyon::math::point;

fn assert_no_failures(scene: &str, failures: Vec<String>) {
    if !failures.is_empty() {
        panic!(
            "[{scene}] {} pixel expectation(s) failed:\n{}",
            failures.len(),
            failures.join("\n"),
        );
    }
}

fn software_frame(params: &ShaderParams) -> Vec<u8> {
    let mut renderer = SoftwareRenderer::new((CANVAS_WIDTH, CANVAS_HEIGHT));
    renderer.upload_textures(hero_texture_set());
    renderer.update_params(params);
    let mut pixels = Vec::new();
    renderer.render_to_buffer(&mut pixels);
    pixels
}

#[test]
fn software_scenes_pixel_expectations() {
    let textures = hero_texture_set();
    for scene in build_scenes(&textures) {
        let pixels = software_frame(&scene.params);
        assert_eq!(pixels.len(), (CANVAS_WIDTH * CANVAS_HEIGHT * 4) as usize);
        assert_no_failures(
            scene.name,
            check_pixels(&pixels, CANVAS_WIDTH, CANVAS_HEIGHT, &scene.expectations),
        );
    }
}

#[test]
fn gpu_scenes_pixel_expectations() {
    let Some(mut renderer) = block_on(Renderer::try_new_headless((CANVAS_WIDTH, CANVAS_HEIGHT)))
    else {
        eprintln!("Skipping: no GPU adapter available");
        return;
    };
    let textures = hero_texture_set();
    renderer.upload_textures(&textures).unwrap();

    for scene in build_scenes(&textures) {
        renderer.update_params(&scene.params);
        let mut pixels = Vec::new();
        renderer.render_to_buffer(&mut pixels).unwrap();
        assert_no_failures(
            scene.name,
            check_pixels(&pixels, CANVAS_WIDTH, CANVAS_HEIGHT, &scene.expectations),
        );
    }
}

#[test]
fn gpu_argb_matches_buffer_layout() {
    let Some(mut renderer) = block_on(Renderer::try_new_headless((CANVAS_WIDTH, CANVAS_HEIGHT)))
    else {
        eprintln!("Skipping: no GPU adapter available");
        return;
    };
    let textures = hero_texture_set();
    renderer.upload_textures(&textures).unwrap();
    let scene = build_scenes(&textures).remove(0);
    renderer.update_params(&scene.params);

    let mut words = vec![0u32; (CANVAS_WIDTH * CANVAS_HEIGHT) as usize];
    renderer.render_to_argb32(&mut words).unwrap();
    let mut bytes = Vec::new();
    renderer.render_to_buffer(&mut bytes).unwrap();

    let [r, g, b, a] = pixel_rgba(&bytes, CANVAS_WIDTH, 8, 8).unwrap();
    let word = words[(8 * CANVAS_WIDTH + 8) as usize];
    assert_eq!(word, u32::from_be_bytes([a, r, g, b]));
}

/// With no textures uploaded every layer is the transparent fallback.
#[test]
fn gpu_without_textures_renders_transparent() {
    let Some(mut renderer) = block_on(Renderer::try_new_headless((16, 16))) else {
        eprintln!("Skipping: no GPU adapter available");
        return;
    };
    let mut pixels = Vec::new();
    renderer.render_to_buffer(&mut pixels).unwrap();
    assert_eq!(pixels.len(), 16 * 16 * 4);
    assert!(pixels.iter().all(|&byte| byte == 0));
}

/// Base alpha 0 with the lead mask open must still draw the band ring, while
/// base alpha 0 with no mask draws nothing.
#[test]
fn bands_show_outside_the_subject_only_near_the_lead() {
    let textures = hero_texture_set();
    let mut params = ShaderParams::new(CANVAS_WIDTH, CANVAS_HEIGHT);
    params.presence = textures.presence();

    let at_rest = software_frame(&params);
    params.lead = point(0.75, 0.5);
    params.lead_opacity = 1.0;
    let revealed = software_frame(&params);

    let mut banded = 0;
    for y in 0..CANVAS_HEIGHT {
        for x in CANVAS_WIDTH / 2 + 1..CANVAS_WIDTH {
            let before = pixel_rgba(&at_rest, CANVAS_WIDTH, x, y).unwrap();
            assert_eq!(before, [0, 0, 0, 0], "empty half at rest ({x},{y})");
            let after = pixel_rgba(&revealed, CANVAS_WIDTH, x, y).unwrap();
            if after[3] > 64 {
                banded += 1;
            }
        }
    }
    assert!(banded > 0, "the band ring must be visible outside the subject");

    let corner = pixel_rgba(&revealed, CANVAS_WIDTH, CANVAS_WIDTH - 1, 0).unwrap();
    assert_eq!(corner, [0, 0, 0, 0]);
}

#[test]
fn resize_changes_output_size() {
    let mut renderer = SoftwareRenderer::new((CANVAS_WIDTH, CANVAS_HEIGHT));
    renderer.upload_textures(hero_texture_set());
    renderer.resize((20, 10));
    let mut pixels = Vec::new();
    renderer.render_to_buffer(&mut pixels);
    assert_eq!(pixels.len(), 20 * 10 * 4);
    assert_eq!(renderer.params().width, 20);
}

#[test]
fn gpu_release_frees_layer_textures() {
    let Some(mut renderer) = block_on(Renderer::try_new_headless((CANVAS_WIDTH, CANVAS_HEIGHT)))
    else {
        eprintln!("Skipping: no GPU adapter available");
        return;
    };
    renderer.upload_textures(&hero_texture_set()).unwrap();
    let manager = renderer.texture_manager().clone();
    assert!(manager.is_texture_loaded(TextureRole::XRay));
    assert!(!manager.is_texture_loaded(TextureRole::Marble));
    assert_eq!(manager.loaded_count(), 3);

    renderer.release();
    assert_eq!(manager.loaded_count(), 0);
}

#[test]
fn headless_render_draws_offscreen() {
    let Some(mut renderer) = block_on(Renderer::try_new_headless((16, 16))) else {
        eprintln!("Skipping: no GPU adapter available");
        return;
    };
    renderer.upload_textures(&hero_texture_set()).unwrap();
    renderer.update_params(&ShaderParams::new(16, 16));
    renderer.render().unwrap();
    renderer.render().unwrap();
}
