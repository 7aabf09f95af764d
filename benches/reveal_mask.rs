use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hero_reveal::fluid::reveal_field;
use hero_reveal::{DirectorConfig, InteractionDirector, ShaderParams, SoftwareRenderer};
use hero_reveal_test_scenes::hero_texture_set;
use lyon::math::point;

const FRAME: Duration = Duration::from_micros(16_667);

/// Parameters mid-swipe: lead, trail and splash all contribute.
fn swiping_params(width: u32, height: u32) -> ShaderParams {
    let mut director = InteractionDirector::new(DirectorConfig {
        seed: Some(1),
        ..Default::default()
    });
    let mut params = ShaderParams::new(width, height);
    params.presence = hero_texture_set().presence();
    for frame in 1..=20u32 {
        let t = frame as f32 / 20.0;
        let now = FRAME * frame;
        director.pointer_moved(now, point(0.2 + 0.6 * t, 0.3 + 0.4 * t));
        director.update(now, &mut params);
    }
    params
}

fn bench_reveal_field(c: &mut Criterion) {
    let params = swiping_params(256, 256);
    c.bench_function("reveal_field_64x64_grid", |b| {
        b.iter(|| {
            let mut total = 0.0f32;
            for y in 0..64 {
                for x in 0..64 {
                    let uv = point(x as f32 / 64.0, y as f32 / 64.0);
                    total += reveal_field(black_box(&params), uv).mask;
                }
            }
            black_box(total)
        })
    });
}

fn bench_software_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("software_frame");
    group.sample_size(20);
    for side in [64u32, 128, 256] {
        let mut renderer = SoftwareRenderer::new((side, side));
        renderer.upload_textures(hero_texture_set());
        renderer.update_params(&swiping_params(side, side));
        let mut pixels = Vec::new();
        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, _| {
            b.iter(|| {
                renderer.render_to_buffer(&mut pixels);
                black_box(pixels.len())
            })
        });
    }
    group.finish();
}

fn bench_director_update(c: &mut Criterion) {
    c.bench_function("director_idle_minute", |b| {
        b.iter(|| {
            let mut director = InteractionDirector::new(DirectorConfig {
                seed: Some(9),
                ..Default::default()
            });
            let mut params = ShaderParams::new(640, 360);
            for frame in 1..=3600u32 {
                director.update(FRAME * frame, &mut params);
            }
            black_box(params.lead_opacity)
        })
    });
}

criterion_group!(
    benches,
    bench_reveal_field,
    bench_software_frame,
    bench_director_update
);
criterion_main!(benches);
