use hero_reveal::{AssetManifest, DecodedImage, MemorySource, TextureRole, TextureSet};
use image::{Rgba, RgbaImage};

use crate::archive::{encode_png, solid_png, ArchiveBuilder};

pub const CANVAS_WIDTH: u32 = 64;
pub const CANVAS_HEIGHT: u32 = 64;

/// Colour of the subject in the base layer.
pub fn subject_color() -> [u8; 4] {
    [200, 60, 40, 255]
}

/// The left half of the canvas is the subject; the right half is empty.
pub fn base_image() -> RgbaImage {
    RgbaImage::from_fn(CANVAS_WIDTH, CANVAS_HEIGHT, |x, _| {
        if x < CANVAS_WIDTH / 2 {
            Rgba(subject_color())
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn decoded(image: RgbaImage) -> DecodedImage {
    let (width, height) = image.dimensions();
    DecodedImage::from_rgba(width, height, image.into_raw()).expect("fixture dimensions match")
}

/// Mandatory layers only: a half-canvas subject, a transparent kit overlay and
/// a green x-ray.
pub fn hero_texture_set() -> TextureSet {
    TextureSet::builder()
        .layer(TextureRole::Base, decoded(base_image()))
        .layer(
            TextureRole::Overlay,
            DecodedImage::solid(CANVAS_WIDTH, CANVAS_HEIGHT, [0, 0, 0, 0]),
        )
        .layer(
            TextureRole::XRay,
            DecodedImage::solid(CANVAS_WIDTH, CANVAS_HEIGHT, [20, 220, 90, 255]),
        )
        .build()
        .expect("fixture carries every mandatory layer")
}

/// A source serving the default manifest: the archive holds entries 1, 2 and
/// 5 plus `extra_entries` filler images; only the marble file is present.
pub fn hero_source(extra_entries: u32) -> (MemorySource, AssetManifest) {
    let manifest = AssetManifest::default();
    let mut archive = ArchiveBuilder::new()
        .png(1, 8, 8, [20, 220, 90, 255])
        .png(2, 8, 8, [0, 0, 0, 0])
        .image(5, &base_image());
    for index in 0..extra_entries {
        archive = archive.png(100 + index, 2, 2, [index as u8, 0, 0, 255]);
    }

    let mut source = MemorySource::new();
    if let Some(path) = &manifest.archive {
        source.insert(path.clone(), archive.finish());
    }
    for (role, path) in &manifest.files {
        if *role == TextureRole::Marble {
            source.insert(path.clone(), solid_png(4, 4, [128, 128, 128, 255]));
        }
    }
    (source, manifest)
}

/// PNG bytes of the base fixture, for tests that build their own archives.
pub fn base_png() -> Vec<u8> {
    encode_png(&base_image())
}
