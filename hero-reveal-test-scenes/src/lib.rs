pub mod archive;
pub mod expectations;
pub mod fixtures;
pub mod scene;

pub use archive::{solid_png, ArchiveBuilder};
pub use expectations::{check_pixels, pixel_rgba, Expected, PixelExpectation};
pub use fixtures::{
    base_png, hero_source, hero_texture_set, subject_color, CANVAS_HEIGHT, CANVAS_WIDTH,
};
pub use scene::{build_scenes, Scene};
