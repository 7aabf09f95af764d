//! Decoded image layers consumed by the compositor.

use ahash::HashMap;
use lyon::math::Point;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::LoadError;

/// The named role an image plays in the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureRole {
    /// Player base colour. Mandatory.
    Base,
    /// Kit overlay blended over the base. Mandatory.
    Overlay,
    /// Layer revealed by the spotlight. Mandatory.
    XRay,
    /// Shadow composited under the x-ray layer.
    Shadow,
    /// Grayscale parallax depth.
    Depth,
    /// Grayscale map that pushes depth forward.
    DepthLighten,
    /// Grayscale map that pulls depth back.
    DepthDarken,
    /// Grayscale map modulating the kit shine band.
    KitDepth,
    /// Black/white gloss layer driving the light sweep.
    Gloss,
    /// Tiling texture for the background bands.
    Marble,
}

impl TextureRole {
    pub const ALL: [TextureRole; 10] = [
        TextureRole::Base,
        TextureRole::Overlay,
        TextureRole::XRay,
        TextureRole::Shadow,
        TextureRole::Depth,
        TextureRole::DepthLighten,
        TextureRole::DepthDarken,
        TextureRole::KitDepth,
        TextureRole::Gloss,
        TextureRole::Marble,
    ];

    pub const MANDATORY: [TextureRole; 3] =
        [TextureRole::Base, TextureRole::Overlay, TextureRole::XRay];

    pub fn is_mandatory(self) -> bool {
        Self::MANDATORY.contains(&self)
    }

    /// Binding slot of this role in the compositor's layer bind group.
    pub fn binding(self) -> u32 {
        self as u32
    }

    /// Tiling layers are sampled with repeat addressing.
    pub fn tiles(self) -> bool {
        matches!(self, TextureRole::Marble)
    }
}

impl fmt::Display for TextureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextureRole::Base => "base",
            TextureRole::Overlay => "overlay",
            TextureRole::XRay => "x-ray",
            TextureRole::Shadow => "shadow",
            TextureRole::Depth => "depth",
            TextureRole::DepthLighten => "depth-lighten",
            TextureRole::DepthDarken => "depth-darken",
            TextureRole::KitDepth => "kit-depth",
            TextureRole::Gloss => "gloss",
            TextureRole::Marble => "marble",
        };
        f.write_str(name)
    }
}

/// Straight-alpha RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl DecodedImage {
    /// Returns `None` when the pixel buffer does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self {
            width,
            height,
            pixels: decoded.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn texel(&self, x: i64, y: i64, repeat: bool) -> [f32; 4] {
        let (w, h) = (self.width as i64, self.height as i64);
        let (x, y) = if repeat {
            (x.rem_euclid(w), y.rem_euclid(h))
        } else {
            (x.clamp(0, w - 1), y.clamp(0, h - 1))
        };
        let offset = ((y * w + x) * 4) as usize;
        let px = &self.pixels[offset..offset + 4];
        [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        ]
    }

    /// Bilinear sample at a UV coordinate (origin top-left), mirroring a
    /// linear-filtered GPU sampler with clamp or repeat addressing.
    pub fn sample(&self, uv: Point, repeat: bool) -> [f32; 4] {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.texel(x0, y0, repeat);
        let b = self.texel(x0 + 1, y0, repeat);
        let c = self.texel(x0, y0 + 1, repeat);
        let d = self.texel(x0 + 1, y0 + 1, repeat);

        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = a[i] + (b[i] - a[i]) * tx;
            let bottom = c[i] + (d[i] - c[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }
}

/// Which optional layers are present. Read by the compositor as `has_*` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerPresence {
    pub depth: bool,
    pub depth_lighten: bool,
    pub depth_darken: bool,
    pub shadow: bool,
    pub kit: bool,
    pub kit_depth: bool,
    pub gloss: bool,
    pub marble: bool,
}

/// Anything the compositor can sample layers from.
pub trait LayerSampler {
    fn has(&self, role: TextureRole) -> bool;

    /// Samples a layer; absent layers read as transparent black.
    fn sample(&self, role: TextureRole, uv: Point) -> [f32; 4];
}

/// Immutable bundle of decoded layers, built once by the loader.
#[derive(Debug, Clone, Default)]
pub struct TextureSet {
    layers: HashMap<TextureRole, DecodedImage>,
    archive_images: BTreeMap<u32, DecodedImage>,
}

impl TextureSet {
    pub fn builder() -> TextureSetBuilder {
        TextureSetBuilder::default()
    }

    pub fn get(&self, role: TextureRole) -> Option<&DecodedImage> {
        self.layers.get(&role)
    }

    pub fn layers(&self) -> impl Iterator<Item = (TextureRole, &DecodedImage)> {
        TextureRole::ALL
            .into_iter()
            .filter_map(|role| self.layers.get(&role).map(|image| (role, image)))
    }

    /// A numerically named archive entry, whether or not it was mapped to a role.
    pub fn archive_image(&self, index: u32) -> Option<&DecodedImage> {
        self.archive_images.get(&index)
    }

    pub fn archive_image_count(&self) -> usize {
        self.archive_images.len()
    }

    pub fn presence(&self) -> LayerPresence {
        LayerPresence {
            depth: self.has(TextureRole::Depth),
            depth_lighten: self.has(TextureRole::DepthLighten),
            depth_darken: self.has(TextureRole::DepthDarken),
            shadow: self.has(TextureRole::Shadow),
            kit: self.has(TextureRole::Overlay),
            kit_depth: self.has(TextureRole::KitDepth),
            gloss: self.has(TextureRole::Gloss),
            marble: self.has(TextureRole::Marble),
        }
    }

    pub fn missing_mandatory(&self) -> Vec<TextureRole> {
        TextureRole::MANDATORY
            .into_iter()
            .filter(|role| !self.has(*role))
            .collect()
    }
}

impl LayerSampler for TextureSet {
    fn has(&self, role: TextureRole) -> bool {
        self.layers.contains_key(&role)
    }

    fn sample(&self, role: TextureRole, uv: Point) -> [f32; 4] {
        match self.layers.get(&role) {
            Some(image) => image.sample(uv, role.tiles()),
            None => [0.0; 4],
        }
    }
}

#[derive(Debug, Default)]
pub struct TextureSetBuilder {
    layers: HashMap<TextureRole, DecodedImage>,
    archive_images: BTreeMap<u32, DecodedImage>,
}

impl TextureSetBuilder {
    pub fn layer(mut self, role: TextureRole, image: DecodedImage) -> Self {
        self.layers.insert(role, image);
        self
    }

    pub fn insert_layer(&mut self, role: TextureRole, image: DecodedImage) {
        self.layers.insert(role, image);
    }

    pub fn insert_archive_image(&mut self, index: u32, image: DecodedImage) {
        self.archive_images.insert(index, image);
    }

    pub fn has(&self, role: TextureRole) -> bool {
        self.layers.contains_key(&role)
    }

    /// Builds without checking mandatory layers.
    pub fn build_unchecked(self) -> TextureSet {
        TextureSet {
            layers: self.layers,
            archive_images: self.archive_images,
        }
    }

    /// Builds, failing when any mandatory layer is absent.
    pub fn build(self) -> Result<TextureSet, LoadError> {
        let set = self.build_unchecked();
        let missing = set.missing_mandatory();
        if missing.is_empty() {
            Ok(set)
        } else {
            Err(LoadError::MissingMandatory(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyon::math::point;

    fn checker() -> DecodedImage {
        DecodedImage::from_rgba(
            2,
            1,
            vec![
                0, 0, 0, 255, //
                255, 255, 255, 255,
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(DecodedImage::from_rgba(2, 2, vec![0; 4]).is_none());
        assert!(DecodedImage::from_rgba(0, 2, vec![]).is_none());
    }

    #[test]
    fn sample_hits_texel_centres() {
        let image = checker();
        assert_eq!(image.sample(point(0.25, 0.5), false)[0], 0.0);
        assert_eq!(image.sample(point(0.75, 0.5), false)[0], 1.0);
        let middle = image.sample(point(0.5, 0.5), false)[0];
        assert!((middle - 0.5).abs() < 1e-6);
    }

    #[test]
    fn repeat_wraps_and_clamp_saturates() {
        let image = checker();
        // Just past the right edge: clamp keeps white, repeat blends back toward black.
        assert_eq!(image.sample(point(1.0, 0.5), false)[0], 1.0);
        assert!(image.sample(point(1.0, 0.5), true)[0] < 1.0);
    }

    #[test]
    fn absent_layers_sample_transparent() {
        let set = TextureSet::builder().build_unchecked();
        assert_eq!(set.sample(TextureRole::Gloss, point(0.5, 0.5)), [0.0; 4]);
        assert!(!set.has(TextureRole::Gloss));
    }

    #[test]
    fn build_reports_every_missing_mandatory_role() {
        let result = TextureSet::builder()
            .layer(TextureRole::Base, DecodedImage::solid(1, 1, [255; 4]))
            .build();
        match result {
            Err(LoadError::MissingMandatory(missing)) => {
                assert_eq!(missing, vec![TextureRole::Overlay, TextureRole::XRay]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn presence_tracks_optional_layers() {
        let set = TextureSet::builder()
            .layer(TextureRole::Gloss, DecodedImage::solid(1, 1, [255; 4]))
            .layer(TextureRole::Depth, DecodedImage::solid(1, 1, [128, 128, 128, 255]))
            .build_unchecked();
        let presence = set.presence();
        assert!(presence.gloss);
        assert!(presence.depth);
        assert!(!presence.shadow);
        assert!(!presence.marble);
    }
}
