//! CPU rendition of the compositor, pixel for pixel the same math as
//! `compositor.wgsl`. Used where no GPU adapter exists and by the pixel tests.

use lyon::math::point;

use crate::compositor::{shade, Shaded};
use crate::effect::RenderBackend;
use crate::error::RenderError;
use crate::params::ShaderParams;
use crate::renderer::{bgra_to_argb32, OUTPUT_FORMAT};
use crate::texture_set::TextureSet;
use crate::util::clamp01;

pub struct SoftwareRenderer {
    physical_size: (u32, u32),
    textures: Option<TextureSet>,
    params: ShaderParams,
    /// Last frame drawn through [`RenderBackend::draw`], premultiplied BGRA8.
    frame: Vec<u8>,
}

impl SoftwareRenderer {
    /// Output layout matches the GPU renderer.
    pub const FORMAT: wgpu::TextureFormat = OUTPUT_FORMAT;

    pub fn new(physical_size: (u32, u32)) -> Self {
        let physical_size = (physical_size.0.max(1), physical_size.1.max(1));
        Self {
            physical_size,
            textures: None,
            params: ShaderParams::new(physical_size.0, physical_size.1),
            frame: Vec::new(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.physical_size
    }

    pub fn upload_textures(&mut self, textures: TextureSet) {
        self.params.presence = textures.presence();
        self.textures = Some(textures);
    }

    pub fn textures(&self) -> Option<&TextureSet> {
        self.textures.as_ref()
    }

    pub fn resize(&mut self, new_physical_size: (u32, u32)) {
        self.physical_size = (new_physical_size.0.max(1), new_physical_size.1.max(1));
        self.params
            .set_resolution(self.physical_size.0, self.physical_size.1);
    }

    pub fn update_params(&mut self, params: &ShaderParams) {
        self.params = params.clone();
        self.params
            .set_resolution(self.physical_size.0, self.physical_size.1);
        if let Some(textures) = &self.textures {
            self.params.presence = textures.presence();
        }
        self.params.enforce_ranges();
    }

    pub fn params(&self) -> &ShaderParams {
        &self.params
    }

    /// Straight-alpha RGBA of the pixel at `(x, y)`.
    pub fn shade_pixel(&self, x: u32, y: u32) -> Shaded {
        let Some(textures) = &self.textures else {
            return Shaded::Discarded;
        };
        let (width, height) = self.physical_size;
        let uv = point(
            (x as f32 + 0.5) / width as f32,
            (y as f32 + 0.5) / height as f32,
        );
        shade(textures, &self.params, uv)
    }

    /// Renders into `buffer` as tightly packed, premultiplied BGRA8 rows.
    pub fn render_to_buffer(&self, buffer: &mut Vec<u8>) {
        let (width, height) = self.physical_size;
        buffer.clear();
        buffer.reserve((width as usize) * (height as usize) * 4);
        for y in 0..height {
            for x in 0..width {
                buffer.extend_from_slice(&premultiplied_bgra8(self.shade_pixel(x, y)));
            }
        }
    }

    /// Renders into `out_pixels` as premultiplied `0xAARRGGBB` words.
    pub fn render_to_argb32(&self, out_pixels: &mut [u32]) -> Result<(), RenderError> {
        let (width, height) = self.physical_size;
        let needed_len = (width as usize) * (height as usize);
        if out_pixels.len() < needed_len {
            return Err(RenderError::Readback);
        }
        let mut bgra = Vec::new();
        self.render_to_buffer(&mut bgra);
        bgra_to_argb32(&bgra, &mut out_pixels[..needed_len]);
        Ok(())
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }
}

impl RenderBackend for SoftwareRenderer {
    fn upload(&mut self, textures: &TextureSet) -> Result<(), RenderError> {
        self.upload_textures(textures.clone());
        Ok(())
    }

    fn resize(&mut self, physical_size: (u32, u32)) {
        SoftwareRenderer::resize(self, physical_size);
    }

    fn draw(&mut self, params: &ShaderParams) -> Result<(), RenderError> {
        self.update_params(params);
        let mut frame = std::mem::take(&mut self.frame);
        self.render_to_buffer(&mut frame);
        self.frame = frame;
        Ok(())
    }

    fn release(&mut self) {
        self.textures = None;
        self.frame = Vec::new();
    }
}

fn to_byte(value: f32) -> u8 {
    (clamp01(value) * 255.0).round() as u8
}

/// Premultiplies a shaded pixel and packs it as BGRA8.
pub fn premultiplied_bgra8(shaded: Shaded) -> [u8; 4] {
    let [r, g, b, a] = shaded.to_rgba();
    let a = clamp01(a);
    [to_byte(b * a), to_byte(g * a), to_byte(r * a), to_byte(a)]
}
