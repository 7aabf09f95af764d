use std::io::{Cursor, Write};

use image::{ImageFormat, Rgba, RgbaImage};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Encodes a single-colour PNG.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
    encode_png(&image)
}

pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encoding a PNG into memory cannot fail");
    bytes
}

/// Builds a zip archive in memory.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn entry(mut self, name: &str, bytes: &[u8]) -> Self {
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        self.writer
            .start_file(name, options)
            .expect("zip entry header");
        self.writer.write_all(bytes).expect("zip entry body");
        self
    }

    /// Adds `<index>.png` filled with `rgba`.
    pub fn png(self, index: u32, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let bytes = solid_png(width, height, rgba);
        self.entry(&format!("{index}.png"), &bytes)
    }

    pub fn image(self, index: u32, image: &RgbaImage) -> Self {
        let bytes = encode_png(image);
        self.entry(&format!("{index}.png"), &bytes)
    }

    /// Adds `<index>.png` whose body is not an image.
    pub fn corrupt(self, index: u32) -> Self {
        self.entry(&format!("{index}.png"), b"\x89PNG\r\n\x1a\nnot really")
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.writer.finish().expect("zip central directory").into_inner()
    }
}
