use super::*;

/// Rows copied out of a texture must be aligned to this many bytes.
const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

pub(crate) fn compute_padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> (u32, u32) {
    let unpadded_bytes_per_row = width * bytes_per_pixel;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT)
        * COPY_BYTES_PER_ROW_ALIGNMENT;
    (unpadded_bytes_per_row, padded_bytes_per_row)
}

fn copy_padded_readback_rows(
    data: &[u8],
    height: u32,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    output: &mut Vec<u8>,
) {
    let output_size = (unpadded_bytes_per_row * height) as usize;
    output.resize(output_size, 0);

    if padded_bytes_per_row == unpadded_bytes_per_row {
        output.copy_from_slice(&data[..output_size]);
        return;
    }

    for row in 0..height {
        let padded_offset = (row * padded_bytes_per_row) as usize;
        let unpadded_offset = (row * unpadded_bytes_per_row) as usize;
        let row_data = &data[padded_offset..padded_offset + unpadded_bytes_per_row as usize];
        output[unpadded_offset..unpadded_offset + unpadded_bytes_per_row as usize]
            .copy_from_slice(row_data);
    }
}

/// Packs premultiplied BGRA8 bytes into `0xAARRGGBB` words.
pub(crate) fn bgra_to_argb32(bgra: &[u8], out_pixels: &mut [u32]) {
    for (pixel, word) in bgra.chunks_exact(4).zip(out_pixels.iter_mut()) {
        *word = u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
    }
}

impl<'a> Renderer<'a> {
    pub(super) fn ensure_offscreen_texture(&mut self) -> &wgpu::Texture {
        let size = self.physical_size;
        if self.rtb_cached_size != size {
            if let Some(texture) = self.rtb_offscreen_texture.take() {
                texture.destroy();
            }
            self.rtb_readback_buffer = None;
            self.rtb_cached_size = size;
        }
        self.rtb_offscreen_texture.get_or_insert_with(|| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("rtb_offscreen_texture"),
                size: wgpu::Extent3d {
                    width: size.0,
                    height: size.1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OUTPUT_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        })
    }

    fn map_readback_buffer_into(
        device: &wgpu::Device,
        buffer: &wgpu::Buffer,
        mapped_bytes: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        mapped_bytes.clear();

        let buffer_slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            if sender.send(result).is_err() {
                warn!("Failed to send map_async result from callback");
            }
        });

        if let Err(error) = device.poll(wgpu::PollType::Wait) {
            warn!("Device poll failed during readback: {error}");
        }

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!("Failed to map readback buffer: {:?}", error);
                return Err(RenderError::Readback);
            }
            Err(error) => {
                warn!("Failed to receive mapped buffer result: {}", error);
                return Err(RenderError::Readback);
            }
        }

        let mapped_range = buffer_slice.get_mapped_range();
        mapped_bytes.extend_from_slice(&mapped_range);
        drop(mapped_range);
        buffer.unmap();
        Ok(())
    }

    /// Renders one frame offscreen and copies it into `buffer` as tightly
    /// packed, premultiplied BGRA8 rows.
    pub fn render_to_buffer(&mut self, buffer: &mut Vec<u8>) -> Result<(), RenderError> {
        let (width, height) = self.physical_size;

        let texture_view = self
            .ensure_offscreen_texture()
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render_to_texture_view(&texture_view);

        let (unpadded_bytes_per_row, padded_bytes_per_row) = compute_padded_bytes_per_row(width, 4);
        let buffer_size = (padded_bytes_per_row * height) as u64;

        let device = self.device.clone();
        let output_buffer = self.rtb_readback_buffer.get_or_insert_with(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("rtb_readback_buffer"),
                size: buffer_size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        });

        let Some(offscreen_texture) = self.rtb_offscreen_texture.as_ref() else {
            return Err(RenderError::Readback);
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("copy_texture_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: offscreen_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let mut readback_bytes = std::mem::take(&mut self.readback_bytes);
        let mapped = Self::map_readback_buffer_into(&self.device, output_buffer, &mut readback_bytes);
        let required_readback_len = (height as usize).saturating_mul(padded_bytes_per_row as usize);
        if mapped.is_ok() && readback_bytes.len() >= required_readback_len {
            copy_padded_readback_rows(
                &readback_bytes,
                height,
                unpadded_bytes_per_row,
                padded_bytes_per_row,
                buffer,
            );
        }
        self.readback_bytes = readback_bytes;
        mapped
    }

    /// Renders one frame offscreen into `out_pixels` as premultiplied
    /// `0xAARRGGBB` words, the layout softbuffer expects.
    pub fn render_to_argb32(&mut self, out_pixels: &mut [u32]) -> Result<(), RenderError> {
        let (width, height) = self.physical_size;
        let needed_len = (width as usize) * (height as usize);
        if out_pixels.len() < needed_len {
            warn!(
                "render_to_argb32: output slice too small: {} < {}",
                out_pixels.len(),
                needed_len
            );
            return Err(RenderError::Readback);
        }

        let mut bgra = Vec::with_capacity(needed_len * 4);
        self.render_to_buffer(&mut bgra)?;
        bgra_to_argb32(&bgra, &mut out_pixels[..needed_len]);
        Ok(())
    }
}
