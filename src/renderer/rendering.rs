use super::*;

impl<'a> Renderer<'a> {
    pub(super) fn render_to_texture_view(&self, texture_view: &wgpu::TextureView) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Command Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("compositor_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.layer_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draws one frame with the last parameters passed to `update_params`.
    ///
    /// Presents to the window surface, or renders into the offscreen target
    /// when headless.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let Some(surface) = &self.surface else {
            let texture_view = self
                .ensure_offscreen_texture()
                .create_view(&wgpu::TextureViewDescriptor::default());
            self.render_to_texture_view(&texture_view);
            return Ok(());
        };

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Reconfigure and skip this frame
                surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };
        let texture_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render_to_texture_view(&texture_view);
        output.present();
        Ok(())
    }
}
