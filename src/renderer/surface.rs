use super::construction::clamp_size;
use super::*;

impl<'a> Renderer<'a> {
    pub fn size(&self) -> (u32, u32) {
        self.physical_size
    }

    pub fn resize(&mut self, new_physical_size: (u32, u32)) {
        let new_physical_size = clamp_size(new_physical_size);
        self.physical_size = new_physical_size;
        self.config.width = new_physical_size.0;
        self.config.height = new_physical_size.1;

        self.uniforms.resolution[0] = new_physical_size.0 as f32;
        self.uniforms.resolution[1] = new_physical_size.1 as f32;
        self.uniforms.resolution[2] = new_physical_size.0 as f32 / new_physical_size.1 as f32;
        self.write_uniforms();

        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// Writes this frame's parameters into the uniform buffer.
    pub fn update_params(&mut self, params: &ShaderParams) {
        let mut params = params.clone();
        params.set_resolution(self.physical_size.0, self.physical_size.1);
        params.enforce_ranges();
        self.uniforms = params.to_uniforms();
        self.write_uniforms();
    }

    pub(super) fn write_uniforms(&self) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniforms]));
    }

    pub fn set_surface(&mut self, window: impl Into<SurfaceTarget<'a>>) -> Result<(), RenderError> {
        let surface = self.instance.create_surface(window)?;
        surface.configure(&self.device, &self.config);
        self.surface = Some(surface);
        Ok(())
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.config.present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }
}
