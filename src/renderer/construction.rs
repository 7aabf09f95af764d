use super::*;

impl<'a> Renderer<'a> {
    /// Creates a renderer presenting to `window`.
    ///
    /// With `transparent` set, a premultiplied composite alpha mode is used when
    /// the surface supports one, so uncovered pixels show the page behind.
    pub async fn new(
        window: impl Into<SurfaceTarget<'a>>,
        physical_size: (u32, u32),
        vsync: bool,
        transparent: bool,
    ) -> Result<Self, RenderError> {
        let size = clamp_size(physical_size);

        let instance = wgpu::Instance::new(&InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&device_descriptor())
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let alpha_mode = if transparent
            && surface_caps
                .alpha_modes
                .contains(&CompositeAlphaMode::PreMultiplied)
        {
            info!("Using PreMultiplied alpha mode for transparency");
            CompositeAlphaMode::PreMultiplied
        } else if transparent
            && surface_caps
                .alpha_modes
                .contains(&CompositeAlphaMode::PostMultiplied)
        {
            info!("Using PostMultiplied alpha mode for transparency");
            CompositeAlphaMode::PostMultiplied
        } else {
            if transparent {
                warn!("Transparency requested but no suitable alpha mode available, falling back to Opaque");
            }
            CompositeAlphaMode::Opaque
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: OUTPUT_FORMAT,
            width: size.0,
            height: size.1,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        Ok(Self::build_from_device(
            instance,
            Some(surface),
            device,
            queue,
            config,
        ))
    }

    /// Shared constructor: takes the wgpu primitives produced by `new()` or
    /// `try_new_headless()` and builds the full `Renderer`.
    fn build_from_device(
        instance: wgpu::Instance,
        surface: Option<wgpu::Surface<'a>>,
        device: wgpu::Device,
        queue: wgpu::Queue,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        let physical_size = (config.width, config.height);
        let uniforms = ShaderParams::new(physical_size.0, physical_size.1).to_uniforms();

        let uniform_bind_group_layout = create_uniform_bind_group_layout(&device);
        let layer_bind_group_layout = create_layer_bind_group_layout(&device);
        let uniform_buffer = create_uniform_buffer(&device, &uniforms);
        let uniform_bind_group =
            create_uniform_bind_group(&device, &uniform_bind_group_layout, &uniform_buffer);
        let pipeline = create_compositor_pipeline(
            &device,
            config.format,
            &uniform_bind_group_layout,
            &layer_bind_group_layout,
        );

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let texture_manager = TextureManager::new(device.clone(), queue.clone());
        let layer_bind_group = texture_manager.create_layer_bind_group(&layer_bind_group_layout);

        Self {
            physical_size,
            instance,
            surface,
            device,
            queue,
            config,
            pipeline,
            uniforms,
            uniform_buffer,
            uniform_bind_group,
            layer_bind_group_layout,
            layer_bind_group,
            texture_manager,
            rtb_offscreen_texture: None,
            rtb_readback_buffer: None,
            rtb_cached_size: (0, 0),
            readback_bytes: Vec::new(),
        }
    }

    /// Creates a headless renderer without a window surface.
    ///
    /// Use `render_to_buffer()` or `render_to_argb32()` to read back rendered
    /// pixels; `render()` draws into the offscreen target only.
    ///
    /// Returns `None` if no suitable GPU adapter is available, so tests can
    /// skip on machines without a GPU.
    pub async fn try_new_headless(physical_size: (u32, u32)) -> Option<Self> {
        match Self::new_headless(physical_size).await {
            Ok(renderer) => Some(renderer),
            Err(error) => {
                info!("Headless renderer unavailable: {error}");
                None
            }
        }
    }

    /// Creates a headless renderer, failing with [`RenderError::NoAdapter`]
    /// when no GPU adapter is available.
    pub async fn new_headless(physical_size: (u32, u32)) -> Result<Self, RenderError> {
        let size = clamp_size(physical_size);
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter.request_device(&device_descriptor()).await?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: OUTPUT_FORMAT,
            width: size.0,
            height: size.1,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: CompositeAlphaMode::PreMultiplied,
            view_formats: vec![],
        };

        Ok(Self::build_from_device(instance, None, device, queue, config))
    }

    /// Uploads every layer of `textures` and rebinds the layer group.
    pub fn upload_textures(&mut self, textures: &TextureSet) -> Result<(), RenderError> {
        self.texture_manager.upload_texture_set(textures)?;
        self.layer_bind_group = self
            .texture_manager
            .create_layer_bind_group(&self.layer_bind_group_layout);
        Ok(())
    }

    pub fn texture_manager(&self) -> &TextureManager {
        &self.texture_manager
    }

    /// Destroys GPU textures and readback resources. The layer group falls back
    /// to transparent textures until the next upload.
    pub fn release(&mut self) {
        self.texture_manager.release_all();
        self.layer_bind_group = self
            .texture_manager
            .create_layer_bind_group(&self.layer_bind_group_layout);
        if let Some(texture) = self.rtb_offscreen_texture.take() {
            texture.destroy();
        }
        if let Some(buffer) = self.rtb_readback_buffer.take() {
            buffer.destroy();
        }
        self.rtb_cached_size = (0, 0);
        self.readback_bytes = Vec::new();
    }
}

fn device_descriptor() -> wgpu::DeviceDescriptor<'static> {
    wgpu::DeviceDescriptor {
        label: None,
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
    }
}

/// Surfaces cannot be configured with a zero extent.
pub(super) fn clamp_size(size: (u32, u32)) -> (u32, u32) {
    (size.0.max(1), size.1.max(1))
}
