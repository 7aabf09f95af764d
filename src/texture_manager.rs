use crate::pipeline::{CLAMP_SAMPLER_BINDING, REPEAT_SAMPLER_BINDING};
use crate::texture_set::{TextureRole, TextureSet};
use ahash::{HashMap, HashMapExt};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TextureManagerError {
    #[error("texture for {0} is not allocated")]
    TextureNotFound(TextureRole),
    #[error("expected {expected} bytes for {role}, got {actual}")]
    DataSizeMismatch {
        role: TextureRole,
        expected: usize,
        actual: usize,
    },
}

/// GPU-resident copies of the layer images, one texture per [`TextureRole`].
///
/// Roles without a texture are bound to a shared 1x1 transparent fallback, so
/// the layer bind group is always complete. Straight-alpha `Rgba8Unorm` data
/// is uploaded as-is; the compositor premultiplies its own output.
///
/// The manager is cheap to clone; clones share storage.
#[derive(Clone)]
pub struct TextureManager {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    clamp_sampler: Arc<wgpu::Sampler>,
    repeat_sampler: Arc<wgpu::Sampler>,
    fallback: Arc<wgpu::Texture>,
    texture_storage: Arc<RwLock<HashMap<TextureRole, wgpu::Texture>>>,
}

const LAYER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

impl TextureManager {
    pub(crate) fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let clamp_sampler = Self::create_sampler(&device, wgpu::AddressMode::ClampToEdge);
        let repeat_sampler = Self::create_sampler(&device, wgpu::AddressMode::Repeat);
        let fallback = Self::create_texture(&device, (1, 1), Some("fallback_transparent_texture"));
        Self::write_image_bytes_to_texture(&queue, &fallback, (1, 1), &[0, 0, 0, 0]);

        Self {
            device,
            queue,
            clamp_sampler: Arc::new(clamp_sampler),
            repeat_sampler: Arc::new(repeat_sampler),
            fallback: Arc::new(fallback),
            texture_storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn create_sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
        device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        })
    }

    fn create_texture(
        device: &wgpu::Device,
        texture_dimensions: (u32, u32),
        label: Option<&str>,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: texture_dimensions.0,
                height: texture_dimensions.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: LAYER_FORMAT,
            // TEXTURE_BINDING to sample in the shader, COPY_DST to upload
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    /// Allocates an RGBA8 texture for `role`, replacing any previous one.
    pub fn allocate_texture(&self, role: TextureRole, texture_dimensions: (u32, u32)) {
        let texture = Self::create_texture(&self.device, texture_dimensions, Some("layer_texture"));
        self.texture_storage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(role, texture);
    }

    /// Allocates a texture for `role` and uploads `texture_data` into it.
    pub fn allocate_texture_with_data(
        &self,
        role: TextureRole,
        texture_dimensions: (u32, u32),
        texture_data: &[u8],
    ) -> Result<(), TextureManagerError> {
        self.allocate_texture(role, texture_dimensions);
        self.load_data_into_texture(role, texture_dimensions, texture_data)
    }

    /// Uploads straight-alpha RGBA8 data into an allocated texture.
    pub fn load_data_into_texture(
        &self,
        role: TextureRole,
        texture_dimensions: (u32, u32),
        texture_data: &[u8],
    ) -> Result<(), TextureManagerError> {
        let expected = (texture_dimensions.0 as usize) * (texture_dimensions.1 as usize) * 4;
        if texture_data.len() != expected {
            return Err(TextureManagerError::DataSizeMismatch {
                role,
                expected,
                actual: texture_data.len(),
            });
        }

        let texture_storage = self
            .texture_storage
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let texture = texture_storage
            .get(&role)
            .ok_or(TextureManagerError::TextureNotFound(role))?;

        Self::write_image_bytes_to_texture(&self.queue, texture, texture_dimensions, texture_data);
        Ok(())
    }

    /// Uploads every layer of `textures`. Previously uploaded layers are released first.
    pub fn upload_texture_set(&self, textures: &TextureSet) -> Result<(), TextureManagerError> {
        self.release_all();
        for (role, image) in textures.layers() {
            self.allocate_texture_with_data(role, image.dimensions(), image.pixels())?;
        }
        debug!("Uploaded {} layer textures", self.loaded_count());
        Ok(())
    }

    fn write_image_bytes_to_texture(
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        texture_dimensions: (u32, u32),
        texture_data_bytes: &[u8],
    ) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texture_data_bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * texture_dimensions.0),
                rows_per_image: Some(texture_dimensions.1),
            },
            wgpu::Extent3d {
                width: texture_dimensions.0,
                height: texture_dimensions.1,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Builds the layer bind group against `layout`, substituting the fallback
    /// texture for missing roles.
    pub(crate) fn create_layer_bind_group(&self, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        let storage = self
            .texture_storage
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let views: Vec<(u32, wgpu::TextureView)> = TextureRole::ALL
            .iter()
            .map(|role| {
                let texture = storage.get(role).unwrap_or(&self.fallback);
                (
                    role.binding(),
                    texture.create_view(&wgpu::TextureViewDescriptor::default()),
                )
            })
            .collect();

        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: CLAMP_SAMPLER_BINDING,
            resource: wgpu::BindingResource::Sampler(&self.clamp_sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: REPEAT_SAMPLER_BINDING,
            resource: wgpu::BindingResource::Sampler(&self.repeat_sampler),
        });

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some("compositor_layer_bind_group"),
        })
    }

    pub fn is_texture_loaded(&self, role: TextureRole) -> bool {
        self.texture_storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&role)
    }

    pub fn loaded_count(&self) -> usize {
        self.texture_storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Destroys every layer texture. The fallback stays alive until the manager is dropped.
    pub fn release_all(&self) {
        let mut storage = self
            .texture_storage
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, texture) in storage.drain() {
            texture.destroy();
        }
    }
}
