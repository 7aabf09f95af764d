use crate::texture_set::TextureRole;

/// Errors surfaced by the asset loader.
///
/// Individual decode failures never appear here: they are converted into an
/// absent layer and recorded in [`crate::LoadReport`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("mandatory layers missing after load: {}", format_roles(.0))]
    MissingMandatory(Vec<TextureRole>),
    #[error("failed to fetch {path}: {message}")]
    Fetch { path: String, message: String },
    #[error("failed to open archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("load cancelled")]
    Cancelled,
}

/// Errors creating or driving the GPU backend.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("texture upload failed: {0}")]
    Texture(#[from] crate::texture_manager::TextureManagerError),
    #[error("failed to read back rendered pixels")]
    Readback,
}

/// Why [`crate::mount`] returned without starting a frame loop.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

fn format_roles(roles: &[TextureRole]) -> String {
    roles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
