//! Real-time organic cursor reveal over a layered hero portrait.
//!
//! A fluid mask follows the pointer, peeling a kit overlay away and lighting an
//! x-ray layer, while an autonomous director animates phantom swipes whenever
//! nobody is interacting. The compositor runs on the GPU through [`Renderer`]
//! or on the CPU through [`SoftwareRenderer`]; both share one procedure.

pub use wgpu;

pub mod compositor;
pub mod director;
mod effect;
mod error;
pub mod fluid;
mod input;
mod loader;
pub mod noise;
mod params;
pub mod phantom;
mod pipeline;
mod renderer;
pub mod sdf;
mod snapshot;
mod software;
mod texture_manager;
mod texture_set;
pub mod util;

pub use director::{DirectorConfig, InteractionDirector, MotionSource, TrailHistory};
pub use effect::{mount, FrameRequestId, HeroEffect, HostEnvironment, MountedEffect, RenderBackend};
pub use error::{LoadError, MountError, RenderError};
pub use input::{ElementRect, PointerInput};
#[cfg(feature = "network")]
pub use loader::HttpSource;
pub use loader::{
    archive_entry_index, load_texture_set, AssetManifest, AssetSource, CancellationToken, FsSource,
    LoadReport, MemorySource, ARCHIVE_YIELD_EVERY,
};
pub use params::{is_active_position, CompositorUniforms, ShaderParams, TrailSlot, INACTIVE_POSITION, TRAIL_LENGTH};
pub use phantom::{PhantomGenerator, PhantomSwipe, TimedEvent, TimedEventPool};
pub use renderer::{Renderer, OUTPUT_FORMAT};
pub use snapshot::{InteractionSnapshot, SnapshotStore};
pub use software::{premultiplied_bgra8, SoftwareRenderer};
pub use texture_manager::{TextureManager, TextureManagerError};
pub use texture_set::{DecodedImage, LayerPresence, LayerSampler, TextureRole, TextureSet, TextureSetBuilder};
