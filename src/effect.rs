//! Effect lifecycle: mounting, the per-frame loop, and teardown.
//!
//! The host environment owns the frame scheduler, the global input listeners
//! and the drawing surface. [`mount`] loads the layers, wires the host up and
//! requests the first frame; the returned [`MountedEffect`] drives every frame
//! after that and undoes all of it exactly once when unmounted or dropped.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::director::{DirectorConfig, InteractionDirector};
use crate::error::{MountError, RenderError};
use crate::input::{ElementRect, PointerInput};
use crate::loader::{load_texture_set, AssetManifest, AssetSource, CancellationToken, LoadReport};
use crate::params::ShaderParams;
use crate::renderer::Renderer;
use crate::snapshot::{InteractionSnapshot, SnapshotStore};
use crate::texture_set::{LayerPresence, TextureSet};

/// Something that can draw the compositor for a given parameter set.
pub trait RenderBackend {
    /// Makes `textures` available to subsequent draws, replacing earlier ones.
    fn upload(&mut self, textures: &TextureSet) -> Result<(), RenderError>;
    fn resize(&mut self, physical_size: (u32, u32));
    fn draw(&mut self, params: &ShaderParams) -> Result<(), RenderError>;
    /// Frees every GPU or CPU resource held for drawing.
    fn release(&mut self);
}

impl RenderBackend for Renderer<'_> {
    fn upload(&mut self, textures: &TextureSet) -> Result<(), RenderError> {
        self.upload_textures(textures)
    }

    fn resize(&mut self, physical_size: (u32, u32)) {
        Renderer::resize(self, physical_size);
    }

    fn draw(&mut self, params: &ShaderParams) -> Result<(), RenderError> {
        self.update_params(params);
        self.render()
    }

    fn release(&mut self) {
        Renderer::release(self);
    }
}

/// Handle of a pending animation-frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u64);

/// The page (or window) hosting the effect.
pub trait HostEnvironment {
    /// Schedules one call to [`MountedEffect::on_frame`] at the next display refresh.
    fn request_frame(&mut self) -> FrameRequestId;
    fn cancel_frame(&mut self, id: FrameRequestId);
    /// Registers global pointer, touch and resize listeners.
    fn add_listeners(&mut self);
    fn remove_listeners(&mut self);
    /// Inserts the drawing surface into the container.
    fn attach_surface(&mut self);
    fn detach_surface(&mut self);
    fn element_rect(&self) -> ElementRect;
    /// Surface size in physical pixels.
    fn physical_size(&self) -> (u32, u32);
}

/// Director, parameters and backend of one mounted effect.
pub struct HeroEffect<B: RenderBackend> {
    director: InteractionDirector,
    params: ShaderParams,
    backend: B,
    rect: ElementRect,
    store: SnapshotStore,
}

impl<B: RenderBackend> HeroEffect<B> {
    pub fn new(
        backend: B,
        presence: LayerPresence,
        config: DirectorConfig,
        rect: ElementRect,
        physical_size: (u32, u32),
    ) -> Self {
        let mut params = ShaderParams::new(physical_size.0, physical_size.1);
        params.presence = presence;
        params.reveal_radius = config.reveal_radius;
        Self {
            director: InteractionDirector::new(config),
            params,
            backend,
            rect,
            store: SnapshotStore::new(),
        }
    }

    /// Advances the director to `now`, draws, and publishes the snapshot.
    ///
    /// Draw failures are logged; the loop keeps running.
    pub fn frame(&mut self, now: Duration) -> InteractionSnapshot {
        let snapshot = self.director.update(now, &mut self.params);
        if let Err(e) = self.backend.draw(&self.params) {
            warn!("Frame draw failed: {}", e);
        }
        self.store.publish(snapshot);
        snapshot
    }

    pub fn on_pointer(&mut self, now: Duration, input: PointerInput) {
        let uv = self.rect.to_uv(input.position());
        self.director.pointer_moved(now, uv);
    }

    /// Only size-derived state changes; pointer, trail and phantoms carry over.
    pub fn on_resize(&mut self, rect: ElementRect, physical_size: (u32, u32)) {
        self.rect = rect;
        self.params.set_resolution(physical_size.0, physical_size.1);
        self.backend.resize(physical_size);
    }

    pub fn director(&self) -> &InteractionDirector {
        &self.director
    }

    pub fn params(&self) -> &ShaderParams {
        &self.params
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// A handle readers elsewhere in the UI can poll.
    pub fn store(&self) -> SnapshotStore {
        self.store.clone()
    }
}

/// A running effect. Dropping it unmounts.
pub struct MountedEffect<H: HostEnvironment, B: RenderBackend> {
    host: H,
    effect: HeroEffect<B>,
    report: LoadReport,
    token: CancellationToken,
    pending_frame: Option<FrameRequestId>,
    mounted: bool,
}

impl<H: HostEnvironment, B: RenderBackend> MountedEffect<H, B> {
    /// Runs one frame and schedules the next. Returns `None` once unmounted.
    pub fn on_frame(&mut self, now: Duration) -> Option<InteractionSnapshot> {
        if !self.mounted {
            return None;
        }
        self.pending_frame = None;
        let snapshot = self.effect.frame(now);
        self.pending_frame = Some(self.host.request_frame());
        Some(snapshot)
    }

    pub fn on_pointer(&mut self, now: Duration, input: PointerInput) {
        if self.mounted {
            self.effect.on_pointer(now, input);
        }
    }

    /// Re-reads the element rectangle and surface size from the host.
    pub fn on_resize(&mut self) {
        if self.mounted {
            let rect = self.host.element_rect();
            let size = self.host.physical_size();
            self.effect.on_resize(rect, size);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn effect(&self) -> &HeroEffect<B> {
        &self.effect
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn store(&self) -> SnapshotStore {
        self.effect.store()
    }

    /// Cancels the pending frame, releases backend resources, removes the
    /// listeners and detaches the surface. Later calls do nothing.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.token.cancel();

        if let Some(id) = self.pending_frame.take() {
            self.host.cancel_frame(id);
        }
        self.effect.backend.release();
        self.host.remove_listeners();
        self.host.detach_surface();
        debug!("Hero effect unmounted");
    }
}

impl<H: HostEnvironment, B: RenderBackend> Drop for MountedEffect<H, B> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Loads the layers and starts the effect.
///
/// On failure nothing is attached, no listener is registered and no frame is
/// requested; the caller shows its placeholder. Cancelling `token` abandons an
/// in-flight load with [`crate::LoadError::Cancelled`].
pub async fn mount<H, S, B>(
    mut host: H,
    source: &S,
    manifest: &AssetManifest,
    mut backend: B,
    config: DirectorConfig,
    token: CancellationToken,
) -> Result<MountedEffect<H, B>, MountError>
where
    H: HostEnvironment,
    S: AssetSource,
    B: RenderBackend,
{
    let (textures, report) = match load_texture_set(source, manifest, &token).await {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Hero effect not mounted: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = backend.upload(&textures) {
        error!("Hero effect not mounted: {}", e);
        backend.release();
        return Err(e.into());
    }

    host.attach_surface();
    host.add_listeners();
    let rect = host.element_rect();
    let physical_size = host.physical_size();
    backend.resize(physical_size);

    let effect = HeroEffect::new(backend, textures.presence(), config, rect, physical_size);
    let pending_frame = Some(host.request_frame());
    debug!(
        "Hero effect mounted at {}x{} ({} layers absent)",
        physical_size.0,
        physical_size.1,
        report.absent.len()
    );

    Ok(MountedEffect {
        host,
        effect,
        report,
        token,
        pending_frame,
        mounted: true,
    })
}
