//! Runs the hero effect in a window on the GPU.
//!
//! `cargo run --example hero_window [asset-dir]` loads the default manifest
//! from `asset-dir`; without an argument the built-in test portrait is used.
//! Leave the pointer alone for a few seconds to watch phantom swipes.
use futures::executor::block_on;
use hero_reveal::{
    mount, AssetManifest, CancellationToken, DirectorConfig, ElementRect, FrameRequestId, FsSource,
    HostEnvironment, MountedEffect, PointerInput, Renderer,
};
use hero_reveal_test_scenes::hero_source;
use lyon::math::point;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::{TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

/// Frame requests map onto winit redraw requests.
struct WindowHost {
    window: Arc<Window>,
    next_frame: u64,
}

impl HostEnvironment for WindowHost {
    fn request_frame(&mut self) -> FrameRequestId {
        self.next_frame += 1;
        self.window.request_redraw();
        FrameRequestId(self.next_frame)
    }

    // A redraw already queued with winit cannot be withdrawn; the unmounted
    // effect ignores it.
    fn cancel_frame(&mut self, _id: FrameRequestId) {}

    fn add_listeners(&mut self) {}

    fn remove_listeners(&mut self) {}

    fn attach_surface(&mut self) {
        self.window.set_visible(true);
    }

    fn detach_surface(&mut self) {
        self.window.set_visible(false);
    }

    fn element_rect(&self) -> ElementRect {
        let size = self.window.inner_size();
        ElementRect::from_physical((size.width, size.height), self.window.scale_factor())
    }

    fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

#[derive(Default)]
struct App {
    effect: Option<MountedEffect<WindowHost, Renderer<'static>>>,
    window: Option<Arc<Window>>,
    started: Option<Instant>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("Hero reveal")
                        .with_transparent(true),
                )
                .unwrap(),
        );
        let window_size = window.inner_size();
        let renderer = block_on(Renderer::new(
            window.clone(),
            (window_size.width, window_size.height),
            true,
            true,
        ))
        .unwrap();

        let host = WindowHost {
            window: window.clone(),
            next_frame: 0,
        };
        let config = DirectorConfig::default();
        let token = CancellationToken::new();
        let mounted = match std::env::args().nth(1) {
            Some(dir) => block_on(mount(
                host,
                &FsSource::new(dir),
                &AssetManifest::default(),
                renderer,
                config,
                token,
            )),
            None => {
                let (source, manifest) = hero_source(0);
                block_on(mount(host, &source, &manifest, renderer, config, token))
            }
        };

        match mounted {
            Ok(effect) => {
                println!("Loaded: {:?}", effect.load_report());
                self.effect = Some(effect);
            }
            Err(e) => {
                eprintln!("Showing the static placeholder: {e}");
                event_loop.exit();
            }
        }
        self.window = Some(window);
        self.started = Some(Instant::now());
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = &self.window else { return };
        if window_id != window.id() {
            return;
        }
        let Some(effect) = &mut self.effect else { return };
        let now = self.started.map(|started| started.elapsed()).unwrap_or_default();
        let scale_factor = window.scale_factor();

        match event {
            WindowEvent::CloseRequested => {
                effect.unmount();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => effect.on_resize(),
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(scale_factor);
                effect.on_pointer(now, PointerInput::Move(point(logical.x, logical.y)));
            }
            WindowEvent::Touch(touch) => {
                let logical = touch.location.to_logical::<f32>(scale_factor);
                let position = point(logical.x, logical.y);
                match touch.phase {
                    TouchPhase::Started => effect.on_pointer(now, PointerInput::TouchStart(position)),
                    TouchPhase::Moved => effect.on_pointer(now, PointerInput::TouchMove(position)),
                    TouchPhase::Ended | TouchPhase::Cancelled => {}
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(snapshot) = effect.on_frame(now) {
                    if snapshot.is_active {
                        window.set_title(&format!(
                            "Hero reveal ({:.2}, {:.2}) intensity {:.2}",
                            snapshot.position.x, snapshot.position.y, snapshot.intensity
                        ));
                    }
                }
            }
            _ => {}
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let event_loop = EventLoop::new().expect("to start an event loop");
    let mut app = App::default();
    event_loop.run_app(&mut app).unwrap();
}
