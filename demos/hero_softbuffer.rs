//! Runs the hero effect on the CPU and presents it through softbuffer.
//!
//! No GPU is involved: every frame is shaded by the software renderer and its
//! premultiplied BGRA bytes are copied into the window as 0RGB words.
use futures::executor::block_on;
use hero_reveal::{
    mount, CancellationToken, DirectorConfig, ElementRect, FrameRequestId, HostEnvironment,
    MountedEffect, PointerInput, SoftwareRenderer,
};
use hero_reveal_test_scenes::hero_source;
use lyon::math::point;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

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

    fn cancel_frame(&mut self, _id: FrameRequestId) {}

    fn add_listeners(&mut self) {}

    fn remove_listeners(&mut self) {}

    fn attach_surface(&mut self) {}

    fn detach_surface(&mut self) {}

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
    window: Option<Arc<Window>>,
    effect: Option<MountedEffect<WindowHost, SoftwareRenderer>>,
    softbuffer_context: Option<softbuffer::Context<Arc<Window>>>,
    softbuffer_surface: Option<softbuffer::Surface<Arc<Window>, Arc<Window>>>,
    started: Option<Instant>,
    frame_count: u64,
}

fn resize_surface(
    surface: &mut softbuffer::Surface<Arc<Window>, Arc<Window>>,
    size: PhysicalSize<u32>,
) {
    if let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
    {
        surface.resize(width, height).unwrap();
    }
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
                        .with_title("Hero reveal (software)")
                        .with_inner_size(PhysicalSize::new(480, 480)),
                )
                .unwrap(),
        );
        let size = window.inner_size();

        let softbuffer_context = softbuffer::Context::new(window.clone()).unwrap();
        let mut softbuffer_surface =
            softbuffer::Surface::new(&softbuffer_context, window.clone()).unwrap();
        resize_surface(&mut softbuffer_surface, size);

        let host = WindowHost {
            window: window.clone(),
            next_frame: 0,
        };
        let (source, manifest) = hero_source(0);
        let effect = block_on(mount(
            host,
            &source,
            &manifest,
            SoftwareRenderer::new((size.width, size.height)),
            DirectorConfig::default(),
            CancellationToken::new(),
        ))
        .unwrap();

        self.window = Some(window);
        self.effect = Some(effect);
        self.softbuffer_context = Some(softbuffer_context);
        self.softbuffer_surface = Some(softbuffer_surface);
        self.started = Some(Instant::now());
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = &self.window else { return };
        let Some(effect) = &mut self.effect else { return };
        let Some(softbuffer_surface) = &mut self.softbuffer_surface else {
            return;
        };
        if window_id != window.id() {
            return;
        }
        let now = self.started.map(|started| started.elapsed()).unwrap_or_default();

        match event {
            WindowEvent::CloseRequested => {
                effect.unmount();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                resize_surface(softbuffer_surface, physical_size);
                effect.on_resize();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(window.scale_factor());
                effect.on_pointer(now, PointerInput::Move(point(logical.x, logical.y)));
            }
            WindowEvent::RedrawRequested => {
                let render_start = Instant::now();
                if effect.on_frame(now).is_none() {
                    return;
                }
                let frame = effect.effect().backend().frame();

                let mut buffer = softbuffer_surface.buffer_mut().unwrap();
                for (word, bgra) in buffer.iter_mut().zip(frame.chunks_exact(4)) {
                    *word = u32::from_le_bytes([bgra[0], bgra[1], bgra[2], 0]);
                }
                buffer.present().unwrap();

                self.frame_count += 1;
                if self.frame_count % 60 == 0 {
                    println!(
                        "Frame {}: shade + present {:?}",
                        self.frame_count,
                        render_start.elapsed()
                    );
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
