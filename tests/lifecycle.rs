use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::executor::block_on;
use hero_reveal::{
    mount, AssetManifest, CancellationToken, DirectorConfig, ElementRect, FrameRequestId,
    HostEnvironment, LoadError, MemorySource, MountError, PointerInput, SoftwareRenderer,
};
use hero_reveal_test_scenes::hero_source;
use lyon::math::point;

#[derive(Debug, Default, Clone, PartialEq)]
struct Calls {
    requested: Vec<u64>,
    cancelled: Vec<u64>,
    listeners_added: usize,
    listeners_removed: usize,
    attached: usize,
    detached: usize,
}

struct RecordingHost {
    calls: Rc<RefCell<Calls>>,
    next_id: u64,
    size: (u32, u32),
}

impl RecordingHost {
    fn new(size: (u32, u32)) -> (Self, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let host = Self {
            calls: calls.clone(),
            next_id: 0,
            size,
        };
        (host, calls)
    }
}

impl HostEnvironment for RecordingHost {
    fn request_frame(&mut self) -> FrameRequestId {
        self.next_id += 1;
        self.calls.borrow_mut().requested.push(self.next_id);
        FrameRequestId(self.next_id)
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        self.calls.borrow_mut().cancelled.push(id.0);
    }

    fn add_listeners(&mut self) {
        self.calls.borrow_mut().listeners_added += 1;
    }

    fn remove_listeners(&mut self) {
        self.calls.borrow_mut().listeners_removed += 1;
    }

    fn attach_surface(&mut self) {
        self.calls.borrow_mut().attached += 1;
    }

    fn detach_surface(&mut self) {
        self.calls.borrow_mut().detached += 1;
    }

    fn element_rect(&self) -> ElementRect {
        ElementRect::viewport(self.size.0 as f32, self.size.1 as f32)
    }

    fn physical_size(&self) -> (u32, u32) {
        self.size
    }
}

fn config() -> DirectorConfig {
    DirectorConfig {
        seed: Some(5),
        ..Default::default()
    }
}

#[test]
fn failed_load_leaves_the_host_untouched() {
    let (host, calls) = RecordingHost::new((32, 32));
    // Nothing is served: every mandatory layer is missing.
    let source = MemorySource::new();
    let result = block_on(mount(
        host,
        &source,
        &AssetManifest::default(),
        SoftwareRenderer::new((32, 32)),
        config(),
        CancellationToken::new(),
    ));

    assert!(matches!(
        result,
        Err(MountError::Load(LoadError::MissingMandatory(_)))
    ));
    assert_eq!(*calls.borrow(), Calls::default());
}

#[test]
fn cancelled_mount_requests_no_frame() {
    let (host, calls) = RecordingHost::new((32, 32));
    let (source, manifest) = hero_source(0);
    let token = CancellationToken::new();
    token.cancel();

    let result = block_on(mount(
        host,
        &source,
        &manifest,
        SoftwareRenderer::new((32, 32)),
        config(),
        token,
    ));
    assert!(matches!(result, Err(MountError::Load(LoadError::Cancelled))));
    assert!(calls.borrow().requested.is_empty());
}

#[test]
fn mount_wires_the_host_and_requests_one_frame() {
    let (host, calls) = RecordingHost::new((24, 16));
    let (source, manifest) = hero_source(2);
    let effect = block_on(mount(
        host,
        &source,
        &manifest,
        SoftwareRenderer::new((1, 1)),
        config(),
        CancellationToken::new(),
    ))
    .unwrap();

    {
        let calls = calls.borrow();
        assert_eq!(calls.attached, 1);
        assert_eq!(calls.listeners_added, 1);
        assert_eq!(calls.requested, vec![1]);
    }
    assert!(effect.is_mounted());
    assert_eq!(effect.effect().backend().size(), (24, 16));
    assert_eq!(effect.load_report().archive_decoded, 5);
}

#[test]
fn frames_run_until_unmounted_and_teardown_happens_once() {
    let (host, calls) = RecordingHost::new((16, 16));
    let (source, manifest) = hero_source(0);
    let mut effect = block_on(mount(
        host,
        &source,
        &manifest,
        SoftwareRenderer::new((16, 16)),
        config(),
        CancellationToken::new(),
    ))
    .unwrap();
    let reader = effect.store();

    effect.on_pointer(Duration::from_millis(8), PointerInput::Move(point(4.0, 12.0)));
    let snapshot = effect.on_frame(Duration::from_millis(16)).unwrap();
    assert!(snapshot.is_active);
    assert_eq!(reader.get(), snapshot);
    assert_eq!(calls.borrow().requested, vec![1, 2]);

    effect.unmount();
    effect.unmount();
    assert!(!effect.is_mounted());
    assert!(effect.on_frame(Duration::from_millis(32)).is_none());
    drop(effect);

    let calls = calls.borrow();
    assert_eq!(calls.cancelled, vec![2]);
    assert_eq!(calls.requested, vec![1, 2]);
    assert_eq!(calls.listeners_removed, 1);
    assert_eq!(calls.detached, 1);
}

#[test]
fn dropping_a_mounted_effect_tears_it_down() {
    let (host, calls) = RecordingHost::new((16, 16));
    let (source, manifest) = hero_source(0);
    let effect = block_on(mount(
        host,
        &source,
        &manifest,
        SoftwareRenderer::new((16, 16)),
        config(),
        CancellationToken::new(),
    ))
    .unwrap();
    drop(effect);

    let calls = calls.borrow();
    assert_eq!(calls.cancelled, vec![1]);
    assert_eq!(calls.listeners_removed, 1);
    assert_eq!(calls.detached, 1);
}

#[test]
fn resize_reads_the_host_geometry() {
    let (host, _calls) = RecordingHost::new((40, 20));
    let (source, manifest) = hero_source(0);
    let mut effect = block_on(mount(
        host,
        &source,
        &manifest,
        SoftwareRenderer::new((1, 1)),
        config(),
        CancellationToken::new(),
    ))
    .unwrap();

    effect.on_resize();
    let params = effect.effect().params();
    assert_eq!((params.width, params.height), (40, 20));
}
