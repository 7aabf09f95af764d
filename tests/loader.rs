use std::future::Future;
use std::pin::pin;
use std::task::{Context, Poll};

use futures::executor::block_on;
use futures::task::noop_waker_ref;
use hero_reveal::{
    load_texture_set, AssetManifest, CancellationToken, LoadError, MemorySource, TextureRole,
    ARCHIVE_YIELD_EVERY,
};
use hero_reveal_test_scenes::{base_png, hero_source, solid_png, ArchiveBuilder};

#[test]
fn loads_the_default_manifest() {
    let (source, manifest) = hero_source(0);
    let (textures, report) =
        block_on(load_texture_set(&source, &manifest, &CancellationToken::new())).unwrap();

    for role in TextureRole::MANDATORY {
        assert!(textures.get(role).is_some(), "{role} should be loaded");
    }
    assert!(textures.presence().marble);
    assert!(!textures.presence().depth);
    assert_eq!(report.archive_decoded, 3);
    assert!(report.absent.contains(&TextureRole::Gloss));
    assert!(!report.absent.contains(&TextureRole::Marble));
}

/// One corrupt entry among fifty is skipped; the load still succeeds.
#[test]
fn corrupt_archive_entry_is_skipped() {
    let manifest = AssetManifest::default();
    let mut archive = ArchiveBuilder::new()
        .png(1, 4, 4, [0, 255, 0, 255])
        .png(2, 4, 4, [0, 0, 0, 0])
        .entry("5.png", &base_png());
    for index in 6..53 {
        archive = if index == 17 {
            archive.corrupt(index)
        } else {
            archive.png(index, 2, 2, [1, 2, 3, 255])
        };
    }
    let archive_path = manifest.archive.clone().unwrap();
    let source = MemorySource::new().with(archive_path, archive.finish());

    let (textures, report) =
        block_on(load_texture_set(&source, &manifest, &CancellationToken::new())).unwrap();

    assert_eq!(report.archive_decoded, 49);
    assert_eq!(textures.archive_image_count(), 49);
    assert!(textures.archive_image(17).is_none());
    assert!(textures.archive_image(18).is_some());
    assert!(report.skipped.iter().any(|line| line.contains("17.png")));
}

#[test]
fn missing_xray_fails_the_load() {
    let manifest = AssetManifest {
        archive: None,
        archive_roles: Vec::new(),
        files: vec![
            (TextureRole::Base, "base.png".to_string()),
            (TextureRole::Overlay, "kit.png".to_string()),
            (TextureRole::XRay, "xray.png".to_string()),
        ],
    };
    // xray.png answers 404
    let source = MemorySource::new()
        .with("base.png", base_png())
        .with("kit.png", solid_png(2, 2, [0, 0, 0, 0]));

    let result = block_on(load_texture_set(&source, &manifest, &CancellationToken::new()));
    match result {
        Err(LoadError::MissingMandatory(roles)) => assert_eq!(roles, vec![TextureRole::XRay]),
        other => panic!("expected MissingMandatory, got {other:?}"),
    }
}

#[test]
fn individual_files_override_archive_entries() {
    let (mut source, mut manifest) = hero_source(0);
    manifest
        .files
        .push((TextureRole::XRay, "override/xray.png".to_string()));
    source.insert("override/xray.png", solid_png(3, 3, [255, 0, 255, 255]));

    let (textures, _) =
        block_on(load_texture_set(&source, &manifest, &CancellationToken::new())).unwrap();
    assert_eq!(textures.get(TextureRole::XRay).unwrap().dimensions(), (3, 3));
}

#[test]
fn cancelled_load_reports_cancellation() {
    let (source, manifest) = hero_source(8);
    let token = CancellationToken::new();
    token.cancel();
    let result = block_on(load_texture_set(&source, &manifest, &token));
    assert!(matches!(result, Err(LoadError::Cancelled)));
}

#[test]
fn unreadable_archive_is_not_fatal_when_files_cover_mandatory_layers() {
    let mut manifest = AssetManifest::default();
    manifest.files.extend([
        (TextureRole::Base, "base.png".to_string()),
        (TextureRole::Overlay, "kit.png".to_string()),
        (TextureRole::XRay, "xray.png".to_string()),
    ]);
    let source = MemorySource::new()
        .with(manifest.archive.clone().unwrap(), b"definitely not a zip".to_vec())
        .with("base.png", base_png())
        .with("kit.png", solid_png(2, 2, [0, 0, 0, 0]))
        .with("xray.png", solid_png(2, 2, [0, 255, 0, 255]));

    let (textures, report) =
        block_on(load_texture_set(&source, &manifest, &CancellationToken::new())).unwrap();
    assert_eq!(report.archive_decoded, 0);
    assert!(!report.skipped.is_empty());
    assert_eq!(textures.archive_image_count(), 0);
}

/// Polls `future` to completion by hand, calling `on_pending` with the running
/// count after every `Pending`. Returns the output and the number of yields.
fn drive<F: Future>(future: F, mut on_pending: impl FnMut(usize)) -> (F::Output, usize) {
    let mut future = pin!(future);
    let mut cx = Context::from_waker(noop_waker_ref());
    let mut pending = 0;
    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return (output, pending),
            Poll::Pending => {
                pending += 1;
                on_pending(pending);
            }
        }
    }
}

#[test]
fn cancelling_mid_decode_abandons_the_load() {
    let (source, manifest) = hero_source(40);
    let token = CancellationToken::new();
    let unmount = token.clone();

    // The third yield happens inside the archive entry loop.
    let (result, pending) = drive(load_texture_set(&source, &manifest, &token), |count| {
        if count == 3 {
            unmount.cancel();
        }
    });

    assert!(matches!(result, Err(LoadError::Cancelled)));
    assert_eq!(pending, 3);
    block_on(token.cancelled());
}

#[test]
fn archive_decode_yields_periodically() {
    let (small_source, manifest) = hero_source(0);
    let (small, small_yields) = drive(
        load_texture_set(&small_source, &manifest, &CancellationToken::new()),
        |_| {},
    );
    assert!(small.is_ok());

    let extra = 40;
    let (large_source, manifest) = hero_source(extra);
    let (large, large_yields) = drive(
        load_texture_set(&large_source, &manifest, &CancellationToken::new()),
        |_| {},
    );
    let (_, report) = large.unwrap();
    assert_eq!(report.archive_decoded, 3 + extra as usize);

    let entries = 3 + extra as usize;
    let in_loop = (entries - 1) / ARCHIVE_YIELD_EVERY;
    assert!(small_yields >= 3, "fetch, open and decode each yield");
    assert_eq!(large_yields, small_yields + in_loop);
}
