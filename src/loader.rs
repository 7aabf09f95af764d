//! Asset loading.
//!
//! The loader fetches every individual layer concurrently together with one
//! zip archive of numerically named images, then decodes the archive while
//! handing control back to the executor at fixed checkpoints. Every checkpoint
//! is guarded by a [`CancellationToken`], so a load abandoned by unmounting
//! never writes into torn-down state.
//!
//! Only missing mandatory layers fail a load. Any other fetch or decode
//! problem turns into an absent layer and a line in the [`LoadReport`].

use std::future::Future;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::task::Poll;

use ahash::{HashMap, HashMapExt};
use regex::Regex;
use tracing::{debug, error, info, warn};

/// Liveness token shared between a mounted effect and its pending load.
pub use tokio_util::sync::CancellationToken;

use crate::error::LoadError;
use crate::texture_set::{DecodedImage, TextureRole, TextureSet};

/// Number of archive entries decoded between two yields to the executor.
pub const ARCHIVE_YIELD_EVERY: usize = 4;

/// Upper bound on the buffer reserved up front from an entry's declared size.
const MAX_ENTRY_RESERVE: u64 = 64 << 20;

/// Where each layer comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetManifest {
    /// Path of the zip archive, if any.
    pub archive: Option<String>,
    /// Archive entry number to role, e.g. `5.png` is the base.
    pub archive_roles: Vec<(u32, TextureRole)>,
    /// Individually fetched layers. A file overrides an archive entry with the same role.
    pub files: Vec<(TextureRole, String)>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            archive: Some("hero/player-layers.zip".to_string()),
            archive_roles: vec![
                (5, TextureRole::Base),
                (2, TextureRole::Overlay),
                (1, TextureRole::XRay),
            ],
            files: vec![
                (TextureRole::Depth, "hero/depth.png".to_string()),
                (TextureRole::DepthLighten, "hero/depth-lighten.png".to_string()),
                (TextureRole::DepthDarken, "hero/depth-darken.png".to_string()),
                (TextureRole::Shadow, "hero/xray-shadow.png".to_string()),
                (TextureRole::KitDepth, "hero/kit-depth.png".to_string()),
                (TextureRole::Gloss, "hero/gloss-bw.png".to_string()),
                (TextureRole::Marble, "hero/marble.jpg".to_string()),
            ],
        }
    }
}

impl AssetManifest {
    fn role_for_archive_entry(&self, index: u32) -> Option<TextureRole> {
        self.archive_roles
            .iter()
            .find(|(entry, _)| *entry == index)
            .map(|(_, role)| *role)
    }
}

/// A path-addressable byte store (HTTP, filesystem, memory).
pub trait AssetSource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send;
}

/// Serves assets from memory. Useful for embedded assets and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, Arc<Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(path.into(), Arc::new(bytes));
    }

    pub fn with(mut self, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send {
        let found = self.entries.get(path).cloned();
        let path = path.to_string();
        async move {
            found
                .map(|bytes| bytes.as_ref().clone())
                .ok_or_else(|| LoadError::Fetch {
                    path,
                    message: "not found".to_string(),
                })
        }
    }
}

/// Reads assets relative to a directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FsSource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send {
        let full_path = self.root.join(path);
        let path = path.to_string();
        async move {
            std::fs::read(&full_path).map_err(|e| LoadError::Fetch {
                path,
                message: e.to_string(),
            })
        }
    }
}

/// Fetches assets over HTTP relative to a base URL.
#[cfg(feature = "network")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "network")]
impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[cfg(feature = "network")]
impl AssetSource for HttpSource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let client = self.client.clone();
        let path = path.to_string();
        async move {
            let fetch_error = |message: String| LoadError::Fetch {
                path: path.clone(),
                message,
            };
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| fetch_error(e.to_string()))?;
            if !response.status().is_success() {
                return Err(fetch_error(format!("HTTP error: {}", response.status())));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| fetch_error(e.to_string()))?;
            Ok(bytes.to_vec())
        }
    }
}

/// Fails with [`LoadError::Cancelled`] once `token` has been cancelled.
fn ensure_live(token: &CancellationToken) -> Result<(), LoadError> {
    if token.is_cancelled() {
        Err(LoadError::Cancelled)
    } else {
        Ok(())
    }
}

/// Bytes to reserve for an entry whose header declares `declared_size`.
///
/// The header is untrusted; `read_to_end` grows the buffer past the cap when
/// the entry really is that large.
fn entry_reserve(declared_size: u64) -> usize {
    declared_size.min(MAX_ENTRY_RESERVE) as usize
}

/// Hands control back to the executor once.
async fn yield_now() {
    let mut yielded = false;
    futures::future::poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}

/// Yields, then fails if the load was cancelled in the meantime.
async fn checkpoint(token: &CancellationToken) -> Result<(), LoadError> {
    yield_now().await;
    ensure_live(token)
}

/// What happened during a load, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Numerically named archive entries that decoded.
    pub archive_decoded: usize,
    /// Entries or files that failed to fetch or decode, with the reason.
    pub skipped: Vec<String>,
    /// Optional layers that ended up absent.
    pub absent: Vec<TextureRole>,
}

fn archive_entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:^|/)(\d+)\.(?:png|jpe?g|webp)$").expect("archive entry pattern")
    })
}

/// Extracts the number from an archive entry name such as `layers/5.png`.
pub fn archive_entry_index(name: &str) -> Option<u32> {
    archive_entry_pattern()
        .captures(name)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse().ok())
}

/// Decodes every numerically named entry, yielding every
/// [`ARCHIVE_YIELD_EVERY`] entries.
async fn decode_archive(
    bytes: Vec<u8>,
    token: &CancellationToken,
    report: &mut LoadReport,
) -> Result<Vec<(u32, DecodedImage)>, LoadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    checkpoint(token).await?;

    let mut decoded = Vec::with_capacity(archive.len());
    for entry_index in 0..archive.len() {
        if entry_index > 0 && entry_index % ARCHIVE_YIELD_EVERY == 0 {
            checkpoint(token).await?;
        }

        let (name, contents) = {
            let mut file = match archive.by_index(entry_index) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Skipping unreadable archive entry #{}: {}", entry_index, e);
                    report.skipped.push(format!("archive entry #{entry_index}: {e}"));
                    continue;
                }
            };
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut contents = Vec::with_capacity(entry_reserve(file.size()));
            if let Err(e) = file.read_to_end(&mut contents) {
                warn!("Skipping archive entry {}: {}", name, e);
                report.skipped.push(format!("{name}: {e}"));
                continue;
            }
            (name, contents)
        };

        let Some(number) = archive_entry_index(&name) else {
            debug!("Ignoring archive entry without a numeric name: {}", name);
            continue;
        };

        match DecodedImage::decode(&contents) {
            Ok(image) => decoded.push((number, image)),
            Err(e) => {
                warn!("Failed to decode archive entry {}: {}", name, e);
                report.skipped.push(format!("{name}: {e}"));
            }
        }
    }

    checkpoint(token).await?;
    Ok(decoded)
}

/// Loads every layer named by `manifest` from `source`.
///
/// Resolves to the texture set and a report, or to
/// [`LoadError::MissingMandatory`] / [`LoadError::Cancelled`].
pub async fn load_texture_set<S: AssetSource>(
    source: &S,
    manifest: &AssetManifest,
    token: &CancellationToken,
) -> Result<(TextureSet, LoadReport), LoadError> {
    let archive_fetch = async {
        match &manifest.archive {
            Some(path) => Some(source.fetch(path).await),
            None => None,
        }
    };
    let file_fetches = futures::future::join_all(
        manifest
            .files
            .iter()
            .map(|(role, path)| async move { (*role, path.as_str(), source.fetch(path).await) }),
    );

    let (archive_bytes, file_results) = futures::join!(archive_fetch, file_fetches);
    checkpoint(token).await?;

    let mut report = LoadReport::default();
    let mut builder = TextureSet::builder();

    match archive_bytes {
        Some(Ok(bytes)) => match decode_archive(bytes, token, &mut report).await {
            Ok(images) => {
                for (number, image) in images {
                    if let Some(role) = manifest.role_for_archive_entry(number) {
                        builder.insert_layer(role, image.clone());
                    }
                    builder.insert_archive_image(number, image);
                    report.archive_decoded += 1;
                }
            }
            Err(LoadError::Cancelled) => return Err(LoadError::Cancelled),
            Err(e) => {
                warn!("Archive could not be decoded: {}", e);
                report.skipped.push(e.to_string());
            }
        },
        Some(Err(e)) => {
            warn!("{}", e);
            report.skipped.push(e.to_string());
        }
        None => {}
    }

    for (count, (role, path, result)) in file_results.into_iter().enumerate() {
        if count > 0 && count % ARCHIVE_YIELD_EVERY == 0 {
            checkpoint(token).await?;
        }
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Layer {} unavailable: {}", role, e);
                report.skipped.push(e.to_string());
                continue;
            }
        };
        match DecodedImage::decode(&bytes) {
            Ok(image) => builder.insert_layer(role, image),
            Err(e) => {
                warn!("Failed to decode {} ({}): {}", path, role, e);
                report.skipped.push(format!("{path}: {e}"));
            }
        }
    }
    ensure_live(token)?;

    report.absent = TextureRole::ALL
        .into_iter()
        .filter(|role| !role.is_mandatory() && !builder.has(*role))
        .collect();

    match builder.build() {
        Ok(set) => {
            info!(
                "Loaded {} layers ({} archive images, {} skipped)",
                set.layers().count(),
                report.archive_decoded,
                report.skipped.len()
            );
            Ok((set, report))
        }
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn archive_entry_names_map_to_numbers() {
        assert_eq!(archive_entry_index("5.png"), Some(5));
        assert_eq!(archive_entry_index("layers/12.JPG"), Some(12));
        assert_eq!(archive_entry_index("1.webp"), Some(1));
        assert_eq!(archive_entry_index("__MACOSX/._5.png"), None);
        assert_eq!(archive_entry_index("player5.png"), None);
        assert_eq!(archive_entry_index("5.txt"), None);
    }

    #[test]
    fn default_manifest_maps_mandatory_roles_to_archive() {
        let manifest = AssetManifest::default();
        assert_eq!(manifest.role_for_archive_entry(5), Some(TextureRole::Base));
        assert_eq!(manifest.role_for_archive_entry(2), Some(TextureRole::Overlay));
        assert_eq!(manifest.role_for_archive_entry(1), Some(TextureRole::XRay));
        assert_eq!(manifest.role_for_archive_entry(3), None);
    }

    #[test]
    fn memory_source_reports_missing_paths() {
        let source = MemorySource::new().with("a.png", vec![1, 2, 3]);
        assert_eq!(block_on(source.fetch("a.png")).unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            block_on(source.fetch("b.png")),
            Err(LoadError::Fetch { .. })
        ));
    }

    #[test]
    fn cancelled_token_stops_at_first_checkpoint() {
        let token = CancellationToken::new();
        token.cancel();
        let source = MemorySource::new();
        let result = block_on(load_texture_set(&source, &AssetManifest::default(), &token));
        assert!(matches!(result, Err(LoadError::Cancelled)));
    }

    #[test]
    fn forged_entry_sizes_reserve_at_most_the_cap() {
        assert_eq!(entry_reserve(1024), 1024);
        assert_eq!(entry_reserve(u64::MAX), MAX_ENTRY_RESERVE as usize);
    }

    #[test]
    fn yield_now_completes_on_second_poll() {
        block_on(async {
            yield_now().await;
            yield_now().await;
        });
    }
}
