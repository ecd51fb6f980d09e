//! Image / Attachment Resolver
//!
//! Turns `![title](path)` matches into attachments:
//!
//! 1. Resolve the path: http(s) URLs are remote; everything else is a file
//!    relative to the project root (or, for bundle notes, to the note's own
//!    directory with an `assets/` fallback).
//! 2. Remote images, PNGs, and video frames go through the on-disk cache at
//!    `<project root>/.cache/<percent-encoded path>`.
//! 3. Decode, then size against the configured target width.
//!
//! Resolution runs on a pool of [`WORKER_COUNT`] threads. Installing a
//! result into the document happens on the owning thread via [`install`],
//! which drops the result if the markdown it came from is gone.

use super::attachments::{
    create_dir_tolerant, AttachmentKind, AttachmentRecord, ImageSource, PLACEHOLDER,
};
use crate::config::ImageWidth;
use crate::document::{AttributeValue, Document};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::fs;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum number of images resolved concurrently.
pub const WORKER_COUNT: usize = 3;

/// Cache directory name inside the project root.
pub const CACHE_DIR_NAME: &str = ".cache";

/// Asset directory convention for bundle notes.
pub const BUNDLE_ASSETS_DIR: &str = "assets";

/// Position of the frame taken from videos.
pub const VIDEO_FRAME_TIMESTAMP: &str = "00:00:00";

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "avi", "mkv", "webm"];

// ─────────────────────────────────────────────────────────────────────────────
// Injection points
// ─────────────────────────────────────────────────────────────────────────────

/// Downloads remote image bytes.
pub trait RemoteFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetch using the platform's default timeouts.
#[derive(Debug, Clone)]
pub struct UreqFetcher {
    user_agent: String,
}

impl Default for UreqFetcher {
    fn default() -> Self {
        Self {
            user_agent: format!("notestyle/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RemoteFetcher for UreqFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_error = |message: String| Error::Fetch {
            url: url.to_string(),
            message,
        };

        let mut body = ureq::get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| fetch_error(e.to_string()))?
            .into_body();

        let mut bytes = Vec::new();
        body.as_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))?;
        Ok(bytes)
    }
}

/// Produces a PNG still from a video file.
pub trait VideoFrameExtractor: Send + Sync {
    fn extract_frame(&self, video: &Path) -> Result<Vec<u8>>;
}

/// Grabs one frame with the `ffmpeg` command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    program: PathBuf,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegExtractor {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl VideoFrameExtractor for FfmpegExtractor {
    fn extract_frame(&self, video: &Path) -> Result<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(["-v", "error", "-ss", VIDEO_FRAME_TIMESTAMP, "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .output()
            .map_err(|e| Error::VideoFrame {
                path: video.to_path_buf(),
                message: format!("failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(Error::VideoFrame {
                path: video.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Where relative paths resolve and how big images should be.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveContext {
    pub project_root: PathBuf,
    pub note_dir: PathBuf,
    /// Self-contained note directory with its own `assets/`
    pub is_bundle: bool,
    pub target_width: ImageWidth,
}

impl ResolveContext {
    pub fn cache_dir(&self) -> PathBuf {
        self.project_root.join(CACHE_DIR_NAME)
    }
}

/// One image to resolve, with the markdown it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Range of the `![title](path)` source at dispatch time
    pub range: Range<usize>,
    /// The markdown source text at `range` at dispatch time
    pub source_text: String,
    pub title: String,
    pub raw_path: String,
    /// Document revision `range` was taken at
    pub revision: u64,
}

/// A finished resolution.
#[derive(Debug)]
pub struct ImageOutcome {
    pub request: ImageRequest,
    pub result: Result<AttachmentRecord>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves image requests to attachment records.
#[derive(Clone)]
pub struct ImageResolver {
    fetcher: Arc<dyn RemoteFetcher>,
    frames: Arc<dyn VideoFrameExtractor>,
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new(
            Arc::new(UreqFetcher::default()),
            Arc::new(FfmpegExtractor::default()),
        )
    }
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver").finish_non_exhaustive()
    }
}

impl ImageResolver {
    pub fn new(fetcher: Arc<dyn RemoteFetcher>, frames: Arc<dyn VideoFrameExtractor>) -> Self {
        Self { fetcher, frames }
    }

    /// Resolve, load (through the cache where applicable), decode, and size.
    pub fn resolve(&self, request: &ImageRequest, ctx: &ResolveContext) -> Result<AttachmentRecord> {
        let source = resolve_source(&request.raw_path, ctx)?;
        let is_video = has_extension(&request.raw_path, VIDEO_EXTENSIONS);
        let cacheable = source.is_remote() || is_video || has_extension(&request.raw_path, &["png"]);
        let cache_path = cacheable.then(|| ctx.cache_dir().join(cache_file_name(&source, is_video)));

        let (bytes, cache_path) = match cache_path {
            Some(path) if path.is_file() => {
                debug!("Image cache hit: {}", path.display());
                (fs::read(&path)?, Some(path))
            }
            Some(path) => {
                debug!("Image cache miss: {}", request.raw_path);
                let bytes = self.load(&source, is_video)?;
                let stored = store_in_cache(ctx, &path, &bytes);
                (bytes, stored.then_some(path))
            }
            None => (self.load(&source, is_video)?, None),
        };

        let decoded = image::load_from_memory(&bytes).map_err(|source| Error::ImageDecode {
            path: request.raw_path.clone(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let natural_size = [rgba.width() as usize, rgba.height() as usize];
        let image = egui::ColorImage::from_rgba_unmultiplied(natural_size, rgba.as_raw());

        Ok(AttachmentRecord {
            title: request.title.clone(),
            raw_path: request.raw_path.clone(),
            source,
            cache_path,
            kind: if is_video {
                AttachmentKind::VideoFrame
            } else {
                AttachmentKind::Image
            },
            natural_size,
            display_size: display_size(natural_size, ctx.target_width),
            image: Arc::new(image),
        })
    }

    fn load(&self, source: &ImageSource, is_video: bool) -> Result<Vec<u8>> {
        match (source, is_video) {
            (ImageSource::Remote(url), false) => self.fetcher.fetch(url),
            (ImageSource::Remote(url), true) => Err(Error::UnsupportedSource(url.clone())),
            (ImageSource::Local(path), true) => self.frames.extract_frame(path),
            (ImageSource::Local(path), false) => Ok(fs::read(path)?),
        }
    }
}

/// Decide where an image path points.
pub fn resolve_source(raw_path: &str, ctx: &ResolveContext) -> Result<ImageSource> {
    let trimmed = raw_path.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(ImageSource::Remote(trimmed.to_string()));
    }
    if trimmed.is_empty() || (lower.contains("://") && !lower.starts_with("file://")) {
        return Err(Error::UnsupportedSource(raw_path.to_string()));
    }

    let local = if lower.starts_with("file://") {
        &trimmed["file://".len()..]
    } else {
        trimmed
    };
    let decoded = urlencoding::decode(local)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| local.to_string());
    let path = PathBuf::from(decoded);
    if path.is_absolute() {
        return Ok(ImageSource::Local(path));
    }

    if ctx.is_bundle {
        let direct = ctx.note_dir.join(&path);
        if direct.exists() {
            return Ok(ImageSource::Local(direct));
        }
        return Ok(ImageSource::Local(ctx.note_dir.join(BUNDLE_ASSETS_DIR).join(path)));
    }
    Ok(ImageSource::Local(ctx.project_root.join(path)))
}

/// Scale down to `target` width keeping aspect ratio; never scale up.
pub fn display_size(natural: [usize; 2], target: ImageWidth) -> egui::Vec2 {
    let (width, height) = (natural[0] as f32, natural[1] as f32);
    match target {
        ImageWidth::Fixed(max) if width > max && width > 0.0 => {
            egui::vec2(max, height * max / width)
        }
        _ => egui::vec2(width, height),
    }
}

/// Flat cache file name for a resolved source: the URL, or the absolute path.
pub fn cache_file_name(source: &ImageSource, is_video: bool) -> String {
    let key = match source {
        ImageSource::Remote(url) => url.clone(),
        ImageSource::Local(path) => path.to_string_lossy().into_owned(),
    };
    let encoded = urlencoding::encode(&key).into_owned();
    if is_video {
        format!("{}.png", encoded)
    } else {
        encoded
    }
}

fn has_extension(raw_path: &str, extensions: &[&str]) -> bool {
    let without_query = raw_path.split(['?', '#']).next().unwrap_or(raw_path);
    Path::new(without_query)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn store_in_cache(ctx: &ResolveContext, path: &Path, bytes: &[u8]) -> bool {
    let result = create_dir_tolerant(&ctx.cache_dir()).and_then(|()| fs::write(path, bytes));
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to cache image {}: {}", path.display(), e);
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Install
// ─────────────────────────────────────────────────────────────────────────────

/// What [`install`] did with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    /// The markdown was replaced by a placeholder at this range
    Installed(Range<usize>),
    /// The markdown source no longer exists
    Stale,
    /// Resolution failed; the markdown was left alone
    Failed,
}

/// Splice a resolved image into `doc`, replacing its markdown source.
pub fn install(doc: &mut Document, outcome: ImageOutcome) -> InstallResult {
    let ImageOutcome { request, result } = outcome;
    let record = match result {
        Ok(record) => record,
        Err(e) => {
            warn!("Failed to resolve image {}: {}", request.raw_path, e);
            return InstallResult::Failed;
        }
    };

    let Some(range) = locate_source(doc, &request) else {
        debug!("Dropping image {}: source text is gone", request.raw_path);
        return InstallResult::Stale;
    };

    let outcome = doc.replace_range(range, PLACEHOLDER.encode_utf8(&mut [0; 4]));
    doc.set_attribute(
        outcome.inserted.clone(),
        AttributeValue::Attachment(Arc::new(record)),
    );
    info!("Installed image {}", request.raw_path);
    InstallResult::Installed(outcome.inserted)
}

/// Current range of the request's markdown, carried across later edits.
///
/// Any edit that touched the source itself makes the request stale, even if
/// identical markdown exists elsewhere in the note.
fn locate_source(doc: &Document, request: &ImageRequest) -> Option<Range<usize>> {
    let range = doc.map_range(request.range.clone(), request.revision)?;
    (doc.substring(range.clone()) == Some(request.source_text.as_str())).then_some(range)
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker pool
// ─────────────────────────────────────────────────────────────────────────────

type Task = (ImageRequest, Arc<ResolveContext>);

/// Bounded pool resolving images off the document thread.
#[derive(Debug)]
pub struct ImageResolverPool {
    tasks: Sender<Task>,
    completed: Receiver<ImageOutcome>,
    pending: usize,
    _workers: Vec<JoinHandle<()>>,
}

impl ImageResolverPool {
    pub fn new(resolver: ImageResolver) -> Result<Self> {
        let (task_tx, task_rx) = channel::<Task>();
        let (done_tx, done_rx) = channel();
        let task_rx = Arc::new(Mutex::new(task_rx));

        let mut workers = Vec::with_capacity(WORKER_COUNT);
        for index in 0..WORKER_COUNT {
            let task_rx = Arc::clone(&task_rx);
            let done_tx = done_tx.clone();
            let resolver = resolver.clone();
            let worker = thread::Builder::new()
                .name(format!("image-resolver-{}", index))
                .spawn(move || loop {
                    let next = match task_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok((request, ctx)) = next else {
                        break;
                    };
                    let result = resolver.resolve(&request, &ctx);
                    if done_tx.send(ImageOutcome { request, result }).is_err() {
                        break;
                    }
                })?;
            workers.push(worker);
        }

        Ok(Self {
            tasks: task_tx,
            completed: done_rx,
            pending: 0,
            _workers: workers,
        })
    }

    /// Queue a request. Returns immediately.
    pub fn dispatch(&mut self, request: ImageRequest, ctx: Arc<ResolveContext>) {
        match self.tasks.send((request, ctx)) {
            Ok(()) => self.pending += 1,
            Err(e) => warn!("Image workers are gone, dropping {}", (e.0).0.raw_path),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Collect finished resolutions without blocking.
    pub fn poll_completed(&mut self) -> Vec<ImageOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.completed.try_recv() {
            outcomes.push(outcome);
        }
        self.pending = self.pending.saturating_sub(outcomes.len());
        outcomes
    }

    /// Block until every pending request finished or `timeout` elapsed.
    pub fn wait_completed(&mut self, timeout: Duration) -> Vec<ImageOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = Vec::new();
        while self.pending > outcomes.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completed.recv_timeout(remaining) {
                Ok(outcome) => outcomes.push(outcome),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.pending = self.pending.saturating_sub(outcomes.len());
        outcomes
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
