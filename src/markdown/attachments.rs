//! Attachment records, markdown round-trip, and recoverable cleanup
//!
//! An installed image replaces its `![title](path)` source with a single
//! placeholder character that carries an [`AttachmentRecord`]. Before a note
//! is saved, [`to_markdown_source`] turns every placeholder back into the
//! markdown it came from.
//!
//! When an edit deletes a placeholder, the file the attachment owns is moved
//! into a trash directory and an [`UndoOperation`] is handed to the caller's
//! [`UndoSink`] so the move can be reversed.

use crate::document::Document;
use crate::error::{Error, Result};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Object replacement character standing in for an installed attachment.
pub const PLACEHOLDER: char = '\u{FFFC}';

/// Where an image was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Absolute path on disk
    Local(PathBuf),
    /// http(s) URL
    Remote(String),
}

impl ImageSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, ImageSource::Remote(_))
    }
}

/// What was decoded to produce the displayed bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    /// A single frame extracted from a video
    VideoFrame,
}

/// A resolved, displayable attachment.
#[derive(Debug)]
pub struct AttachmentRecord {
    /// Alt text from the markdown source
    pub title: String,
    /// Destination exactly as written in the markdown source
    pub raw_path: String,
    pub source: ImageSource,
    /// Cache entry backing this attachment, if any
    pub cache_path: Option<PathBuf>,
    pub kind: AttachmentKind,
    /// Decoded size in pixels `[width, height]`
    pub natural_size: [usize; 2],
    /// Size after applying the configured width policy, in points
    pub display_size: egui::Vec2,
    pub image: Arc<egui::ColorImage>,
}

impl AttachmentRecord {
    /// Markdown that reproduces this attachment.
    pub fn markdown_source(&self) -> String {
        format!("![{}]({})", self.title, self.raw_path)
    }

    /// The file removed from view when this attachment is deleted.
    ///
    /// Only cache entries are owned by the engine; user files referenced by
    /// local paths are never moved.
    pub fn owned_file(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip
// ─────────────────────────────────────────────────────────────────────────────

/// Text of `doc` with every attachment placeholder expanded back to markdown.
///
/// Placeholder characters without an attachment attribute are kept as-is.
pub fn to_markdown_source(doc: &Document) -> String {
    let text = doc.text();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for (range, record) in doc.attachments() {
        if range.start < cursor {
            continue;
        }
        out.push_str(text.get(cursor..range.start).unwrap_or_default());
        out.push_str(&record.markdown_source());
        cursor = range.end;
    }
    out.push_str(text.get(cursor..).unwrap_or_default());
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Undo
// ─────────────────────────────────────────────────────────────────────────────

/// A reversible side effect the editor's undo stack should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOperation {
    /// Move a trashed file back to where it was.
    RestoreFile { trashed: PathBuf, original: PathBuf },
}

impl UndoOperation {
    /// Perform the inverse operation.
    pub fn apply(&self) -> Result<()> {
        match self {
            UndoOperation::RestoreFile { trashed, original } => {
                if let Some(parent) = original.parent() {
                    fs::create_dir_all(parent)?;
                }
                move_file(trashed, original)?;
                info!("Restored {} from trash", original.display());
                Ok(())
            }
        }
    }
}

/// Receives undo registrations.
pub trait UndoSink {
    fn register(&mut self, operation: UndoOperation);
}

impl UndoSink for Vec<UndoOperation> {
    fn register(&mut self, operation: UndoOperation) {
        self.push(operation);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trash
// ─────────────────────────────────────────────────────────────────────────────

/// Name of the trash directory inside the image cache.
pub const TRASH_DIR_NAME: &str = "trash";

/// Recoverable holding area for files of deleted attachments.
#[derive(Debug, Clone)]
pub struct AttachmentTrash {
    dir: PathBuf,
}

impl AttachmentTrash {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Trash living under `cache_dir`.
    pub fn in_cache(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(TRASH_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move the attachment's owned file to the trash and register its undo.
    ///
    /// Returns the trashed location, or `None` if there was nothing to move.
    pub fn discard(
        &self,
        record: &AttachmentRecord,
        undo: &mut dyn UndoSink,
    ) -> Result<Option<PathBuf>> {
        let Some(original) = record.owned_file() else {
            return Ok(None);
        };
        if !original.exists() {
            debug!("Attachment file already gone: {}", original.display());
            return Ok(None);
        }

        create_dir_tolerant(&self.dir)?;
        let trashed = self.unique_destination(original)?;
        move_file(original, &trashed)?;
        info!(
            "Moved unused attachment {} to {}",
            original.display(),
            trashed.display()
        );

        undo.register(UndoOperation::RestoreFile {
            trashed: trashed.clone(),
            original: original.to_path_buf(),
        });
        Ok(Some(trashed))
    }

    fn unique_destination(&self, original: &Path) -> Result<PathBuf> {
        let name = original
            .file_name()
            .ok_or_else(|| Error::UnsupportedSource(original.display().to_string()))?
            .to_string_lossy()
            .into_owned();

        let mut candidate = self.dir.join(&name);
        let mut counter = 1;
        while candidate.exists() {
            candidate = self.dir.join(format!("{}-{}", counter, name));
            counter += 1;
        }
        Ok(candidate)
    }
}

/// Create a single directory, treating "already exists" as success.
pub(crate) fn create_dir_tolerant(dir: &Path) -> io::Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
