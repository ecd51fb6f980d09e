//! Markdown styling engine
//!
//! Turns the raw text of a note into attribute runs on a [`Document`]:
//! header fonts, link targets, hideable syntax markers, highlighted code
//! blocks, and inline image previews.
//!
//! # Pieces
//! - [`patterns`]: the compiled regex library every pass matches with
//! - [`styler`]: the ordered styling passes over a paragraph range
//! - [`code_block`]: bounded code-block boundary detection
//! - [`highlight`] / [`syntax`]: syntect highlighting, sync or on a worker
//! - [`images`] / [`attachments`]: image resolution, caching, round-trip
//! - [`rescan`]: the controller the editing surface calls after each edit
//! - [`formatting`]: formatting commands for markdown and rich-text notes
//!
//! # Example
//! ```ignore
//! use notestyle::markdown::{NoteContext, RescanController};
//!
//! let mut doc = Document::new("# Hello\n\nThis is **bold** text.\n");
//! let mut controller = RescanController::new();
//! controller.scan(&mut doc, None, &NoteContext::markdown("."), &config);
//! ```
//!
//! [`Document`]: crate::document::Document

pub mod attachments;
pub mod code_block;
pub mod formatting;
pub mod highlight;
pub mod images;
pub mod patterns;
pub mod rescan;
pub mod styler;
pub mod syntax;

pub use attachments::{
    to_markdown_source, AttachmentRecord, AttachmentTrash, ImageSource, UndoOperation, UndoSink,
    PLACEHOLDER,
};
pub use code_block::{CodeBlockLocator, CodeBlockRange, FenceStyle};
pub use formatting::{
    detect_formatting_state, format_edit, toggle_font_trait, FormatCommand, FormatEdit,
    FormattingState,
};
pub use highlight::{HighlightJob, HighlightScheduler, MergeResult};
pub use images::{
    FfmpegExtractor, ImageResolver, RemoteFetcher, UreqFetcher, VideoFrameExtractor,
};
pub use patterns::{patterns, PatternKind, PatternLibrary};
pub use rescan::{CompletionSummary, NoteContext, NoteKind, RescanController, ScanState, ScanSummary};
pub use styler::{SpanStyler, StyleReport};
pub use syntax::{get_highlighter, SyntaxHighlighter};
