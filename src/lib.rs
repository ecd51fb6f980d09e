//! notestyle
//!
//! Incremental markdown styling for note editors built on egui. The host
//! keeps the text in a [`document::Document`], calls
//! [`markdown::RescanController`] after every edit, and renders the result
//! with [`document::layout::to_layout_job`].

pub mod config;
pub mod document;
pub mod error;
pub mod fonts;
pub mod markdown;
pub mod string_utils;
pub mod theme;

pub use config::{load_config, save_config, ImageWidth, StylingConfig};
pub use document::Document;
pub use error::{Error, Result};
pub use markdown::{NoteContext, NoteKind, RescanController};
