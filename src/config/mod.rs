//! Configuration module for notestyle
//!
//! This module handles the styling configuration snapshot,
//! including serialization/deserialization to/from JSON and
//! persistent storage to platform-specific directories.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
