//! Color palettes for styled markdown
//!
//! `MarkdownColors` holds every color the span styler and the code-block
//! merger paint with. The `dark_mode` flag in `StylingConfig` selects which
//! palette is active.

use egui::Color32;

// ─────────────────────────────────────────────────────────────────────────────
// Markdown Colors
// ─────────────────────────────────────────────────────────────────────────────

/// Colors used when applying markdown attributes to a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkdownColors {
    /// Body text color
    pub text: Color32,
    /// Syntax marker color (`#`, `**`, `[`, `]`, ...)
    pub syntax: Color32,
    /// Heading text color (H1-H6)
    pub heading: Color32,
    /// Link text color
    pub link: Color32,
    /// Block quote text color
    pub quote: Color32,
    /// List marker color (bullets, numbers)
    pub list_marker: Color32,
    /// Inline code text color
    pub inline_code: Color32,
    /// Inline code background
    pub inline_code_bg: Color32,
    /// Code block background color
    pub code_block_bg: Color32,
    /// Code fence line color
    pub code_fence: Color32,
}

impl MarkdownColors {
    /// Pick the palette for the given mode.
    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    /// Light theme colors.
    pub fn light() -> Self {
        Self {
            text: Color32::from_rgb(30, 30, 30),
            syntax: Color32::from_rgb(160, 160, 160),
            heading: Color32::from_rgb(0, 100, 180),
            link: Color32::from_rgb(0, 100, 180),
            quote: Color32::from_rgb(100, 100, 100),
            list_marker: Color32::from_rgb(100, 100, 100),
            inline_code: Color32::from_rgb(80, 80, 80),
            inline_code_bg: Color32::from_rgb(245, 245, 245),
            code_block_bg: Color32::from_rgb(233, 236, 239),
            code_fence: Color32::from_rgb(120, 120, 120),
        }
    }

    /// Dark theme colors.
    pub fn dark() -> Self {
        Self {
            text: Color32::from_rgb(220, 220, 220),
            syntax: Color32::from_rgb(110, 110, 110),
            heading: Color32::from_rgb(100, 180, 255),
            link: Color32::from_rgb(100, 180, 255),
            quote: Color32::from_rgb(160, 160, 160),
            list_marker: Color32::from_rgb(140, 140, 140),
            inline_code: Color32::from_rgb(200, 200, 150),
            inline_code_bg: Color32::from_rgb(45, 45, 45),
            code_block_bg: Color32::from_rgb(40, 44, 52),
            code_fence: Color32::from_rgb(140, 140, 140),
        }
    }

    /// Check if this is a dark palette.
    pub fn is_dark(&self) -> bool {
        self.text.r() > 128
    }
}

impl Default for MarkdownColors {
    fn default() -> Self {
        Self::light()
    }
}
