//! Styling configuration for notestyle
//!
//! This module defines the `StylingConfig` snapshot the editing surface hands
//! to the engine, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Image Width
// ─────────────────────────────────────────────────────────────────────────────

/// Target display width for materialized images.
///
/// Serialized as the string `"auto"` or a number of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(try_from = "WidthRepr", into = "WidthRepr")]
pub enum ImageWidth {
    /// Use the image's natural width
    #[default]
    Auto,
    /// Scale down to at most this many points
    Fixed(f32),
}

/// Wire form of `ImageWidth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WidthRepr {
    Points(f32),
    Keyword(String),
}

impl TryFrom<WidthRepr> for ImageWidth {
    type Error = String;

    fn try_from(repr: WidthRepr) -> Result<Self, Self::Error> {
        match repr {
            WidthRepr::Points(points) => Ok(ImageWidth::Fixed(points)),
            WidthRepr::Keyword(word) if word.eq_ignore_ascii_case("auto") => Ok(ImageWidth::Auto),
            WidthRepr::Keyword(word) => Err(format!("unknown image width '{}'", word)),
        }
    }
}

impl From<ImageWidth> for WidthRepr {
    fn from(width: ImageWidth) -> Self {
        match width {
            ImageWidth::Auto => WidthRepr::Keyword("auto".to_string()),
            ImageWidth::Fixed(points) => WidthRepr::Points(points),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Styling Config
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration snapshot consumed by every scan.
///
/// All fields have defaults via `#[serde(default)]`, so partial JSON files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylingConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Markdown Behavior
    // ─────────────────────────────────────────────────────────────────────────
    /// Render syntax markers (`#`, `**`, `[`...) invisible
    pub hide_syntax_markers: bool,

    /// Run syntax highlighting over code blocks
    pub code_block_highlight_enabled: bool,

    /// Replace image markdown with materialized previews
    pub live_image_preview_enabled: bool,

    /// Target width for image previews
    pub target_image_width: ImageWidth,

    // ─────────────────────────────────────────────────────────────────────────
    // Fonts
    // ─────────────────────────────────────────────────────────────────────────
    /// Body font family
    pub font_family: String,

    /// Body font size (in points)
    pub font_size: f32,

    /// Code font family
    pub code_font_family: String,

    /// Code font size (in points)
    pub code_font_size: f32,

    /// Extra spacing between lines (in points)
    pub line_spacing: f32,

    // ─────────────────────────────────────────────────────────────────────────
    // Themes
    // ─────────────────────────────────────────────────────────────────────────
    /// Whether the dark palette is active
    pub dark_mode: bool,

    /// syntect theme used for code blocks in light mode
    pub light_code_theme: String,

    /// syntect theme used for code blocks in dark mode
    pub dark_code_theme: String,
}

impl Default for StylingConfig {
    fn default() -> Self {
        Self {
            hide_syntax_markers: false,
            code_block_highlight_enabled: true,
            live_image_preview_enabled: true,
            target_image_width: ImageWidth::Auto,
            font_family: "Inter".to_string(),
            font_size: 14.0,
            code_font_family: "JetBrainsMono".to_string(),
            code_font_size: 13.0,
            line_spacing: 0.0,
            dark_mode: false,
            light_code_theme: "InspiredGitHub".to_string(),
            dark_code_theme: "base16-ocean.dark".to_string(),
        }
    }
}

impl StylingConfig {
    /// Minimum allowed font size.
    pub const MIN_FONT_SIZE: f32 = 6.0;
    /// Maximum allowed font size.
    pub const MAX_FONT_SIZE: f32 = 72.0;
    /// Maximum extra line spacing.
    pub const MAX_LINE_SPACING: f32 = 4.0;
    /// Smallest fixed image width that still shows anything useful.
    pub const MIN_IMAGE_WIDTH: f32 = 16.0;

    /// Name of the syntect theme for the active mode.
    pub fn code_theme(&self) -> &str {
        if self.dark_mode {
            &self.dark_code_theme
        } else {
            &self.light_code_theme
        }
    }

    /// Clamp all numeric values into their valid ranges.
    pub fn sanitize(&mut self) {
        self.font_size = self
            .font_size
            .clamp(Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE);
        self.code_font_size = self
            .code_font_size
            .clamp(Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE);
        self.line_spacing = self.line_spacing.clamp(0.0, Self::MAX_LINE_SPACING);

        if let ImageWidth::Fixed(width) = self.target_image_width {
            if !width.is_finite() {
                self.target_image_width = ImageWidth::Auto;
            } else if width < Self::MIN_IMAGE_WIDTH {
                self.target_image_width = ImageWidth::Fixed(Self::MIN_IMAGE_WIDTH);
            }
        }

        if self.font_family.trim().is_empty() {
            self.font_family = Self::default().font_family;
        }
        if self.code_font_family.trim().is_empty() {
            self.code_font_family = Self::default().code_font_family;
        }
    }

    /// Deserialize from JSON and sanitize the result.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        config.sanitize();
        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StylingConfig::default();
        assert!(!config.hide_syntax_markers);
        assert!(config.code_block_highlight_enabled);
        assert_eq!(config.target_image_width, ImageWidth::Auto);
        assert_eq!(config.font_size, 14.0);
        assert_eq!(config.code_theme(), "InspiredGitHub");
    }

    #[test]
    fn test_code_theme_follows_mode() {
        let config = StylingConfig {
            dark_mode: true,
            ..StylingConfig::default()
        };
        assert_eq!(config.code_theme(), "base16-ocean.dark");
    }

    #[test]
    fn test_image_width_auto_roundtrip() {
        let json = serde_json::to_string(&ImageWidth::Auto).unwrap();
        assert_eq!(json, "\"auto\"");
        let width: ImageWidth = serde_json::from_str("\"AUTO\"").unwrap();
        assert_eq!(width, ImageWidth::Auto);
    }

    #[test]
    fn test_image_width_fixed() {
        let width: ImageWidth = serde_json::from_str("480").unwrap();
        assert_eq!(width, ImageWidth::Fixed(480.0));
        assert!(serde_json::from_str::<ImageWidth>("\"wide\"").is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StylingConfig =
            serde_json::from_str(r#"{"hide_syntax_markers": true}"#).unwrap();
        assert!(config.hide_syntax_markers);
        assert_eq!(config.code_font_family, "JetBrainsMono");
    }

    #[test]
    fn test_sanitize_clamps_values() {
        let config = StylingConfig::from_json_sanitized(
            r#"{"font_size": 2.0, "line_spacing": 10.0, "target_image_width": 3, "font_family": " "}"#,
        )
        .unwrap();
        assert_eq!(config.font_size, StylingConfig::MIN_FONT_SIZE);
        assert_eq!(config.line_spacing, StylingConfig::MAX_LINE_SPACING);
        assert_eq!(
            config.target_image_width,
            ImageWidth::Fixed(StylingConfig::MIN_IMAGE_WIDTH)
        );
        assert_eq!(config.font_family, "Inter");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let result: Result<StylingConfig, _> =
            serde_json::from_str(r#"{"dark_mode": true, "future_feature": 1}"#);
        assert!(result.unwrap().dark_mode);
    }
}
