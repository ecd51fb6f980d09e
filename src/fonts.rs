//! Font descriptions for styled text
//!
//! Fonts are described by value (`FontSpec`) so they can live inside
//! attribute runs and be compared cheaply. Bold/italic composition goes
//! through the small `FontTraits` enum instead of font-name lookups.
//!
//! Rendering maps a spec onto an egui `FontId` whose family is named
//! `<family>`, `<family>-Bold`, `<family>-Italic` or `<family>-BoldItalic`.
//! The host registers those families once at startup.

use egui::{FontFamily, FontId};

// ─────────────────────────────────────────────────────────────────────────────
// Font Traits
// ─────────────────────────────────────────────────────────────────────────────

/// A single style trait that can be toggled on a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontTrait {
    Bold,
    Italic,
}

/// The complete set of style traits a font can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontTraits {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontTraits {
    /// Build traits from individual flags.
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontTraits::Regular,
            (true, false) => FontTraits::Bold,
            (false, true) => FontTraits::Italic,
            (true, true) => FontTraits::BoldItalic,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontTraits::Bold | FontTraits::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontTraits::Italic | FontTraits::BoldItalic)
    }

    pub fn contains(self, t: FontTrait) -> bool {
        match t {
            FontTrait::Bold => self.is_bold(),
            FontTrait::Italic => self.is_italic(),
        }
    }

    /// Flip one trait, preserving the other.
    pub fn toggle(self, t: FontTrait) -> Self {
        match t {
            FontTrait::Bold => Self::from_flags(!self.is_bold(), self.is_italic()),
            FontTrait::Italic => Self::from_flags(self.is_bold(), !self.is_italic()),
        }
    }

    /// Add one trait, preserving the other.
    pub fn with(self, t: FontTrait) -> Self {
        if self.contains(t) {
            self
        } else {
            self.toggle(t)
        }
    }

    /// Remove one trait, preserving the other.
    pub fn without(self, t: FontTrait) -> Self {
        if self.contains(t) {
            self.toggle(t)
        } else {
            self
        }
    }

    /// Family-name suffix used when registering styled faces.
    pub fn family_suffix(self) -> &'static str {
        match self {
            FontTraits::Regular => "",
            FontTraits::Bold => "-Bold",
            FontTraits::Italic => "-Italic",
            FontTraits::BoldItalic => "-BoldItalic",
        }
    }
}

/// Pure toggle function used by formatting commands.
pub fn toggle(t: FontTrait, current: FontTraits) -> FontTraits {
    current.toggle(t)
}

// ─────────────────────────────────────────────────────────────────────────────
// Font Spec
// ─────────────────────────────────────────────────────────────────────────────

/// A concrete font: family name, point size, traits.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Base family name (e.g. "Inter", "JetBrainsMono")
    pub family: String,
    /// Size in points
    pub size: f32,
    /// Bold / italic composition
    pub traits: FontTraits,
    /// Whether this is the code (monospace) font
    pub monospace: bool,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            traits: FontTraits::Regular,
            monospace: false,
        }
    }

    pub fn monospace(family: impl Into<String>, size: f32) -> Self {
        Self {
            monospace: true,
            ..Self::new(family, size)
        }
    }

    pub fn with_traits(mut self, traits: FontTraits) -> Self {
        self.traits = traits;
        self
    }

    pub fn with_trait(mut self, t: FontTrait) -> Self {
        self.traits = self.traits.with(t);
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Name of the egui font family for this spec's traits.
    pub fn styled_family_name(&self) -> String {
        format!("{}{}", self.family, self.traits.family_suffix())
    }

    /// egui font id for layout.
    pub fn font_id(&self) -> FontId {
        FontId::new(self.size, FontFamily::Name(self.styled_family_name().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_preserves_other_trait() {
        assert_eq!(toggle(FontTrait::Bold, FontTraits::Italic), FontTraits::BoldItalic);
        assert_eq!(toggle(FontTrait::Bold, FontTraits::BoldItalic), FontTraits::Italic);
        assert_eq!(toggle(FontTrait::Italic, FontTraits::Bold), FontTraits::BoldItalic);
        assert_eq!(toggle(FontTrait::Italic, FontTraits::Italic), FontTraits::Regular);
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        for traits in [
            FontTraits::Regular,
            FontTraits::Bold,
            FontTraits::Italic,
            FontTraits::BoldItalic,
        ] {
            for t in [FontTrait::Bold, FontTrait::Italic] {
                assert_eq!(traits.toggle(t).toggle(t), traits);
            }
        }
    }

    #[test]
    fn test_with_and_without() {
        assert_eq!(FontTraits::Bold.with(FontTrait::Bold), FontTraits::Bold);
        assert_eq!(FontTraits::Bold.with(FontTrait::Italic), FontTraits::BoldItalic);
        assert_eq!(FontTraits::BoldItalic.without(FontTrait::Bold), FontTraits::Italic);
        assert_eq!(FontTraits::Regular.without(FontTrait::Italic), FontTraits::Regular);
    }

    #[test]
    fn test_styled_family_name() {
        let font = FontSpec::new("Inter", 14.0);
        assert_eq!(font.styled_family_name(), "Inter");
        let bold_italic = font.with_traits(FontTraits::BoldItalic);
        assert_eq!(bold_italic.styled_family_name(), "Inter-BoldItalic");
    }

    #[test]
    fn test_font_id() {
        let font = FontSpec::monospace("JetBrainsMono", 13.0).with_trait(FontTrait::Bold);
        let id = font.font_id();
        assert_eq!(id.size, 13.0);
        assert_eq!(id.family, FontFamily::Name("JetBrainsMono-Bold".into()));
    }
}
