//! Style inference and fallback selection for fonts that cannot be found.
//!
//! When neither the document nor the system provides a font, rendering
//! continues with a member of one fallback family. The member is picked
//! from bold/italic flags guessed from the requested font name.

use serde::{Deserialize, Serialize};

/// Name fragments that mark a bold face. `bold` catches Semibold/Demibold.
const BOLD_MARKERS: [&str; 5] = ["Bold", "bold", "Ultra", "Heavy", "Black"];

/// Name fragments that mark an italic face.
const ITALIC_MARKERS: [&str; 2] = ["Italic", "Oblique"];

/// Bold/italic intent of a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleHint {
    /// Bold weight requested
    pub bold: bool,
    /// Italic or oblique slant requested
    pub italic: bool,
}

impl StyleHint {
    /// Construct a hint.
    pub const fn new(bold: bool, italic: bool) -> Self {
        Self { bold, italic }
    }
}

/// Infer bold/italic from a font name.
///
/// Matching is case-sensitive substring search; nothing is normalized.
///
/// ```
/// use pdf_registry::fonts::substitution::classify;
///
/// assert_eq!(classify("Arial-BoldItalic"), (true, true));
/// assert_eq!(classify("Helvetica-Oblique"), (false, true));
/// ```
pub fn classify(name: &str) -> (bool, bool) {
    let bold = BOLD_MARKERS.iter().any(|m| name.contains(m));
    let italic = ITALIC_MARKERS.iter().any(|m| name.contains(m));
    (bold, italic)
}

/// Four faces of one family that are guaranteed to be resolvable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackFamily {
    /// Upright regular face
    pub regular: String,
    /// Bold face
    pub bold: String,
    /// Italic or oblique face
    pub italic: String,
    /// Bold italic face
    pub bold_italic: String,
}

impl Default for FallbackFamily {
    fn default() -> Self {
        Self::new(
            "Helvetica",
            "Helvetica-Bold",
            "Helvetica-Oblique",
            "Helvetica-BoldOblique",
        )
    }
}

impl FallbackFamily {
    /// Build a family from its four PostScript names.
    pub fn new(
        regular: impl Into<String>,
        bold: impl Into<String>,
        italic: impl Into<String>,
        bold_italic: impl Into<String>,
    ) -> Self {
        Self {
            regular: regular.into(),
            bold: bold.into(),
            italic: italic.into(),
            bold_italic: bold_italic.into(),
        }
    }

    /// The member matching a style.
    pub fn member(&self, style: StyleHint) -> &str {
        match (style.bold, style.italic) {
            (false, false) => &self.regular,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (true, true) => &self.bold_italic,
        }
    }
}
