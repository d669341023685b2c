//! System font resolution.
//!
//! This module turns font names from PDF font dictionaries into font files
//! a rasterizer can open, for documents that do not embed the font program.
//!
//! - [`service`]: platform font-matching services
//! - [`locator`]: the resolve-or-substitute protocol and its cache
//! - [`sfnt`]: rebuilding standalone files from non-file-backed faces
//! - [`substitution`]: style inference and the fallback family
//! - [`temp_files`]: scoped storage for rebuilt files

pub mod locator;
pub mod service;
pub mod sfnt;
pub mod substitution;
pub mod temp_files;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use locator::{ServiceFontLocator, SystemFontLocator};
pub use service::{FontService, FontdbService};
pub use sfnt::{ExtractError, SfntExtractor, SfntHeader, SfntPlan, TableDirectory, TableRecord};
pub use substitution::{classify, FallbackFamily, StyleHint};
pub use temp_files::TempFontArea;

/// Font file container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerType {
    /// Type 1, ASCII
    Pfa,
    /// Type 1, binary
    Pfb,
    /// Single TrueType/OpenType font
    Ttf,
    /// TrueType collection
    Ttc,
}

impl ContainerType {
    /// Classify a font file by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pfa" => Some(ContainerType::Pfa),
            "pfb" => Some(ContainerType::Pfb),
            "ttf" | "otf" => Some(ContainerType::Ttf),
            "ttc" => Some(ContainerType::Ttc),
            _ => None,
        }
    }

    /// Extension searched for in font directories.
    pub fn extension(self) -> &'static str {
        match self {
            ContainerType::Pfa => "pfa",
            ContainerType::Pfb => "pfb",
            ContainerType::Ttf => "ttf",
            ContainerType::Ttc => "ttc",
        }
    }
}

/// A resolved system font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysFontInfo {
    /// Name the font was requested under
    pub name: String,
    /// Bold intent of the requested name
    pub bold: bool,
    /// Italic intent of the requested name
    pub italic: bool,
    /// Font file
    pub path: PathBuf,
    /// Container format of `path`
    pub container_type: ContainerType,
    /// Face index inside the container
    pub font_index: u32,
}

/// What the font-dictionary layer knows about a font.
#[derive(Debug, Clone, Default)]
pub struct FontDescriptor {
    /// BaseFont name
    pub name: String,
    /// Embedded font program (FontFile/FontFile2/FontFile3), if any
    pub embedded_program: Option<Vec<u8>>,
    /// Style taken from the font descriptor flags, if known
    pub style: Option<StyleHint>,
}

impl FontDescriptor {
    /// Descriptor for a non-embedded font.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach a style hint.
    pub fn with_style(mut self, style: StyleHint) -> Self {
        self.style = Some(style);
        self
    }

    /// Attach an embedded font program.
    pub fn with_embedded_program(mut self, program: Vec<u8>) -> Self {
        self.embedded_program = Some(program);
        self
    }

    /// True if the document carries its own font program.
    pub fn is_embedded(&self) -> bool {
        self.embedded_program.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_type_from_path() {
        assert_eq!(ContainerType::from_path(Path::new("a.pfa")), Some(ContainerType::Pfa));
        assert_eq!(ContainerType::from_path(Path::new("a.PFB")), Some(ContainerType::Pfb));
        assert_eq!(ContainerType::from_path(Path::new("a.otf")), Some(ContainerType::Ttf));
        assert_eq!(ContainerType::from_path(Path::new("a.ttc")), Some(ContainerType::Ttc));
        assert_eq!(ContainerType::from_path(Path::new("a.dfont")), None);
        assert_eq!(ContainerType::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_descriptor_builders() {
        let d = FontDescriptor::named("Arial-Bold").with_style(StyleHint::new(true, false));
        assert!(!d.is_embedded());
        assert_eq!(d.style, Some(StyleHint::new(true, false)));
        assert!(d.with_embedded_program(vec![0, 1]).is_embedded());
    }
}
