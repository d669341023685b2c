//! Scalar rendering and output settings held by the registry.
//!
//! These are the knobs renderers read on every page (antialiasing, halftone
//! screen, text output format, PostScript embedding flags). The registry only
//! stores them; interpreting them is up to the consumer.
//!
//! # Example
//!
//! ```
//! use pdf_registry::settings::{EndOfLine, Settings};
//!
//! let mut settings = Settings::default().with_err_quiet(true);
//! settings.set_text_eol("dos").unwrap();
//! assert_eq!(settings.text_eol, EndOfLine::Dos);
//! assert!(settings.set_antialias("maybe").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// PostScript language level to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsLevel {
    /// Level 1
    Level1,
    /// Level 1 with separations
    Level1Sep,
    /// Level 2
    Level2,
    /// Level 2 with separations
    Level2Sep,
    /// Level 3
    Level3,
    /// Level 3 with separations
    Level3Sep,
}

impl FromStr for PsLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "level1" => Ok(PsLevel::Level1),
            "level1sep" => Ok(PsLevel::Level1Sep),
            "level2" => Ok(PsLevel::Level2),
            "level2sep" => Ok(PsLevel::Level2Sep),
            "level3" => Ok(PsLevel::Level3),
            "level3Sep" | "level3sep" => Ok(PsLevel::Level3Sep),
            _ => Err(Error::InvalidSetting {
                name: "psLevel",
                value: s.to_string(),
            }),
        }
    }
}

/// End-of-line marker for text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndOfLine {
    /// LF
    Unix,
    /// CR+LF
    Dos,
    /// CR
    Mac,
}

impl EndOfLine {
    /// Marker bytes.
    pub fn as_str(self) -> &'static str {
        match self {
            EndOfLine::Unix => "\n",
            EndOfLine::Dos => "\r\n",
            EndOfLine::Mac => "\r",
        }
    }

    fn platform_default() -> Self {
        if cfg!(windows) {
            EndOfLine::Dos
        } else {
            EndOfLine::Unix
        }
    }
}

impl FromStr for EndOfLine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unix" => Ok(EndOfLine::Unix),
            "dos" => Ok(EndOfLine::Dos),
            "mac" => Ok(EndOfLine::Mac),
            _ => Err(Error::InvalidSetting {
                name: "textEOL",
                value: s.to_string(),
            }),
        }
    }
}

/// Halftone screen type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScreenType {
    /// Renderer default
    #[default]
    Unset,
    /// Dispersed-dot dither
    Dispersed,
    /// Clustered-dot dither
    Clustered,
    /// Stochastic clustered-dot dither
    StochasticClustered,
}

impl FromStr for ScreenType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dispersed" => Ok(ScreenType::Dispersed),
            "clustered" => Ok(ScreenType::Clustered),
            "stochasticClustered" => Ok(ScreenType::StochasticClustered),
            _ => Err(Error::InvalidSetting {
                name: "screenType",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScreenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScreenType::Unset => "unset",
            ScreenType::Dispersed => "dispersed",
            ScreenType::Clustered => "clustered",
            ScreenType::StochasticClustered => "stochasticClustered",
        };
        f.write_str(s)
    }
}

/// Parse a `yes`/`no` setting value.
pub fn parse_yes_no(name: &'static str, value: &str) -> Result<bool> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(Error::InvalidSetting {
            name,
            value: value.to_string(),
        }),
    }
}

/// Rendering, text-output and PostScript settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// PostScript output file or command
    pub ps_file: Option<String>,
    /// Expand smaller pages to fill the paper
    pub ps_expand_smaller: bool,
    /// Shrink larger pages to fit the paper
    pub ps_shrink_larger: bool,
    /// Center pages on the paper
    pub ps_center: bool,
    /// PostScript level to generate
    pub ps_level: PsLevel,
    /// Embed Type 1 fonts
    pub ps_embed_type1: bool,
    /// Embed TrueType fonts
    pub ps_embed_truetype: bool,
    /// Embed CID PostScript fonts
    pub ps_embed_cid_postscript: bool,
    /// Embed CID TrueType fonts
    pub ps_embed_cid_truetype: bool,
    /// Substitute missing fonts
    pub ps_subst_fonts: bool,
    /// Pass all fonts through as-is
    pub ps_font_passthrough: bool,
    /// Preload images and forms into memory
    pub ps_preload: bool,
    /// Generate OPI comments
    pub ps_opi: bool,
    /// Use ASCIIHex instead of ASCII85
    pub ps_ascii_hex: bool,
    /// Use binary instead of hex
    pub ps_binary: bool,

    /// Unicode map used for text output
    pub text_encoding: String,
    /// End-of-line marker for text output
    pub text_eol: EndOfLine,
    /// Insert end-of-page markers
    pub text_page_breaks: bool,
    /// Keep all characters, even tiny ones
    pub text_keep_tiny_chars: bool,

    /// Use FreeType for glyph rendering
    pub enable_freetype: bool,
    /// Disable FreeType hinting
    pub disable_freetype_hinting: bool,
    /// Anti-alias glyphs
    pub antialias: bool,
    /// Anti-alias vector graphics
    pub vector_antialias: bool,
    /// Stroke adjustment
    pub stroke_adjust: bool,
    /// Halftone screen type
    pub screen_type: ScreenType,
    /// Screen matrix size, `None` for the renderer default
    pub screen_size: Option<u32>,
    /// Screen dot radius, `None` for the renderer default
    pub screen_dot_radius: Option<u32>,
    /// Screen gamma correction
    pub screen_gamma: f64,
    /// Screen black clamping threshold
    pub screen_black_threshold: f64,
    /// Screen white clamping threshold
    pub screen_white_threshold: f64,
    /// Minimum line width
    pub min_line_width: f64,
    /// Overprint preview
    pub overprint_preview: bool,

    /// Map numeric char names from font subsets
    pub map_numeric_char_names: bool,
    /// Map unknown char names
    pub map_unknown_char_names: bool,
    /// Print drawing commands
    pub print_commands: bool,
    /// Profile drawing commands
    pub profile_commands: bool,
    /// Suppress error messages
    pub err_quiet: bool,
    /// Resolution used when rasterizing images (0 = renderer default)
    pub splash_resolution: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ps_file: None,
            ps_expand_smaller: false,
            ps_shrink_larger: true,
            ps_center: true,
            ps_level: PsLevel::Level2,
            ps_embed_type1: true,
            ps_embed_truetype: true,
            ps_embed_cid_postscript: true,
            ps_embed_cid_truetype: true,
            ps_subst_fonts: true,
            ps_font_passthrough: false,
            ps_preload: false,
            ps_opi: false,
            ps_ascii_hex: false,
            ps_binary: false,
            text_encoding: "Latin1".to_string(),
            text_eol: EndOfLine::platform_default(),
            text_page_breaks: true,
            text_keep_tiny_chars: false,
            enable_freetype: true,
            disable_freetype_hinting: false,
            antialias: true,
            vector_antialias: true,
            stroke_adjust: true,
            screen_type: ScreenType::Unset,
            screen_size: None,
            screen_dot_radius: None,
            screen_gamma: 1.0,
            screen_black_threshold: 0.0,
            screen_white_threshold: 1.0,
            min_line_width: 0.0,
            overprint_preview: false,
            map_numeric_char_names: true,
            map_unknown_char_names: false,
            print_commands: false,
            profile_commands: false,
            err_quiet: false,
            splash_resolution: 0.0,
        }
    }
}

impl Settings {
    /// Suppress error messages.
    pub fn with_err_quiet(mut self, quiet: bool) -> Self {
        self.err_quiet = quiet;
        self
    }

    /// Set the Unicode map used for text output.
    pub fn with_text_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.text_encoding = encoding.into();
        self
    }

    /// Set the PostScript level.
    pub fn with_ps_level(mut self, level: PsLevel) -> Self {
        self.ps_level = level;
        self
    }

    /// Set the text end-of-line marker from `unix`, `dos` or `mac`.
    pub fn set_text_eol(&mut self, value: &str) -> Result<()> {
        self.text_eol = value.parse()?;
        Ok(())
    }

    /// Enable or disable FreeType from `yes`/`no`.
    pub fn set_enable_freetype(&mut self, value: &str) -> Result<()> {
        self.enable_freetype = parse_yes_no("enableFreeType", value)?;
        Ok(())
    }

    /// Disable or enable FreeType hinting from `yes`/`no`.
    pub fn set_disable_freetype_hinting(&mut self, value: &str) -> Result<()> {
        self.disable_freetype_hinting = parse_yes_no("disableFreeTypeHinting", value)?;
        Ok(())
    }

    /// Enable or disable glyph anti-aliasing from `yes`/`no`.
    pub fn set_antialias(&mut self, value: &str) -> Result<()> {
        self.antialias = parse_yes_no("antialias", value)?;
        Ok(())
    }

    /// Enable or disable vector anti-aliasing from `yes`/`no`.
    pub fn set_vector_antialias(&mut self, value: &str) -> Result<()> {
        self.vector_antialias = parse_yes_no("vectorAntialias", value)?;
        Ok(())
    }
}
