//! System font resolution with substitution.
//!
//! Resolution order for a requested PostScript name:
//!
//! 1. the locator's own cache of earlier results (exact name);
//! 2. the platform service, accepting only faces with TrueType outlines;
//! 3. the face's own file when it is a standalone `.ttf`/`.otf`;
//! 4. otherwise a standalone copy rebuilt by [`SfntExtractor`];
//! 5. failing all of that, a member of the fallback family chosen from the
//!    requested name's style, resolved through steps 1–4.
//!
//! The fallback family must always resolve. If it does not, resolution
//! fails with [`Error::FatalFallbackMissing`] rather than substituting any
//! further.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ttf_parser::Tag;

use super::service::FontService;
use super::sfnt::SfntExtractor;
use super::substitution::{classify, FallbackFamily, StyleHint};
use super::temp_files::TempFontArea;
use super::{ContainerType, SysFontInfo};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

/// Outline table a face must carry to be usable.
const GLYF: Tag = Tag::from_bytes(b"glyf");

/// Resolves font names to files on disk.
pub trait SystemFontLocator: Send + Sync {
    /// Resolve `name` to a font file, substituting if necessary.
    ///
    /// `style` overrides the bold/italic flags guessed from the name.
    fn resolve(&self, name: &str, style: Option<StyleHint>) -> Result<Arc<SysFontInfo>>;

    /// Previously resolved font for exactly `name`.
    fn cached(&self, name: &str) -> Option<Arc<SysFontInfo>>;

    /// Forget every resolved font so the next lookups query the platform again.
    fn rescan(&self);
}

/// Where a face was found, before style flags are attached.
struct Located {
    path: PathBuf,
    container_type: ContainerType,
    font_index: u32,
}

/// [`SystemFontLocator`] driving a [`FontService`].
pub struct ServiceFontLocator<S> {
    service: S,
    fallback: FallbackFamily,
    extractor: SfntExtractor,
    fonts: Mutex<HashMap<String, Arc<SysFontInfo>>>,
    diagnostics: Arc<Diagnostics>,
}

impl<S: FontService> ServiceFontLocator<S> {
    /// Create a locator over `service`, extracting into `area`.
    pub fn new(service: S, fallback: FallbackFamily, area: TempFontArea) -> Self {
        Self::with_diagnostics(service, fallback, area, Arc::new(Diagnostics::default()))
    }

    /// Create a locator that reports substitutions through `diagnostics`.
    pub fn with_diagnostics(
        service: S,
        fallback: FallbackFamily,
        area: TempFontArea,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            service,
            fallback,
            extractor: SfntExtractor::new(area),
            fonts: Mutex::new(HashMap::new()),
            diagnostics,
        }
    }

    /// The platform service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// The fallback family.
    pub fn fallback(&self) -> &FallbackFamily {
        &self.fallback
    }

    /// Temporary area holding extracted fonts.
    pub fn temp_area(&self) -> &TempFontArea {
        self.extractor.area()
    }

    /// Steps 2–4: find the face and make it available as a file.
    fn locate(&self, name: &str) -> Result<Located> {
        let handle = self
            .service
            .find_by_postscript_name(name)
            .ok_or_else(|| Error::FontNotFound(name.to_string()))?;

        // Only TrueType outlines are usable downstream
        match self.service.table_len(handle, GLYF) {
            Some(len) if len > 0 => {},
            _ => {
                log::debug!("Font '{}' has no glyf table", name);
                return Err(Error::FontNotFound(name.to_string()));
            },
        }

        if let Some(path) = self.service.direct_file_path(handle) {
            if has_sfnt_extension(&path) {
                return Ok(Located {
                    path,
                    container_type: ContainerType::Ttf,
                    font_index: 0,
                });
            }
        }

        let path = self.extractor.extract(&self.service, handle)?;
        Ok(Located {
            path,
            container_type: ContainerType::Ttf,
            font_index: 0,
        })
    }

    /// Steps 1–4 for `name`, caching the result under `name`.
    fn resolve_direct(&self, name: &str) -> Result<Arc<SysFontInfo>> {
        if let Some(hit) = self.cached(name) {
            return Ok(hit);
        }
        let located = self.locate(name)?;
        let (bold, italic) = classify(name);
        Ok(self.remember(SysFontInfo {
            name: name.to_string(),
            bold,
            italic,
            path: located.path,
            container_type: located.container_type,
            font_index: located.font_index,
        }))
    }

    /// Insert `info` unless another thread got there first.
    fn remember(&self, info: SysFontInfo) -> Arc<SysFontInfo> {
        let info = Arc::new(info);
        let Ok(mut fonts) = self.fonts.lock() else {
            return info;
        };
        Arc::clone(fonts.entry(info.name.clone()).or_insert(info))
    }
}

impl<S: FontService> SystemFontLocator for ServiceFontLocator<S> {
    fn resolve(&self, name: &str, style: Option<StyleHint>) -> Result<Arc<SysFontInfo>> {
        if let Some(hit) = self.cached(name) {
            return Ok(hit);
        }

        let style = style.unwrap_or_else(|| {
            let (bold, italic) = classify(name);
            StyleHint::new(bold, italic)
        });

        let located = match self.locate(name) {
            Ok(located) => located,
            Err(e) => {
                let substitute = self.fallback.member(style);
                self.diagnostics.error(format_args!(
                    "Couldn't find a font for '{}' ({}), subst is '{}'",
                    name, e, substitute
                ));
                let found = self.resolve_direct(substitute).map_err(|e| {
                    log::error!("Fallback font '{}' is not available: {}", substitute, e);
                    Error::FatalFallbackMissing {
                        requested: name.to_string(),
                        fallback: substitute.to_string(),
                    }
                })?;
                Located {
                    path: found.path.clone(),
                    container_type: found.container_type,
                    font_index: found.font_index,
                }
            },
        };

        Ok(self.remember(SysFontInfo {
            name: name.to_string(),
            bold: style.bold,
            italic: style.italic,
            path: located.path,
            container_type: located.container_type,
            font_index: located.font_index,
        }))
    }

    fn cached(&self, name: &str) -> Option<Arc<SysFontInfo>> {
        self.fonts.lock().ok()?.get(name).cloned()
    }

    fn rescan(&self) {
        if let Ok(mut fonts) = self.fonts.lock() {
            fonts.clear();
        }
    }
}

/// True for `.ttf`/`.otf` in any letter case.
fn has_sfnt_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sfnt_extension_matching() {
        assert!(has_sfnt_extension(Path::new("/fonts/Arial.ttf")));
        assert!(has_sfnt_extension(Path::new("/fonts/Arial.TTF")));
        assert!(has_sfnt_extension(Path::new("/fonts/Minion.OtF")));
        assert!(!has_sfnt_extension(Path::new("/fonts/Hiragino.ttc")));
        assert!(!has_sfnt_extension(Path::new("/fonts/Geneva.dfont")));
        assert!(!has_sfnt_extension(Path::new("/fonts/ttf")));
    }
}
