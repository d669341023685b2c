//! The process-wide resource registry.
//!
//! A [`ResourceRegistry`] is created once at startup, configured through its
//! setters (or [`ResourceRegistry::scan_data_dir`]), and then shared by
//! reference with every rendering session. It owns:
//!
//! - name → path tables for encoding resources and font files,
//! - one [`ResourceCache`] per encoding-resource namespace,
//! - the system font locator and its temporary extraction area,
//! - scalar [`Settings`].
//!
//! Dropping the registry drops all of them; extracted temporary fonts are
//! deleted at that point.
//!
//! # Example
//!
//! ```no_run
//! use pdf_registry::fonts::FontDescriptor;
//! use pdf_registry::{RawResourceLoader, RegistryConfig, ResourceRegistry};
//!
//! # fn main() -> pdf_registry::Result<()> {
//! let registry = ResourceRegistry::new(RawResourceLoader, RegistryConfig::default());
//! registry.scan_data_dir("/usr/share/pdf-data".as_ref())?;
//!
//! let cmap = registry.get_cmap("Adobe-Japan1", "UniJIS-UCS2-H", None);
//! let font = registry.find_system_font(&FontDescriptor::named("Arial-BoldMT"))?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::cache::{ResourceCache, DEFAULT_CACHE_CAPACITY};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, ResourceKind, Result};
use crate::fonts::substitution::{classify, FallbackFamily, StyleHint};
use crate::fonts::{
    ContainerType, FontDescriptor, FontService, FontdbService, ServiceFontLocator, SysFontInfo,
    SystemFontLocator, TempFontArea,
};
use crate::resources::{RawResourceLoader, ResourceLoader, ResourceSource};
use crate::settings::Settings;

/// Extensions tried, in order, when searching font directories.
const FONT_FILE_TYPES: [ContainerType; 4] = [
    ContainerType::Pfa,
    ContainerType::Pfb,
    ContainerType::Ttf,
    ContainerType::Ttc,
];

/// Construction-time options for a [`ResourceRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Idle CID-to-Unicode tables kept in memory
    pub cid_to_unicode_cache_size: usize,
    /// Idle Unicode-to-Unicode tables kept in memory
    pub unicode_to_unicode_cache_size: usize,
    /// Idle Unicode maps kept in memory
    pub unicode_map_cache_size: usize,
    /// Idle CMaps kept in memory
    pub cmap_cache_size: usize,
    /// Directory for extracted fonts, system temp dir when `None`
    pub temp_dir: Option<PathBuf>,
    /// Family substituted for fonts that cannot be found
    pub fallback: FallbackFamily,
    /// Initial settings
    pub settings: Settings,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cid_to_unicode_cache_size: DEFAULT_CACHE_CAPACITY,
            unicode_to_unicode_cache_size: DEFAULT_CACHE_CAPACITY,
            unicode_map_cache_size: DEFAULT_CACHE_CAPACITY,
            cmap_cache_size: DEFAULT_CACHE_CAPACITY,
            temp_dir: None,
            fallback: FallbackFamily::default(),
            settings: Settings::default(),
        }
    }
}

impl RegistryConfig {
    /// Use the same capacity for every cache.
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cid_to_unicode_cache_size = size;
        self.unicode_to_unicode_cache_size = size;
        self.unicode_map_cache_size = size;
        self.cmap_cache_size = size;
        self
    }

    /// Write extracted fonts under `dir`.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Substitute with `family`.
    pub fn with_fallback(mut self, family: FallbackFamily) -> Self {
        self.fallback = family;
        self
    }

    /// Start from `settings`.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }
}

/// Name → path configuration tables.
#[derive(Debug, Default)]
struct Tables {
    /// Collection name → CID-to-Unicode file
    cid_to_unicodes: HashMap<String, PathBuf>,
    /// Font name pattern → Unicode-to-Unicode file, first match wins
    unicode_to_unicodes: IndexMap<String, PathBuf>,
    /// Encoding name → Unicode map file
    unicode_maps: HashMap<String, PathBuf>,
    /// Collection name → CMap directories
    cmap_dirs: HashMap<String, Vec<PathBuf>>,
    /// Directories searched for ToUnicode CMaps
    to_unicode_dirs: Vec<PathBuf>,
    /// Font name → font file
    font_files: HashMap<String, PathBuf>,
    /// Directories searched for font files
    font_dirs: Vec<PathBuf>,
    /// Collection name → font file
    cc_font_files: HashMap<String, PathBuf>,
}

/// Locates, loads and caches rendering resources.
pub struct ResourceRegistry<L: ResourceLoader = RawResourceLoader> {
    loader: L,
    tables: RwLock<Tables>,
    settings: RwLock<Settings>,
    resident_unicode_maps: RwLock<HashMap<String, Arc<L::UnicodeMap>>>,
    cid_to_unicode_cache: ResourceCache<String, L::ToUnicode>,
    unicode_to_unicode_cache: ResourceCache<String, L::ToUnicode>,
    unicode_map_cache: ResourceCache<String, L::UnicodeMap>,
    cmap_cache: ResourceCache<(String, String), L::CMap>,
    locator: Box<dyn SystemFontLocator>,
    diagnostics: Arc<Diagnostics>,
}

impl<L: ResourceLoader> fmt::Debug for ResourceRegistry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("tables", &*self.read_tables())
            .field("cid_to_unicode_cache", &self.cid_to_unicode_cache)
            .field("unicode_to_unicode_cache", &self.unicode_to_unicode_cache)
            .field("unicode_map_cache", &self.unicode_map_cache)
            .field("cmap_cache", &self.cmap_cache)
            .finish_non_exhaustive()
    }
}

fn not_found(kind: ResourceKind, name: &str) -> Error {
    Error::ResourceNotFound {
        kind,
        name: name.to_string(),
    }
}

impl<L: ResourceLoader> ResourceRegistry<L> {
    /// Create a registry resolving system fonts through the installed fonts.
    pub fn new(loader: L, config: RegistryConfig) -> Self {
        Self::with_service(loader, config, FontdbService::system())
    }

    /// Create a registry resolving system fonts through `service`.
    pub fn with_service<S>(loader: L, config: RegistryConfig, service: S) -> Self
    where
        S: FontService + 'static,
    {
        let diagnostics = Arc::new(Diagnostics::new(config.settings.err_quiet));
        let area = match &config.temp_dir {
            Some(dir) => TempFontArea::new(dir.clone()),
            None => TempFontArea::system(),
        };
        let locator = ServiceFontLocator::with_diagnostics(
            service,
            config.fallback.clone(),
            area,
            Arc::clone(&diagnostics),
        );
        Self::assemble(loader, config, Box::new(locator), diagnostics)
    }

    /// Create a registry with a custom font locator.
    pub fn with_locator(
        loader: L,
        config: RegistryConfig,
        locator: Box<dyn SystemFontLocator>,
    ) -> Self {
        let diagnostics = Arc::new(Diagnostics::new(config.settings.err_quiet));
        Self::assemble(loader, config, locator, diagnostics)
    }

    fn assemble(
        loader: L,
        config: RegistryConfig,
        locator: Box<dyn SystemFontLocator>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            loader,
            tables: RwLock::new(Tables::default()),
            settings: RwLock::new(config.settings),
            resident_unicode_maps: RwLock::new(HashMap::new()),
            cid_to_unicode_cache: ResourceCache::with_diagnostics(
                ResourceKind::CidToUnicode,
                config.cid_to_unicode_cache_size,
                Arc::clone(&diagnostics),
            ),
            unicode_to_unicode_cache: ResourceCache::with_diagnostics(
                ResourceKind::UnicodeToUnicode,
                config.unicode_to_unicode_cache_size,
                Arc::clone(&diagnostics),
            ),
            unicode_map_cache: ResourceCache::with_diagnostics(
                ResourceKind::UnicodeMap,
                config.unicode_map_cache_size,
                Arc::clone(&diagnostics),
            ),
            cmap_cache: ResourceCache::with_diagnostics(
                ResourceKind::CMap,
                config.cmap_cache_size,
                Arc::clone(&diagnostics),
            ),
            locator,
            diagnostics,
        }
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The resource loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    // ----- configuration tables

    /// Register the CID-to-Unicode file of a character collection.
    pub fn add_cid_to_unicode(&self, collection: impl Into<String>, path: impl Into<PathBuf>) {
        self.write_tables()
            .cid_to_unicodes
            .insert(collection.into(), path.into());
    }

    /// Register a Unicode-to-Unicode file for fonts whose name contains `pattern`.
    pub fn add_unicode_to_unicode(&self, pattern: impl Into<String>, path: impl Into<PathBuf>) {
        self.write_tables()
            .unicode_to_unicodes
            .insert(pattern.into(), path.into());
    }

    /// Register the Unicode map file of an encoding.
    pub fn add_unicode_map(&self, encoding: impl Into<String>, path: impl Into<PathBuf>) {
        self.write_tables()
            .unicode_maps
            .insert(encoding.into(), path.into());
    }

    /// Add a CMap directory for a character collection.
    pub fn add_cmap_dir(&self, collection: impl Into<String>, dir: impl Into<PathBuf>) {
        self.write_tables()
            .cmap_dirs
            .entry(collection.into())
            .or_default()
            .push(dir.into());
    }

    /// Add a directory searched for ToUnicode CMaps.
    pub fn add_to_unicode_dir(&self, dir: impl Into<PathBuf>) {
        self.write_tables().to_unicode_dirs.push(dir.into());
    }

    /// Map a font name to an explicit font file.
    pub fn add_font_file(&self, font_name: impl Into<String>, path: impl Into<PathBuf>) {
        self.write_tables()
            .font_files
            .insert(font_name.into(), path.into());
    }

    /// Add a directory searched for font files.
    pub fn add_font_dir(&self, dir: impl Into<PathBuf>) {
        self.write_tables().font_dirs.push(dir.into());
    }

    /// Map a character collection to a font file.
    pub fn add_cc_font_file(&self, collection: impl Into<String>, path: impl Into<PathBuf>) {
        self.write_tables()
            .cc_font_files
            .insert(collection.into(), path.into());
    }

    /// Register a built-in Unicode map, taking precedence over files.
    pub fn add_resident_unicode_map(&self, encoding: impl Into<String>, map: L::UnicodeMap) {
        self.resident_unicode_maps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(encoding.into(), Arc::new(map));
    }

    /// Register the encoding resources found under a data directory.
    ///
    /// Expects the usual layout:
    ///
    /// ```text
    /// <dir>/cidToUnicode/<collection>
    /// <dir>/unicodeMap/<encoding>
    /// <dir>/cMap/<collection>/<cmap>
    /// ```
    ///
    /// Missing subdirectories are skipped. Returns the number of entries
    /// registered.
    pub fn scan_data_dir(&self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("data directory {} does not exist", dir.display()),
            )
            .into());
        }

        let mut added = 0;
        for (name, path) in list_dir(&dir.join("cidToUnicode"))? {
            if path.is_file() {
                self.add_cid_to_unicode(name, path);
                added += 1;
            }
        }
        for (name, path) in list_dir(&dir.join("unicodeMap"))? {
            if path.is_file() {
                self.add_unicode_map(name, path);
                added += 1;
            }
        }
        for (name, path) in list_dir(&dir.join("cMap"))? {
            if path.is_dir() {
                self.add_cmap_dir(name, path);
                added += 1;
            }
        }

        log::info!("Registered {} encoding resources from {}", added, dir.display());
        Ok(added)
    }

    // ----- file lookup

    /// File backing the Unicode map of `encoding`.
    pub fn unicode_map_file(&self, encoding: &str) -> Option<PathBuf> {
        self.read_tables()
            .unicode_maps
            .get(encoding)
            .filter(|p| p.is_file())
            .cloned()
    }

    /// First file named `cmap_name` in the CMap directories of `collection`.
    pub fn find_cmap_file(&self, collection: &str, cmap_name: &str) -> Option<PathBuf> {
        let tables = self.read_tables();
        tables
            .cmap_dirs
            .get(collection)?
            .iter()
            .map(|dir| dir.join(cmap_name))
            .find(|path| path.is_file())
    }

    /// First file named `name` in the ToUnicode directories.
    pub fn find_to_unicode_file(&self, name: &str) -> Option<PathBuf> {
        self.read_tables()
            .to_unicode_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }

    /// File for `font_name`: the explicit mapping, else `<dir>/<name>.<ext>`
    /// in each font directory for `pfa`, `pfb`, `ttf`, `ttc`.
    pub fn find_font_file(&self, font_name: &str) -> Option<PathBuf> {
        let tables = self.read_tables();
        if let Some(path) = tables.font_files.get(font_name) {
            return Some(path.clone());
        }
        tables.font_dirs.iter().find_map(|dir| {
            FONT_FILE_TYPES
                .iter()
                .map(|ty| dir.join(format!("{}.{}", font_name, ty.extension())))
                .find(|path| path.is_file())
        })
    }

    /// Font file registered for a character collection.
    pub fn find_cc_font_file(&self, collection: &str) -> Option<PathBuf> {
        self.read_tables().cc_font_files.get(collection).cloned()
    }

    /// Names of every known Unicode map, resident or file-backed.
    pub fn encoding_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.read_tables().unicode_maps.keys().cloned().collect();
        names.extend(
            self.resident_unicode_maps
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .cloned(),
        );
        names.into_iter().collect()
    }

    // ----- cached resources

    /// CID-to-Unicode table of a character collection.
    pub fn get_cid_to_unicode(&self, collection: &str) -> Option<Arc<L::ToUnicode>> {
        self.cid_to_unicode_cache
            .get_or_load(&collection.to_string(), |key| {
                let path = self
                    .read_tables()
                    .cid_to_unicodes
                    .get(key)
                    .cloned()
                    .ok_or_else(|| not_found(ResourceKind::CidToUnicode, key))?;
                self.loader.load_cid_to_unicode(key, &path)
            })
    }

    /// Unicode-to-Unicode table for the first registered pattern contained
    /// in `font_name`.
    pub fn get_unicode_to_unicode(&self, font_name: &str) -> Option<Arc<L::ToUnicode>> {
        let (pattern, path) = self
            .read_tables()
            .unicode_to_unicodes
            .iter()
            .find(|(pattern, _)| font_name.contains(pattern.as_str()))
            .map(|(pattern, path)| (pattern.clone(), path.clone()))?;

        self.unicode_to_unicode_cache
            .get_or_load(&pattern, |key| self.loader.load_unicode_to_unicode(key, &path))
    }

    /// Unicode map for an output encoding.
    pub fn get_unicode_map(&self, encoding: &str) -> Option<Arc<L::UnicodeMap>> {
        let resident = self
            .resident_unicode_maps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(encoding)
            .cloned();
        if resident.is_some() {
            return resident;
        }

        self.unicode_map_cache
            .get_or_load(&encoding.to_string(), |key| {
                let path = self
                    .read_tables()
                    .unicode_maps
                    .get(key)
                    .cloned()
                    .ok_or_else(|| not_found(ResourceKind::UnicodeMap, key))?;
                self.loader.load_unicode_map(key, &path)
            })
    }

    /// Unicode map named by the `text_encoding` setting.
    pub fn text_encoding(&self) -> Option<Arc<L::UnicodeMap>> {
        let name = self.settings().text_encoding;
        self.get_unicode_map(&name)
    }

    /// CMap `cmap_name` of `collection`.
    ///
    /// With `stream`, the CMap is loaded from those bytes on a miss instead
    /// of being searched for in the collection's CMap directories.
    pub fn get_cmap(
        &self,
        collection: &str,
        cmap_name: &str,
        stream: Option<&[u8]>,
    ) -> Option<Arc<L::CMap>> {
        let key = (collection.to_string(), cmap_name.to_string());
        self.cmap_cache.get_or_load(&key, |(collection, name)| match stream {
            Some(data) => self
                .loader
                .load_cmap(collection, name, ResourceSource::Stream(data)),
            None => {
                let path = self
                    .find_cmap_file(collection, name)
                    .ok_or_else(|| not_found(ResourceKind::CMap, name))?;
                self.loader
                    .load_cmap(collection, name, ResourceSource::File(&path))
            },
        })
    }

    /// Number of retained entries in one namespace's cache.
    pub fn cached_count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::CidToUnicode => self.cid_to_unicode_cache.len(),
            ResourceKind::UnicodeToUnicode => self.unicode_to_unicode_cache.len(),
            ResourceKind::UnicodeMap => self.unicode_map_cache.len(),
            ResourceKind::CMap => self.cmap_cache.len(),
        }
    }

    /// Drop every cached resource. Outstanding handles stay valid.
    pub fn clear_caches(&self) {
        self.cid_to_unicode_cache.clear();
        self.unicode_to_unicode_cache.clear();
        self.unicode_map_cache.clear();
        self.cmap_cache.clear();
    }

    // ----- system fonts

    /// Font file to use for a font the document does not embed.
    ///
    /// Returns `Ok(None)` when the descriptor carries its own program.
    /// Fails only with [`Error::FatalFallbackMissing`].
    pub fn find_system_font(&self, font: &FontDescriptor) -> Result<Option<Arc<SysFontInfo>>> {
        if font.is_embedded() {
            return Ok(None);
        }
        self.resolve_system_font(&font.name, font.style).map(Some)
    }

    /// Resolve a font name, consulting explicit font-file mappings first.
    pub fn resolve_system_font(
        &self,
        name: &str,
        style: Option<StyleHint>,
    ) -> Result<Arc<SysFontInfo>> {
        if let Some(info) = self.font_file_override(name, style) {
            return Ok(info);
        }
        self.locator.resolve(name, style)
    }

    fn font_file_override(&self, name: &str, style: Option<StyleHint>) -> Option<Arc<SysFontInfo>> {
        let path = self.read_tables().font_files.get(name).cloned()?;
        let Some(container_type) = ContainerType::from_path(&path) else {
            self.diagnostics.error(format_args!(
                "Font file {} for '{}' has an unrecognized extension",
                path.display(),
                name
            ));
            return None;
        };
        let style = style.unwrap_or_else(|| {
            let (bold, italic) = classify(name);
            StyleHint::new(bold, italic)
        });
        Some(Arc::new(SysFontInfo {
            name: name.to_string(),
            bold: style.bold,
            italic: style.italic,
            path,
            container_type,
            font_index: 0,
        }))
    }

    /// The system font locator.
    pub fn locator(&self) -> &dyn SystemFontLocator {
        self.locator.as_ref()
    }

    /// Forget resolved system fonts.
    pub fn rescan_system_fonts(&self) {
        self.locator.rescan();
    }

    // ----- settings

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Modify settings in place.
    pub fn update_settings<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Settings) -> R,
    {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut settings);
        self.diagnostics.set_quiet(settings.err_quiet);
        result
    }

    /// Suppress or re-enable error messages.
    pub fn set_err_quiet(&self, quiet: bool) {
        self.update_settings(|s| s.err_quiet = quiet);
    }

    /// Whether error messages are suppressed.
    pub fn err_quiet(&self) -> bool {
        self.diagnostics.is_quiet()
    }
}

/// Entries of `dir` as (file name, path), sorted by name. A missing
/// directory yields nothing.
fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Skipping missing directory {}", dir.display());
            return Ok(Vec::new());
        },
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            out.push((name.to_string(), entry.path()));
        }
    }
    out.sort();
    Ok(out)
}
