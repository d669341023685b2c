//! Loader collaborators for encoding resources.
//!
//! The registry decides *which* file (or in-memory stream) backs a resource
//! and caches the result; turning those bytes into a usable table is the job
//! of a [`ResourceLoader`]. Renderers plug in their own parsers by
//! implementing the trait. [`RawResourceLoader`] is the bundled
//! implementation: it reads the bytes and leaves parsing to the consumer.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, ResourceKind, Result};

/// Where a resource's bytes come from.
#[derive(Debug, Clone, Copy)]
pub enum ResourceSource<'a> {
    /// A file located through the registry's configuration tables
    File(&'a Path),
    /// Bytes supplied by the caller, e.g. an embedded CMap stream
    Stream(&'a [u8]),
}

/// Parses located resources into loaded objects.
///
/// Implementations must be shareable across rendering threads. Returning
/// [`Error::ResourceNotFound`] marks a plain miss; any other error is
/// treated as a load failure. Both leave the cache untouched.
pub trait ResourceLoader: Send + Sync {
    /// Character code to Unicode table (CID-to-Unicode and Unicode-to-Unicode)
    type ToUnicode: Send + Sync;
    /// Unicode to output encoding table
    type UnicodeMap: Send + Sync;
    /// Character code to CID table
    type CMap: Send + Sync;

    /// Load the CID-to-Unicode table of a character collection.
    fn load_cid_to_unicode(&self, collection: &str, path: &Path) -> Result<Self::ToUnicode>;

    /// Load a Unicode-to-Unicode remapping for fonts matching `font_name`.
    fn load_unicode_to_unicode(&self, font_name: &str, path: &Path) -> Result<Self::ToUnicode>;

    /// Load the Unicode map for an output encoding.
    fn load_unicode_map(&self, encoding: &str, path: &Path) -> Result<Self::UnicodeMap>;

    /// Load a CMap from a located file or an embedded stream.
    fn load_cmap(
        &self,
        collection: &str,
        cmap_name: &str,
        source: ResourceSource<'_>,
    ) -> Result<Self::CMap>;
}

/// Resource bytes, unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResource {
    /// Key the resource was requested under
    pub name: String,
    /// File it was read from, `None` for in-memory streams
    pub origin: Option<PathBuf>,
    /// Raw content
    pub data: Vec<u8>,
}

/// Loader that reads resource files without interpreting them.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawResourceLoader;

impl RawResourceLoader {
    fn read(kind: ResourceKind, name: &str, path: &Path) -> Result<RawResource> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ResourceNotFound {
                kind,
                name: name.to_string(),
            },
            _ => Error::ResourceLoad {
                kind,
                name: name.to_string(),
                reason: format!("{}: {}", path.display(), e),
            },
        })?;

        if data.is_empty() {
            return Err(Error::ResourceLoad {
                kind,
                name: name.to_string(),
                reason: format!("{} is empty", path.display()),
            });
        }

        log::debug!("Loaded {} '{}' from {} ({} bytes)", kind, name, path.display(), data.len());
        Ok(RawResource {
            name: name.to_string(),
            origin: Some(path.to_path_buf()),
            data,
        })
    }
}

impl ResourceLoader for RawResourceLoader {
    type ToUnicode = RawResource;
    type UnicodeMap = RawResource;
    type CMap = RawResource;

    fn load_cid_to_unicode(&self, collection: &str, path: &Path) -> Result<RawResource> {
        Self::read(ResourceKind::CidToUnicode, collection, path)
    }

    fn load_unicode_to_unicode(&self, font_name: &str, path: &Path) -> Result<RawResource> {
        Self::read(ResourceKind::UnicodeToUnicode, font_name, path)
    }

    fn load_unicode_map(&self, encoding: &str, path: &Path) -> Result<RawResource> {
        Self::read(ResourceKind::UnicodeMap, encoding, path)
    }

    fn load_cmap(
        &self,
        _collection: &str,
        cmap_name: &str,
        source: ResourceSource<'_>,
    ) -> Result<RawResource> {
        match source {
            ResourceSource::File(path) => Self::read(ResourceKind::CMap, cmap_name, path),
            ResourceSource::Stream(data) => Ok(RawResource {
                name: cmap_name.to_string(),
                origin: None,
                data: data.to_vec(),
            }),
        }
    }
}
