//! Shared fixtures for integration tests: an in-memory font service and a
//! loader that counts its calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use pdf_registry::fonts::sfnt::{
    TableDirectory, TableRecord, HEADER_SIZE, RECORD_SIZE, TRUETYPE_VERSION,
};
use pdf_registry::fonts::FontService;
use pdf_registry::{RawResource, RawResourceLoader, ResourceLoader, ResourceSource, Result};
use ttf_parser::Tag;

/// A face the mock service can hand out.
#[derive(Debug, Clone)]
pub struct MockFace {
    pub directory: Option<TableDirectory>,
    pub tables: HashMap<Tag, Vec<u8>>,
    pub path: Option<PathBuf>,
    pub data_len: Option<u64>,
}

impl MockFace {
    /// TrueType face with the given tables laid out after the directory,
    /// 4-byte aligned, records sorted by tag.
    pub fn truetype(tables: &[(&[u8; 4], Vec<u8>)]) -> Self {
        let mut sorted: Vec<_> = tables.iter().collect();
        sorted.sort_by_key(|(tag, _)| Tag::from_bytes(tag));

        let mut offset = (HEADER_SIZE + tables.len() * RECORD_SIZE) as u32;
        let mut records = Vec::new();
        let mut bytes = HashMap::new();
        for (tag, data) in sorted {
            let record = TableRecord::new(tag, 0, offset, data.len() as u32);
            offset += (data.len() as u32 + 3) & !3;
            bytes.insert(record.tag, data.clone());
            records.push(record);
        }
        Self {
            directory: Some(TableDirectory {
                version: TRUETYPE_VERSION,
                records,
            }),
            tables: bytes,
            path: None,
            data_len: Some(offset as u64),
        }
    }

    /// A minimal face with TrueType outlines.
    pub fn with_outlines() -> Self {
        Self::truetype(&[
            (b"head", vec![0x11; 54]),
            (b"glyf", vec![0x22; 10]),
            (b"loca", vec![0x33; 6]),
        ])
    }

    /// Same face, but a CFF face without a glyf table.
    pub fn without_outlines() -> Self {
        Self::truetype(&[(b"head", vec![0x11; 54]), (b"CFF ", vec![0x44; 30])])
    }

    pub fn at_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        if let Some(dir) = self.directory.as_mut() {
            dir.version = version;
        }
        self
    }
}

/// In-memory [`FontService`] with call counters.
#[derive(Debug, Default)]
pub struct MockFontService {
    faces: Vec<(String, MockFace)>,
    pub lookups: AtomicUsize,
    pub table_reads: AtomicUsize,
}

impl MockFontService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_face(mut self, name: &str, face: MockFace) -> Self {
        self.faces.push((name.to_string(), face));
        self
    }

    /// The four Helvetica members, each backed by its own `.ttf` path.
    pub fn with_helvetica(self) -> Self {
        ["Helvetica", "Helvetica-Bold", "Helvetica-Oblique", "Helvetica-BoldOblique"]
            .iter()
            .fold(self, |service, name| {
                service.with_face(
                    name,
                    MockFace::with_outlines().at_path(format!("/System/Fonts/{}.ttf", name)),
                )
            })
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn face(&self, handle: usize) -> Option<&MockFace> {
        self.faces.get(handle).map(|(_, face)| face)
    }
}

impl FontService for MockFontService {
    type Handle = usize;

    fn find_by_postscript_name(&self, name: &str) -> Option<usize> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.faces.iter().position(|(n, _)| n == name)
    }

    fn table_directory(&self, handle: usize) -> Option<TableDirectory> {
        self.face(handle)?.directory.clone()
    }

    fn table(&self, handle: usize, tag: Tag) -> Option<Vec<u8>> {
        self.table_reads.fetch_add(1, Ordering::SeqCst);
        self.face(handle)?.tables.get(&tag).cloned()
    }

    fn direct_file_path(&self, handle: usize) -> Option<PathBuf> {
        self.face(handle)?.path.clone()
    }

    fn data_len(&self, handle: usize) -> Option<u64> {
        self.face(handle)?.data_len
    }
}

/// [`RawResourceLoader`] that counts how often it is called.
#[derive(Debug, Default)]
pub struct CountingLoader {
    inner: RawResourceLoader,
    pub loads: AtomicUsize,
}

impl CountingLoader {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ResourceLoader for CountingLoader {
    type ToUnicode = RawResource;
    type UnicodeMap = RawResource;
    type CMap = RawResource;

    fn load_cid_to_unicode(&self, collection: &str, path: &Path) -> Result<RawResource> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_cid_to_unicode(collection, path)
    }

    fn load_unicode_to_unicode(&self, font_name: &str, path: &Path) -> Result<RawResource> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_unicode_to_unicode(font_name, path)
    }

    fn load_unicode_map(&self, encoding: &str, path: &Path) -> Result<RawResource> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_unicode_map(encoding, path)
    }

    fn load_cmap(
        &self,
        collection: &str,
        cmap_name: &str,
        source: ResourceSource<'_>,
    ) -> Result<RawResource> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_cmap(collection, cmap_name, source)
    }
}

/// Write `contents` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}
