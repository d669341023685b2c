//! Platform font-matching services.
//!
//! A [`FontService`] answers "which installed font has this PostScript
//! name" and exposes the font's sfnt tables. Handles are opaque: they may
//! point at a standalone file, a member of a collection, or font data that
//! only exists in memory. [`FontdbService`] is the bundled implementation
//! backed by a `fontdb` database.

use std::fmt;
use std::path::PathBuf;

use fontdb::{Database, Source, ID};
use ttf_parser::{RawFace, Tag};

use super::sfnt::TableDirectory;

/// Access to the fonts a platform knows about.
pub trait FontService: Send + Sync {
    /// Opaque reference to one face
    type Handle: Copy + fmt::Debug + Send + Sync;

    /// Find a face by exact PostScript name.
    fn find_by_postscript_name(&self, name: &str) -> Option<Self::Handle>;

    /// Table directory of the face.
    fn table_directory(&self, handle: Self::Handle) -> Option<TableDirectory>;

    /// Raw bytes of one table.
    fn table(&self, handle: Self::Handle, tag: Tag) -> Option<Vec<u8>>;

    /// Path of the file holding exactly this face, if there is one.
    fn direct_file_path(&self, handle: Self::Handle) -> Option<PathBuf>;

    /// Total size of the data the face's table offsets refer into.
    fn data_len(&self, handle: Self::Handle) -> Option<u64>;

    /// Length of one table, or `None` if the face does not have it.
    fn table_len(&self, handle: Self::Handle, tag: Tag) -> Option<u32> {
        self.table_directory(handle)?.find(tag).map(|r| r.length)
    }
}

/// [`FontService`] over a `fontdb` database.
///
/// Faces loaded from standalone files are file-backed. Faces inside a
/// collection file or loaded from memory are not, and go through
/// extraction.
pub struct FontdbService {
    db: Database,
}

impl fmt::Debug for FontdbService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontdbService")
            .field("faces", &self.db.len())
            .finish()
    }
}

impl FontdbService {
    /// Wrap an existing database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Load every font installed on the system.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::info!("Loaded {} system font faces", db.len());
        Self { db }
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The underlying database, for loading extra fonts.
    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }
}

impl FontService for FontdbService {
    type Handle = ID;

    fn find_by_postscript_name(&self, name: &str) -> Option<ID> {
        self.db
            .faces()
            .find(|face| face.post_script_name == name)
            .map(|face| face.id)
    }

    fn table_directory(&self, id: ID) -> Option<TableDirectory> {
        self.db
            .with_face_data(id, |data, index| match TableDirectory::parse(data, index) {
                Ok(dir) => Some(dir),
                Err(e) => {
                    log::debug!("Unreadable table directory for {:?}: {}", id, e);
                    None
                },
            })
            .flatten()
    }

    fn table(&self, id: ID, tag: Tag) -> Option<Vec<u8>> {
        self.db
            .with_face_data(id, |data, index| {
                let face = RawFace::parse(data, index).ok()?;
                face.table(tag).map(<[u8]>::to_vec)
            })
            .flatten()
    }

    fn direct_file_path(&self, id: ID) -> Option<PathBuf> {
        let face = self.db.face(id)?;
        if face.index != 0 {
            return None;
        }
        match &face.source {
            Source::File(path) | Source::SharedFile(path, _) => Some(path.clone()),
            Source::Binary(_) => None,
        }
    }

    fn data_len(&self, id: ID) -> Option<u64> {
        self.db.with_face_data(id, |data, _| data.len() as u64)
    }

    fn table_len(&self, id: ID, tag: Tag) -> Option<u32> {
        self.db
            .with_face_data(id, |data, index| {
                let face = RawFace::parse(data, index).ok()?;
                face.table(tag).map(|t| t.len() as u32)
            })
            .flatten()
    }
}
