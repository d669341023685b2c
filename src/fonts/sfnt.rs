//! Rebuilding standalone TrueType files from opaque font handles.
//!
//! Some platform font services only expose a font as a handle into a larger
//! container (a `.ttc` collection, a suitcase, or an in-memory blob).
//! Downstream font parsers need an individually addressable file, so the
//! font's tables are copied into a fresh sfnt container that holds only that
//! font. Tables keep the offsets reported by the source directory; only the
//! header and table directory are rewritten.
//!
//! # sfnt layout
//!
//! ```text
//! offset  size  field
//! 0       4     version (0x00010000 or 'true')
//! 4       2     numTables
//! 6       2     searchRange    = 16 * 2^floor(log2(numTables))
//! 8       2     entrySelector  = floor(log2(numTables))
//! 10      2     rangeShift     = numTables * 16 - searchRange
//! 12      16*n  table records (tag, checksum, offset, length)
//! ```

use std::io;
use std::path::PathBuf;

use byteorder::{BigEndian, ByteOrder};
use ttf_parser::Tag;

use super::service::FontService;
use super::temp_files::TempFontArea;

/// TrueType outline container version.
pub const TRUETYPE_VERSION: u32 = 0x0001_0000;
/// Legacy Apple TrueType signature, `'true'`.
pub const APPLE_TRUE_VERSION: u32 = 0x7472_7565;
/// CFF-flavored OpenType signature, `'OTTO'`.
pub const OPENTYPE_CFF_VERSION: u32 = 0x4F54_544F;
/// Font collection signature, `'ttcf'`.
pub const COLLECTION_TAG: u32 = 0x7474_6366;

/// Size of the offset table preceding the table records.
pub const HEADER_SIZE: usize = 12;
/// Size of one table record.
pub const RECORD_SIZE: usize = 16;

/// Largest table count whose directory fields fit in 16 bits.
const MAX_TABLES: usize = 4095;

/// Error types for sfnt extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Container signature is not TrueType-flavored
    #[error("Unsupported font container signature 0x{0:08X}")]
    UnsupportedFormat(u32),

    /// The handle's table directory could not be read
    #[error("Malformed table directory: {0}")]
    MalformedDirectory(String),

    /// A table could not be copied out of the source
    #[error("Failed to copy table '{tag}': {reason}")]
    CopyError {
        /// Table tag
        tag: Tag,
        /// What went wrong
        reason: String,
    },

    /// The rebuilt font could not be written
    #[error("Failed to write extracted font: {0}")]
    WriteError(#[from] io::Error),
}

/// One entry of an sfnt table directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    /// Table tag
    pub tag: Tag,
    /// Table checksum, carried over unchanged
    pub checksum: u32,
    /// Byte offset of the table from the start of the container.
    /// Zero marks a synthetic table with no physical data.
    pub offset: u32,
    /// Table length in bytes
    pub length: u32,
}

impl TableRecord {
    /// Build a record.
    pub fn new(tag: &[u8; 4], checksum: u32, offset: u32, length: u32) -> Self {
        Self {
            tag: Tag::from_bytes(tag),
            checksum,
            offset,
            length,
        }
    }

    /// True for entries that have bytes in the container.
    pub fn is_physical(&self) -> bool {
        self.offset != 0
    }

    /// One past the last byte of the table.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }
}

/// A font's table directory as reported by its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDirectory {
    /// Container version / signature
    pub version: u32,
    /// Table records, in source order
    pub records: Vec<TableRecord>,
}

impl TableDirectory {
    /// Parse the directory of face `index` from raw font data.
    ///
    /// For a collection (`ttcf`) the face's offset table is located through
    /// the collection header; for a plain sfnt `index` must be 0.
    pub fn parse(data: &[u8], index: u32) -> Result<Self, ExtractError> {
        let mut base = 0usize;
        if read_u32(data, 0)? == COLLECTION_TAG {
            let num_fonts = read_u32(data, 8)?;
            if index >= num_fonts {
                return Err(ExtractError::MalformedDirectory(format!(
                    "face {} out of range, collection has {}",
                    index, num_fonts
                )));
            }
            base = read_u32(data, 12 + 4 * index as usize)? as usize;
        } else if index != 0 {
            return Err(ExtractError::MalformedDirectory(format!(
                "face {} requested from a single-font container",
                index
            )));
        }

        let version = read_u32(data, base)?;
        let num_tables = read_u16(data, base + 4)? as usize;
        let mut records = Vec::with_capacity(num_tables);
        for i in 0..num_tables {
            let at = base + HEADER_SIZE + i * RECORD_SIZE;
            records.push(TableRecord {
                tag: Tag(read_u32(data, at)?),
                checksum: read_u32(data, at + 4)?,
                offset: read_u32(data, at + 8)?,
                length: read_u32(data, at + 12)?,
            });
        }

        Ok(Self { version, records })
    }

    /// The record for `tag`, if present.
    pub fn find(&self, tag: Tag) -> Option<&TableRecord> {
        self.records.iter().find(|r| r.tag == tag)
    }
}

fn read_u32(data: &[u8], at: usize) -> Result<u32, ExtractError> {
    data.get(at..at + 4)
        .map(BigEndian::read_u32)
        .ok_or_else(|| ExtractError::MalformedDirectory(format!("truncated at byte {}", at)))
}

fn read_u16(data: &[u8], at: usize) -> Result<u16, ExtractError> {
    data.get(at..at + 2)
        .map(BigEndian::read_u16)
        .ok_or_else(|| ExtractError::MalformedDirectory(format!("truncated at byte {}", at)))
}

/// Binary-search fields of an sfnt offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SfntHeader {
    /// Number of table records
    pub num_tables: u16,
    /// 16 × largest power of two ≤ `num_tables`
    pub search_range: u16,
    /// log2 of that power of two
    pub entry_selector: u16,
    /// `num_tables × 16 − search_range`
    pub range_shift: u16,
}

impl SfntHeader {
    /// Compute the header fields for `num_tables` records.
    ///
    /// Only meaningful up to 4095 tables; [`SfntPlan::new`] enforces the cap.
    pub(crate) fn for_table_count(num_tables: u16) -> Self {
        if num_tables == 0 {
            return Self::default();
        }
        let entry_selector = 15 - num_tables.leading_zeros() as u16;
        let search_range = (1u32 << entry_selector) * RECORD_SIZE as u32;
        let range_shift = u32::from(num_tables) * RECORD_SIZE as u32 - search_range;
        Self {
            num_tables,
            search_range: search_range as u16,
            entry_selector,
            range_shift: range_shift as u16,
        }
    }
}

/// Layout of the rebuilt container, computed before any table is copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfntPlan {
    version: u32,
    records: Vec<TableRecord>,
    header: SfntHeader,
    data_len: usize,
}

impl SfntPlan {
    /// Validate a source directory and lay out the output.
    ///
    /// `available` is the total size of the source data, when the service
    /// can report it. Every physical table must lie inside it; the
    /// directory's own offsets are not trusted.
    pub fn new(directory: &TableDirectory, available: Option<u64>) -> Result<Self, ExtractError> {
        if directory.version != TRUETYPE_VERSION && directory.version != APPLE_TRUE_VERSION {
            return Err(ExtractError::UnsupportedFormat(directory.version));
        }

        let mut data_end = 0u64;
        let mut records = Vec::with_capacity(directory.records.len());
        for record in &directory.records {
            if !record.is_physical() {
                log::trace!("Skipping synthetic table '{}'", record.tag);
                continue;
            }
            if let Some(total) = available {
                if record.end() > total {
                    return Err(ExtractError::CopyError {
                        tag: record.tag,
                        reason: format!(
                            "range {}..{} exceeds {} bytes of font data",
                            record.offset,
                            record.end(),
                            total
                        ),
                    });
                }
            }
            data_end = data_end.max(record.end());
            records.push(*record);
        }

        if records.len() > MAX_TABLES {
            return Err(ExtractError::MalformedDirectory(format!(
                "{} tables",
                records.len()
            )));
        }
        let data_len = usize::try_from(data_end).map_err(|_| {
            ExtractError::MalformedDirectory(format!("font data of {} bytes", data_end))
        })?;

        Ok(Self {
            version: directory.version,
            header: SfntHeader::for_table_count(records.len() as u16),
            records,
            data_len,
        })
    }

    /// Container version, copied from the source.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Physical tables that will be copied.
    pub fn records(&self) -> &[TableRecord] {
        &self.records
    }

    /// Recomputed header fields.
    pub fn header(&self) -> SfntHeader {
        self.header
    }

    /// Maximum `offset + length` over the physical tables.
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Bytes taken by the rewritten offset table and directory.
    pub fn directory_len(&self) -> usize {
        HEADER_SIZE + self.records.len() * RECORD_SIZE
    }

    /// Size of the assembled file.
    pub fn output_len(&self) -> usize {
        self.data_len.max(self.directory_len())
    }

    /// Copy every table through `fetch` and write the new header.
    ///
    /// `fetch` returns the raw bytes of a table. A missing or short table
    /// fails the whole assembly; nothing partial is returned.
    pub fn assemble<F>(&self, mut fetch: F) -> Result<Vec<u8>, ExtractError>
    where
        F: FnMut(&TableRecord) -> Option<Vec<u8>>,
    {
        let mut out = vec![0u8; self.output_len()];
        let directory_len = self.directory_len();

        for record in &self.records {
            if (record.offset as usize) < directory_len {
                log::warn!(
                    "Table '{}' at offset {} overlaps the {}-byte table directory",
                    record.tag,
                    record.offset,
                    directory_len
                );
            }
            let bytes = fetch(record).ok_or_else(|| ExtractError::CopyError {
                tag: record.tag,
                reason: "table not available".to_string(),
            })?;
            let len = record.length as usize;
            if bytes.len() < len {
                return Err(ExtractError::CopyError {
                    tag: record.tag,
                    reason: format!("expected {} bytes, got {}", len, bytes.len()),
                });
            }
            let start = record.offset as usize;
            out[start..start + len].copy_from_slice(&bytes[..len]);
        }

        BigEndian::write_u32(&mut out[0..4], self.version);
        BigEndian::write_u16(&mut out[4..6], self.header.num_tables);
        BigEndian::write_u16(&mut out[6..8], self.header.search_range);
        BigEndian::write_u16(&mut out[8..10], self.header.entry_selector);
        BigEndian::write_u16(&mut out[10..12], self.header.range_shift);
        for (i, record) in self.records.iter().enumerate() {
            let at = HEADER_SIZE + i * RECORD_SIZE;
            BigEndian::write_u32(&mut out[at..at + 4], record.tag.0);
            BigEndian::write_u32(&mut out[at + 4..at + 8], record.checksum);
            BigEndian::write_u32(&mut out[at + 8..at + 12], record.offset);
            BigEndian::write_u32(&mut out[at + 12..at + 16], record.length);
        }

        Ok(out)
    }
}

/// Materializes opaque font handles as standalone `.ttf` files.
#[derive(Debug)]
pub struct SfntExtractor {
    area: TempFontArea,
}

impl SfntExtractor {
    /// Create an extractor writing into `area`.
    pub fn new(area: TempFontArea) -> Self {
        Self { area }
    }

    /// Temporary area holding the extracted files.
    pub fn area(&self) -> &TempFontArea {
        &self.area
    }

    /// Rebuild the font behind `handle` and write it to a new file.
    ///
    /// The returned path is registered with the temporary area and removed
    /// when the area is dropped.
    pub fn extract<S>(&self, service: &S, handle: S::Handle) -> Result<PathBuf, ExtractError>
    where
        S: FontService + ?Sized,
    {
        let directory = service.table_directory(handle).ok_or_else(|| {
            ExtractError::MalformedDirectory("table directory not available".to_string())
        })?;
        let plan = SfntPlan::new(&directory, service.data_len(handle))?;
        let bytes = plan.assemble(|record| service.table(handle, record.tag))?;
        let path = self.area.persist(&bytes)?;

        log::debug!(
            "Extracted {} tables ({} bytes) from {:?} to {}",
            plan.records().len(),
            bytes.len(),
            handle,
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(version: u32, records: Vec<TableRecord>) -> TableDirectory {
        TableDirectory { version, records }
    }

    #[test]
    fn test_header_for_common_counts() {
        assert_eq!(SfntHeader::for_table_count(0), SfntHeader::default());
        assert_eq!(
            SfntHeader::for_table_count(1),
            SfntHeader { num_tables: 1, search_range: 16, entry_selector: 0, range_shift: 0 }
        );
        assert_eq!(
            SfntHeader::for_table_count(2),
            SfntHeader { num_tables: 2, search_range: 32, entry_selector: 1, range_shift: 0 }
        );
        assert_eq!(
            SfntHeader::for_table_count(11),
            SfntHeader { num_tables: 11, search_range: 128, entry_selector: 3, range_shift: 48 }
        );
        assert_eq!(
            SfntHeader::for_table_count(16),
            SfntHeader { num_tables: 16, search_range: 256, entry_selector: 4, range_shift: 0 }
        );
    }

    #[test]
    fn test_plan_skips_synthetic_tables() {
        let dir = directory(
            TRUETYPE_VERSION,
            vec![
                TableRecord::new(b"AAAA", 1, 12, 20),
                TableRecord::new(b"BBBB", 2, 32, 8),
                TableRecord::new(b"CCCC", 3, 0, 5),
            ],
        );
        let plan = SfntPlan::new(&dir, None).unwrap();
        assert_eq!(plan.data_len(), 40);
        assert_eq!(plan.records().len(), 2);
        assert_eq!(
            plan.header(),
            SfntHeader { num_tables: 2, search_range: 32, entry_selector: 1, range_shift: 0 }
        );
    }

    #[test]
    fn test_synthetic_length_does_not_size_output() {
        let dir = directory(
            TRUETYPE_VERSION,
            vec![
                TableRecord::new(b"AAAA", 1, 12, 20),
                TableRecord::new(b"ZZZZ", 0, 0, u32::MAX),
            ],
        );
        let plan = SfntPlan::new(&dir, Some(32)).unwrap();
        assert_eq!(plan.data_len(), 32);
        assert_eq!(plan.output_len(), 32);
    }

    #[test]
    fn test_plan_accepts_apple_signature() {
        let dir = directory(APPLE_TRUE_VERSION, vec![TableRecord::new(b"glyf", 0, 28, 4)]);
        assert_eq!(SfntPlan::new(&dir, None).unwrap().version(), APPLE_TRUE_VERSION);
    }

    #[test]
    fn test_plan_rejects_cff_signature() {
        let dir = directory(OPENTYPE_CFF_VERSION, vec![TableRecord::new(b"CFF ", 0, 28, 4)]);
        let err = SfntPlan::new(&dir, None).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(OPENTYPE_CFF_VERSION)));
    }

    #[test]
    fn test_plan_rejects_out_of_range_table() {
        let dir = directory(TRUETYPE_VERSION, vec![TableRecord::new(b"glyf", 0, 28, 100)]);
        let err = SfntPlan::new(&dir, Some(64)).unwrap_err();
        match err {
            ExtractError::CopyError { tag, .. } => assert_eq!(tag, Tag::from_bytes(b"glyf")),
            other => panic!("unexpected error: {other}"),
        }
        // Without a reported size the directory is taken at its word
        assert!(SfntPlan::new(&dir, None).is_ok());
    }

    #[test]
    fn test_assemble_writes_header_and_tables() {
        // Two records: directory ends at 12 + 2*16 = 44
        let dir = directory(
            TRUETYPE_VERSION,
            vec![
                TableRecord::new(b"glyf", 0xAAAA_AAAA, 44, 4),
                TableRecord::new(b"ZZZZ", 0, 0, 16),
                TableRecord::new(b"head", 0xBBBB_BBBB, 48, 8),
            ],
        );
        let plan = SfntPlan::new(&dir, None).unwrap();
        let out = plan
            .assemble(|r| match &r.tag.to_bytes() {
                b"glyf" => Some(vec![1, 2, 3, 4]),
                b"head" => Some(vec![5; 8]),
                _ => None,
            })
            .unwrap();

        assert_eq!(out.len(), 56);
        assert_eq!(BigEndian::read_u32(&out[0..4]), TRUETYPE_VERSION);
        assert_eq!(BigEndian::read_u16(&out[4..6]), 2);
        assert_eq!(BigEndian::read_u16(&out[6..8]), 32);
        assert_eq!(BigEndian::read_u16(&out[8..10]), 1);
        assert_eq!(BigEndian::read_u16(&out[10..12]), 0);
        assert_eq!(&out[44..48], &[1, 2, 3, 4]);
        assert_eq!(&out[48..56], &[5; 8]);

        // Round-trip through the directory parser
        let reparsed = TableDirectory::parse(&out, 0).unwrap();
        assert_eq!(reparsed.records.len(), 2);
        assert_eq!(reparsed.find(Tag::from_bytes(b"head")).unwrap().checksum, 0xBBBB_BBBB);
    }

    #[test]
    fn test_assemble_fails_on_missing_table() {
        let dir = directory(TRUETYPE_VERSION, vec![TableRecord::new(b"glyf", 0, 28, 4)]);
        let plan = SfntPlan::new(&dir, None).unwrap();
        let err = plan.assemble(|_| None).unwrap_err();
        assert!(matches!(err, ExtractError::CopyError { .. }));
    }

    #[test]
    fn test_assemble_fails_on_short_table() {
        let dir = directory(TRUETYPE_VERSION, vec![TableRecord::new(b"glyf", 0, 28, 4)]);
        let plan = SfntPlan::new(&dir, None).unwrap();
        let err = plan.assemble(|_| Some(vec![0; 2])).unwrap_err();
        assert!(matches!(err, ExtractError::CopyError { .. }));
    }

    #[test]
    fn test_parse_collection_member() {
        // ttcf header with two faces; second face's offset table at 40
        let mut data = vec![0u8; 40 + HEADER_SIZE + RECORD_SIZE];
        BigEndian::write_u32(&mut data[0..4], COLLECTION_TAG);
        BigEndian::write_u32(&mut data[4..8], 0x0001_0000);
        BigEndian::write_u32(&mut data[8..12], 2);
        BigEndian::write_u32(&mut data[12..16], 20);
        BigEndian::write_u32(&mut data[16..20], 40);
        BigEndian::write_u32(&mut data[40..44], TRUETYPE_VERSION);
        BigEndian::write_u16(&mut data[44..46], 1);
        data[52..56].copy_from_slice(b"glyf");
        BigEndian::write_u32(&mut data[60..64], 1000);
        BigEndian::write_u32(&mut data[64..68], 12);

        let dir = TableDirectory::parse(&data, 1).unwrap();
        assert_eq!(dir.version, TRUETYPE_VERSION);
        assert_eq!(dir.records, vec![TableRecord::new(b"glyf", 0, 1000, 12)]);

        assert!(TableDirectory::parse(&data, 2).is_err());
    }

    #[test]
    fn test_parse_truncated_directory() {
        let mut data = vec![0u8; HEADER_SIZE];
        BigEndian::write_u32(&mut data[0..4], TRUETYPE_VERSION);
        BigEndian::write_u16(&mut data[4..6], 3);
        let err = TableDirectory::parse(&data, 0).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDirectory(_)));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn header_fields_are_consistent(n in 1u16..=4095) {
                let h = SfntHeader::for_table_count(n);
                let pow = 1u32 << h.entry_selector;
                prop_assert!(pow <= u32::from(n));
                prop_assert!(pow * 2 > u32::from(n));
                prop_assert_eq!(u32::from(h.search_range), pow * 16);
                prop_assert_eq!(
                    u32::from(h.range_shift),
                    u32::from(n) * 16 - u32::from(h.search_range)
                );
            }
        }
    }
}
