use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::container::fields::{FieldDescriptor, analyze_field_structure};
use crate::container::header::FileHeader;
use crate::error::Result;
use crate::read::record::RawRecord;

/// In-memory snapshot of one legacy file. Later changes on disk are not
/// observed; call `read_file` again for a fresh snapshot.
#[derive(Debug, Clone)]
pub struct LegacyFile {
    pub path: PathBuf,
    pub header: FileHeader,
    pub fields: Vec<FieldDescriptor>,
    data: Vec<u8>,
}

/// Load and parse a legacy file.
///
/// `Ok(None)` when the path does not exist, so callers can skip a missing
/// source without aborting. A corrupt header is a `Format` error.
pub fn read_file(path: &Path) -> Result<Option<LegacyFile>> {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    LegacyFile::from_bytes(path, data).map(Some)
}

impl LegacyFile {
    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self> {
        let header = FileHeader::parse(&data)?;
        let fields = analyze_field_structure(&data, &header);
        let file = Self {
            path: path.to_path_buf(),
            header,
            fields,
            data,
        };
        let avail = file.available_records();
        if avail < u64::from(header.num_records) {
            warn!(
                path = %path.display(),
                declared = header.num_records,
                available = avail,
                "legacy file truncated; reading complete records only"
            );
        }
        debug!(
            path = %path.display(),
            records = avail,
            record_len = header.record_len,
            fields = file.fields.len(),
            "legacy file loaded"
        );
        Ok(file)
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.available_records() == 0
    }

    /// Records that fit completely inside the snapshot.
    pub fn available_records(&self) -> u64 {
        let body = self.len().saturating_sub(u64::from(self.header.header_len));
        let fit = body / u64::from(self.header.record_len);
        fit.min(u64::from(self.header.num_records))
    }

    #[inline]
    pub fn record_offset(&self, index: u64) -> u64 {
        self.header.record_offset(index)
    }

    pub fn record(&self, index: u64) -> Option<RawRecord<'_>> {
        if index >= self.available_records() {
            return None;
        }
        let off = self.record_offset(index);
        let start = usize::try_from(off).ok()?;
        let end = start.checked_add(usize::from(self.header.record_len))?;
        let bytes = self.data.get(start..end)?;
        Some(RawRecord::new(index, off, bytes))
    }

    /// Every complete record, in file order.
    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> + '_ {
        (0..self.available_records()).filter_map(move |i| self.record(i))
    }

    /// Bounded preview for diagnostics; never use for synchronization.
    pub fn sample(&self, limit: usize) -> Vec<RawRecord<'_>> {
        self.records().take(limit).collect()
    }

    /// blake3 over the whole snapshot.
    pub fn fingerprint(&self) -> [u8; 32] {
        *blake3::hash(&self.data).as_bytes()
    }

    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint())
    }
}
