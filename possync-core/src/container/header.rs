use std::io::{Read, Write};

use crate::error::{Result, SyncError};

/// Fixed size of the leading header block; field descriptors follow it.
pub const HEADER_MIN_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u8,
    /// Years since 1900, as stored on disk
    pub year_offset: u8,
    pub month: u8,
    pub day: u8,
    pub num_records: u32,
    /// Byte length of header + descriptors (+ terminator); record data starts here
    pub header_len: u16,
    pub record_len: u16,
}

impl FileHeader {
    pub fn last_modified(&self) -> Option<time::Date> {
        let month = time::Month::try_from(self.month).ok()?;
        time::Date::from_calendar_date(1900 + i32::from(self.year_offset), month, self.day).ok()
    }

    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        let mut buf = [0u8; HEADER_MIN_LEN];
        buf[0] = self.version;
        buf[1] = self.year_offset;
        buf[2] = self.month;
        buf[3] = self.day;
        buf[4..8].copy_from_slice(&self.num_records.to_le_bytes());
        buf[8..10].copy_from_slice(&self.header_len.to_le_bytes());
        buf[10..12].copy_from_slice(&self.record_len.to_le_bytes());
        w.write_all(&buf)
    }

    pub fn read_from(mut r: impl Read) -> std::io::Result<Self> {
        let mut buf = [0u8; HEADER_MIN_LEN];
        r.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }

    fn decode(b: &[u8; HEADER_MIN_LEN]) -> Self {
        Self {
            version: b[0],
            year_offset: b[1],
            month: b[2],
            day: b[3],
            num_records: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            header_len: u16::from_le_bytes([b[8], b[9]]),
            record_len: u16::from_le_bytes([b[10], b[11]]),
        }
    }

    /// Parse and validate against the size of the snapshot it came from.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let Some(head) = data.first_chunk::<HEADER_MIN_LEN>() else {
            return Err(SyncError::Format(format!(
                "file too small for header: {} bytes",
                data.len()
            )));
        };
        let hdr = Self::decode(head);
        if hdr.record_len == 0 {
            return Err(SyncError::Format("record length is 0".into()));
        }
        if usize::from(hdr.header_len) < HEADER_MIN_LEN {
            return Err(SyncError::Format(format!(
                "header length {} below minimum {}",
                hdr.header_len, HEADER_MIN_LEN
            )));
        }
        if usize::from(hdr.header_len) > data.len() {
            return Err(SyncError::Format(format!(
                "header length {} exceeds file size {}",
                hdr.header_len,
                data.len()
            )));
        }
        Ok(hdr)
    }

    #[inline]
    pub fn record_offset(&self, index: u64) -> u64 {
        u64::from(self.header_len) + index * u64::from(self.record_len)
    }
}
