use serde::Serialize;

use crate::container::header::{FileHeader, HEADER_MIN_LEN};

pub const DESCRIPTOR_SIZE: usize = 32;
pub const HEADER_TERMINATOR: u8 = 0x0D;
const NAME_LEN: usize = 11;

/// Inferred layout of one named sub-range of a record. Advisory only:
/// extraction works off fixed offset tables, not these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: char,
    pub length: u8,
    pub decimals: u8,
    /// Offset within a record; byte 0 is the deletion flag
    pub offset: usize,
}

/// Walk descriptor blocks from offset 32 up to `header_len - 1`.
///
/// Best-effort: stops at the terminator, an empty name, or the first block
/// that is structurally invalid (runs past header/file, zero length, non
/// alphabetic type code). Never fails.
pub fn analyze_field_structure(data: &[u8], header: &FileHeader) -> Vec<FieldDescriptor> {
    let limit = usize::from(header.header_len)
        .saturating_sub(1)
        .min(data.len());
    let mut out = Vec::new();
    let mut off = HEADER_MIN_LEN;
    let mut rec_off = 1usize;

    while off + DESCRIPTOR_SIZE <= limit {
        let d = &data[off..off + DESCRIPTOR_SIZE];
        if d[0] == HEADER_TERMINATOR {
            break;
        }
        let name_end = d[..NAME_LEN].iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let name: String = d[..name_end].iter().map(|&b| b as char).collect();
        let name = name.trim().to_string();
        if name.is_empty() {
            break;
        }
        let kind = d[11];
        let length = d[16];
        if !kind.is_ascii_alphabetic() || length == 0 {
            break;
        }
        out.push(FieldDescriptor {
            name,
            kind: kind as char,
            length,
            decimals: d[17],
            offset: rec_off,
        });
        rec_off += usize::from(length);
        off += DESCRIPTOR_SIZE;
    }
    out
}
