/// One fixed-length slice of a legacy file body.
///
/// Text access is Latin-1: every byte maps to exactly one `char`, so byte
/// offset `i` is always character index `i`, whatever the byte values.
#[derive(Clone, Copy, Debug)]
pub struct RawRecord<'a> {
    pub index: u64,
    /// Absolute offset in the file
    pub offset: u64,
    pub bytes: &'a [u8],
}

impl<'a> RawRecord<'a> {
    pub fn new(index: u64, offset: u64, bytes: &'a [u8]) -> Self {
        Self {
            index,
            offset,
            bytes,
        }
    }

    pub fn text(&self) -> String {
        latin1(self.bytes)
    }

    /// Positional substring, clamped to the record; never panics.
    pub fn slice(&self, start: usize, len: usize) -> &'a [u8] {
        let s = start.min(self.bytes.len());
        let e = start.saturating_add(len).min(self.bytes.len());
        &self.bytes[s..e]
    }

    /// Latin-1 decoded, whitespace and NUL trimmed.
    pub fn field(&self, start: usize, len: usize) -> String {
        latin1(self.slice(start, len))
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .to_string()
    }

    /// Deletion flag set (`*` in byte 0).
    pub fn is_deleted(&self) -> bool {
        self.bytes.first() == Some(&b'*')
    }
}

pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
