use crate::archive::codec::{ByteReader, ByteWriter};
use crate::error::Result;

/// Interning dictionary of MIME type strings.
///
/// Indices are assigned in insertion order and stay stable for the life of
/// the dictionary; directory entries refer to MIME types by these indices.
/// On disk the dictionary is the strings joined by NUL bytes and terminated
/// by an empty string (a second NUL).
#[derive(Debug, Clone, Default)]
pub struct MimeDictionary {
    types: Vec<String>,
}

impl MimeDictionary {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Intern a MIME type, returning its index. Repeated interning of the
    /// same string returns the original index.
    pub fn intern(&mut self, mime: &str) -> u32 {
        if let Some(idx) = self.types.iter().position(|m| m == mime) {
            return idx as u32;
        }
        self.types.push(mime.to_string());
        (self.types.len() - 1) as u32
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.types.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    /// Emit the dictionary: each type NUL-terminated, then the empty-string
    /// sentinel.
    pub fn emit(&self, writer: &mut ByteWriter) {
        for mime in &self.types {
            writer.write_cstring(mime);
        }
        writer.write_u8(0);
    }

    /// Parse a dictionary, consuming entries up to and including the
    /// empty-string sentinel.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let mut types = Vec::new();
        loop {
            let mime = reader.read_string()?;
            if mime.is_empty() {
                break;
            }
            types.push(mime);
        }
        Ok(Self { types })
    }
}
