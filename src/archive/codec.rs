use crate::error::{Result, ZimError};

/// Bounded little-endian cursor over a byte slice.
///
/// All reads are bounds-checked; running past the end of the slice fails with
/// `Truncated` instead of panicking. Strings are stored NUL-terminated and may
/// carry arbitrary bytes; UTF-8 validation happens only in `read_string`.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Bytes left before the end of the slice.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move the cursor to an absolute position within the slice.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(ZimError::Truncated {
                at: self.data.len() as u64,
                need: pos - self.data.len() as u64,
            });
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(ZimError::Truncated {
                at: self.pos as u64,
                need: (count - self.remaining()) as u64,
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read exactly `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    /// Read the raw bytes of a NUL-terminated string, consuming the NUL.
    ///
    /// The terminator is not included in the returned slice. A string that
    /// runs off the end of the slice without a NUL is a truncation.
    pub fn read_cstring(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        match self.data[start..].iter().position(|&b| b == 0) {
            Some(nul) => {
                self.pos = start + nul + 1;
                Ok(&self.data[start..start + nul])
            }
            None => Err(ZimError::Truncated {
                at: self.data.len() as u64,
                need: 1,
            }),
        }
    }

    /// Read a NUL-terminated string and validate it as UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos as u64;
        let bytes = self.read_cstring()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ZimError::InvalidUtf8 { offset: start })
    }
}

/// Little-endian writer over a growable buffer.
///
/// Writes at the cursor overwrite existing bytes and extend the buffer past
/// the end; `seek` may target any already-written position.
pub struct ByteWriter {
    data: Vec<u8>,
    pos: usize,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            pos: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move the cursor to an absolute position within the written bytes.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(ZimError::Truncated {
                at: self.data.len() as u64,
                need: pos - self.data.len() as u64,
            });
        }
        self.pos = pos as usize;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if self.pos == self.data.len() {
            self.data.extend_from_slice(bytes);
        } else {
            let overlap = bytes.len().min(self.data.len() - self.pos);
            self.data[self.pos..self.pos + overlap].copy_from_slice(&bytes[..overlap]);
            self.data.extend_from_slice(&bytes[overlap..]);
        }
        self.pos = end;
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a string followed by its NUL terminator.
    pub fn write_cstring(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
        self.write_u8(0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}
