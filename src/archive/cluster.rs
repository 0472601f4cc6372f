use crate::error::{Result, ZimError};
use std::io::Read;

use flate2::read::{ZlibDecoder, ZlibEncoder};
use xz2::read::{XzDecoder, XzEncoder};

/// Zstd compression level (balanced)
const ZSTD_LEVEL: i32 = 6;

/// XZ preset for LZMA clusters
const LZMA_PRESET: u32 = 6;

/// Cluster compression tags.
///
/// `Default` and `None` both mean stored payload bytes; the writer resolves
/// `Default` to `None` before emission. `Bzip2` is recognized but not
/// implemented and surfaces `UnsupportedCompression` when decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    Default = 0,
    None = 1,
    Deflate = 2,
    Bzip2 = 3,
    Lzma = 4,
    Zstd = 5,
}

impl CompressionType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Default),
            1 => Ok(Self::None),
            2 => Ok(Self::Deflate),
            3 => Ok(Self::Bzip2),
            4 => Ok(Self::Lzma),
            5 => Ok(Self::Zstd),
            other => Err(ZimError::UnsupportedCompression(other)),
        }
    }

    /// Whether the tag means the payload is stored uncompressed.
    pub fn is_stored(self) -> bool {
        matches!(self, Self::Default | Self::None)
    }
}

/// A decoded cluster: a random-access view over its blobs.
///
/// On disk a cluster is `[tag u8][offsets u32 x (n+1)][payload]`. The offset
/// table is stored uncompressed and indexes positions within the decompressed
/// payload, so one decompression pass restores random access to every blob.
/// `offsets[0]` is always 0 and `offsets[n]` equals the decompressed payload
/// length; a zero-length blob has two equal consecutive offsets.
#[derive(Debug)]
pub struct Cluster {
    compression: CompressionType,
    offsets: Vec<u32>,
    payload: Vec<u8>,
}

impl Cluster {
    /// Encode blobs into cluster bytes.
    ///
    /// The offset table always describes the decompressed blob boundaries.
    /// When a codec tag is given, the concatenated payload is compressed as a
    /// single stream; if that does not shrink it, the cluster falls back to
    /// stored.
    pub fn encode(blobs: &[Vec<u8>], compression: CompressionType) -> Result<Vec<u8>> {
        let compression = if compression == CompressionType::Default {
            CompressionType::None
        } else {
            compression
        };

        let mut offsets: Vec<u32> = Vec::with_capacity(blobs.len() + 1);
        let mut total: u32 = 0;
        offsets.push(0);
        for blob in blobs {
            total = u32::try_from(blob.len())
                .ok()
                .and_then(|len| total.checked_add(len))
                .ok_or_else(|| {
                    ZimError::CompressionFailed(
                        "cluster payload exceeds offset table range".to_string(),
                    )
                })?;
            offsets.push(total);
        }

        let mut payload: Vec<u8> = Vec::with_capacity(total as usize);
        for blob in blobs {
            payload.extend_from_slice(blob);
        }

        let (tag, body) = if compression.is_stored() {
            (CompressionType::None, payload)
        } else {
            let compressed = compress(&payload, compression)?;
            if compressed.len() < payload.len() {
                (compression, compressed)
            } else {
                (CompressionType::None, payload)
            }
        };

        let mut out = Vec::with_capacity(1 + offsets.len() * 4 + body.len());
        out.push(tag as u8);
        for offset in &offsets {
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a cluster from its exact byte range.
    ///
    /// The offset count is not stored, so the decoder probes for the smallest
    /// table consistent with the payload that follows it: offsets must start
    /// at zero, never decrease, and the final offset must equal the
    /// (decompressed) payload length. Termination on a zero offset would
    /// misparse a zero-length first blob, so no sentinel is used.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let tag = *bytes.first().ok_or(ZimError::Truncated { at: 0, need: 1 })?;
        let compression = CompressionType::from_u8(tag)?;
        if compression == CompressionType::Bzip2 {
            // Recognized tag with no decoder; reject before probing the table
            return Err(ZimError::UnsupportedCompression(tag));
        }
        let body = &bytes[1..];

        let mut offsets: Vec<u32> = Vec::new();
        let mut pos = 0usize;
        while pos + 4 <= body.len() {
            let offset = u32::from_le_bytes([body[pos], body[pos + 1], body[pos + 2], body[pos + 3]]);
            pos += 4;

            match offsets.last() {
                None if offset != 0 => {
                    return Err(ZimError::Corrupt {
                        offset: 1,
                        reason: "first blob offset is not zero".to_string(),
                    });
                }
                Some(&prev) if offset < prev => {
                    return Err(ZimError::Corrupt {
                        offset: pos as u64 - 3,
                        reason: "cluster blob offsets decrease".to_string(),
                    });
                }
                _ => {}
            }
            offsets.push(offset);

            let rest = &body[pos..];
            if compression.is_stored() {
                // Stored payload length shrinks as the candidate table grows,
                // while the final offset only grows: at most one table fits.
                if offset as usize == rest.len() {
                    return Ok(Self {
                        compression,
                        offsets,
                        payload: rest.to_vec(),
                    });
                }
                if offset as usize > rest.len() {
                    break;
                }
            } else if let Ok(payload) = decompress(rest, compression) {
                if payload.len() == offset as usize {
                    return Ok(Self {
                        compression,
                        offsets,
                        payload,
                    });
                }
            }
        }

        Err(ZimError::Corrupt {
            offset: 0,
            reason: "no blob offset table consistent with cluster payload".to_string(),
        })
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    pub fn blob_count(&self) -> u32 {
        (self.offsets.len() - 1) as u32
    }

    /// Offset table over the decompressed payload (`n + 1` entries).
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// The bytes of blob `index`.
    pub fn blob(&self, index: u32) -> Result<&[u8]> {
        if index >= self.blob_count() {
            return Err(ZimError::OutOfRange {
                idx: index,
                bound: self.blob_count(),
            });
        }
        let start = self.offsets[index as usize] as usize;
        let end = self.offsets[index as usize + 1] as usize;
        Ok(&self.payload[start..end])
    }
}

/// Compress a whole cluster payload with the given codec.
fn compress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::Default | CompressionType::None => Ok(data.to_vec()),
        CompressionType::Deflate => {
            let mut out = Vec::new();
            ZlibEncoder::new(data, flate2::Compression::default())
                .read_to_end(&mut out)
                .map_err(|e| ZimError::CompressionFailed(format!("deflate: {}", e)))?;
            Ok(out)
        }
        CompressionType::Lzma => {
            let mut out = Vec::new();
            XzEncoder::new(data, LZMA_PRESET)
                .read_to_end(&mut out)
                .map_err(|e| ZimError::CompressionFailed(format!("lzma: {}", e)))?;
            Ok(out)
        }
        CompressionType::Zstd => zstd::encode_all(data, ZSTD_LEVEL)
            .map_err(|e| ZimError::CompressionFailed(format!("zstd: {}", e))),
        CompressionType::Bzip2 => {
            Err(ZimError::UnsupportedCompression(CompressionType::Bzip2 as u8))
        }
    }
}

/// Decompress a whole cluster payload with the given codec.
fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::Default | CompressionType::None => Ok(data.to_vec()),
        CompressionType::Deflate => {
            let mut out = Vec::new();
            ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| ZimError::DecompressionFailed(format!("deflate: {}", e)))?;
            Ok(out)
        }
        CompressionType::Lzma => {
            let mut out = Vec::new();
            XzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| ZimError::DecompressionFailed(format!("lzma: {}", e)))?;
            Ok(out)
        }
        CompressionType::Zstd => zstd::decode_all(data)
            .map_err(|e| ZimError::DecompressionFailed(format!("zstd: {}", e))),
        CompressionType::Bzip2 => {
            Err(ZimError::UnsupportedCompression(CompressionType::Bzip2 as u8))
        }
    }
}
