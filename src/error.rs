use std::io;
use thiserror::Error;

/// Result type for ZIM archive operations
pub type Result<T> = std::result::Result<T, ZimError>;

/// Unified error type for all ZIM archive operations
#[derive(Debug, Error)]
pub enum ZimError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Structural errors
    #[error("Truncated archive: need {need} more bytes at offset {at}")]
    Truncated { at: u64, need: u64 },

    #[error("Invalid magic number: {found:#010x}")]
    InvalidMagic { found: u32 },

    #[error("Unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("Unsupported compression type: {0}")]
    UnsupportedCompression(u8),

    #[error("Corrupt archive at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    #[error("Invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    // Lookup errors
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Index {idx} out of range (bound {bound})")]
    OutOfRange { idx: u32, bound: u32 },

    #[error("Redirect cycle starting at entry {start}")]
    RedirectCycle { start: u32 },

    #[error("No main page designated")]
    NoMainPage,

    // Writer errors
    #[error("Writer already finalized")]
    AlreadyFinalized,

    // Compression errors
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),
}
