//! zimlib-rs: reader/writer library for the ZIM offline-content archive format
//!
//! A ZIM file is a self-contained, random-access container for offline
//! corpora (wikis, documentation sets): a fixed header, a MIME-type
//! dictionary, a directory of URL-addressed entries (articles and redirects),
//! per-cluster blob storage with optional compression, and the pointer lists
//! tying it all together. This crate implements:
//! - A two-pass writer that computes the full layout before emitting a byte
//! - Cluster packing with stored, DEFLATE, Zstd and LZMA envelopes
//! - A reader resolving `namespace/url` paths to blob bytes, chasing
//!   redirect chains with cycle detection
//!
//! # Example
//!
//! ```no_run
//! use zimlib_rs::{Namespace, ZimReader, ZimWriter};
//!
//! let mut writer = ZimWriter::create("example.zim")?;
//! let idx = writer.add_article(
//!     Namespace::MAIN_ARTICLE,
//!     "Main_Page",
//!     "Welcome",
//!     b"<html><body>hi</body></html>",
//!     "text/html",
//! )?;
//! writer.set_main_page(idx)?;
//! writer.finalize()?;
//!
//! let reader = ZimReader::open("example.zim")?;
//! let (idx, _entry) = reader.entry_by_path("A/Main_Page")?;
//! let bytes = reader.content(idx)?;
//! # Ok::<(), zimlib_rs::ZimError>(())
//! ```

pub mod archive;
pub mod error;

pub use archive::{
    Cluster, CompressionType, ContentEntry, DirectoryEntry, Header, MimeDictionary, Namespace,
    RedirectEntry, WriterOptions, ZimReader, ZimWriter, CHECKSUM_SIZE, FORMAT_VERSION_MAJOR,
    FORMAT_VERSION_MINOR, HEADER_SIZE, MAGIC_BYTES, MAGIC_NUMBER, NO_PAGE_SENTINEL,
    REDIRECT_MIME_SENTINEL,
};
pub use error::{Result, ZimError};
