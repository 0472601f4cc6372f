mod cluster;
mod codec;
mod format;
mod mime;
mod reader;
mod writer;

pub use cluster::{Cluster, CompressionType};
pub use codec::{ByteReader, ByteWriter};
pub use format::{
    ContentEntry, DirectoryEntry, Header, Namespace, RedirectEntry, CHECKSUM_SIZE,
    FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR, HEADER_SIZE, MAGIC_BYTES, MAGIC_NUMBER,
    NO_PAGE_SENTINEL, REDIRECT_MIME_SENTINEL,
};
pub use mime::MimeDictionary;
pub use reader::ZimReader;
pub use writer::{WriterOptions, ZimWriter};
