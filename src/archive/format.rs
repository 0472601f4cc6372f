use crate::archive::codec::{ByteReader, ByteWriter};
use crate::error::{Result, ZimError};

/// Magic number: 'Z' 'I' 'M' 0x04, little-endian u32 0x044D495A
pub const MAGIC_BYTES: [u8; 4] = [0x5A, 0x49, 0x4D, 0x04];

/// Magic number as the little-endian u32 read from the first four bytes
pub const MAGIC_NUMBER: u32 = u32::from_le_bytes(MAGIC_BYTES);

/// Format version the writer emits
pub const FORMAT_VERSION_MAJOR: u16 = 4;
pub const FORMAT_VERSION_MINOR: u16 = 0;

/// Major versions the reader accepts (5 is recognized for forward compatibility)
pub const SUPPORTED_MAJOR_VERSIONS: [u16; 2] = [4, 5];

/// Header size in bytes
pub const HEADER_SIZE: usize = 80;

/// Mime index value marking a directory entry as a redirect
pub const REDIRECT_MIME_SENTINEL: u32 = 0xFFFF;

/// Page index value marking "no page designated" (main page, layout page)
pub const NO_PAGE_SENTINEL: u32 = 0xFFFF_FFFF;

/// Size of the checksum trailer at the end of the archive
pub const CHECKSUM_SIZE: usize = 16;

/// One-byte namespace tag classifying a directory entry's role.
///
/// Unknown tags are preserved verbatim; only the constants below carry
/// conventional meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace(pub u8);

impl Namespace {
    pub const MAIN_ARTICLE: Namespace = Namespace(b'A');
    pub const IMAGE: Namespace = Namespace(b'I');
    pub const METADATA: Namespace = Namespace(b'M');
    pub const RAW_DATA: Namespace = Namespace(b'-');
    pub const STYLE: Namespace = Namespace(b'S');
    pub const SCRIPT: Namespace = Namespace(b'J');
    pub const FONT: Namespace = Namespace(b'T');
    pub const TRANSLATION: Namespace = Namespace(b'U');
    pub const VIDEO: Namespace = Namespace(b'V');
    pub const AUDIO: Namespace = Namespace(b'W');

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }
}

impl From<u8> for Namespace {
    fn from(tag: u8) -> Self {
        Namespace(tag)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Fixed 80-byte archive header.
///
/// All structural sections of the file are located through the positions
/// recorded here; the writer fills them in during layout, after which they
/// are stable. Bytes 72..80 are reserved and zero.
#[derive(Debug, Clone)]
pub struct Header {
    pub major_version: u16,
    pub minor_version: u16,
    pub entry_count: u32,
    pub article_count: u32,
    pub cluster_count: u32,
    pub redirect_count: u32,
    pub mimetype_list_pos: u64,
    pub title_index_pos: u64,
    pub cluster_ptr_pos: u64,
    pub cluster_count_pos: u64,
    pub main_page_index: u32,
    pub layout_page_index: u32,
    pub checksum_pos: u64,
}

impl Header {
    /// Parse and validate a header from the cursor.
    ///
    /// Fails with `Truncated` when fewer than 80 bytes remain, `InvalidMagic`
    /// when the leading bytes differ from the magic pattern, and
    /// `UnsupportedVersion` for major versions outside the supported set.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        if reader.remaining() < HEADER_SIZE {
            return Err(ZimError::Truncated {
                at: reader.position() + reader.remaining() as u64,
                need: (HEADER_SIZE - reader.remaining()) as u64,
            });
        }

        let magic = reader.read_u32()?;
        if magic != MAGIC_NUMBER {
            return Err(ZimError::InvalidMagic { found: magic });
        }

        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        if !SUPPORTED_MAJOR_VERSIONS.contains(&major_version) {
            return Err(ZimError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let header = Self {
            major_version,
            minor_version,
            entry_count: reader.read_u32()?,
            article_count: reader.read_u32()?,
            cluster_count: reader.read_u32()?,
            redirect_count: reader.read_u32()?,
            mimetype_list_pos: reader.read_u64()?,
            title_index_pos: reader.read_u64()?,
            cluster_ptr_pos: reader.read_u64()?,
            cluster_count_pos: reader.read_u64()?,
            main_page_index: reader.read_u32()?,
            layout_page_index: reader.read_u32()?,
            checksum_pos: reader.read_u64()?,
        };

        // Reserved tail
        reader.read_bytes(8)?;

        Ok(header)
    }

    /// Emit the header as exactly 80 bytes.
    pub fn emit(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&MAGIC_BYTES);
        writer.write_u16(self.major_version);
        writer.write_u16(self.minor_version);
        writer.write_u32(self.entry_count);
        writer.write_u32(self.article_count);
        writer.write_u32(self.cluster_count);
        writer.write_u32(self.redirect_count);
        writer.write_u64(self.mimetype_list_pos);
        writer.write_u64(self.title_index_pos);
        writer.write_u64(self.cluster_ptr_pos);
        writer.write_u64(self.cluster_count_pos);
        writer.write_u32(self.main_page_index);
        writer.write_u32(self.layout_page_index);
        writer.write_u64(self.checksum_pos);
        writer.write_bytes(&[0u8; 8]);
    }
}

/// A content entry: addressable bytes stored in a cluster blob.
#[derive(Debug, Clone)]
pub struct ContentEntry {
    pub mime_index: u32,
    pub namespace: Namespace,
    pub revision: u32,
    pub cluster_number: u32,
    pub blob_number: u32,
    pub url: String,
    pub title: String,
}

/// A redirect entry: an alias pointing at another entry by index.
#[derive(Debug, Clone)]
pub struct RedirectEntry {
    pub namespace: Namespace,
    pub revision: u32,
    pub target_index: u32,
    pub url: String,
    pub title: String,
}

/// One directory slot, discriminated on disk by the mime index sentinel.
#[derive(Debug, Clone)]
pub enum DirectoryEntry {
    Content(ContentEntry),
    Redirect(RedirectEntry),
}

impl DirectoryEntry {
    /// Parse a directory entry, dispatching on the redirect sentinel.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let mime_index = reader.read_u32()?;
        let namespace = Namespace(reader.read_u8()?);
        let revision = reader.read_u32()?;

        if mime_index == REDIRECT_MIME_SENTINEL {
            let target_index = reader.read_u32()?;
            let url = reader.read_string()?;
            let title = reader.read_string()?;
            Ok(DirectoryEntry::Redirect(RedirectEntry {
                namespace,
                revision,
                target_index,
                url,
                title,
            }))
        } else {
            let cluster_number = reader.read_u32()?;
            let blob_number = reader.read_u32()?;
            let url = reader.read_string()?;
            let title = reader.read_string()?;
            Ok(DirectoryEntry::Content(ContentEntry {
                mime_index,
                namespace,
                revision,
                cluster_number,
                blob_number,
                url,
                title,
            }))
        }
    }

    /// Emit the entry in serialization order: mime index, namespace,
    /// revision, variant fields, url, title.
    pub fn emit(&self, writer: &mut ByteWriter) {
        match self {
            DirectoryEntry::Content(entry) => {
                writer.write_u32(entry.mime_index);
                writer.write_u8(entry.namespace.as_byte());
                writer.write_u32(entry.revision);
                writer.write_u32(entry.cluster_number);
                writer.write_u32(entry.blob_number);
                writer.write_cstring(&entry.url);
                writer.write_cstring(&entry.title);
            }
            DirectoryEntry::Redirect(entry) => {
                writer.write_u32(REDIRECT_MIME_SENTINEL);
                writer.write_u8(entry.namespace.as_byte());
                writer.write_u32(entry.revision);
                writer.write_u32(entry.target_index);
                writer.write_cstring(&entry.url);
                writer.write_cstring(&entry.title);
            }
        }
    }

    /// Serialized size in bytes.
    pub fn encoded_len(&self) -> u64 {
        // mime index + namespace + revision, then cluster+blob or target
        let fixed = match self {
            DirectoryEntry::Content(_) => 17,
            DirectoryEntry::Redirect(_) => 13,
        };
        (fixed + self.url().len() + 1 + self.title().len() + 1) as u64
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            DirectoryEntry::Content(entry) => entry.namespace,
            DirectoryEntry::Redirect(entry) => entry.namespace,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            DirectoryEntry::Content(entry) => &entry.url,
            DirectoryEntry::Redirect(entry) => &entry.url,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            DirectoryEntry::Content(entry) => &entry.title,
            DirectoryEntry::Redirect(entry) => &entry.title,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, DirectoryEntry::Redirect(_))
    }
}
