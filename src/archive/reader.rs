use crate::archive::cluster::Cluster;
use crate::archive::codec::ByteReader;
use crate::archive::format::{
    ContentEntry, DirectoryEntry, Header, Namespace, CHECKSUM_SIZE, HEADER_SIZE, NO_PAGE_SENTINEL,
};
use crate::archive::mime::MimeDictionary;
use crate::error::{Result, ZimError};
use md5::{Digest, Md5};
use std::path::Path;
use tracing::debug;

/// Archive reader.
///
/// The header, MIME dictionary, directory and cluster-pointer table are
/// materialized at open time; blob bytes are decoded on demand. Every method
/// takes `&self` and decompression is per-call with no shared mutable state,
/// so a reader can be shared across threads for concurrent reads.
#[derive(Debug)]
pub struct ZimReader {
    data: Vec<u8>,
    header: Header,
    mime_types: MimeDictionary,
    entries: Vec<DirectoryEntry>,
    cluster_offsets: Vec<u64>,
}

fn corrupt(offset: u64, reason: &str) -> ZimError {
    ZimError::Corrupt {
        offset,
        reason: reason.to_string(),
    }
}

impl ZimReader {
    /// Open an archive and materialize its structural sections.
    ///
    /// Any structural offset pointing outside the file fails with `Corrupt`;
    /// a file too short for the header fails with `Truncated`; the magic and
    /// version checks happen before anything else is read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        let file_len = data.len() as u64;

        let header = Header::parse(&mut ByteReader::new(&data))?;

        // MIME dictionary
        if header.mimetype_list_pos < HEADER_SIZE as u64 || header.mimetype_list_pos >= file_len {
            return Err(corrupt(
                header.mimetype_list_pos,
                "mime type list position outside file",
            ));
        }
        let mut cursor = ByteReader::new(&data);
        cursor.seek(header.mimetype_list_pos)?;
        let mime_types = MimeDictionary::parse(&mut cursor)?;

        // Index-pointer list: immediately before the cluster-pointer list.
        // The header stores no field for it.
        let index_ptr_len = 8 * header.entry_count as u64;
        let index_ptr_pos = header
            .cluster_ptr_pos
            .checked_sub(index_ptr_len)
            .filter(|&pos| pos >= HEADER_SIZE as u64)
            .ok_or_else(|| {
                corrupt(
                    header.cluster_ptr_pos,
                    "cluster pointer position leaves no room for index pointers",
                )
            })?;
        let cluster_ptr_end = header
            .cluster_ptr_pos
            .checked_add(8 * header.cluster_count as u64);
        if !matches!(cluster_ptr_end, Some(end) if end <= file_len) {
            return Err(corrupt(
                header.cluster_ptr_pos,
                "cluster pointer list exceeds file length",
            ));
        }

        cursor.seek(index_ptr_pos)?;
        let mut index_pointers = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            index_pointers.push(cursor.read_u64()?);
        }

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for pointer in index_pointers {
            if pointer < HEADER_SIZE as u64 || pointer >= index_ptr_pos {
                return Err(corrupt(pointer, "directory entry pointer outside directory"));
            }
            cursor.seek(pointer)?;
            entries.push(DirectoryEntry::parse(&mut cursor)?);
        }

        cursor.seek(header.cluster_ptr_pos)?;
        let mut cluster_offsets = Vec::with_capacity(header.cluster_count as usize);
        for _ in 0..header.cluster_count {
            let offset = cursor.read_u64()?;
            if offset < HEADER_SIZE as u64 || offset >= file_len {
                return Err(corrupt(offset, "cluster offset outside file"));
            }
            cluster_offsets.push(offset);
        }

        debug!(
            entries = header.entry_count,
            articles = header.article_count,
            clusters = header.cluster_count,
            major = header.major_version,
            minor = header.minor_version,
            "opened archive"
        );

        Ok(Self {
            data,
            header,
            mime_types,
            entries,
            cluster_offsets,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mime_types(&self) -> &MimeDictionary {
        &self.mime_types
    }

    pub fn entry_count(&self) -> u32 {
        self.entries.len() as u32
    }

    /// All directory entries in index order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// The entry at `index`.
    pub fn entry(&self, index: u32) -> Result<&DirectoryEntry> {
        self.entries
            .get(index as usize)
            .ok_or(ZimError::OutOfRange {
                idx: index,
                bound: self.entries.len() as u32,
            })
    }

    /// Content entries in insertion order, redirects skipped.
    pub fn list_articles(&self) -> Vec<&ContentEntry> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                DirectoryEntry::Content(content) => Some(content),
                DirectoryEntry::Redirect(_) => None,
            })
            .collect()
    }

    /// Look up an entry by `"<namespace>/<url>"` path.
    pub fn entry_by_path(&self, path: &str) -> Result<(u32, &DirectoryEntry)> {
        // The separator is mandatory: namespace byte, '/', then the url
        let bytes = path.as_bytes();
        let (namespace, url) = match bytes {
            [ns, b'/', url @ ..] => (*ns, url),
            _ => return Err(ZimError::NotFound(path.to_string())),
        };

        self.entries
            .iter()
            .enumerate()
            .find(|(_, entry)| {
                entry.namespace().as_byte() == namespace && entry.url().as_bytes() == url
            })
            .map(|(idx, entry)| (idx as u32, entry))
            .ok_or_else(|| ZimError::NotFound(path.to_string()))
    }

    /// The designated main page entry, or `NoMainPage` when the header
    /// carries the sentinel or an out-of-range index.
    pub fn main_page(&self) -> Result<&DirectoryEntry> {
        let index = self.header.main_page_index;
        if index == NO_PAGE_SENTINEL {
            return Err(ZimError::NoMainPage);
        }
        self.entries
            .get(index as usize)
            .ok_or(ZimError::NoMainPage)
    }

    /// The designated layout page entry, with the same sentinel semantics as
    /// `main_page`.
    pub fn layout_page(&self) -> Result<&DirectoryEntry> {
        let index = self.header.layout_page_index;
        if index == NO_PAGE_SENTINEL {
            return Err(ZimError::NoMainPage);
        }
        self.entries
            .get(index as usize)
            .ok_or(ZimError::NoMainPage)
    }

    /// Resolve an entry to its content bytes, chasing redirects.
    ///
    /// The chase is bounded by the entry count; exceeding the bound means the
    /// redirect graph has a cycle.
    pub fn content(&self, index: u32) -> Result<Vec<u8>> {
        let mut current = index;
        let mut depth = 0u32;
        loop {
            match self.entry(current)? {
                DirectoryEntry::Redirect(redirect) => {
                    depth += 1;
                    if depth > self.entries.len() as u32 {
                        return Err(ZimError::RedirectCycle { start: index });
                    }
                    current = redirect.target_index;
                }
                DirectoryEntry::Content(content) => {
                    return self.blob_bytes(content);
                }
            }
        }
    }

    /// Linear case-insensitive substring search over titles and urls,
    /// optionally restricted to one namespace.
    pub fn search_title_substring(
        &self,
        query: &str,
        namespace: Option<Namespace>,
    ) -> Vec<&DirectoryEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| namespace.map_or(true, |ns| entry.namespace() == ns))
            .filter(|entry| {
                entry.title().to_lowercase().contains(&query)
                    || entry.url().to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Verify the MD5 trailer.
    ///
    /// Returns `Ok(true)` when the digest matches, `Ok(false)` when the
    /// trailer is zero-filled (checksum never computed), and `Corrupt` on a
    /// mismatch.
    pub fn verify_checksum(&self) -> Result<bool> {
        let pos = self.header.checksum_pos;
        if pos == 0 {
            return Ok(false);
        }
        let end = pos
            .checked_add(CHECKSUM_SIZE as u64)
            .ok_or_else(|| corrupt(pos, "checksum position outside file"))?;
        if pos < HEADER_SIZE as u64 || end > self.data.len() as u64 {
            return Err(corrupt(pos, "checksum position outside file"));
        }

        let trailer = &self.data[pos as usize..end as usize];
        if trailer.iter().all(|&b| b == 0) {
            return Ok(false);
        }

        let digest = Md5::digest(&self.data[..pos as usize]);
        if digest.as_slice() == trailer {
            Ok(true)
        } else {
            Err(corrupt(pos, "checksum mismatch"))
        }
    }

    /// Slice out one cluster's exact byte range: from its pointer to the next
    /// cluster's, or to the checksum trailer for the last one.
    fn cluster_slice(&self, cluster_number: u32) -> Result<&[u8]> {
        let start = self.cluster_offsets[cluster_number as usize];
        let end = self
            .cluster_offsets
            .get(cluster_number as usize + 1)
            .copied()
            .unwrap_or_else(|| {
                let checksum_pos = self.header.checksum_pos;
                if checksum_pos > start && checksum_pos <= self.data.len() as u64 {
                    checksum_pos
                } else {
                    self.data.len() as u64
                }
            });
        if end <= start || end > self.data.len() as u64 {
            return Err(corrupt(start, "cluster range is empty or exceeds file"));
        }
        Ok(&self.data[start as usize..end as usize])
    }

    fn blob_bytes(&self, entry: &ContentEntry) -> Result<Vec<u8>> {
        if entry.cluster_number as usize >= self.cluster_offsets.len() {
            return Err(ZimError::OutOfRange {
                idx: entry.cluster_number,
                bound: self.cluster_offsets.len() as u32,
            });
        }
        let cluster = Cluster::decode(self.cluster_slice(entry.cluster_number)?)?;
        Ok(cluster.blob(entry.blob_number)?.to_vec())
    }
}
