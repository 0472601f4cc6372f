use crate::archive::cluster::{Cluster, CompressionType};
use crate::archive::codec::ByteWriter;
use crate::archive::format::{
    ContentEntry, DirectoryEntry, Header, Namespace, RedirectEntry, CHECKSUM_SIZE,
    FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR, HEADER_SIZE, NO_PAGE_SENTINEL,
};
use crate::archive::mime::MimeDictionary;
use crate::error::{Result, ZimError};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Writer configuration. Injected at construction; there are no module-level
/// defaults.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Cluster compression. `Default` resolves to `None` at emission.
    pub compression: CompressionType,
    /// MIME type used when `add_article` is called with an empty one.
    pub default_mime: String,
    /// Blobs accumulated per cluster before it is sealed. 1 gives one
    /// single-blob cluster per article; larger values batch small articles
    /// into shared compression envelopes.
    pub cluster_batch_hint: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::Default,
            default_mime: "application/octet-stream".to_string(),
            cluster_batch_hint: 1,
        }
    }
}

/// Archive writer.
///
/// Entries, MIME types and cluster payloads accumulate in memory in call
/// order, which fixes entry and MIME index assignment. `finalize` runs the
/// layout pass, emits the file once, and is one-shot: a second call fails
/// with `AlreadyFinalized`, and any error during finalization poisons the
/// writer against further mutation. The output file is owned by the writer
/// and closed on drop.
pub struct ZimWriter {
    file: File,
    options: WriterOptions,
    mime_types: MimeDictionary,
    entries: Vec<DirectoryEntry>,
    clusters: Vec<Vec<u8>>,
    pending_blobs: Vec<Vec<u8>>,
    main_page_index: u32,
    layout_page_index: u32,
    finalized: bool,
    poisoned: bool,
}

impl ZimWriter {
    /// Create an archive at `path` with default options.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with(path, WriterOptions::default())
    }

    /// Create an archive at `path` with the given options.
    pub fn create_with<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file,
            options,
            mime_types: MimeDictionary::new(),
            entries: Vec::new(),
            clusters: Vec::new(),
            pending_blobs: Vec::new(),
            main_page_index: NO_PAGE_SENTINEL,
            layout_page_index: NO_PAGE_SENTINEL,
            finalized: false,
            poisoned: false,
        })
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.finalized || self.poisoned {
            return Err(ZimError::AlreadyFinalized);
        }
        Ok(())
    }

    /// Add a content entry; returns its index.
    ///
    /// The content is placed in the open cluster and addressable as exactly
    /// the bytes supplied. An empty `mime` falls back to the configured
    /// default.
    pub fn add_article(
        &mut self,
        namespace: Namespace,
        url: &str,
        title: &str,
        content: &[u8],
        mime: &str,
    ) -> Result<u32> {
        self.ensure_mutable()?;

        let mime_index = if mime.is_empty() {
            let default_mime = self.options.default_mime.clone();
            self.mime_types.intern(&default_mime)
        } else {
            self.mime_types.intern(mime)
        };

        let (cluster_number, blob_number) = self.place_blob(content.to_vec())?;
        let index = self.entries.len() as u32;
        self.entries.push(DirectoryEntry::Content(ContentEntry {
            mime_index,
            namespace,
            revision: 0,
            cluster_number,
            blob_number,
            url: url.to_string(),
            title: title.to_string(),
        }));
        Ok(index)
    }

    /// Add a content entry with its bytes read from disk.
    pub fn add_article_from_file<P: AsRef<Path>>(
        &mut self,
        namespace: Namespace,
        url: &str,
        title: &str,
        path: P,
        mime: &str,
    ) -> Result<u32> {
        let content = std::fs::read(path)?;
        self.add_article(namespace, url, title, &content, mime)
    }

    /// Add a redirect to an already-added entry; returns the redirect's index.
    pub fn add_redirect(
        &mut self,
        namespace: Namespace,
        url: &str,
        title: &str,
        target_index: u32,
    ) -> Result<u32> {
        self.ensure_mutable()?;

        if target_index as usize >= self.entries.len() {
            return Err(ZimError::OutOfRange {
                idx: target_index,
                bound: self.entries.len() as u32,
            });
        }

        let index = self.entries.len() as u32;
        self.entries.push(DirectoryEntry::Redirect(RedirectEntry {
            namespace,
            revision: 0,
            target_index,
            url: url.to_string(),
            title: title.to_string(),
        }));
        Ok(index)
    }

    /// Designate the archive's landing entry.
    pub fn set_main_page(&mut self, index: u32) -> Result<()> {
        self.ensure_mutable()?;
        if index as usize >= self.entries.len() {
            return Err(ZimError::OutOfRange {
                idx: index,
                bound: self.entries.len() as u32,
            });
        }
        self.main_page_index = index;
        Ok(())
    }

    /// Designate the archive's layout entry.
    pub fn set_layout_page(&mut self, index: u32) -> Result<()> {
        self.ensure_mutable()?;
        if index as usize >= self.entries.len() {
            return Err(ZimError::OutOfRange {
                idx: index,
                bound: self.entries.len() as u32,
            });
        }
        self.layout_page_index = index;
        Ok(())
    }

    /// Number of entries added so far.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn place_blob(&mut self, blob: Vec<u8>) -> Result<(u32, u32)> {
        let hint = self.options.cluster_batch_hint.max(1);
        if self.pending_blobs.len() >= hint {
            self.seal_cluster()?;
        }
        let cluster_number = self.clusters.len() as u32;
        let blob_number = self.pending_blobs.len() as u32;
        self.pending_blobs.push(blob);
        Ok((cluster_number, blob_number))
    }

    fn seal_cluster(&mut self) -> Result<()> {
        if self.pending_blobs.is_empty() {
            return Ok(());
        }
        let blobs = std::mem::take(&mut self.pending_blobs);
        let encoded = Cluster::encode(&blobs, self.options.compression)?;
        self.clusters.push(encoded);
        Ok(())
    }

    /// Lay out and emit the archive. One-shot.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized || self.poisoned {
            return Err(ZimError::AlreadyFinalized);
        }
        match self.finalize_inner() {
            Ok(()) => {
                self.finalized = true;
                Ok(())
            }
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Layout pass: compute every section position, then emit in that order.
    /// Positions are final before the first byte is written, so the header's
    /// pointers never need patching.
    fn finalize_inner(&mut self) -> Result<()> {
        self.seal_cluster()?;

        let mut mime_section = ByteWriter::new();
        self.mime_types.emit(&mut mime_section);
        let mime_bytes = mime_section.into_bytes();

        let mut pos = HEADER_SIZE as u64;
        let mimetype_list_pos = pos;
        pos += mime_bytes.len() as u64;

        let mut index_pointers = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            index_pointers.push(pos);
            pos += entry.encoded_len();
        }

        // Index pointers, then cluster pointers; readers derive the index
        // list position from cluster_ptr_pos and entry_count.
        pos += 8 * self.entries.len() as u64;
        let cluster_ptr_pos = pos;
        pos += 8 * self.clusters.len() as u64;

        let mut cluster_offsets = Vec::with_capacity(self.clusters.len());
        for cluster in &self.clusters {
            cluster_offsets.push(pos);
            pos += cluster.len() as u64;
        }
        let checksum_pos = pos;

        let article_count = self.entries.iter().filter(|e| !e.is_redirect()).count() as u32;
        let redirect_count = self.entries.len() as u32 - article_count;

        let header = Header {
            major_version: FORMAT_VERSION_MAJOR,
            minor_version: FORMAT_VERSION_MINOR,
            entry_count: self.entries.len() as u32,
            article_count,
            cluster_count: self.clusters.len() as u32,
            redirect_count,
            mimetype_list_pos,
            title_index_pos: 0,
            cluster_ptr_pos,
            cluster_count_pos: 0,
            main_page_index: self.main_page_index,
            layout_page_index: self.layout_page_index,
            checksum_pos,
        };

        debug!(
            entries = header.entry_count,
            articles = header.article_count,
            redirects = header.redirect_count,
            clusters = header.cluster_count,
            checksum_pos,
            "finalizing archive layout"
        );

        let mut out = ByteWriter::with_capacity(checksum_pos as usize + CHECKSUM_SIZE);
        header.emit(&mut out);
        out.write_bytes(&mime_bytes);
        for entry in &self.entries {
            entry.emit(&mut out);
        }
        for pointer in &index_pointers {
            out.write_u64(*pointer);
        }
        for offset in &cluster_offsets {
            out.write_u64(*offset);
        }
        for cluster in &self.clusters {
            out.write_bytes(cluster);
        }
        debug_assert_eq!(out.len() as u64, checksum_pos);

        let digest = Md5::digest(out.as_bytes());
        out.write_bytes(digest.as_slice());

        self.file.write_all(out.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}
