//! Corrupted and truncated archives, plus the writer's finalize state
//! machine. Structural damage must surface as typed errors, never panics or
//! loops.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;
use zimlib_rs::{Namespace, ZimError, ZimReader, ZimWriter};

fn create_test_archive() -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = ZimWriter::create(temp_file.path()).unwrap();
    writer
        .add_article(
            Namespace::MAIN_ARTICLE,
            "first",
            "First",
            b"first article body",
            "text/html",
        )
        .unwrap();
    writer
        .add_article(Namespace::IMAGE, "pic.png", "Pic", &[0xAB; 64], "image/png")
        .unwrap();
    writer
        .add_redirect(Namespace::MAIN_ARTICLE, "alias", "Alias", 0)
        .unwrap();
    writer.finalize().unwrap();
    temp_file
}

fn corrupt_byte_at(path: &std::path::Path, offset: u64, new_value: u8) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[new_value]).unwrap();
}

fn write_u64_at(path: &std::path::Path, offset: u64, value: u64) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&value.to_le_bytes()).unwrap();
}

fn read_u64_at(path: &std::path::Path, offset: u64) -> u64 {
    let mut file = File::open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf).unwrap();
    u64::from_le_bytes(buf)
}

fn truncate_at(path: &std::path::Path, new_length: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(new_length).unwrap();
}

#[test]
fn test_zeroed_magic() {
    let temp_file = create_test_archive();
    for offset in 0..4 {
        corrupt_byte_at(temp_file.path(), offset, 0);
    }

    match ZimReader::open(temp_file.path()) {
        Err(ZimError::InvalidMagic { found }) => assert_eq!(found, 0),
        other => panic!("expected InvalidMagic, got {:?}", other),
    }
}

#[test]
fn test_random_data_file() {
    let temp_file = NamedTempFile::new().unwrap();
    let random_data: Vec<u8> = (0..1024u32).map(|i| (i * 17 + 42) as u8).collect();
    std::fs::write(temp_file.path(), random_data).unwrap();

    assert!(matches!(
        ZimReader::open(temp_file.path()),
        Err(ZimError::InvalidMagic { .. })
    ));
}

#[test]
fn test_empty_file() {
    let temp_file = NamedTempFile::new().unwrap();
    File::create(temp_file.path()).unwrap();

    assert!(matches!(
        ZimReader::open(temp_file.path()),
        Err(ZimError::Truncated { .. })
    ));
}

#[test]
fn test_truncated_header() {
    let temp_file = create_test_archive();
    truncate_at(temp_file.path(), 40);

    assert!(matches!(
        ZimReader::open(temp_file.path()),
        Err(ZimError::Truncated { .. })
    ));
}

#[test]
fn test_unsupported_version() {
    let temp_file = create_test_archive();
    corrupt_byte_at(temp_file.path(), 4, 9);

    match ZimReader::open(temp_file.path()) {
        Err(ZimError::UnsupportedVersion { major: 9, .. }) => {}
        other => panic!("expected UnsupportedVersion, got {:?}", other),
    }
}

#[test]
fn test_mime_list_position_outside_file() {
    let temp_file = create_test_archive();
    write_u64_at(temp_file.path(), 24, u64::MAX);

    assert!(matches!(
        ZimReader::open(temp_file.path()),
        Err(ZimError::Corrupt { .. })
    ));
}

#[test]
fn test_cluster_pointer_position_outside_file() {
    let temp_file = create_test_archive();
    write_u64_at(temp_file.path(), 40, u64::MAX);

    assert!(matches!(
        ZimReader::open(temp_file.path()),
        Err(ZimError::Corrupt { .. })
    ));
}

#[test]
fn test_directory_pointer_outside_file() {
    let temp_file = create_test_archive();

    let entry_count = {
        let mut file = File::open(temp_file.path()).unwrap();
        file.seek(SeekFrom::Start(8)).unwrap();
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf).unwrap();
        u32::from_le_bytes(buf) as u64
    };
    let cluster_ptr_pos = read_u64_at(temp_file.path(), 40);
    let index_ptr_pos = cluster_ptr_pos - 8 * entry_count;
    write_u64_at(temp_file.path(), index_ptr_pos, u64::MAX);

    assert!(matches!(
        ZimReader::open(temp_file.path()),
        Err(ZimError::Corrupt { .. })
    ));
}

#[test]
fn test_cluster_offset_outside_file() {
    let temp_file = create_test_archive();

    let cluster_ptr_pos = read_u64_at(temp_file.path(), 40);
    write_u64_at(temp_file.path(), cluster_ptr_pos, u64::MAX);

    assert!(matches!(
        ZimReader::open(temp_file.path()),
        Err(ZimError::Corrupt { .. })
    ));
}

#[test]
fn test_truncated_in_directory() {
    let temp_file = create_test_archive();
    truncate_at(temp_file.path(), 120);

    match ZimReader::open(temp_file.path()) {
        Err(ZimError::Corrupt { .. }) | Err(ZimError::Truncated { .. }) => {}
        other => panic!("expected structural error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_compression_tag() {
    let temp_file = create_test_archive();

    // Retag the first cluster as bzip2; the archive still opens, reading the
    // blob fails
    let cluster_ptr_pos = read_u64_at(temp_file.path(), 40);
    let first_cluster_offset = read_u64_at(temp_file.path(), cluster_ptr_pos);
    corrupt_byte_at(temp_file.path(), first_cluster_offset, 3);

    let reader = ZimReader::open(temp_file.path()).unwrap();
    assert!(matches!(
        reader.content(0),
        Err(ZimError::UnsupportedCompression(3))
    ));
    // Other clusters stay readable
    assert!(reader.content(1).is_ok());
}

#[test]
fn test_unknown_compression_tag() {
    let temp_file = create_test_archive();

    let cluster_ptr_pos = read_u64_at(temp_file.path(), 40);
    let first_cluster_offset = read_u64_at(temp_file.path(), cluster_ptr_pos);
    corrupt_byte_at(temp_file.path(), first_cluster_offset, 77);

    let reader = ZimReader::open(temp_file.path()).unwrap();
    assert!(matches!(
        reader.content(0),
        Err(ZimError::UnsupportedCompression(77))
    ));
}

#[test]
fn test_checksum_mismatch() {
    let temp_file = create_test_archive();

    // Flip one bit inside the first cluster's payload: the structure still
    // parses but the digest no longer matches
    let cluster_ptr_pos = read_u64_at(temp_file.path(), 40);
    let first_cluster_offset = read_u64_at(temp_file.path(), cluster_ptr_pos);
    let mut file = File::open(temp_file.path()).unwrap();
    file.seek(SeekFrom::Start(first_cluster_offset + 10)).unwrap();
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte).unwrap();
    drop(file);
    corrupt_byte_at(temp_file.path(), first_cluster_offset + 10, byte[0] ^ 0x01);

    let reader = ZimReader::open(temp_file.path()).unwrap();
    assert!(matches!(
        reader.verify_checksum(),
        Err(ZimError::Corrupt { .. })
    ));
}

#[test]
fn test_zero_filled_checksum_is_not_computed() {
    let temp_file = create_test_archive();

    let checksum_pos = read_u64_at(temp_file.path(), 64);
    for i in 0..16 {
        corrupt_byte_at(temp_file.path(), checksum_pos + i, 0);
    }

    let reader = ZimReader::open(temp_file.path()).unwrap();
    assert_eq!(reader.verify_checksum().unwrap(), false);
}

#[test]
fn test_double_finalize() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = ZimWriter::create(temp_file.path()).unwrap();
    writer
        .add_article(Namespace::MAIN_ARTICLE, "a", "A", b"body", "text/html")
        .unwrap();

    writer.finalize().unwrap();
    assert!(matches!(writer.finalize(), Err(ZimError::AlreadyFinalized)));
}

#[test]
fn test_mutation_after_finalize() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = ZimWriter::create(temp_file.path()).unwrap();
    writer
        .add_article(Namespace::MAIN_ARTICLE, "a", "A", b"body", "text/html")
        .unwrap();
    writer.finalize().unwrap();

    assert!(matches!(
        writer.add_article(Namespace::MAIN_ARTICLE, "b", "B", b"late", "text/html"),
        Err(ZimError::AlreadyFinalized)
    ));
    assert!(matches!(
        writer.add_redirect(Namespace::MAIN_ARTICLE, "r", "R", 0),
        Err(ZimError::AlreadyFinalized)
    ));
    assert!(matches!(
        writer.set_main_page(0),
        Err(ZimError::AlreadyFinalized)
    ));
}

#[test]
fn test_set_main_page_out_of_range() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = ZimWriter::create(temp_file.path()).unwrap();

    assert!(matches!(
        writer.set_main_page(0),
        Err(ZimError::OutOfRange { idx: 0, bound: 0 })
    ));
}
