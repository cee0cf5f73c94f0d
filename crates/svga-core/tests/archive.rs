//! Archive Reader Tests
//!
//! Covers both container generations, the extraction cache and every decode failure kind.

mod common;

use common::*;
use prost::Message;
use std::fs;
use svga_core::archive::{content_hash, MOVIE_ENTRY};
use svga_core::{ArchiveReader, DecodeError, SpriteKind};
use svga_data::model as data;

#[test]
fn modern_archive_decodes_inline_images() {
    let mut record = record(4);
    record.sprites.push(sprite("b.vector", "", vec![path_frame("M0 0 L10 10")]));
    record.audios.push(data::AudioEntity {
        audio_key: "bgm".to_string(),
        start_frame: 0,
        end_frame: 4,
        start_time: 0,
        total_time: 200,
    });
    let raw_len = record.images["a"].len();

    let dir = tempfile::tempdir().unwrap();
    let movie = ArchiveReader::with_cache_dir(dir.path())
        .read(&modern_archive(&record))
        .unwrap();

    assert_eq!(movie.version, "2.0.0");
    assert_eq!(movie.fps, 20);
    assert_eq!(movie.frames, 4);
    assert_eq!(movie.size.width, 300.0);
    assert_eq!(movie.images_total_size, raw_len);
    assert_eq!(movie.image("a").map(|b| (b.width, b.height)), Some((2, 2)));
    assert_eq!(movie.sprites.len(), 2);
    assert_eq!(movie.sprites[1].kind(), SpriteKind::Vector);
    assert_eq!(movie.audios[0].total_time, 200);
    assert!((movie.duration().as_secs_f64() - 0.2).abs() < 1e-6);

    // Nothing is cached for 2.x archives.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn undecodable_image_is_omitted() {
    let mut record = record(1);
    record.images.insert("broken".to_string(), b"not an image".to_vec());

    let movie = ArchiveReader::new().read(&modern_archive(&record)).unwrap();

    assert!(movie.image("a").is_some());
    assert!(movie.image("broken").is_none());
    assert_eq!(
        movie.images_total_size,
        record.images["a"].len() + b"not an image".len()
    );
}

#[test]
fn modern_archive_reads_sibling_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bg.png"), png(3, 5)).unwrap();

    let mut record = record(1);
    record.images.insert("bg".to_string(), b"bg".to_vec());
    let bytes = modern_archive(&record);

    let reader = ArchiveReader::with_cache_dir(dir.path().join("cache"));
    // A file location means its parent directory.
    let movie = reader
        .read_with_location(&bytes, Some(&dir.path().join("movie.svga")))
        .unwrap();
    assert_eq!(movie.image("bg").map(|b| (b.width, b.height)), Some((3, 5)));

    // Without a directory the stem is decoded as bitmap bytes and fails.
    let movie = reader.read(&bytes).unwrap();
    assert!(movie.image("bg").is_none());
}

/// Validates:
/// - the archive is persisted and extracted under its content hash
/// - sibling `<stem>.png` files resolve image keys
/// - a second read reuses the extracted directory
#[test]
fn legacy_archive_is_extracted_once() {
    let mut record = record(2);
    record.version = "1.1.0".to_string();
    record.images.insert("avatar".to_string(), b"avatar".to_vec());
    let bytes = legacy_archive(&[
        (MOVIE_ENTRY, record.encode_to_vec()),
        ("avatar.png", png(4, 4)),
    ]);

    let cache = tempfile::tempdir().unwrap();
    let reader = ArchiveReader::with_cache_dir(cache.path());
    let movie = reader.read(&bytes).unwrap();

    assert_eq!(movie.version, "1.1.0");
    assert_eq!(movie.image("avatar").map(|b| b.width), Some(4));
    assert!(movie.image("a").is_some());

    let hash = content_hash(&bytes);
    let extracted = cache.path().join(format!("{hash}.svga.unzip"));
    assert!(cache.path().join(format!("{hash}.svga")).is_file());
    assert!(extracted.join(MOVIE_ENTRY).is_file());

    fs::write(extracted.join("marker"), b"x").unwrap();
    let again = reader.read(&bytes).unwrap();
    assert!(extracted.join("marker").is_file());
    assert_eq!(again.sprites.len(), movie.sprites.len());
    assert_eq!(again.image("avatar"), movie.image("avatar"));
}

#[test]
fn legacy_archive_is_persisted_at_a_missing_location() {
    let record = record(1);
    let bytes = legacy_archive(&[(MOVIE_ENTRY, record.encode_to_vec())]);

    let cache = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let location = downloads.path().join("fresh.svga");
    assert!(!location.exists());

    let movie = ArchiveReader::with_cache_dir(cache.path())
        .read_with_location(&bytes, Some(&location))
        .unwrap();

    assert_eq!(movie.frames, 1);
    assert_eq!(fs::read(&location).unwrap(), bytes);
    let hash = content_hash(&bytes);
    assert!(!cache.path().join(format!("{hash}.svga")).exists());
    assert!(cache.path().join(format!("{hash}.svga.unzip")).is_dir());
}

#[test]
fn extracted_directory_can_be_opened() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = record(3);
    record.images.insert("avatar".to_string(), b"avatar".to_vec());
    fs::write(dir.path().join(MOVIE_ENTRY), record.encode_to_vec()).unwrap();
    fs::write(dir.path().join("avatar.png"), png(6, 2)).unwrap();

    let movie = ArchiveReader::new().open(dir.path()).unwrap();
    assert_eq!(movie.frames, 3);
    assert_eq!(movie.image("avatar").map(|b| b.width), Some(6));
}

#[test]
fn legacy_archive_without_movie_entry_fails() {
    let bytes = legacy_archive(&[("avatar.png", png(1, 1))]);
    let cache = tempfile::tempdir().unwrap();

    let err = ArchiveReader::with_cache_dir(cache.path())
        .read(&bytes)
        .unwrap_err();
    assert!(matches!(err, DecodeError::ContainerExtraction { .. }), "{err:?}");
}

#[test]
fn short_input_is_malformed() {
    let err = ArchiveReader::new().read(&[0x50, 0x4B, 0x03]).unwrap_err();
    assert!(matches!(err, DecodeError::MalformedInput(_)));
}

#[test]
fn non_zlib_payload_fails_decompression() {
    let err = ArchiveReader::new().read(b"definitely not deflate").unwrap_err();
    assert!(matches!(err, DecodeError::Decompression(_)), "{err:?}");
}

#[test]
fn invalid_records_fail_schema_decode() {
    let reader = ArchiveReader::new();

    // Length-delimited field claiming more bytes than available.
    let err = reader.read(&deflate(&[0x0a, 0x05, 0x01])).unwrap_err();
    assert!(matches!(err, DecodeError::SchemaDecode(_)), "{err:?}");

    let mut no_params = record(1);
    no_params.params = None;
    let err = reader.read(&modern_archive(&no_params)).unwrap_err();
    assert!(matches!(err, DecodeError::SchemaDecode(_)));

    let mut zero_fps = record(1);
    zero_fps.params = Some(params(0, 1));
    let err = reader.read(&modern_archive(&zero_fps)).unwrap_err();
    assert!(matches!(err, DecodeError::SchemaDecode(_)));
}

#[test]
fn negative_frame_count_clamps_to_zero() {
    let mut record = record(1);
    record.params = Some(params(10, -5));
    let movie = ArchiveReader::new().read(&modern_archive(&record)).unwrap();
    assert_eq!(movie.frames, 0);
}
