//! Archive container reader.
//!
//! Two generations exist in the wild:
//! * 1.x: a zip file holding `movie.binary` (protobuf) plus one PNG per image key.
//! * 2.x: a single zlib-deflated protobuf payload with the images inlined.
//!
//! The generation is detected from the first four bytes. Legacy archives are persisted and
//! extracted into a content-addressed cache directory once; later reads of the same bytes reuse it.

use crate::entity::{Bitmap, MovieEntity};
use crate::errors::DecodeError;
use flate2::read::ZlibDecoder;
use prost::Message;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use svga_data::model as data;
use tracing::{debug, instrument, warn};

/// Local file header signature of a zip archive.
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Name of the protobuf record inside a legacy archive.
pub const MOVIE_ENTRY: &str = "movie.binary";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// 1.x zip container.
    Legacy,
    /// 2.x deflated protobuf.
    Modern,
}

pub fn detect_format(bytes: &[u8]) -> Result<ArchiveFormat, DecodeError> {
    match bytes.get(..4) {
        None => Err(DecodeError::MalformedInput(format!(
            "archive is {} bytes, need at least 4",
            bytes.len()
        ))),
        Some(tag) if tag == ZIP_SIGNATURE => Ok(ArchiveFormat::Legacy),
        Some(_) => Ok(ArchiveFormat::Modern),
    }
}

/// Hex SHA-256 of the archive bytes, used to name cache entries.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[derive(Clone, Debug)]
pub struct ArchiveReader {
    cache_dir: PathBuf,
}

impl Default for ArchiveReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveReader {
    /// Reader caching extracted archives under `<temp>/svga-cache`.
    pub fn new() -> Self {
        Self::with_cache_dir(std::env::temp_dir().join("svga-cache"))
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn read(&self, bytes: &[u8]) -> Result<MovieEntity, DecodeError> {
        self.read_with_location(bytes, None)
    }

    /// Decodes `bytes`.
    ///
    /// `location` is where the archive lives on disk, if anywhere. A legacy archive is persisted
    /// there when the file does not exist yet. For 2.x archives it names the directory that holds
    /// sibling image files (a file path means its parent directory).
    #[instrument(skip_all, fields(len = bytes.len()))]
    pub fn read_with_location(
        &self,
        bytes: &[u8],
        location: Option<&Path>,
    ) -> Result<MovieEntity, DecodeError> {
        match detect_format(bytes)? {
            ArchiveFormat::Legacy => {
                let dir = self.extract_legacy(bytes, location)?;
                read_extracted(&dir)
            }
            ArchiveFormat::Modern => {
                let payload = inflate(bytes)?;
                let record = data::MovieEntity::decode(payload.as_slice())?;
                let images_dir = location.and_then(|path| {
                    if path.is_dir() {
                        Some(path)
                    } else {
                        path.parent().filter(|parent| parent.is_dir())
                    }
                });
                MovieEntity::from_record(record, images_dir)
            }
        }
    }

    /// Opens an archive file, or a directory holding an already extracted archive.
    pub fn open(&self, path: &Path) -> Result<MovieEntity, DecodeError> {
        if path.is_dir() {
            return read_extracted(path);
        }
        let bytes = fs::read(path)
            .map_err(|err| DecodeError::extraction(path, "cannot read archive file", err))?;
        self.read_with_location(&bytes, Some(path))
    }

    /// Persists and extracts a zip archive, returning the extraction directory.
    fn extract_legacy(&self, bytes: &[u8], location: Option<&Path>) -> Result<PathBuf, DecodeError> {
        let hash = content_hash(bytes);
        fs::create_dir_all(&self.cache_dir).map_err(|err| {
            DecodeError::extraction(&self.cache_dir, "cannot create cache directory", err)
        })?;

        let archive_path = match location {
            Some(path) if !path.is_dir() => path.to_path_buf(),
            _ => self.cache_dir.join(format!("{hash}.svga")),
        };
        if !archive_path.exists() {
            fs::write(&archive_path, bytes)
                .map_err(|err| DecodeError::extraction(&archive_path, "cannot persist archive", err))?;
        }

        let target = self.cache_dir.join(format!("{hash}.svga.unzip"));
        if target.is_dir() {
            debug!(dir = ?target, "reusing extracted archive");
            return Ok(target);
        }

        // Extract next to the target and move it into place, so a concurrent reader either sees
        // the finished directory or nothing.
        let staging = tempfile::Builder::new()
            .prefix(".svga-unzip")
            .tempdir_in(&self.cache_dir)
            .map_err(|err| DecodeError::extraction(&self.cache_dir, "cannot create staging directory", err))?;
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| DecodeError::extraction(&archive_path, "invalid zip archive", err))?;
        zip.extract(staging.path())
            .map_err(|err| DecodeError::extraction(staging.path(), "cannot extract zip archive", err))?;

        let staged = staging.keep();
        if let Err(err) = fs::rename(&staged, &target) {
            let _ = fs::remove_dir_all(&staged);
            if !target.is_dir() {
                return Err(DecodeError::extraction(&target, "cannot move extracted archive", err));
            }
        }
        debug!(dir = ?target, entries = zip.len(), "extracted archive");
        Ok(target)
    }
}

fn inflate(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut payload = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut payload)
        .map_err(DecodeError::Decompression)?;
    Ok(payload)
}

fn read_extracted(dir: &Path) -> Result<MovieEntity, DecodeError> {
    let movie_path = dir.join(MOVIE_ENTRY);
    if !movie_path.is_file() {
        return Err(DecodeError::missing_entry(dir, MOVIE_ENTRY));
    }
    let payload = fs::read(&movie_path)
        .map_err(|err| DecodeError::extraction(&movie_path, "cannot read movie record", err))?;
    let record = data::MovieEntity::decode(payload.as_slice())?;
    MovieEntity::from_record(record, Some(dir))
}

/// Decodes the image table.
///
/// When `dir` is given, an image value is first read as the stem of a sibling `<stem>.png`.
/// Values that name no readable file are decoded as inline bitmap bytes. Keys that fail to
/// decode are dropped but still count towards the summed size of the raw values, which is
/// returned with the table.
pub(crate) fn resolve_images(
    images: HashMap<String, Vec<u8>>,
    dir: Option<&Path>,
) -> (HashMap<String, Arc<Bitmap>>, usize) {
    let mut table = HashMap::with_capacity(images.len());
    let mut total_size = 0;

    for (key, value) in images {
        total_size += value.len();
        let decoded = match dir.and_then(|dir| read_sibling(dir, &value)) {
            Some(file_bytes) => Bitmap::decode(file_bytes),
            None => Bitmap::decode(value),
        };
        match decoded {
            Ok(bitmap) => {
                table.insert(key, Arc::new(bitmap));
            }
            Err(err) => warn!(key = %key, error = %err, "skipping undecodable image"),
        }
    }
    (table, total_size)
}

fn read_sibling(dir: &Path, value: &[u8]) -> Option<Vec<u8>> {
    let stem = std::str::from_utf8(value).ok()?;
    if stem.is_empty() || stem.contains(['/', '\\']) || stem == ".." {
        return None;
    }
    fs::read(dir.join(format!("{stem}.png"))).ok()
}
