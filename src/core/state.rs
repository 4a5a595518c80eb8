//! On-disk file snapshots.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Files are hashed in blocks of this many bytes.
pub const BLOCK_SIZE: usize = 4096;

/// BLAKE3 digest of a file's full content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Stream `reader` through the hasher in [`BLOCK_SIZE`] chunks.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0u8; BLOCK_SIZE];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(*hasher.finalize().as_bytes()))
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "ContentHash({})", &hex[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Snapshot of one file at observation time.
///
/// Only built for a path that existed and could be read; a newer observation
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileState {
    pub modified_time: DateTime<Utc>,
    pub size: u64,
    pub hash: ContentHash,
}

impl FileState {
    /// Read metadata and checksum for `path`.
    ///
    /// Returns `Ok(None)` if the path does not exist or is not a regular file.
    /// Any other failure, including the file disappearing between the
    /// metadata query and the read, is returned as an error.
    pub fn read(path: &Path) -> io::Result<Option<Self>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        if !metadata.is_file() {
            return Ok(None);
        }

        let modified_time = DateTime::<Utc>::from(metadata.modified()?);
        let hash = ContentHash::from_file(path)?;

        Ok(Some(Self {
            modified_time,
            size: metadata.len(),
            hash,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_streamed_hash_matches_one_shot() {
        // Spans several blocks and ends mid-block.
        let data: Vec<u8> = (0..(BLOCK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();

        let streamed = ContentHash::from_reader(Cursor::new(&data)).unwrap();
        assert_eq!(streamed, ContentHash::from_bytes(&data));
    }

    #[test]
    fn test_hash_hex_is_64_chars() {
        let hash = ContentHash::from_bytes(b"x");
        assert_eq!(hash.to_hex().len(), 64);
        assert_eq!(hash.to_string(), hash.to_hex());
        assert!(format!("{:?}", hash).starts_with("ContentHash("));
    }

    #[test]
    fn test_read_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "xy").unwrap();

        let state = FileState::read(&path).unwrap().expect("file exists");
        assert_eq!(state.size, 2);
        assert_eq!(state.hash, ContentHash::from_bytes(b"xy"));
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(FileState::read(&dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn test_read_directory_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(FileState::read(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_hash_serializes_as_hex() {
        let hash = ContentHash::from_bytes(b"abc");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
    }
}
