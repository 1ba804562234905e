//! The data model from spec.md §3: `MediaPath`/`StoreKey`/`StorePath`
//! wrapper helpers, and the `HashRecord`/`HashSet` persisted types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The per-directory sidecar database's filename.
pub const STORE_FILE_NAME: &str = ".orphdat";

/// The lowercased filename (no directory component) used as a store key.
/// Collisions across case variants are the same entity (spec.md §3).
pub fn store_key(media_path: &Path) -> String {
    media_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// The absolute path of the per-directory database file indexing
/// `media_path`: always `<dir>/.orphdat`.
pub fn store_path(media_path: &Path) -> PathBuf {
    match media_path.parent() {
        Some(parent) => parent.join(STORE_FILE_NAME),
        None => PathBuf::from(STORE_FILE_NAME),
    }
}

/// A single media file's cached identity. See spec.md §3 for field
/// invariants; I1/I2 are enforced by construction in `hasher.rs`/`engine.rs`
/// rather than re-validated on every read, since every writer path already
/// goes through those constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub filename: String,
    pub size: u64,
    pub mtime: i64,
    pub md5: String,
    pub full_md5: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl HashRecord {
    /// Whether this record's `md5`/`full_md5` are well-formed 32-hex
    /// lowercase digests (invariant I2).
    pub fn has_valid_digests(&self) -> bool {
        is_hex32(&self.md5) && is_hex32(&self.full_md5)
    }
}

fn is_hex32(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// `make_base(path)` from spec.md §4.4.2: the stat-derived fields used to
/// short-circuit recomputation, sharing the same names as their
/// `HashRecord` counterparts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseStat {
    pub filename: String,
    pub size: u64,
    pub mtime: i64,
}

pub fn make_base(path: &Path) -> std::io::Result<BaseStat> {
    let metadata = std::fs::metadata(path)?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Ok(BaseStat {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: metadata.len(),
        mtime,
    })
}

/// An unordered (by construction, a `BTreeMap` so JSON serialization
/// naturally emits canonically sorted keys — spec.md §4.5) mapping
/// `StoreKey -> HashRecord`.
pub type HashSet = BTreeMap<String, HashRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_lowercases() {
        assert_eq!(store_key(Path::new("/a/b/IMG_0001.JPG")), "img_0001.jpg");
    }

    #[test]
    fn test_store_path() {
        assert_eq!(
            store_path(Path::new("/a/b/IMG_0001.JPG")),
            PathBuf::from("/a/b/.orphdat")
        );
    }

    #[test]
    fn test_valid_digests() {
        let rec = HashRecord {
            filename: "a.jpg".into(),
            size: 1,
            mtime: 0,
            md5: "d".repeat(32),
            full_md5: "0".repeat(32),
            version: 1,
        };
        assert!(rec.has_valid_digests());

        let bad = HashRecord { md5: "short".into(), ..rec };
        assert!(!bad.has_valid_digests());
    }
}
