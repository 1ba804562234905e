//! Per-directory `.orphdat` sidecar database: read/write/delete/
//! append-merge, plus a single-slot in-memory cache (spec.md §4.5).

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use std::sync::LazyLock;

use crate::orphdat_core::error::{Error, Result};
use crate::orphdat_core::record::{store_key, store_path, HashRecord, HashSet};

static LEGACY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+): ([0-9a-fA-F]{32})\s*$").expect("legacy line regex is valid"));

/// A single process-wide-shaped (but here owned by the store instance, per
/// spec.md §9's "encapsulate as a single owned mutable slot") cache of the
/// most recently read/written store.
#[derive(Default)]
struct Cache {
    slot: Option<(PathBuf, HashSet)>,
}

impl Cache {
    fn get(&self, path: &Path) -> Option<&HashSet> {
        self.slot.as_ref().filter(|(p, _)| p == path).map(|(_, set)| set)
    }

    fn put(&mut self, path: PathBuf, set: HashSet) {
        self.slot = Some((path, set));
    }
}

/// Per-directory sidecar database access, with its own in-memory cache
/// slot. Two independently constructed `HashRecordStore`s never share a
/// cache (spec.md §4.6a).
#[derive(Default)]
pub struct HashRecordStore {
    cache: Cache,
}

impl HashRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store at `store_path`, creating an empty in-memory set if
    /// the file does not exist.
    pub fn read_or_create(&mut self, path: &Path) -> Result<HashSet> {
        if path.exists() {
            self.read(path)
        } else {
            let set = HashSet::new();
            self.cache.put(path.to_path_buf(), set.clone());
            Ok(set)
        }
    }

    /// Open an existing store. Dispatches to JSON or legacy plain-text
    /// parsing by peeking the first non-whitespace byte.
    pub fn read(&mut self, path: &Path) -> Result<HashSet> {
        let raw = std::fs::read_to_string(path)?;
        let set = parse_store(path, &raw)?;
        self.cache.put(path.to_path_buf(), set.clone());
        Ok(set)
    }

    /// Truncate and rewrite `store_path` with `set`, pretty-printed JSON,
    /// canonically sorted (via the `BTreeMap` backing `HashSet`). Warns if
    /// `set` is empty — callers should generally `remove` instead.
    pub fn write(&mut self, path: &Path, set: &HashSet) -> Result<()> {
        if set.is_empty() {
            log::warn!(
                "writing empty hash set to {} — consider deleting the store instead",
                path.display()
            );
        }
        let json = serde_json::to_string_pretty(set).map_err(|e| Error::MalformedStore {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        self.cache.put(path.to_path_buf(), set.clone());
        Ok(())
    }

    /// Read (or create), compare the incoming record against any existing
    /// one by deep equality, and no-op or write back as needed.
    pub fn put(&mut self, media_path: &Path, record: HashRecord) -> Result<()> {
        let path = store_path(media_path);
        let key = store_key(media_path);
        let mut set = self.read_or_create(&path)?;

        if set.get(&key) == Some(&record) {
            return Ok(());
        }

        set.insert(key, record);
        self.write(&path, &set)
    }

    /// Delete the key for `media_path`. If the set becomes empty, unlinks
    /// the store file entirely (invariant I4).
    pub fn remove(&mut self, media_path: &Path) -> Result<Option<HashRecord>> {
        let path = store_path(media_path);
        if !path.exists() {
            return Ok(None);
        }
        let key = store_key(media_path);
        let mut set = self.read(&path)?;
        let old = set.remove(&key);

        if old.is_some() {
            if set.is_empty() {
                std::fs::remove_file(&path)?;
                self.cache.put(path, HashSet::new());
            } else {
                self.write(&path, &set)?;
            }
        }
        Ok(old)
    }

    /// Move a record from `old_media_path`'s store to `new_media_path`'s
    /// store (or just remove it, if `new_media_path` is `None`), per
    /// spec.md §4.5/I5.
    pub fn move_record(
        &mut self,
        old_media_path: &Path,
        new_media_path: Option<&Path>,
    ) -> Result<()> {
        let Some(new_media_path) = new_media_path else {
            self.remove(old_media_path)?;
            return Ok(());
        };

        let old_path = store_path(old_media_path);
        if !old_path.exists() {
            return Ok(());
        }
        let old_key = store_key(old_media_path);
        let old_set = self.read(&old_path)?;
        let Some(old_record) = old_set.get(&old_key).cloned() else {
            return Ok(());
        };

        let new_filename = new_media_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let new_record = HashRecord { filename: new_filename, ..old_record };

        let new_path = store_path(new_media_path);
        let new_key = store_key(new_media_path);
        let mut target_set = self.read_or_create(&new_path)?;

        if target_set.get(&new_key) != Some(&new_record) {
            target_set.insert(new_key, new_record);
            self.write(&new_path, &target_set)?;
        }

        self.remove(old_media_path)?;
        Ok(())
    }

    /// Merge every key from `source_store_path` into `target_store_path`.
    /// A key absent in the target is inserted; a key present with a
    /// deep-equal record is skipped; a divergent record is a fatal
    /// `KeyCollision` — no partial writes are persisted.
    pub fn append(&mut self, target_store_path: &Path, source_store_path: &Path) -> Result<()> {
        if !source_store_path.exists() {
            return Ok(());
        }
        let source_set = self.read(source_store_path)?;
        let mut target_set = self.read_or_create(target_store_path)?;

        for (key, record) in &source_set {
            match target_set.get(key) {
                None => {
                    target_set.insert(key.clone(), record.clone());
                }
                Some(existing) if existing == record => {}
                Some(_) => {
                    return Err(Error::KeyCollision {
                        key: key.clone(),
                        source: source_store_path.to_path_buf(),
                        target: target_store_path.to_path_buf(),
                    });
                }
            }
        }

        self.write(target_store_path, &target_set)
    }
}

fn parse_store(path: &Path, raw: &str) -> Result<HashSet> {
    let first_non_ws = raw.chars().find(|c| !c.is_whitespace());
    match first_non_ws {
        Some('{') => parse_json_store(path, raw),
        _ => parse_legacy_store(path, raw),
    }
}

fn parse_json_store(path: &Path, raw: &str) -> Result<HashSet> {
    #[derive(serde::Deserialize)]
    struct RawRecord {
        filename: Option<String>,
        size: u64,
        mtime: i64,
        md5: String,
        full_md5: String,
        #[serde(default)]
        version: Option<u32>,
    }

    let raw_map: std::collections::BTreeMap<String, RawRecord> =
        serde_json::from_str(raw).map_err(|e| Error::MalformedStore {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut set = HashSet::new();
    for (key, raw_record) in raw_map {
        let filename = raw_record.filename.unwrap_or_else(|| key.clone());
        let record = HashRecord {
            filename,
            size: raw_record.size,
            mtime: raw_record.mtime,
            md5: raw_record.md5,
            full_md5: raw_record.full_md5,
            version: raw_record.version.unwrap_or(1),
        };
        set.insert(key, record);
    }
    Ok(set)
}

fn parse_legacy_store(path: &Path, raw: &str) -> Result<HashSet> {
    let mut set = HashSet::new();
    let reader = BufReader::new(raw.as_bytes());
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let caps = LEGACY_LINE.captures(&line).ok_or_else(|| Error::MalformedStore {
            path: path.to_path_buf(),
            reason: format!("legacy line does not match 'NAME: hexdigest': {line:?}"),
        })?;
        let name = caps[1].to_string();
        let hex = caps[2].to_lowercase();
        let key = name.to_lowercase();
        set.insert(
            key,
            HashRecord {
                filename: name,
                size: 0,
                mtime: 0,
                md5: hex.clone(),
                full_md5: hex,
                version: 0,
            },
        );
    }
    Ok(set)
}
