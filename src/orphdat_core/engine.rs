//! `HashEngine`: the orchestrator tying `TypeRegistry`, `PathCodec`,
//! `ContentHasher`, and `HashRecordStore` together into `resolve` and
//! `find_hashes` (spec.md §4.6).

use std::path::{Path, PathBuf};

use crate::orphdat_core::conflict::{ConflictDecision, ConflictResolver};
use crate::orphdat_core::error::{Error, Result};
use crate::orphdat_core::hasher;
use crate::orphdat_core::record::{make_base, store_key, store_path, BaseStat, HashRecord, HashSet};
use crate::orphdat_core::reporter::{ReportKind, Reporter};
use crate::orphdat_core::store::HashRecordStore;
use crate::orphdat_core::type_registry;
use crate::orphdat_core::walker;

/// A single-slot cache of the most recently touched store, keyed by store
/// path, scoped to this engine instance — never a process-wide static
/// (spec.md §5, §9).
#[derive(Default)]
struct RecordCache {
    slot: Option<(PathBuf, HashSet)>,
}

impl RecordCache {
    fn lookup(&self, store_path: &Path, key: &str) -> Option<HashRecord> {
        self.slot
            .as_ref()
            .filter(|(p, _)| p == store_path)
            .and_then(|(_, set)| set.get(key))
            .cloned()
    }

    fn update(&mut self, store_path: PathBuf, set: HashSet) {
        self.slot = Some((store_path, set));
    }
}

pub struct HashEngine {
    store: HashRecordStore,
    cache: RecordCache,
    reporter: Box<dyn Reporter>,
    conflict_resolver: Box<dyn ConflictResolver>,
}

impl HashEngine {
    pub fn new(reporter: Box<dyn Reporter>, conflict_resolver: Box<dyn ConflictResolver>) -> Self {
        Self {
            store: HashRecordStore::new(),
            cache: RecordCache::default(),
            reporter,
            conflict_resolver,
        }
    }

    /// Whether `candidate` can be trusted without recomputing content,
    /// per spec.md §4.6.
    pub fn can_use_cached(
        &self,
        add_only: bool,
        candidate: Option<&HashRecord>,
        base: &BaseStat,
        mime: &str,
    ) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        if add_only {
            return true;
        }
        candidate.size == base.size
            && candidate.mtime == base.mtime
            && candidate.filename.to_lowercase() == base.filename.to_lowercase()
            && hasher::is_version_current(mime, candidate.version)
    }

    /// Resolve the current `HashRecord` for `path`, consulting caches,
    /// validating with stat, recomputing on miss or stale version, and
    /// writing back. Returns `None` only if the conflict resolver chooses
    /// to skip this file.
    pub fn resolve(
        &mut self,
        path: &Path,
        add_only: bool,
        force_recalc: bool,
        supplied_record: Option<HashRecord>,
    ) -> Result<Option<HashRecord>> {
        let store_path = store_path(path);
        let key = store_key(path);
        let base = make_base(path)?;
        let mime = type_registry::mime(path);

        if !force_recalc {
            if let Some(supplied) = &supplied_record {
                if self.can_use_cached(add_only, Some(supplied), &base, mime) {
                    self.reporter.emit(ReportKind::Trace, &format!("cache hit (supplied): {}", path.display()));
                    return Ok(Some(with_base(supplied.clone(), &base)));
                }
            }

            let cached = self.cache.lookup(&store_path, &key);
            if self.can_use_cached(add_only, cached.as_ref(), &base, mime) {
                self.reporter.emit(ReportKind::Trace, &format!("cache hit (in-memory): {}", path.display()));
                return Ok(Some(with_base(cached.expect("checked Some above"), &base)));
            }

            let set = self.store.read_or_create(&store_path)?;
            let existing = set.get(&key).cloned();
            self.cache.update(store_path.clone(), set);
            if self.can_use_cached(add_only, existing.as_ref(), &base, mime) {
                self.reporter.emit(ReportKind::Read, &format!("store hit: {}", path.display()));
                return Ok(Some(with_base(existing.expect("checked Some above"), &base)));
            }
        }

        let existing = {
            let set = self.store.read_or_create(&store_path)?;
            let existing = set.get(&key).cloned();
            self.cache.update(store_path.clone(), set);
            existing
        };

        let result = hasher::hash(path)?;
        let mut new_record = HashRecord {
            filename: base.filename.clone(),
            size: base.size,
            mtime: base.mtime,
            md5: result.md5,
            full_md5: result.full_md5,
            version: result.version,
        };

        if let Some(old) = &existing {
            if old.md5 == new_record.md5 {
                self.reporter.emit(ReportKind::Read, &format!("verified: {}", path.display()));
            } else if old.full_md5 == new_record.full_md5 {
                if hasher::is_version_current(mime, old.version) {
                    return Err(Error::VersionInvariantViolation {
                        path: path.to_path_buf(),
                        version: old.version,
                    });
                }
                self.reporter
                    .emit(ReportKind::Update, &format!("silent algorithm upgrade: {}", path.display()));
            } else {
                match self.conflict_resolver.on_content_mismatch(old, &new_record) {
                    ConflictDecision::Keep => {
                        new_record = old.clone();
                    }
                    ConflictDecision::Overwrite => {}
                    ConflictDecision::Skip => {
                        self.reporter.emit(ReportKind::Trace, &format!("skipped: {}", path.display()));
                        return Ok(None);
                    }
                    ConflictDecision::Abort => {
                        return Err(Error::Aborted(path.to_path_buf()));
                    }
                }
            }
        } else {
            self.reporter.emit(ReportKind::Create, &format!("new record: {}", path.display()));
        }

        self.store.put(path, new_record.clone())?;
        let set = self.store.read_or_create(&store_path)?;
        self.cache.update(store_path, set);

        Ok(Some(new_record))
    }

    /// Walk `roots`, opening every `.orphdat` encountered (directory
    /// descent gated by `is_dir_wanted`), and invoke `visit(media_path,
    /// record)` for every stored record whose sibling media path passes
    /// `is_file_wanted`. Records within a single store are visited sorted
    /// by `filename`, case-sensitively.
    pub fn find_hashes(
        &mut self,
        roots: &[impl AsRef<str>],
        include_trash: bool,
        is_dir_wanted: impl Fn(&Path) -> bool,
        is_file_wanted: impl Fn(&Path) -> bool,
        mut visit: impl FnMut(&Path, &HashRecord),
    ) -> Result<()> {
        walker::walk(
            roots,
            include_trash,
            |path, _root| if path.is_dir() { is_dir_wanted(path) } else { true },
            |path, _root| {
                if path.is_dir() || path.file_name().is_none_or(|n| n != crate::orphdat_core::record::STORE_FILE_NAME)
                {
                    return Ok(());
                }

                let set = self.store.read(path)?;
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                let mut entries: Vec<&HashRecord> = set.values().collect();
                entries.sort_by(|a, b| a.filename.cmp(&b.filename));

                for record in entries {
                    let media_path = dir.join(&record.filename);
                    if is_file_wanted(&media_path) {
                        visit(&media_path, record);
                    }
                }
                Ok(())
            },
        )
    }
}

fn with_base(mut record: HashRecord, base: &BaseStat) -> HashRecord {
    record.size = base.size;
    record.mtime = base.mtime;
    record.filename = base.filename.clone();
    record
}
