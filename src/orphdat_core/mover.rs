//! `FileMover`: move/trash/trash-with-root, keeping `HashRecordStore`
//! coherent with the filesystem on every rename (spec.md §4.7).

use std::path::{Path, PathBuf};

use crate::orphdat_core::error::{Error, Result};
use crate::orphdat_core::record::STORE_FILE_NAME;
use crate::orphdat_core::store::HashRecordStore;
use crate::orphdat_core::type_registry;

const TRASH_DIR_NAME: &str = ".orphtrash";

pub struct FileMover {
    store: HashRecordStore,
}

impl FileMover {
    pub fn new() -> Self {
        Self { store: HashRecordStore::new() }
    }

    /// Move a single file from `src` to `dst`, then reconcile the sidecar
    /// stores. A no-op if `src == dst`.
    ///
    /// `dst.exists()` is checked before attempting the rename, not inferred
    /// from a rename failure: on POSIX `std::fs::rename` silently overwrites
    /// an existing regular file instead of erroring, which would otherwise
    /// skip the append-merge / fail-if-exists logic below entirely (spec.md
    /// §4.7).
    pub fn move_file(&mut self, src: &Path, dst: &Path) -> Result<()> {
        if src == dst {
            return Ok(());
        }
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if dst.exists() {
            return self.reconcile_existing_destination(src, dst);
        }

        rename_with_fallback(src, dst)?;

        self.store.move_record(src, Some(dst))?;
        log::info!("moved {} -> {}", src.display(), dst.display());
        Ok(())
    }

    fn reconcile_existing_destination(&mut self, src: &Path, dst: &Path) -> Result<()> {
        let is_store_pair = src.file_name().is_some_and(|n| n == STORE_FILE_NAME)
            && dst.file_name().is_some_and(|n| n == STORE_FILE_NAME);
        if !is_store_pair {
            return Err(Error::DestinationExists(dst.to_path_buf()));
        }
        self.store.append(dst, src)?;
        std::fs::remove_file(src)?;
        Ok(())
    }

    /// Move a directory tree from `src` to `dst`. A plain rename if `dst`
    /// does not exist; otherwise a recursive move-merge, entry by entry.
    pub fn move_dir(&mut self, src: &Path, dst: &Path) -> Result<()> {
        if !dst.exists() {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(src, dst)?;
            return Ok(());
        }

        for entry in std::fs::read_dir(src)? {
            let entry = entry?;
            let entry_path = entry.path();
            if !entry_path.exists() {
                // Vanished mid-loop (e.g. a sibling move already emptied and
                // deleted this entry's store file).
                continue;
            }
            let dst_entry = dst.join(entry.file_name());
            if entry_path.is_dir() {
                self.move_dir(&entry_path, &dst_entry)?;
            } else {
                self.move_file(&entry_path, &dst_entry)?;
            }
        }

        if is_effectively_empty(src)? {
            std::fs::remove_dir(src)?;
        }
        Ok(())
    }

    /// Trash `path`: an empty directory is simply removed; anything else is
    /// moved under `<parent>/.orphtrash/<basename>`.
    pub fn trash(&mut self, path: &Path) -> Result<()> {
        if path.is_dir() && is_effectively_empty(path)? {
            std::fs::remove_dir(path)?;
            return Ok(());
        }

        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let trash_dir = parent.join(TRASH_DIR_NAME);
        std::fs::create_dir_all(&trash_dir)?;
        let basename = path.file_name().ok_or_else(|| Error::Argument("path has no filename".into()))?;
        let target = trash_dir.join(basename);

        if path.is_dir() {
            self.move_dir(path, &target)
        } else {
            self.move_file(path, &target)
        }
    }

    /// Trash `path`, preserving its position relative to `root` under
    /// `<root>/.orphtrash/<suffix>`, where `suffix` is `path`'s components
    /// after `root` with any `.orphtrash` component stripped.
    pub fn trash_with_root(&mut self, path: &Path, root: &Path) -> Result<()> {
        let suffix = path.strip_prefix(root).map_err(|_| Error::MissingAncestor {
            path: root.to_path_buf(),
            child: path.to_path_buf(),
        })?;
        if suffix.as_os_str().is_empty() {
            return Err(Error::MissingAncestor { path: root.to_path_buf(), child: path.to_path_buf() });
        }

        let filtered: PathBuf = suffix
            .components()
            .filter(|c| !c.as_os_str().eq_ignore_ascii_case(TRASH_DIR_NAME))
            .collect();

        let target = root.join(TRASH_DIR_NAME).join(filtered);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if path.is_dir() {
            self.move_dir(path, &target)
        } else {
            self.move_file(path, &target)
        }
    }

    /// Trash `path` together with every sidecar `TypeRegistry` reports for
    /// it that currently exists on disk.
    pub fn trash_and_sidecars(&mut self, path: &Path) -> Result<()> {
        let sidecars = type_registry::sidecar_paths(path);
        self.trash(path)?;
        for sidecar in sidecars {
            if sidecar.exists() {
                self.trash(&sidecar)?;
            }
        }
        Ok(())
    }
}

impl Default for FileMover {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a directory has no entries, or its only entry is an emptied
/// `.orphdat` companion (which `HashRecordStore` already would have deleted
/// — this only guards the race where a sibling is mid-move).
fn is_effectively_empty(dir: &Path) -> std::io::Result<bool> {
    let mut entries = std::fs::read_dir(dir)?;
    Ok(entries.next().is_none())
}

fn rename_with_fallback(src: &Path, dst: &Path) -> std::io::Result<()> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            std::fs::copy(src, dst)?;
            std::fs::remove_file(src)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}
