//! Static, immutable extension -> format metadata table (spec.md §4.1).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::orphdat_core::path_codec::{parent, split_ext};

/// A single extension's registry entry. Defaults: `mime = ""`,
/// `sidecars = []`, `ext_order = 0`.
#[derive(Debug, Clone, Default)]
pub struct TypeEntry {
    pub mime: &'static str,
    pub sidecars: &'static [&'static str],
    pub ext_order: i32,
}

/// A single queryable property of a `TypeEntry`, for the generic
/// `info(ext, property)` accessor from spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeProperty {
    Mime,
    ExtOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeValue {
    Mime(&'static str),
    ExtOrder(i32),
}

const RAW_EXTENSIONS: &[&str] = &["crw", "cr2", "cr3", "nef", "raf"];

fn raw_table() -> Vec<(&'static str, TypeEntry)> {
    let sidecars_for_raw: &'static [&'static str] = &["jpeg", "jpg", "xmp"];
    RAW_EXTENSIONS
        .iter()
        .map(|ext| {
            (
                *ext,
                TypeEntry {
                    mime: "image/x-raw",
                    sidecars: sidecars_for_raw,
                    ext_order: -1,
                },
            )
        })
        .collect()
}

static TABLE: LazyLock<HashMap<&'static str, TypeEntry>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, TypeEntry> = HashMap::new();

    m.insert("jpeg", TypeEntry { mime: "image/jpeg", sidecars: &["aae"], ext_order: -1 });
    m.insert("jpg", TypeEntry { mime: "image/jpeg", sidecars: &["aae"], ext_order: -1 });
    m.insert("heic", TypeEntry { mime: "image/heic", sidecars: &["xmp", "mov"], ext_order: -1 });
    m.insert("png", TypeEntry { mime: "image/png", sidecars: &[], ext_order: 0 });
    m.insert("tif", TypeEntry { mime: "image/tiff", sidecars: &[], ext_order: 0 });
    m.insert("tiff", TypeEntry { mime: "image/tiff", sidecars: &[], ext_order: 0 });
    m.insert("mp4", TypeEntry { mime: "video/mp4v-es", sidecars: &["lrv", "thm"], ext_order: -1 });
    m.insert("m4v", TypeEntry { mime: "video/mp4v-es", sidecars: &[], ext_order: 0 });
    m.insert("mov", TypeEntry { mime: "video/quicktime", sidecars: &[], ext_order: 0 });
    m.insert("avi", TypeEntry { mime: "video/x-msvideo", sidecars: &[], ext_order: 0 });
    m.insert("mp3", TypeEntry { mime: "audio/mpeg", sidecars: &[], ext_order: 0 });
    m.insert("m2ts", TypeEntry { mime: "video/mp2t", sidecars: &[], ext_order: 0 });
    m.insert("mts", TypeEntry { mime: "video/mp2t", sidecars: &[], ext_order: 0 });
    m.insert("mpg", TypeEntry { mime: "video/mpeg", sidecars: &[], ext_order: 0 });
    m.insert("psd", TypeEntry { mime: "image/photoshop", sidecars: &[], ext_order: 0 });
    m.insert("psb", TypeEntry { mime: "image/photoshop", sidecars: &[], ext_order: 0 });
    m.insert("rw2", TypeEntry { mime: "image/x-raw", sidecars: &[], ext_order: 0 });

    for (ext, entry) in raw_table() {
        m.insert(ext, entry);
    }

    assert_acyclic(&m);
    m
});

/// Backup-suffix pattern: `[._](bak|original|YYYYMMDDTHHMMSSZ~)\d*` at the
/// tail of a filename, stripped before extension lookup.
static BACKUP_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[._](bak|original|\d{8}t\d{6}z~)\d*$").expect("backup-suffix regex is valid")
});

static IS_MEDIA: LazyLock<Regex> = LazyLock::new(|| {
    let exts = TABLE
        .keys()
        .map(|e| regex::escape(e))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?i)\.({exts})([._](bak|original|\d{{8}}t\d{{6}}z~)\d*)?$");
    Regex::new(&pattern).expect("is_media regex is valid")
});

/// Strip a trailing backup suffix (if any) from a filename.
fn strip_backup_suffix(filename: &str) -> &str {
    match BACKUP_SUFFIX.find(filename) {
        Some(m) => &filename[..m.start()],
        None => filename,
    }
}

fn has_backup_suffix(filename: &str) -> bool {
    BACKUP_SUFFIX.is_match(filename)
}

/// Look up a single property for a (already backup-suffix-stripped, already
/// lowercased-or-not — lookup itself is case-insensitive) extension.
pub fn info(ext: &str, property: TypeProperty) -> Option<TypeValue> {
    let entry = TABLE.get(ext.to_lowercase().as_str())?;
    Some(match property {
        TypeProperty::Mime => TypeValue::Mime(entry.mime),
        TypeProperty::ExtOrder => TypeValue::ExtOrder(entry.ext_order),
    })
}

fn entry_for(filename: &str) -> Option<&'static TypeEntry> {
    let stripped = strip_backup_suffix(filename);
    let (_, ext) = split_ext(stripped);
    if ext.is_empty() {
        return None;
    }
    TABLE.get(ext.to_lowercase().as_str())
}

/// The MIME type for a media path, stripping any backup suffix first.
/// Empty string for an unknown extension.
pub fn mime(media_path: &Path) -> &'static str {
    let filename = media_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    entry_for(&filename).map(|e| e.mime).unwrap_or("")
}

/// The extension-order rank for a media path's extension. Defaults to 0
/// for unknown extensions.
pub fn ext_order(media_path: &Path) -> i32 {
    let filename = media_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    entry_for(&filename).map(|e| e.ext_order).unwrap_or(0)
}

/// Paths (constructed via the basename-swap rule, sharing `media_path`'s
/// parent) for each sidecar extension that exists on disk. Empty if
/// `media_path` itself carries a backup suffix.
pub fn sidecar_paths(media_path: &Path) -> Vec<PathBuf> {
    let filename = media_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if has_backup_suffix(&filename) {
        return Vec::new();
    }

    let Some(entry) = entry_for(&filename) else {
        return Vec::new();
    };

    let stripped = strip_backup_suffix(&filename);
    let (stem, _) = split_ext(stripped);
    let dir = parent(media_path);

    entry
        .sidecars
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .filter(|p| p.is_file())
        .collect()
}

/// Whether `filename` (basename only) is recognized as media, with an
/// optional backup suffix tolerated.
pub fn is_media(filename: &str) -> bool {
    IS_MEDIA.is_match(filename)
}

/// Walk the sidecar graph transitively from every extension and assert it
/// is acyclic, per spec.md §9: "implementations should assert acyclicity
/// at table-load time and refuse to start otherwise." Also checks the
/// ext_order DAG property: if X lists Y as a sidecar, Y.ext_order >
/// X.ext_order.
///
/// The canonical table is a DAG with diamonds, not just trees: RAW formats
/// list `[jpeg, jpg, xmp]` as sidecars, and both `jpeg` and `jpg` themselves
/// list `aae` — so `aae` is reachable from a RAW root by two separate
/// paths. A single set shared across the whole root's traversal cannot
/// distinguish that legal reconvergence from an actual cycle, so cycle
/// detection tracks only the current DFS recursion stack (`path`); a node
/// fully explored without finding itself on that stack is memoized in
/// `done` so a second arrival is a no-op instead of being re-walked (or
/// mistaken for a cycle).
fn assert_acyclic(table: &HashMap<&'static str, TypeEntry>) {
    let mut done: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for ext in table.keys() {
        let mut path: Vec<&str> = vec![ext];
        walk_sidecars(ext, table, &mut path, &mut done);
    }
}

fn walk_sidecars<'a>(
    ext: &'a str,
    table: &HashMap<&'a str, TypeEntry>,
    path: &mut Vec<&'a str>,
    done: &mut std::collections::HashSet<&'a str>,
) {
    if done.contains(ext) {
        return;
    }
    let Some(entry) = table.get(ext) else {
        done.insert(ext);
        return;
    };

    for &next in entry.sidecars {
        assert!(
            !path.contains(&next),
            "sidecar graph cycle detected involving extension {next}"
        );
        if let Some(next_entry) = table.get(next) {
            // Spec.md §4.1 states the stricter "Y.ext_order > X.ext_order",
            // but the canonical table assigns -1 uniformly to every
            // sidecared primary, including ones (like JPG) that are
            // themselves listed as another primary's sidecar (RAW ->
            // JPG). We enforce the achievable non-strict form and let
            // `compare_with_ext_order`'s extension-string tie-break
            // (path_codec.rs) resolve same-rank ordering.
            assert!(
                next_entry.ext_order >= entry.ext_order,
                "sidecar {next} of {ext} must not sort before its primary"
            );
        }

        path.push(next);
        walk_sidecars(next, table, path, done);
        path.pop();
    }

    done.insert(ext);
}
