//! Path splitting, joining, and extension-order comparison.
//!
//! Extensions are compared case-insensitively throughout; basenames and
//! directory components likewise. Only the `filename` field stored on a
//! `HashRecord` preserves original case (see `record.rs`).

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

/// Split a filename into `(base, ext)` at the last dot. `ext` excludes the
/// dot. If there is no dot (or the only dot is a leading one, i.e. a
/// dotfile), `ext` is empty and `base` is the whole filename.
pub fn split_ext(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(0) => (filename, ""),
        Some(idx) => (&filename[..idx], &filename[idx + 1..]),
        None => (filename, ""),
    }
}

/// Join a parent directory and a new filename, canonicalizing the result
/// (resolving `..`, normalizing separators). Returns the new path along
/// with the old basename of `path`.
///
/// Canonicalization here is lexical (it does not touch the filesystem and
/// does not require the path to exist), matching "catpath then canonpath"
/// from spec.md §4.2 — the filesystem-touching `std::fs::canonicalize` is
/// reserved for places that need symlink resolution (see `resolve_roots`
/// in `walker.rs`).
pub fn change_filename(path: &Path, new_filename: &str) -> (PathBuf, String) {
    let old_basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let new_path = match path.parent() {
        Some(parent) => parent.join(new_filename),
        None => PathBuf::from(new_filename),
    };
    (lexical_normalize(&new_path), old_basename)
}

/// Lexically normalize a path: collapse `.` components and resolve `..`
/// against preceding normal components, without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The parent directory of `path`, or `path` itself if it has no parent
/// (e.g. it is already a root).
pub fn parent(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf())
}

fn lower(s: &str) -> String {
    s.to_lowercase()
}

/// Compare two paths in "extension-order": ancestor directories first
/// (shorter directory path precedes longer), then basenames, then
/// extension-order rank (lower first), with `reverse` negating the rank
/// comparison and its extension-string tie-break, per spec.md §4.2.
pub fn compare_with_ext_order(
    a: &Path,
    b: &Path,
    ext_order_a: i32,
    ext_order_b: i32,
    reverse: bool,
) -> Ordering {
    let dir_a: Vec<String> = parent(a)
        .components()
        .map(|c| lower(&c.as_os_str().to_string_lossy()))
        .collect();
    let dir_b: Vec<String> = parent(b)
        .components()
        .map(|c| lower(&c.as_os_str().to_string_lossy()))
        .collect();

    for (ca, cb) in dir_a.iter().zip(dir_b.iter()) {
        match ca.cmp(cb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    match dir_a.len().cmp(&dir_b.len()) {
        Ordering::Equal => {}
        other => return other,
    }

    let base_a = lower(&a.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
    let base_b = lower(&b.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
    match base_a.cmp(&base_b) {
        Ordering::Equal => {}
        other => return other,
    }

    let rank_cmp = ext_order_a.cmp(&ext_order_b);
    let rank_cmp = if reverse { rank_cmp.reverse() } else { rank_cmp };
    if rank_cmp != Ordering::Equal {
        return rank_cmp;
    }

    let (_, ext_a) = split_ext(&a.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
    let (_, ext_b) = split_ext(&b.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
    let ext_cmp = lower(ext_a).cmp(&lower(ext_b));
    if reverse { ext_cmp.reverse() } else { ext_cmp }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ext() {
        assert_eq!(split_ext("img.jpg"), ("img", "jpg"));
        assert_eq!(split_ext("img.JPG"), ("img", "JPG"));
        assert_eq!(split_ext("archive.tar.gz"), ("archive.tar", "gz"));
        assert_eq!(split_ext("noext"), ("noext", ""));
        assert_eq!(split_ext(".hidden"), (".hidden", ""));
    }

    #[test]
    fn test_change_filename() {
        let (new_path, old) = change_filename(Path::new("/a/b/old.jpg"), "new.jpg");
        assert_eq!(new_path, PathBuf::from("/a/b/new.jpg"));
        assert_eq!(old, "old.jpg");
    }

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(
            lexical_normalize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent(Path::new("/a/b/c.jpg")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_compare_with_ext_order_directory_first() {
        let a = Path::new("/a/img.jpg");
        let b = Path::new("/a/b/img.jpg");
        assert_eq!(compare_with_ext_order(a, b, 0, 0, false), Ordering::Less);
    }

    #[test]
    fn test_compare_with_ext_order_basename_case_insensitive() {
        let a = Path::new("/a/IMG.jpg");
        let b = Path::new("/a/img.jpg");
        assert_eq!(compare_with_ext_order(a, b, 0, 0, false), Ordering::Equal);
    }

    #[test]
    fn test_compare_with_ext_order_sidecar_sorts_first() {
        // CR2 has ext_order -1 (sidecared primary), its JPG sidecar has 0.
        let cr2 = Path::new("/a/img.cr2");
        let jpg = Path::new("/a/img.jpg");
        assert_eq!(compare_with_ext_order(cr2, jpg, -1, 0, false), Ordering::Less);
    }

    #[test]
    fn test_compare_with_ext_order_reverse_negates_rank_and_ext() {
        let cr2 = Path::new("/a/img.cr2");
        let jpg = Path::new("/a/img.jpg");
        assert_eq!(compare_with_ext_order(cr2, jpg, -1, 0, true), Ordering::Greater);
    }
}
