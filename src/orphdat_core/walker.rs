//! Recursive, bottom-up directory traversal with a two-phase filter
//! (spec.md §4.3).

use std::path::{Path, PathBuf};

use globset::Glob;
use walkdir::WalkDir;

use crate::orphdat_core::error::Result;

/// Whether an entry name should always be skipped during traversal,
/// regardless of `is_wanted`: `.`, `..`, AppleDouble `._*` files.
fn always_skip(file_name: &str) -> bool {
    file_name == "." || file_name == ".." || file_name.starts_with("._")
}

/// Whether `name` is a trash subtree (`.orphtrash`) that is skipped unless
/// the caller explicitly opts in via `include_trash`.
fn is_trash_dir(file_name: &str) -> bool {
    file_name.eq_ignore_ascii_case(".orphtrash")
}

/// Expand a single root argument via shell-like glob matching against the
/// current working directory (spec.md §4.3). A root with no glob
/// metacharacters is returned as-is (existence is not required here — the
/// walk below silently skips non-existent roots). A root containing glob
/// metacharacters is matched against its nearest non-glob ancestor
/// directory's entries.
pub fn expand_roots(roots: &[impl AsRef<str>]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for root in roots {
        let root = root.as_ref();
        if !has_glob_metachars(root) {
            expanded.push(PathBuf::from(root));
            continue;
        }

        let pattern_path = Path::new(root);
        let base = pattern_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let glob = Glob::new(root)?.compile_matcher();
        let Ok(entries) = std::fs::read_dir(&base) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if glob.is_match(&path) {
                expanded.push(path);
            }
        }
    }
    Ok(expanded)
}

fn has_glob_metachars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

/// Walk `roots` (already glob-expanded), invoking `is_wanted(full_path,
/// root_path)` before descending into any directory (pruning the subtree
/// if it returns false) and `visit(full_path, root_path)` for every
/// accepted entry, children before their parent.
///
/// `root_path` is the canonicalized absolute path of the glob-expanded
/// root this entry was found under (used by `FileMover::trash_with_root`
/// to compute the trash prefix).
pub fn walk(
    roots: &[impl AsRef<str>],
    include_trash: bool,
    mut is_wanted: impl FnMut(&Path, &Path) -> bool,
    mut visit: impl FnMut(&Path, &Path) -> Result<()>,
) -> Result<()> {
    for root in expand_roots(roots)? {
        let Ok(root_canonical) = root.canonicalize() else {
            continue;
        };

        if root_canonical.is_file() {
            if is_wanted(&root_canonical, &root_canonical) {
                visit(&root_canonical, &root_canonical)?;
            }
            continue;
        }

        let walker = WalkDir::new(&root_canonical)
            .contents_first(true)
            .into_iter()
            .filter_entry(|entry| {
                let file_name = entry.file_name().to_string_lossy();
                if always_skip(&file_name) {
                    return false;
                }
                if !include_trash && entry.file_type().is_dir() && is_trash_dir(&file_name) {
                    return false;
                }
                is_wanted(entry.path(), &root_canonical)
            });

        for entry in walker {
            let entry = entry?;
            if entry.path() == root_canonical && entry.file_type().is_dir() {
                // The root directory itself only hosts descendants; it is
                // not "visited" as a file.
                continue;
            }
            visit(entry.path(), &root_canonical)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_always_skip() {
        assert!(always_skip("."));
        assert!(always_skip(".."));
        assert!(always_skip("._hidden.jpg"));
        assert!(!always_skip("photo.jpg"));
    }

    #[test]
    fn test_walk_bottom_up_and_skips_appledouble() {
        let dir = assert_fs::TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(sub.join("b.jpg"), b"x").unwrap();
        fs::write(sub.join("._b.jpg"), b"x").unwrap();

        let mut visited = Vec::new();
        walk(
            &[dir.path().to_string_lossy().to_string()],
            false,
            |_, _| true,
            |path, _root| {
                visited.push(path.to_path_buf());
                Ok(())
            },
        )
        .unwrap();

        let names: Vec<String> = visited
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"a.jpg".to_string()));
        assert!(names.contains(&"b.jpg".to_string()));
        assert!(!names.contains(&"._b.jpg".to_string()));

        // "sub/b.jpg" (child) must appear before the "sub" directory entry itself.
        let b_pos = visited.iter().position(|p| p.ends_with("sub/b.jpg")).unwrap();
        let sub_pos = visited.iter().position(|p| p == &sub).unwrap();
        assert!(b_pos < sub_pos);
    }

    #[test]
    fn test_walk_skips_trash_unless_included() {
        let dir = assert_fs::TempDir::new().unwrap();
        let trash = dir.path().join(".orphtrash");
        fs::create_dir_all(&trash).unwrap();
        fs::write(trash.join("gone.jpg"), b"x").unwrap();

        let mut visited = Vec::new();
        walk(
            &[dir.path().to_string_lossy().to_string()],
            false,
            |_, _| true,
            |path, _| {
                visited.push(path.to_path_buf());
                Ok(())
            },
        )
        .unwrap();
        assert!(visited.iter().all(|p| !p.starts_with(&trash)));

        let mut visited_with_trash = Vec::new();
        walk(
            &[dir.path().to_string_lossy().to_string()],
            true,
            |_, _| true,
            |path, _| {
                visited_with_trash.push(path.to_path_buf());
                Ok(())
            },
        )
        .unwrap();
        assert!(visited_with_trash.iter().any(|p| p.starts_with(&trash)));
    }

    #[test]
    fn test_is_wanted_prunes_subtree() {
        let dir = assert_fs::TempDir::new().unwrap();
        let pruned = dir.path().join("pruned");
        fs::create_dir_all(&pruned).unwrap();
        fs::write(pruned.join("x.jpg"), b"x").unwrap();

        let mut visited = Vec::new();
        walk(
            &[dir.path().to_string_lossy().to_string()],
            false,
            |path, _| path.file_name().map(|n| n != "pruned").unwrap_or(true),
            |path, _| {
                visited.push(path.to_path_buf());
                Ok(())
            },
        )
        .unwrap();
        assert!(visited.iter().all(|p| !p.starts_with(&pruned)));
    }
}
