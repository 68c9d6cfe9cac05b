//! Lexical path helpers.
//!
//! Link targets are compared and computed purely on path components, never
//! by resolving them on disk: a dangling link still names the entry it was
//! meant for.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
///
/// A `..` at the root (or leading a relative path) is kept as-is.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Relative path leading from directory `from_dir` to `to`.
///
/// Both paths should be absolute (or both relative to the same base).
///
/// ```
/// use std::path::{Path, PathBuf};
/// use kolekto_cas::paths::relative_path;
///
/// let rel = relative_path(Path::new("/tree/Titles/A"), Path::new("/tree/.kolekto/movies/ab12"));
/// assert_eq!(rel, PathBuf::from("../../.kolekto/movies/ab12"));
/// ```
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from = normalize_lexically(from_dir);
    let to = normalize_lexically(to);

    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in &to_parts[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Where a symlink located at `link_path` points, as an absolute lexical path.
pub fn resolve_link_target(link_path: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        normalize_lexically(target)
    } else {
        let base = link_path.parent().unwrap_or_else(|| Path::new(""));
        normalize_lexically(&base.join(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(normalize_lexically(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_lexically(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_lexically(Path::new("../a/b/..")), PathBuf::from("../a"));
    }

    #[test]
    fn test_relative_path_sibling_and_nested() {
        assert_eq!(
            relative_path(Path::new("/tree/.kolekto/movies"), Path::new("/tree/incoming/film.mkv")),
            PathBuf::from("../../incoming/film.mkv")
        );
        assert_eq!(
            relative_path(Path::new("/tree/Titles"), Path::new("/tree/.kolekto/movies/ab")),
            PathBuf::from("../.kolekto/movies/ab")
        );
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/b")), PathBuf::from("."));
    }

    #[test]
    fn test_resolve_link_target() {
        let link = Path::new("/tree/Titles/Foo.mkv");
        assert_eq!(
            resolve_link_target(link, Path::new("../.kolekto/movies/ab")),
            PathBuf::from("/tree/.kolekto/movies/ab")
        );
        assert_eq!(
            resolve_link_target(link, Path::new("/elsewhere/x")),
            PathBuf::from("/elsewhere/x")
        );
    }
}
