//! Conversion between absolute RPATH entries and `$ORIGIN`-relative ones
//!
//! `$ORIGIN` is expanded by the dynamic linker to the directory holding the
//! binary being loaded, so a relative entry is always computed against the
//! directory of the binary's (possibly future) location.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Placeholder for the directory of the loading binary
pub const ORIGIN: &str = "$ORIGIN";

/// Braced spelling of [`ORIGIN`], also understood by the dynamic linker
const ORIGIN_BRACED: &str = "${ORIGIN}";

/// Lexically normalize a path: drop `.` segments and resolve `..` against
/// the preceding segment. Symlinks are not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }

    if parts.is_empty() {
        PathBuf::from(".")
    } else {
        parts.iter().collect()
    }
}

/// Directory holding `start_path`, normalized
fn origin_dir(start_path: &Path) -> PathBuf {
    let start = normalize(start_path);
    match start.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("/"),
    }
}

/// Rewrite entries under `base_root` relative to the directory of `start_path`.
///
/// Every absolute entry lying under `base_root` (compared component-wise)
/// becomes `$ORIGIN/<relative path>`. Other entries are returned unchanged.
/// `start_path` is where the binary will live and need not exist. It must be
/// absolute; for a relative `start_path` all entries are returned unchanged.
pub fn to_relative(start_path: &Path, base_root: &Path, paths: &[String]) -> Vec<String> {
    if !start_path.is_absolute() {
        return paths.to_vec();
    }
    let origin = origin_dir(start_path);
    let base_root = normalize(base_root);

    paths
        .iter()
        .map(|entry| {
            let target = Path::new(entry);
            if !target.is_absolute() {
                return entry.clone();
            }
            let target = normalize(target);
            if !target.starts_with(&base_root) {
                return entry.clone();
            }
            match pathdiff::diff_paths(&target, &origin) {
                Some(relative)
                    if relative.as_os_str().is_empty() || relative == Path::new(".") =>
                {
                    ORIGIN.to_string()
                }
                Some(relative) => format!("{}/{}", ORIGIN, relative.display()),
                None => entry.clone(),
            }
        })
        .collect()
}

/// Strip a leading `$ORIGIN` (or `${ORIGIN}`) marker, returning the remainder
fn strip_origin(entry: &str) -> Option<&str> {
    [ORIGIN_BRACED, ORIGIN].iter().find_map(|marker| {
        entry
            .strip_prefix(marker)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Expand `$ORIGIN` entries against the directory of `start_path`.
///
/// Expanded entries are normalized. Entries without the marker, including
/// relative ones such as `../local/lib`, are returned verbatim.
pub fn to_absolute(start_path: &Path, paths: &[String]) -> Vec<String> {
    let origin = origin_dir(start_path);

    paths
        .iter()
        .map(|entry| match strip_origin(entry) {
            Some(rest) => {
                let expanded = origin.join(rest.trim_start_matches('/'));
                normalize(&expanded).to_string_lossy().into_owned()
            }
            None => entry.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/usr/bin/../lib")), Path::new("/usr/lib"));
        assert_eq!(normalize(Path::new("/usr/./lib/")), Path::new("/usr/lib"));
        assert_eq!(normalize(Path::new("/../lib")), Path::new("/lib"));
        assert_eq!(normalize(Path::new("../a/../b")), Path::new("../b"));
        assert_eq!(normalize(Path::new("a/..")), Path::new("."));
    }

    #[test]
    fn test_make_relative_paths() {
        let relatives = to_relative(
            Path::new("/usr/bin/test"),
            Path::new("/usr"),
            &strings(&["/usr/lib", "/usr/lib64", "/opt/local/lib"]),
        );
        assert_eq!(
            relatives,
            strings(&["$ORIGIN/../lib", "$ORIGIN/../lib64", "/opt/local/lib"])
        );
    }

    #[test]
    fn test_make_relative_needs_absolute_start() {
        let paths = strings(&["/usr/lib", "/usr/lib64"]);
        assert_eq!(to_relative(Path::new("bin/test"), Path::new("/usr"), &paths), paths);
    }

    #[test]
    fn test_make_relative_same_directory() {
        let relatives = to_relative(
            Path::new("/opt/pkg/lib/libfoo.so"),
            Path::new("/opt/pkg"),
            &strings(&["/opt/pkg/lib", "/opt/pkg/lib/private"]),
        );
        assert_eq!(relatives, strings(&["$ORIGIN", "$ORIGIN/private"]));
    }

    #[test]
    fn test_make_relative_outside_root_unchanged() {
        let paths = strings(&["/usrlocal/lib", "/opt/lib", "relative/lib", "$ORIGIN/lib"]);
        let relatives = to_relative(Path::new("/usr/bin/test"), Path::new("/usr"), &paths);
        assert_eq!(relatives, paths);
    }

    #[test]
    fn test_normalize_relative_paths() {
        let normalized = to_absolute(
            Path::new("/usr/bin/test"),
            &strings(&["$ORIGIN/../lib", "$ORIGIN/../lib64", "/opt/local/lib"]),
        );
        assert_eq!(
            normalized,
            strings(&["/usr/lib", "/usr/lib64", "/opt/local/lib"])
        );
    }

    #[test]
    fn test_relative_without_origin_unchanged() {
        let normalized = to_absolute(Path::new("/usr/bin/test"), &strings(&["../local/lib"]));
        assert_eq!(normalized, strings(&["../local/lib"]));
    }

    #[test]
    fn test_braced_origin() {
        let normalized = to_absolute(
            Path::new("/opt/pkg/bin/tool"),
            &strings(&["${ORIGIN}/../lib", "$ORIGIN", "$ORIGINAL/lib"]),
        );
        assert_eq!(
            normalized,
            strings(&["/opt/pkg/lib", "/opt/pkg/bin", "$ORIGINAL/lib"])
        );
    }

    #[test]
    fn test_round_trip() {
        let start = Path::new("/opt/software/pkg-1.0/bin/tool");
        let root = Path::new("/opt/software");
        let paths = strings(&[
            "/opt/software/pkg-1.0/lib",
            "/opt/software/zlib-1.2/lib64",
            "/opt/software/pkg-1.0/bin",
            "/opt/software/pkg-1.0/lib/../share/lib",
        ]);

        for path in &paths {
            let single = vec![path.clone()];
            let relative = to_relative(start, root, &single);
            assert!(relative[0].starts_with(ORIGIN), "{:?}", relative);
            let absolute = to_absolute(start, &relative);
            assert_eq!(
                absolute,
                vec![normalize(Path::new(path)).to_string_lossy().into_owned()]
            );
        }
    }
}
