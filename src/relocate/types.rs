//! Relocation request and result types

use std::path::Path;
use std::path::PathBuf;

/// Old-prefix to new-prefix substitutions applied to RPATH entries
///
/// Keys are unique; inserting an existing key replaces its value in place.
/// An entry is rewritten by the pair with the longest old prefix that is a
/// string prefix of it. Since keys are unique, at most one pair of a given
/// length can match, so the choice does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    entries: Vec<(String, String)>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a substitution, returning the previous new prefix for `old`
    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) -> Option<String> {
        let old = old.into();
        let new = new.into();
        match self.entries.iter_mut().find(|(key, _)| *key == old) {
            Some((_, value)) => Some(std::mem::replace(value, new)),
            None => {
                self.entries.push((old, new));
                None
            }
        }
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == old)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    /// Rewrite `entry` with the longest matching old prefix, if any
    pub fn substitute(&self, entry: &str) -> Option<String> {
        self.entries
            .iter()
            .filter(|(old, _)| !old.is_empty() && entry.starts_with(old.as_str()))
            .max_by_key(|(old, _)| old.len())
            .map(|(old, new)| format!("{}{}", new, &entry[old.len()..]))
    }

    /// Substitute every entry of `rpaths`, keeping order and dropping
    /// entries that duplicate an earlier result
    pub fn apply(&self, rpaths: &[String]) -> Vec<String> {
        let mut result: Vec<String> = Vec::with_capacity(rpaths.len());
        for entry in rpaths {
            let rewritten = self.substitute(entry).unwrap_or_else(|| entry.clone());
            if !result.contains(&rewritten) {
                result.push(rewritten);
            }
        }
        result
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PrefixMap::new();
        for (old, new) in iter {
            map.insert(old, new);
        }
        map
    }
}

/// Parameters of one relocation batch
#[derive(Debug, Clone)]
pub struct RelocationRequest {
    /// Binaries at their new location
    pub binaries: Vec<PathBuf>,
    /// Root the binaries were installed under before the move
    pub orig_root: PathBuf,
    /// Root the binaries now live under; required in relative mode
    pub new_root: Option<PathBuf>,
    /// Substitutions applied to the (absolute) RPATH entries
    pub new_prefixes: PrefixMap,
    /// Keep RPATHs `$ORIGIN`-relative instead of absolute
    pub rel: bool,
    /// Install prefix of the package before the move, defaults to `orig_root`
    pub orig_prefix: Option<PathBuf>,
    /// Install prefix of the package after the move, defaults to `new_root`
    pub new_prefix: Option<PathBuf>,
}

impl RelocationRequest {
    /// Request rewriting absolute RPATH entries
    pub fn absolute(
        binaries: Vec<PathBuf>,
        orig_root: impl Into<PathBuf>,
        new_prefixes: PrefixMap,
    ) -> Self {
        Self {
            binaries,
            orig_root: orig_root.into(),
            new_root: None,
            new_prefixes,
            rel: false,
            orig_prefix: None,
            new_prefix: None,
        }
    }

    /// Request rewriting `$ORIGIN`-relative RPATH entries
    pub fn relative(
        binaries: Vec<PathBuf>,
        orig_root: impl Into<PathBuf>,
        new_root: impl Into<PathBuf>,
        new_prefixes: PrefixMap,
    ) -> Self {
        Self {
            binaries,
            orig_root: orig_root.into(),
            new_root: Some(new_root.into()),
            new_prefixes,
            rel: true,
            orig_prefix: None,
            new_prefix: None,
        }
    }

    /// Set the package prefixes used to locate a binary before the move
    pub fn with_prefixes(
        mut self,
        orig_prefix: impl Into<PathBuf>,
        new_prefix: impl Into<PathBuf>,
    ) -> Self {
        self.orig_prefix = Some(orig_prefix.into());
        self.new_prefix = Some(new_prefix.into());
        self
    }

    /// Where `binary` sat before it was moved.
    ///
    /// `binary` is re-rooted from the new prefix onto the original one; a
    /// binary outside the new prefix is assumed not to have moved.
    pub fn original_location(&self, binary: &Path) -> PathBuf {
        let Some(moved_to) = self.new_prefix.as_ref().or(self.new_root.as_ref()) else {
            return binary.to_path_buf();
        };
        let moved_from = self.orig_prefix.as_ref().unwrap_or(&self.orig_root);
        match binary.strip_prefix(moved_to) {
            Ok(relative) => moved_from.join(relative),
            Err(_) => binary.to_path_buf(),
        }
    }
}

/// Outcome of a relocation batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationSummary {
    /// Binaries whose RPATH was written
    pub updated: Vec<PathBuf>,
    /// Binaries the editor failed to write
    pub failed: Vec<PathBuf>,
    /// Files left alone because they are not dynamically linked binaries
    pub skipped: Vec<PathBuf>,
}

impl RelocationSummary {
    /// Whether every binary was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = PrefixMap::new();
        assert_eq!(map.insert("/a", "/x"), None);
        assert_eq!(map.insert("/b", "/y"), None);
        assert_eq!(map.insert("/a", "/z"), Some("/x".to_string()));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("/a"), Some("/z"));
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![("/a", "/z"), ("/b", "/y")]);
    }

    #[test]
    fn test_substitute_longest_prefix() {
        let map: PrefixMap = [
            ("/tmp/build", "/opt/base"),
            ("/tmp/build/zlib-1.2", "/opt/zlib"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            map.substitute("/tmp/build/zlib-1.2/lib").as_deref(),
            Some("/opt/zlib/lib")
        );
        assert_eq!(
            map.substitute("/tmp/build/pkg/lib").as_deref(),
            Some("/opt/base/pkg/lib")
        );
        assert_eq!(map.substitute("/usr/lib64"), None);
    }

    #[test]
    fn test_apply_keeps_order_and_drops_duplicates() {
        let map: PrefixMap = [("/tmp/a", "/foo"), ("/tmp/b", "/foo")].into_iter().collect();
        let rpaths = strings(&["/tmp/a/lib", "/usr/lib64", "/tmp/b/lib", "/tmp/a/lib64"]);
        assert_eq!(
            map.apply(&rpaths),
            strings(&["/foo/lib", "/usr/lib64", "/foo/lib64"])
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let map: PrefixMap = [("/tmp/xyz", "/foo")].into_iter().collect();
        let once = map.apply(&strings(&["/tmp/xyz/lib", "/usr/lib64"]));
        let twice = map.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_original_location() {
        let request = RelocationRequest::relative(
            vec![],
            "/tmp/build",
            "/opt/software",
            PrefixMap::new(),
        );
        assert_eq!(
            request.original_location(Path::new("/opt/software/pkg/bin/tool")),
            Path::new("/tmp/build/pkg/bin/tool")
        );
        assert_eq!(
            request.original_location(Path::new("/elsewhere/bin/tool")),
            Path::new("/elsewhere/bin/tool")
        );

        let request = request.with_prefixes("/tmp/build/pkg-1.0", "/opt/software/pkg-1.0");
        assert_eq!(
            request.original_location(Path::new("/opt/software/pkg-1.0/lib/libfoo.so")),
            Path::new("/tmp/build/pkg-1.0/lib/libfoo.so")
        );
    }

    #[test]
    fn test_original_location_absolute_request() {
        let request = RelocationRequest::absolute(vec![], "/tmp/build", PrefixMap::new());
        assert_eq!(
            request.original_location(Path::new("/opt/bin/tool")),
            Path::new("/opt/bin/tool")
        );
    }
}
