//! Printable strings embedded in binaries

use std::fs;
use std::path::Path;

use crate::error::RelocateError;

/// Shortest run of printable bytes reported as a string, matching `strings(1)`
const MIN_STRING_LEN: usize = 4;

fn is_printable(byte: u8) -> bool {
    byte == b'\t' || (0x20..0x7f).contains(&byte)
}

/// Extract the printable ASCII strings of `data`, in file order.
fn scan_strings(data: &[u8]) -> Vec<String> {
    data.split(|&b| !is_printable(b))
        .filter(|run| run.len() >= MIN_STRING_LEN)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect()
}

/// Read the printable strings embedded in the file at `path`
pub fn embedded_strings(path: &Path) -> Result<Vec<String>, RelocateError> {
    let data = fs::read(path).map_err(|source| RelocateError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(scan_strings(&data))
}

/// Rewrite `old` to `new` inside NUL-terminated strings of `data`.
///
/// Each match runs from an occurrence of `old` to the next NUL byte; every
/// `old` inside it is replaced and the shortfall is padded with NULs, so
/// offsets of everything after the string are unchanged. Returns `None` when
/// `old` does not occur in any terminated string.
fn rewrite_terminated(data: &[u8], old: &[u8], new: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;
    let mut changed = false;

    while let Some(offset) = find(&data[pos..], old) {
        let start = pos + offset;
        let Some(nul) = data[start + old.len()..].iter().position(|&b| b == 0) else {
            break;
        };
        let end = start + old.len() + nul;

        out.extend_from_slice(&data[pos..start]);
        let segment = &data[start..end];
        let mut rest = segment;
        let mut written = 0;
        while let Some(i) = find(rest, old) {
            out.extend_from_slice(&rest[..i]);
            out.extend_from_slice(new);
            written += i + new.len();
            rest = &rest[i + old.len()..];
        }
        out.extend_from_slice(rest);
        written += rest.len();
        out.resize(out.len() + (segment.len() - written), 0);

        pos = end;
        changed = true;
    }

    if !changed {
        return None;
    }
    out.extend_from_slice(&data[pos..]);
    Some(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Replace `old_prefix` with `new_prefix` in the strings of a binary, in place.
///
/// The file keeps its size: shorter prefixes are padded with NUL bytes, and a
/// `new_prefix` longer than `old_prefix` is rejected with
/// [`RelocateError::PrefixTooLong`]. Returns whether the file was modified.
pub fn replace_prefix_bytes(
    path: &Path,
    old_prefix: &str,
    new_prefix: &str,
) -> Result<bool, RelocateError> {
    if old_prefix.is_empty() {
        return Err(RelocateError::InvalidRequest(
            "old prefix must not be empty".to_string(),
        ));
    }

    let data = fs::read(path).map_err(|source| RelocateError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if find(&data, old_prefix.as_bytes()).is_none() {
        return Ok(false);
    }
    if new_prefix.len() > old_prefix.len() {
        return Err(RelocateError::PrefixTooLong {
            path: path.to_path_buf(),
            old: old_prefix.to_string(),
            new: new_prefix.to_string(),
        });
    }

    match rewrite_terminated(&data, old_prefix.as_bytes(), new_prefix.as_bytes()) {
        Some(rewritten) => {
            debug_assert_eq!(rewritten.len(), data.len());
            fs::write(path, rewritten)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_scan_strings() {
        let data = b"\x7fELF\x02\x01abc\0/opt/store/lib\0\x01\x02hello world\0";
        let strings = scan_strings(data);
        assert_eq!(strings, vec!["/opt/store/lib", "hello world"]);
    }

    #[test]
    fn test_embedded_strings_missing_file() {
        let err = embedded_strings(Path::new("/nonexistent/file")).unwrap_err();
        assert!(matches!(err, RelocateError::Unreadable { .. }));
    }

    #[test]
    fn test_rewrite_same_length() {
        let data = b"xx/usr/lib:/usr/lib64\0tail";
        let out = rewrite_terminated(data, b"/usr", b"/foo").unwrap();
        assert_eq!(out, b"xx/foo/lib:/foo/lib64\0tail");
    }

    #[test]
    fn test_rewrite_pads_shorter_prefix() {
        let data = b"/long/prefix/lib:/long/prefix/lib64\0next";
        let out = rewrite_terminated(data, b"/long/prefix", b"/opt").unwrap();
        assert_eq!(out.len(), data.len());
        assert!(out.starts_with(b"/opt/lib:/opt/lib64\0"));
        assert!(out.ends_with(b"\0next"));
        // Two occurrences, eight bytes shorter each
        let zeros = out.iter().filter(|&&b| b == 0).count();
        assert_eq!(zeros, 1 + 16);
    }

    #[test]
    fn test_rewrite_ignores_unterminated() {
        let data = b"/usr/lib";
        assert!(rewrite_terminated(data, b"/usr", b"/foo").is_none());
    }

    #[test]
    fn test_replace_prefix_bytes_in_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("libfoo.so");
        fs::write(&path, b"\x7fELF\0/build/tmp/lib\0/usr/lib\0").unwrap();

        assert!(replace_prefix_bytes(&path, "/build/tmp", "/opt").unwrap());
        let data = fs::read(&path).unwrap();
        assert_eq!(data, b"\x7fELF\0/opt/lib\0\0\0\0\0\0\0/usr/lib\0");

        // Nothing left to replace
        assert!(!replace_prefix_bytes(&path, "/build/tmp", "/opt").unwrap());
    }

    #[test]
    fn test_replace_prefix_bytes_too_long() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("libfoo.so");
        fs::write(&path, b"/usr/lib\0").unwrap();

        let err = replace_prefix_bytes(&path, "/usr", "/opt/software").unwrap_err();
        assert!(matches!(err, RelocateError::PrefixTooLong { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"/usr/lib\0");
    }
}
