//! RPATH editing via `patchelf`
//!
//! Failures of the editor are tolerated: a failed read yields an empty list
//! and a failed write is logged and reported as `None`, so that one broken
//! binary never aborts the relocation of a whole batch. Callers that need
//! strict guarantees should read the RPATH back after writing it.

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;
use tracing::warn;

/// Separator between entries of an RPATH string
const RPATH_SEPARATOR: &str = ":";

/// Something able to get and set the RPATH of a binary
pub trait RpathEditor {
    /// Read the RPATH entries of `binary`, in search order.
    ///
    /// An empty list means either "no RPATH" or "the editor failed"; the two
    /// are not distinguished.
    fn read_rpaths(&self, binary: &Path) -> Vec<String>;

    /// Replace the RPATH of `binary` with `rpaths`.
    ///
    /// Returns the editor output on success and `None` on failure.
    fn write_rpaths(&self, binary: &Path, rpaths: &[String]) -> Option<String>;
}

/// Split the output of `--print-rpath` into entries
pub fn parse_rpaths(output: &str) -> Vec<String> {
    output
        .trim()
        .split(RPATH_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

/// Join entries into a single RPATH string
pub fn join_rpaths(rpaths: &[String]) -> String {
    rpaths.join(RPATH_SEPARATOR)
}

/// The `patchelf` executable
#[derive(Debug, Clone)]
pub struct Patchelf {
    path: PathBuf,
}

impl Patchelf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the executable
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RpathEditor for Patchelf {
    fn read_rpaths(&self, binary: &Path) -> Vec<String> {
        let output = match Command::new(&self.path)
            .arg("--print-rpath")
            .arg(binary)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        if !output.status.success() {
            debug!(
                "{} --print-rpath {} failed: {}",
                self.path.display(),
                binary.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Vec::new();
        }

        parse_rpaths(&String::from_utf8_lossy(&output.stdout))
    }

    fn write_rpaths(&self, binary: &Path, rpaths: &[String]) -> Option<String> {
        let joined = join_rpaths(rpaths);
        debug!("Setting RPATH of {} to {}", binary.display(), joined);

        let output = match Command::new(&self.path)
            .arg("--force-rpath")
            .arg("--set-rpath")
            .arg(&joined)
            .arg(binary)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {}: {}", self.path.display(), e);
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                "Failed to set RPATH of {} to {}: {}",
                binary.display(),
                joined,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rpaths() {
        assert!(parse_rpaths("").is_empty());
        assert!(parse_rpaths("\n").is_empty());
        assert_eq!(
            parse_rpaths("/opt/foo/lib:/opt/foo/lib64\n"),
            vec!["/opt/foo/lib", "/opt/foo/lib64"]
        );
        assert_eq!(parse_rpaths("$ORIGIN/../lib:"), vec!["$ORIGIN/../lib"]);
    }

    #[test]
    fn test_join_rpaths() {
        let rpaths = vec!["/usr/lib".to_string(), "$ORIGIN/lib".to_string()];
        assert_eq!(join_rpaths(&rpaths), "/usr/lib:$ORIGIN/lib");
        assert_eq!(join_rpaths(&[]), "");
    }

    #[test]
    fn test_missing_executable() {
        let patchelf = Patchelf::new("/nonexistent/bin/patchelf");
        let binary = Path::new("/bin/sh");
        assert!(patchelf.read_rpaths(binary).is_empty());
        assert!(patchelf
            .write_rpaths(binary, &["/usr/lib".to_string()])
            .is_none());
    }
}
