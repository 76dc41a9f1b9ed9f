//! Types describing a resolved tool

use std::path::Path;
use std::path::PathBuf;

/// Where a resolved tool came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Found on the executable search path
    SearchPath,
    /// Provided by an already installed dependency
    Installed,
    /// Installed on demand during resolution
    FreshlyInstalled,
}

/// Absolute path to a tool executable and how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolHandle {
    pub path: PathBuf,
    pub provenance: Provenance,
}

impl ToolHandle {
    pub fn new(path: impl Into<PathBuf>, provenance: Provenance) -> Self {
        Self {
            path: path.into(),
            provenance,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
