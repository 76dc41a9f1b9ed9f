//! Validated binary paths

use std::path::Path;
use std::path::PathBuf;

use crate::error::RelocateError;

/// Absolute path to an existing file whose RPATHs may be read or rewritten
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    path: PathBuf,
}

impl Binary {
    /// Validate `path`: it must exist, and it must be absolute.
    ///
    /// Existence is checked first, so a missing relative path reports
    /// [`RelocateError::DoesNotExist`].
    pub fn new(path: impl AsRef<Path>) -> Result<Self, RelocateError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RelocateError::DoesNotExist(path.to_path_buf()));
        }
        if !path.is_absolute() {
            return Err(RelocateError::NotAbsolute(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for Binary {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
