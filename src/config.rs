//! Relocation configuration

use std::ffi::OsString;
use std::path::PathBuf;

/// Name of the RPATH editor looked up by default
pub const DEFAULT_TOOL_NAME: &str = "patchelf";

/// Settings shared by every operation of a [`crate::Relocator`]
#[derive(Debug, Clone)]
pub struct Config {
    /// Executable name of the RPATH editor
    pub tool_name: String,
    /// Directories searched for the editor, `None` means the process `PATH`
    pub search_path: Option<OsString>,
    /// Install roots that must not appear in the strings of a relocatable binary
    pub relocation_roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            search_path: None,
            relocation_roots: Vec::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the editor under another executable name
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    /// Search these directories instead of `PATH`
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Add an install root checked by `file_is_relocatable`
    pub fn with_relocation_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.relocation_roots.push(root.into());
        self
    }
}
