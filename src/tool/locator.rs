//! Patch tool resolution
//!
//! Resolution walks three probes in order and stops at the first success:
//! the executable search path, an already installed dependency providing the
//! tool, and finally installing that dependency. A failed install is fatal.
//! Successful results are kept in a [`ToolCache`], so the (possibly slow)
//! install runs at most once per cache.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::debug;
use tracing::info;

use crate::config::Config;
use crate::error::ToolError;

use super::types::Provenance;
use super::types::ToolHandle;

/// Access to the package manager for tools missing from the search path
pub trait DependencyInstaller: Send + Sync {
    /// Executable path of `tool` if a dependency providing it is installed
    fn installed_executable(&self, tool: &str) -> Option<PathBuf>;

    /// Build and install the dependency providing `tool`, returning the
    /// path of the executable
    fn install(&self, tool: &str) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>>;
}

/// Process-lifetime memo of a resolved tool
///
/// Only successful resolutions are stored; a failed one is retried on the
/// next call. Concurrent callers wait for an in-flight resolution.
#[derive(Debug, Default)]
pub struct ToolCache {
    slot: Mutex<Option<ToolHandle>>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached handle, if any
    pub fn get(&self) -> Option<ToolHandle> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Forget the cached handle
    pub fn reset(&self) {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn get_or_try_init<F>(&self, init: F) -> Result<ToolHandle, ToolError>
    where
        F: FnOnce() -> Result<ToolHandle, ToolError>,
    {
        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }
        let handle = init()?;
        *slot = Some(handle.clone());
        Ok(handle)
    }
}

/// Resolution states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    SearchPath,
    InstalledDependency,
    Install,
}

/// Finds the RPATH editor named in a [`Config`]
#[derive(Clone)]
pub struct ToolLocator {
    tool_name: String,
    search_path: Option<OsString>,
    installer: Option<Arc<dyn DependencyInstaller>>,
    cache: Arc<ToolCache>,
}

impl std::fmt::Debug for ToolLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolLocator")
            .field("tool_name", &self.tool_name)
            .field("search_path", &self.search_path)
            .field("installer", &self.installer.is_some())
            .field("cache", &self.cache)
            .finish()
    }
}

impl ToolLocator {
    pub fn new(config: &Config) -> Self {
        Self {
            tool_name: config.tool_name.clone(),
            search_path: config.search_path.clone(),
            installer: None,
            cache: Arc::new(ToolCache::new()),
        }
    }

    /// Use `installer` when the tool is not on the search path
    pub fn with_installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Share `cache` with other locators
    pub fn with_cache(mut self, cache: Arc<ToolCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn cache(&self) -> &Arc<ToolCache> {
        &self.cache
    }

    /// Resolve the tool, consulting the cache first
    pub fn locate(&self) -> Result<ToolHandle, ToolError> {
        self.cache.get_or_try_init(|| self.resolve())
    }

    fn resolve(&self) -> Result<ToolHandle, ToolError> {
        let mut probe = Probe::SearchPath;
        loop {
            debug!("Looking for {} ({:?})", self.tool_name, probe);
            probe = match probe {
                Probe::SearchPath => match self.find_on_search_path() {
                    Some(path) => return Ok(ToolHandle::new(path, Provenance::SearchPath)),
                    None => Probe::InstalledDependency,
                },
                Probe::InstalledDependency => {
                    let Some(installer) = &self.installer else {
                        return Err(ToolError::NotFound {
                            tool: self.tool_name.clone(),
                        });
                    };
                    match installer
                        .installed_executable(&self.tool_name)
                        .filter(|path| path.exists())
                    {
                        Some(path) => return Ok(ToolHandle::new(path, Provenance::Installed)),
                        None => Probe::Install,
                    }
                }
                Probe::Install => return self.install(),
            };
        }
    }

    fn find_on_search_path(&self) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
                which::which_in(&self.tool_name, Some(paths), cwd)
            }
            None => which::which(&self.tool_name),
        };
        found.ok()
    }

    fn install(&self) -> Result<ToolHandle, ToolError> {
        let Some(installer) = &self.installer else {
            return Err(ToolError::NotFound {
                tool: self.tool_name.clone(),
            });
        };

        info!("{} not found, installing it", self.tool_name);
        let path = installer
            .install(&self.tool_name)
            .map_err(|e| ToolError::InstallFailed {
                tool: self.tool_name.clone(),
                reason: e.to_string(),
            })?;

        if !path.exists() {
            return Err(ToolError::MissingAfterInstall {
                tool: self.tool_name.clone(),
                path,
            });
        }
        info!("Installed {} at {}", self.tool_name, path.display());
        Ok(ToolHandle::new(path, Provenance::FreshlyInstalled))
    }
}
