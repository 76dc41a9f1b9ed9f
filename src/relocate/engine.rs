//! Relocation engine
//!
//! For every binary of a request the existing RPATH is read, rewritten for
//! the new prefixes, and written back. Argument and tool-resolution problems
//! abort the call before any binary is touched; a failed write only marks
//! that binary as failed in the returned [`RelocationSummary`].

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::binary::Binary;
use crate::config::Config;
use crate::elf::BinaryFormat;
use crate::elf::embedded_strings;
use crate::elf::sniff_format;
use crate::error::RelocateError;
use crate::paths::normalize;
use crate::paths::to_absolute;
use crate::paths::to_relative;
use crate::rpath::Patchelf;
use crate::rpath::RpathEditor;
use crate::rpath::join_rpaths;
use crate::tool::DependencyInstaller;
use crate::tool::ToolCache;
use crate::tool::ToolHandle;
use crate::tool::ToolLocator;

use super::types::PrefixMap;
use super::types::RelocationRequest;
use super::types::RelocationSummary;

/// Compute the RPATH `binary` should carry after relocation.
///
/// In relative mode `$ORIGIN` entries are first expanded against the
/// binary's original location, substituted, and then made relative to its
/// new location under `new_root`. Entries no pair applies to are kept.
pub fn relocated_rpaths(
    request: &RelocationRequest,
    binary: &Path,
    rpaths: &[String],
) -> Result<Vec<String>, RelocateError> {
    if !request.rel {
        return Ok(request.new_prefixes.apply(rpaths));
    }

    let new_root = request.new_root.as_ref().ok_or_else(|| {
        RelocateError::InvalidRequest("relative relocation requires a new root".to_string())
    })?;
    let original = request.original_location(binary);
    let absolute = to_absolute(&original, rpaths);
    let substituted = request.new_prefixes.apply(&absolute);
    Ok(to_relative(binary, new_root, &substituted))
}

/// Entry point for relocating binaries
///
/// Owns the configuration and the patch tool locator. The located tool is
/// cached in a [`ToolCache`] that can be shared between relocators or reset.
#[derive(Debug, Clone)]
pub struct Relocator {
    config: Config,
    locator: ToolLocator,
}

impl Relocator {
    pub fn new(config: Config) -> Self {
        let locator = ToolLocator::new(&config);
        Self { config, locator }
    }

    /// Install the patch tool through `installer` when it is not on the search path
    pub fn with_installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
        self.locator = self.locator.with_installer(installer);
        self
    }

    /// Use `cache` for the located patch tool
    pub fn with_cache(mut self, cache: Arc<ToolCache>) -> Self {
        self.locator = self.locator.with_cache(cache);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tool_cache(&self) -> &Arc<ToolCache> {
        self.locator.cache()
    }

    /// Find the patch tool, installing it if necessary
    pub fn locate_patch_tool(&self) -> Result<ToolHandle, RelocateError> {
        Ok(self.locator.locate()?)
    }

    fn patchelf(&self) -> Result<Patchelf, RelocateError> {
        let handle = self.locate_patch_tool()?;
        Ok(Patchelf::new(handle.path))
    }

    /// RPATH entries of `binary`; empty if it has none or the tool fails
    pub fn read_rpaths(&self, binary: &Binary) -> Result<Vec<String>, RelocateError> {
        Ok(self.patchelf()?.read_rpaths(binary.path()))
    }

    /// Set the RPATH of `binary`, returning the tool output or `None` on failure
    pub fn write_rpaths(
        &self,
        binary: &Binary,
        rpaths: &[String],
    ) -> Result<Option<String>, RelocateError> {
        Ok(self.patchelf()?.write_rpaths(binary.path(), rpaths))
    }

    /// Whether the binary at `path` can be moved without relocation.
    ///
    /// `path` must exist and be absolute (checked in that order). Files that
    /// are not dynamically linked binaries are reported as not relocatable.
    /// A binary is relocatable unless an absolute RPATH entry lies under a
    /// configured relocation root or one of its other strings mentions such a
    /// root. System directories like `/usr/lib64` in the RPATH are accepted.
    pub fn file_is_relocatable(&self, path: &Path) -> Result<bool, RelocateError> {
        if !cfg!(any(target_os = "linux", target_os = "macos")) {
            return Err(RelocateError::Unsupported(
                "relocatability checks are only implemented for Linux and macOS".to_string(),
            ));
        }

        let binary = Binary::new(path)?;
        match sniff_format(binary.path())? {
            BinaryFormat::MachO => {
                return Err(RelocateError::Unsupported(format!(
                    "RPATH inspection of Mach-O binaries ({})",
                    binary.path().display()
                )));
            }
            format if !format.is_binary() => return Ok(false),
            _ => {}
        }

        if self.config.relocation_roots.is_empty() {
            return Ok(true);
        }

        let rpaths = self.read_rpaths(&binary)?;
        if let Some(entry) = rpaths.iter().find(|entry| self.under_relocation_root(entry)) {
            debug!("{} has RPATH entry {} under a relocation root", path.display(), entry);
            return Ok(false);
        }

        let joined = join_rpaths(&rpaths);
        let strings = embedded_strings(binary.path())?;
        for root in &self.config.relocation_roots {
            let root = root.to_string_lossy();
            if let Some(hit) = strings
                .iter()
                .filter(|s| **s != joined)
                .find(|s| s.contains(&*root))
            {
                debug!("{} embeds {}", path.display(), hit);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether `entry` is an absolute path under one of the relocation roots
    fn under_relocation_root(&self, entry: &str) -> bool {
        let entry = Path::new(entry);
        entry.is_absolute()
            && self
                .config
                .relocation_roots
                .iter()
                .any(|root| normalize(entry).starts_with(normalize(root)))
    }

    /// Relocate every binary of `request` with the located patch tool
    pub fn relocate(&self, request: &RelocationRequest) -> Result<RelocationSummary, RelocateError> {
        let targets = self.validate(request)?;
        if targets.iter().all(|(_, relocate)| !relocate) {
            let skipped = targets
                .into_iter()
                .map(|(binary, _)| binary.path().to_path_buf())
                .collect();
            return Ok(RelocationSummary {
                skipped,
                ..RelocationSummary::default()
            });
        }
        let editor = self.patchelf()?;
        self.relocate_validated(&editor, request, targets)
    }

    /// Relocate every binary of `request` with a caller-supplied editor
    pub fn relocate_with(
        &self,
        editor: &dyn RpathEditor,
        request: &RelocationRequest,
    ) -> Result<RelocationSummary, RelocateError> {
        let targets = self.validate(request)?;
        self.relocate_validated(editor, request, targets)
    }

    /// Rewrite a single old prefix to a new one in the absolute RPATH of `binary`
    pub fn replace_prefix_in_binary_text(
        &self,
        binary: &Path,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<RelocationSummary, RelocateError> {
        let mut prefixes = PrefixMap::new();
        prefixes.insert(old_prefix, new_prefix);
        let request = RelocationRequest::absolute(vec![binary.to_path_buf()], old_prefix, prefixes);
        self.relocate(&request)
    }

    /// Check every binary before touching any of them, pairing each with
    /// whether it needs relocation
    fn validate(&self, request: &RelocationRequest) -> Result<Vec<(Binary, bool)>, RelocateError> {
        if request.rel && request.new_root.is_none() {
            return Err(RelocateError::InvalidRequest(
                "relative relocation requires a new root".to_string(),
            ));
        }

        let mut targets = Vec::with_capacity(request.binaries.len());
        for path in &request.binaries {
            let binary = Binary::new(path)?;
            let relocate = match sniff_format(binary.path())? {
                BinaryFormat::MachO => {
                    return Err(RelocateError::Unsupported(format!(
                        "RPATH relocation of Mach-O binaries ({})",
                        binary.path().display()
                    )));
                }
                format => format.is_binary(),
            };
            targets.push((binary, relocate));
        }
        Ok(targets)
    }

    fn relocate_validated(
        &self,
        editor: &dyn RpathEditor,
        request: &RelocationRequest,
        targets: Vec<(Binary, bool)>,
    ) -> Result<RelocationSummary, RelocateError> {
        let mut summary = RelocationSummary::default();
        for (binary, relocate) in targets {
            let path = binary.path();
            if !relocate {
                debug!("Skipping {}: not a dynamic binary", path.display());
                summary.skipped.push(path.to_path_buf());
                continue;
            }

            let current = editor.read_rpaths(path);
            let rpaths = relocated_rpaths(request, path, &current)?;
            debug!(
                "Relocating {}: {} -> {}",
                path.display(),
                join_rpaths(&current),
                join_rpaths(&rpaths)
            );
            match editor.write_rpaths(path, &rpaths) {
                Some(_) => summary.updated.push(path.to_path_buf()),
                None => summary.failed.push(path.to_path_buf()),
            }
        }

        info!(
            "Relocated {} binaries ({} failed, {} skipped)",
            summary.updated.len(),
            summary.failed.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }
}
