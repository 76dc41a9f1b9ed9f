//! rpath-relocate: move installed ELF binaries between prefixes
//!
//! Build systems bake absolute library directories into the RPATH of the
//! binaries they link. When an install tree is copied to another prefix those
//! entries have to be rewritten, otherwise the binaries no longer find their
//! shared libraries. This crate reads and writes RPATHs through `patchelf`,
//! maps old install prefixes to new ones, and can keep entries relative to
//! the binary itself via `$ORIGIN`.
//!
//! # Example
//!
//! ```no_run
//! use rpath_relocate::Config;
//! use rpath_relocate::PrefixMap;
//! use rpath_relocate::RelocationRequest;
//! use rpath_relocate::Relocator;
//!
//! let relocator = Relocator::new(Config::default());
//!
//! let mut prefixes = PrefixMap::new();
//! prefixes.insert("/tmp/build-xyz", "/opt/software");
//!
//! let request = RelocationRequest::absolute(
//!     vec!["/opt/software/bin/tool".into()],
//!     "/tmp/build-xyz",
//!     prefixes,
//! );
//! let summary = relocator.relocate(&request).unwrap();
//! assert!(summary.is_complete());
//! ```

pub mod binary;
pub mod config;
pub mod elf;
pub mod error;
pub mod paths;
pub mod relocate;
pub mod rpath;
pub mod tool;

pub use binary::Binary;
pub use config::Config;
pub use elf::BinaryFormat;
pub use elf::embedded_strings;
pub use elf::is_binary;
pub use elf::replace_prefix_bytes;
pub use elf::sniff_format;
pub use error::RelocateError;
pub use error::ToolError;
pub use paths::normalize;
pub use paths::to_absolute;
pub use paths::to_relative;
pub use relocate::PrefixMap;
pub use relocate::RelocationRequest;
pub use relocate::RelocationSummary;
pub use relocate::Relocator;
pub use relocate::relocated_rpaths;
pub use rpath::Patchelf;
pub use rpath::RpathEditor;
pub use tool::DependencyInstaller;
pub use tool::Provenance;
pub use tool::ToolCache;
pub use tool::ToolHandle;
pub use tool::ToolLocator;
