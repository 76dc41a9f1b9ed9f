//! Locating (and if needed installing) the RPATH editor executable

mod locator;
mod types;

pub use locator::DependencyInstaller;
pub use locator::ToolCache;
pub use locator::ToolLocator;
pub use types::Provenance;
pub use types::ToolHandle;
