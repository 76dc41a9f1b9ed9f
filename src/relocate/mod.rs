//! Batch relocation of binaries between install prefixes

mod engine;
mod types;

pub use engine::Relocator;
pub use engine::relocated_rpaths;
pub use types::PrefixMap;
pub use types::RelocationRequest;
pub use types::RelocationSummary;
