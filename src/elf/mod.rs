//! ELF file inspection: format detection and embedded string handling

mod classify;
mod strings;
mod types;

pub use classify::is_binary;
pub use classify::sniff_format;
pub use strings::embedded_strings;
pub use strings::replace_prefix_bytes;
pub use types::BinaryFormat;
