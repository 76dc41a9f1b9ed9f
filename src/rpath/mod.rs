//! Reading and writing the RPATH of ELF binaries through an external editor

mod editor;

pub use editor::Patchelf;
pub use editor::RpathEditor;
pub use editor::join_rpaths;
pub use editor::parse_rpaths;
