//! Types describing the format of an inspected file

/// Format of a file as detected from its header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    /// ELF file; `dynamic` is set when it carries a dynamic section
    Elf { dynamic: bool },
    /// Mach-O file (thin or fat); detected but not editable
    MachO,
    /// Anything else, including files too short to carry a header
    Other,
}

impl BinaryFormat {
    /// Whether files of this format are binaries subject to relocation
    pub fn is_binary(&self) -> bool {
        matches!(self, BinaryFormat::Elf { dynamic: true } | BinaryFormat::MachO)
    }
}
