//! Binary format detection using elb
//!
//! Only the first bytes of a file are needed to tell ELF from Mach-O. For ELF
//! files the `elb` crate parses the program headers so that statically linked
//! executables (no dynamic section, hence no RPATH) are not reported as binaries.

use std::fs::File;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

use elb::Elf;
use tracing::debug;

use crate::error::RelocateError;

use super::types::BinaryFormat;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Mach-O thin (32/64-bit, both byte orders) and fat magics
const MACHO_MAGICS: [[u8; 4]; 6] = [
    [0xfe, 0xed, 0xfa, 0xce],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
    [0xbe, 0xba, 0xfe, 0xca],
];

/// Page size assumed by elb when parsing program headers
const PAGE_SIZE: u64 = 4096;

/// Detect the format of the file at `path`.
///
/// Fails only when the file cannot be opened or read; any readable file
/// yields a [`BinaryFormat`].
pub fn sniff_format(path: &Path) -> Result<BinaryFormat, RelocateError> {
    let unreadable = |source| RelocateError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(unreadable)?;

    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        let n = file.read(&mut magic[filled..]).map_err(unreadable)?;
        if n == 0 {
            return Ok(BinaryFormat::Other);
        }
        filled += n;
    }

    if MACHO_MAGICS.contains(&magic) {
        return Ok(BinaryFormat::MachO);
    }
    if magic != ELF_MAGIC {
        return Ok(BinaryFormat::Other);
    }

    file.rewind().map_err(unreadable)?;
    let elf = match Elf::read(&mut file, PAGE_SIZE) {
        Ok(elf) => elf,
        Err(e) => {
            debug!("{} has an ELF magic but does not parse: {}", path.display(), e);
            return Ok(BinaryFormat::Other);
        }
    };

    let dynamic = match elf.read_dynamic_table(&mut file) {
        Ok(table) => table.is_some(),
        Err(e) => {
            debug!("Failed to read dynamic table of {}: {}", path.display(), e);
            false
        }
    };

    Ok(BinaryFormat::Elf { dynamic })
}

/// Whether `path` is a dynamically linked binary this crate understands.
///
/// Returns `false` for missing or unreadable files; use [`sniff_format`] to
/// tell those apart from files that are simply not binaries.
pub fn is_binary(path: &Path) -> bool {
    match sniff_format(path) {
        Ok(format) => format.is_binary(),
        Err(e) => {
            debug!("Treating {} as not a binary: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_test_executable_is_dynamic_elf() {
        let exe = std::env::current_exe().unwrap();
        assert_eq!(
            sniff_format(&exe).unwrap(),
            BinaryFormat::Elf { dynamic: true }
        );
        assert!(is_binary(&exe));
    }

    #[test]
    fn test_text_file_is_not_binary() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "just some text\n").unwrap();

        assert_eq!(sniff_format(&path).unwrap(), BinaryFormat::Other);
        assert!(!is_binary(&path));
    }

    #[test]
    fn test_short_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tiny");
        fs::write(&path, [0x7f, b'E']).unwrap();

        assert_eq!(sniff_format(&path).unwrap(), BinaryFormat::Other);
    }

    #[test]
    fn test_truncated_elf() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.so");
        fs::write(&path, [0x7f, b'E', b'L', b'F', 2, 1, 1]).unwrap();

        assert_eq!(sniff_format(&path).unwrap(), BinaryFormat::Other);
        assert!(!is_binary(&path));
    }

    #[test]
    fn test_macho_magic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("libfoo.dylib");
        let mut data = vec![0xcf, 0xfa, 0xed, 0xfe];
        data.extend_from_slice(&[0u8; 60]);
        fs::write(&path, data).unwrap();

        assert_eq!(sniff_format(&path).unwrap(), BinaryFormat::MachO);
        assert!(is_binary(&path));
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/path/to/binary");
        assert!(!is_binary(path));
        assert!(matches!(
            sniff_format(path),
            Err(RelocateError::Unreadable { .. })
        ));
    }
}
