use crate::error::{ElfError, Result};
use byteorder::{ReadBytesExt, LE};
use std::io::{self, Cursor, Read};

/// First four bytes of every ELF image: `0x7F 'E' 'L' 'F'`.
///
/// Reference: [ELF Specification v1.2](https://refspecs.linuxfoundation.org/elf/elf.pdf)
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Index of the class byte inside `e_ident`.
pub const EI_CLASS: usize = 4;

/// `e_ident[EI_CLASS]` marker for a 32-bit image.
pub const ELFCLASS32: u8 = 1;
/// `e_ident[EI_CLASS]` marker for a 64-bit image.
pub const ELFCLASS64: u8 = 2;

/// Program header type: loadable segment, mapped at process start.
pub const PT_LOAD: u32 = 1;
/// Program header type: dynamic-linker metadata segment.
pub const PT_DYNAMIC: u32 = 2;

/// Dynamic entry tag: virtual address of the string table.
pub const DT_STRTAB: i64 = 5;
/// Dynamic entry tag: string-table offset of an RPATH list.
pub const DT_RPATH: i64 = 15;
/// Dynamic entry tag: string-table offset of a RUNPATH list.
pub const DT_RUNPATH: i64 = 29;

/// Word size of an ELF image, fixed once at parse time.
///
/// Every dual-width structure (header, program header, dynamic entry) is
/// decoded through this tag, so the 32-/64-bit layout difference lives in a
/// single closed set of variants instead of being repeated per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    /// Map `e_ident[EI_CLASS]` to a class; anything else is a malformed
    /// image.
    pub(crate) fn from_ident(byte: u8) -> Result<ElfClass> {
        match byte {
            ELFCLASS32 => Ok(ElfClass::Elf32),
            ELFCLASS64 => Ok(ElfClass::Elf64),
            _ => Err(ElfError::BadImage("unknown ELF class")),
        }
    }

    pub fn is_32(self) -> bool {
        self == ElfClass::Elf32
    }

    pub fn is_64(self) -> bool {
        self == ElfClass::Elf64
    }

    /// Byte size of the full ELF header for this class.
    pub fn header_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 52,
            ElfClass::Elf64 => 64,
        }
    }

    /// Byte size of one program header table entry for this class.
    pub fn program_header_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 56,
        }
    }

    /// Whether `phentsize` is the (only) recognized program header entry
    /// size for this class. Irregular tables are rejected as unsupported,
    /// not silently truncated.
    pub fn known_phentsize(self, phentsize: u16) -> bool {
        phentsize as usize == self.program_header_size()
    }

    /// Byte size of one dynamic-section entry for this class.
    pub fn dyn_entry_size(self) -> u64 {
        match self {
            ElfClass::Elf32 => 8,
            ElfClass::Elf64 => 16,
        }
    }
}

/// The ELF header fields this layer consumes, widened to their 64-bit
/// representation.
///
/// Decoded once by [`ElfHeader::from_reader`]; nothing in the header is
/// trusted beyond the magic and the class byte, so the program header
/// geometry is re-validated wherever it is used.
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    /// 32- or 64-bit layout, driving every later decode.
    pub class: ElfClass,
    /// Target architecture (`e_machine`), e.g. 62 for x86-64.
    pub machine: u16,
    /// File offset of the program header table.
    pub phoff: u64,
    /// Size of one program header table entry.
    pub phentsize: u16,
    /// Number of program header table entries.
    pub phnum: u16,
}

impl ElfHeader {
    /// Decode an ELF header from the current position of `r`.
    ///
    /// Fails with a malformed-image error on a short read, a bad magic
    /// sequence, or a class byte that denotes neither 32- nor 64-bit.
    pub fn from_reader<R: Read>(r: &mut R) -> Result<ElfHeader> {
        let mut ident = [0u8; 16];
        if read_full(r, &mut ident)? < ident.len() {
            return Err(ElfError::BadImage("truncated ELF header"));
        }
        if ident[..4] != ELF_MAGIC {
            return Err(ElfError::BadImage("not an ELF image"));
        }
        let class = ElfClass::from_ident(ident[EI_CLASS])?;

        // Insist on the whole class-sized header being present, even
        // though only a few fields are kept.
        let mut rest = vec![0u8; class.header_size() - ident.len()];
        if read_full(r, &mut rest)? < rest.len() {
            return Err(ElfError::BadImage("truncated ELF header"));
        }

        let mut cur = Cursor::new(rest);
        let _e_type = cur.read_u16::<LE>()?;
        let machine = cur.read_u16::<LE>()?;
        let _version = cur.read_u32::<LE>()?;
        let phoff = match class {
            ElfClass::Elf32 => {
                let _entry = cur.read_u32::<LE>()?;
                let phoff = cur.read_u32::<LE>()? as u64;
                let _shoff = cur.read_u32::<LE>()?;
                phoff
            }
            ElfClass::Elf64 => {
                let _entry = cur.read_u64::<LE>()?;
                let phoff = cur.read_u64::<LE>()?;
                let _shoff = cur.read_u64::<LE>()?;
                phoff
            }
        };
        let _flags = cur.read_u32::<LE>()?;
        let _ehsize = cur.read_u16::<LE>()?;
        let phentsize = cur.read_u16::<LE>()?;
        let phnum = cur.read_u16::<LE>()?;

        Ok(ElfHeader {
            class,
            machine,
            phoff,
            phentsize,
            phnum,
        })
    }
}

/// Read until `buf` is full or end-of-file; returns the byte count.
pub(crate) fn read_full<R: Read>(r: &mut R, mut buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while !buf.is_empty() {
        match r.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                buf = &mut buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
