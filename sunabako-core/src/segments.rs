use crate::error::{ElfError, Result};
use crate::layout::{read_full, ElfClass, ElfHeader, PT_DYNAMIC, PT_LOAD};
use byteorder::{ReadBytesExt, LE};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Program header kinds the engine looks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// `PT_LOAD`: mapped into memory at process start.
    Load,
    /// `PT_DYNAMIC`: dynamic-linker metadata.
    Dynamic,
}

impl SegmentKind {
    fn p_type(self) -> u32 {
        match self {
            SegmentKind::Load => PT_LOAD,
            SegmentKind::Dynamic => PT_DYNAMIC,
        }
    }
}

/// One decoded program header, widened to 64-bit fields.
#[derive(Debug, Clone, Copy)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

impl ProgramHeader {
    /// Decode one table entry of exactly `phentsize` bytes.
    ///
    /// The 32- and 64-bit layouts order their fields differently; both are
    /// handled here, dispatched on the class tag.
    fn read<R: Read>(r: &mut R, class: ElfClass, phentsize: u16) -> Result<ProgramHeader> {
        let mut raw = vec![0u8; phentsize as usize];
        if read_full(r, &mut raw)? < raw.len() {
            return Err(ElfError::NotSupported("truncated program header table"));
        }

        let mut cur = Cursor::new(raw);
        Ok(match class {
            ElfClass::Elf32 => {
                let p_type = cur.read_u32::<LE>()?;
                let offset = cur.read_u32::<LE>()? as u64;
                let vaddr = cur.read_u32::<LE>()? as u64;
                let _paddr = cur.read_u32::<LE>()?;
                let filesz = cur.read_u32::<LE>()? as u64;
                let memsz = cur.read_u32::<LE>()? as u64;
                ProgramHeader {
                    p_type,
                    offset,
                    vaddr,
                    filesz,
                    memsz,
                }
            }
            ElfClass::Elf64 => {
                let p_type = cur.read_u32::<LE>()?;
                let _flags = cur.read_u32::<LE>()?;
                let offset = cur.read_u64::<LE>()?;
                let vaddr = cur.read_u64::<LE>()?;
                let _paddr = cur.read_u64::<LE>()?;
                let filesz = cur.read_u64::<LE>()?;
                let memsz = cur.read_u64::<LE>()?;
                ProgramHeader {
                    p_type,
                    offset,
                    vaddr,
                    filesz,
                    memsz,
                }
            }
        })
    }

    /// Whether this segment's memory range contains `address`.
    ///
    /// Both endpoints are inclusive. Empty segments and ranges that would
    /// wrap around the address space never match.
    pub fn contains(&self, address: u64) -> bool {
        match self.vaddr.checked_add(self.memsz) {
            Some(end) if self.vaddr < end => self.vaddr <= address && address <= end,
            _ => false,
        }
    }
}

/// Find the first program header of `kind`, optionally constrained to one
/// whose memory range contains `address`.
///
/// Returns `Ok(None)` when the table holds no matching entry. Tables with
/// `phnum >= 0xffff` or an unrecognized entry size are rejected as
/// unsupported. The file position is left wherever the scan stopped;
/// callers must seek before their next read.
pub fn find_program_header<R: Read + Seek>(
    r: &mut R,
    header: &ElfHeader,
    kind: SegmentKind,
    address: Option<u64>,
) -> Result<Option<ProgramHeader>> {
    check_table(header)?;

    r.seek(SeekFrom::Start(header.phoff))?;
    for _ in 0..header.phnum {
        let entry = ProgramHeader::read(r, header.class, header.phentsize)?;
        if entry.p_type != kind.p_type() {
            continue;
        }
        match address {
            None => return Ok(Some(entry)),
            Some(a) if entry.contains(a) => return Ok(Some(entry)),
            Some(_) => {}
        }
    }

    Ok(None)
}

/// Decode every entry of the program header table, in table order.
pub fn list_program_headers<R: Read + Seek>(
    r: &mut R,
    header: &ElfHeader,
) -> Result<Vec<ProgramHeader>> {
    check_table(header)?;

    r.seek(SeekFrom::Start(header.phoff))?;
    let mut entries = Vec::with_capacity(header.phnum as usize);
    for _ in 0..header.phnum {
        entries.push(ProgramHeader::read(r, header.class, header.phentsize)?);
    }
    Ok(entries)
}

fn check_table(header: &ElfHeader) -> Result<()> {
    if header.phnum >= 0xffff {
        log::warn!(
            "big program header tables are not supported (phnum = {})",
            header.phnum
        );
        return Err(ElfError::NotSupported("program header table too large"));
    }
    if !header.class.known_phentsize(header.phentsize) {
        log::warn!("unsupported program header entry size {}", header.phentsize);
        return Err(ElfError::NotSupported("unsupported program header size"));
    }
    Ok(())
}
