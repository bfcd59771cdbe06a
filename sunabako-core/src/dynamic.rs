use crate::error::{ElfError, Result};
use crate::layout::{ElfClass, ElfHeader, DT_RPATH, DT_RUNPATH, DT_STRTAB};
use crate::paths::PathList;
use crate::segments::{find_program_header, SegmentKind};
use byteorder::{ReadBytesExt, LE};
use std::io::{Read, Seek, SeekFrom};

/// One dynamic-section entry, widened to 64-bit fields.
///
/// `val` is a virtual address or a string-table offset depending on `tag`.
#[derive(Debug, Clone, Copy)]
pub struct DynamicEntry {
    pub tag: i64,
    pub val: u64,
}

impl DynamicEntry {
    fn read<R: Read>(r: &mut R, class: ElfClass) -> Result<DynamicEntry> {
        Ok(match class {
            ElfClass::Elf32 => DynamicEntry {
                tag: r.read_i32::<LE>()? as i64,
                val: r.read_u32::<LE>()? as u64,
            },
            ElfClass::Elf64 => DynamicEntry {
                tag: r.read_i64::<LE>()?,
                val: r.read_u64::<LE>()?,
            },
        })
    }
}

/// Geometry of a dynamic segment's entry table.
#[derive(Debug, Clone, Copy)]
struct DynamicTable {
    offset: u64,
    count: u64,
    class: ElfClass,
}

impl DynamicTable {
    /// Start a fresh pass over the table, yielding entries tagged `tag`.
    fn scan(&self, tag: i64) -> TagScan {
        TagScan {
            table: *self,
            tag,
            index: 0,
        }
    }
}

/// A restartable scan for one dynamic tag.
///
/// Each step re-seeks to the entry it is about to read, so callers are free
/// to reposition the descriptor between steps; the path extractor does.
struct TagScan {
    table: DynamicTable,
    tag: i64,
    index: u64,
}

impl TagScan {
    fn next<R: Read + Seek>(&mut self, r: &mut R) -> Result<Option<DynamicEntry>> {
        let entry_size = self.table.class.dyn_entry_size();
        while self.index < self.table.count {
            let pos = self
                .table
                .offset
                .checked_add(self.index * entry_size)
                .ok_or(ElfError::BadImage("dynamic entry offset overflow"))?;
            self.index += 1;

            r.seek(SeekFrom::Start(pos))?;
            let entry = DynamicEntry::read(r, self.table.class)?;
            if entry.tag == self.tag {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

/// RPATH and RUNPATH lists extracted from a binary's dynamic section.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    pub rpaths: PathList,
    pub runpaths: PathList,
}

/// Extract every RPATH and RUNPATH list from the image's dynamic section.
///
/// An image with no dynamic segment, or a dynamic section without a string
/// table, yields two empty lists; neither is an error. A dynamic segment
/// whose size is not a multiple of the entry size, a string table that no
/// loadable segment maps, and path offsets that would wrap are all
/// malformed-image errors.
pub fn read_ldso_paths<R: Read + Seek>(r: &mut R, header: &ElfHeader) -> Result<SearchPaths> {
    let mut paths = SearchPaths::default();

    let dynamic = match find_program_header(r, header, SegmentKind::Dynamic, None)? {
        Some(segment) => segment,
        None => return Ok(paths),
    };

    let entry_size = header.class.dyn_entry_size();
    if dynamic.filesz % entry_size != 0 {
        return Err(ElfError::BadImage(
            "dynamic segment size is not a multiple of its entry size",
        ));
    }
    let table = DynamicTable {
        offset: dynamic.offset,
        count: dynamic.filesz / entry_size,
        class: header.class,
    };

    // The ELF specification does not say whether several string tables may
    // be referenced; the first one wins.
    let strtab_address = match table.scan(DT_STRTAB).next(r)? {
        Some(entry) => entry.val,
        None => return Ok(paths),
    };

    let strtab_offset = resolve_strtab(r, header, strtab_address)?;

    append_tagged(r, &table, DT_RPATH, strtab_offset, &mut paths.rpaths)?;
    append_tagged(r, &table, DT_RUNPATH, strtab_offset, &mut paths.runpaths)?;

    Ok(paths)
}

/// Translate the string table's virtual address into a file offset through
/// the loadable segment that maps it.
fn resolve_strtab<R: Read + Seek>(r: &mut R, header: &ElfHeader, address: u64) -> Result<u64> {
    let segment = find_program_header(r, header, SegmentKind::Load, Some(address))?.ok_or(
        ElfError::BadImage("string table is not mapped by any loadable segment"),
    )?;
    segment
        .offset
        .checked_add(address - segment.vaddr)
        .ok_or(ElfError::BadImage("string table offset overflow"))
}

fn append_tagged<R: Read + Seek>(
    r: &mut R,
    table: &DynamicTable,
    tag: i64,
    strtab_offset: u64,
    list: &mut PathList,
) -> Result<()> {
    let mut scan = table.scan(tag);
    while let Some(entry) = scan.next(r)? {
        let offset = strtab_offset
            .checked_add(entry.val)
            .ok_or(ElfError::BadImage("search path offset overflow"))?;
        list.append_from(r, offset)?;
    }
    Ok(())
}
