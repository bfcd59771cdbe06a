use crate::dynamic::{read_ldso_paths, SearchPaths};
use crate::error::Result;
use crate::layout::ElfHeader;
use crate::segments::{find_program_header, list_program_headers, ProgramHeader, SegmentKind};
use std::fs::File;
use std::path::Path;

/// An ELF file opened for introspection: the descriptor plus its validated
/// header.
///
/// The descriptor belongs to whoever opened the image and is closed when
/// the image is dropped. The locator and scanner only borrow it, moving its
/// file position around freely; nothing here is safe to share across
/// threads on one descriptor.
#[derive(Debug)]
pub struct ElfImage {
    file: File,
    header: ElfHeader,
}

impl ElfImage {
    /// Open `path` read-only and validate its ELF header.
    ///
    /// Open failures surface as I/O errors with the OS code preserved; a
    /// short header, bad magic, or unknown class is a malformed-image
    /// error. The descriptor never outlives a failed open.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ElfImage> {
        let mut file = File::open(path)?;
        let header = ElfHeader::from_reader(&mut file)?;
        Ok(ElfImage { file, header })
    }

    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// First program header of `kind`, optionally containing `address`.
    pub fn find_segment(
        &mut self,
        kind: SegmentKind,
        address: Option<u64>,
    ) -> Result<Option<ProgramHeader>> {
        find_program_header(&mut self.file, &self.header, kind, address)
    }

    /// Every entry of the program header table.
    pub fn segments(&mut self) -> Result<Vec<ProgramHeader>> {
        list_program_headers(&mut self.file, &self.header)
    }

    /// RPATH/RUNPATH lists from the dynamic section.
    pub fn search_paths(&mut self) -> Result<SearchPaths> {
        read_ldso_paths(&mut self.file, &self.header)
    }
}
