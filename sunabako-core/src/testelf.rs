//! In-memory ELF fixtures for the unit tests.
//!
//! Images are assembled byte by byte so the tests control every field the
//! parser looks at, including deliberately broken ones.

use byteorder::{WriteBytesExt, LE};

/// Program header geometry used by `image64`/`image32`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub p_type: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

pub(crate) fn seg(p_type: u32, offset: u64, vaddr: u64, filesz: u64, memsz: u64) -> Segment {
    Segment {
        p_type,
        offset,
        vaddr,
        filesz,
        memsz,
    }
}

pub(crate) fn ehdr64(machine: u16, phoff: u64, phentsize: u16, phnum: u16) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    b.extend_from_slice(&[0u8; 8]);
    b.write_u16::<LE>(2).unwrap(); // ET_EXEC
    b.write_u16::<LE>(machine).unwrap();
    b.write_u32::<LE>(1).unwrap();
    b.write_u64::<LE>(0x400000).unwrap(); // e_entry
    b.write_u64::<LE>(phoff).unwrap();
    b.write_u64::<LE>(0).unwrap(); // e_shoff
    b.write_u32::<LE>(0).unwrap();
    b.write_u16::<LE>(64).unwrap(); // e_ehsize
    b.write_u16::<LE>(phentsize).unwrap();
    b.write_u16::<LE>(phnum).unwrap();
    b.write_u16::<LE>(0).unwrap();
    b.write_u16::<LE>(0).unwrap();
    b.write_u16::<LE>(0).unwrap();
    b
}

pub(crate) fn ehdr32(machine: u16, phoff: u32, phentsize: u16, phnum: u16) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
    b.extend_from_slice(&[0u8; 8]);
    b.write_u16::<LE>(2).unwrap(); // ET_EXEC
    b.write_u16::<LE>(machine).unwrap();
    b.write_u32::<LE>(1).unwrap();
    b.write_u32::<LE>(0x8000).unwrap(); // e_entry
    b.write_u32::<LE>(phoff).unwrap();
    b.write_u32::<LE>(0).unwrap(); // e_shoff
    b.write_u32::<LE>(0).unwrap();
    b.write_u16::<LE>(52).unwrap(); // e_ehsize
    b.write_u16::<LE>(phentsize).unwrap();
    b.write_u16::<LE>(phnum).unwrap();
    b.write_u16::<LE>(0).unwrap();
    b.write_u16::<LE>(0).unwrap();
    b.write_u16::<LE>(0).unwrap();
    b
}

fn phdr64(s: Segment) -> Vec<u8> {
    let mut b = Vec::new();
    b.write_u32::<LE>(s.p_type).unwrap();
    b.write_u32::<LE>(0).unwrap(); // p_flags
    b.write_u64::<LE>(s.offset).unwrap();
    b.write_u64::<LE>(s.vaddr).unwrap();
    b.write_u64::<LE>(s.vaddr).unwrap(); // p_paddr
    b.write_u64::<LE>(s.filesz).unwrap();
    b.write_u64::<LE>(s.memsz).unwrap();
    b.write_u64::<LE>(0x1000).unwrap(); // p_align
    b
}

fn phdr32(s: Segment) -> Vec<u8> {
    let mut b = Vec::new();
    b.write_u32::<LE>(s.p_type).unwrap();
    b.write_u32::<LE>(s.offset as u32).unwrap();
    b.write_u32::<LE>(s.vaddr as u32).unwrap();
    b.write_u32::<LE>(s.vaddr as u32).unwrap(); // p_paddr
    b.write_u32::<LE>(s.filesz as u32).unwrap();
    b.write_u32::<LE>(s.memsz as u32).unwrap();
    b.write_u32::<LE>(0).unwrap(); // p_flags
    b.write_u32::<LE>(0x1000).unwrap(); // p_align
    b
}

pub(crate) fn dyn64(tag: i64, val: u64) -> Vec<u8> {
    let mut b = Vec::new();
    b.write_i64::<LE>(tag).unwrap();
    b.write_u64::<LE>(val).unwrap();
    b
}

pub(crate) fn dyn32(tag: i32, val: u32) -> Vec<u8> {
    let mut b = Vec::new();
    b.write_i32::<LE>(tag).unwrap();
    b.write_u32::<LE>(val).unwrap();
    b
}

/// A 64-bit image: header at 0, program header table at 64, plus raw blobs
/// placed at absolute file offsets (zero-filling any gap).
pub(crate) fn image64(machine: u16, segments: &[Segment], blobs: &[(u64, Vec<u8>)]) -> Vec<u8> {
    let mut b = ehdr64(machine, 64, 56, segments.len() as u16);
    for s in segments {
        b.extend_from_slice(&phdr64(*s));
    }
    for (offset, data) in blobs {
        place(&mut b, *offset as usize, data);
    }
    b
}

/// A 32-bit image: header at 0, program header table at 52.
pub(crate) fn image32(machine: u16, segments: &[Segment], blobs: &[(u64, Vec<u8>)]) -> Vec<u8> {
    let mut b = ehdr32(machine, 52, 32, segments.len() as u16);
    for s in segments {
        b.extend_from_slice(&phdr32(*s));
    }
    for (offset, data) in blobs {
        place(&mut b, *offset as usize, data);
    }
    b
}

fn place(buf: &mut Vec<u8>, offset: usize, data: &[u8]) {
    if buf.len() < offset + data.len() {
        buf.resize(offset + data.len(), 0);
    }
    buf[offset..offset + data.len()].copy_from_slice(data);
}
