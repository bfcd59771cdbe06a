use crate::error::{ElfError, Result};
use crate::layout::read_full;
use std::io::{Read, Seek, SeekFrom};

/// Reads are chunked; the buffer grows one chunk at a time.
const CHUNK: usize = 1024;

/// A `:`-joined accumulator of dynamic-linker search paths.
///
/// Appended to once per matching dynamic entry and never truncated, so
/// duplicate RPATH/RUNPATH entries all survive in encounter order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathList(Option<String>);

impl PathList {
    pub fn new() -> Self {
        PathList(None)
    }

    /// `None` until the first list has been appended.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn into_inner(self) -> Option<String> {
        self.0
    }

    /// Append the NUL-terminated path list found at `offset` in `r`.
    ///
    /// An empty accumulator takes the text wholesale; otherwise a `:` is
    /// appended first.
    pub fn append_from<R: Read + Seek>(&mut self, r: &mut R, offset: u64) -> Result<()> {
        let text = read_path_list(r, offset)?;
        match &mut self.0 {
            None => self.0 = Some(text),
            Some(joined) => {
                joined
                    .try_reserve(text.len() + 1)
                    .map_err(|_| ElfError::OutOfMemory)?;
                joined.push(':');
                joined.push_str(&text);
            }
        }
        Ok(())
    }
}

/// Read the NUL-terminated text starting at `offset`.
///
/// The logical text is the longest NUL-free prefix of what has been read so
/// far; the loop keeps growing only while that prefix fills the entire
/// buffer. A terminator inside a chunk and a short read at end-of-file both
/// stop the growth; a terminator landing exactly on a chunk boundary is
/// caught by the following zero-length read. Text cut off by end-of-file
/// with no terminator is accepted as-is.
fn read_path_list<R: Read + Seek>(r: &mut R, offset: u64) -> Result<String> {
    r.seek(SeekFrom::Start(offset))?;

    let mut buf: Vec<u8> = Vec::new();
    let mut length = 0usize;
    loop {
        let size = length + CHUNK;
        buf.try_reserve_exact(size - buf.len())
            .map_err(|_| ElfError::OutOfMemory)?;
        buf.resize(size, 0);

        let got = read_full(r, &mut buf[length..size])?;
        length += nul_free_prefix(&buf[length..length + got]);
        if length < size {
            break;
        }
    }

    match std::str::from_utf8(&buf[..length]) {
        Ok(text) => Ok(text.to_owned()),
        Err(_) => Err(ElfError::BadImage("search path list is not valid UTF-8")),
    }
}

fn nul_free_prefix(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len())
}
