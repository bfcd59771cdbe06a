use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ElfError>;

/// Errors raised while introspecting an ELF image.
///
/// "Not found" outcomes (no matching program header, no dynamic segment, no
/// string table) are not errors; those surface as `Ok(None)` or empty path
/// lists.
#[derive(Debug, Error)]
pub enum ElfError {
    /// The operating system failed an open, seek or read call.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a well-formed ELF image.
    #[error("malformed ELF image: {0}")]
    BadImage(&'static str),

    /// The image may be valid but uses a capability this layer does not
    /// handle, e.g. an oversized program header table.
    #[error("unsupported ELF image: {0}")]
    NotSupported(&'static str),

    /// Growing a search-path buffer failed.
    #[error("out of memory while collecting search paths")]
    OutOfMemory,
}

impl ElfError {
    /// The POSIX errno equivalent, for callers that speak negative error
    /// codes.
    pub fn errno(&self) -> i32 {
        match self {
            ElfError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            ElfError::BadImage(_) => libc::ENOEXEC,
            ElfError::NotSupported(_) => libc::ENOTSUP,
            ElfError::OutOfMemory => libc::ENOMEM,
        }
    }
}
