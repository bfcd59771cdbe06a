use crate::image::ElfImage;
use std::path::Path;
use std::sync::OnceLock;

pub const EM_386: u16 = 3;
pub const EM_ARM: u16 = 40;
pub const EM_X86_64: u16 = 62;
pub const EM_AARCH64: u16 = 183;
pub const EM_RISCV: u16 = 243;

/// `e_machine` values this build can execute without an emulator.
#[cfg(target_arch = "x86_64")]
pub const HOST_ELF_MACHINES: &[u16] = &[EM_X86_64, EM_386];
#[cfg(target_arch = "x86")]
pub const HOST_ELF_MACHINES: &[u16] = &[EM_386];
#[cfg(target_arch = "aarch64")]
pub const HOST_ELF_MACHINES: &[u16] = &[EM_AARCH64, EM_ARM];
#[cfg(target_arch = "arm")]
pub const HOST_ELF_MACHINES: &[u16] = &[EM_ARM];
#[cfg(any(target_arch = "riscv64", target_arch = "riscv32"))]
pub const HOST_ELF_MACHINES: &[u16] = &[EM_RISCV];
#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "x86",
    target_arch = "aarch64",
    target_arch = "arm",
    target_arch = "riscv64",
    target_arch = "riscv32"
)))]
pub const HOST_ELF_MACHINES: &[u16] = &[];

/// Set this environment variable to force every binary down the emulated
/// path, whatever its machine type. Checked once per process.
pub const FORCE_FOREIGN_ENV: &str = "SUNABAKO_FORCE_FOREIGN_BINARY";

static FORCE_FOREIGN: OnceLock<bool> = OnceLock::new();

fn force_foreign() -> bool {
    *FORCE_FOREIGN.get_or_init(|| std::env::var_os(FORCE_FOREIGN_ENV).is_some())
}

/// Whether `host_path` is an ELF binary the host can execute natively.
///
/// Returns `false` unconditionally when emulation is inactive for this
/// session or the force-foreign toggle is set. A file that cannot be read
/// as ELF is conservatively not a host binary; this never fails.
pub fn is_host_elf<P: AsRef<Path>>(emulation_active: bool, host_path: P) -> bool {
    classify(force_foreign(), emulation_active, host_path)
}

fn classify<P: AsRef<Path>>(force_foreign: bool, emulation_active: bool, host_path: P) -> bool {
    if force_foreign || !emulation_active {
        return false;
    }

    // The descriptor is only held long enough to read the header.
    let machine = match ElfImage::open(&host_path) {
        Ok(image) => image.header().machine,
        Err(_) => return false,
    };

    if HOST_ELF_MACHINES.contains(&machine) {
        log::debug!("'{}' is a host ELF", host_path.as_ref().display());
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testelf;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn host_machine_fixture() -> Option<NamedTempFile> {
        let machine = *HOST_ELF_MACHINES.first()?;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&testelf::ehdr64(machine, 0x40, 56, 0)).unwrap();
        file.flush().unwrap();
        Some(file)
    }

    #[test]
    fn force_foreign_wins_over_a_genuine_host_binary() {
        let Some(fixture) = host_machine_fixture() else {
            return;
        };
        assert!(!classify(true, true, fixture.path()));
    }

    #[test]
    fn inactive_emulation_means_not_host() {
        let Some(fixture) = host_machine_fixture() else {
            return;
        };
        assert!(!classify(false, false, fixture.path()));
    }

    #[test]
    fn host_machine_code_is_recognized() {
        let Some(fixture) = host_machine_fixture() else {
            return;
        };
        assert!(classify(false, true, fixture.path()));
    }

    #[test]
    fn foreign_machine_code_is_not_host() {
        // 0xfead is not in any accepted-machine list.
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&testelf::ehdr64(0xfead, 0x40, 56, 0)).unwrap();
        file.flush().unwrap();
        assert!(!classify(false, true, file.path()));
    }

    #[test]
    fn unreadable_or_non_elf_files_are_never_host() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"plain text").unwrap();
        file.flush().unwrap();
        assert!(!classify(false, true, file.path()));

        assert!(!classify(false, true, "/no/such/binary"));
    }
}
