use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use sunabako_core::{is_host_elf, ElfImage, PT_DYNAMIC, PT_LOAD};
use tabled::{Table, Tabled};

/// ELF introspection for the sunabako sandbox
#[derive(Parser)]
#[command(
    name = "sunabako",
    about = "Inspect ELF binaries the sandbox is about to execute (header, segments, linker search paths)",
    version,
    author
)]
struct Cli {
    /// Path to the ELF binary
    #[arg(required = true)]
    path: std::path::PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the decoded ELF header
    Header,
    /// List the program header table
    Segments,
    /// Show the RPATH/RUNPATH dynamic-linker search paths
    Rpaths {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Report whether the binary can run natively on this host
    IsHost {
        /// Treat the emulation subsystem as active for this session
        #[arg(long)]
        emulation_active: bool,
    },
}

#[derive(Tabled)]
struct SegmentRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "VirtAddr")]
    vaddr: String,
    #[tabled(rename = "FileSiz")]
    filesz: String,
    #[tabled(rename = "MemSiz")]
    memsz: String,
}

#[derive(Serialize)]
struct RpathsReport<'a> {
    rpaths: Option<&'a str>,
    runpaths: Option<&'a str>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Header => {
            let image = ElfImage::open(&cli.path)?;
            let header = image.header();
            println!("Class:         ELF{}", if header.class.is_64() { 64 } else { 32 });
            println!("Machine:       {}", header.machine);
            println!("PH offset:     0x{:x}", header.phoff);
            println!("PH entry size: {}", header.phentsize);
            println!("PH count:      {}", header.phnum);
        }

        Command::Segments => {
            let mut image = ElfImage::open(&cli.path)?;
            let segments = image.segments()?;
            if segments.is_empty() {
                println!("No program headers.");
            } else {
                let rows: Vec<SegmentRow> = segments
                    .iter()
                    .map(|s| SegmentRow {
                        kind: segment_type_name(s.p_type),
                        offset: format!("0x{:x}", s.offset),
                        vaddr: format!("0x{:x}", s.vaddr),
                        filesz: format!("0x{:x}", s.filesz),
                        memsz: format!("0x{:x}", s.memsz),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }

        Command::Rpaths { json } => {
            let mut image = ElfImage::open(&cli.path)?;
            let paths = image.search_paths()?;
            if json {
                let report = RpathsReport {
                    rpaths: paths.rpaths.as_str(),
                    runpaths: paths.runpaths.as_str(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("RPATH:   {}", paths.rpaths.as_str().unwrap_or("(none)"));
                println!("RUNPATH: {}", paths.runpaths.as_str().unwrap_or("(none)"));
            }
        }

        Command::IsHost { emulation_active } => {
            if is_host_elf(emulation_active, &cli.path) {
                println!("{}", "host binary".green());
            } else {
                println!("{}", "foreign binary (emulation required)".red());
            }
        }
    }

    Ok(())
}

fn segment_type_name(p_type: u32) -> String {
    match p_type {
        PT_LOAD => "LOAD".to_string(),
        PT_DYNAMIC => "DYNAMIC".to_string(),
        other => format!("0x{other:x}"),
    }
}
