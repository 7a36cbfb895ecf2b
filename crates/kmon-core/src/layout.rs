//! # Kernel Layout
//!
//! Where the kernel image sits in memory, as reported by `kerninfo`.
//!
//! A kernel linker script normally exports `_start`, `entry`, `etext`,
//! `edata` and `end`. When an image carries those symbols they are used as
//! is; any that are missing are derived from the ELF headers instead:
//!
//! | field    | symbol   | fallback                                  |
//! |----------|----------|-------------------------------------------|
//! | `start`  | `_start` | lowest loadable segment                   |
//! | `entry`  | `entry`  | ELF entry point                           |
//! | `etext`  | `etext`  | end of `.text`                            |
//! | `edata`  | `edata`  | end of `.data`, else end of file-backed data |
//! | `end`    | `end`    | end of the highest loadable segment       |
//!
//! All addresses are runtime addresses: the load bias is already added.

use std::io::{self, Write};
use std::path::Path;

use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol};
use tracing::debug;

use crate::error::KmonResult;
use crate::symbols::image;
use crate::types::Address;

/// Addresses of the special kernel symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelLayout
{
    /// Lowest address of the image.
    pub start: Address,
    /// Entry point.
    pub entry: Address,
    /// End of code.
    pub etext: Address,
    /// End of initialised data.
    pub edata: Address,
    /// End of the image including zero-initialised data.
    pub end: Address,
    /// Virtual base the kernel is linked at; `virt - kernbase` is physical.
    pub kernbase: Address,
}

impl KernelLayout
{
    /// Derive the layout from ELF image bytes.
    ///
    /// ## Errors
    ///
    /// `ImageParse` if `data` is not an object file.
    pub fn from_elf(data: &[u8], bias: u64, kernbase: Address) -> KmonResult<Self>
    {
        let file = image::parse(Path::new("<memory>"), data)?;
        Ok(Self::from_object(&file, bias, kernbase))
    }

    /// Derive the layout from an ELF image on disk.
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be read, `ImageParse` if it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>, bias: u64, kernbase: Address) -> KmonResult<Self>
    {
        let path = path.as_ref();
        let data = image::read(path)?;
        let file = image::parse(path, &data)?;
        Ok(Self::from_object(&file, bias, kernbase))
    }

    /// Layout of the running executable at its load bias.
    ///
    /// ## Errors
    ///
    /// As [`KernelLayout::from_file`], plus `Unsupported` where the load bias
    /// cannot be determined.
    pub fn current_executable(kernbase: Address) -> KmonResult<Self>
    {
        let path = std::env::current_exe()?;
        let data = image::read(&path)?;
        let file = image::parse(&path, &data)?;
        let bias = image::process_bias(&path, &file)?;
        Ok(Self::from_object(&file, bias, kernbase))
    }

    fn from_object(file: &object::File<'_>, bias: u64, kernbase: Address) -> Self
    {
        let symbol = |name: &str| {
            file.symbols()
                .find(|symbol| symbol.name().is_ok_and(|found| found == name) && symbol.address() != 0)
                .map(|symbol| symbol.address())
        };
        let section_end = |name: &str| {
            file.section_by_name(name)
                .map(|section| section.address().saturating_add(section.size()))
        };

        let (low, high) = image::image_range(file);
        let file_backed_end = file
            .segments()
            .map(|segment| {
                let (_, file_size) = segment.file_range();
                segment.address().saturating_add(file_size)
            })
            .max()
            .unwrap_or(high);

        let start = symbol("_start").unwrap_or(low);
        let entry = symbol("entry").unwrap_or_else(|| file.entry());
        let etext = symbol("etext").or_else(|| section_end(".text")).unwrap_or(entry);
        let edata = symbol("edata")
            .or_else(|| section_end(".data"))
            .unwrap_or(file_backed_end);
        let end = symbol("end").unwrap_or(high);

        let layout = Self {
            start: Address::new(start.wrapping_add(bias)),
            entry: Address::new(entry.wrapping_add(bias)),
            etext: Address::new(etext.wrapping_add(bias)),
            edata: Address::new(edata.wrapping_add(bias)),
            end: Address::new(end.wrapping_add(bias)),
            kernbase,
        };
        debug!(?layout, "kernel layout");
        layout
    }

    /// Size of the image from entry to end, in KiB, rounded up.
    pub fn footprint_kib(&self) -> u64
    {
        self.end
            .offset_from(self.entry)
            .unwrap_or(0)
            .div_ceil(1024)
    }

    fn physical(&self, address: Address) -> u64
    {
        address.value().wrapping_sub(self.kernbase.value())
    }

    /// Print the `kerninfo` report.
    ///
    /// ## Errors
    ///
    /// Any error from `out`.
    pub fn write_report(&self, out: &mut dyn Write) -> io::Result<()>
    {
        writeln!(out, "Special kernel symbols:")?;
        writeln!(out, "  _start                  {:016x} (phys)", self.start)?;
        for (name, address) in [
            ("entry", self.entry),
            ("etext", self.etext),
            ("edata", self.edata),
            ("end  ", self.end),
        ] {
            writeln!(
                out,
                "  {name}  {address:016x} (virt)  {:016x} (phys)",
                self.physical(address)
            )?;
        }
        writeln!(out, "Kernel executable memory footprint: {}KB", self.footprint_kib())
    }
}
