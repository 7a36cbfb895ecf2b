//! DWARF-backed resolver for ELF images.
//!
//! Function names and start addresses come from the ELF symbol table, which
//! survives even in builds without debug info. Source file and line come from
//! the DWARF line programs through `addr2line`; the context is built on first
//! use because parsing the line programs of a large image is not free.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSymbol, SymbolKind};
use once_cell::unsync::OnceCell;
use tracing::{debug, trace};

use super::demangle::display_name;
use super::image::{self, DWARF_SECTIONS};
use super::SymbolResolver;
use crate::error::{KmonError, KmonResult};
use crate::types::{Address, FunctionName, SymbolInfo};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// A text symbol in file addresses.
#[derive(Debug, Clone)]
struct Function
{
    start: u64,
    /// `None` when the symbol table records no size.
    size: Option<u64>,
    name: String,
}

impl Function
{
    fn contains(&self, file_address: u64) -> bool
    {
        match (self.size, file_address.checked_sub(self.start)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(size), Some(offset)) => offset < size,
        }
    }
}

/// Resolver over one ELF image.
pub struct DwarfResolver
{
    path: PathBuf,
    bias: u64,
    /// Runtime addresses covered by the image's loadable segments.
    range: (u64, u64),
    /// Demangled text symbols, sorted by start.
    functions: Vec<Function>,
    endian: RunTimeEndian,
    sections: HashMap<&'static str, Arc<[u8]>>,
    context: OnceCell<Option<Context<OwnedReader>>>,
}

impl DwarfResolver
{
    /// Load the image at `path`, mapped so that runtime addresses are file
    /// addresses plus `bias`.
    ///
    /// ## Errors
    ///
    /// - `Io` if the file cannot be read
    /// - `ImageParse` if it is not an object file `object` understands
    /// - `Dwarf` if a debug section cannot be decompressed
    pub fn load(path: impl AsRef<Path>, bias: u64) -> KmonResult<Self>
    {
        let path = path.as_ref();
        let data = image::read(path)?;
        let file = image::parse(path, &data)?;
        Self::from_object(path, &file, bias)
    }

    /// Load the running executable with the bias it was mapped at.
    ///
    /// ## Errors
    ///
    /// As [`DwarfResolver::load`], plus `Unsupported` where the load bias
    /// cannot be determined.
    pub fn current_executable() -> KmonResult<Self>
    {
        let path = std::env::current_exe()?;
        let data = image::read(&path)?;
        let file = image::parse(&path, &data)?;
        let bias = image::process_bias(&path, &file)?;
        debug!(path = %path.display(), bias = format_args!("{bias:#x}"), "loading symbols for running executable");
        Self::from_object(&path, &file, bias)
    }

    fn from_object(path: &Path, file: &object::File<'_>, bias: u64) -> KmonResult<Self>
    {
        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let (low, high) = image::image_range(file);
        let range = (low.wrapping_add(bias), high.wrapping_add(bias));

        let mut functions: Vec<Function> = file
            .symbols()
            .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.is_definition() && symbol.address() != 0)
            .filter_map(|symbol| {
                Some(Function {
                    start: symbol.address(),
                    size: Some(symbol.size()).filter(|size| *size > 0),
                    name: display_name(symbol.name().ok()?),
                })
            })
            .collect();
        // Sized entries sort ahead of unsized aliases at the same start.
        functions.sort_by_key(|function| (function.start, function.size.is_none()));
        functions.dedup_by_key(|function| function.start);

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            sections.insert(*canonical, image::load_section_bytes(file, aliases)?);
        }

        debug!(
            path = %path.display(),
            functions = functions.len(),
            has_line_info = sections.get(".debug_line").is_some_and(|data| !data.is_empty()),
            "image loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            bias,
            range,
            functions,
            endian,
            sections,
            context: OnceCell::new(),
        })
    }

    /// Path the image was loaded from.
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Load bias applied to every file address.
    pub fn bias(&self) -> u64
    {
        self.bias
    }

    /// `true` if `address` lies inside one of the image's loadable segments'
    /// overall span.
    pub fn contains(&self, address: Address) -> bool
    {
        let value = address.value();
        value >= self.range.0 && value < self.range.1
    }

    fn file_address(&self, address: Address) -> Option<u64>
    {
        self.contains(address)
            .then(|| address.value().wrapping_sub(self.bias))
    }

    /// The function whose extent covers `file_address`. Addresses past the
    /// end of the nearest preceding function match nothing.
    fn function_for(&self, file_address: u64) -> Option<&Function>
    {
        let idx = self.functions.partition_point(|function| function.start <= file_address);
        self.functions
            .get(idx.checked_sub(1)?)
            .filter(|function| function.contains(file_address))
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }

    fn context(&self) -> Option<&Context<OwnedReader>>
    {
        self.context
            .get_or_init(|| match self.build_context() {
                Ok(context) => Some(context),
                Err(err) => {
                    debug!(%err, path = %self.path.display(), "no line information");
                    None
                }
            })
            .as_ref()
    }

    fn build_context(&self) -> KmonResult<Context<OwnedReader>>
    {
        let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
            .map_err(|err| KmonError::Dwarf(format!("failed to load DWARF: {err}")))?;
        Context::from_dwarf(dwarf).map_err(|err| KmonError::Dwarf(format!("failed to build addr2line context: {err}")))
    }

    /// File, line and (as a fallback) function name from DWARF.
    ///
    /// addr2line reports inlined frames innermost first. The location comes
    /// from the innermost frame, the source line actually executing. The name
    /// comes from the outermost one, the function that owns the machine code.
    fn line_info(&self, file_address: u64) -> Option<(Option<String>, Option<u32>, Option<String>)>
    {
        let context = self.context()?;
        let mut frames = context.find_frames(file_address).skip_all_loads().ok()?;

        let mut location = None;
        let mut function = None;
        while let Ok(Some(frame)) = frames.next() {
            if location.is_none() {
                location = Some((
                    frame.location.as_ref().and_then(|loc| loc.file).map(str::to_owned),
                    frame.location.as_ref().and_then(|loc| loc.line),
                ));
            }
            if let Some(name) = frame.function.as_ref().and_then(|func| func.raw_name().ok()) {
                function = Some(display_name(&name));
            }
        }

        let (file, line) = location?;
        Some((file, line, function))
    }
}

impl SymbolResolver for DwarfResolver
{
    fn resolve(&self, address: Address) -> SymbolInfo
    {
        let Some(file_address) = self.file_address(address) else {
            trace!(%address, "address outside image");
            return SymbolInfo::unknown();
        };

        let mut info = SymbolInfo::unknown();
        if let Some(function) = self.function_for(file_address) {
            info.function = Some(FunctionName::new(function.name.clone()));
            info.function_start = Some(Address::new(function.start.wrapping_add(self.bias)));
        }

        if let Some((file, line, function)) = self.line_info(file_address) {
            info.file = file;
            info.line = line;
            if info.function.is_none() {
                info.function = function.map(FunctionName::new);
            }
        }

        trace!(%address, ?info, "resolved");
        info
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn resolver(functions: Vec<Function>) -> DwarfResolver
    {
        DwarfResolver {
            path: PathBuf::from("synthetic"),
            bias: 0x10_0000,
            range: (0x10_1000, 0x10_2000),
            functions,
            endian: RunTimeEndian::Little,
            sections: HashMap::new(),
            context: OnceCell::new(),
        }
    }

    fn function(start: u64, size: Option<u64>, name: &str) -> Function
    {
        Function {
            start,
            size,
            name: name.to_owned(),
        }
    }

    #[test]
    fn lookup_stops_at_symbol_size()
    {
        let resolver = resolver(vec![function(0x1000, Some(0x10), "sized"), function(0x1100, None, "open")]);

        let info = resolver.resolve(Address::new(0x10_100f));
        assert_eq!(info.function.as_ref().map(FunctionName::as_str), Some("sized"));
        assert_eq!(info.function_start, Some(Address::new(0x10_1000)));

        let past_end = resolver.resolve(Address::new(0x10_1010));
        assert!(past_end.function.is_none());
        assert!(past_end.function_start.is_none());

        // Without a recorded size the nearest preceding symbol still matches.
        let info = resolver.resolve(Address::new(0x10_1800));
        assert_eq!(info.function.as_ref().map(FunctionName::as_str), Some("open"));
    }
}
