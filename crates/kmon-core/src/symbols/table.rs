//! Embedded symbol table.
//!
//! A sorted list of function symbols, each with an optional size, source file
//! and line table. Lookups binary search for the function whose start is the
//! greatest one not above the address, then for the line entry the same way.
//!
//! Tables are either built in code (a kernel linking its own table in, or a
//! test) or parsed from `nm` output / a `System.map`:
//!
//! ```text
//! ffffffff81000000 T _stext
//! ffffffff81000040 t mon_backtrace	/src/kern/monitor.c:61
//! ```

use tracing::trace;

use super::demangle::display_name;
use super::SymbolResolver;
use crate::error::{KmonError, KmonResult};
use crate::types::{Address, FunctionName, SymbolInfo};

/// One function in a [`SymbolTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry
{
    /// First instruction.
    pub start: Address,
    /// Length in bytes, if known. Addresses past the end do not match.
    pub size: Option<u64>,
    /// Function name.
    pub name: FunctionName,
    /// Source file the function was compiled from.
    pub file: Option<String>,
    /// `(address, line)` pairs, sorted by address.
    pub lines: Vec<(Address, u32)>,
}

impl SymbolEntry
{
    /// Entry with just a start and a name.
    pub fn new(start: Address, name: FunctionName) -> Self
    {
        Self {
            start,
            size: None,
            name,
            file: None,
            lines: Vec::new(),
        }
    }

    /// Set the function size.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self
    {
        self.size = Some(size);
        self
    }

    /// Set the source file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self
    {
        self.file = Some(file.into());
        self
    }

    /// Record that code at `address` and above belongs to source `line`.
    #[must_use]
    pub fn with_line(mut self, address: Address, line: u32) -> Self
    {
        let at = self.lines.partition_point(|(start, _)| *start <= address);
        self.lines.insert(at, (address, line));
        self
    }

    fn contains(&self, address: Address) -> bool
    {
        match (self.size, address.offset_from(self.start)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(size), Some(offset)) => offset < size,
        }
    }

    fn line_for(&self, address: Address) -> Option<u32>
    {
        let idx = self.lines.partition_point(|(start, _)| *start <= address);
        idx.checked_sub(1).map(|idx| self.lines[idx].1)
    }
}

/// Sorted table of function symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable
{
    entries: Vec<SymbolEntry>,
}

impl SymbolTable
{
    /// Build a table; entries may come in any order.
    pub fn new(mut entries: Vec<SymbolEntry>) -> Self
    {
        entries.sort_by_key(|entry| entry.start);
        Self { entries }
    }

    /// Parse `nm` / `System.map` output.
    ///
    /// Each line is `<hex address> <type> <name>`, optionally followed by a
    /// tab and `file:line` as printed by `nm -l`. Only text symbols (types
    /// `t`, `T`, `w`, `W`) are kept. A symbol without an explicit end runs up
    /// to the next symbol; the last one is unbounded.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` naming the line number for a malformed address.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use kmon_core::symbols::{SymbolResolver, SymbolTable};
    /// use kmon_core::types::Address;
    ///
    /// let table = SymbolTable::parse_nm("f0100000 T entry\nf0100040 T i386_init\n").unwrap();
    /// let info = table.resolve(Address::from(0xf0100010));
    /// assert_eq!(info.function.unwrap().as_str(), "entry");
    /// ```
    pub fn parse_nm(text: &str) -> KmonResult<Self>
    {
        let mut entries = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let (symbol, location) = match line.split_once('\t') {
                Some((symbol, location)) => (symbol, Some(location.trim())),
                None => (line, None),
            };

            let mut fields = symbol.split_whitespace();
            let (Some(address), Some(kind), Some(name)) = (fields.next(), fields.next(), fields.next()) else {
                continue;
            };
            if !matches!(kind, "t" | "T" | "w" | "W") {
                continue;
            }

            let start = u64::from_str_radix(address, 16).map_err(|err| {
                KmonError::InvalidArgument(format!("symbol listing line {}: bad address '{address}': {err}", number + 1))
            })?;
            let start = Address::new(start);

            let mut entry = SymbolEntry::new(start, FunctionName::new(display_name(name)));
            if let Some((file, line)) = location.and_then(|location| location.rsplit_once(':')) {
                entry = entry.with_file(file);
                if let Ok(line) = line.parse() {
                    entry = entry.with_line(start, line);
                }
            }
            entries.push(entry);
        }

        let mut table = Self::new(entries);
        table.infer_sizes();
        Ok(table)
    }

    fn infer_sizes(&mut self)
    {
        let starts: Vec<Address> = self.entries.iter().map(|entry| entry.start).collect();
        for (entry, next) in self.entries.iter_mut().zip(starts.iter().skip(1)) {
            if entry.size.is_none() {
                // Aliases share a start; they get no size rather than zero.
                entry.size = next.offset_from(entry.start).filter(|size| *size > 0);
            }
        }
    }

    /// Entry covering `address`, if any.
    pub fn lookup(&self, address: Address) -> Option<&SymbolEntry>
    {
        let idx = self.entries.partition_point(|entry| entry.start <= address);
        let entry = &self.entries[idx.checked_sub(1)?];
        entry.contains(address).then_some(entry)
    }

    /// Entries in address order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry>
    {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// `true` if the table holds no symbols.
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

impl FromIterator<SymbolEntry> for SymbolTable
{
    fn from_iter<I: IntoIterator<Item = SymbolEntry>>(iter: I) -> Self
    {
        Self::new(iter.into_iter().collect())
    }
}

impl SymbolResolver for SymbolTable
{
    fn resolve(&self, address: Address) -> SymbolInfo
    {
        let Some(entry) = self.lookup(address) else {
            trace!(%address, "no symbol");
            return SymbolInfo::unknown();
        };

        SymbolInfo {
            file: entry.file.clone(),
            line: entry.line_for(address),
            function: Some(entry.name.clone()),
            function_start: Some(entry.start),
        }
    }
}
