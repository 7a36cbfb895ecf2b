//! # Symbol Resolution
//!
//! Address to symbol lookups used by the backtrace formatter.
//!
//! The formatter only sees the [`SymbolResolver`] trait. Implementations:
//!
//! - [`NullResolver`]: knows nothing, every field absent
//! - [`SymbolTable`]: an embedded table of function symbols, optionally with
//!   line tables, built in code or parsed from an `nm`/`System.map` listing
//! - [`DwarfResolver`]: an ELF image, with names from its symbol table and
//!   file/line from its DWARF line programs
//!
//! Resolvers never fail. An address they cannot place, including nonsense
//! such as zero, produces a [`SymbolInfo`] with the missing fields set to
//! `None`.

pub mod demangle;
pub mod dwarf;
pub mod image;
pub mod table;

pub use dwarf::DwarfResolver;
pub use table::{SymbolEntry, SymbolTable};

use crate::types::{Address, SymbolInfo};

/// Read-only address to symbol lookup.
pub trait SymbolResolver
{
    /// Best-effort metadata for `address`.
    ///
    /// Must not panic or fault for any input.
    fn resolve(&self, address: Address) -> SymbolInfo;
}

impl<R: SymbolResolver + ?Sized> SymbolResolver for Box<R>
{
    fn resolve(&self, address: Address) -> SymbolInfo
    {
        (**self).resolve(address)
    }
}

/// Resolver with no symbol information.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl SymbolResolver for NullResolver
{
    fn resolve(&self, _address: Address) -> SymbolInfo
    {
        SymbolInfo::unknown()
    }
}
