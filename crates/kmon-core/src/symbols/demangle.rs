//! Symbol demangling utilities.
//!
//! Linkers keep Rust names in their mangled form (`_ZN...E` for the legacy
//! scheme, `_R...` for v0). Backtraces show the demangled path without the
//! trailing hash, e.g. `kmon_core::monitor::Monitor::run`. Anything that is
//! not a Rust symbol (C functions, assembly labels) is shown as is.

use rustc_demangle::try_demangle;

/// Human-readable form of a raw linkage name.
///
/// ```rust
/// use kmon_core::symbols::demangle::display_name;
///
/// assert_eq!(display_name("_ZN4core3fmt5write17h0123456789abcdefE"), "core::fmt::write");
/// assert_eq!(display_name("mon_backtrace"), "mon_backtrace");
/// ```
pub fn display_name(raw: &str) -> String
{
    match try_demangle(raw) {
        // The alternate format drops the `::h<hash>` suffix.
        Ok(demangled) => format!("{demangled:#}"),
        Err(_) => raw.to_string(),
    }
}
