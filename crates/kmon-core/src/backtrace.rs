//! # Backtrace Formatting
//!
//! Turns frame records into the two-line-per-frame listing printed by the
//! `backtrace` command:
//!
//! ```text
//! Stack backtrace:
//!   fp 00007ffd5c1e0f40  ra 000055d0b3a2c1f2  args 0000000000000001 ...
//!          src/monitor/commands.rs:52: kmon_core::monitor::commands::backtrace+66
//! ```
//!
//! The first line is the raw frame. The second is the symbolic view of the
//! return address: source location, function name, and the byte offset of the
//! return address into that function.

use std::io::{self, Write};

use tracing::debug;

use crate::error::KmonResult;
use crate::symbols::SymbolResolver;
use crate::types::{Address, FrameRecord, SymbolInfo, UNKNOWN};

/// Header printed before the first frame.
pub const HEADER: &str = "Stack backtrace:";

/// Write a full backtrace.
///
/// `frames` is consumed until it ends or yields an error; an error is printed
/// as a single `<backtrace stopped: ...>` line and ends the listing. Only
/// errors from `out` are returned.
///
/// ## Example
///
/// ```rust
/// use kmon_core::backtrace::write_backtrace;
/// use kmon_core::symbols::NullResolver;
/// use kmon_core::types::{Address, FrameRecord};
///
/// let frame = FrameRecord {
///     frame_pointer: Address::from(0x1000),
///     return_address: Address::from(0x4000),
///     args: [1, 2, 3, 4, 5],
/// };
/// let mut out = Vec::new();
/// write_backtrace(&mut out, [Ok(frame)], &NullResolver).unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.starts_with("Stack backtrace:\n  fp 0000000000001000  ra 0000000000004000"));
/// ```
pub fn write_backtrace<I, R>(out: &mut dyn Write, frames: I, resolver: &R) -> io::Result<()>
where
    I: IntoIterator<Item = KmonResult<FrameRecord>>,
    R: SymbolResolver + ?Sized,
{
    writeln!(out, "{HEADER}")?;

    let mut printed = 0usize;
    for frame in frames {
        match frame {
            Ok(frame) => {
                write_frame(out, &frame)?;
                let info = resolver.resolve(frame.return_address);
                writeln!(out, "         {}", render_symbol(&info, frame.return_address))?;
                printed += 1;
            }
            Err(err) => {
                writeln!(out, "  <backtrace stopped: {err}>")?;
                break;
            }
        }
    }

    debug!(frames = printed, "backtrace written");
    Ok(())
}

/// Write the raw line for one frame.
///
/// ## Errors
///
/// Any error from `out`.
pub fn write_frame(out: &mut dyn Write, frame: &FrameRecord) -> io::Result<()>
{
    write!(
        out,
        "  fp {:016x}  ra {:016x}  args",
        frame.frame_pointer, frame.return_address
    )?;
    for arg in frame.args {
        write!(out, " {arg:016x}")?;
    }
    writeln!(out)
}

/// Symbolic text for `return_address`: `file:line: function+offset`.
///
/// Each part the resolver did not find is printed as `<unknown>`. The
/// function name is cut to its display length.
///
/// ```rust
/// use kmon_core::backtrace::render_symbol;
/// use kmon_core::types::{Address, SymbolInfo};
///
/// let text = render_symbol(&SymbolInfo::unknown(), Address::from(0x1234));
/// assert_eq!(text, "<unknown>:<unknown>: <unknown>+<unknown>");
/// ```
pub fn render_symbol(info: &SymbolInfo, return_address: Address) -> String
{
    let file = info.file.as_deref().unwrap_or(UNKNOWN);
    let line = info
        .line
        .map_or_else(|| UNKNOWN.to_string(), |line| line.to_string());
    let function = info.function.as_ref().map_or(UNKNOWN, |name| name.as_str());
    let offset = info
        .offset_of(return_address)
        .map_or_else(|| UNKNOWN.to_string(), |offset| offset.to_string());

    format!("{file}:{line}: {function}+{offset}")
}
