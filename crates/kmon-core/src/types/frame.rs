//! Stack frame and trap context types.

use std::fmt;

use super::Address;

/// Number of raw argument words captured above each return address.
pub const ARG_WORDS: usize = 5;

/// One link of a frame-pointer chain.
///
/// Layout of the words the record is read from, starting at `frame_pointer`:
///
/// ```text
/// fp + 0 words   saved frame pointer of the caller (next link)
/// fp + 1 word    return address
/// fp + 2..=6     argument window (five words)
/// ```
///
/// The argument window is read regardless of the callee's real arity, so
/// functions with fewer arguments show whatever happens to sit in those slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord
{
    /// Frame pointer this record was read from (never zero).
    pub frame_pointer: Address,
    /// Return address saved one word above the frame pointer.
    pub return_address: Address,
    /// Raw words from the slots above the return address.
    pub args: [u64; ARG_WORDS],
}

/// Register snapshot taken when the monitor was entered from a trap.
///
/// The monitor only displays it; handlers receive it read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame
{
    /// Program counter at the trap.
    pub pc: Address,
    /// Stack pointer at the trap.
    pub sp: Address,
    /// Frame pointer at the trap.
    pub fp: Address,
    /// Trap or vector number, if the entry path recorded one.
    pub trap: Option<u32>,
}

impl fmt::Display for TrapFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        writeln!(f, "TRAP frame")?;
        writeln!(f, "  pc   {:016x}", self.pc)?;
        writeln!(f, "  sp   {:016x}", self.sp)?;
        writeln!(f, "  fp   {:016x}", self.fp)?;
        match self.trap {
            Some(trap) => write!(f, "  trap 0x{trap:08x}"),
            None => write!(f, "  trap <none>"),
        }
    }
}
