//! # Error Types
//!
//! General error handling for the monitor and the backtrace engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and the messages the monitor prints to the console.

use thiserror::Error;

use crate::types::Address;

/// Main error type for monitor operations
///
/// Most of these never leave the monitor: the REPL prints them and keeps
/// reading lines. Only console I/O failures propagate out of
/// [`Monitor::run`](crate::monitor::Monitor::run).
///
/// ## Error Categories
///
/// 1. **Input errors**: TooManyArguments, InvalidArgument
/// 2. **Memory errors**: OutOfRange, Unaligned
/// 3. **Unwind guards**: FrameLimitExceeded, FrameChainNotAscending
/// 4. **Image errors**: ImageParse, Dwarf
/// 5. **Platform errors**: Unsupported
/// 6. **I/O errors**: Io (console and file access)
#[derive(Error, Debug)]
pub enum KmonError
{
    /// An input line had more tokens than an argument vector can hold
    ///
    /// The line is dropped without running any command.
    #[error("Too many arguments (max {max})")]
    TooManyArguments
    {
        /// Size of the argument vector, including the reserved terminator slot
        max: usize,
    },

    /// Invalid argument passed to a monitor function
    ///
    /// Examples:
    /// - An address that is not valid hex or decimal
    /// - A malformed line in a symbol listing
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A memory read fell outside the region the accessor knows to be valid
    ///
    /// This is how a frame chain that wanders off the stack is detected: the
    /// accessor refuses the read instead of touching unmapped memory.
    #[error("address {address} is outside the readable range")]
    OutOfRange
    {
        /// First byte of the refused read
        address: Address,
    },

    /// A word read was requested at an address that is not word aligned
    #[error("address {address} is not word aligned")]
    Unaligned
    {
        /// Address of the refused read
        address: Address,
    },

    /// The frame chain did not reach a zero link within the frame budget
    #[error("frame chain exceeds {limit} frames")]
    FrameLimitExceeded
    {
        /// Maximum number of frames the unwinder was allowed to emit
        limit: usize,
    },

    /// A saved frame pointer did not point further up the stack
    ///
    /// Stacks grow downward, so every caller frame lives at a higher address
    /// than its callee. A link that goes sideways or down is corrupt, and a
    /// link back to an earlier frame would loop forever.
    #[error("frame chain not ascending: {current} links to {next}")]
    FrameChainNotAscending
    {
        /// Frame pointer whose saved link is bad
        current: Address,
        /// The saved link
        next: Address,
    },

    /// The operation is not available on this platform or architecture
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// An executable image could not be parsed
    #[error("Failed to parse image: {0}")]
    ImageParse(String),

    /// DWARF debug information could not be loaded
    #[error("DWARF error: {0}")]
    Dwarf(String),

    /// I/O error (console, symbol files, stack dumps)
    ///
    /// This is a standard Rust `std::io::Error` converted to our error type.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, KmonError>`
///
/// ```rust
/// use kmon_core::error::KmonResult;
/// fn foo() -> KmonResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type KmonResult<T> = std::result::Result<T, KmonError>;
