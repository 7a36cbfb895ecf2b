//! # Types
//!
//! Plain data shared by the unwinder, the symbol resolvers and the monitor.

pub mod address;
pub mod frame;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use frame::{FrameRecord, TrapFrame, ARG_WORDS};
pub use symbols::{FunctionName, SymbolInfo, UNKNOWN};
