//! Common module for library exports

pub use crate::backtrace::{render_symbol, write_backtrace};
pub use crate::error::{KmonError, KmonResult};
pub use crate::layout::KernelLayout;
pub use crate::memory::{LiveStack, MemoryAccess, MemorySnapshot};
pub use crate::monitor::{
    tokenize, Argv, EofPolicy, Invocation, LineSource, Monitor, MonitorConfig, Registry, ScriptSource, StackSource,
    Status, StdinSource, Target,
};
pub use crate::symbols::{DwarfResolver, NullResolver, SymbolEntry, SymbolResolver, SymbolTable};
pub use crate::types::{Address, FrameRecord, FunctionName, SymbolInfo, TrapFrame};
pub use crate::unwind::{FramePointerUnwinder, UnwindLimits};
