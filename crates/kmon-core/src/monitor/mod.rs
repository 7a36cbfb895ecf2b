//! # Kernel Monitor
//!
//! The interactive command loop.
//!
//! The monitor reads a line, splits it into tokens, looks the first token up
//! in the [`Registry`] and runs the handler it finds. A handler that returns
//! a negative [`Status`] stops the loop; everything else, including unknown
//! commands and handler errors, is reported on the console and the loop
//! carries on.
//!
//! ## Lifecycle
//!
//! 1. Build a [`Target`]: symbol resolver, kernel layout, which stack to walk
//! 2. Build a [`Monitor`] from a [`MonitorConfig`], a registry and the target
//! 3. Call [`Monitor::run`] with a [`LineSource`] and an output sink
//!
//! ## Example
//!
//! ```rust
//! use kmon_core::monitor::{EofPolicy, Monitor, MonitorConfig, Registry, ScriptSource, Target};
//!
//! let config = MonitorConfig {
//!     banner: false,
//!     eof: EofPolicy::Exit,
//!     ..MonitorConfig::default()
//! };
//! let mut monitor = Monitor::new(config, Registry::builtin(), Target::default());
//! let mut source = ScriptSource::new(["bogus"]);
//! let mut out = Vec::new();
//! monitor.run(&mut source, &mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "Unknown command 'bogus'\n");
//! ```

pub mod commands;
pub mod console;
pub mod registry;
pub mod tokenize;

use std::io::{self, Write};

pub use console::{LineSource, ScriptSource, StdinSource};
pub use registry::{Command, Handler, Registry, RegistryBuilder, Status};
pub use tokenize::{tokenize, Argv, MAX_ARGS, WHITESPACE};
use tracing::{debug, info, warn};

use crate::error::{KmonError, KmonResult};
use crate::layout::KernelLayout;
use crate::memory::MemorySnapshot;
use crate::symbols::{NullResolver, SymbolResolver};
use crate::types::{Address, TrapFrame};
use crate::unwind::UnwindLimits;

/// First banner line.
pub const WELCOME: &str = "Welcome to the kmon kernel monitor!";
/// Second banner line.
pub const HELP_HINT: &str = "Type 'help' for a list of commands.";

/// What to do when the line source reports end of input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EofPolicy
{
    /// Ignore it and prompt again. A kernel console never closes, and a
    /// terminal keeps delivering lines after a stray end-of-file key.
    #[default]
    Wait,
    /// Stop the monitor.
    Exit,
}

/// Monitor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig
{
    /// Prompt shown before each line.
    pub prompt: String,
    /// Print the welcome banner on start.
    pub banner: bool,
    /// End-of-input behaviour.
    pub eof: EofPolicy,
    /// Bounds for `backtrace`.
    pub limits: UnwindLimits,
}

impl Default for MonitorConfig
{
    fn default() -> Self
    {
        Self {
            prompt: "K> ".to_string(),
            banner: true,
            eof: EofPolicy::Wait,
            limits: UnwindLimits::default(),
        }
    }
}

/// Which stack `backtrace` walks.
#[derive(Debug, Default)]
pub enum StackSource
{
    /// The monitor's own stack, from the `backtrace` handler's frame up.
    #[default]
    Live,
    /// A captured stack image, walked from a recorded frame pointer.
    Snapshot
    {
        /// The captured memory.
        memory: MemorySnapshot,
        /// Innermost frame pointer.
        frame_pointer: Address,
    },
}

/// The system the monitor inspects.
pub struct Target
{
    /// Symbol lookups for backtraces.
    pub resolver: Box<dyn SymbolResolver>,
    /// Image layout for `kerninfo`, if known.
    pub layout: Option<KernelLayout>,
    /// Stack walked by `backtrace`.
    pub stack: StackSource,
}

impl Target
{
    /// Target resolving symbols through `resolver`, live stack, no layout.
    pub fn new(resolver: impl SymbolResolver + 'static) -> Self
    {
        Self {
            resolver: Box::new(resolver),
            layout: None,
            stack: StackSource::Live,
        }
    }

    /// Set the kernel layout.
    #[must_use]
    pub fn with_layout(mut self, layout: KernelLayout) -> Self
    {
        self.layout = Some(layout);
        self
    }

    /// Set the stack to walk.
    #[must_use]
    pub fn with_stack(mut self, stack: StackSource) -> Self
    {
        self.stack = stack;
        self
    }
}

impl Default for Target
{
    fn default() -> Self
    {
        Self::new(NullResolver)
    }
}

impl std::fmt::Debug for Target
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Target")
            .field("layout", &self.layout)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

/// Everything a handler can see while it runs.
pub struct Invocation<'a>
{
    /// Console output.
    pub out: &'a mut dyn Write,
    /// The registry the command was found in.
    pub registry: &'a Registry,
    /// The inspected system.
    pub target: &'a Target,
    /// Trap context the monitor was entered with, if any.
    pub trapframe: Option<&'a TrapFrame>,
    /// Bounds for stack walks.
    pub limits: UnwindLimits,
}

/// The command loop.
#[derive(Debug)]
pub struct Monitor
{
    config: MonitorConfig,
    registry: Registry,
    target: Target,
    trapframe: Option<TrapFrame>,
}

impl Monitor
{
    /// Create a monitor.
    pub fn new(config: MonitorConfig, registry: Registry, target: Target) -> Self
    {
        Self {
            config,
            registry,
            target,
            trapframe: None,
        }
    }

    /// Attach the trap context the monitor was entered from.
    #[must_use]
    pub fn with_trapframe(mut self, trapframe: TrapFrame) -> Self
    {
        self.trapframe = Some(trapframe);
        self
    }

    /// Settings in use.
    pub fn config(&self) -> &MonitorConfig
    {
        &self.config
    }

    /// Registered commands.
    pub fn registry(&self) -> &Registry
    {
        &self.registry
    }

    /// The inspected system.
    pub fn target(&self) -> &Target
    {
        &self.target
    }

    /// Print the banner and run commands from `source` until a handler asks
    /// to exit, or until end of input under [`EofPolicy::Exit`].
    ///
    /// ## Errors
    ///
    /// Only console failures: reading from `source` or writing to `out`.
    pub fn run(&mut self, source: &mut dyn LineSource, out: &mut dyn Write) -> KmonResult<()>
    {
        info!(commands = self.registry.len(), eof = ?self.config.eof, "monitor started");

        if self.config.banner {
            self.write_banner(out)?;
        }

        loop {
            let Some(line) = source.read_line(&self.config.prompt)? else {
                match self.config.eof {
                    EofPolicy::Wait => {
                        debug!("end of input ignored");
                        writeln!(out)?;
                        continue;
                    }
                    EofPolicy::Exit => {
                        debug!("end of input");
                        break;
                    }
                }
            };

            if self.run_line(&line, out)?.is_exit() {
                break;
            }
        }

        info!("monitor stopped");
        Ok(())
    }

    /// Tokenize and dispatch one line.
    ///
    /// Too many tokens print the overflow message and run nothing. A handler
    /// error other than a console failure is printed as `Error: ...` and
    /// treated as success.
    ///
    /// ## Errors
    ///
    /// Only failures writing to `out`.
    pub fn run_line(&self, line: &str, out: &mut dyn Write) -> KmonResult<Status>
    {
        let argv = match tokenize(line) {
            Ok(argv) => argv,
            Err(err @ KmonError::TooManyArguments { .. }) => {
                debug!(%err, "line dropped");
                writeln!(out, "{err}")?;
                return Ok(Status::OK);
            }
            Err(err) => return Err(err),
        };

        let mut invocation = Invocation {
            out: &mut *out,
            registry: &self.registry,
            target: &self.target,
            trapframe: self.trapframe.as_ref(),
            limits: self.config.limits,
        };

        match self.registry.dispatch(&argv, &mut invocation) {
            Ok(status) => Ok(status),
            Err(KmonError::Io(err)) => Err(KmonError::Io(err)),
            Err(err) => {
                warn!(command = argv.command(), %err, "command failed");
                writeln!(out, "Error: {err}")?;
                Ok(Status::OK)
            }
        }
    }

    fn write_banner(&self, out: &mut dyn Write) -> io::Result<()>
    {
        writeln!(out, "{WELCOME}")?;
        writeln!(out, "{HELP_HINT}")?;
        if let Some(trapframe) = &self.trapframe {
            writeln!(out, "{trapframe}")?;
        }
        Ok(())
    }
}
