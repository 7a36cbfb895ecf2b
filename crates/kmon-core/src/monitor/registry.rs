//! Command registry and dispatcher.

use std::fmt;

use tracing::debug;

use super::commands;
use super::tokenize::Argv;
use super::Invocation;
use crate::error::KmonResult;

/// Result of a command handler.
///
/// Zero and positive values keep the monitor running. A negative value asks
/// it to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status
{
    /// Keep running.
    pub const OK: Status = Status(0);
    /// Leave the monitor.
    pub const EXIT: Status = Status(-1);

    /// `true` if the monitor should stop.
    pub const fn is_exit(self) -> bool
    {
        self.0 < 0
    }
}

impl From<i32> for Status
{
    fn from(value: i32) -> Self
    {
        Status(value)
    }
}

/// Command handler.
///
/// Gets the full argument vector, command name included, and the invocation
/// context it prints through.
pub type Handler = fn(&Argv<'_>, &mut Invocation<'_>) -> KmonResult<Status>;

/// A named command.
#[derive(Clone, Copy)]
pub struct Command
{
    /// Name typed at the prompt.
    pub name: &'static str,
    /// One-line description shown by `help`.
    pub description: &'static str,
    /// Code run when the name is typed.
    pub handler: Handler,
}

impl fmt::Debug for Command
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Registry`].
///
/// ## Example
///
/// ```rust
/// use kmon_core::monitor::{commands, Registry};
///
/// let registry = Registry::builder()
///     .command("help", "Display this list of commands", commands::help)
///     .command("exit", "Leave the monitor", commands::exit)
///     .build();
/// assert_eq!(registry.len(), 2);
/// assert!(registry.get("exit").is_some());
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder
{
    commands: Vec<Command>,
}

impl RegistryBuilder
{
    /// Append a command. Order is kept; `help` lists commands in this order.
    #[must_use]
    pub fn command(mut self, name: &'static str, description: &'static str, handler: Handler) -> Self
    {
        self.commands.push(Command {
            name,
            description,
            handler,
        });
        self
    }

    /// Finish building.
    pub fn build(self) -> Registry
    {
        Registry {
            commands: self.commands,
        }
    }
}

/// Ordered, immutable list of commands.
///
/// Lookups scan in registration order and stop at the first exact,
/// case-sensitive name match, so a duplicate name is shadowed by the earlier
/// entry.
#[derive(Debug)]
pub struct Registry
{
    commands: Vec<Command>,
}

impl Registry
{
    /// Start an empty registry.
    pub fn builder() -> RegistryBuilder
    {
        RegistryBuilder::default()
    }

    /// The standard command set.
    pub fn builtin() -> Self
    {
        Self::builder()
            .command("help", "Display this list of commands", commands::help)
            .command("kerninfo", "Display information about the kernel", commands::kerninfo)
            .command("backtrace", "Show the backtrace of the current kernel stack", commands::backtrace)
            .command("show", "Display a colourful ASCII art banner", commands::show)
            .command("exit", "Leave the kernel monitor", commands::exit)
            .build()
    }

    /// Command registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Command>
    {
        self.commands.iter().find(|command| command.name == name)
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Command>
    {
        self.commands.iter()
    }

    /// Number of commands.
    pub fn len(&self) -> usize
    {
        self.commands.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool
    {
        self.commands.is_empty()
    }

    /// Run the command named by `argv[0]`.
    ///
    /// An empty `argv` does nothing. An unknown name prints one
    /// `Unknown command` line and still succeeds. Otherwise the handler's
    /// status is returned as is.
    ///
    /// ## Errors
    ///
    /// Whatever the handler returns, or `Io` if the unknown-command line
    /// cannot be written.
    pub fn dispatch(&self, argv: &Argv<'_>, invocation: &mut Invocation<'_>) -> KmonResult<Status>
    {
        let Some(name) = argv.command() else {
            return Ok(Status::OK);
        };

        match self.get(name) {
            Some(command) => {
                debug!(command = command.name, args = argv.len() - 1, "dispatch");
                (command.handler)(argv, invocation)
            }
            None => {
                debug!(command = name, "unknown command");
                writeln!(invocation.out, "Unknown command '{name}'")?;
                Ok(Status::OK)
            }
        }
    }
}

impl Default for Registry
{
    fn default() -> Self
    {
        Self::builtin()
    }
}
