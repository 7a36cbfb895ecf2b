//! Built-in command handlers.
//!
//! Every handler has the [`Handler`](super::Handler) signature and prints
//! through [`Invocation::out`].

use tracing::info;

use super::registry::Status;
use super::tokenize::Argv;
use super::{Invocation, StackSource};
use crate::arch;
use crate::backtrace::write_backtrace;
use crate::error::{KmonError, KmonResult};
use crate::memory::LiveStack;
use crate::unwind::FramePointerUnwinder;

const ART: [&str; 6] = [
    r" __                                 ",
    r"|  | __ _____   ____   ____         ",
    r"|  |/ //     \ /  _ \ /    \        ",
    r"|    <|  Y Y  (  <_> )   |  \       ",
    r"|__|_ \__|_|  /\____/|___|  /       ",
    r"     \/     \/            \/        ",
];

/// `help`: list every command as `<name> - <description>`.
pub fn help(_argv: &Argv<'_>, invocation: &mut Invocation<'_>) -> KmonResult<Status>
{
    for command in invocation.registry.iter() {
        writeln!(invocation.out, "{} - {}", command.name, command.description)?;
    }
    Ok(Status::OK)
}

/// `kerninfo`: special kernel symbols and the image footprint.
pub fn kerninfo(_argv: &Argv<'_>, invocation: &mut Invocation<'_>) -> KmonResult<Status>
{
    match &invocation.target.layout {
        Some(layout) => layout.write_report(invocation.out)?,
        None => writeln!(invocation.out, "Kernel layout unavailable")?,
    }
    Ok(Status::OK)
}

/// `backtrace`: walk the frame-pointer chain and print each frame.
///
/// On a live stack the walk starts at this handler's own frame, so the first
/// record is the handler itself and the next is the dispatcher that called it.
#[inline(never)]
pub fn backtrace(_argv: &Argv<'_>, invocation: &mut Invocation<'_>) -> KmonResult<Status>
{
    let target = invocation.target;
    let limits = invocation.limits;

    match &target.stack {
        StackSource::Live => {
            let frame_pointer = arch::current_frame_pointer()
                .ok_or_else(|| KmonError::Unsupported("no frame pointer register on this architecture".into()));
            match frame_pointer.and_then(|fp| Ok((fp, LiveStack::containing(fp)?))) {
                Ok((fp, stack)) => {
                    let unwinder = FramePointerUnwinder::new(&stack, limits);
                    write_backtrace(invocation.out, unwinder.frames(fp), &*target.resolver)?;
                }
                Err(err) => write_backtrace(invocation.out, [Err(err)], &*target.resolver)?,
            }
        }
        StackSource::Snapshot { memory, frame_pointer } => {
            let unwinder = FramePointerUnwinder::new(memory, limits);
            write_backtrace(invocation.out, unwinder.frames(*frame_pointer), &*target.resolver)?;
        }
    }
    Ok(Status::OK)
}

/// `show`: print the banner art, one colour per line.
pub fn show(_argv: &Argv<'_>, invocation: &mut Invocation<'_>) -> KmonResult<Status>
{
    for (colour, line) in (31..).zip(ART) {
        writeln!(invocation.out, "\x1b[1;{colour}m{line}")?;
    }
    write!(invocation.out, "\x1b[m")?;
    Ok(Status::OK)
}

/// `exit`: leave the monitor.
pub fn exit(_argv: &Argv<'_>, _invocation: &mut Invocation<'_>) -> KmonResult<Status>
{
    info!("exit requested");
    Ok(Status::EXIT)
}
