//! # Stack Unwinding
//!
//! Frame-pointer chain walking.
//!
//! Every function compiled with frame pointers starts by pushing the caller's
//! frame pointer and pointing the frame pointer register at that slot. The
//! saved values form a singly linked list through the stack:
//!
//! ```text
//!   higher addresses
//!   | args...          |  fp + 2..=6 words
//!   | return address   |  fp + 1 word
//!   | saved fp  -------+--> caller's frame
//!   lower addresses       <- fp
//! ```
//!
//! The walk starts at a given frame pointer and follows the saved links until
//! it reaches a zero link, which the boot code leaves at the bottom of the
//! initial stack.
//!
//! ## Guards
//!
//! A corrupted chain never reaches zero, or points at unmapped memory. The
//! walk is therefore bounded:
//!
//! 1. **Checked reads**: all memory goes through [`MemoryAccess`], which
//!    refuses reads outside its known range.
//! 2. **Ascending links**: each saved frame pointer must be above the current
//!    one. Stacks grow down, so a link that does not go up is corrupt, and
//!    this also rules out cycles.
//! 3. **Frame budget**: at most [`UnwindLimits::max_frames`] records.
//!
//! Tripping a guard yields one `Err` item and ends the iteration.

use tracing::{debug, warn};

use crate::error::{KmonError, KmonResult};
use crate::memory::MemoryAccess;
use crate::types::{Address, FrameRecord, ARG_WORDS};

/// Bounds applied to every walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwindLimits
{
    /// Maximum number of frame records emitted before giving up.
    pub max_frames: usize,
}

impl UnwindLimits
{
    /// Frame budget used when nothing else is configured.
    pub const DEFAULT_MAX_FRAMES: usize = 64;
}

impl Default for UnwindLimits
{
    fn default() -> Self
    {
        Self {
            max_frames: Self::DEFAULT_MAX_FRAMES,
        }
    }
}

/// Frame-pointer unwinder over a checked memory accessor.
///
/// ## Example
///
/// ```rust
/// use kmon_core::memory::MemorySnapshot;
/// use kmon_core::types::Address;
/// use kmon_core::unwind::{FramePointerUnwinder, UnwindLimits};
///
/// // One frame at 0x1000 whose saved link is zero.
/// let stack = MemorySnapshot::from_words(Address::from(0x1000), &[0, 0xdead, 1, 2, 3, 4, 5]);
/// let unwinder = FramePointerUnwinder::new(&stack, UnwindLimits::default());
/// let frames: Vec<_> = unwinder.frames(Address::from(0x1000)).collect::<Result<_, _>>().unwrap();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].return_address, Address::from(0xdead));
/// ```
pub struct FramePointerUnwinder<'a, M: ?Sized>
{
    memory: &'a M,
    limits: UnwindLimits,
}

impl<'a, M: MemoryAccess + ?Sized> FramePointerUnwinder<'a, M>
{
    /// Create an unwinder reading through `memory`.
    pub fn new(memory: &'a M, limits: UnwindLimits) -> Self
    {
        Self { memory, limits }
    }

    /// Lazily walk the chain starting at `frame_pointer`.
    ///
    /// The frame at `frame_pointer` is the first record; a zero start yields
    /// nothing.
    pub fn frames(&self, frame_pointer: Address) -> Frames<'a, M>
    {
        Frames {
            memory: self.memory,
            limits: self.limits,
            state: WalkState::Active(frame_pointer),
            previous: None,
            emitted: 0,
        }
    }

    /// Read the record at `frame_pointer` and the saved link it holds.
    ///
    /// ## Errors
    ///
    /// Any error from the memory accessor, or `OutOfRange` if the record would
    /// extend past the end of the address space.
    pub fn read_frame(&self, frame_pointer: Address) -> KmonResult<(FrameRecord, Address)>
    {
        read_frame(self.memory, frame_pointer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState
{
    Active(Address),
    Done,
}

/// Iterator returned by [`FramePointerUnwinder::frames`].
///
/// Yields records innermost first. After an `Err` item the iterator is
/// exhausted.
pub struct Frames<'a, M: ?Sized>
{
    memory: &'a M,
    limits: UnwindLimits,
    state: WalkState,
    previous: Option<Address>,
    emitted: usize,
}

impl<M: MemoryAccess + ?Sized> Frames<'_, M>
{
    fn fail(&mut self, error: KmonError) -> Option<KmonResult<FrameRecord>>
    {
        warn!(frames = self.emitted, %error, "backtrace stopped early");
        self.state = WalkState::Done;
        Some(Err(error))
    }
}

impl<M: MemoryAccess + ?Sized> Iterator for Frames<'_, M>
{
    type Item = KmonResult<FrameRecord>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let WalkState::Active(fp) = self.state else {
            return None;
        };

        if fp.is_zero() {
            debug!(frames = self.emitted, "reached end of frame chain");
            self.state = WalkState::Done;
            return None;
        }

        if let Some(current) = self.previous {
            if fp <= current {
                return self.fail(KmonError::FrameChainNotAscending { current, next: fp });
            }
        }

        if self.emitted >= self.limits.max_frames {
            return self.fail(KmonError::FrameLimitExceeded {
                limit: self.limits.max_frames,
            });
        }

        match read_frame(self.memory, fp) {
            Ok((record, next)) => {
                debug!(fp = %record.frame_pointer, ra = %record.return_address, next = %next, "frame");
                self.previous = Some(fp);
                self.state = WalkState::Active(next);
                self.emitted += 1;
                Some(Ok(record))
            }
            Err(error) => self.fail(error),
        }
    }
}

fn read_frame<M: MemoryAccess + ?Sized>(memory: &M, fp: Address) -> KmonResult<(FrameRecord, Address)>
{
    let word = |index: u64| -> KmonResult<u64> {
        let address = fp.word(index).ok_or(KmonError::OutOfRange { address: fp })?;
        memory.read_u64(address)
    };

    let next = Address::from(word(0)?);
    let return_address = Address::from(word(1)?);
    let mut args = [0u64; ARG_WORDS];
    for (slot, index) in args.iter_mut().zip(2u64..) {
        *slot = word(index)?;
    }

    Ok((
        FrameRecord {
            frame_pointer: fp,
            return_address,
            args,
        },
        next,
    ))
}
