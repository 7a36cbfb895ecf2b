//! # Memory Access
//!
//! Checked word readers for the stack unwinder.
//!
//! The unwinder never dereferences an address directly. Every read goes
//! through [`MemoryAccess::read_u64`], and each implementation only answers
//! reads inside a range it knows to be mapped:
//!
//! - [`MemorySnapshot`]: a copy of a stack region (a dump file, or a
//!   synthetic stack built by tests)
//! - [`LiveStack`]: the calling thread's own stack, from the current frame up
//!   to the top of the stack mapping
//!
//! Reads outside the range fail with [`KmonError::OutOfRange`] instead of
//! faulting, which turns a corrupted frame chain into a reportable error.

use std::fs;
use std::ops::Range;
use std::path::Path;

use tracing::trace;

use crate::error::{KmonError, KmonResult};
use crate::types::Address;

/// Minimal memory accessor required for stack unwinding.
///
/// ## Implementation Notes
///
/// Implementations should:
/// - Return `OutOfRange` for anything they cannot vouch for (never fault)
/// - Return `Unaligned` for addresses that are not word aligned
/// - Decode words in the target's byte order (little-endian here)
pub trait MemoryAccess
{
    /// Read a 64-bit word from the given address.
    fn read_u64(&self, address: Address) -> KmonResult<u64>;
}

impl<M: MemoryAccess + ?Sized> MemoryAccess for &M
{
    fn read_u64(&self, address: Address) -> KmonResult<u64>
    {
        (**self).read_u64(address)
    }
}

/// A copied region of memory starting at `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot
{
    base: Address,
    bytes: Vec<u8>,
}

impl MemorySnapshot
{
    /// Wrap raw bytes that were mapped at `base`.
    pub fn new(base: Address, bytes: Vec<u8>) -> Self
    {
        Self { base, bytes }
    }

    /// Build a snapshot from little-endian words.
    ///
    /// ```rust
    /// use kmon_core::memory::{MemoryAccess, MemorySnapshot};
    /// use kmon_core::types::Address;
    ///
    /// let stack = MemorySnapshot::from_words(Address::from(0x1000), &[7, 8]);
    /// assert_eq!(stack.read_u64(Address::from(0x1008)).unwrap(), 8);
    /// assert!(stack.read_u64(Address::from(0x1010)).is_err());
    /// ```
    pub fn from_words(base: Address, words: &[u64]) -> Self
    {
        let bytes = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        Self { base, bytes }
    }

    /// Read a raw stack dump from disk.
    pub fn load(path: impl AsRef<Path>, base: Address) -> KmonResult<Self>
    {
        let bytes = fs::read(path.as_ref())?;
        Ok(Self::new(base, bytes))
    }

    /// Address of the first byte.
    pub fn base(&self) -> Address
    {
        self.base
    }

    /// Address one past the last byte.
    pub fn end(&self) -> Address
    {
        self.base + self.bytes.len() as u64
    }

    /// Number of bytes in the snapshot.
    pub fn len(&self) -> usize
    {
        self.bytes.len()
    }

    /// `true` if the snapshot holds no bytes.
    pub fn is_empty(&self) -> bool
    {
        self.bytes.is_empty()
    }
}

impl MemoryAccess for MemorySnapshot
{
    fn read_u64(&self, address: Address) -> KmonResult<u64>
    {
        if !address.is_word_aligned() {
            return Err(KmonError::Unaligned { address });
        }

        let out_of_range = || KmonError::OutOfRange { address };
        let start = usize::try_from(address.offset_from(self.base).ok_or_else(out_of_range)?)
            .map_err(|_| out_of_range())?;
        let end = start.checked_add(8).ok_or_else(out_of_range)?;
        let word: [u8; 8] = self
            .bytes
            .get(start..end)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(out_of_range)?;
        Ok(u64::from_le_bytes(word))
    }
}

/// The calling thread's own stack, readable from a given frame upward.
///
/// The lower bound is the frame pointer the walk starts from, which is at or
/// above the current stack pointer, so everything in range is mapped and
/// live. The upper bound is the top of the thread's stack mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStack
{
    range: Range<u64>,
}

impl LiveStack
{
    /// Stack region of the current thread from `frame_pointer` to its top.
    ///
    /// ## Errors
    ///
    /// - `Unsupported` on platforms where the stack bounds cannot be queried
    /// - `OutOfRange` if `frame_pointer` is not inside the current stack
    pub fn containing(frame_pointer: Address) -> KmonResult<Self>
    {
        let stack = current_thread_stack()?;
        trace!(low = stack.start, high = stack.end, "thread stack bounds");
        if !stack.contains(&frame_pointer.value()) {
            return Err(KmonError::OutOfRange { address: frame_pointer });
        }
        Ok(Self {
            range: frame_pointer.value()..stack.end,
        })
    }

    /// Readable addresses.
    pub fn range(&self) -> Range<Address>
    {
        Address::new(self.range.start)..Address::new(self.range.end)
    }
}

impl MemoryAccess for LiveStack
{
    fn read_u64(&self, address: Address) -> KmonResult<u64>
    {
        if !address.is_word_aligned() {
            return Err(KmonError::Unaligned { address });
        }
        let end = address
            .checked_add(Address::WORD_SIZE)
            .ok_or(KmonError::OutOfRange { address })?;
        if address.value() < self.range.start || end.value() > self.range.end {
            return Err(KmonError::OutOfRange { address });
        }

        let pointer = address.value() as usize as *const u64;
        // SAFETY: the word lies between a live frame of the calling thread and
        // the top of that thread's stack mapping, so it is mapped and readable.
        // Volatile because the compiler knows nothing about this memory.
        Ok(unsafe { pointer.read_volatile() })
    }
}

#[cfg(target_os = "linux")]
fn current_thread_stack() -> KmonResult<Range<u64>>
{
    use std::mem::MaybeUninit;

    let mut attr = MaybeUninit::<libc::pthread_attr_t>::uninit();
    // SAFETY: pthread_getattr_np initialises `attr` on success; it is only
    // read and destroyed after that.
    unsafe {
        let rc = libc::pthread_getattr_np(libc::pthread_self(), attr.as_mut_ptr());
        if rc != 0 {
            return Err(std::io::Error::from_raw_os_error(rc).into());
        }

        let mut stack_addr: *mut libc::c_void = std::ptr::null_mut();
        let mut stack_size: libc::size_t = 0;
        let rc = libc::pthread_attr_getstack(attr.as_ptr(), &mut stack_addr, &mut stack_size);
        libc::pthread_attr_destroy(attr.as_mut_ptr());
        if rc != 0 {
            return Err(std::io::Error::from_raw_os_error(rc).into());
        }

        let low = stack_addr as u64;
        Ok(low..low.saturating_add(stack_size as u64))
    }
}

#[cfg(not(target_os = "linux"))]
fn current_thread_stack() -> KmonResult<Range<u64>>
{
    Err(KmonError::Unsupported("thread stack bounds are only known on Linux".into()))
}
