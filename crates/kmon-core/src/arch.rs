//! Frame pointer register access.

use crate::types::Address;

/// Frame pointer register of the calling function.
///
/// Always inlined, so the value read is the caller's own frame (`rbp` on
/// x86-64, `x29` on AArch64). Returns `None` on other architectures.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn current_frame_pointer() -> Option<Address>
{
    let fp: u64;
    // SAFETY: copies a register, touches no memory.
    unsafe {
        std::arch::asm!("mov {fp}, rbp", fp = out(reg) fp, options(nomem, nostack, preserves_flags));
    }
    Some(Address::new(fp))
}

/// Frame pointer register of the calling function.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn current_frame_pointer() -> Option<Address>
{
    let fp: u64;
    // SAFETY: copies a register, touches no memory.
    unsafe {
        std::arch::asm!("mov {fp}, x29", fp = out(reg) fp, options(nomem, nostack, preserves_flags));
    }
    Some(Address::new(fp))
}

/// Frame pointer register of the calling function.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
pub fn current_frame_pointer() -> Option<Address>
{
    None
}
