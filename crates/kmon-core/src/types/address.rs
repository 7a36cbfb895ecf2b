//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::KmonError;

/// Strongly typed memory address
///
/// Frame pointers, return addresses and symbol starts all travel through the
/// monitor as `Address` so they cannot be confused with the raw argument words
/// or sizes printed next to them.
///
/// Addresses are 64 bits wide. Arithmetic via `+`/`-` wraps (the monitor prints
/// whatever it finds); the unwinder uses the checked variants.
///
/// ## Example
///
/// ```rust
/// use kmon_core::types::Address;
///
/// let fp = Address::from(0x1000);
/// assert_eq!(fp.word(1), Some(Address::from(0x1008)));
/// assert_eq!(format!("{fp}"), "0x0000000000001000");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address, which also terminates a frame-pointer chain
    pub const ZERO: Self = Address(0);

    /// Size in bytes of the machine word the unwinder reads
    pub const WORD_SIZE: u64 = 8;

    /// Create a new address from a `u64` value
    ///
    /// Usable in const contexts, e.g. for layout constants.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// `true` for the zero address
    pub const fn is_zero(self) -> bool
    {
        self.0 == 0
    }

    /// `true` if the address is a multiple of the machine word size
    pub const fn is_word_aligned(self) -> bool
    {
        self.0 % Self::WORD_SIZE == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use kmon_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Address of the `index`-th machine word above this one
    ///
    /// Returns `None` if the computation overflows.
    pub fn word(self, index: u64) -> Option<Self>
    {
        index
            .checked_mul(Self::WORD_SIZE)
            .and_then(|offset| self.checked_add(offset))
    }

    /// Distance in bytes from `base` up to this address, if `base <= self`
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Parses `0x`-prefixed hex or plain decimal, the forms accepted on the
/// command line.
impl FromStr for Address
{
    type Err = KmonError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
            None => trimmed.replace('_', "").parse::<u64>(),
        };
        parsed
            .map(Address)
            .map_err(|err| KmonError::InvalidArgument(format!("bad address '{s}': {err}")))
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
