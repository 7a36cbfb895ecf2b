//! Symbol lookup result types.

use std::fmt;

use super::Address;

/// Text rendered in place of any symbol field the resolver could not find.
pub const UNKNOWN: &str = "<unknown>";

/// A function name with an explicit display length.
///
/// Symbol sources do not always end the name where it should stop being
/// printed. Stab strings, for instance, look like `mon_backtrace:F(0,1)` and
/// only the part before the colon is the name. The full text is kept and
/// [`FunctionName::as_str`] returns the first `len` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName
{
    text: String,
    len: usize,
}

impl FunctionName
{
    /// Name displayed in full.
    pub fn new(text: impl Into<String>) -> Self
    {
        let text = text.into();
        let len = text.len();
        Self { text, len }
    }

    /// Name displayed up to `len` bytes.
    ///
    /// The length is clamped to the text and moved back to a character
    /// boundary, so a bad length can never split a UTF-8 sequence.
    pub fn with_len(text: impl Into<String>, len: usize) -> Self
    {
        let text = text.into();
        let mut len = len.min(text.len());
        while !text.is_char_boundary(len) {
            len -= 1;
        }
        Self { text, len }
    }

    /// Name from a stab-style string, displayed up to the first `:`.
    ///
    /// ```rust
    /// use kmon_core::types::FunctionName;
    ///
    /// let name = FunctionName::stab("mon_backtrace:F(0,1)");
    /// assert_eq!(name.as_str(), "mon_backtrace");
    /// assert_eq!(name.len(), 13);
    /// ```
    pub fn stab(text: impl Into<String>) -> Self
    {
        let text = text.into();
        let len = text.find(':').unwrap_or(text.len());
        Self { text, len }
    }

    /// The displayed part of the name.
    pub fn as_str(&self) -> &str
    {
        &self.text[..self.len]
    }

    /// The full text as the symbol source supplied it.
    pub fn raw(&self) -> &str
    {
        &self.text
    }

    /// Display length in bytes.
    pub fn len(&self) -> usize
    {
        self.len
    }

    /// `true` if nothing would be displayed.
    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }
}

impl fmt::Display for FunctionName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

/// Best-effort symbolic metadata for one address.
///
/// Every field is independently optional: `None` means the resolver found
/// nothing, which is different from a field that was found but is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolInfo
{
    /// Source file containing the address.
    pub file: Option<String>,
    /// Source line of the address.
    pub line: Option<u32>,
    /// Enclosing function.
    pub function: Option<FunctionName>,
    /// First instruction of the enclosing function.
    pub function_start: Option<Address>,
}

impl SymbolInfo
{
    /// Info with every field absent.
    pub const fn unknown() -> Self
    {
        Self {
            file: None,
            line: None,
            function: None,
            function_start: None,
        }
    }

    /// `true` if the resolver found nothing at all.
    pub fn is_unknown(&self) -> bool
    {
        self.file.is_none() && self.line.is_none() && self.function.is_none() && self.function_start.is_none()
    }

    /// Byte offset of `address` into the enclosing function.
    ///
    /// `None` when the function start is unknown or lies above `address`.
    pub fn offset_of(&self, address: Address) -> Option<u64>
    {
        self.function_start.and_then(|start| address.offset_from(start))
    }
}
