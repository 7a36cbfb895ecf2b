//! Command line tokenizer.

use std::fmt;
use std::ops::Deref;

use smallvec::SmallVec;

use crate::error::{KmonError, KmonResult};

/// Characters that separate tokens.
pub const WHITESPACE: [char; 4] = ['\t', '\r', '\n', ' '];

/// Capacity of an argument vector.
///
/// One slot is kept for the terminator a C-style `argv` carries, so a line
/// holds at most `MAX_ARGS - 1` tokens.
pub const MAX_ARGS: usize = 16;

/// Tokens of one input line, borrowed from it.
///
/// Dereferences to a slice of tokens; `argv[0]` is the command name.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Argv<'a>
{
    tokens: SmallVec<[&'a str; MAX_ARGS]>,
}

impl<'a> Argv<'a>
{
    /// Command name, if the line had any tokens.
    pub fn command(&self) -> Option<&'a str>
    {
        self.tokens.first().copied()
    }

    /// Tokens after the command name.
    pub fn args(&self) -> &[&'a str]
    {
        self.tokens.get(1..).unwrap_or_default()
    }
}

impl<'a> Deref for Argv<'a>
{
    type Target = [&'a str];

    fn deref(&self) -> &Self::Target
    {
        &self.tokens
    }
}

impl fmt::Debug for Argv<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_list().entries(self.tokens.iter()).finish()
    }
}

fn is_separator(c: char) -> bool
{
    WHITESPACE.contains(&c)
}

/// Split `line` into tokens.
///
/// Runs of [`WHITESPACE`] separate tokens; no quoting or escaping. An empty
/// or all-separator line gives an empty vector.
///
/// ## Errors
///
/// `TooManyArguments` if the line has more than `MAX_ARGS - 1` tokens. No
/// partial vector is returned.
///
/// ## Example
///
/// ```rust
/// use kmon_core::monitor::tokenize;
///
/// let argv = tokenize("  backtrace\t 3\r\n").unwrap();
/// assert_eq!(&*argv, &["backtrace", "3"]);
/// assert!(tokenize(" \t ").unwrap().is_empty());
/// ```
pub fn tokenize(line: &str) -> KmonResult<Argv<'_>>
{
    let mut tokens = SmallVec::new();
    for token in line.split(is_separator).filter(|token| !token.is_empty()) {
        if tokens.len() == MAX_ARGS - 1 {
            return Err(KmonError::TooManyArguments { max: MAX_ARGS });
        }
        tokens.push(token);
    }
    Ok(Argv { tokens })
}
