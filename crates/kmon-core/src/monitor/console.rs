//! Line sources for the monitor loop.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Where the monitor reads command lines from.
pub trait LineSource
{
    /// Show `prompt` and block until a line is available.
    ///
    /// Returns the line without its terminator, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

impl<S: LineSource + ?Sized> LineSource for &mut S
{
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>
    {
        (**self).read_line(prompt)
    }
}

fn trim_terminator(line: &mut String)
{
    while line.ends_with(|c| c == '\n' || c == '\r') {
        line.pop();
    }
}

/// Read one line from `reader` as bytes.
///
/// Invalid UTF-8 sequences become U+FFFD; a garbled line is still a line.
fn read_lossy_line<R: BufRead + ?Sized>(reader: &mut R, buffer: &mut Vec<u8>) -> io::Result<Option<String>>
{
    buffer.clear();
    if reader.read_until(b'\n', buffer)? == 0 {
        return Ok(None);
    }
    let mut line = String::from_utf8_lossy(buffer).into_owned();
    trim_terminator(&mut line);
    Ok(Some(line))
}

/// Interactive console on stdin, prompting on stdout.
#[derive(Debug, Default)]
pub struct StdinSource
{
    buffer: Vec<u8>,
}

impl StdinSource
{
    /// Console on the process's stdin.
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl LineSource for StdinSource
{
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>
    {
        let mut stdout = io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        drop(stdout);

        read_lossy_line(&mut io::stdin().lock(), &mut self.buffer)
    }
}

/// Pre-recorded lines, read in order.
///
/// Prompts are not shown unless [`ScriptSource::echo`] is on, in which case
/// each prompt and line is written to the echo sink the way a terminal would
/// show it.
#[derive(Debug, Default)]
pub struct ScriptSource
{
    lines: VecDeque<String>,
    echo: Option<Vec<u8>>,
}

impl ScriptSource
{
    /// Source that yields `lines` and then end of input.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            echo: None,
        }
    }

    /// Source over the lines of a script text.
    pub fn from_text(text: &str) -> Self
    {
        Self::new(text.lines())
    }

    /// Record prompts and lines as they are read.
    #[must_use]
    pub fn echo(mut self) -> Self
    {
        self.echo = Some(Vec::new());
        self
    }

    /// What has been echoed so far.
    pub fn transcript(&self) -> &[u8]
    {
        self.echo.as_deref().unwrap_or_default()
    }

    /// Lines not yet read.
    pub fn remaining(&self) -> usize
    {
        self.lines.len()
    }
}

impl LineSource for ScriptSource
{
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>
    {
        let line = self.lines.pop_front().map(|mut line| {
            trim_terminator(&mut line);
            line
        });
        if let (Some(echo), Some(line)) = (self.echo.as_mut(), line.as_ref()) {
            writeln!(echo, "{prompt}{line}")?;
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn script_yields_lines_then_end()
    {
        let mut source = ScriptSource::from_text("help\r\nkerninfo\n");
        assert_eq!(source.read_line("K> ").unwrap().as_deref(), Some("help"));
        assert_eq!(source.read_line("K> ").unwrap().as_deref(), Some("kerninfo"));
        assert_eq!(source.read_line("K> ").unwrap(), None);
        assert_eq!(source.read_line("K> ").unwrap(), None);
    }

    #[test]
    fn echo_records_prompt_and_line()
    {
        let mut source = ScriptSource::new(["help"]).echo();
        source.read_line("K> ").unwrap();
        assert_eq!(source.transcript(), b"K> help\n");
    }

    #[test]
    fn invalid_utf8_line_is_replaced_not_fatal()
    {
        let mut input = io::Cursor::new(b"help\n\xff\xfe\r\nkerninfo".to_vec());
        let mut buffer = Vec::new();
        assert_eq!(read_lossy_line(&mut input, &mut buffer).unwrap().as_deref(), Some("help"));
        assert_eq!(
            read_lossy_line(&mut input, &mut buffer).unwrap().as_deref(),
            Some("\u{fffd}\u{fffd}")
        );
        assert_eq!(read_lossy_line(&mut input, &mut buffer).unwrap().as_deref(), Some("kerninfo"));
        assert_eq!(read_lossy_line(&mut input, &mut buffer).unwrap(), None);
    }
}
