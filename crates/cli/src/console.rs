//! Line-oriented prompt helpers.

use std::{
    fmt::Display,
    io::{self, BufRead, Write},
    str::FromStr,
};

use chrono::NaiveDate;
use mindtrack_core::store::parse_calendar_date;

/// Blocking prompts over any reader/writer pair. Each `read_*` method keeps
/// asking until the input is valid; end of input is reported as
/// [`io::ErrorKind::UnexpectedEof`].
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn println(&mut self, message: impl Display) -> io::Result<()> {
        writeln!(self.output, "{message}")
    }

    /// Non-empty, trimmed line.
    pub fn read_non_empty(&mut self, prompt: &str) -> io::Result<String> {
        loop {
            let line = self.prompt(prompt)?;
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }

    /// Integer within `min..=max`.
    pub fn read_int<T>(&mut self, prompt: &str, min: T, max: T) -> io::Result<T>
    where
        T: FromStr + PartialOrd,
    {
        loop {
            let line = self.prompt(prompt)?;
            if let Ok(value) = line.parse::<T>() {
                if value >= min && value <= max {
                    return Ok(value);
                }
            }
        }
    }

    /// Calendar date as `YYYY-MM-DD`.
    pub fn read_date(&mut self, prompt: &str) -> io::Result<NaiveDate> {
        loop {
            let line = self.prompt(prompt)?;
            if let Some(date) = parse_calendar_date(&line) {
                return Ok(date);
            }
        }
    }

    /// Anything containing both `@` and `.`.
    pub fn read_email(&mut self, prompt: &str) -> io::Result<String> {
        loop {
            let line = self.prompt(prompt)?;
            if line.contains('@') && line.contains('.') {
                return Ok(line);
            }
        }
    }

    fn prompt(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed",
            ));
        }
        Ok(line.trim().to_string())
    }
}
