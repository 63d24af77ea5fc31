//! Line-oriented terminal output.
//!
//! Everything the session shows lives on the current line: the menu, prompts and
//! the volume meter are redrawn in place with `clear_line`. Line breaks are written
//! as `\r\n` so output looks the same in raw and cooked mode.

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Stdout, Write};

/// Writes status text, prompts and the meter to a terminal.
pub struct Console<W: Write> {
    out: W,
}

impl Console<Stdout> {
    /// Console on standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Appends `text` to the current line, optionally coloured and bold.
    ///
    /// # Errors
    /// - If the terminal cannot be written
    pub fn write(&mut self, text: &str, color: Option<Color>, bold: bool) -> io::Result<()> {
        if let Some(color) = color {
            queue!(self.out, SetForegroundColor(color))?;
        }
        if bold {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        queue!(self.out, Print(text))?;
        if bold {
            queue!(self.out, SetAttribute(Attribute::Reset))?;
        }
        if color.is_some() {
            queue!(self.out, ResetColor)?;
        }
        self.out.flush()
    }

    /// Erases the current line and moves the cursor back to its start.
    pub fn clear_line(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::CurrentLine), MoveToColumn(0))?;
        self.out.flush()
    }

    /// Moves to the start of the next line.
    pub fn end_line(&mut self) -> io::Result<()> {
        queue!(self.out, Print("\r\n"))?;
        self.out.flush()
    }

    /// Writes a complete plain line.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        self.write(text, None, false)?;
        self.end_line()
    }

    /// Writes a complete red, bold line.
    pub fn error(&mut self, text: &str) -> io::Result<()> {
        self.write(text, Some(Color::Red), true)?;
        self.end_line()
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(console: &Console<Vec<u8>>) -> String {
        String::from_utf8_lossy(console.get_ref()).to_string()
    }

    #[test]
    fn test_plain_write() {
        let mut console = Console::new(Vec::new());
        console.write("hello", None, false).unwrap();
        assert_eq!(output(&console), "hello");
    }

    #[test]
    fn test_styled_write_resets_style() {
        let mut console = Console::new(Vec::new());
        console.write("....", Some(Color::Red), true).unwrap();
        let text = output(&console);

        assert!(text.contains("...."));
        let bold_on = text.find("\x1b[1m").unwrap();
        let reset = text.rfind("\x1b[0m").unwrap();
        let body = text.find("....").unwrap();
        assert!(bold_on < body && body < reset);
    }

    #[test]
    fn test_clear_line_emits_erase_sequence() {
        let mut console = Console::new(Vec::new());
        console.clear_line().unwrap();
        assert!(output(&console).contains("\x1b[2K"));
    }

    #[test]
    fn test_lines_end_with_carriage_return() {
        let mut console = Console::new(Vec::new());
        console.line("ready").unwrap();
        assert_eq!(output(&console), "ready\r\n");
    }
}
