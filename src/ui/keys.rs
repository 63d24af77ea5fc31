//! Single-keystroke input.
//!
//! Keys are reported as bytes so the session only deals in plain commands
//! (`r`, `p`, `q`); special keys map to their control codes.

use super::raw_mode::{CrosstermMode, RawModeGuard, TerminalMode};
use crate::session::ExitFlag;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::time::Duration;

/// Byte reported for Ctrl+C.
pub const CTRL_C: u8 = 0x03;

/// Byte reported for keys with no single-byte equivalent (arrows, function keys).
pub const UNMAPPED_KEY: u8 = 0;

/// How often a blocking read wakes up to check the exit flag.
const EXIT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// A source of single key presses.
pub trait KeyInput {
    type Mode: TerminalMode;

    /// The terminal whose mode must be raw while keys are read.
    fn mode(&self) -> &Self::Mode;

    /// Reads the next key, assuming raw mode is already active.
    ///
    /// With `timeout` set, returns `None` when no key arrives in time; `Some(ZERO)`
    /// makes this a non-blocking read. With `None` it blocks until a key arrives.
    fn next_key(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>>;

    /// Blocks for exactly one key press inside a raw-mode scope.
    ///
    /// The previous terminal mode is restored before returning, whether the read
    /// succeeded, failed or was interrupted.
    fn read_key(&mut self) -> io::Result<u8> {
        let mode = self.mode().clone();
        let _raw = RawModeGuard::acquire(&mode)?;
        loop {
            if let Some(key) = self.next_key(None)? {
                return Ok(key);
            }
        }
    }

    /// Returns a key if one is already waiting, without blocking.
    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        self.next_key(Some(Duration::ZERO))
    }
}

/// Reads keys from the controlling terminal through crossterm's event queue.
pub struct CrosstermKeys {
    mode: CrosstermMode,
    exit: ExitFlag,
}

impl CrosstermKeys {
    /// Creates a key reader that gives up blocking reads once `exit` is set.
    pub fn new(exit: ExitFlag) -> Self {
        Self {
            mode: CrosstermMode,
            exit,
        }
    }

    fn wait_for_key(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key_to_byte(&key))),
            _ => Ok(None),
        }
    }
}

impl KeyInput for CrosstermKeys {
    type Mode = CrosstermMode;

    fn mode(&self) -> &CrosstermMode {
        &self.mode
    }

    fn next_key(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        match timeout {
            Some(timeout) => self.wait_for_key(timeout),
            None => loop {
                if self.exit.is_set() {
                    return Err(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "exit requested while waiting for a key",
                    ));
                }
                if let Some(key) = self.wait_for_key(EXIT_CHECK_INTERVAL)? {
                    return Ok(Some(key));
                }
            },
        }
    }
}

/// Maps a key event to the byte a raw terminal read would have produced.
pub fn key_to_byte(key: &KeyEvent) -> u8 {
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            CTRL_C
        }
        KeyCode::Char(c) if c.is_ascii() => c as u8,
        KeyCode::Enter => b'\r',
        KeyCode::Esc => 0x1b,
        KeyCode::Backspace => 0x7f,
        KeyCode::Tab => b'\t',
        _ => UNMAPPED_KEY,
    }
}
