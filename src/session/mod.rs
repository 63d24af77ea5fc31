//! The interactive record/play session.
//!
//! A single-threaded loop reads one key at a time and switches between idle,
//! recording and playing. The only state shared with other threads is the exit
//! flag, which signal handlers and capture events can set.

pub mod controller;

pub use controller::Session;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What the session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Playing,
}

/// A top-level command chosen from the idle menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Record,
    Play,
    Quit,
}

impl Command {
    /// Maps a key press to a command; other keys are ignored.
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            b'r' => Some(Self::Record),
            b'p' => Some(Self::Play),
            b'q' | crate::ui::keys::CTRL_C => Some(Self::Quit),
            _ => None,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user quit
    Quit,
    /// A fatal error was reported to the user
    Failed,
}

/// Process-wide request to stop, shared between the session, signal handlers and
/// key input.
#[derive(Debug, Clone, Default)]
pub struct ExitFlag(Arc<AtomicBool>);

impl ExitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag when the process receives SIGINT or SIGTERM (and SIGHUP on Unix).
    ///
    /// # Errors
    /// - If a signal handler cannot be installed
    pub fn register_signals(&self) -> io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&self.0))?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&self.0))?;
        #[cfg(unix)]
        signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&self.0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_keys() {
        assert_eq!(Command::from_key(114), Some(Command::Record));
        assert_eq!(Command::from_key(112), Some(Command::Play));
        assert_eq!(Command::from_key(113), Some(Command::Quit));
        assert_eq!(Command::from_key(0x03), Some(Command::Quit));
        assert_eq!(Command::from_key(b'R'), None);
        assert_eq!(Command::from_key(b'\r'), None);
    }

    #[test]
    fn test_exit_flag_is_shared_between_clones() {
        let flag = ExitFlag::new();
        let other = flag.clone();
        assert!(!other.is_set());
        flag.set();
        assert!(other.is_set());
    }
}
