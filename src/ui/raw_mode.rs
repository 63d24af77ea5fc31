//! Scoped raw terminal mode.
//!
//! `RawModeGuard` switches the terminal into raw mode (no line buffering, no echo)
//! and switches it back when dropped, so early returns, errors and unwinding all
//! leave the terminal the way it was found.

use crossterm::terminal;
use std::io;

/// Access to the terminal driver's raw/cooked setting.
pub trait TerminalMode: Clone {
    /// Returns whether raw mode is currently enabled.
    fn is_raw(&self) -> io::Result<bool>;

    /// Enables or disables raw mode.
    fn set_raw(&self, raw: bool) -> io::Result<()>;
}

/// The controlling terminal, driven through crossterm.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermMode;

impl TerminalMode for CrosstermMode {
    fn is_raw(&self) -> io::Result<bool> {
        terminal::is_raw_mode_enabled()
    }

    fn set_raw(&self, raw: bool) -> io::Result<()> {
        if raw {
            terminal::enable_raw_mode()
        } else {
            terminal::disable_raw_mode()
        }
    }
}

/// Holds raw mode for its lifetime.
///
/// Nested guards are cheap: a guard taken while raw mode is already on leaves it on
/// when dropped, and only the outermost guard restores cooked mode.
#[must_use = "raw mode is released as soon as the guard is dropped"]
pub struct RawModeGuard<M: TerminalMode> {
    mode: M,
    restore_cooked: bool,
}

impl<M: TerminalMode> RawModeGuard<M> {
    /// Enables raw mode, remembering whether it has to be turned off again.
    ///
    /// # Errors
    /// - If the terminal attributes cannot be read or changed
    pub fn acquire(mode: &M) -> io::Result<Self> {
        let was_raw = mode.is_raw()?;
        if !was_raw {
            mode.set_raw(true)?;
        }
        Ok(Self {
            mode: mode.clone(),
            restore_cooked: !was_raw,
        })
    }
}

impl<M: TerminalMode> Drop for RawModeGuard<M> {
    fn drop(&mut self) {
        if self.restore_cooked {
            if let Err(e) = self.mode.set_raw(false) {
                tracing::error!("Failed to restore terminal mode: {}", e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// In-memory terminal mode that counts transitions.
    #[derive(Clone, Default)]
    pub(crate) struct FakeMode {
        pub raw: Rc<Cell<bool>>,
        pub enabled: Rc<Cell<u32>>,
        pub disabled: Rc<Cell<u32>>,
    }

    impl TerminalMode for FakeMode {
        fn is_raw(&self) -> io::Result<bool> {
            Ok(self.raw.get())
        }

        fn set_raw(&self, raw: bool) -> io::Result<()> {
            if raw {
                self.enabled.set(self.enabled.get() + 1);
            } else {
                self.disabled.set(self.disabled.get() + 1);
            }
            self.raw.set(raw);
            Ok(())
        }
    }

    #[test]
    fn test_guard_restores_cooked_mode() {
        let mode = FakeMode::default();
        {
            let _guard = RawModeGuard::acquire(&mode).unwrap();
            assert!(mode.raw.get());
        }
        assert!(!mode.raw.get());
        assert_eq!(mode.enabled.get(), 1);
        assert_eq!(mode.disabled.get(), 1);
    }

    #[test]
    fn test_nested_guard_keeps_outer_raw_mode() {
        let mode = FakeMode::default();
        let outer = RawModeGuard::acquire(&mode).unwrap();
        {
            let _inner = RawModeGuard::acquire(&mode).unwrap();
        }
        assert!(mode.raw.get(), "inner guard must not leave raw mode");
        drop(outer);
        assert!(!mode.raw.get());
        assert_eq!(mode.disabled.get(), 1);
    }

    #[test]
    fn test_guard_restores_on_early_error() {
        fn failing_read(mode: &FakeMode) -> io::Result<u8> {
            let _guard = RawModeGuard::acquire(mode)?;
            Err(io::Error::new(io::ErrorKind::Interrupted, "signal"))
        }

        let mode = FakeMode::default();
        assert!(failing_read(&mode).is_err());
        assert!(!mode.raw.get());
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let mode = FakeMode::default();
        let inner = mode.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RawModeGuard::acquire(&inner).unwrap();
            panic!("read blew up");
        }));
        assert!(result.is_err());
        assert!(!mode.raw.get());
    }
}
