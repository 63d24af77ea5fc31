//! Terminal I/O for the interactive session.
//!
//! Provides single-key reads under a scoped raw mode and in-place line rendering.

pub mod console;
pub mod keys;
pub mod raw_mode;

pub use console::Console;
pub use keys::{CrosstermKeys, KeyInput};
pub use raw_mode::RawModeGuard;
