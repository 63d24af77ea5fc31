//! Command handlers for sudovoice.
//!
//! # Commands
//! - `session`: the interactive record/play loop (default)
//! - `list_devices`: list audio input and output devices
//! - `logs`: display recent log entries

pub mod list_devices;
pub mod logs;
pub mod session;

pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use session::handle_session;
