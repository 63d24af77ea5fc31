//! Configuration management for sudovoice.

pub mod file;

pub use file::SudovoiceConfig;
