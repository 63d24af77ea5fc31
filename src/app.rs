//! Application orchestration and command routing.
//!
//! Parses command-line arguments and delegates to the command handlers.

use crate::commands;
use crate::logging;
use crate::session::SessionEnd;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// Record a short voice sample with a live volume meter, then play it back
#[derive(Parser)]
#[command(name = "sudovoice")]
#[command(version)]
#[command(long_about = "Record a short voice sample with a live volume meter, then play it back.\n\nKEYS:\n    r   record (press any key to start, any key to stop)\n    p   play the recording\n    q   quit\n\nEXAMPLES:\n    # Record to ~/.sudovoice/recording.m4a\n    $ sudovoice\n\n    # Record to a specific file\n    $ sudovoice --out-file ./hello.m4a")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/sudovoice/sudovoice.toml\n    Logs:               ~/.local/state/sudovoice/sudovoice.log.*"
)]
struct Cli {
    /// File to record to (default: ~/.sudovoice/recording.m4a)
    #[arg(long, value_name = "PATH")]
    out_file: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available audio input and output devices
    ///
    /// Shows device IDs and names to use for audio.input_device and
    /// audio.output_device in sudovoice.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   sudovoice completions bash > sudovoice.bash
    ///   sudovoice completions zsh > _sudovoice
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success (the user quit)
/// - 1: Any fatal error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If a command fails in a way not already reported to the user
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "sudovoice", &mut io::stdout());
            Ok(())
        }
        Some(Commands::ListDevices) => commands::handle_list_devices(),
        Some(Commands::Logs) => commands::handle_logs(),
        None => {
            logging::init_logging()?;
            match commands::handle_session(cli.out_file).await? {
                SessionEnd::Quit => Ok(()),
                SessionEnd::Failed => process::exit(1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_out_file_flag() {
        let cli = Cli::try_parse_from(["sudovoice", "--out-file", "/tmp/take.m4a"]).unwrap();
        assert_eq!(cli.out_file.as_deref(), Some("/tmp/take.m4a"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_out_file_is_optional() {
        let cli = Cli::try_parse_from(["sudovoice"]).unwrap();
        assert!(cli.out_file.is_none());
    }

    #[test]
    fn test_list_devices_subcommand() {
        let cli = Cli::try_parse_from(["sudovoice", "list-devices"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::ListDevices)));
    }
}
