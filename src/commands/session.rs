//! The interactive record/play session command.

use crate::config::SudovoiceConfig;
use crate::output_path::resolve_output_location;
use crate::playback::CpalPlayback;
use crate::recording::{event_channel, CpalCapture};
use crate::session::{ExitFlag, Session, SessionEnd};
use crate::ui::{Console, CrosstermKeys};
use anyhow::anyhow;

/// Resolves the recording file, then runs the interactive session until the user
/// quits or a fatal error occurs.
///
/// Returns `SessionEnd::Failed` when a problem was already reported to the user.
///
/// # Errors
/// - If configuration cannot be loaded
/// - If the terminal cannot be read or written
pub async fn handle_session(out_file: Option<String>) -> Result<SessionEnd, anyhow::Error> {
    tracing::info!("=== sudovoice started ===");

    let out_file = out_file.unwrap_or_default();
    let mut console = Console::stdout();

    let destination = match resolve_output_location(&out_file, dirs::home_dir().as_deref()) {
        Ok(destination) => destination,
        Err(e) => {
            tracing::error!("Unusable output location: {}", e);
            console.error(&e.to_string())?;
            return Ok(SessionEnd::Failed);
        }
    };
    if !out_file.is_empty() {
        console.line(&format!("Using output file: {}", destination.display()))?;
    }

    let config = SudovoiceConfig::load()?;
    tracing::info!(
        "Devices: input={}, output={}",
        config.audio.input_device,
        config.audio.output_device
    );

    let exit = ExitFlag::new();
    exit.register_signals()
        .map_err(|e| anyhow!("Failed to register signal handlers: {e}"))?;

    // cpal streams are not Send everywhere, so the devices are created on the
    // thread that uses them.
    let end = tokio::task::spawn_blocking(move || {
        let (events_tx, events_rx) = event_channel();
        let mut session = Session::new(
            CrosstermKeys::new(exit.clone()),
            console,
            CpalCapture::new(config.audio.input_device, events_tx),
            CpalPlayback::new(config.audio.output_device),
            destination,
            events_rx,
            exit,
        );
        session.run()
    })
    .await
    .map_err(|e| anyhow!("Session task failed: {e}"))??;

    tracing::info!("=== sudovoice exited ({:?}) ===", end);
    Ok(end)
}
