//! sudovoice: record a voice sample from the terminal and play it back.

mod app;
mod commands;
mod config;
mod logging;
mod output_path;
mod playback;
mod recording;
mod session;
mod ui;

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
