//! Run the bot until the platform closes or Ctrl-C is pressed.

use anyhow::{Context, Result};

use super::bootstrap::App;

pub async fn run(app: App) -> Result<()> {
    tracing::info!("Using settings from {}", app.settings_path.display());

    let shutdown = app.dispatcher.shutdown_token();
    let signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let result = app.dispatcher.run().await;
    signal.abort();

    result.context("Chat platform failed")?;
    tracing::info!("Stopped");
    Ok(())
}
