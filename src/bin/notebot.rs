//! notebot - chat bot that saves ideas, tasks and links into Notion
//!
//! # Usage
//!
//! ```bash
//! # Telegram long polling (TELEGRAM_TOKEN from .env or settings)
//! ./target/debug/notebot
//!
//! # Talk to the bot in this terminal
//! ./target/debug/notebot --console
//!
//! # Explicit settings file with debug logging
//! ./target/debug/notebot --config ./settings.toml -v
//! ```

use anyhow::Result;
use clap::Parser;

use notebot_lib::cli::{initialize, run, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let app = initialize(&args).await?;
    run(app).await
}
