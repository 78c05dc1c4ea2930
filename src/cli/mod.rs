//! Command-line entry: argument parsing, service wiring and the run loop.
//!
//! ```text
//! Args --> initialize() --> App { Dispatcher } --> run()
//!                 |
//!                 +-- TelegramPlatform | ConsolePlatform
//!                 +-- CaptureFlow (Notion, Whisper, readability + OpenAI)
//! ```

mod args;
mod bootstrap;
mod runner;

pub use args::Args;
pub use bootstrap::{initialize, App};
pub use runner::run;
