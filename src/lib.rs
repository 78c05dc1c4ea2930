//! notebot: capture ideas, tasks and links into Notion from a chat.
//!
//! A chat platform (Telegram or the local console) feeds events into the
//! [`dispatcher`], which runs one [`conversation::CaptureFlow`] worker per
//! chat. The flow asks for a category, collects the content (transcribing
//! voice, enriching links) and writes the record through [`notion`].

pub mod cli;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod enrichment;
pub mod error;
pub mod notion;
pub mod runtime;
pub mod settings;
pub mod transcription;
