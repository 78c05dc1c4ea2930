//! Local console platform: one chat driven from stdin.
//!
//! Supports:
//! - `/quit`, `/exit`, `/q` - stop the bot
//! - any other line - delivered as a text message (or a command)
//!
//! Voice messages cannot be produced from a terminal.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::{ChatPlatform, PlatformError, VoiceSource};
use crate::conversation::{ChatId, Incoming, Keyboard, Reply, VoiceRef};

/// The single chat of a console session
pub const CONSOLE_CHAT: ChatId = 0;

/// One line of console input.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Quit,
    Empty,
    Message(String),
}

impl ConsoleInput {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ConsoleInput::Empty;
        }
        match trimmed.to_lowercase().as_str() {
            "/quit" | "/exit" | "/q" => ConsoleInput::Quit,
            _ => ConsoleInput::Message(trimmed.to_string()),
        }
    }
}

pub struct ConsolePlatform {
    lines: Mutex<mpsc::Receiver<String>>,
}

impl ConsolePlatform {
    /// Start reading stdin on a dedicated thread.
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::channel(16);

        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });

        eprintln!("notebot console mode");
        eprintln!("Send /start to begin, /quit to exit\n");

        Self::from_receiver(rx)
    }

    pub fn from_receiver(lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }
}

#[async_trait]
impl ChatPlatform for ConsolePlatform {
    async fn next_events(&self) -> Result<Vec<(ChatId, Incoming)>, PlatformError> {
        let mut lines = self.lines.lock().await;
        loop {
            let Some(line) = lines.recv().await else {
                // EOF (Ctrl+D)
                return Err(PlatformError::Closed);
            };
            match ConsoleInput::parse(&line) {
                ConsoleInput::Empty => continue,
                ConsoleInput::Quit => return Err(PlatformError::Closed),
                ConsoleInput::Message(text) => {
                    return Ok(vec![(CONSOLE_CHAT, Incoming::from_text(text))])
                }
            }
        }
    }

    async fn send(&self, _chat: ChatId, reply: &Reply) -> Result<(), PlatformError> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", render(reply))?;
        stdout.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }

    async fn shutdown(&self) -> Result<(), PlatformError> {
        io::stdout().flush()?;
        Ok(())
    }
}

#[async_trait]
impl VoiceSource for ConsolePlatform {
    async fn download_voice(&self, _voice: &VoiceRef) -> Result<Vec<u8>, PlatformError> {
        Err(PlatformError::Unsupported("voice messages"))
    }
}

/// Reply text followed by keyboard rows as `[label]` buttons.
fn render(reply: &Reply) -> String {
    let mut out = format!("bot> {}", reply.text);
    if let Keyboard::Choices(rows) = &reply.keyboard {
        for row in rows {
            let buttons: Vec<String> = row.iter().map(|label| format!("[{}]", label)).collect();
            out.push_str("\n     ");
            out.push_str(&buttons.join(" "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{category_keyboard, Command};

    #[test]
    fn parse_quit_variants() {
        assert_eq!(ConsoleInput::parse("/quit"), ConsoleInput::Quit);
        assert_eq!(ConsoleInput::parse("/EXIT"), ConsoleInput::Quit);
        assert_eq!(ConsoleInput::parse("  /q  "), ConsoleInput::Quit);
    }

    #[test]
    fn parse_messages_and_empty() {
        assert_eq!(ConsoleInput::parse("   \n"), ConsoleInput::Empty);
        assert_eq!(
            ConsoleInput::parse(" Идея \n"),
            ConsoleInput::Message("Идея".to_string())
        );
    }

    #[test]
    fn renders_keyboard_rows() {
        let rendered = render(&Reply::with_keyboard("Выбери", category_keyboard()));
        assert_eq!(rendered, "bot> Выбери\n     [Идея] [Задача] [Ссылка]");
        assert_eq!(render(&Reply::removing_keyboard("ok")), "bot> ok");
    }

    #[tokio::test]
    async fn lines_become_events_until_quit() {
        let (tx, rx) = mpsc::channel(8);
        let platform = ConsolePlatform::from_receiver(rx);
        for line in ["", "/start", "Задача", "/quit"] {
            tx.send(line.to_string()).await.unwrap();
        }

        assert_eq!(
            platform.next_events().await.unwrap(),
            vec![(CONSOLE_CHAT, Incoming::Command(Command::Start))]
        );
        assert_eq!(
            platform.next_events().await.unwrap(),
            vec![(CONSOLE_CHAT, Incoming::Text("Задача".to_string()))]
        );
        assert!(matches!(
            platform.next_events().await,
            Err(PlatformError::Closed)
        ));
    }

    #[tokio::test]
    async fn voice_is_unsupported() {
        let (_tx, rx) = mpsc::channel(1);
        let platform = ConsolePlatform::from_receiver(rx);
        let voice = VoiceRef {
            file_id: "x".to_string(),
            mime_type: None,
            duration_secs: None,
        };
        assert!(matches!(
            platform.download_voice(&voice).await,
            Err(PlatformError::Unsupported(_))
        ));
    }
}
